//! HDU navigation: walking header/data units in file order and resolving
//! where each header and data segment lives.

use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use tracing::debug;

use crate::block::{is_block_aligned, padded_byte_len, CARD_SIZE, MAGIC};
use crate::card::Card;
use crate::error::{Error, Result};
use crate::header::{read_full, HeaderReader};
use crate::options::ScanOptions;

/// Location and shape of one Header Data Unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HduDescriptor {
    /// Position of this HDU in the file, primary = 0.
    pub index: usize,
    /// Byte offset where the header begins.
    pub header_offset: u64,
    /// Number of cards in the header, END included.
    pub header_card_count: usize,
    /// Byte offset where the data segment begins.
    pub data_offset: u64,
    /// Length of the data segment in bytes (unpadded).
    pub data_length: u64,
    /// `true` for every HDU introduced by an XTENSION card.
    pub is_extension: bool,
    /// BITPIX value, if the header carried one.
    pub bitpix: Option<i64>,
    /// Axis extents NAXIS1..NAXISn.
    pub axes: Vec<u64>,
}

impl HduDescriptor {
    /// Bytes per pixel derived from BITPIX (0 when unknown).
    pub fn bytes_per_pixel(&self) -> u64 {
        self.bitpix.map_or(0, |b| b.unsigned_abs() / 8)
    }

    /// Byte range of the header, padding included.
    pub fn header_range(&self) -> Range<u64> {
        self.header_offset..self.data_offset
    }

    /// Byte range of the data segment, padding excluded.
    pub fn data_range(&self) -> Range<u64> {
        self.data_offset..self.data_offset + self.data_length
    }

    /// Offset just past the padded data segment, where the next HDU starts.
    pub fn end_offset(&self) -> u64 {
        self.data_offset + padded_byte_len(self.data_length)
    }
}

/// All HDUs discovered by one scan, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLayout {
    hdus: Vec<HduDescriptor>,
}

impl FileLayout {
    /// Returns the primary (first) HDU.
    pub fn primary(&self) -> Option<&HduDescriptor> {
        self.hdus.first()
    }

    /// Returns the HDU at the given index, or `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<&HduDescriptor> {
        self.hdus.get(index)
    }

    /// Returns the number of HDUs.
    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    /// Returns `true` if no HDU was resolved.
    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    /// Iterates over all HDUs in order.
    pub fn iter(&self) -> impl Iterator<Item = &HduDescriptor> {
        self.hdus.iter()
    }

    /// Consume the layout, returning the descriptors.
    pub fn into_hdus(self) -> Vec<HduDescriptor> {
        self.hdus
    }
}

/// A scan failure together with the HDUs resolved before it.
#[derive(Debug, thiserror::Error)]
#[error("{source} (after {} resolved HDUs)", .resolved.len())]
pub struct ScanError {
    /// HDUs fully resolved before the failure, in file order.
    pub resolved: Vec<HduDescriptor>,
    /// What went wrong with the next HDU.
    #[source]
    pub source: Error,
}

impl From<ScanError> for Error {
    fn from(e: ScanError) -> Self {
        e.source
    }
}

/// Walks the HDUs of a seekable stream in file order.
///
/// Each HDU's position depends on every header and data segment before it,
/// so descriptors are produced strictly sequentially. The iterator fuses
/// after the first error.
pub struct HduNavigator<'a, R: Read + Seek> {
    reader: &'a mut R,
    options: ScanOptions,
    offset: u64,
    index: usize,
    stream_len: Option<u64>,
    done: bool,
}

impl<'a, R: Read + Seek> HduNavigator<'a, R> {
    /// Navigate `reader` from byte 0.
    pub fn new(reader: &'a mut R) -> Self {
        Self::with_options(reader, ScanOptions::default())
    }

    /// Navigate `reader` from byte 0 using `options`.
    pub fn with_options(reader: &'a mut R, options: ScanOptions) -> Self {
        Self {
            reader,
            options,
            offset: 0,
            index: 0,
            stream_len: None,
            done: false,
        }
    }

    /// Resolve the next HDU, passing each header card to `on_card`.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub fn next_hdu_with<F>(&mut self, on_card: F) -> Result<Option<HduDescriptor>>
    where
        F: FnMut(&Card),
    {
        if self.done {
            return Ok(None);
        }
        let result = self.advance(on_card);
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    fn stream_len(&mut self) -> Result<u64> {
        if let Some(len) = self.stream_len {
            return Ok(len);
        }
        let len = self.reader.seek(SeekFrom::End(0))?;
        self.stream_len = Some(len);
        Ok(len)
    }

    fn check_magic(&mut self) -> Result<()> {
        let mut magic = [0u8; MAGIC.len()];
        self.reader.seek(SeekFrom::Start(0))?;
        let n = read_full(self.reader, &mut magic)?;
        if n < magic.len() || &magic != MAGIC {
            return Err(Error::NotFits);
        }
        Ok(())
    }

    /// Probe for an XTENSION card at the current offset.
    ///
    /// `Ok(false)` means the stream ended cleanly.
    fn probe_extension(&mut self) -> Result<bool> {
        let mut buf = [0u8; CARD_SIZE];
        self.reader.seek(SeekFrom::Start(self.offset))?;
        let n = read_full(self.reader, &mut buf)?;
        if n == 0 {
            return Ok(false);
        }
        let starts_extension = n == CARD_SIZE
            && Card::decode(&buf)
                .map(|card| card.is_xtension())
                .unwrap_or(false);
        if !starts_extension {
            return Err(Error::UnexpectedTrailingData {
                offset: self.offset,
            });
        }
        Ok(true)
    }

    fn advance<F>(&mut self, mut on_card: F) -> Result<Option<HduDescriptor>>
    where
        F: FnMut(&Card),
    {
        if self.index == 0 {
            self.check_magic()?;
        } else if !self.probe_extension()? {
            return Ok(None);
        }

        let header_offset = self.offset;
        self.reader.seek(SeekFrom::Start(header_offset))?;
        let mut header = HeaderReader::with_options(&mut *self.reader, &self.options);
        for card in header.by_ref() {
            on_card(&card?);
        }
        let header_card_count = header.cards_consumed();
        let data_offset = header_offset + header.padded_len();
        let layout = header.into_layout();
        debug_assert!(is_block_aligned(data_offset));

        let data_length = layout.data_length()?;
        let axes = layout.axis_sizes()?;
        let data_end = data_offset
            .checked_add(data_length)
            .ok_or(Error::InvalidLayout("data offset overflow"))?;
        let available = self.stream_len()?;
        if data_length > 0 && data_end > available {
            return Err(Error::TruncatedData {
                needed: data_end,
                available,
            });
        }

        let descriptor = HduDescriptor {
            index: self.index,
            header_offset,
            header_card_count,
            data_offset,
            data_length,
            is_extension: layout.is_extension,
            bitpix: layout.bitpix,
            axes,
        };
        debug!(
            index = descriptor.index,
            header_offset,
            data_offset,
            data_length,
            is_extension = descriptor.is_extension,
            "resolved HDU"
        );

        self.offset = descriptor.end_offset();
        self.index += 1;
        Ok(Some(descriptor))
    }
}

impl<R: Read + Seek> Iterator for HduNavigator<'_, R> {
    type Item = Result<HduDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_hdu_with(|_| {}).transpose()
    }
}

/// Scan HDUs, reporting every header card to `on_card` with its HDU index.
///
/// With `limit = Some(n)` the scan stops after HDU `n` has been resolved;
/// every earlier HDU is still fully navigated.
pub fn scan_with<R, F>(
    reader: &mut R,
    options: &ScanOptions,
    limit: Option<usize>,
    mut on_card: F,
) -> core::result::Result<FileLayout, ScanError>
where
    R: Read + Seek,
    F: FnMut(usize, &Card),
{
    let mut navigator = HduNavigator::with_options(reader, *options);
    let mut resolved = Vec::new();
    while limit.map_or(true, |last| resolved.len() <= last) {
        let index = resolved.len();
        match navigator.next_hdu_with(|card| on_card(index, card)) {
            Ok(Some(hdu)) => resolved.push(hdu),
            Ok(None) => break,
            Err(source) => return Err(ScanError { resolved, source }),
        }
    }
    Ok(FileLayout { hdus: resolved })
}

/// Resolve the layout of every HDU in the stream.
pub fn scan_all<R: Read + Seek>(reader: &mut R) -> core::result::Result<FileLayout, ScanError> {
    scan_with(reader, &ScanOptions::default(), None, |_, _| {})
}

/// Resolve HDUs `0..=target`, stopping early once `target` is reached.
pub fn scan_until<R: Read + Seek>(
    reader: &mut R,
    target: usize,
) -> core::result::Result<FileLayout, ScanError> {
    scan_with(reader, &ScanOptions::default(), Some(target), |_, _| {})
}
