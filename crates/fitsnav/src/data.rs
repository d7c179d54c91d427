//! Byte-range addressing of HDU data segments.

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::{Error, Result};
use crate::hdu::scan_until;

/// Resolved byte range of one HDU's raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// HDU index the segment belongs to.
    pub index: usize,
    /// Absolute byte offset of the first data byte (block aligned).
    pub offset: u64,
    /// Data length in bytes, padding excluded.
    pub length: u64,
    /// Bytes per pixel, |BITPIX| / 8.
    pub bitpix_bytes: u64,
    /// Axis extents NAXIS1..NAXISn.
    pub axes: Vec<u64>,
}

impl DataSegment {
    /// Offset just past the last data byte.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Locate the data segment of HDU `hdu_index`.
///
/// HDUs before `hdu_index` are navigated in full; nothing after it is read.
/// Fails with [`Error::IndexOutOfRange`] when the file has fewer HDUs and
/// with [`Error::NoDataSegment`] when the HDU declares no data. The returned
/// range is checked against the stream length.
pub fn locate_data<R: Read + Seek>(reader: &mut R, hdu_index: usize) -> Result<DataSegment> {
    let layout = scan_until(reader, hdu_index)?;
    let hdu = layout.get(hdu_index).ok_or(Error::IndexOutOfRange {
        index: hdu_index,
        count: layout.len(),
    })?;
    if hdu.axes.is_empty() || hdu.data_length == 0 {
        return Err(Error::NoDataSegment { index: hdu_index });
    }

    let available = reader.seek(SeekFrom::End(0))?;
    let segment = DataSegment {
        index: hdu_index,
        offset: hdu.data_offset,
        length: hdu.data_length,
        bitpix_bytes: hdu.bytes_per_pixel(),
        axes: hdu.axes.clone(),
    };
    if segment.end() > available {
        return Err(Error::TruncatedData {
            needed: segment.end(),
            available,
        });
    }
    debug!(
        index = hdu_index,
        offset = segment.offset,
        length = segment.length,
        "located data segment"
    );
    Ok(segment)
}
