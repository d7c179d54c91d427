//! Sequential header reading with running layout state.

use std::collections::BTreeMap;
use std::io::{self, Read};

use tracing::trace;

use crate::block::{header_padded_len, CARD_SIZE};
use crate::card::{Card, LayoutKeyword};
use crate::error::{Error, Result};
use crate::options::ScanOptions;

/// Highest axis count the FITS standard allows.
const MAX_NAXIS: usize = 999;

/// Layout keywords collected from one header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLayout {
    /// BITPIX, if present.
    pub bitpix: Option<i64>,
    /// NAXIS (0 when absent).
    pub naxis: usize,
    /// NAXISn values keyed by 1-based axis index.
    pub axes: BTreeMap<usize, u64>,
    /// Set once an XTENSION card has been seen.
    pub is_extension: bool,
    /// PCOUNT, if present.
    pub pcount: Option<u64>,
    /// GCOUNT, if present.
    pub gcount: Option<u64>,
}

fn non_negative(card: &Card, what: &'static str) -> Result<u64> {
    u64::try_from(card.integer()?).map_err(|_| Error::InvalidLayout(what))
}

impl HeaderLayout {
    /// Fold one card into the layout.
    pub fn update(&mut self, card: &Card) -> Result<()> {
        match card.layout_keyword() {
            Some(LayoutKeyword::Bitpix) => self.bitpix = Some(card.integer()?),
            Some(LayoutKeyword::Naxis) => {
                let n = non_negative(card, "negative NAXIS")?;
                if n > MAX_NAXIS as u64 {
                    return Err(Error::InvalidLayout("NAXIS above 999"));
                }
                self.naxis = n as usize;
            }
            Some(LayoutKeyword::NaxisN(i)) => {
                let len = non_negative(card, "negative axis length")?;
                self.axes.insert(i, len);
            }
            Some(LayoutKeyword::Pcount) => {
                self.pcount = Some(non_negative(card, "negative PCOUNT")?);
            }
            Some(LayoutKeyword::Gcount) => {
                self.gcount = Some(non_negative(card, "negative GCOUNT")?);
            }
            Some(LayoutKeyword::Xtension) => self.is_extension = true,
            Some(LayoutKeyword::Simple) | Some(LayoutKeyword::End) | None => {}
        }
        Ok(())
    }

    /// Bytes per pixel, |BITPIX| / 8; 0 when BITPIX is unknown.
    pub fn bytes_per_pixel(&self) -> u64 {
        self.bitpix.map_or(0, |b| b.unsigned_abs() / 8)
    }

    /// Extents of axes 1..=NAXIS, in order.
    pub fn axis_sizes(&self) -> Result<Vec<u64>> {
        (1..=self.naxis)
            .map(|i| self.axes.get(&i).copied().ok_or(Error::MissingAxis(i)))
            .collect()
    }

    /// Byte length of the data segment described by this header (unpadded).
    ///
    /// Extensions include the PCOUNT/GCOUNT terms; primary headers use
    /// the plain pixel product.
    pub fn data_length(&self) -> Result<u64> {
        if self.naxis == 0 {
            return Ok(0);
        }
        let pixels = self
            .axis_sizes()?
            .into_iter()
            .try_fold(1u64, |acc, d| acc.checked_mul(d))
            .ok_or(Error::InvalidLayout("pixel count overflow"))?;

        let elements = if self.is_extension {
            let gcount = self.gcount.unwrap_or(1);
            pixels
                .checked_add(self.pcount.unwrap_or(0))
                .and_then(|n| n.checked_mul(gcount))
                .ok_or(Error::InvalidLayout("data size overflow"))?
        } else {
            pixels
        };

        elements
            .checked_mul(self.bytes_per_pixel())
            .ok_or(Error::InvalidLayout("data size overflow"))
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Lazy reader over the cards of one header.
///
/// Yields every card up to and including END, then stops. The reader is
/// positioned just after the last card consumed; skipping the header padding
/// is left to the caller (see [`HeaderReader::padded_len`]).
pub struct HeaderReader<'a, R: Read> {
    reader: &'a mut R,
    layout: HeaderLayout,
    consumed: usize,
    max_cards: usize,
    track_layout: bool,
    saw_end: bool,
    done: bool,
}

impl<'a, R: Read> HeaderReader<'a, R> {
    /// Read cards from the current position of `reader`.
    pub fn new(reader: &'a mut R) -> Self {
        Self::with_options(reader, &ScanOptions::default())
    }

    /// Read cards using the bounds in `options`.
    pub fn with_options(reader: &'a mut R, options: &ScanOptions) -> Self {
        Self {
            reader,
            layout: HeaderLayout::default(),
            consumed: 0,
            max_cards: options.max_header_cards,
            track_layout: true,
            saw_end: false,
            done: false,
        }
    }

    /// Stop folding cards into the layout.
    ///
    /// Layout cards are then returned as-is, even when their values are
    /// unusable, and [`HeaderReader::layout`] stays empty.
    pub fn without_layout(mut self) -> Self {
        self.track_layout = false;
        self
    }

    /// Layout accumulated from the cards read so far.
    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// Consume the reader, returning the accumulated layout.
    pub fn into_layout(self) -> HeaderLayout {
        self.layout
    }

    /// Number of cards read, END included.
    pub fn cards_consumed(&self) -> usize {
        self.consumed
    }

    /// `true` once the END card has been read.
    pub fn is_complete(&self) -> bool {
        self.saw_end
    }

    /// Header length in bytes, rounded up to whole blocks.
    pub fn padded_len(&self) -> u64 {
        header_padded_len(self.consumed)
    }

    /// Read every remaining card, returning `Ok(())` once END has been seen.
    pub fn finish(&mut self) -> Result<()> {
        for card in self.by_ref() {
            card?;
        }
        Ok(())
    }

    fn next_card(&mut self) -> Result<Card> {
        if self.consumed >= self.max_cards {
            return Err(Error::MissingEnd {
                max_cards: self.max_cards,
            });
        }
        let mut buf = [0u8; CARD_SIZE];
        if read_full(self.reader, &mut buf)? < CARD_SIZE {
            return Err(Error::TruncatedHeader);
        }
        self.consumed += 1;

        let card = Card::decode(&buf)?;
        if self.track_layout {
            self.layout.update(&card)?;
        }
        if card.is_end() {
            trace!(cards = self.consumed, "reached END card");
            self.saw_end = true;
        }
        Ok(card)
    }
}

impl<R: Read> Iterator for HeaderReader<'_, R> {
    type Item = Result<Card>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_card();
        self.done = result.as_ref().map_or(true, Card::is_end);
        Some(result)
    }
}

/// Read one complete header from `reader`, returning its cards and layout.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(Vec<Card>, HeaderLayout)> {
    let mut header = HeaderReader::new(reader);
    let cards = header.by_ref().collect::<Result<Vec<_>>>()?;
    if !header.is_complete() {
        return Err(Error::TruncatedHeader);
    }
    Ok((cards, header.into_layout()))
}
