use crate::block::CARDS_PER_BLOCK;

/// Default bound on the number of cards read while looking for END.
///
/// 10 000 header blocks; well beyond any real header, small enough to stop
/// quickly on a file full of non-FITS bytes that happen to be printable.
pub const MAX_HEADER_CARDS: usize = CARDS_PER_BLOCK * 10_000;

/// Tunables shared by the scanning entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// A header with more cards than this and no END fails with
    /// [`Error::MissingEnd`](crate::Error::MissingEnd).
    pub max_header_cards: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_header_cards: MAX_HEADER_CARDS,
        }
    }
}

impl ScanOptions {
    /// Override the header card bound.
    pub fn max_header_cards(mut self, max: usize) -> Self {
        self.max_header_cards = max;
        self
    }
}
