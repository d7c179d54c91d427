use thiserror::Error;

/// All errors that can occur while navigating or rewriting a FITS file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The file does not start with the `SIMPLE  =` magic.
    #[error("not a FITS file")]
    NotFits,
    /// Fewer than 80 bytes were available for a card.
    #[error("truncated card")]
    TruncatedCard,
    /// The stream ended before the END card of a header.
    #[error("truncated header: stream ended before END card")]
    TruncatedHeader,
    /// No END card within the configured card bound.
    #[error("no END card within {max_cards} cards")]
    MissingEnd {
        /// Card bound that was exceeded.
        max_cards: usize,
    },
    /// A card contains bytes outside printable ASCII.
    #[error("malformed header card")]
    MalformedCard,
    /// Keyword is longer than 8 characters or not printable ASCII.
    #[error("invalid keyword name: {0:?}")]
    InvalidKeyword(String),
    /// A value could not be parsed or cannot be represented in a card.
    #[error("invalid value for keyword {keyword}")]
    InvalidValue {
        /// Keyword whose value was rejected.
        keyword: String,
    },
    /// Encoded card would exceed 80 bytes.
    #[error("card content is {len} bytes, exceeds 80")]
    ValueTooLong {
        /// Length the card would have needed.
        len: usize,
    },
    /// NAXIS declares an axis that has no NAXISn card.
    #[error("missing NAXIS{0} keyword")]
    MissingAxis(usize),
    /// Layout keywords describe an impossible data segment.
    #[error("invalid data layout: {0}")]
    InvalidLayout(&'static str),
    /// Bytes after the last HDU do not start an extension header.
    #[error("unexpected trailing data at byte {offset}")]
    UnexpectedTrailingData {
        /// Absolute offset of the unexpected bytes.
        offset: u64,
    },
    /// The file ends before the end of a declared data segment.
    #[error("truncated data: need {needed} bytes, file has {available}")]
    TruncatedData {
        /// End offset the layout requires.
        needed: u64,
        /// Actual stream length.
        available: u64,
    },
    /// No card with the requested keyword in the primary header.
    #[error("keyword not found: {0}")]
    KeywordNotFound(String),
    /// HDU index past the last HDU in the file.
    #[error("HDU index {index} out of range ({count} HDUs)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of HDUs present.
        count: usize,
    },
    /// The HDU has no data segment (NAXIS = 0 or zero-length).
    #[error("HDU {index} has no data segment")]
    NoDataSegment {
        /// HDU index.
        index: usize,
    },
    /// An I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
