//! Structural access to FITS files: card decoding, header reading, HDU
//! navigation, data-segment addressing and in-place card replacement.

pub mod block;
pub mod card;
pub mod data;
pub mod error;
pub mod hdu;
pub mod header;
pub mod mapped;
pub mod options;
pub mod rewrite;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use card::{encode_card, Card, LayoutKeyword};
pub use data::{locate_data, DataSegment};
pub use error::{Error, Result};
pub use hdu::{scan_all, scan_until, scan_with, FileLayout, HduDescriptor, HduNavigator, ScanError};
pub use header::{read_header, HeaderLayout, HeaderReader};
pub use mapped::{flip_rows, flip_x_in_file, MappedData};
pub use options::ScanOptions;
pub use rewrite::{replace_card, replace_card_in_file, ReplaceOutcome, Replacement};
