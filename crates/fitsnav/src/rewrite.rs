//! In-place replacement of a single primary-header card.
//!
//! Every card occupies a fixed 80-byte slot, so a replacement is one
//! fixed-offset overwrite: the file length and the position of every other
//! byte stay the same.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::block::{CARD_SIZE, MAGIC};
use crate::card::{encode_card, encode_commentary, is_commentary_keyword, Card};
use crate::error::{Error, Result};
use crate::header::{read_full, HeaderReader};

/// What to write over a located card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    target: String,
    keyword: Option<String>,
    value: Option<String>,
    comment: Option<String>,
    keep_existing_comment: bool,
}

impl Replacement {
    /// Replace the first card whose keyword is `target`.
    pub fn new(target: &str) -> Self {
        Self {
            target: target.trim().to_ascii_uppercase(),
            keyword: None,
            value: None,
            comment: None,
            keep_existing_comment: false,
        }
    }

    /// Write the card under a different keyword.
    pub fn keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    /// New value text. Without one the existing value is kept.
    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// New comment text, always written with a ` / ` separator.
    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Reuse the existing comment when no explicit comment is given.
    pub fn keep_existing_comment(mut self, keep: bool) -> Self {
        self.keep_existing_comment = keep;
        self
    }

    /// Keyword searched for.
    pub fn target(&self) -> &str {
        &self.target
    }

    fn resolve(&self, previous: &Card) -> Result<[u8; CARD_SIZE]> {
        let keyword = match &self.keyword {
            Some(k) => k.trim().to_ascii_uppercase(),
            None => previous.keyword.clone(),
        };
        if keyword == "END" {
            return Err(Error::InvalidKeyword(keyword));
        }

        let commentary = is_commentary_keyword(&keyword)
            || (previous.value.is_none() && self.value.is_none());
        if commentary {
            let text = self
                .value
                .as_deref()
                .or(self.comment.as_deref())
                .or(previous.value.as_deref())
                .or(previous.comment.as_deref());
            return encode_commentary(&keyword, text);
        }

        let value = self
            .value
            .as_deref()
            .or(previous.value.as_deref())
            .unwrap_or("");
        let comment = match &self.comment {
            Some(c) => Some(c.as_str()),
            None if self.keep_existing_comment => previous.comment.as_deref(),
            None => None,
        };
        encode_card(&keyword, value, comment)
    }
}

/// Result of a successful replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Absolute byte offset of the rewritten card.
    pub offset: u64,
    /// The card as it was before.
    pub previous: Card,
    /// The card as written.
    pub written: Card,
}

/// Replace one card of the primary header in place.
///
/// The replacement is fully encoded before anything is written, so an
/// [`Error::ValueTooLong`] or any other encoding failure leaves the stream
/// untouched.
pub fn replace_card<F>(file: &mut F, replacement: &Replacement) -> Result<ReplaceOutcome>
where
    F: Read + Write + Seek,
{
    if replacement.target == "END" {
        return Err(Error::InvalidKeyword(replacement.target.clone()));
    }

    let mut magic = [0u8; MAGIC.len()];
    file.seek(SeekFrom::Start(0))?;
    if read_full(file, &mut magic)? < magic.len() || &magic != MAGIC {
        return Err(Error::NotFits);
    }
    file.seek(SeekFrom::Start(0))?;

    let mut found = None;
    for (slot, card) in HeaderReader::new(file).without_layout().enumerate() {
        let card = card?;
        if card.keyword == replacement.target {
            found = Some((slot, card));
            break;
        }
    }
    let (slot, previous) =
        found.ok_or_else(|| Error::KeywordNotFound(replacement.target.clone()))?;

    let encoded = replacement.resolve(&previous)?;
    let written = Card::decode(&encoded)?;
    let offset = (slot * CARD_SIZE) as u64;

    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&encoded)?;
    file.flush()?;
    debug!(
        keyword = %replacement.target,
        offset,
        "replaced header card"
    );

    Ok(ReplaceOutcome {
        offset,
        previous,
        written,
    })
}

/// Open `path` for reading and writing and replace one primary-header card.
pub fn replace_card_in_file<P: AsRef<Path>>(
    path: P,
    replacement: &Replacement,
) -> Result<ReplaceOutcome> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    replace_card(&mut file, replacement)
}
