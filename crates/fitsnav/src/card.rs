//! FITS header card decoding and encoding.

use core::fmt;
use core::str;

use crate::block::CARD_SIZE;
use crate::error::{Error, Result};

/// Width of the keyword field at the start of every card.
const KEYWORD_LEN: usize = 8;

/// Offset of the value text in a value card (after `= `).
const VALUE_START: usize = 10;

/// A decoded FITS header card (one 80-byte keyword record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Keyword text, right-trimmed.
    pub keyword: String,
    /// Trimmed value text, present only on value cards (`=` at byte 8).
    pub value: Option<String>,
    /// Trimmed comment text, if any.
    pub comment: Option<String>,
}

/// Keywords that drive data-segment layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKeyword {
    Simple,
    Bitpix,
    Naxis,
    /// `NAXISn`, carrying the 1-based axis index.
    NaxisN(usize),
    Pcount,
    Gcount,
    Xtension,
    End,
}

impl LayoutKeyword {
    /// Classify a trimmed keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "SIMPLE" => Some(Self::Simple),
            "BITPIX" => Some(Self::Bitpix),
            "NAXIS" => Some(Self::Naxis),
            "PCOUNT" => Some(Self::Pcount),
            "GCOUNT" => Some(Self::Gcount),
            "XTENSION" => Some(Self::Xtension),
            "END" => Some(Self::End),
            other => {
                let digits = other.strip_prefix("NAXIS")?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                match digits.parse::<usize>() {
                    Ok(n) if n > 0 => Some(Self::NaxisN(n)),
                    _ => None,
                }
            }
        }
    }
}

impl Card {
    /// Decode one card from the first 80 bytes of `bytes`.
    ///
    /// Fewer than 80 bytes yields [`Error::TruncatedCard`] so that callers can
    /// tell a short stream apart from a bad card.
    pub fn decode(bytes: &[u8]) -> Result<Card> {
        let card: &[u8; CARD_SIZE] = bytes
            .get(..CARD_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::TruncatedCard)?;
        decode_card(card)
    }

    /// Layout role of this card's keyword, if it has one.
    pub fn layout_keyword(&self) -> Option<LayoutKeyword> {
        LayoutKeyword::from_keyword(&self.keyword)
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Returns `true` if this card is an `XTENSION` card.
    pub fn is_xtension(&self) -> bool {
        self.keyword == "XTENSION"
    }

    /// Parse the value as a base-10 integer.
    ///
    /// Surrounding spaces and a leading sign are accepted. Anything else,
    /// including a card without a value, is [`Error::InvalidValue`].
    pub fn integer(&self) -> Result<i64> {
        self.value
            .as_deref()
            .and_then(parse_integer)
            .ok_or_else(|| Error::InvalidValue {
                keyword: self.keyword.clone(),
            })
    }

    /// Encode this card back into 80 bytes.
    pub fn encode(&self) -> Result<[u8; CARD_SIZE]> {
        match &self.value {
            Some(value) => encode_card(&self.keyword, value, self.comment.as_deref()),
            None => encode_commentary(&self.keyword, self.comment.as_deref()),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, &self.comment) {
            (Some(value), Some(comment)) => {
                write!(f, "{:<8}= {} / {}", self.keyword, value, comment)
            }
            (Some(value), None) => write!(f, "{:<8}= {}", self.keyword, value),
            (None, Some(text)) => write!(f, "{:<8}{}", self.keyword, text),
            (None, None) => f.write_str(&self.keyword),
        }
    }
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

fn decode_card(bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    if !bytes.iter().copied().all(is_printable) {
        return Err(Error::MalformedCard);
    }
    let text = str::from_utf8(bytes).map_err(|_| Error::MalformedCard)?;
    let keyword = text[..KEYWORD_LEN].trim_end().to_string();

    if keyword == "END" {
        return Ok(Card {
            keyword,
            value: None,
            comment: None,
        });
    }

    if bytes[KEYWORD_LEN] == b'=' {
        let (value, comment) = split_value_comment(&text[VALUE_START..]);
        return Ok(Card {
            keyword,
            value: Some(value.trim().to_string()),
            comment: comment.map(|c| c.trim().to_string()),
        });
    }

    let text = text[KEYWORD_LEN..].trim();
    Ok(Card {
        keyword,
        value: None,
        comment: (!text.is_empty()).then(|| text.to_string()),
    })
}

/// Find the first `/` outside a quoted string.
fn unquoted_slash(field: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, b) in field.bytes().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b'/' if !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

/// A string value left open would swallow the comment when decoded.
fn has_open_quote(value: &str) -> bool {
    value.bytes().filter(|&b| b == b'\'').count() % 2 == 1
}

/// Returns `true` for keywords whose cards carry free text instead of a value.
pub fn is_commentary_keyword(keyword: &str) -> bool {
    matches!(keyword.trim_end(), "COMMENT" | "HISTORY" | "")
}

/// Split the value field of a card into value text and optional comment text.
fn split_value_comment(field: &str) -> (&str, Option<&str>) {
    match unquoted_slash(field) {
        Some(i) => (&field[..i], Some(&field[i + 1..])),
        None => (field, None),
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let digits = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn normalize_keyword(keyword: &str) -> Result<String> {
    let kw = keyword.trim_end().to_ascii_uppercase();
    if kw.is_empty() || kw.len() > KEYWORD_LEN || !kw.bytes().all(is_printable) {
        return Err(Error::InvalidKeyword(keyword.to_string()));
    }
    Ok(kw)
}

/// Encode a value card.
///
/// The keyword is upper-cased and padded to 8 bytes, followed by `= `, the
/// value, and ` / comment` when a comment is given. Content that does not fit
/// in 80 bytes is rejected with [`Error::ValueTooLong`], never truncated.
pub fn encode_card(keyword: &str, value: &str, comment: Option<&str>) -> Result<[u8; CARD_SIZE]> {
    let kw = normalize_keyword(keyword)?;
    let value = value.trim();
    let comment = comment.map(str::trim);

    let printable = value.bytes().chain(comment.unwrap_or("").bytes()).all(is_printable);
    if !printable || unquoted_slash(value).is_some() || has_open_quote(value) {
        return Err(Error::InvalidValue { keyword: kw });
    }

    let len = VALUE_START + value.len() + comment.map_or(0, |c| 3 + c.len());
    if len > CARD_SIZE {
        return Err(Error::ValueTooLong { len });
    }

    let mut buf = [b' '; CARD_SIZE];
    buf[..kw.len()].copy_from_slice(kw.as_bytes());
    buf[KEYWORD_LEN] = b'=';
    let mut pos = VALUE_START;
    buf[pos..pos + value.len()].copy_from_slice(value.as_bytes());
    pos += value.len();
    if let Some(comment) = comment {
        buf[pos..pos + 3].copy_from_slice(b" / ");
        pos += 3;
        buf[pos..pos + comment.len()].copy_from_slice(comment.as_bytes());
    }
    Ok(buf)
}

/// Encode a card without a value indicator (COMMENT, HISTORY, blank, END).
pub(crate) fn encode_commentary(keyword: &str, text: Option<&str>) -> Result<[u8; CARD_SIZE]> {
    let kw = keyword.trim_end();
    if kw.len() > KEYWORD_LEN || !kw.bytes().all(is_printable) {
        return Err(Error::InvalidKeyword(keyword.to_string()));
    }
    let text = text.map(str::trim).unwrap_or("");
    if !text.bytes().all(is_printable) || text.starts_with('=') {
        return Err(Error::InvalidValue {
            keyword: kw.to_string(),
        });
    }
    let len = KEYWORD_LEN + text.len();
    if len > CARD_SIZE {
        return Err(Error::ValueTooLong { len });
    }

    let mut buf = [b' '; CARD_SIZE];
    buf[..kw.len()].copy_from_slice(kw.as_bytes());
    buf[KEYWORD_LEN..len].copy_from_slice(text.as_bytes());
    Ok(buf)
}
