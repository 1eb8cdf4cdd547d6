//! Bencode decoding with byte-span capture
//!
//! Single-pass recursive-descent decoder driven by a cursor index. The first
//! byte of every value disambiguates its type, so no backtracking is needed.
//! Dictionaries record the exact `[start, end)` range of their own encoding,
//! which lets callers re-slice the original buffer (e.g. to hash the raw
//! "info" dictionary) without ever re-encoding a decoded tree.

use crate::{Result, SpoofError};

/// Half-open byte range of a value's encoding within the decoded buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

/// Decoded bencode value.
///
/// Keys of dictionaries are always byte strings; values of any type nest
/// arbitrarily. Use the failing accessors on [`Dictionary`] when a specific
/// key and type are expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    Integer(i64),
    Bytes(Vec<u8>),
    List(Vec<BencodeValue>),
    Dictionary(Dictionary),
}

impl BencodeValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            BencodeValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            BencodeValue::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

/// Insertion-ordered bencode dictionary with its captured byte span.
#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, BencodeValue)>,
    span: ByteSpan,
}

// Spans are decode-time bookkeeping, not part of value identity: the same
// dictionary re-decoded from a re-sliced buffer compares equal.
impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Dictionary {}

impl Dictionary {
    /// Byte range `[start, end)` of this dictionary's encoding in the
    /// buffer it was decoded from.
    pub fn span(&self) -> ByteSpan {
        self.span
    }

    /// Key-value pairs in their original encoded order.
    pub fn entries(&self) -> &[(Vec<u8>, BencodeValue)] {
        &self.entries
    }

    pub fn get(&self, key: &[u8]) -> Option<&BencodeValue> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value)
    }

    /// Looks up an integer value under `key`.
    ///
    /// # Errors
    /// - `SpoofError::InvalidMetadata` - Key absent or not an integer
    pub fn integer(&self, key: &[u8]) -> Result<i64> {
        self.get(key)
            .and_then(BencodeValue::as_int)
            .ok_or_else(|| missing_field(key, "integer"))
    }

    /// Looks up a byte string value under `key`.
    ///
    /// # Errors
    /// - `SpoofError::InvalidMetadata` - Key absent or not a byte string
    pub fn bytes(&self, key: &[u8]) -> Result<&[u8]> {
        self.get(key)
            .and_then(BencodeValue::as_bytes)
            .ok_or_else(|| missing_field(key, "string"))
    }

    /// Looks up a byte string under `key` and decodes it as UTF-8.
    ///
    /// # Errors
    /// - `SpoofError::InvalidMetadata` - Key absent, wrong type, or invalid UTF-8
    pub fn utf8(&self, key: &[u8]) -> Result<&str> {
        std::str::from_utf8(self.bytes(key)?).map_err(|_| SpoofError::InvalidMetadata {
            reason: format!("invalid UTF-8 in field `{}`", String::from_utf8_lossy(key)),
        })
    }

    /// Looks up a list value under `key`.
    ///
    /// # Errors
    /// - `SpoofError::InvalidMetadata` - Key absent or not a list
    pub fn list(&self, key: &[u8]) -> Result<&[BencodeValue]> {
        self.get(key)
            .and_then(BencodeValue::as_list)
            .ok_or_else(|| missing_field(key, "list"))
    }

    /// Looks up a dictionary value under `key`.
    ///
    /// # Errors
    /// - `SpoofError::InvalidMetadata` - Key absent or not a dictionary
    pub fn dict(&self, key: &[u8]) -> Result<&Dictionary> {
        self.get(key)
            .and_then(BencodeValue::as_dict)
            .ok_or_else(|| missing_field(key, "dictionary"))
    }
}

fn missing_field(key: &[u8], expected: &str) -> SpoofError {
    SpoofError::InvalidMetadata {
        reason: format!(
            "missing or invalid {expected} field `{}`",
            String::from_utf8_lossy(key)
        ),
    }
}

/// Decodes the first bencode value in `buf`.
///
/// Trailing bytes after the root value are ignored; tracker responses
/// occasionally carry trailers past the root dictionary.
///
/// # Errors
/// - `SpoofError::MalformedEncoding` - Unexpected terminator, non-digit
///   length prefix, truncated input, or unrecognized type marker
pub fn decode(buf: &[u8]) -> Result<BencodeValue> {
    Decoder { buf, pos: 0 }.parse_value()
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn fail(&self, reason: impl Into<String>) -> SpoofError {
        SpoofError::MalformedEncoding {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.fail("truncated input"))
    }

    fn parse_value(&mut self) -> Result<BencodeValue> {
        match self.peek()? {
            b'i' => self.parse_integer(),
            b'l' => self.parse_list(),
            b'd' => self.parse_dictionary(),
            b'0'..=b'9' => Ok(BencodeValue::Bytes(self.parse_byte_string()?)),
            b'e' => Err(self.fail("unexpected end-of-collection marker")),
            other => Err(self.fail(format!("unrecognized type marker 0x{other:02x}"))),
        }
    }

    fn parse_integer(&mut self) -> Result<BencodeValue> {
        self.pos += 1; // 'i'
        let digits_start = self.pos;
        while self.peek()? != b'e' {
            self.pos += 1;
        }
        let literal = &self.buf[digits_start..self.pos];
        let value = std::str::from_utf8(literal)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| {
                self.fail(format!(
                    "invalid integer literal `{}`",
                    String::from_utf8_lossy(literal)
                ))
            })?;
        self.pos += 1; // 'e'
        Ok(BencodeValue::Integer(value))
    }

    fn parse_byte_string(&mut self) -> Result<Vec<u8>> {
        let length_start = self.pos;
        while self.peek()? != b':' {
            if !self.buf[self.pos].is_ascii_digit() {
                return Err(self.fail("non-digit in string length prefix"));
            }
            self.pos += 1;
        }
        let length: usize = std::str::from_utf8(&self.buf[length_start..self.pos])
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| self.fail("invalid string length prefix"))?;
        self.pos += 1; // ':'
        let body_end = self
            .pos
            .checked_add(length)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| self.fail("truncated input: string body exceeds buffer"))?;
        let bytes = self.buf[self.pos..body_end].to_vec();
        self.pos = body_end;
        Ok(bytes)
    }

    fn parse_list(&mut self) -> Result<BencodeValue> {
        self.pos += 1; // 'l'
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.parse_value()?);
        }
        self.pos += 1; // 'e'
        Ok(BencodeValue::List(items))
    }

    fn parse_dictionary(&mut self) -> Result<BencodeValue> {
        let start = self.pos;
        self.pos += 1; // 'd'
        let mut entries = Vec::new();
        while self.peek()? != b'e' {
            if !self.buf[self.pos].is_ascii_digit() {
                return Err(self.fail("dictionary key must be a byte string"));
            }
            let key = self.parse_byte_string()?;
            let value = self.parse_value()?;
            entries.push((key, value));
        }
        self.pos += 1; // 'e'
        Ok(BencodeValue::Dictionary(Dictionary {
            entries,
            span: ByteSpan {
                start,
                end: self.pos,
            },
        }))
    }
}
