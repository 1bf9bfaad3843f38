//! Tag Attribute Parsing
//!
//! Parses attributes from tag content into an insertion-ordered map with
//! case-insensitive keys. Values are kept exactly as written (quotes
//! stripped, no entity decoding) so re-rendered tags match their source.

use std::fmt::Write as _;

/// Insertion-ordered attribute map with ASCII case-insensitive keys.
///
/// Inserting an existing key overwrites its value in place and keeps the
/// key spelling of the first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Insert or overwrite; returns the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as ` key="value"` pairs in insertion order
    pub fn write_to(&self, out: &mut String) {
        for (key, value) in &self.entries {
            let quote = if value.contains('"') { '\'' } else { '"' };
            let _ = write!(out, " {key}={quote}{value}{quote}");
        }
    }
}

/// Attribute syntax error: message and byte offset relative to the parsed slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeError {
    pub message: &'static str,
    pub offset: usize,
}

/// Parse attributes from raw tag content (after the element name, before
/// `>` or `/>`).
///
/// Values may be single-quoted, double-quoted or bare. Attributes without
/// a value (`<input disabled>`) map to an empty string.
pub fn parse_attributes(input: &str) -> Result<AttributeMap, AttributeError> {
    let bytes = input.as_bytes();
    let mut attrs = AttributeMap::new();
    let mut pos = 0;

    while pos < bytes.len() {
        // Skip whitespace
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        if pos >= bytes.len() {
            break;
        }

        // Parse attribute name
        let name_start = pos;
        while pos < bytes.len() && is_attr_name_char(bytes[pos]) {
            pos += 1;
        }

        if pos == name_start {
            return Err(AttributeError {
                message: "expected attribute name",
                offset: pos,
            });
        }

        let name = &input[name_start..pos];

        // Skip whitespace around '='
        let after_name = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        if pos >= bytes.len() || bytes[pos] != b'=' {
            // Attribute without value (like HTML boolean attributes)
            attrs.insert(name, "");
            pos = after_name;
            continue;
        }

        pos += 1; // Skip '='

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        if pos >= bytes.len() {
            return Err(AttributeError {
                message: "missing attribute value after '='",
                offset: pos,
            });
        }

        let quote = bytes[pos];
        if quote != b'"' && quote != b'\'' {
            // Unquoted value
            let value_start = pos;
            while pos < bytes.len() && !is_whitespace(bytes[pos]) {
                if bytes[pos] == b'"' || bytes[pos] == b'\'' || bytes[pos] == b'=' {
                    return Err(AttributeError {
                        message: "unexpected character in unquoted attribute value",
                        offset: pos,
                    });
                }
                pos += 1;
            }
            attrs.insert(name, &input[value_start..pos]);
            continue;
        }

        pos += 1; // Skip opening quote
        let value_start = pos;

        match memchr::memchr(quote, &bytes[pos..]) {
            Some(len) => {
                pos += len;
                attrs.insert(name, &input[value_start..pos]);
                pos += 1; // Skip closing quote
            }
            None => {
                return Err(AttributeError {
                    message: "attribute value has mismatched quotes",
                    offset: value_start - 1,
                });
            }
        }

        if pos < bytes.len() && !is_whitespace(bytes[pos]) {
            return Err(AttributeError {
                message: "missing whitespace between attributes",
                offset: pos,
            });
        }
    }

    Ok(attrs)
}

/// Check if byte is whitespace
#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Attribute names are lenient: anything up to whitespace, `=`, quote or `/`
#[inline]
fn is_attr_name_char(b: u8) -> bool {
    !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'=' | b'"' | b'\'' | b'/' | b'<' | b'>')
}
