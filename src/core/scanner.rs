//! Delimiter scanning over markup text
//!
//! memchr does the byte searches (SSE2/AVX2 on x86_64, NEON on aarch64).
//! Every delimiter searched for is ASCII, so every position handed back is
//! a `str` boundary of the input.

use memchr::{memchr, memmem};

/// Read cursor over the bytes of one markup text
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move to `pos` (clamped to the end of input)
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.set_position(self.pos + n);
    }

    /// Byte `offset` bytes after the cursor
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    /// Next `<` at or after the cursor
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// `>` ending the tag under the cursor. A `>` inside a single or
    /// double quoted attribute value does not count.
    pub fn find_tag_end(&self) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (i, &b) in self.input[self.pos..].iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Start of `needle` at or after the cursor
    #[inline]
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.input[self.pos..], needle).map(|i| self.pos + i)
    }

    /// `</name` at or after the cursor, name compared ignoring ASCII case
    /// and not followed by another name character (`</scripts` does not
    /// close `script`)
    pub fn find_close_tag_ignore_case(&self, name: &str) -> Option<usize> {
        let finder = memmem::Finder::new(b"</");
        let mut from = self.pos;
        while let Some(i) = finder.find(&self.input[from..]) {
            let name_start = from + i + 2;
            let name_end = name_start + name.len();
            let matches = self
                .input
                .get(name_start..name_end)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()));
            if matches && !self.input.get(name_end).copied().is_some_and(is_name_char) {
                return Some(from + i);
            }
            from = name_start;
        }
        None
    }

    /// Read a (possibly prefixed) tag name at the cursor and return its
    /// byte range
    pub fn read_name(&mut self) -> Option<(usize, usize)> {
        let start = self.pos;
        if !self.peek_at(0).is_some_and(is_name_start_char) {
            return None;
        }
        let len = self.input[start + 1..]
            .iter()
            .position(|&b| !is_name_char(b))
            .unwrap_or(self.input.len() - start - 1);
        self.pos = start + 1 + len;
        Some((start, self.pos))
    }
}

/// Letters, `_` and any non-ASCII byte (part of a UTF-8 sequence)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

/// Name start characters plus digits, `-`, `.` and the prefix colon
#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || b.is_ascii_digit() || matches!(b, b'-' | b'.' | b':')
}
