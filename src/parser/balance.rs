//! Tag balancing
//!
//! An explicit stack of open tags plus the table of void elements, the only
//! place that knows which HTML tags may go without a close tag.
//!
//! Known leniency: when a close tag does not match the top of the stack,
//! every void tag above the matching open tag is popped silently. A real
//! structural error adjacent to void tags can therefore go unnoticed.

/// HTML elements that never take a close tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "isindex",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// True if `name` (without namespace) may be left unclosed
pub fn is_void_element(namespace: Option<&str>, name: &str) -> bool {
    namespace.is_none() && VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// One open tag on the stack, with caller data attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEntry<T> {
    pub namespace: Option<String>,
    pub name: String,
    pub data: T,
}

impl<T> OpenEntry<T> {
    fn is_named(&self, namespace: Option<&str>, name: &str) -> bool {
        let ns_matches = match (self.namespace.as_deref(), namespace) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        ns_matches && self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_void(&self) -> bool {
        is_void_element(self.namespace.as_deref(), &self.name)
    }
}

/// Outcome of closing a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseResult<T> {
    /// The matching open entry, plus void entries popped above it
    Matched {
        open: OpenEntry<T>,
        skipped: Vec<OpenEntry<T>>,
    },
    /// A non-void entry stood in the way; the stack is left unchanged
    Mismatch { blocking: OpenEntry<T> },
    /// No open entry with that name
    Unopened,
}

/// Stack of currently open tags
#[derive(Debug, Clone)]
pub struct TagStack<T> {
    entries: Vec<OpenEntry<T>>,
}

impl<T> Default for TagStack<T> {
    fn default() -> Self {
        TagStack { entries: Vec::new() }
    }
}

impl<T: Clone> TagStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, namespace: Option<&str>, name: &str, data: T) {
        self.entries.push(OpenEntry {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            data,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&OpenEntry<T>> {
        self.entries.last()
    }

    /// Close `name`. Void entries above the match are popped with it; any
    /// other entry in between is a mismatch and leaves the stack unchanged.
    pub fn close(&mut self, namespace: Option<&str>, name: &str) -> CloseResult<T> {
        let Some(at) = self.entries.iter().rposition(|e| e.is_named(namespace, name)) else {
            return match self.entries.iter().rev().find(|e| !e.is_void()) {
                Some(blocking) => CloseResult::Mismatch {
                    blocking: blocking.clone(),
                },
                None => CloseResult::Unopened,
            };
        };
        if let Some(blocking) = self.entries[at + 1..].iter().rev().find(|e| !e.is_void()) {
            return CloseResult::Mismatch {
                blocking: blocking.clone(),
            };
        }
        let mut skipped: Vec<_> = self.entries.drain(at + 1..).collect();
        skipped.reverse();
        match self.entries.pop() {
            Some(open) => CloseResult::Matched { open, skipped },
            None => CloseResult::Unopened,
        }
    }

    /// Empty the stack at end of input. Fails with the outermost non-void
    /// entry if one is left; otherwise returns the void entries.
    pub fn finish(&mut self) -> std::result::Result<Vec<OpenEntry<T>>, OpenEntry<T>> {
        let entries: Vec<_> = self.entries.drain(..).collect();
        if let Some(unclosed) = entries.iter().find(|e| !e.is_void()) {
            return Err(unclosed.clone());
        }
        Ok(entries)
    }
}
