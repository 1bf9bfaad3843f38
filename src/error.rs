//! Error taxonomy for the markup pipeline
//!
//! Every failure surfaces as one `MarkupError`. Tokenizer, filter and balance
//! problems carry the byte offset (plus line/column) of the offending tag so
//! the problem can be localized in the source file.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::markup::Markup;

/// Location of a problem inside decoded markup text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    /// Byte offset into the decoded source
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column (in bytes)
    pub column: usize,
}

impl SourcePos {
    /// Compute line and column for `offset` within `input`
    pub fn locate(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let before = &input.as_bytes()[..offset];
        let line = memchr::memchr_iter(b'\n', before).count() + 1;
        let line_start = memchr::memrchr(b'\n', before).map(|p| p + 1).unwrap_or(0);
        SourcePos {
            offset,
            line,
            column: offset - line_start + 1,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {} (offset {})", self.line, self.column, self.offset)
    }
}

/// Errors raised while parsing, merging or loading markup
#[derive(Debug, Error)]
pub enum MarkupError {
    /// Malformed tag syntax or unterminated comment
    #[error("malformed markup at {pos}: {message}{}", fmt_tag(.tag))]
    Tokenize {
        message: String,
        pos: SourcePos,
        tag: Option<String>,
    },

    /// Mismatched or unclosed non-void tag
    #[error("unbalanced markup at {pos}: {message}{}", fmt_tag(.tag))]
    Balance {
        message: String,
        pos: SourcePos,
        tag: Option<String>,
    },

    /// Misuse of a reserved-namespace tag
    #[error("reserved tag error at {pos}: {message}{}", fmt_tag(.tag))]
    Namespace {
        message: String,
        pos: SourcePos,
        tag: Option<String>,
    },

    /// Markup inheritance could not be resolved
    #[error(transparent)]
    Inheritance(#[from] InheritanceError),

    /// The backing resource could not be read or decoded
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Filters must sit above the tokenizer (priority 0)
    #[error("filter '{name}' has priority {priority}; priorities must be greater than 0")]
    InvalidFilterPriority { name: String, priority: u32 },

    /// A parse of `resource` failed; `partial` holds everything assembled
    /// before the failure and `index` the last successfully built element
    #[error("{resource}: {cause} (after element {index})")]
    Failed {
        resource: String,
        index: usize,
        partial: Arc<Markup>,
        #[source]
        cause: Box<MarkupError>,
    },
}

/// Inheritance failures
#[derive(Debug, Error)]
pub enum InheritanceError {
    /// Walking the owning type's superclass chain found no markup
    #[error("base markup of inherited markup not found (component class: {class})")]
    MissingBase { class: String },

    /// The base markup has no child anchor to inject into
    #[error("no <{namespace}:child> tag found in base markup {resource}")]
    MissingChild { resource: String, namespace: String },

    /// `<ns:extend>` was preceded by another reserved tag
    #[error("<{namespace}:extend> must be the first {namespace} tag in {resource}; found <{namespace}:{found}> before it")]
    MisplacedExtend {
        resource: String,
        namespace: String,
        found: String,
    },
}

/// Resource failures
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("markup resource not found: {0}")]
    NotFound(String),

    #[error("unable to read markup from {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode {resource} as {encoding}: {message}")]
    Encoding {
        resource: String,
        encoding: String,
        message: String,
    },
}

fn fmt_tag(tag: &Option<String>) -> String {
    match tag {
        Some(t) => format!(" (tag: {t})"),
        None => String::new(),
    }
}

impl MarkupError {
    pub(crate) fn tokenize(input: &str, offset: usize, message: impl Into<String>, tag: Option<&str>) -> Self {
        MarkupError::Tokenize {
            message: message.into(),
            pos: SourcePos::locate(input, offset),
            tag: tag.map(str::to_string),
        }
    }

    pub(crate) fn balance(pos: SourcePos, message: impl Into<String>, tag: Option<&str>) -> Self {
        MarkupError::Balance {
            message: message.into(),
            pos,
            tag: tag.map(str::to_string),
        }
    }

    pub(crate) fn namespace(pos: SourcePos, message: impl Into<String>, tag: Option<&str>) -> Self {
        MarkupError::Namespace {
            message: message.into(),
            pos,
            tag: tag.map(str::to_string),
        }
    }

    /// Source position, if the error is tied to one
    pub fn position(&self) -> Option<SourcePos> {
        match self {
            MarkupError::Tokenize { pos, .. }
            | MarkupError::Balance { pos, .. }
            | MarkupError::Namespace { pos, .. } => Some(*pos),
            MarkupError::Failed { cause, .. } => cause.position(),
            _ => None,
        }
    }

    /// The innermost error, looking through `Failed`
    pub fn root_cause(&self) -> &MarkupError {
        match self {
            MarkupError::Failed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Result type for markup operations
pub type Result<T> = std::result::Result<T, MarkupError>;
