//! Markup resources
//!
//! The parser only needs a byte stream, an optional declared encoding and
//! a last-modified time for change watching. Where the bytes come from is
//! up to [`MarkupResourceStream`] implementations and the
//! [`ResourceLocator`] that finds them.

pub mod locator;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::ResourceError;

pub use locator::{candidate_names, DirectoryLocator, MemoryLocator, ResourceLocator};
pub use watcher::{ChangeListener, ModificationWatcher};

/// Identity of a markup resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceInfo {
    /// Name used in diagnostics and as watch key (file path, lookup name)
    pub name: String,
    /// Class the markup belongs to
    pub markup_class: Option<String>,
    pub locale: Option<String>,
    pub style: Option<String>,
}

impl ResourceInfo {
    pub fn named(name: impl Into<String>) -> Self {
        ResourceInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_markup_class(mut self, class: impl Into<String>) -> Self {
        self.markup_class = Some(class.into());
        self
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }
}

/// Byte source of one markup
pub trait MarkupResourceStream: Send + Sync {
    fn info(&self) -> &ResourceInfo;

    /// Read the complete content
    fn open(&self) -> Result<Vec<u8>, ResourceError>;

    /// Encoding declared outside the content, if any
    fn encoding(&self) -> Option<&str> {
        None
    }

    /// Last modification time, used to detect changes
    fn last_modified(&self) -> Option<SystemTime> {
        None
    }
}

/// Markup stored in a file
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
    info: ResourceInfo,
    encoding: Option<String>,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let info = ResourceInfo::named(path.display().to_string());
        FileResource {
            path,
            info,
            encoding: None,
        }
    }

    pub fn with_info(mut self, info: ResourceInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarkupResourceStream for FileResource {
    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn open(&self) -> Result<Vec<u8>, ResourceError> {
        std::fs::read(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(self.info.name.clone())
            } else {
                ResourceError::Io {
                    resource: self.info.name.clone(),
                    source,
                }
            }
        })
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    fn last_modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

/// Markup held in memory
#[derive(Debug, Clone)]
pub struct StringResource {
    info: ResourceInfo,
    text: Arc<str>,
    modified: Option<SystemTime>,
}

impl StringResource {
    pub fn new(name: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        StringResource {
            info: ResourceInfo::named(name),
            text: text.into(),
            modified: None,
        }
    }

    pub fn with_info(mut self, info: ResourceInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_last_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl MarkupResourceStream for StringResource {
    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn open(&self) -> Result<Vec<u8>, ResourceError> {
        Ok(self.text.as_bytes().to_vec())
    }

    fn encoding(&self) -> Option<&str> {
        Some("UTF-8")
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_resource_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<p>hi</p>").unwrap();
        let resource = FileResource::new(file.path());
        assert_eq!(resource.open().unwrap(), b"<p>hi</p>");
        assert!(resource.last_modified().is_some());
        assert_eq!(resource.info().name, file.path().display().to_string());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(dir.path().join("nope.html"));
        assert!(matches!(resource.open().unwrap_err(), ResourceError::NotFound(_)));
        assert!(resource.last_modified().is_none());
    }

    #[test]
    fn test_string_resource() {
        let resource = StringResource::new("inline", "<b>x</b>");
        assert_eq!(resource.open().unwrap(), b"<b>x</b>");
        assert_eq!(resource.encoding(), Some("UTF-8"));
        assert_eq!(resource.text(), "<b>x</b>");
    }
}
