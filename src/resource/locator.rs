//! Markup resource lookup
//!
//! A class's markup is looked up under its name, most specific variant
//! first: style and locale narrow the lookup, the markup format is the file
//! extension.
//!
//! ```text
//! app::HomePage, style "dark", locale "de_CH", format "html"
//!   app/HomePage_dark_de_CH.html
//!   app/HomePage_dark_de.html
//!   app/HomePage_dark.html
//!   app/HomePage_de_CH.html
//!   app/HomePage_de.html
//!   app/HomePage.html
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use super::{FileResource, MarkupResourceStream, ResourceInfo};
use crate::class::{ContainerInfo, MarkupClass};
use crate::error::ResourceError;

/// Finds the markup resource of a class
pub trait ResourceLocator: Send + Sync {
    /// Markup of exactly `class` (not its ancestors), using the locale,
    /// style and format of `container`
    fn locate(&self, container: &ContainerInfo, class: &MarkupClass) -> Option<Box<dyn MarkupResourceStream>>;
}

/// Lookup names for a class, most specific first
pub fn candidate_names(class: &str, style: Option<&str>, locale: Option<&str>, format: &str) -> Vec<String> {
    let base = class.replace("::", "/").replace('.', "/");

    let mut locales: Vec<&str> = Vec::new();
    if let Some(locale) = locale.filter(|l| !l.is_empty()) {
        let mut end = locale.len();
        loop {
            locales.push(&locale[..end]);
            match locale[..end].rfind('_') {
                Some(cut) => end = cut,
                None => break,
            }
        }
    }

    let mut styles: Vec<Option<&str>> = Vec::with_capacity(2);
    if let Some(style) = style.filter(|s| !s.is_empty()) {
        styles.push(Some(style));
    }
    styles.push(None);

    let mut names = Vec::with_capacity(styles.len() * (locales.len() + 1));
    for style in styles {
        let stem = match style {
            Some(style) => format!("{base}_{style}"),
            None => base.clone(),
        };
        for locale in &locales {
            names.push(format!("{stem}_{locale}.{format}"));
        }
        names.push(format!("{stem}.{format}"));
    }
    names
}

fn resource_info(name: String, container: &ContainerInfo, class: &MarkupClass) -> ResourceInfo {
    ResourceInfo::named(name)
        .with_markup_class(class.name())
        .with_locale(container.locale().map(str::to_string))
        .with_style(container.style().map(str::to_string))
}

/// Looks markup up as files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    root: PathBuf,
}

impl DirectoryLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryLocator { root: root.into() }
    }
}

impl ResourceLocator for DirectoryLocator {
    fn locate(&self, container: &ContainerInfo, class: &MarkupClass) -> Option<Box<dyn MarkupResourceStream>> {
        candidate_names(class.name(), container.style(), container.locale(), container.format())
            .into_iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
            .map(|path| {
                let info = resource_info(path.display().to_string(), container, class);
                Box::new(FileResource::new(path).with_info(info)) as Box<dyn MarkupResourceStream>
            })
    }
}

#[derive(Debug)]
struct MemoryEntry {
    text: Arc<str>,
    modified: SystemTime,
}

type MemoryStore = Arc<RwLock<HashMap<String, MemoryEntry>>>;

/// In-memory markup store keyed by lookup name (`app/HomePage.html`).
/// Located resources read the store live, so replacing an entry shows up
/// as a modification.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    store: MemoryStore,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the markup stored under `name`
    pub fn insert(&self, name: impl Into<String>, text: impl Into<Arc<str>>) {
        let mut store = self.store.write();
        let name = name.into();
        let now = SystemTime::now();
        let modified = match store.get(&name) {
            Some(previous) if previous.modified >= now => previous.modified + Duration::from_nanos(1),
            _ => now,
        };
        store.insert(
            name,
            MemoryEntry {
                text: text.into(),
                modified,
            },
        );
    }

    pub fn remove(&self, name: &str) -> bool {
        self.store.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.read().contains_key(name)
    }
}

impl ResourceLocator for MemoryLocator {
    fn locate(&self, container: &ContainerInfo, class: &MarkupClass) -> Option<Box<dyn MarkupResourceStream>> {
        let store = self.store.read();
        candidate_names(class.name(), container.style(), container.locale(), container.format())
            .into_iter()
            .find(|name| store.contains_key(name))
            .map(|name| {
                Box::new(MemoryResource {
                    info: resource_info(name.clone(), container, class),
                    key: name,
                    store: self.store.clone(),
                }) as Box<dyn MarkupResourceStream>
            })
    }
}

/// Live view of one [`MemoryLocator`] entry
struct MemoryResource {
    info: ResourceInfo,
    key: String,
    store: MemoryStore,
}

impl MarkupResourceStream for MemoryResource {
    fn info(&self) -> &ResourceInfo {
        &self.info
    }

    fn open(&self) -> Result<Vec<u8>, ResourceError> {
        self.store
            .read()
            .get(&self.key)
            .map(|entry| entry.text.as_bytes().to_vec())
            .ok_or_else(|| ResourceError::NotFound(self.info.name.clone()))
    }

    fn encoding(&self) -> Option<&str> {
        Some("UTF-8")
    }

    fn last_modified(&self) -> Option<SystemTime> {
        self.store.read().get(&self.key).map(|entry| entry.modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassKind;

    fn container(name: &str) -> ContainerInfo {
        ContainerInfo::new(Arc::new(MarkupClass::new(name, ClassKind::Page)))
    }

    #[test]
    fn test_candidate_order() {
        let names = candidate_names("app::HomePage", Some("dark"), Some("de_CH"), "html");
        assert_eq!(
            names,
            vec![
                "app/HomePage_dark_de_CH.html",
                "app/HomePage_dark_de.html",
                "app/HomePage_dark.html",
                "app/HomePage_de_CH.html",
                "app/HomePage_de.html",
                "app/HomePage.html",
            ]
        );
        assert_eq!(candidate_names("Panel", None, None, "xml"), vec!["Panel.xml"]);
    }

    #[test]
    fn test_directory_locator_prefers_locale() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("HomePage.html"), "<p>en</p>").unwrap();
        std::fs::write(dir.path().join("HomePage_de.html"), "<p>de</p>").unwrap();
        let locator = DirectoryLocator::new(dir.path());

        let info = container("HomePage").with_locale("de_AT");
        let found = locator.locate(&info, info.class()).unwrap();
        assert_eq!(found.open().unwrap(), b"<p>de</p>");
        assert_eq!(found.info().locale.as_deref(), Some("de_AT"));
        assert_eq!(found.info().markup_class.as_deref(), Some("HomePage"));

        let plain = container("HomePage");
        assert_eq!(locator.locate(&plain, plain.class()).unwrap().open().unwrap(), b"<p>en</p>");
        let other = container("Other");
        assert!(locator.locate(&other, other.class()).is_none());
    }

    #[test]
    fn test_memory_locator_reads_live() {
        let locator = MemoryLocator::new();
        locator.insert("HomePage.html", "<p>1</p>");
        let info = container("HomePage");
        let found = locator.locate(&info, info.class()).unwrap();
        let before = found.last_modified().unwrap();
        locator.insert("HomePage.html", "<p>2</p>");
        assert_eq!(found.open().unwrap(), b"<p>2</p>");
        assert!(found.last_modified().unwrap() > before);
        assert!(locator.remove("HomePage.html"));
        assert!(matches!(found.open().unwrap_err(), ResourceError::NotFound(_)));
    }
}
