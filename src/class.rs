//! Markup classes
//!
//! A markup class is the identity that owns a markup file. Classes form a
//! single-inheritance chain which the loader walks upward to find base
//! markup for `<wicket:extend>`.

use std::fmt;
use std::sync::Arc;

use crate::cache::CacheKey;

/// Role of a markup class, used where parsing differs per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Top-level page; gets header handling and `<head>` synthesis
    Page,
    Panel,
    Border,
    /// Any other markup container
    Container,
}

/// Class identity plus its parent in the inheritance chain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkupClass {
    name: String,
    kind: ClassKind,
    parent: Option<Arc<MarkupClass>>,
}

impl MarkupClass {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        MarkupClass {
            name: name.into(),
            kind,
            parent: None,
        }
    }

    /// Class deriving from `parent`
    pub fn extending(name: impl Into<String>, kind: ClassKind, parent: Arc<MarkupClass>) -> Self {
        MarkupClass {
            name: name.into(),
            kind,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of a `::` or `.` separated name
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(|c| c == ':' || c == '.')
            .next()
            .unwrap_or(&self.name)
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn is_page(&self) -> bool {
        self.kind == ClassKind::Page
    }

    pub fn parent(&self) -> Option<&Arc<MarkupClass>> {
        self.parent.as_ref()
    }

    /// Parent, grandparent, ... up to the root of the chain
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: self.parent.as_deref(),
        }
    }
}

impl fmt::Display for MarkupClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Iterator over the superclass chain
pub struct Ancestors<'a> {
    next: Option<&'a MarkupClass>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a MarkupClass;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// The container a markup is requested for: class, locale, style and
/// markup format (file extension)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerInfo {
    class: Arc<MarkupClass>,
    locale: Option<String>,
    style: Option<String>,
    format: String,
}

impl ContainerInfo {
    pub fn new(class: Arc<MarkupClass>) -> Self {
        ContainerInfo {
            class,
            locale: None,
            style: None,
            format: "html".to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn class(&self) -> &Arc<MarkupClass> {
        &self.class
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Same locale, style and format for another class
    pub fn for_class(&self, class: Arc<MarkupClass>) -> ContainerInfo {
        ContainerInfo {
            class,
            locale: self.locale.clone(),
            style: self.style.clone(),
            format: self.format.clone(),
        }
    }

    /// Same request for the parent class, if there is one
    pub fn for_parent(&self) -> Option<ContainerInfo> {
        self.class.parent().map(|p| self.for_class(p.clone()))
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(
            self.class.name(),
            self.locale.clone(),
            self.style.clone(),
            self.format.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors() {
        let base = Arc::new(MarkupClass::new("app::BasePage", ClassKind::Page));
        let mid = Arc::new(MarkupClass::extending("app::MidPage", ClassKind::Page, base));
        let leaf = MarkupClass::extending("app::LeafPage", ClassKind::Page, mid);
        let names: Vec<_> = leaf.ancestors().map(|c| c.simple_name()).collect();
        assert_eq!(names, vec!["MidPage", "BasePage"]);
    }

    #[test]
    fn test_container_for_parent_keeps_locale() {
        let base = Arc::new(MarkupClass::new("Base", ClassKind::Panel));
        let derived = Arc::new(MarkupClass::extending("Derived", ClassKind::Panel, base));
        let info = ContainerInfo::new(derived).with_locale("de").with_style("dark");
        let parent = info.for_parent().unwrap();
        assert_eq!(parent.class().name(), "Base");
        assert_eq!(parent.locale(), Some("de"));
        assert_eq!(parent.style(), Some("dark"));
        assert!(ContainerInfo::new(Arc::new(MarkupClass::new("X", ClassKind::Page))).for_parent().is_none());
    }
}
