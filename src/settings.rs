//! Markup parser and cache configuration

/// Default reserved namespace prefix
pub const DEFAULT_NAMESPACE: &str = "wicket";

/// Options shared by the parser, the filters and the markup cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSettings {
    /// Remove `<!-- -->` sections from raw markup (conditional comments are kept)
    pub strip_comments: bool,
    /// Collapse runs of whitespace in raw markup (except inside `<pre>`)
    pub compress_whitespace: bool,
    /// Remove the `xmlns:<namespace>` declaration from the `<html>` tag
    pub strip_namespace_declaration: bool,
    /// Encoding used when neither a BOM, an xml declaration nor the resource
    /// declares one
    pub default_encoding: String,
    /// Context root prepended to relative `href`/`src`/`background` values
    pub context_path: Option<String>,
    /// Reserved namespace prefix assumed until `<html xmlns:...>` says otherwise
    pub namespace: String,
    /// Maximum number of cache entries
    pub cache_capacity: usize,
    /// Additional reserved tag names accepted besides the built-in ones
    pub extra_reserved_tags: Vec<String>,
}

impl Default for MarkupSettings {
    fn default() -> Self {
        MarkupSettings {
            strip_comments: false,
            compress_whitespace: false,
            strip_namespace_declaration: false,
            default_encoding: "UTF-8".to_string(),
            context_path: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            cache_capacity: 1024,
            extra_reserved_tags: Vec::new(),
        }
    }
}

impl MarkupSettings {
    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    pub fn with_compress_whitespace(mut self, compress: bool) -> Self {
        self.compress_whitespace = compress;
        self
    }

    pub fn with_strip_namespace_declaration(mut self, strip: bool) -> Self {
        self.strip_namespace_declaration = strip;
        self
    }

    pub fn with_default_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.default_encoding = encoding.into();
        self
    }

    pub fn with_context_path(mut self, path: impl Into<String>) -> Self {
        self.context_path = Some(path.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_reserved_tag(mut self, name: impl Into<String>) -> Self {
        self.extra_reserved_tags.push(name.into());
        self
    }

    /// Context path normalized to end with `/`, or `None` when empty
    pub fn normalized_context_path(&self) -> Option<String> {
        let path = self.context_path.as_deref()?;
        if path.is_empty() {
            return None;
        }
        if path.ends_with('/') {
            Some(path.to_string())
        } else {
            Some(format!("{path}/"))
        }
    }
}
