//! Tag values
//!
//! A tag moves through the pipeline as a mutable [`TagBuilder`]. The tree
//! builder freezes it into a [`Tag`], which has getters only. Both share the
//! same field set ([`TagInfo`]); a frozen tag additionally knows the open tag
//! it closes.

use std::borrow::Cow;
use std::ops::Deref;
use std::sync::Arc;

use crate::core::attributes::AttributeMap;

/// Tag form as written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<name ...>`
    Open,
    /// `</name>`
    Close,
    /// `<name .../>`
    OpenClose,
}

/// Fields shared by [`TagBuilder`] and [`Tag`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    kind: TagKind,
    namespace: Option<String>,
    name: String,
    attributes: AttributeMap,
    pos: usize,
    len: usize,
    source: Arc<str>,
    id: Option<String>,
    reserved: bool,
    modified: bool,
    ignore: bool,
    no_close_tag: bool,
    markup_class: Option<String>,
}

impl TagInfo {
    #[inline]
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.kind == TagKind::Open
    }

    #[inline]
    pub fn is_close(&self) -> bool {
        self.kind == TagKind::Close
    }

    #[inline]
    pub fn is_open_close(&self) -> bool {
        self.kind == TagKind::OpenClose
    }

    /// Namespace prefix (`wicket` in `wicket:child`)
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local name without prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `prefix:name`, or just `name`
    pub fn qualified_name(&self) -> Cow<'_, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{ns}:{}", self.name)),
            None => Cow::Borrowed(&self.name),
        }
    }

    /// True if prefix and local name are equal ignoring ASCII case
    pub fn has_name(&self, namespace: Option<&str>, name: &str) -> bool {
        let ns_matches = match (self.namespace.as_deref(), namespace) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        ns_matches && self.name.eq_ignore_ascii_case(name)
    }

    /// True if both tags have the same qualified name (ignoring case)
    pub fn same_name(&self, other: &TagInfo) -> bool {
        other.has_name(self.namespace(), self.name())
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    /// Byte offset of the tag in the decoded source
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Length in bytes of the source region the tag covers (0 if synthesized)
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// End of the covered source region
    #[inline]
    pub fn end(&self) -> usize {
        self.pos + self.len
    }

    /// The tag text exactly as it appeared in the source
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Component id, if the tag is a component tag
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// True if the tag belongs to the reserved namespace
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// True if a filter changed or synthesized the tag
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True if the tag's source region is dropped from the output
    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// True for a void open tag resolved without a close tag
    pub fn has_no_close_tag(&self) -> bool {
        self.no_close_tag
    }

    /// Markup class the tag originated from
    pub fn markup_class(&self) -> Option<&str> {
        self.markup_class.as_deref()
    }

    /// Render the tag. Unmodified tags render as their source text.
    pub fn to_markup_string(&self) -> Cow<'_, str> {
        if !self.modified && !self.source.is_empty() {
            return Cow::Borrowed(&self.source);
        }
        let mut out = String::with_capacity(self.name.len() + 16);
        out.push('<');
        if self.kind == TagKind::Close {
            out.push('/');
        }
        if let Some(ns) = &self.namespace {
            out.push_str(ns);
            out.push(':');
        }
        out.push_str(&self.name);
        if self.kind != TagKind::Close {
            self.attributes.write_to(&mut out);
        }
        if self.kind == TagKind::OpenClose {
            out.push_str("/>");
        } else {
            out.push('>');
        }
        Cow::Owned(out)
    }
}

/// Mutable working tag used by the tokenizer and the filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBuilder {
    info: TagInfo,
}

impl Deref for TagBuilder {
    type Target = TagInfo;

    fn deref(&self) -> &TagInfo {
        &self.info
    }
}

impl TagBuilder {
    /// A synthesized tag with no source region. It counts as modified.
    pub fn new(kind: TagKind, namespace: Option<&str>, name: &str) -> Self {
        TagBuilder {
            info: TagInfo {
                kind,
                namespace: namespace.map(str::to_string),
                name: name.to_string(),
                attributes: AttributeMap::new(),
                pos: 0,
                len: 0,
                source: Arc::from(""),
                id: None,
                reserved: false,
                modified: true,
                ignore: false,
                no_close_tag: false,
                markup_class: None,
            },
        }
    }

    /// A tag read from the source at `pos`
    pub(crate) fn from_source(
        kind: TagKind,
        namespace: Option<&str>,
        name: &str,
        attributes: AttributeMap,
        pos: usize,
        source: &str,
    ) -> Self {
        TagBuilder {
            info: TagInfo {
                kind,
                namespace: namespace.map(str::to_string),
                name: name.to_string(),
                attributes,
                pos,
                len: source.len(),
                source: Arc::from(source),
                id: None,
                reserved: false,
                modified: false,
                ignore: false,
                no_close_tag: false,
                markup_class: None,
            },
        }
    }

    /// A synthesized close tag for this open tag, placed at this tag's end
    pub fn synthesize_close(&self) -> TagBuilder {
        let mut close = TagBuilder::new(TagKind::Close, self.namespace(), self.name());
        close.info.pos = self.end();
        close.info.id = self.info.id.clone();
        close.info.reserved = self.info.reserved;
        close.info.markup_class = self.info.markup_class.clone();
        close
    }

    pub fn set_kind(&mut self, kind: TagKind) {
        if self.info.kind != kind {
            self.info.kind = kind;
            self.info.modified = true;
        }
    }

    /// Set an attribute and mark the tag modified
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.attributes.insert(key, value);
        self.info.modified = true;
    }

    /// Remove an attribute; marks the tag modified if it was present
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let removed = self.info.attributes.remove(key);
        if removed.is_some() {
            self.info.modified = true;
        }
        removed
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.info.id = Some(id.into());
    }

    pub fn set_reserved(&mut self, reserved: bool) {
        self.info.reserved = reserved;
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.info.modified = modified;
    }

    pub fn set_ignore(&mut self, ignore: bool) {
        self.info.ignore = ignore;
    }

    pub fn set_no_close_tag(&mut self, no_close_tag: bool) {
        self.info.no_close_tag = no_close_tag;
    }

    pub fn set_markup_class(&mut self, class: impl Into<String>) {
        self.info.markup_class = Some(class.into());
    }

    /// Extend the covered source region (used when a tag swallows its body)
    pub fn set_len(&mut self, len: usize) {
        self.info.len = len;
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.info.pos = pos;
    }

    /// Freeze into an immutable tag
    pub fn freeze(self) -> Tag {
        Tag {
            info: self.info,
            matches: None,
        }
    }

    /// Freeze a close tag, linking it to the open tag it closes
    pub(crate) fn freeze_closing(self, open: Arc<Tag>) -> Tag {
        Tag {
            info: self.info,
            matches: Some(open),
        }
    }
}

/// Immutable tag inside an assembled markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    info: TagInfo,
    matches: Option<Arc<Tag>>,
}

impl Deref for Tag {
    type Target = TagInfo;

    fn deref(&self) -> &TagInfo {
        &self.info
    }
}

impl Tag {
    /// For a close tag: the open tag it closes
    pub fn matches(&self) -> Option<&Arc<Tag>> {
        self.matches.as_ref()
    }

    /// True if `self` is the close tag of exactly this `open` tag instance
    pub fn closes(&self, open: &Arc<Tag>) -> bool {
        self.matches.as_ref().is_some_and(|m| Arc::ptr_eq(m, open))
    }

    /// Mutable working copy. The back-reference is not carried over.
    pub fn to_builder(&self) -> TagBuilder {
        TagBuilder {
            info: self.info.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attributes::parse_attributes;

    fn source_tag(text: &str) -> TagBuilder {
        let attrs = parse_attributes(" wicket:id=\"a\"").unwrap();
        TagBuilder::from_source(TagKind::Open, None, "div", attrs, 10, text)
    }

    #[test]
    fn test_unmodified_renders_source() {
        let tag = source_tag("<div  wicket:id=\"a\" >").freeze();
        assert_eq!(tag.to_markup_string(), "<div  wicket:id=\"a\" >");
        assert_eq!(tag.end(), 31);
    }

    #[test]
    fn test_modified_renders_attributes() {
        let mut tag = source_tag("<div wicket:id=\"a\">");
        tag.set_attribute("class", "x");
        assert!(tag.is_modified());
        assert_eq!(tag.to_markup_string(), "<div wicket:id=\"a\" class=\"x\">");
    }

    #[test]
    fn test_synthesized_close() {
        let mut open = TagBuilder::new(TagKind::Open, Some("wicket"), "child");
        open.set_id("_child");
        let close = open.synthesize_close();
        assert!(close.is_close());
        assert_eq!(close.id(), Some("_child"));
        assert_eq!(close.to_markup_string(), "</wicket:child>");
        assert_eq!(close.len(), 0);
    }

    #[test]
    fn test_names_compare_ignoring_case() {
        let tag = TagBuilder::new(TagKind::Open, Some("Wicket"), "Panel");
        assert!(tag.has_name(Some("wicket"), "panel"));
        assert!(!tag.has_name(None, "panel"));
        assert_eq!(tag.qualified_name(), "Wicket:Panel");
    }

    #[test]
    fn test_freeze_and_back() {
        let open = Arc::new(source_tag("<div wicket:id=\"a\">").freeze());
        let close = TagBuilder::new(TagKind::Close, None, "div").freeze_closing(open.clone());
        assert!(close.closes(&open));
        let copy = close.to_builder().freeze();
        assert!(copy.matches().is_none());
    }
}
