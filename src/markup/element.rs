//! Markup elements and fragments

use std::fmt;
use std::sync::Arc;

use super::tag::Tag;

/// Immutable slice of source text with no tag semantics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMarkup(Arc<str>);

impl RawMarkup {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        RawMarkup(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One element of an assembled markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupElement {
    Tag(Arc<Tag>),
    Raw(RawMarkup),
    Fragment(MarkupFragment),
}

impl MarkupElement {
    pub fn as_tag(&self) -> Option<&Arc<Tag>> {
        match self {
            MarkupElement::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&RawMarkup> {
        match self {
            MarkupElement::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&MarkupFragment> {
        match self {
            MarkupElement::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }
}

/// Traversal control returned by visitor callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep going, descending into fragments
    Continue,
    /// Do not descend into the fragment just visited
    SkipChildren,
    /// End the traversal
    Stop,
}

/// Ordered, possibly nested sequence of elements.
///
/// A non-root fragment starts with its open tag and, unless it is
/// self-contained (open-close or void), ends with the matching close tag.
/// The root fragment of a markup has no tag of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupFragment {
    elements: Vec<MarkupElement>,
    root: bool,
    markup_class: Option<String>,
}

impl MarkupFragment {
    pub(crate) fn new_root(elements: Vec<MarkupElement>, markup_class: Option<String>) -> Self {
        MarkupFragment {
            elements,
            root: true,
            markup_class,
        }
    }

    pub(crate) fn new_nested(elements: Vec<MarkupElement>, markup_class: Option<String>) -> Self {
        MarkupFragment {
            elements,
            root: false,
            markup_class,
        }
    }

    pub fn elements(&self) -> &[MarkupElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Markup class this fragment originated from
    pub fn markup_class(&self) -> Option<&str> {
        self.markup_class.as_deref()
    }

    /// Opening tag (`None` for the root fragment)
    pub fn tag(&self) -> Option<&Arc<Tag>> {
        if self.root {
            return None;
        }
        self.elements.first().and_then(MarkupElement::as_tag)
    }

    /// Matching close tag, if the fragment is not self-contained
    pub fn close_tag(&self) -> Option<&Arc<Tag>> {
        let open = self.tag()?;
        if self.elements.len() < 2 {
            return None;
        }
        self.elements
            .last()
            .and_then(MarkupElement::as_tag)
            .filter(|close| close.closes(open))
    }

    /// Elements between the open and the close tag
    pub fn children(&self) -> &[MarkupElement] {
        if self.root {
            return &self.elements;
        }
        let start = usize::from(self.tag().is_some()).min(self.elements.len());
        let end = if self.close_tag().is_some() {
            self.elements.len() - 1
        } else {
            self.elements.len()
        };
        &self.elements[start..end.max(start)]
    }

    /// Depth-first visit of every element, fragments before their content.
    /// Returns `Visit::Stop` if the callback stopped the traversal.
    pub fn visit<F>(&self, callback: &mut F) -> Visit
    where
        F: FnMut(&MarkupElement) -> Visit,
    {
        for element in &self.elements {
            match callback(element) {
                Visit::Stop => return Visit::Stop,
                Visit::SkipChildren => continue,
                Visit::Continue => {}
            }
            if let MarkupElement::Fragment(fragment) = element {
                if fragment.visit(callback) == Visit::Stop {
                    return Visit::Stop;
                }
            }
        }
        Visit::Continue
    }

    /// Visit every tag, nested or not, in document order
    pub fn visit_tags<F>(&self, callback: &mut F) -> Visit
    where
        F: FnMut(&Arc<Tag>) -> Visit,
    {
        self.visit(&mut |element| match element {
            MarkupElement::Tag(tag) => callback(tag),
            _ => Visit::Continue,
        })
    }

    /// Mutable depth-first visit; only available before a markup is shared
    pub(crate) fn visit_mut<F>(&mut self, callback: &mut F) -> Visit
    where
        F: FnMut(&mut MarkupElement) -> Visit,
    {
        for element in &mut self.elements {
            match callback(element) {
                Visit::Stop => return Visit::Stop,
                Visit::SkipChildren => continue,
                Visit::Continue => {}
            }
            if let MarkupElement::Fragment(fragment) = element {
                if fragment.visit_mut(callback) == Visit::Stop {
                    return Visit::Stop;
                }
            }
        }
        Visit::Continue
    }

    /// First nested fragment (depth-first) whose open tag satisfies `pred`
    pub fn find_fragment<P>(&self, pred: P) -> Option<&MarkupFragment>
    where
        P: Fn(&Tag) -> bool,
    {
        self.find_fragment_dyn(&pred)
    }

    fn find_fragment_dyn(&self, pred: &dyn Fn(&Tag) -> bool) -> Option<&MarkupFragment> {
        for element in &self.elements {
            if let MarkupElement::Fragment(fragment) = element {
                if fragment.tag().is_some_and(|t| pred(t)) {
                    return Some(fragment);
                }
                if let Some(found) = fragment.find_fragment_dyn(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Tags and raw text in document order, fragments expanded
    pub fn flatten_into(&self, out: &mut Vec<MarkupElement>) {
        for element in &self.elements {
            match element {
                MarkupElement::Fragment(fragment) => fragment.flatten_into(out),
                other => out.push(other.clone()),
            }
        }
    }

    /// Render back to markup text
    pub fn write_to(&self, out: &mut String) {
        for element in &self.elements {
            match element {
                MarkupElement::Tag(tag) => out.push_str(&tag.to_markup_string()),
                MarkupElement::Raw(raw) => out.push_str(raw.as_str()),
                MarkupElement::Fragment(fragment) => fragment.write_to(out),
            }
        }
    }
}

impl fmt::Display for MarkupFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::tag::{TagBuilder, TagKind};

    fn fragment(name: &str, body: &str) -> MarkupFragment {
        let open = Arc::new(TagBuilder::new(TagKind::Open, None, name).freeze());
        let close = TagBuilder::new(TagKind::Close, None, name).freeze_closing(open.clone());
        MarkupFragment::new_nested(
            vec![
                MarkupElement::Tag(open),
                MarkupElement::Raw(RawMarkup::new(body)),
                MarkupElement::Tag(Arc::new(close)),
            ],
            None,
        )
    }

    #[test]
    fn test_tag_and_children() {
        let frag = fragment("div", "text");
        assert_eq!(frag.tag().map(|t| t.name()), Some("div"));
        assert!(frag.close_tag().is_some());
        assert_eq!(frag.children().len(), 1);
        assert_eq!(frag.to_string(), "<div>text</div>");
    }

    #[test]
    fn test_root_has_no_tag() {
        let root = MarkupFragment::new_root(vec![MarkupElement::Fragment(fragment("p", "x"))], None);
        assert!(root.tag().is_none());
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_visit_skip_and_stop() {
        let root = MarkupFragment::new_root(
            vec![
                MarkupElement::Fragment(fragment("a", "1")),
                MarkupElement::Fragment(fragment("b", "2")),
            ],
            None,
        );

        let mut seen = 0;
        root.visit(&mut |el| {
            seen += 1;
            if el.as_fragment().is_some() {
                Visit::SkipChildren
            } else {
                Visit::Continue
            }
        });
        assert_eq!(seen, 2);

        let mut tags = Vec::new();
        let result = root.visit_tags(&mut |tag| {
            tags.push(tag.name().to_string());
            if tag.name() == "a" && tag.is_close() {
                Visit::Stop
            } else {
                Visit::Continue
            }
        });
        assert_eq!(result, Visit::Stop);
        assert_eq!(tags, vec!["a", "a"]);
    }

    #[test]
    fn test_flatten() {
        let root = MarkupFragment::new_root(vec![MarkupElement::Fragment(fragment("p", "x"))], None);
        let mut flat = Vec::new();
        root.flatten_into(&mut flat);
        assert_eq!(flat.len(), 3);
        assert!(flat.iter().all(|e| e.as_fragment().is_none()));
    }
}
