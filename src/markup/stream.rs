//! Sequential read cursor over a markup
//!
//! The rendering layer walks a markup element by element. Positions are
//! indices into [`Markup::flatten`].

use std::sync::Arc;

use super::element::MarkupElement;
use super::tag::Tag;
use super::Markup;

/// Cursor over the flattened elements of one markup
#[derive(Clone)]
pub struct MarkupStream<'m> {
    markup: &'m Markup,
    elements: &'m [MarkupElement],
    index: usize,
}

impl<'m> MarkupStream<'m> {
    pub fn new(markup: &'m Markup) -> Self {
        MarkupStream {
            markup,
            elements: markup.flatten(),
            index: 0,
        }
    }

    pub fn markup(&self) -> &'m Markup {
        self.markup
    }

    /// Element at the cursor, `None` past the end
    #[inline]
    pub fn current(&self) -> Option<&'m MarkupElement> {
        self.elements.get(self.index)
    }

    /// Tag at the cursor, if the current element is a tag
    pub fn current_tag(&self) -> Option<&'m Arc<Tag>> {
        self.current().and_then(MarkupElement::as_tag)
    }

    /// Move to the next element and return it
    pub fn advance(&mut self) -> Option<&'m MarkupElement> {
        if self.index < self.elements.len() {
            self.index += 1;
        }
        self.current()
    }

    /// Move to `index` (clamped to the end)
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.elements.len());
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn has_more(&self) -> bool {
        self.index < self.elements.len()
    }

    /// Position the cursor just after the close tag matching `open`.
    /// Open-close and void tags have no close tag; the cursor moves just
    /// after the tag itself. Returns false if `open` is not in this markup.
    pub fn skip_subtree_of(&mut self, open: &Arc<Tag>) -> bool {
        let self_contained = !open.is_open() || open.has_no_close_tag();
        let is_end = |element: &MarkupElement| {
            element.as_tag().is_some_and(|tag| {
                if self_contained {
                    Arc::ptr_eq(tag, open)
                } else {
                    tag.closes(open)
                }
            })
        };
        let start = self.index.min(self.elements.len());
        let found = self.elements[start..]
            .iter()
            .position(is_end)
            .map(|i| start + i)
            .or_else(|| self.elements[..start].iter().position(is_end));
        match found {
            Some(at) => {
                self.index = at + 1;
                true
            }
            None => false,
        }
    }

    /// Advance past consecutive raw text
    pub fn skip_raw_markup(&mut self) {
        while matches!(self.current(), Some(MarkupElement::Raw(_))) {
            self.index += 1;
        }
    }

    /// True if the cursor is on an open or open-close tag
    pub fn at_open_tag(&self) -> bool {
        self.current_tag().is_some_and(|t| !t.is_close())
    }

    /// True if the cursor is on an open tag with component id `id`
    pub fn at_open_tag_with_id(&self, id: &str) -> bool {
        self.current_tag()
            .is_some_and(|t| !t.is_close() && t.id() == Some(id))
    }

    /// True if the cursor is on a close tag
    pub fn at_close_tag(&self) -> bool {
        self.current_tag().is_some_and(|t| t.is_close())
    }

    /// Move to the component at `path` using the markup's path index
    pub fn seek_component(&mut self, path: &str) -> bool {
        match self.markup.find_component_index(path) {
            Some(index) => {
                self.seek(index);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for MarkupStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupStream")
            .field("resource", &self.markup.resource().name)
            .field("index", &self.index)
            .field("len", &self.elements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::MarkupParser;
    use crate::settings::MarkupSettings;

    fn parse(input: &str) -> std::sync::Arc<crate::markup::Markup> {
        MarkupParser::new(MarkupSettings::default())
            .parse_str(input)
            .unwrap()
    }

    #[test]
    fn test_walk_elements() {
        let markup = parse("<p>a</p><span wicket:id=\"x\">b</span>c");
        let mut stream = markup.stream();
        assert!(matches!(stream.current(), Some(crate::markup::MarkupElement::Raw(_))));
        stream.skip_raw_markup();
        assert!(stream.at_open_tag_with_id("x"));
        stream.advance();
        stream.skip_raw_markup();
        assert!(stream.at_close_tag());
        stream.advance();
        assert!(stream.has_more());
        stream.advance();
        assert!(!stream.has_more());
        assert!(stream.current().is_none());
    }

    #[test]
    fn test_skip_subtree() {
        let markup = parse("<div wicket:id=\"a\"><span wicket:id=\"b\">x</span></div>tail");
        let mut stream = markup.stream();
        let open = stream.current_tag().unwrap().clone();
        assert!(stream.skip_subtree_of(&open));
        assert_eq!(stream.current().and_then(|e| e.as_raw()).map(|r| r.as_str()), Some("tail"));
    }

    #[test]
    fn test_skip_open_close_tag() {
        let markup = parse("<br wicket:id=\"a\"/>after");
        let mut stream = markup.stream();
        let open = stream.current_tag().unwrap().clone();
        assert!(stream.skip_subtree_of(&open));
        assert_eq!(stream.index(), 1);
    }

    #[test]
    fn test_seek_component() {
        let markup = parse("<div wicket:id=\"a\"><span wicket:id=\"b\"/></div>");
        let mut stream = markup.stream();
        assert!(stream.seek_component("a/b"));
        assert!(stream.at_open_tag_with_id("b"));
        assert!(!stream.seek_component("b"));
    }
}
