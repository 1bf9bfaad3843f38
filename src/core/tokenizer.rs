//! Markup Tokenizer - pull-style tag extraction
//!
//! Finds tags in decoded markup text and hands them out one at a time:
//! - Open tags: `<name ...>`
//! - Close tags: `</name>`
//! - Open-close tags: `<name .../>`
//! - Comments: `<!-- ... -->` (returned as [`Token::Comment`] or skipped)
//!
//! Everything else is text and is never materialized here. Declarations
//! (`<!DOCTYPE ...>`), CDATA sections, processing instructions and the body
//! of `<script>`/`<style>` are skipped. The caller reads the text between
//! tags through the position marker.

use std::ops::Range;

use super::attributes::parse_attributes;
use super::scanner::{is_name_start_char, Scanner};
use crate::error::{MarkupError, Result};
use crate::markup::{TagBuilder, TagKind};

/// Longest excerpt of offending tag text carried by an error
const MAX_ERROR_EXCERPT: usize = 60;

/// Token produced by [`Tokenizer::next_token`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Tag(TagBuilder),
    /// Byte range of a complete `<!-- ... -->` comment
    Comment(Range<usize>),
}

/// Tokenizer over one decoded markup text
pub struct Tokenizer<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    marker: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            scanner: Scanner::new(input),
            marker: 0,
        }
    }

    /// The full input text
    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Current read position
    #[inline]
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    #[inline]
    pub fn position_marker(&self) -> usize {
        self.marker
    }

    /// Move the position marker. Text before it counts as consumed.
    #[inline]
    pub fn set_position_marker(&mut self, pos: usize) {
        self.marker = pos.min(self.input.len());
    }

    /// Text between the position marker and `to` (empty if `to` is not
    /// past the marker)
    pub fn input_from_position_marker(&self, to: usize) -> &'a str {
        let to = to.min(self.input.len());
        if to <= self.marker {
            return "";
        }
        &self.input[self.marker..to]
    }

    /// Next tag, skipping comments
    pub fn next_tag(&mut self) -> Result<Option<TagBuilder>> {
        loop {
            match self.next_token()? {
                Some(Token::Tag(tag)) => return Ok(Some(tag)),
                Some(Token::Comment(_)) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Next tag or comment
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            let start = match self.scanner.find_tag_start() {
                Some(start) => start,
                None => {
                    self.scanner.set_position(self.input.len());
                    return Ok(None);
                }
            };
            self.scanner.set_position(start);

            if self.scanner.starts_with(b"<!--") {
                let end = self.skip_past(start + 4, b"-->", "unterminated comment")?;
                return Ok(Some(Token::Comment(start..end)));
            }
            if self.scanner.starts_with(b"<![CDATA[") {
                self.skip_past(start + 9, b"]]>", "unterminated CDATA section")?;
                continue;
            }
            if self.scanner.starts_with(b"<?") {
                self.skip_past(start + 2, b"?>", "unterminated processing instruction")?;
                continue;
            }
            if self.scanner.starts_with(b"<!") {
                self.scanner.advance(2);
                let end = self.find_tag_end(start)?;
                self.scanner.set_position(end + 1);
                continue;
            }
            if self.scanner.starts_with(b"</") {
                match self.read_close_tag(start)? {
                    Some(tag) => return Ok(Some(Token::Tag(tag))),
                    None => continue,
                }
            }
            match self.scanner.peek_at(1) {
                Some(b) if is_name_start_char(b) => {
                    let tag = self.read_open_tag(start)?;
                    return Ok(Some(Token::Tag(tag)));
                }
                // A lone '<' is text
                _ => self.scanner.advance(1),
            }
        }
    }

    /// Skip to just past `terminator`, searching from `from`
    fn skip_past(&mut self, from: usize, terminator: &[u8], message: &str) -> Result<usize> {
        let start = self.scanner.position();
        self.scanner.set_position(from.min(self.input.len()));
        match self.scanner.find(terminator) {
            Some(end) => {
                let after = end + terminator.len();
                self.scanner.set_position(after);
                Ok(after)
            }
            None => Err(self.error(start, message)),
        }
    }

    /// Position of the `>` ending the tag that starts at `start`
    fn find_tag_end(&self, start: usize) -> Result<usize> {
        self.scanner
            .find_tag_end()
            .ok_or_else(|| self.error(start, "tag is not closed (missing '>')"))
    }

    fn read_close_tag(&mut self, start: usize) -> Result<Option<TagBuilder>> {
        self.scanner.advance(2);
        let (name_start, name_end) = match self.scanner.read_name() {
            Some(span) => span,
            None => {
                // `</` followed by something that is not a name is text
                return Ok(None);
            }
        };
        let end = self.find_tag_end(start)?;
        if !self.input[name_end..end].trim().is_empty() {
            return Err(self.error(start, "close tag must not have attributes"));
        }
        self.scanner.set_position(end + 1);

        let (namespace, name) = split_name(&self.input[name_start..name_end]);
        Ok(Some(TagBuilder::from_source(
            TagKind::Close,
            namespace,
            name,
            Default::default(),
            start,
            &self.input[start..=end],
        )))
    }

    fn read_open_tag(&mut self, start: usize) -> Result<TagBuilder> {
        self.scanner.advance(1);
        let (name_start, name_end) = self
            .scanner
            .read_name()
            .ok_or_else(|| self.error(start, "expected tag name"))?;
        let end = self.find_tag_end(start)?;
        self.scanner.set_position(end + 1);

        let mut content = self.input[name_end..end].trim_end();
        let mut kind = TagKind::Open;
        if let Some(stripped) = content.strip_suffix('/') {
            content = stripped;
            kind = TagKind::OpenClose;
        }
        if !content.is_empty() && !content.starts_with([' ', '\t', '\r', '\n']) {
            return Err(self.error(start, "expected whitespace after tag name"));
        }
        let attributes = parse_attributes(content).map_err(|e| {
            MarkupError::tokenize(
                self.input,
                name_end + e.offset,
                e.message,
                Some(&excerpt(&self.input[start..=end])),
            )
        })?;

        let (namespace, name) = split_name(&self.input[name_start..name_end]);
        let tag = TagBuilder::from_source(kind, namespace, name, attributes, start, &self.input[start..=end]);

        if kind == TagKind::Open && namespace.is_none() && is_raw_text_element(name) {
            // Script and style bodies are text up to their close tag
            let body_end = self
                .scanner
                .find_close_tag_ignore_case(name)
                .unwrap_or(self.input.len());
            self.scanner.set_position(body_end);
        }
        Ok(tag)
    }

    fn error(&self, start: usize, message: &str) -> MarkupError {
        let text = excerpt(&self.input[start..]);
        MarkupError::tokenize(self.input, start, message, Some(&text))
    }
}

/// Split `prefix:name` at the first colon
fn split_name(qualified: &str) -> (Option<&str>, &str) {
    match qualified.split_once(':') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() => (Some(ns), name),
        _ => (None, qualified),
    }
}

fn is_raw_text_element(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

/// Leading part of `text` for error messages, cut on a char boundary
fn excerpt(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(input: &str) -> Vec<TagBuilder> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        while let Some(tag) = tokenizer.next_tag().unwrap() {
            out.push(tag);
        }
        out
    }

    #[test]
    fn test_open_close_and_open_close() {
        let found = tags("<p>text</p><br/>");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].kind(), TagKind::Open);
        assert_eq!(found[1].kind(), TagKind::Close);
        assert_eq!(found[2].kind(), TagKind::OpenClose);
        assert_eq!(found[1].pos(), 7);
        assert_eq!(found[1].len(), 4);
    }

    #[test]
    fn test_namespace_and_attributes() {
        let found = tags("<wicket:panel><span wicket:id=\"label\" class=x>");
        assert_eq!(found[0].namespace(), Some("wicket"));
        assert_eq!(found[0].name(), "panel");
        assert_eq!(found[1].attribute("wicket:id"), Some("label"));
        assert_eq!(found[1].attribute("CLASS"), Some("x"));
    }

    #[test]
    fn test_open_close_with_space() {
        let found = tags("<img src=\"a.png\" />");
        assert_eq!(found[0].kind(), TagKind::OpenClose);
        assert_eq!(found[0].attribute("src"), Some("a.png"));
    }

    #[test]
    fn test_declarations_are_skipped() {
        let found = tags("<?xml version=\"1.0\"?><!DOCTYPE html><![CDATA[<x>]]><html></html>");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name(), "html");
    }

    #[test]
    fn test_comments() {
        let mut tokenizer = Tokenizer::new("a<!-- <b> -->c<d>");
        assert_eq!(tokenizer.next_token().unwrap(), Some(Token::Comment(1..13)));
        assert!(matches!(tokenizer.next_token().unwrap(), Some(Token::Tag(_))));
        assert_eq!(tokenizer.next_token().unwrap(), None);
    }

    #[test]
    fn test_script_body_is_text() {
        let found = tags("<script>if (a<b) { x('</div>'); }</script><p>");
        let names: Vec<_> = found.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["script", "script", "p"]);
    }

    #[test]
    fn test_stray_less_than_is_text() {
        let found = tags("a < b <= c </ d <p>");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "p");
    }

    #[test]
    fn test_position_marker() {
        let mut tokenizer = Tokenizer::new("abc<p>def");
        let tag = tokenizer.next_tag().unwrap().unwrap();
        assert_eq!(tokenizer.input_from_position_marker(tag.pos()), "abc");
        tokenizer.set_position_marker(tag.end());
        assert_eq!(tokenizer.input_from_position_marker(9), "def");
        assert_eq!(tokenizer.input_from_position_marker(2), "");
    }

    #[test]
    fn test_unclosed_tag_error() {
        let mut tokenizer = Tokenizer::new("<p>\n<div class=\"a\"");
        tokenizer.next_tag().unwrap();
        let err = tokenizer.next_tag().unwrap_err();
        match err {
            MarkupError::Tokenize { pos, tag, .. } => {
                assert_eq!(pos.offset, 4);
                assert_eq!(pos.line, 2);
                assert_eq!(tag.as_deref(), Some("<div class=\"a\""));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_attribute_error() {
        let err = Tokenizer::new("<div a=\"1\"b=\"2\">").next_tag().unwrap_err();
        assert!(matches!(err, MarkupError::Tokenize { .. }));
        assert_eq!(err.position().map(|p| p.offset), Some(10));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Tokenizer::new("<!-- open").next_tag().unwrap_err();
        assert!(err.to_string().contains("unterminated comment"));
    }
}
