//! Raw text transforms
//!
//! Both transforms are opt-in and apply to the raw text between accepted
//! tags only. A `<pre>` region can span several raw chunks when the `<pre>`
//! tag or something inside it is a component, so [`WhitespaceCompressor`]
//! carries the open-`<pre>` depth from one chunk to the next.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--(.*?)-->").expect("valid comment pattern"));

/// Internet Explorer conditional comment body: `[if IE]>...<![endif]`
static CONDITIONAL_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\[if .+\]>.*<!\[endif\]$").expect("valid conditional comment pattern"));

/// `<pre ...>`, `</pre>` or `<pre/>`; group 1 marks a close tag and group 2
/// a self-closing one
static PRE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)pre(?:\s[^>]*?)?(/?)>").expect("valid pre tag pattern"));

static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid space pattern"));

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"( ?[\r\n] ?)+").expect("valid line break pattern"));

/// Remove `<!-- ... -->` comments except conditional comments
pub fn strip_comments(text: &str) -> Cow<'_, str> {
    COMMENT.replace_all(text, |caps: &regex::Captures<'_>| {
        let body = caps.get(1).map_or("", |m| m.as_str());
        if CONDITIONAL_COMMENT.is_match(body) {
            caps[0].to_string()
        } else {
            String::new()
        }
    })
}

/// Collapse runs of spaces and tabs to one space and runs of line breaks
/// to one `\n`. Text inside `<pre>...</pre>` is left alone.
pub fn compress_whitespace(text: &str) -> Cow<'_, str> {
    WhitespaceCompressor::default().compress(text)
}

/// Whitespace compression over a sequence of raw chunks
#[derive(Debug, Default)]
pub struct WhitespaceCompressor {
    pre_depth: usize,
}

impl WhitespaceCompressor {
    pub fn in_pre(&self) -> bool {
        self.pre_depth > 0
    }

    /// Track a `<pre>` tag that was cut out of the raw text
    pub fn observe_pre(&mut self, opening: bool) {
        if opening {
            self.pre_depth += 1;
        } else {
            self.pre_depth = self.pre_depth.saturating_sub(1);
        }
    }

    /// Compress the next raw chunk, leaving `<pre>` regions untouched
    pub fn compress<'t>(&mut self, text: &'t str) -> Cow<'t, str> {
        if !text.contains(|c: char| c.is_ascii_whitespace()) {
            for caps in PRE_TAG.captures_iter(text) {
                self.observe_captured(&caps);
            }
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in PRE_TAG.captures_iter(text) {
            let Some(tag) = caps.get(0) else { continue };
            self.push_segment(&mut out, &text[last..tag.start()]);
            out.push_str(tag.as_str());
            self.observe_captured(&caps);
            last = tag.end();
        }
        self.push_segment(&mut out, &text[last..]);
        if out == text {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(out)
        }
    }

    fn observe_captured(&mut self, caps: &regex::Captures<'_>) {
        let closing = caps.get(1).is_some_and(|m| !m.is_empty());
        let self_closing = caps.get(2).is_some_and(|m| !m.is_empty());
        if !self_closing {
            self.observe_pre(!closing);
        }
    }

    fn push_segment(&self, out: &mut String, segment: &str) {
        if self.in_pre() {
            out.push_str(segment);
        } else {
            out.push_str(&compress_segment(segment));
        }
    }
}

fn compress_segment(segment: &str) -> Cow<'_, str> {
    match HORIZONTAL_SPACE.replace_all(segment, " ") {
        Cow::Borrowed(s) => LINE_BREAKS.replace_all(s, "\n"),
        Cow::Owned(s) => Cow::Owned(LINE_BREAKS.replace_all(&s, "\n").into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_comments_removed() {
        assert_eq!(strip_comments("a<!-- x -->b<!--\ny\n-->c"), "abc");
    }

    #[test]
    fn test_conditional_comment_kept() {
        let text = "<!--[if IE]><link rel=\"stylesheet\" href=\"ie.css\"><![endif]--><!-- gone -->";
        assert_eq!(strip_comments(text), "<!--[if IE]><link rel=\"stylesheet\" href=\"ie.css\"><![endif]-->");
    }

    #[test]
    fn test_whitespace_compressed() {
        assert_eq!(compress_whitespace("a  \t b\n\n\r\n  c"), "a b\nc");
    }

    #[test]
    fn test_pre_untouched() {
        let text = "x   y<pre class=\"code\">  keep\n\n  this</PRE>  z";
        assert_eq!(compress_whitespace(text), "x y<pre class=\"code\">  keep\n\n  this</PRE> z");
    }

    #[test]
    fn test_pre_state_carries_across_chunks() {
        let mut compressor = WhitespaceCompressor::default();
        assert_eq!(compressor.compress("a  <pre>  x  "), "a <pre>  x  ");
        assert!(compressor.in_pre());
        assert_eq!(compressor.compress("  y  </pre>  b"), "  y  </pre> b");
        assert!(!compressor.in_pre());

        compressor.observe_pre(true);
        assert_eq!(compressor.compress("  a    b\n\n  c"), "  a    b\n\n  c");
        compressor.observe_pre(false);
        assert_eq!(compressor.compress("  a    b"), " a b");
    }

    #[test]
    fn test_prefix_named_tags_are_not_pre() {
        let mut compressor = WhitespaceCompressor::default();
        assert_eq!(compressor.compress("<prefix>  a  </prefix>"), "<prefix> a </prefix>");
        assert_eq!(compressor.compress("<pre/>  a"), "<pre/> a");
        assert!(!compressor.in_pre());
    }

    #[test]
    fn test_no_whitespace_borrows() {
        assert!(matches!(compress_whitespace("abc"), Cow::Borrowed(_)));
    }

    proptest! {
        #[test]
        fn prop_pre_content_survives_compression(
            before in "[a-z \t\n]{0,20}",
            body in "[a-z \t\r\n]{0,40}",
            after in "[a-z \t\n]{0,20}",
        ) {
            let text = format!("{before}<pre>{body}</pre>{after}");
            let out = compress_whitespace(&text);
            let expected_pre = format!("<pre>{body}</pre>");
            prop_assert!(out.contains(&expected_pre));
        }

        #[test]
        fn prop_conditional_comments_survive_stripping(
            cond in "[a-zA-Z ]{1,10}",
            body in "[a-z<>/ ]{0,30}",
            other in "[a-z ]{0,20}",
        ) {
            let conditional = format!("<!--[if {cond}]>{body}<![endif]-->");
            let text = format!("x<!--{other}-->{conditional}y");
            let out = strip_comments(&text);
            prop_assert_eq!(out.as_ref(), format!("x{conditional}y"));
        }
    }
}
