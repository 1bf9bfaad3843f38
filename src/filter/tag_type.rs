//! Open-close tag refinement
//!
//! Browsers do not accept `<select/>`, `<textarea/>` and friends. Such tags
//! are turned into an open tag followed by a synthesized close tag.

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::{TagBuilder, TagKind};

/// HTML tags that must always be written as open + close
const REQUIRES_BODY: &[&str] = &["select", "label", "td", "textarea", "script"];

pub struct TagTypeHandler {
    pending: Option<TagBuilder>,
}

impl TagTypeHandler {
    pub const PRIORITY: u32 = 10;

    pub fn new() -> Self {
        TagTypeHandler { pending: None }
    }
}

impl Default for TagTypeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for TagTypeHandler {
    fn name(&self) -> &str {
        "TagTypeHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        if let Some(close) = self.pending.take() {
            return Ok(Some(close));
        }
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };
        if tag.is_open_close()
            && tag.namespace().is_none()
            && REQUIRES_BODY.iter().any(|n| n.eq_ignore_ascii_case(tag.name()))
        {
            tag.set_kind(TagKind::Open);
            self.pending = Some(tag.synthesize_close());
        }
        Ok(Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::test_support::*;
    use crate::filter::Filter;

    #[test]
    fn test_open_close_select_is_split() {
        let mut chain = chain_of(vec![Filter::TagType(TagTypeHandler::new())]);
        let tags = run_chain(&mut chain, "<select name=\"a\"/><br/>", &mut context()).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].kind(), TagKind::Open);
        assert!(tags[0].is_modified());
        assert_eq!(tags[0].to_markup_string(), "<select name=\"a\">");
        assert_eq!(tags[1].kind(), TagKind::Close);
        assert_eq!(tags[1].pos(), tags[0].end());
        assert_eq!(tags[2].kind(), TagKind::OpenClose);
        assert!(!tags[2].is_modified());
    }
}
