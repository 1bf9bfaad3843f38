//! `<wicket:remove>` regions
//!
//! Everything between `<wicket:remove>` and its close tag is preview-only
//! markup. The open tag is flagged `ignore` and stretched over the whole
//! region; the tags inside are swallowed.

use super::{MarkupFilter, Upstream};
use crate::error::{MarkupError, Result};
use crate::markup::TagBuilder;

pub struct RemoveHandler;

impl RemoveHandler {
    pub const PRIORITY: u32 = 80;

    pub fn new() -> Self {
        RemoveHandler
    }
}

impl Default for RemoveHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for RemoveHandler {
    fn name(&self) -> &str {
        "RemoveHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut open) = upstream.next_tag()? else {
            return Ok(None);
        };
        if !upstream.context().is_reserved_named(&open, "remove") {
            return Ok(Some(open));
        }
        let ns = upstream.context().namespace().to_string();
        if !open.is_open() {
            return Err(upstream.namespace_error(
                &open,
                format!("<{ns}:remove> must be an open tag with a matching close tag"),
            ));
        }

        let id_attribute = upstream.context().attribute_name("id");
        let mut depth = 0usize;
        loop {
            let Some(tag) = upstream.next_tag()? else {
                return Err(MarkupError::balance(
                    upstream.locate(open.pos()),
                    format!("<{ns}:remove> is not closed"),
                    Some(&open.to_markup_string()),
                ));
            };
            if tag.attribute(&id_attribute).is_some() {
                return Err(upstream.namespace_error(
                    &tag,
                    format!("markup inside <{ns}:remove> must not contain component tags"),
                ));
            }
            if upstream.context().is_reserved_named(&tag, "remove") {
                if tag.is_open() {
                    depth += 1;
                } else if tag.is_close() {
                    if depth == 0 {
                        open.set_len(tag.end() - open.pos());
                        open.set_ignore(true);
                        return Ok(Some(open));
                    }
                    depth -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::test_support::*;
    use crate::filter::{BalanceHandler, Filter, ReservedTagIdentifier};

    fn run(input: &str) -> Result<Vec<TagBuilder>> {
        let mut chain = chain_of(vec![
            Filter::ReservedTag(ReservedTagIdentifier::new(&[])),
            Filter::Balance(BalanceHandler::new()),
            Filter::Remove(RemoveHandler::new()),
        ]);
        run_chain(&mut chain, input, &mut context())
    }

    #[test]
    fn test_region_is_swallowed() {
        let input = "<p>a</p><wicket:remove><div>preview</div></wicket:remove><br/>";
        let tags = run(input).unwrap();
        assert_eq!(tags.len(), 4);
        let remove = &tags[2];
        assert!(remove.is_ignored());
        assert_eq!(remove.pos(), 8);
        assert_eq!(&input[remove.pos()..remove.end()], "<wicket:remove><div>preview</div></wicket:remove>");
        assert_eq!(tags[3].name(), "br");
    }

    #[test]
    fn test_components_inside_fail() {
        let err = run("<wicket:remove><span wicket:id=\"x\"></span></wicket:remove>").unwrap_err();
        assert!(matches!(err, MarkupError::Namespace { .. }));
    }

    #[test]
    fn test_open_close_remove_fails() {
        assert!(run("<wicket:remove/>").is_err());
    }
}
