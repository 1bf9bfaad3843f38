//! `<body>` identification
//!
//! When the owning container is known, a plain `<body>` tag becomes the
//! component `_body` so the rendering layer can contribute `onload`
//! handlers to it.

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::TagBuilder;

/// Automatic id of the `<body>` tag
pub const BODY_ID: &str = "_body";

pub struct BodyHandler;

impl BodyHandler {
    pub const PRIORITY: u32 = 50;

    pub fn new() -> Self {
        BodyHandler
    }
}

impl Default for BodyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for BodyHandler {
    fn name(&self) -> &str {
        "BodyHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };
        if !tag.is_close()
            && tag.id().is_none()
            && tag.has_name(None, "body")
            && upstream.context().container().is_some()
        {
            tag.set_id(BODY_ID);
        }
        Ok(Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassKind, ContainerInfo, MarkupClass};
    use crate::filter::test_support::*;
    use crate::filter::{Filter, ParseContext};
    use std::sync::Arc;

    #[test]
    fn test_body_gets_id_with_container() {
        let container = ContainerInfo::new(Arc::new(MarkupClass::new("Home", ClassKind::Page)));
        let mut ctx = ParseContext::new("wicket", Some(container));
        let mut chain = chain_of(vec![Filter::Body(BodyHandler::new())]);
        let tags = run_chain(&mut chain, "<body onload=\"x()\"></body>", &mut ctx).unwrap();
        assert_eq!(tags[0].id(), Some(BODY_ID));
        assert!(!tags[0].is_modified());
        assert_eq!(tags[1].id(), None);
    }

    #[test]
    fn test_body_untouched_without_container() {
        let mut chain = chain_of(vec![Filter::Body(BodyHandler::new())]);
        let tags = run_chain(&mut chain, "<body>", &mut context()).unwrap();
        assert_eq!(tags[0].id(), None);
    }
}
