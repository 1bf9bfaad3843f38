//! Reserved namespace detection
//!
//! `<html xmlns:x="http://wicket.apache.org">` switches the reserved prefix
//! of the document to `x`. The declaration can optionally be removed from
//! the output.

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::TagBuilder;

/// Namespace URIs that identify the reserved namespace
const NAMESPACE_URIS: &[&str] = &["http://wicket.apache.org", "http://wicket.sourceforge.net"];

pub struct NamespaceHandler {
    strip_declaration: bool,
    done: bool,
}

impl NamespaceHandler {
    pub const PRIORITY: u32 = 20;

    pub fn new(strip_declaration: bool) -> Self {
        NamespaceHandler {
            strip_declaration,
            done: false,
        }
    }

    fn is_reserved_uri(value: &str) -> bool {
        value.is_empty() || NAMESPACE_URIS.iter().any(|uri| value.starts_with(uri))
    }
}

impl MarkupFilter for NamespaceHandler {
    fn name(&self) -> &str {
        "NamespaceHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };
        if self.done || tag.is_close() || !tag.has_name(None, "html") {
            return Ok(Some(tag));
        }
        self.done = true;

        let declared = tag.attributes().iter().find_map(|(key, value)| {
            let prefix = key.strip_prefix("xmlns:")?;
            Self::is_reserved_uri(value).then(|| (key.to_string(), prefix.to_string()))
        });
        if let Some((attribute, prefix)) = declared {
            if !prefix.eq_ignore_ascii_case(upstream.context().namespace()) {
                tracing::warn!(namespace = %prefix, "markup declares a non-default reserved namespace");
            }
            upstream.context_mut().set_namespace(prefix);
            if self.strip_declaration {
                tag.remove_attribute(&attribute);
            }
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
    fn test_detects_custom_prefix() {
        let mut chain = chain_of(vec![Filter::Namespace(NamespaceHandler::new(false))]);
        let mut ctx = context();
        let tags = run_chain(
            &mut chain,
            "<html xmlns:w=\"http://wicket.apache.org/dtds.data/wicket-xhtml1.4-strict.dtd\">",
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.namespace(), "w");
        assert!(!tags[0].is_modified());
    }

    #[test]
    fn test_strips_declaration() {
        let mut chain = chain_of(vec![Filter::Namespace(NamespaceHandler::new(true))]);
        let mut ctx = context();
        let tags = run_chain(&mut chain, "<html lang=\"en\" xmlns:wicket>", &mut ctx).unwrap();
        assert!(tags[0].is_modified());
        assert_eq!(tags[0].to_markup_string(), "<html lang=\"en\">");
        assert_eq!(ctx.namespace(), "wicket");
    }

    #[test]
    fn test_unrelated_namespace_ignored() {
        let mut chain = chain_of(vec![Filter::Namespace(NamespaceHandler::new(true))]);
        let mut ctx = context();
        let tags = run_chain(&mut chain, "<html xmlns:svg=\"http://www.w3.org/2000/svg\">", &mut ctx).unwrap();
        assert_eq!(ctx.namespace(), "wicket");
        assert!(!tags[0].is_modified());
    }
}
