//! Reserved tag and component id identification
//!
//! Tags in the reserved namespace (`<wicket:panel>`) are flagged reserved
//! and get the automatic id `_<name>`. Any other tag becomes a component
//! tag when it carries the `<ns>:id` attribute.

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::TagBuilder;

/// Reserved tag names understood by the pipeline and its consumers
pub const RESERVED_TAGS: &[&str] = &[
    "panel",
    "border",
    "body",
    "child",
    "extend",
    "head",
    "remove",
    "message",
    "enclosure",
    "link",
    "fragment",
    "component",
    "container",
];

pub struct ReservedTagIdentifier {
    extra: Vec<String>,
}

impl ReservedTagIdentifier {
    pub const PRIORITY: u32 = 30;

    pub fn new(extra: &[String]) -> Self {
        ReservedTagIdentifier {
            extra: extra.to_vec(),
        }
    }

    fn is_known(&self, name: &str) -> bool {
        RESERVED_TAGS.iter().any(|n| n.eq_ignore_ascii_case(name))
            || self.extra.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}

impl MarkupFilter for ReservedTagIdentifier {
    fn name(&self) -> &str {
        "ReservedTagIdentifier"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };

        let id_attribute = upstream.context().attribute_name("id");
        if let Some(id) = tag.attribute(&id_attribute) {
            if id.trim().is_empty() {
                return Err(upstream.namespace_error(
                    &tag,
                    format!("the {id_attribute} attribute must not be empty"),
                ));
            }
            let id = id.to_string();
            tag.set_id(id);
        }

        if upstream.context().is_reserved(&tag) {
            if !self.is_known(tag.name()) {
                let ns = upstream.context().namespace().to_string();
                return Err(upstream.namespace_error(
                    &tag,
                    format!("unknown tag name with namespace '{ns}': '{}'", tag.name()),
                ));
            }
            tag.set_reserved(true);
            if tag.id().is_none() {
                let id = format!("_{}", tag.name().to_ascii_lowercase());
                tag.set_id(id);
            }
        }
        Ok(Some(tag))
    }
}
