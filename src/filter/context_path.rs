//! Context path prefixing
//!
//! Relative `href`, `src` and `background` values in plain markup are
//! made relative to the application's context root. Component tags and
//! reserved tags are left to the rendering layer.

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::TagBuilder;

const URL_ATTRIBUTES: &[&str] = &["href", "src", "background"];

pub struct ContextPathHandler {
    context_path: String,
}

impl ContextPathHandler {
    pub const PRIORITY: u32 = 100;

    /// `context_path` is used verbatim as prefix and should end with `/`
    pub fn new(context_path: impl Into<String>) -> Self {
        ContextPathHandler {
            context_path: context_path.into(),
        }
    }

    fn needs_prefix(value: &str) -> bool {
        !value.is_empty() && !value.starts_with('/') && !value.starts_with('#') && !value.contains(':')
    }
}

impl MarkupFilter for ContextPathHandler {
    fn name(&self) -> &str {
        "ContextPathHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };
        if tag.is_close() || tag.id().is_some() || tag.is_reserved() || tag.is_ignored() {
            return Ok(Some(tag));
        }
        for attribute in URL_ATTRIBUTES {
            let rewritten = match tag.attribute(attribute) {
                Some(value) if Self::needs_prefix(value) => format!("{}{value}", self.context_path),
                _ => continue,
            };
            tag.set_attribute(*attribute, rewritten);
        }
        Ok(Some(tag))
    }
}
