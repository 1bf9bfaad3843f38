//! Page header section handling
//!
//! For pages, `<head>` becomes the component `_header` so header
//! contributions have somewhere to go. A page without a `<head>` gets an
//! empty one injected right before `<body>`.

use std::collections::VecDeque;

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::{TagBuilder, TagKind};

/// Automatic id of the page `<head>` tag
pub const HEADER_ID: &str = "_header";

pub struct HeaderSectionHandler {
    found_head: bool,
    done: bool,
    pending: VecDeque<TagBuilder>,
}

impl HeaderSectionHandler {
    pub const PRIORITY: u32 = 60;

    pub fn new() -> Self {
        HeaderSectionHandler {
            found_head: false,
            done: false,
            pending: VecDeque::new(),
        }
    }
}

impl Default for HeaderSectionHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for HeaderSectionHandler {
    fn name(&self) -> &str {
        "HeaderSectionHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        if let Some(tag) = self.pending.pop_front() {
            return Ok(Some(tag));
        }
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };
        if self.done || !upstream.context().is_page() {
            return Ok(Some(tag));
        }

        if tag.has_name(None, "head") {
            if tag.id().is_none() {
                tag.set_id(HEADER_ID);
            }
            if tag.is_open() {
                self.found_head = true;
            } else {
                self.done = true;
            }
            return Ok(Some(tag));
        }

        if tag.is_open() && tag.has_name(None, "body") {
            self.done = true;
            if !self.found_head {
                tracing::debug!("injecting missing <head> before <body>");
                let mut head = TagBuilder::new(TagKind::Open, None, "head");
                head.set_id(HEADER_ID);
                head.set_pos(tag.pos());
                let close = head.synthesize_close();
                self.pending.push_back(close);
                self.pending.push_back(tag);
                return Ok(Some(head));
            }
        }
        Ok(Some(tag))
    }
}
