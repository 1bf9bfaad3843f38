//! `<wicket:enclosure>` child resolution
//!
//! An enclosure is shown only if its controlling child component is
//! visible. Unless the `child` attribute names that component explicitly,
//! it is derived from the tags between the enclosure's open and close tag:
//! there must be exactly one component directly inside.

use std::collections::VecDeque;

use super::{MarkupFilter, ParseContext, Upstream};
use crate::error::{MarkupError, Result};
use crate::markup::TagBuilder;
use crate::parser::balance::is_void_element;

/// Attribute naming the controlling child component
pub const CHILD_ATTRIBUTE: &str = "child";

pub struct EnclosureHandler {
    pending: VecDeque<TagBuilder>,
}

/// An enclosure being scanned
struct Frame {
    index: usize,
    children: Vec<String>,
    depth: usize,
}

impl EnclosureHandler {
    pub const PRIORITY: u32 = 90;

    pub fn new() -> Self {
        EnclosureHandler {
            pending: VecDeque::new(),
        }
    }

    /// Set `child` on every enclosure in `buffer` that lacks it
    fn resolve_children(buffer: &mut [TagBuilder], upstream: &Upstream<'_, '_>) -> Result<()> {
        let context: &ParseContext = upstream.context();
        let mut frames: Vec<Frame> = Vec::new();

        for i in 0..buffer.len() {
            let tag = &buffer[i];
            if context.is_reserved_named(tag, "enclosure") {
                if tag.is_open() {
                    frames.push(Frame {
                        index: i,
                        children: Vec::new(),
                        depth: 0,
                    });
                } else if let Some(frame) = frames.pop() {
                    Self::assign_child(&mut buffer[frame.index], frame.children, upstream)?;
                }
                continue;
            }

            let Some(frame) = frames.last_mut() else {
                continue;
            };
            let Some(id) = tag.id() else {
                continue;
            };
            if tag.is_reserved() {
                continue;
            }
            if tag.is_close() {
                frame.depth = frame.depth.saturating_sub(1);
                continue;
            }
            if frame.depth == 0 && !id.starts_with('_') {
                frame.children.push(id.to_string());
            }
            if tag.is_open() && !is_void_element(tag.namespace(), tag.name()) {
                frame.depth += 1;
            }
        }
        Ok(())
    }

    fn assign_child(
        open: &mut TagBuilder,
        children: Vec<String>,
        upstream: &Upstream<'_, '_>,
    ) -> Result<()> {
        if open.attribute(CHILD_ATTRIBUTE).is_some() {
            return Ok(());
        }
        let ns = upstream.context().namespace();
        match children.as_slice() {
            [only] => {
                let only = only.clone();
                open.set_attribute(CHILD_ATTRIBUTE, only);
                Ok(())
            }
            [] => Err(upstream.namespace_error(
                open,
                format!("<{ns}:enclosure> does not contain a child component"),
            )),
            many => Err(upstream.namespace_error(
                open,
                format!(
                    "<{ns}:enclosure> has more than one child component ({}); use the '{CHILD_ATTRIBUTE}' attribute to name the controlling one",
                    many.join(", ")
                ),
            )),
        }
    }
}

impl Default for EnclosureHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for EnclosureHandler {
    fn name(&self) -> &str {
        "EnclosureHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        if let Some(tag) = self.pending.pop_front() {
            return Ok(Some(tag));
        }
        let Some(open) = upstream.next_tag()? else {
            return Ok(None);
        };
        if !upstream.context().is_reserved_named(&open, "enclosure") || open.is_close() {
            return Ok(Some(open));
        }
        let ns = upstream.context().namespace().to_string();
        if open.is_open_close() {
            return Err(upstream.namespace_error(
                &open,
                format!("<{ns}:enclosure> must not be an open-close tag"),
            ));
        }

        // Buffer everything up to the matching close tag
        let open_pos = open.pos();
        let open_text = open.to_markup_string().into_owned();
        let mut buffer = vec![open];
        let mut depth = 1usize;
        while depth > 0 {
            let Some(tag) = upstream.next_tag()? else {
                return Err(MarkupError::balance(
                    upstream.locate(open_pos),
                    format!("<{ns}:enclosure> is not closed"),
                    Some(&open_text),
                ));
            };
            if upstream.context().is_reserved_named(&tag, "enclosure") {
                if tag.is_open_close() {
                    return Err(upstream.namespace_error(
                        &tag,
                        format!("<{ns}:enclosure> must not be an open-close tag"),
                    ));
                }
                if tag.is_open() {
                    depth += 1;
                } else {
                    depth -= 1;
                }
            }
            buffer.push(tag);
        }

        Self::resolve_children(&mut buffer, upstream)?;
        let mut tags = buffer.into_iter();
        let first = tags.next();
        self.pending.extend(tags);
        Ok(first)
    }
}
