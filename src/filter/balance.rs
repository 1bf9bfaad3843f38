//! Tag balance validation
//!
//! Checks that every tag, component or not, is properly closed. Void
//! elements may stay open. A close tag picks up the component id of the
//! open tag it closes, so later stages can treat the pair as one component.

use super::{MarkupFilter, Upstream};
use crate::error::{MarkupError, Result};
use crate::markup::TagBuilder;
use crate::parser::balance::{CloseResult, TagStack};

/// Per open tag: its component id and where it starts
#[derive(Debug, Clone)]
struct Opened {
    id: Option<String>,
    tag: String,
    pos: usize,
}

pub struct BalanceHandler {
    stack: TagStack<Opened>,
}

impl BalanceHandler {
    pub const PRIORITY: u32 = 70;

    pub fn new() -> Self {
        BalanceHandler {
            stack: TagStack::new(),
        }
    }
}

impl Default for BalanceHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for BalanceHandler {
    fn name(&self) -> &str {
        "BalanceHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut tag) = upstream.next_tag()? else {
            return match self.stack.finish() {
                Ok(_) => Ok(None),
                Err(unclosed) => {
                    let pos = upstream.locate(unclosed.data.pos);
                    Err(MarkupError::balance(
                        pos,
                        format!("tag '{}' has no close tag", unclosed.data.tag),
                        Some(&unclosed.data.tag),
                    ))
                }
            };
        };

        if tag.is_open() {
            self.stack.push(
                tag.namespace(),
                tag.name(),
                Opened {
                    id: tag.id().map(str::to_string),
                    tag: tag.to_markup_string().into_owned(),
                    pos: tag.pos(),
                },
            );
        } else if tag.is_close() {
            match self.stack.close(tag.namespace(), tag.name()) {
                CloseResult::Matched { open, .. } => {
                    if tag.id().is_none() {
                        if let Some(id) = open.data.id {
                            tag.set_id(id);
                        }
                    }
                }
                CloseResult::Mismatch { blocking } => {
                    return Err(upstream.balance_error(
                        &tag,
                        format!(
                            "close tag '{}' does not match open tag '{}'",
                            tag.qualified_name(),
                            blocking.data.tag
                        ),
                    ));
                }
                CloseResult::Unopened => {
                    return Err(upstream.balance_error(
                        &tag,
                        format!("close tag '{}' has no open tag", tag.qualified_name()),
                    ));
                }
            }
        }
        Ok(Some(tag))
    }
}
