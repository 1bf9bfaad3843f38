//! Fragment tree building
//!
//! Turns the flat sequence of accepted tags and raw text into nested
//! fragments. Runs in two passes: balance resolution pairs every open tag
//! with its close tag (void tags left open are resolved as having none),
//! then nesting freezes the tags and links each close tag to its open tag.

use std::sync::Arc;

use super::balance::{CloseResult, TagStack};
use crate::error::{MarkupError, Result, SourcePos};
use crate::markup::{MarkupElement, MarkupFragment, RawMarkup, Tag, TagBuilder};

/// One element of the flat assembler output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatItem {
    Tag(TagBuilder),
    Raw(RawMarkup),
}

impl FlatItem {
    pub fn as_tag(&self) -> Option<&TagBuilder> {
        match self {
            FlatItem::Tag(tag) => Some(tag),
            FlatItem::Raw(_) => None,
        }
    }

    pub fn as_tag_mut(&mut self) -> Option<&mut TagBuilder> {
        match self {
            FlatItem::Tag(tag) => Some(tag),
            FlatItem::Raw(_) => None,
        }
    }
}

/// An open fragment during nesting
struct OpenFragment {
    elements: Vec<MarkupElement>,
    tag: Arc<Tag>,
    class: Option<String>,
}

/// Build the root fragment. `source` is used to locate errors.
pub fn build_tree(items: Vec<FlatItem>, root_class: Option<String>, source: &str) -> Result<MarkupFragment> {
    let mut closed_at: Vec<Option<usize>> = vec![None; items.len()];
    let mut no_close: Vec<bool> = vec![false; items.len()];

    // Pass 1: balance resolution
    let mut stack: TagStack<usize> = TagStack::new();
    for (i, item) in items.iter().enumerate() {
        let Some(tag) = item.as_tag() else {
            continue;
        };
        if tag.is_open() {
            stack.push(tag.namespace(), tag.name(), i);
        } else if tag.is_close() {
            match stack.close(tag.namespace(), tag.name()) {
                CloseResult::Matched { open, skipped } => {
                    closed_at[open.data] = Some(i);
                    for void in skipped {
                        no_close[void.data] = true;
                    }
                }
                CloseResult::Mismatch { blocking } => {
                    let open = items[blocking.data].as_tag();
                    return Err(error_at(
                        source,
                        tag,
                        format!(
                            "close tag '{}' does not match open tag '{}'",
                            tag.qualified_name(),
                            open.map(|t| t.qualified_name().into_owned()).unwrap_or_default()
                        ),
                    ));
                }
                CloseResult::Unopened => {
                    return Err(error_at(
                        source,
                        tag,
                        format!("close tag '{}' has no open tag", tag.qualified_name()),
                    ));
                }
            }
        }
    }
    match stack.finish() {
        Ok(voids) => {
            for void in voids {
                no_close[void.data] = true;
            }
        }
        Err(unclosed) => {
            if let Some(tag) = items[unclosed.data].as_tag() {
                return Err(error_at(
                    source,
                    tag,
                    format!("tag '{}' has no close tag", tag.qualified_name()),
                ));
            }
        }
    }

    // Pass 2: nesting
    let mut root: Vec<MarkupElement> = Vec::new();
    let mut open: Vec<OpenFragment> = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let mut tag = match item {
            FlatItem::Raw(raw) => {
                target(&mut open, &mut root).push(MarkupElement::Raw(raw));
                continue;
            }
            FlatItem::Tag(tag) => tag,
        };
        let class = tag
            .markup_class()
            .map(str::to_string)
            .or_else(|| open.last().map_or(root_class.clone(), |o| o.class.clone()));

        if tag.is_open() && closed_at[i].is_some() {
            let tag = Arc::new(tag.freeze());
            open.push(OpenFragment {
                elements: vec![MarkupElement::Tag(tag.clone())],
                tag,
                class,
            });
        } else if tag.is_close() {
            let Some(mut fragment) = open.pop() else {
                return Err(error_at(source, &tag, "close tag has no open fragment"));
            };
            let close = tag.freeze_closing(fragment.tag.clone());
            fragment.elements.push(MarkupElement::Tag(Arc::new(close)));
            let nested = MarkupFragment::new_nested(fragment.elements, fragment.class);
            target(&mut open, &mut root).push(MarkupElement::Fragment(nested));
        } else {
            if no_close[i] {
                tag.set_no_close_tag(true);
            }
            let single = MarkupFragment::new_nested(vec![MarkupElement::Tag(Arc::new(tag.freeze()))], class);
            target(&mut open, &mut root).push(MarkupElement::Fragment(single));
        }
    }

    Ok(MarkupFragment::new_root(root, root_class))
}

fn target<'v>(open: &'v mut [OpenFragment], root: &'v mut Vec<MarkupElement>) -> &'v mut Vec<MarkupElement> {
    match open.last_mut() {
        Some(fragment) => &mut fragment.elements,
        None => root,
    }
}

fn error_at(source: &str, tag: &TagBuilder, message: impl Into<String>) -> MarkupError {
    MarkupError::balance(SourcePos::locate(source, tag.pos()), message, Some(&tag.to_markup_string()))
}

/// Flatten a fragment tree back into working items (tags thawed)
pub fn to_items(root: &MarkupFragment) -> Vec<FlatItem> {
    let mut flat = Vec::new();
    root.flatten_into(&mut flat);
    flat.into_iter()
        .filter_map(|element| match element {
            MarkupElement::Tag(tag) => Some(FlatItem::Tag(tag.to_builder())),
            MarkupElement::Raw(raw) => Some(FlatItem::Raw(raw)),
            MarkupElement::Fragment(_) => None,
        })
        .collect()
}
