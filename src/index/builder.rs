//! Path Index Builder
//!
//! Single forward pass over a flattened markup. Keeps one growable path
//! buffer plus a stack of buffer lengths to roll back to when a component's
//! close tag is reached.

use super::{ComponentPathIndex, TAG_PATH_SEPARATOR};
use crate::markup::MarkupElement;

/// Builder state for constructing a ComponentPathIndex
pub struct PathIndexBuilder {
    index: ComponentPathIndex,
    /// Current component path
    path: String,
    /// Buffer length before each open component
    parents: Vec<usize>,
}

impl PathIndexBuilder {
    pub fn new() -> Self {
        PathIndexBuilder {
            index: ComponentPathIndex::default(),
            path: String::with_capacity(64),
            parents: Vec::with_capacity(16),
        }
    }

    /// Feed the element at flattened position `position`
    pub fn element(&mut self, position: usize, element: &MarkupElement) {
        let MarkupElement::Tag(tag) = element else {
            return;
        };

        if tag.is_close() {
            // Plain tags cut out by a filter have no id and never pushed
            let opened_component = tag
                .matches()
                .map_or(tag.id().is_some(), |open| open.id().is_some());
            if opened_component {
                if let Some(len) = self.parents.pop() {
                    self.path.truncate(len);
                }
            }
            return;
        }

        let Some(id) = tag.id() else {
            return;
        };
        let parent_len = self.path.len();
        if !self.path.is_empty() {
            self.path.push(TAG_PATH_SEPARATOR);
        }
        self.path.push_str(id);
        self.index.insert(&self.path, position);

        if tag.is_open_close() || tag.has_no_close_tag() {
            self.path.truncate(parent_len);
        } else {
            self.parents.push(parent_len);
        }
    }

    pub fn finish(self) -> ComponentPathIndex {
        self.index
    }
}

impl Default for PathIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}
