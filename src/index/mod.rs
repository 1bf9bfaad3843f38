//! Component Path Index
//!
//! Maps the `/`-joined id path of every component tag to its position in
//! the flattened element stream of one specific [`Markup`] instance:
//!
//! ```text
//! <div wicket:id="a">            a     -> 0
//!   <span wicket:id="b"/>        a/b   -> 1
//! </div>
//! ```
//!
//! Positions are only meaningful for the markup the index was built from.
//! A merged markup gets its own index.
//!
//! [`Markup`]: crate::markup::Markup

pub mod builder;

use std::collections::HashMap;

use crate::markup::MarkupElement;

pub use builder::PathIndexBuilder;

/// Separator between the ids of a component path
pub const TAG_PATH_SEPARATOR: char = '/';

/// Component path to element position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentPathIndex {
    /// Paths in document order
    entries: Vec<(String, usize)>,
    lookup: HashMap<String, usize>,
}

impl ComponentPathIndex {
    /// Index a flattened element sequence
    pub fn build(elements: &[MarkupElement]) -> Self {
        let mut builder = PathIndexBuilder::new();
        for (position, element) in elements.iter().enumerate() {
            builder.element(position, element);
        }
        builder.finish()
    }

    /// Record `path`. The first occurrence of a path wins.
    fn insert(&mut self, path: &str, position: usize) {
        if self.lookup.contains_key(path) {
            return;
        }
        self.lookup.insert(path.to_string(), position);
        self.entries.push((path.to_string(), position));
    }

    /// Position of the component at `path`; exact, case-sensitive match
    pub fn get(&self, path: &str) -> Option<usize> {
        self.lookup.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(path, position)` pairs in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.entries.iter().map(|(path, position)| (path.as_str(), *position))
    }
}
