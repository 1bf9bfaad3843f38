//! Assembled markup
//!
//! A [`Markup`] is the root artifact produced by the parser: a root
//! [`MarkupFragment`] plus metadata about where it came from. Once built it
//! is shared as `Arc<Markup>` and never changes; producing a modified markup
//! goes through [`Markup::deep_copy`].
//!
//! ```text
//! Markup
//! ├── root: MarkupFragment            # nested tags / raw text / fragments
//! ├── encoding, xml_declaration, namespace, resource
//! ├── flat: OnceLock<Vec<MarkupElement>>   # built on first stream()
//! └── index: OnceLock<ComponentPathIndex>  # built on first lookup
//! ```

pub mod element;
pub mod stream;
pub mod tag;

use std::fmt;
use std::sync::{Arc, OnceLock};

pub use element::{MarkupElement, MarkupFragment, RawMarkup, Visit};
pub use stream::MarkupStream;
pub use tag::{Tag, TagBuilder, TagInfo, TagKind};

use crate::index::ComponentPathIndex;
use crate::resource::ResourceInfo;

/// Root markup artifact
pub struct Markup {
    root: MarkupFragment,
    encoding: Option<String>,
    xml_declaration: Option<String>,
    namespace: String,
    resource: ResourceInfo,
    flat: OnceLock<Vec<MarkupElement>>,
    index: OnceLock<ComponentPathIndex>,
}

impl Markup {
    pub(crate) fn new(
        root: MarkupFragment,
        encoding: Option<String>,
        xml_declaration: Option<String>,
        namespace: String,
        resource: ResourceInfo,
    ) -> Self {
        Markup {
            root,
            encoding,
            xml_declaration,
            namespace,
            resource,
            flat: OnceLock::new(),
            index: OnceLock::new(),
        }
    }

    /// Markup with no elements, attributed to `resource`
    pub fn empty(resource: ResourceInfo, namespace: impl Into<String>) -> Self {
        Markup::new(
            MarkupFragment::new_root(Vec::new(), resource.markup_class.clone()),
            None,
            None,
            namespace.into(),
            resource,
        )
    }

    /// Same metadata with a different root and resource
    pub(crate) fn with_root(&self, root: MarkupFragment, resource: ResourceInfo) -> Self {
        Markup::new(
            root,
            self.encoding.clone(),
            self.xml_declaration.clone(),
            self.namespace.clone(),
            resource,
        )
    }

    /// Independent copy of this markup. Derived data such as the component
    /// path index is not carried over.
    pub fn deep_copy(&self) -> Markup {
        self.with_root(self.root.clone(), self.resource.clone())
    }

    pub fn root(&self) -> &MarkupFragment {
        &self.root
    }

    /// Encoding the source was decoded with
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Leading `<?xml ...?>` declaration text
    pub fn xml_declaration(&self) -> Option<&str> {
        self.xml_declaration.as_deref()
    }

    /// Active reserved-namespace prefix
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn resource(&self) -> &ResourceInfo {
        &self.resource
    }

    pub fn markup_class(&self) -> Option<&str> {
        self.resource.markup_class.as_deref()
    }

    /// Tags and raw text in document order with fragments expanded.
    /// Positions in this slice are the positions used by [`MarkupStream`]
    /// and the component path index.
    pub fn flatten(&self) -> &[MarkupElement] {
        self.flat.get_or_init(|| {
            let mut out = Vec::new();
            self.root.flatten_into(&mut out);
            out
        })
    }

    /// Number of flattened elements
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MarkupElement> {
        self.flatten().get(index)
    }

    /// Sequential cursor over the flattened elements
    pub fn stream(&self) -> MarkupStream<'_> {
        MarkupStream::new(self)
    }

    /// Component path index of this instance, built on first use
    pub fn component_index(&self) -> &ComponentPathIndex {
        self.index.get_or_init(|| {
            let index = ComponentPathIndex::build(self.flatten());
            tracing::debug!(
                resource = %self.resource.name,
                paths = index.len(),
                "built component path index"
            );
            index
        })
    }

    /// Flattened position of the component at `path` (`a/b`)
    pub fn find_component_index(&self, path: &str) -> Option<usize> {
        self.component_index().get(path)
    }

    /// Render back to markup text
    pub fn to_markup_string(&self) -> String {
        let mut out = String::new();
        self.root.write_to(&mut out);
        out
    }

    /// Render with every tag of the reserved namespace left out, the way a
    /// page looks once reserved tags are stripped on output
    pub fn to_stripped_string(&self) -> String {
        let mut out = String::new();
        for element in self.flatten() {
            match element {
                MarkupElement::Tag(tag) if tag.is_reserved() => {}
                MarkupElement::Tag(tag) => out.push_str(&tag.to_markup_string()),
                MarkupElement::Raw(raw) => out.push_str(raw.as_str()),
                MarkupElement::Fragment(fragment) => fragment.write_to(&mut out),
            }
        }
        out
    }

    /// Wrap into the shared, immutable form
    pub fn into_shared(self) -> Arc<Markup> {
        Arc::new(self)
    }
}

impl fmt::Debug for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Markup")
            .field("resource", &self.resource)
            .field("encoding", &self.encoding)
            .field("namespace", &self.namespace)
            .field("elements", &self.root.len())
            .finish()
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup_string())
    }
}
