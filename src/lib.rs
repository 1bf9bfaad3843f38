//! tagweave - component markup templates
//!
//! Markup files are plain XHTML with a reserved namespace (`wicket` by
//! default) marking component anchors (`wicket:id`) and structural tags
//! (`<wicket:panel>`, `<wicket:extend>`, ...).
//!
//! Pipeline:
//! 1. Tokenizer: raw text and tags, memchr-accelerated
//! 2. Filter chain: priority-ordered filters identify, rewrite, insert
//!    and drop tags
//! 3. Assembler: keeps interesting tags as tags, the rest as raw text
//! 4. Tree builder: balanced fragments, close tags linked to their opens
//! 5. Inheritance merger: `<wicket:extend>` spliced into the base markup's
//!    `<wicket:child>`
//! 6. Path index and cache: component paths resolved to element
//!    positions, merged markup memoized per class, locale and style
//!
//! ```
//! use tagweave::{MarkupParser, MarkupSettings};
//!
//! let parser = MarkupParser::new(MarkupSettings::default());
//! let markup = parser.parse_str("<div wicket:id=\"a\"><span wicket:id=\"b\"></span></div>").unwrap();
//! assert_eq!(markup.find_component_index("a/b"), Some(1));
//! ```

pub mod cache;
pub mod class;
pub mod core;
pub mod error;
pub mod filter;
pub mod index;
pub mod inherit;
pub mod markup;
pub mod parser;
pub mod resource;
pub mod settings;

pub use cache::{CacheEntry, CacheKey, DefaultMarkupLoader, MarkupCache, MarkupLoader};
pub use class::{ClassKind, ContainerInfo, MarkupClass};
pub use error::{InheritanceError, MarkupError, ResourceError, Result};
pub use filter::{FilterChain, MarkupFilter, ParseContext, Upstream};
pub use index::ComponentPathIndex;
pub use inherit::{is_inherited, merge};
pub use markup::{Markup, MarkupElement, MarkupFragment, MarkupStream, RawMarkup, Tag, TagBuilder, TagInfo, TagKind};
pub use parser::{parse_parallel, parse_strs_parallel, MarkupParser};
pub use resource::{
    DirectoryLocator, FileResource, MarkupResourceStream, MemoryLocator, ModificationWatcher, ResourceInfo,
    ResourceLocator, StringResource,
};
pub use settings::{MarkupSettings, DEFAULT_NAMESPACE};
