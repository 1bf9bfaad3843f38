//! Tag filter chain
//!
//! Filters sit on top of the tokenizer, ordered by priority. The tokenizer
//! has priority 0; a filter with a higher priority sits further from it and
//! pulls tags from everything below it:
//!
//! ```text
//! assembler
//!    ▲ next_tag()
//! ContextPathHandler (100)
//!    ▲
//! EnclosureHandler (90)
//!    ▲
//!   ...
//!    ▲
//! TagTypeHandler (10)
//!    ▲
//! Tokenizer (0)
//! ```
//!
//! Built-in filters are variants of the closed [`Filter`] enum and are
//! dispatched statically. [`MarkupFilter`] is the seam for filters defined
//! outside this crate (`Filter::Custom`).

pub mod balance;
pub mod body;
pub mod context_path;
pub mod enclosure;
pub mod header;
pub mod message;
pub mod namespace;
pub mod remove;
pub mod reserved;
pub mod tag_type;

use crate::class::ContainerInfo;
use crate::core::tokenizer::Tokenizer;
use crate::error::{MarkupError, Result, SourcePos};
use crate::markup::{TagBuilder, TagInfo};
use crate::settings::MarkupSettings;

pub use balance::BalanceHandler;
pub use body::BodyHandler;
pub use context_path::ContextPathHandler;
pub use enclosure::EnclosureHandler;
pub use header::HeaderSectionHandler;
pub use message::MessageHandler;
pub use namespace::NamespaceHandler;
pub use remove::RemoveHandler;
pub use reserved::ReservedTagIdentifier;
pub use tag_type::TagTypeHandler;

/// A tag filter
pub trait MarkupFilter: Send {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Position in the chain; must be greater than 0
    fn priority(&self) -> u32;

    /// Return the next tag, pulling from `upstream` as needed. The filter
    /// may pass tags through, change them, drop them or inject new ones.
    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>>;
}

/// State shared by all filters of one parse
#[derive(Debug, Clone)]
pub struct ParseContext {
    namespace: String,
    container: Option<ContainerInfo>,
}

impl ParseContext {
    pub fn new(namespace: impl Into<String>, container: Option<ContainerInfo>) -> Self {
        ParseContext {
            namespace: namespace.into(),
            container,
        }
    }

    /// Active reserved-namespace prefix
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.namespace = namespace.into();
    }

    pub fn container(&self) -> Option<&ContainerInfo> {
        self.container.as_ref()
    }

    pub fn is_page(&self) -> bool {
        self.container.as_ref().is_some_and(|c| c.class().is_page())
    }

    /// True if the tag carries the reserved namespace prefix
    pub fn is_reserved(&self, tag: &TagInfo) -> bool {
        tag.namespace()
            .is_some_and(|ns| ns.eq_ignore_ascii_case(&self.namespace))
    }

    /// True if the tag is the reserved tag `<ns:name>`
    pub fn is_reserved_named(&self, tag: &TagInfo, name: &str) -> bool {
        self.is_reserved(tag) && tag.name().eq_ignore_ascii_case(name)
    }

    /// `<ns>:<local>` attribute name
    pub fn attribute_name(&self, local: &str) -> String {
        format!("{}:{local}", self.namespace)
    }
}

/// The part of the chain below a filter
pub struct Upstream<'c, 'a> {
    filters: &'c mut [Filter],
    tokenizer: &'c mut Tokenizer<'a>,
    context: &'c mut ParseContext,
}

impl<'c, 'a> Upstream<'c, 'a> {
    /// Pull the next tag from the filter directly below (or the tokenizer)
    pub fn next_tag(&mut self) -> Result<Option<TagBuilder>> {
        match self.filters.split_last_mut() {
            Some((filter, below)) => {
                let mut upstream = Upstream {
                    filters: below,
                    tokenizer: &mut *self.tokenizer,
                    context: &mut *self.context,
                };
                filter.next_tag(&mut upstream)
            }
            None => self.tokenizer.next_tag(),
        }
    }

    pub fn context(&self) -> &ParseContext {
        &*self.context
    }

    pub fn context_mut(&mut self) -> &mut ParseContext {
        &mut *self.context
    }

    /// The decoded text being parsed
    pub fn source(&self) -> &'a str {
        self.tokenizer.input()
    }

    pub fn locate(&self, offset: usize) -> SourcePos {
        SourcePos::locate(self.tokenizer.input(), offset)
    }

    /// Namespace error located at `tag`
    pub fn namespace_error(&self, tag: &TagInfo, message: impl Into<String>) -> MarkupError {
        MarkupError::namespace(self.locate(tag.pos()), message, Some(&tag.to_markup_string()))
    }

    /// Balance error located at `tag`
    pub fn balance_error(&self, tag: &TagInfo, message: impl Into<String>) -> MarkupError {
        MarkupError::balance(self.locate(tag.pos()), message, Some(&tag.to_markup_string()))
    }
}

/// A filter in the chain
pub enum Filter {
    TagType(TagTypeHandler),
    Namespace(NamespaceHandler),
    ReservedTag(ReservedTagIdentifier),
    Message(MessageHandler),
    Body(BodyHandler),
    HeaderSection(HeaderSectionHandler),
    Balance(BalanceHandler),
    Remove(RemoveHandler),
    Enclosure(EnclosureHandler),
    ContextPath(ContextPathHandler),
    Custom(Box<dyn MarkupFilter>),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $call:expr) => {
        match $self {
            Filter::TagType($f) => $call,
            Filter::Namespace($f) => $call,
            Filter::ReservedTag($f) => $call,
            Filter::Message($f) => $call,
            Filter::Body($f) => $call,
            Filter::HeaderSection($f) => $call,
            Filter::Balance($f) => $call,
            Filter::Remove($f) => $call,
            Filter::Enclosure($f) => $call,
            Filter::ContextPath($f) => $call,
            Filter::Custom($f) => $call,
        }
    };
}

impl Filter {
    pub fn custom(filter: Box<dyn MarkupFilter>) -> Self {
        Filter::Custom(filter)
    }

    pub fn name(&self) -> &str {
        dispatch!(self, f => f.name())
    }

    pub fn priority(&self) -> u32 {
        dispatch!(self, f => f.priority())
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        dispatch!(self, f => f.next_tag(upstream))
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.priority())
    }
}

/// Ordered filters of one parse. Index 0 sits directly on the tokenizer;
/// the last filter is the head the assembler pulls from.
#[derive(Debug, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in filters configured for one parse
    pub fn with_defaults(settings: &MarkupSettings, container: Option<&ContainerInfo>) -> Self {
        let mut filters = vec![
            Filter::TagType(TagTypeHandler::new()),
            Filter::Namespace(NamespaceHandler::new(settings.strip_namespace_declaration)),
            Filter::ReservedTag(ReservedTagIdentifier::new(&settings.extra_reserved_tags)),
            Filter::Message(MessageHandler::new()),
            Filter::Balance(BalanceHandler::new()),
            Filter::Remove(RemoveHandler::new()),
            Filter::Enclosure(EnclosureHandler::new()),
        ];
        if container.is_some() {
            filters.push(Filter::Body(BodyHandler::new()));
        }
        if container.is_some_and(|c| c.class().is_page()) {
            filters.push(Filter::HeaderSection(HeaderSectionHandler::new()));
        }
        if let Some(path) = settings.normalized_context_path() {
            filters.push(Filter::ContextPath(ContextPathHandler::new(path)));
        }
        filters.sort_by_key(Filter::priority);
        FilterChain { filters }
    }

    /// Insert a filter by priority: directly above the first filter,
    /// walking down from the head, whose priority is not greater than its own
    pub fn register(&mut self, filter: Filter) -> Result<()> {
        let priority = filter.priority();
        if priority == 0 {
            return Err(MarkupError::InvalidFilterPriority {
                name: filter.name().to_string(),
                priority,
            });
        }
        let at = self.filters.partition_point(|f| f.priority() <= priority);
        tracing::trace!(filter = filter.name(), priority, position = at, "registered markup filter");
        self.filters.insert(at, filter);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names from the tokenizer upward
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(Filter::name).collect()
    }

    /// Pull the next tag from the head of the chain
    pub fn next_tag(
        &mut self,
        tokenizer: &mut Tokenizer<'_>,
        context: &mut ParseContext,
    ) -> Result<Option<TagBuilder>> {
        Upstream {
            filters: self.filters.as_mut_slice(),
            tokenizer,
            context,
        }
        .next_tag()
    }
}
