//! Markup assembly
//!
//! [`MarkupParser`] drives the head of the filter chain. Every tag that
//! carries a component id or was modified by a filter is cut out of the
//! text; everything in between (including plain tags nobody touched) stays
//! raw markup. The accepted sequence is then nested into fragments.
//!
//! ```text
//! bytes ─decode─► text ─tokenizer─► filters ─assembler─► items ─tree─► Markup
//! ```

pub mod balance;
pub mod parallel;
pub mod text;
pub mod tree;

use std::borrow::Cow;
use std::sync::Arc;

use crate::class::ContainerInfo;
use crate::core::encoding::{decode_markup, read_xml_declaration};
use crate::core::tokenizer::Tokenizer;
use crate::error::{MarkupError, Result};
use crate::filter::{Filter, FilterChain, MarkupFilter, ParseContext};
use crate::markup::{Markup, MarkupElement, MarkupFragment, RawMarkup, TagKind};
use crate::resource::{MarkupResourceStream, ResourceInfo};
use crate::settings::MarkupSettings;

use balance::{CloseResult, TagStack};
use tree::{build_tree, FlatItem};

pub use parallel::{parse_parallel, parse_strs_parallel};

/// Creates one instance of a custom filter per parse
pub type FilterFactory = Arc<dyn Fn() -> Box<dyn MarkupFilter> + Send + Sync>;

/// Resource name used for markup parsed from a plain string
pub const STRING_RESOURCE: &str = "<string>";

/// Markup parser
///
/// Holds the settings and the custom filters; every parse builds a fresh
/// filter chain, so one parser can be shared across threads.
///
/// # Example
///
/// ```
/// use tagweave::parser::MarkupParser;
/// use tagweave::MarkupSettings;
///
/// let parser = MarkupParser::new(MarkupSettings::default());
/// let markup = parser.parse_str("<p><span wicket:id=\"label\">x</span></p>").unwrap();
/// assert!(markup.find_component_index("label").is_some());
/// ```
#[derive(Clone)]
pub struct MarkupParser {
    settings: MarkupSettings,
    filters: Vec<FilterFactory>,
}

impl MarkupParser {
    pub fn new(settings: MarkupSettings) -> Self {
        MarkupParser {
            settings,
            filters: Vec::new(),
        }
    }

    pub fn settings(&self) -> &MarkupSettings {
        &self.settings
    }

    /// Add a custom filter to every future parse. The factory is called
    /// once here to validate the filter's priority.
    pub fn register_filter<F>(&mut self, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn MarkupFilter> + Send + Sync + 'static,
    {
        let probe = factory();
        if probe.priority() == 0 {
            return Err(MarkupError::InvalidFilterPriority {
                name: probe.name().to_string(),
                priority: 0,
            });
        }
        self.filters.push(Arc::new(factory));
        Ok(())
    }

    /// The filter chain one parse runs through
    pub fn filter_chain(&self, container: Option<&ContainerInfo>) -> Result<FilterChain> {
        let mut chain = FilterChain::with_defaults(&self.settings, container);
        for factory in &self.filters {
            chain.register(Filter::custom(factory()))?;
        }
        Ok(chain)
    }

    /// Parse markup text that is not backed by a resource
    pub fn parse_str(&self, input: &str) -> Result<Arc<Markup>> {
        let declaration = read_xml_declaration(input.as_bytes()).map(|d| d.text);
        self.assemble(input, None, declaration, ResourceInfo::named(STRING_RESOURCE), None)
    }

    /// Decode and parse raw bytes
    pub fn parse_bytes(&self, input: &[u8], resource: ResourceInfo) -> Result<Arc<Markup>> {
        let decoded = decode_markup(input, None, &self.settings.default_encoding, &resource.name)?;
        self.assemble(
            &decoded.text,
            Some(decoded.encoding),
            decoded.xml_declaration,
            resource,
            None,
        )
    }

    /// Read, decode and parse a markup resource. With a container, the
    /// container-dependent filters (body, page header) take part and the
    /// markup is attributed to the container's class.
    pub fn parse_resource(
        &self,
        resource: &dyn MarkupResourceStream,
        container: Option<&ContainerInfo>,
    ) -> Result<Arc<Markup>> {
        let mut info = resource.info().clone();
        if info.markup_class.is_none() {
            info.markup_class = container.map(|c| c.class().name().to_string());
        }
        let bytes = resource.open()?;
        let decoded = decode_markup(
            &bytes,
            resource.encoding(),
            &self.settings.default_encoding,
            &info.name,
        )?;
        self.assemble(
            &decoded.text,
            Some(decoded.encoding),
            decoded.xml_declaration,
            info,
            container,
        )
    }

    fn assemble(
        &self,
        text: &str,
        encoding: Option<String>,
        xml_declaration: Option<String>,
        resource: ResourceInfo,
        container: Option<&ContainerInfo>,
    ) -> Result<Arc<Markup>> {
        let mut chain = self.filter_chain(container)?;
        let mut context = ParseContext::new(self.settings.namespace.clone(), container.cloned());
        let mut assembler = Assembler {
            settings: &self.settings,
            tokenizer: Tokenizer::new(text),
            items: Vec::new(),
            accepted: TagStack::new(),
            compressor: text::WhitespaceCompressor::default(),
        };

        if let Err(cause) = assembler.run(&mut chain, &mut context) {
            let index = assembler.items.len().saturating_sub(1);
            let partial = assembler.into_partial();
            let partial = Markup::new(
                partial,
                encoding,
                xml_declaration,
                context.namespace().to_string(),
                resource.clone(),
            )
            .into_shared();
            tracing::debug!(resource = %resource.name, index, error = %cause, "markup parse failed");
            return Err(MarkupError::Failed {
                resource: resource.name,
                index,
                partial,
                cause: Box::new(cause),
            });
        }

        let items = assembler.items;
        let accepted = items.len();
        let root = build_tree(items, resource.markup_class.clone(), text)?;
        tracing::debug!(
            resource = %resource.name,
            bytes = text.len(),
            accepted,
            namespace = context.namespace(),
            "parsed markup"
        );
        Ok(Markup::new(
            root,
            encoding,
            xml_declaration,
            context.namespace().to_string(),
            resource,
        )
        .into_shared())
    }
}

impl std::fmt::Debug for MarkupParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupParser")
            .field("settings", &self.settings)
            .field("custom_filters", &self.filters.len())
            .finish()
    }
}

/// Per-parse assembly state
struct Assembler<'s, 'a> {
    settings: &'s MarkupSettings,
    tokenizer: Tokenizer<'a>,
    items: Vec<FlatItem>,
    /// Open tags and whether each was accepted, so a close tag follows its
    /// open tag into (or out of) the accepted sequence
    accepted: TagStack<bool>,
    compressor: text::WhitespaceCompressor,
}

impl<'s, 'a> Assembler<'s, 'a> {
    fn run(&mut self, chain: &mut FilterChain, context: &mut ParseContext) -> Result<()> {
        while let Some(tag) = chain.next_tag(&mut self.tokenizer, context)? {
            if tag.is_ignored() {
                let before = self.tokenizer.input_from_position_marker(tag.pos());
                self.push_raw(before);
                self.advance_marker(tag.end());
                continue;
            }

            let own = tag.id().is_some() || tag.is_modified();
            let accept = match tag.kind() {
                TagKind::Open => {
                    self.accepted.push(tag.namespace(), tag.name(), own);
                    own
                }
                TagKind::OpenClose => own,
                TagKind::Close => match self.accepted.close(tag.namespace(), tag.name()) {
                    CloseResult::Matched { open, .. } => open.data,
                    _ => own,
                },
            };
            if !accept {
                continue;
            }

            let before = self.tokenizer.input_from_position_marker(tag.pos());
            self.push_raw(before);
            self.advance_marker(tag.end());
            if tag.namespace().is_none() && tag.name().eq_ignore_ascii_case("pre") {
                match tag.kind() {
                    TagKind::Open => self.compressor.observe_pre(true),
                    TagKind::Close => self.compressor.observe_pre(false),
                    TagKind::OpenClose => {}
                }
            }
            self.items.push(FlatItem::Tag(tag));
        }

        let rest = self.tokenizer.input_from_position_marker(self.tokenizer.input().len());
        self.push_raw(rest);
        Ok(())
    }

    fn advance_marker(&mut self, to: usize) {
        let to = to.max(self.tokenizer.position_marker());
        self.tokenizer.set_position_marker(to);
    }

    fn push_raw(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        let mut raw = Cow::Borrowed(chunk);
        if self.settings.strip_comments {
            raw = Cow::Owned(text::strip_comments(&raw).into_owned());
        }
        if self.settings.compress_whitespace {
            raw = Cow::Owned(self.compressor.compress(&raw).into_owned());
        }
        if !raw.is_empty() {
            self.items.push(FlatItem::Raw(RawMarkup::new(raw.as_ref())));
        }
    }

    /// Everything built so far, unnested, plus the unread rest as raw text
    fn into_partial(mut self) -> MarkupFragment {
        let rest = self.tokenizer.input_from_position_marker(self.tokenizer.input().len());
        if !rest.is_empty() {
            self.items.push(FlatItem::Raw(RawMarkup::new(rest)));
        }
        let elements = self
            .items
            .into_iter()
            .map(|item| match item {
                FlatItem::Tag(tag) => MarkupElement::Tag(Arc::new(tag.freeze())),
                FlatItem::Raw(raw) => MarkupElement::Raw(raw),
            })
            .collect();
        MarkupFragment::new_root(elements, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassKind, MarkupClass};
    use crate::filter::Upstream;
    use crate::markup::TagBuilder;
    use crate::resource::StringResource;

    fn parse(input: &str) -> Arc<Markup> {
        MarkupParser::new(MarkupSettings::default()).parse_str(input).unwrap()
    }

    fn page() -> ContainerInfo {
        ContainerInfo::new(Arc::new(MarkupClass::new("HomePage", ClassKind::Page)))
    }

    #[test]
    fn test_plain_tags_stay_raw() {
        let markup = parse("<html><body><p class=\"x\">Hello</p></body></html>");
        assert_eq!(markup.len(), 1);
        assert!(markup.get(0).unwrap().as_raw().is_some());
    }

    #[test]
    fn test_component_tags_are_cut_out() {
        let input = "<div><span wicket:id=\"label\">text</span></div>";
        let markup = parse(input);
        let kinds: Vec<_> = markup
            .flatten()
            .iter()
            .map(|e| match e {
                MarkupElement::Tag(t) => format!("tag:{}", t.name()),
                MarkupElement::Raw(r) => format!("raw:{}", r.as_str()),
                MarkupElement::Fragment(_) => "fragment".to_string(),
            })
            .collect();
        assert_eq!(kinds, vec!["raw:<div>", "tag:span", "raw:text", "tag:span", "raw:</div>"]);
        assert_eq!(markup.to_markup_string(), input);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let input = "<?xml version=\"1.0\"?>\n<!DOCTYPE html>\n<html xmlns:wicket>\
                     <head><title>T</title></head><body>\n<!-- c -->\
                     <div wicket:id=\"a\"><img src=\"x.png\"><br/><input wicket:id=\"b\"></div>\
                     <wicket:enclosure child=\"c\"><span wicket:id=\"c\"/></wicket:enclosure></body></html>";
        let markup = parse(input);
        assert_eq!(markup.to_markup_string(), input);
        assert_eq!(markup.xml_declaration(), Some("<?xml version=\"1.0\"?>"));
    }

    #[test]
    fn test_reassembly_is_idempotent() {
        let input = "<div wicket:id=\"a\"><td/><wicket:message key=\"k\">m</wicket:message></div>";
        let first = parse(input);
        let second = parse(&first.to_markup_string());
        let third = parse(&second.to_markup_string());
        assert_eq!(first.to_markup_string(), second.to_markup_string());
        assert_eq!(second.root(), third.root());
    }

    #[test]
    fn test_unbalanced_input_fails_with_balance_error() {
        let err = MarkupParser::new(MarkupSettings::default()).parse_str("<a><b></a>").unwrap_err();
        assert!(matches!(err.root_cause(), MarkupError::Balance { .. }));
        assert!(err.position().is_some());
    }

    #[test]
    fn test_failure_keeps_partial_markup() {
        let input = "<div wicket:id=\"a\">x</div><span wicket:id=\"\">";
        let err = MarkupParser::new(MarkupSettings::default()).parse_str(input).unwrap_err();
        let MarkupError::Failed { resource, partial, index, cause } = err else {
            panic!("expected a failed parse");
        };
        assert_eq!(resource, STRING_RESOURCE);
        assert!(matches!(*cause, MarkupError::Namespace { .. }));
        assert_eq!(index, 2);
        assert_eq!(partial.to_markup_string(), input);
    }

    #[test]
    fn test_remove_region_dropped() {
        let markup = parse("<p>a</p><wicket:remove><b>preview</b></wicket:remove><p>b</p>");
        assert_eq!(markup.to_markup_string(), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_void_component_without_close() {
        let markup = parse("<form wicket:id=\"f\"><input wicket:id=\"name\"></form>");
        let input = markup
            .root()
            .find_fragment(|t| t.id() == Some("name"))
            .unwrap();
        assert!(input.tag().unwrap().has_no_close_tag());
    }

    #[test]
    fn test_raw_transforms() {
        let settings = MarkupSettings::default()
            .with_strip_comments(true)
            .with_compress_whitespace(true);
        let parser = MarkupParser::new(settings);
        let markup = parser
            .parse_str("<p>a   b</p><!-- gone --><pre>  x  </pre><span wicket:id=\"s\">\n\n</span>")
            .unwrap();
        assert_eq!(markup.to_markup_string(), "<p>a b</p><pre>  x  </pre><span wicket:id=\"s\">\n</span>");
    }

    #[test]
    fn test_compression_skips_pre_split_by_components() {
        let parser = MarkupParser::new(MarkupSettings::default().with_compress_whitespace(true));

        let component_pre = "<pre wicket:id=\"code\">  a    b\n\n  c</pre>";
        let markup = parser.parse_str(&format!("{component_pre}   after")).unwrap();
        assert_eq!(markup.to_markup_string(), format!("{component_pre} after"));

        let pre_with_component = "<pre>  x  <span wicket:id=\"s\">  y  </span>  z  </pre>";
        let markup = parser.parse_str(&format!("before   {pre_with_component}\n\n  done")).unwrap();
        assert_eq!(markup.to_markup_string(), format!("before {pre_with_component}\ndone"));
    }

    #[test]
    fn test_namespace_from_html_tag() {
        let markup = parse("<html xmlns:wcn=\"http://wicket.apache.org\"><span wcn:id=\"a\"></span></html>");
        assert_eq!(markup.namespace(), "wcn");
        assert!(markup.find_component_index("a").is_some());
    }

    #[test]
    fn test_page_gets_header_and_body() {
        let parser = MarkupParser::new(MarkupSettings::default());
        let resource = StringResource::new("HomePage.html", "<html><body onload=\"x\">hi</body></html>");
        let markup = parser.parse_resource(&resource, Some(&page())).unwrap();
        assert_eq!(markup.markup_class(), Some("HomePage"));
        assert!(markup.find_component_index("_header").is_some());
        assert!(markup.find_component_index("_body").is_some());
        assert_eq!(markup.to_markup_string(), "<html><head></head><body onload=\"x\">hi</body></html>");
    }

    #[test]
    fn test_context_path_rewrites_are_accepted() {
        let parser = MarkupParser::new(MarkupSettings::default().with_context_path("/app"));
        let markup = parser.parse_str("<a href=\"x.html\">x</a><img src=\"/abs.png\">").unwrap();
        assert_eq!(markup.to_markup_string(), "<a href=\"/app/x.html\">x</a><img src=\"/abs.png\">");
        assert_eq!(markup.get(0).and_then(MarkupElement::as_tag).map(|t| t.name()), Some("a"));
    }

    struct Upper;

    impl MarkupFilter for Upper {
        fn name(&self) -> &str {
            "Upper"
        }

        fn priority(&self) -> u32 {
            95
        }

        fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
            let tag = upstream.next_tag()?;
            Ok(tag.map(|mut t| {
                if t.name() == "b" && !t.is_close() {
                    t.set_attribute("class", "loud");
                }
                t
            }))
        }
    }

    #[test]
    fn test_custom_filter_participates() {
        let mut parser = MarkupParser::new(MarkupSettings::default());
        parser.register_filter(|| Box::new(Upper)).unwrap();
        let markup = parser.parse_str("<b>x</b>").unwrap();
        assert_eq!(markup.to_markup_string(), "<b class=\"loud\">x</b>");
        let chain = parser.filter_chain(None).unwrap();
        assert_eq!(chain.names().last().copied(), Some("Upper"));
    }

    struct Zero;

    impl MarkupFilter for Zero {
        fn name(&self) -> &str {
            "Zero"
        }

        fn priority(&self) -> u32 {
            0
        }

        fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
            upstream.next_tag()
        }
    }

    #[test]
    fn test_zero_priority_filter_rejected() {
        let mut parser = MarkupParser::new(MarkupSettings::default());
        assert!(parser.register_filter(|| Box::new(Zero)).is_err());
    }
}
