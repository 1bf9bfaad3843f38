//! Markup loading for the cache
//!
//! The default loader locates a class's own markup, parses it, and for
//! inherited markup resolves the base through the cache (re-entering it on
//! the same thread) before merging.

use std::sync::Arc;

use super::MarkupCache;
use crate::class::ContainerInfo;
use crate::error::{InheritanceError, Result};
use crate::inherit::{is_inherited, merge};
use crate::markup::Markup;
use crate::parser::MarkupParser;
use crate::resource::ResourceLocator;

/// Produces the markup of a container on a cache miss
pub trait MarkupLoader: Send + Sync {
    /// `Ok(None)` means no markup exists for the container
    fn load(&self, cache: &MarkupCache, container: &ContainerInfo) -> Result<Option<Arc<Markup>>>;
}

/// Locate, parse and merge
pub struct DefaultMarkupLoader {
    parser: MarkupParser,
    locator: Box<dyn ResourceLocator>,
}

impl DefaultMarkupLoader {
    pub fn new(parser: MarkupParser, locator: impl ResourceLocator + 'static) -> Self {
        DefaultMarkupLoader {
            parser,
            locator: Box::new(locator),
        }
    }

    pub fn parser(&self) -> &MarkupParser {
        &self.parser
    }
}

impl MarkupLoader for DefaultMarkupLoader {
    fn load(&self, cache: &MarkupCache, container: &ContainerInfo) -> Result<Option<Arc<Markup>>> {
        let key = container.cache_key();
        let Some(resource) = self.locator.locate(container, container.class()) else {
            // A class without markup of its own uses its nearest ancestor's
            let Some(parent) = container.for_parent() else {
                tracing::debug!(class = %container.class(), "no markup found");
                return Ok(None);
            };
            let inherited = cache.get_markup(&parent)?;
            cache.add_dependency(&parent.cache_key(), key);
            return Ok(inherited);
        };

        let markup = self.parser.parse_resource(resource.as_ref(), Some(container))?;
        cache.watch(key.clone(), resource);
        if !is_inherited(&markup) {
            return Ok(Some(markup));
        }

        let missing_base = || InheritanceError::MissingBase {
            class: container.class().name().to_string(),
        };
        let parent = container.for_parent().ok_or_else(missing_base)?;
        let base = cache.get_markup(&parent)?.ok_or_else(missing_base)?;
        cache.add_dependency(&parent.cache_key(), key);
        tracing::debug!(class = %container.class(), base = %parent.class(), "merging inherited markup");
        merge(&markup, &base, container.class().is_page()).map(Some)
    }
}

impl std::fmt::Debug for DefaultMarkupLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultMarkupLoader").finish_non_exhaustive()
    }
}
