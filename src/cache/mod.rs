//! Markup cache
//!
//! Memoizes assembled (and merged) markup per [`CacheKey`]. One reentrant
//! mutex guards the whole check, load and store sequence, so a key is
//! loaded at most once at a time and a loader may re-enter the cache on
//! the same thread to resolve a base markup.
//!
//! ```text
//! MarkupCache
//! ├── state: ReentrantMutex<RefCell<CacheState>>
//! │   ├── entries: LruCache<CacheKey, CacheEntry>   # Found(markup) | NotFound
//! │   ├── dependents: base key -> derived keys     # evicted when base changes
//! │   └── containers: key -> ContainerInfo          # to reload on change
//! ├── loader: Box<dyn MarkupLoader>
//! └── watcher: Option<Arc<ModificationWatcher>>
//! ```

pub mod loader;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::ReentrantMutex;

use crate::class::ContainerInfo;
use crate::error::Result;
use crate::markup::Markup;
use crate::resource::{ChangeListener, MarkupResourceStream, ModificationWatcher, ResourceInfo};
use crate::settings::MarkupSettings;

pub use loader::{DefaultMarkupLoader, MarkupLoader};

/// Cache key: owning class, locale, style and markup format.
/// A missing locale or style is a key of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    class: String,
    locale: Option<String>,
    style: Option<String>,
    format: String,
}

impl CacheKey {
    pub fn new(
        class: impl Into<String>,
        locale: Option<String>,
        style: Option<String>,
        format: impl Into<String>,
    ) -> Self {
        CacheKey {
            class: class.into(),
            locale,
            style,
            format: format.into(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class)?;
        if let Some(style) = &self.style {
            write!(f, "_{style}")?;
        }
        if let Some(locale) = &self.locale {
            write!(f, "_{locale}")?;
        }
        write!(f, ".{}", self.format)
    }
}

/// Stored lookup result
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Found(Arc<Markup>),
    /// No markup resource exists for the key
    NotFound,
}

impl CacheEntry {
    pub fn markup(&self) -> Option<&Arc<Markup>> {
        match self {
            CacheEntry::Found(markup) => Some(markup),
            CacheEntry::NotFound => None,
        }
    }
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    dependents: HashMap<CacheKey, HashSet<CacheKey>>,
    containers: HashMap<CacheKey, ContainerInfo>,
    /// Keys with a change listener registered on the watcher
    watched: HashSet<CacheKey>,
}

impl CacheState {
    /// Drop the entries derived from `key`, transitively
    fn evict_dependents(&mut self, key: &CacheKey) -> usize {
        let Some(dependents) = self.dependents.remove(key) else {
            return 0;
        };
        let mut evicted = 0;
        for dependent in dependents {
            if self.entries.pop(&dependent).is_some() {
                evicted += 1;
            }
            evicted += self.evict_dependents(&dependent);
        }
        evicted
    }
}

/// Markup cache service
pub struct MarkupCache {
    state: ReentrantMutex<RefCell<CacheState>>,
    loader: Box<dyn MarkupLoader>,
    watcher: Option<Arc<ModificationWatcher>>,
    this: Weak<MarkupCache>,
}

impl MarkupCache {
    pub fn new(settings: &MarkupSettings, loader: impl MarkupLoader + 'static) -> Arc<Self> {
        Self::build(settings, Box::new(loader), None)
    }

    /// Cache whose loaded resources are watched for modification
    pub fn with_watcher(
        settings: &MarkupSettings,
        loader: impl MarkupLoader + 'static,
        watcher: Arc<ModificationWatcher>,
    ) -> Arc<Self> {
        Self::build(settings, Box::new(loader), Some(watcher))
    }

    fn build(
        settings: &MarkupSettings,
        loader: Box<dyn MarkupLoader>,
        watcher: Option<Arc<ModificationWatcher>>,
    ) -> Arc<Self> {
        let capacity = NonZeroUsize::new(settings.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Arc::new_cyclic(|this| MarkupCache {
            state: ReentrantMutex::new(RefCell::new(CacheState {
                entries: LruCache::new(capacity),
                dependents: HashMap::new(),
                containers: HashMap::new(),
                watched: HashSet::new(),
            })),
            loader,
            watcher,
            this: this.clone(),
        })
    }

    pub fn watcher(&self) -> Option<&Arc<ModificationWatcher>> {
        self.watcher.as_ref()
    }

    /// Cached markup for `key`, or the result of `load`, which is stored.
    /// `Ok(None)` from the loader is stored as [`CacheEntry::NotFound`]; an
    /// error stores nothing, so the next lookup loads again.
    pub fn get_or_load<F>(&self, key: &CacheKey, load: F) -> Result<Option<Arc<Markup>>>
    where
        F: FnOnce() -> Result<Option<Arc<Markup>>>,
    {
        let guard = self.state.lock();
        if let Some(entry) = guard.borrow_mut().entries.get(key) {
            return Ok(entry.markup().cloned());
        }

        let loaded = load()?;
        let entry = match &loaded {
            Some(markup) => CacheEntry::Found(markup.clone()),
            None => CacheEntry::NotFound,
        };
        tracing::info!(key = %key, found = loaded.is_some(), "loaded markup into cache");
        guard.borrow_mut().entries.put(key.clone(), entry);
        Ok(loaded)
    }

    /// Markup for `container`, loaded through the configured loader
    pub fn get_markup(&self, container: &ContainerInfo) -> Result<Option<Arc<Markup>>> {
        let key = container.cache_key();
        let guard = self.state.lock();
        guard
            .borrow_mut()
            .containers
            .entry(key.clone())
            .or_insert_with(|| container.clone());
        self.get_or_load(&key, || self.loader.load(self, container))
    }

    /// Record that the entry under `dependent` was derived from `base`
    pub fn add_dependency(&self, base: &CacheKey, dependent: CacheKey) {
        let guard = self.state.lock();
        guard
            .borrow_mut()
            .dependents
            .entry(base.clone())
            .or_default()
            .insert(dependent);
    }

    /// The resource behind `key` changed: evict every entry derived from
    /// it and reload it (if it was loaded through [`get_markup`]).
    ///
    /// [`get_markup`]: MarkupCache::get_markup
    pub fn notify_changed(&self, key: &CacheKey) -> Result<Option<Arc<Markup>>> {
        let guard = self.state.lock();
        let container = {
            let mut state = guard.borrow_mut();
            let evicted = state.evict_dependents(key);
            state.entries.pop(key);
            tracing::info!(key = %key, evicted, "markup changed; reloading");
            state.containers.get(key).cloned()
        };
        let Some(container) = container else {
            return Ok(None);
        };
        self.get_markup(&container).inspect_err(|err| {
            tracing::warn!(key = %key, error = %err, "reloading changed markup failed");
        })
    }

    /// Watch `resource` and reload `key` when it changes. Several keys may
    /// share one resource; each key is registered once. Does nothing
    /// without a watcher.
    pub fn watch(&self, key: CacheKey, resource: Box<dyn MarkupResourceStream>) {
        let Some(watcher) = &self.watcher else {
            return;
        };
        {
            let guard = self.state.lock();
            if !guard.borrow_mut().watched.insert(key.clone()) {
                return;
            }
        }
        let cache = self.this.clone();
        let listener: ChangeListener = Arc::new(move |_: &ResourceInfo| {
            if let Some(cache) = cache.upgrade() {
                if let Err(err) = cache.notify_changed(&key) {
                    tracing::debug!(key = %key, error = %err, "change listener could not reload markup");
                }
            }
        });
        watcher.watch(resource, listener);
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.evict_dependents(key);
        state.containers.remove(key);
        state.entries.pop(key)
    }

    pub fn clear(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.entries.clear();
        state.dependents.clear();
        state.containers.clear();
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().borrow().entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MarkupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupCache")
            .field("entries", &self.len())
            .field("watched", &self.watcher.is_some())
            .finish()
    }
}
