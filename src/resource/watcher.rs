//! Resource change watching
//!
//! Polls the last-modified time of watched resources and calls their
//! listeners when it changes. Polling happens on demand via
//! [`ModificationWatcher::poll`] or on a background thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use super::{MarkupResourceStream, ResourceInfo};

/// Called with the changed resource's identity
pub type ChangeListener = Arc<dyn Fn(&ResourceInfo) + Send + Sync>;

struct Watched {
    resource: Box<dyn MarkupResourceStream>,
    last_modified: Option<SystemTime>,
    listeners: Vec<ChangeListener>,
}

/// Watches resources for modification
#[derive(Default)]
pub struct ModificationWatcher {
    watched: Mutex<HashMap<String, Watched>>,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ModificationWatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Watch `resource`, keyed by its name. If the name is already watched
    /// `listener` joins the existing entry and false is returned.
    pub fn watch(&self, resource: Box<dyn MarkupResourceStream>, listener: ChangeListener) -> bool {
        let mut watched = self.watched.lock();
        let name = resource.info().name.clone();
        if let Some(entry) = watched.get_mut(&name) {
            entry.listeners.push(listener);
            tracing::trace!(resource = %name, listeners = entry.listeners.len(), "added markup resource listener");
            return false;
        }
        let last_modified = resource.last_modified();
        tracing::trace!(resource = %name, "watching markup resource");
        watched.insert(
            name,
            Watched {
                resource,
                last_modified,
                listeners: vec![listener],
            },
        );
        true
    }

    /// Number of listeners registered for `name`
    pub fn listener_count(&self, name: &str) -> usize {
        self.watched.lock().get(name).map_or(0, |entry| entry.listeners.len())
    }

    pub fn unwatch(&self, name: &str) -> bool {
        self.watched.lock().remove(name).is_some()
    }

    pub fn is_watching(&self, name: &str) -> bool {
        self.watched.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.watched.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.lock().is_empty()
    }

    /// Check every watched resource once and notify listeners of those that
    /// changed. Listeners run after the watch list is unlocked, so they may
    /// watch or unwatch resources. Returns the number of changed resources.
    pub fn poll(&self) -> usize {
        let changed: Vec<(ResourceInfo, Vec<ChangeListener>)> = {
            let mut watched = self.watched.lock();
            watched
                .values_mut()
                .filter_map(|entry| {
                    let current = entry.resource.last_modified();
                    if current == entry.last_modified {
                        return None;
                    }
                    entry.last_modified = current;
                    Some((entry.resource.info().clone(), entry.listeners.clone()))
                })
                .collect()
        };
        for (info, listeners) in &changed {
            tracing::debug!(resource = %info.name, listeners = listeners.len(), "markup resource modified");
            for listener in listeners {
                listener(info);
            }
        }
        changed.len()
    }

    /// Poll every `interval` on a background thread until [`stop`] is
    /// called or the watcher is dropped. Does nothing if already started.
    ///
    /// [`stop`]: ModificationWatcher::stop
    pub fn start(self: &Arc<Self>, interval: Duration) -> std::io::Result<()> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Ok(());
        }
        self.stop.store(false, Ordering::SeqCst);
        let watcher: Weak<ModificationWatcher> = Arc::downgrade(self);
        let stop = self.stop.clone();
        let handle = std::thread::Builder::new()
            .name("tagweave-watcher".to_string())
            .spawn(move || loop {
                std::thread::sleep(interval);
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                match watcher.upgrade() {
                    Some(watcher) => {
                        watcher.poll();
                    }
                    None => break,
                }
            })?;
        *thread = Some(handle);
        Ok(())
    }

    /// Stop the background thread and wait for it to finish
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ModificationWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ModificationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModificationWatcher")
            .field("watched", &self.len())
            .field("running", &self.thread.lock().is_some())
            .finish()
    }
}
