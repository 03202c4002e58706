//! Registry of lazily loaded editor components with a bounded preload queue.

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

use super::cache::{CacheEntryType, CacheService};

pub const MAX_CONCURRENT_PRELOADS: usize = 3;
pub const FREQUENT_PRIORITY: u8 = 80;
const USE_PRIORITY_BOOST: u8 = 5;
const COMPONENT_CACHE_SIZE: u64 = 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LazyLoadError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
    #[error("Failed to load component '{name}': {reason}")]
    LoadFailed { name: String, reason: String },
}

/// Fetches the module behind a component path.
pub trait ComponentLoader {
    fn load(&mut self, path: &str) -> Result<Value, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    pub name: String,
    pub path: String,
    pub priority: u8,
    pub preload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LazyLoadStats {
    pub registered: usize,
    pub loading: usize,
    pub queued: usize,
}

#[derive(Debug, Default)]
pub struct LazyLoadService {
    components: HashMap<String, ComponentSpec>,
    queue: VecDeque<String>,
    loading: HashSet<String>,
    loaded: HashSet<String>,
}

fn cache_key(path: &str) -> String {
    format!("component:{}", path)
}

impl LazyLoadService {
    pub fn new() -> Self {
        LazyLoadService::default()
    }

    /// Registers a component; preload components join the queue ordered by
    /// priority, highest first.
    pub fn register(&mut self, spec: ComponentSpec) {
        let name = spec.name.clone();
        let preload = spec.preload;
        let priority = spec.priority;
        self.components.insert(name.clone(), spec);
        if preload && !self.queue.contains(&name) && !self.loaded.contains(&name) {
            let at = self
                .queue
                .iter()
                .position(|queued| self.priority(queued).unwrap_or(0) < priority)
                .unwrap_or(self.queue.len());
            self.queue.insert(at, name);
        }
    }

    pub fn priority(&self, name: &str) -> Option<u8> {
        self.components.get(name).map(|c| c.priority)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// Takes as many queued names as the concurrency limit allows and marks
    /// them loading.
    pub fn next_batch(&mut self) -> Vec<String> {
        let free = MAX_CONCURRENT_PRELOADS.saturating_sub(self.loading.len());
        let mut batch = Vec::new();
        while batch.len() < free {
            let Some(name) = self.queue.pop_front() else {
                break;
            };
            if self.loaded.contains(&name) || self.loading.contains(&name) {
                continue;
            }
            self.loading.insert(name.clone());
            batch.push(name);
        }
        batch
    }

    /// Finishes a load started by [`next_batch`](Self::next_batch) and caches
    /// the module on success.
    pub fn complete(
        &mut self,
        name: &str,
        result: Result<Value, String>,
        cache: &mut CacheService,
    ) -> Result<(), LazyLoadError> {
        self.loading.remove(name);
        let spec = self
            .components
            .get(name)
            .ok_or_else(|| LazyLoadError::UnknownComponent(name.to_string()))?;
        match result {
            Ok(module) => {
                cache.set(
                    &cache_key(&spec.path),
                    module,
                    COMPONENT_CACHE_SIZE,
                    CacheEntryType::Component,
                    Some(spec.priority),
                );
                self.loaded.insert(name.to_string());
                Ok(())
            }
            Err(reason) => Err(LazyLoadError::LoadFailed {
                name: name.to_string(),
                reason,
            }),
        }
    }

    /// Loads the whole preload queue, batch by batch. Failures are logged and
    /// skipped. Returns the number of components loaded.
    pub fn drain_preloads(&mut self, loader: &mut dyn ComponentLoader, cache: &mut CacheService) -> usize {
        let mut loaded = 0;
        loop {
            let batch = self.next_batch();
            if batch.is_empty() {
                break;
            }
            for name in batch {
                let Some(path) = self.components.get(&name).map(|c| c.path.clone()) else {
                    self.loading.remove(&name);
                    continue;
                };
                match self.complete(&name, loader.load(&path), cache) {
                    Ok(()) => loaded += 1,
                    Err(e) => log::warn!("{}", e),
                }
            }
        }
        loaded
    }

    /// Returns the module for `name`, from the cache when present.
    pub fn load(
        &mut self,
        name: &str,
        loader: &mut dyn ComponentLoader,
        cache: &mut CacheService,
    ) -> Result<Value, LazyLoadError> {
        let path = self
            .components
            .get(name)
            .map(|c| c.path.clone())
            .ok_or_else(|| LazyLoadError::UnknownComponent(name.to_string()))?;
        if let Some(module) = cache.get(&cache_key(&path)) {
            return Ok(module.clone());
        }
        self.loading.insert(name.to_string());
        let module = loader.load(&path);
        self.complete(name, module.clone(), cache)?;
        module.map_err(|reason| LazyLoadError::LoadFailed {
            name: name.to_string(),
            reason,
        })
    }

    /// Records a use of the component, raising its priority.
    pub fn use_component(&mut self, name: &str) -> Option<u8> {
        let spec = self.components.get_mut(name)?;
        spec.priority = spec.priority.saturating_add(USE_PRIORITY_BOOST).min(100);
        Some(spec.priority)
    }

    pub fn is_frequent(&self, name: &str) -> bool {
        self.priority(name).map_or(false, |p| p >= FREQUENT_PRIORITY)
    }

    pub fn frequent_components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .components
            .values()
            .filter(|c| c.priority >= FREQUENT_PRIORITY)
            .map(|c| c.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn stats(&self) -> LazyLoadStats {
        LazyLoadStats {
            registered: self.components.len(),
            loading: self.loading.len(),
            queued: self.queue.len(),
        }
    }

    /// Forgets load state; registrations are kept.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.loading.clear();
        self.loaded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::services::ManualClock;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeLoader {
        calls: Vec<String>,
        failing: Option<&'static str>,
    }

    impl ComponentLoader for FakeLoader {
        fn load(&mut self, path: &str) -> Result<Value, String> {
            self.calls.push(path.to_string());
            if self.failing == Some(path) {
                return Err("network error".to_string());
            }
            Ok(json!({ "module": path }))
        }
    }

    fn spec(name: &str, priority: u8, preload: bool) -> ComponentSpec {
        ComponentSpec {
            name: name.to_string(),
            path: format!("./{}", name),
            priority,
            preload,
        }
    }

    fn cache() -> CacheService {
        CacheService::new(Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn preloads_run_in_priority_order_and_bounded_batches() {
        let mut lazy = LazyLoadService::new();
        for (name, priority) in [("a", 10), ("b", 90), ("c", 50), ("d", 70), ("e", 20)] {
            lazy.register(spec(name, priority, true));
        }
        lazy.register(spec("manual", 99, false));

        let batch = lazy.next_batch();
        assert_eq!(batch, vec!["b", "d", "c"]);
        assert!(lazy.next_batch().is_empty());
        assert_eq!(lazy.stats(), LazyLoadStats { registered: 6, loading: 3, queued: 2 });
    }

    #[test]
    fn drain_caches_modules_and_skips_failures() {
        let mut lazy = LazyLoadService::new();
        let mut cache = cache();
        for name in ["a", "b", "c", "d"] {
            lazy.register(spec(name, 50, true));
        }
        let mut loader = FakeLoader {
            failing: Some("./c"),
            ..FakeLoader::default()
        };

        assert_eq!(lazy.drain_preloads(&mut loader, &mut cache), 3);
        assert_eq!(loader.calls.len(), 4);
        let entry = cache.entry("component:./a").unwrap();
        assert_eq!(entry.size, 1024);
        assert_eq!(entry.entry_type, CacheEntryType::Component);
        assert!(!lazy.is_loaded("c"));
        assert_eq!(lazy.stats().loading, 0);
    }

    #[test]
    fn load_uses_the_cache_after_the_first_call() {
        let mut lazy = LazyLoadService::new();
        let mut cache = cache();
        let mut loader = FakeLoader::default();
        lazy.register(spec("grid", 40, false));

        lazy.load("grid", &mut loader, &mut cache).unwrap();
        lazy.load("grid", &mut loader, &mut cache).unwrap();
        assert_eq!(loader.calls, vec!["./grid"]);
        assert_eq!(
            lazy.load("nope", &mut loader, &mut cache),
            Err(LazyLoadError::UnknownComponent("nope".to_string()))
        );
    }

    #[test]
    fn usage_raises_priority_until_frequent() {
        let mut lazy = LazyLoadService::new();
        lazy.register(spec("video", 72, false));
        assert!(!lazy.is_frequent("video"));
        lazy.use_component("video");
        assert_eq!(lazy.use_component("video"), Some(82));
        assert!(lazy.is_frequent("video"));
        assert_eq!(lazy.frequent_components(), vec!["video"]);
        for _ in 0..10 {
            lazy.use_component("video");
        }
        assert_eq!(lazy.priority("video"), Some(100));
        assert_eq!(lazy.use_component("missing"), None);
    }
}
