//! Object-URL and listener bookkeeping with idle-time cleanup.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::cache::CacheService;
use super::services::Clock;

/// How often the host is expected to call [`MemoryManager::check`].
pub const CHECK_INTERVAL_MS: u64 = 30_000;
pub const IDLE_THRESHOLD_MS: u64 = 5 * 60 * 1000;
pub const MAX_OBJECT_URLS: usize = 50;
/// Share of tracked URLs revoked when the limit is exceeded.
const OVERFLOW_REVOKE_RATIO: f64 = 0.2;

/// Releases an object URL in the host environment.
pub trait UrlRevoker: Send + Sync {
    fn revoke(&self, url: &str);
}

/// Revoker for hosts that do not allocate object URLs.
#[derive(Debug, Default)]
pub struct NoopRevoker;

impl UrlRevoker for NoopRevoker {
    fn revoke(&self, _url: &str) {}
}

pub type DetachFn = Box<dyn FnOnce() + Send>;

struct TrackedUrl {
    seq: u64,
    created_at: u64,
    lifespan_ms: Option<u64>,
}

struct ListenerRegistration {
    event: String,
    detach: DetachFn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub object_url_count: usize,
    pub event_listener_groups: usize,
    pub total_event_listeners: usize,
    pub is_idle: bool,
    pub idle_time: u64,
    pub auto_cleanup: bool,
}

pub struct MemoryManager {
    clock: Arc<dyn Clock>,
    revoker: Arc<dyn UrlRevoker>,
    urls: HashMap<String, TrackedUrl>,
    next_seq: u64,
    listeners: HashMap<String, Vec<ListenerRegistration>>,
    last_activity: u64,
    idle: bool,
    enabled: bool,
}

impl MemoryManager {
    pub fn new(clock: Arc<dyn Clock>, revoker: Arc<dyn UrlRevoker>) -> Self {
        let now = clock.now_ms();
        MemoryManager {
            clock,
            revoker,
            urls: HashMap::new(),
            next_seq: 0,
            listeners: HashMap::new(),
            last_activity: now,
            idle: false,
            enabled: true,
        }
    }

    /// Turns automatic cleanup on or off. While off, [`check`](Self::check)
    /// does nothing and exceeding [`MAX_OBJECT_URLS`] revokes nothing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Automatic memory cleanup {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Tracks a `blob:` or `data:` URL. Anything else is ignored and
    /// returns false.
    pub fn register_object_url(&mut self, url: &str, lifespan_ms: Option<u64>) -> bool {
        if !(url.starts_with("blob:") || url.starts_with("data:")) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.urls.insert(
            url.to_string(),
            TrackedUrl {
                seq,
                created_at: self.clock.now_ms(),
                lifespan_ms,
            },
        );
        if self.enabled && self.urls.len() > MAX_OBJECT_URLS {
            self.revoke_oldest();
        }
        true
    }

    pub fn revoke_object_url(&mut self, url: &str) -> bool {
        if self.urls.remove(url).is_some() {
            self.revoker.revoke(url);
            true
        } else {
            false
        }
    }

    pub fn is_tracked(&self, url: &str) -> bool {
        self.urls.contains_key(url)
    }

    fn revoke_oldest(&mut self) {
        let count = (MAX_OBJECT_URLS as f64 * OVERFLOW_REVOKE_RATIO).floor() as usize;
        let mut by_age: Vec<(u64, String)> = self.urls.iter().map(|(url, t)| (t.seq, url.clone())).collect();
        by_age.sort();
        for (_, url) in by_age.into_iter().take(count) {
            self.revoke_object_url(&url);
        }
        log::debug!("Object URL limit exceeded, revoked the {} oldest", count);
    }

    pub fn add_listener(&mut self, component_id: &str, event: &str, detach: DetachFn) {
        self.listeners
            .entry(component_id.to_string())
            .or_default()
            .push(ListenerRegistration {
                event: event.to_string(),
                detach,
            });
    }

    /// Detaches every listener of `component_id`. Returns how many ran.
    pub fn remove_listeners(&mut self, component_id: &str) -> usize {
        let Some(group) = self.listeners.remove(component_id) else {
            return 0;
        };
        let count = group.len();
        for registration in group {
            log::trace!("Detaching '{}' listener of {}", registration.event, component_id);
            (registration.detach)();
        }
        count
    }

    pub fn record_activity(&mut self) {
        self.last_activity = self.clock.now_ms();
        self.idle = false;
    }

    /// The editor's page was hidden: treat it as idle and clean up now.
    pub fn on_visibility_hidden(&mut self) -> usize {
        self.idle = true;
        self.cleanup()
    }

    /// The window lost focus. Marks the editor idle without cleaning up.
    pub fn on_blur(&mut self) {
        self.idle = true;
    }

    /// Periodic check. Runs [`cleanup`](Self::cleanup) once when the user
    /// has just become idle and returns true in that case.
    pub fn check(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        let idle_for = self.clock.now_ms().saturating_sub(self.last_activity);
        if idle_for > IDLE_THRESHOLD_MS && !self.idle {
            self.idle = true;
            let revoked = self.cleanup();
            log::debug!("Editor idle for {} ms, revoked {} expired object URLs", idle_for, revoked);
            return true;
        }
        false
    }

    /// Revokes URLs whose lifespan has elapsed.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .urls
            .iter()
            .filter(|(_, t)| t.lifespan_ms.map_or(false, |life| now.saturating_sub(t.created_at) > life))
            .map(|(url, _)| url.clone())
            .collect();
        for url in &expired {
            self.revoke_object_url(url);
        }
        expired.len()
    }

    /// Revokes every URL, detaches every listener and empties `cache`.
    pub fn full_cleanup<V>(&mut self, cache: &mut CacheService<V>) {
        let urls: Vec<String> = self.urls.keys().cloned().collect();
        for url in &urls {
            self.revoke_object_url(url);
        }
        let ids: Vec<String> = self.listeners.keys().cloned().collect();
        for id in &ids {
            self.remove_listeners(id);
        }
        cache.clear();
        log::info!("Released {} object URLs and {} listener groups", urls.len(), ids.len());
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            object_url_count: self.urls.len(),
            event_listener_groups: self.listeners.len(),
            total_event_listeners: self.listeners.values().map(Vec::len).sum(),
            is_idle: self.idle,
            idle_time: self.clock.now_ms().saturating_sub(self.last_activity),
            auto_cleanup: self.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::services::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRevoker(Mutex<Vec<String>>);

    impl UrlRevoker for RecordingRevoker {
        fn revoke(&self, url: &str) {
            self.0.lock().unwrap().push(url.to_string());
        }
    }

    fn manager() -> (Arc<ManualClock>, Arc<RecordingRevoker>, MemoryManager) {
        let clock = Arc::new(ManualClock::new(0));
        let revoker = Arc::new(RecordingRevoker::default());
        let manager = MemoryManager::new(clock.clone(), revoker.clone());
        (clock, revoker, manager)
    }

    #[test]
    fn only_object_urls_are_tracked() {
        let (_, _, mut memory) = manager();
        assert!(memory.register_object_url("blob:http://localhost/1", None));
        assert!(memory.register_object_url("data:image/png;base64,AA", None));
        assert!(!memory.register_object_url("https://example.com/a.png", None));
        assert_eq!(memory.stats().object_url_count, 2);
    }

    #[test]
    fn overflow_revokes_the_oldest_fifth() {
        let (_, revoker, mut memory) = manager();
        for i in 0..=MAX_OBJECT_URLS {
            memory.register_object_url(&format!("blob:{}", i), None);
        }
        let revoked = revoker.0.lock().unwrap().clone();
        assert_eq!(revoked.len(), 10);
        assert_eq!(revoked[0], "blob:0");
        assert_eq!(revoked[9], "blob:9");
        assert_eq!(memory.stats().object_url_count, 41);
    }

    #[test]
    fn idle_check_runs_cleanup_once() {
        let (clock, revoker, mut memory) = manager();
        memory.register_object_url("blob:short", Some(1_000));
        memory.register_object_url("blob:kept", None);

        clock.advance(IDLE_THRESHOLD_MS);
        assert!(!memory.check());
        clock.advance(CHECK_INTERVAL_MS);
        assert!(memory.check());
        assert!(!memory.check());
        assert_eq!(*revoker.0.lock().unwrap(), vec!["blob:short".to_string()]);
        assert!(memory.stats().is_idle);

        memory.record_activity();
        assert!(!memory.stats().is_idle);
        assert_eq!(memory.stats().idle_time, 0);
    }

    #[test]
    fn disabled_manager_skips_automatic_cleanup() {
        let (clock, revoker, mut memory) = manager();
        memory.set_enabled(false);
        assert!(!memory.stats().auto_cleanup);
        for i in 0..=MAX_OBJECT_URLS {
            memory.register_object_url(&format!("blob:{}", i), Some(10));
        }
        assert_eq!(memory.stats().object_url_count, MAX_OBJECT_URLS + 1);

        clock.advance(IDLE_THRESHOLD_MS + 1);
        assert!(!memory.check());
        assert!(revoker.0.lock().unwrap().is_empty());

        memory.set_enabled(true);
        assert!(memory.check());
        assert_eq!(memory.stats().object_url_count, 0);
    }

    #[test]
    fn hidden_page_cleans_up_and_blur_only_goes_idle() {
        let (clock, revoker, mut memory) = manager();
        memory.register_object_url("blob:short", Some(1_000));
        memory.register_object_url("blob:kept", None);
        clock.advance(2_000);

        memory.on_blur();
        assert!(memory.stats().is_idle);
        assert!(revoker.0.lock().unwrap().is_empty());

        memory.record_activity();
        assert_eq!(memory.on_visibility_hidden(), 1);
        assert!(memory.stats().is_idle);
        assert_eq!(*revoker.0.lock().unwrap(), vec!["blob:short".to_string()]);
        assert!(memory.is_tracked("blob:kept"));
    }

    #[test]
    fn full_cleanup_releases_everything() {
        let (clock, revoker, mut memory) = manager();
        let detached = Arc::new(AtomicUsize::new(0));
        for event in ["click", "dragstart"] {
            let counter = detached.clone();
            memory.add_listener("grid-1", event, Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        memory.register_object_url("blob:a", None);
        assert_eq!(memory.stats().total_event_listeners, 2);

        let mut cache: CacheService = CacheService::new(clock);
        cache.set("k", serde_json::json!(1), 1, crate::editor::cache::CacheEntryType::Json, None);

        memory.full_cleanup(&mut cache);
        assert_eq!(detached.load(Ordering::SeqCst), 2);
        assert_eq!(revoker.0.lock().unwrap().len(), 1);
        assert!(cache.is_empty());
        assert_eq!(memory.stats().event_listener_groups, 0);
        assert_eq!(memory.remove_listeners("grid-1"), 0);
    }
}
