//! Composition root for the editor's resource services.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::blocks::BlockRegistry;
use super::cache::{CacheService, CacheStats};
use super::lazy_load::{LazyLoadService, LazyLoadStats};
use super::memory::{MemoryManager, MemoryStats, UrlRevoker, CHECK_INTERVAL_MS};
use super::performance::{PerformanceMonitor, PerformanceSummary};
use super::responsive::ResponsiveUIManager;

/// Millisecond time source.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock(AtomicU64::new(start_ms))
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub cache: CacheStats,
    pub memory: MemoryStats,
    pub lazy_load: LazyLoadStats,
    pub performance: PerformanceSummary,
}

/// Owns one instance of every service for the lifetime of a mounted editor.
pub struct EditorServices {
    clock: Arc<dyn Clock>,
    pub registry: BlockRegistry,
    pub cache: CacheService,
    pub memory: MemoryManager,
    pub lazy_load: LazyLoadService,
    pub performance: PerformanceMonitor,
    pub responsive: ResponsiveUIManager,
    mounted: bool,
    last_check: u64,
}

impl EditorServices {
    pub fn new(clock: Arc<dyn Clock>, revoker: Arc<dyn UrlRevoker>) -> Self {
        EditorServices {
            registry: BlockRegistry::new(),
            cache: CacheService::new(clock.clone()),
            memory: MemoryManager::new(clock.clone(), revoker),
            lazy_load: LazyLoadService::new(),
            performance: PerformanceMonitor::new(clock.clone()),
            responsive: ResponsiveUIManager::new(),
            last_check: clock.now_ms(),
            clock,
            mounted: false,
        }
    }

    /// Marks the editor mounted. Calling it twice is a no-op.
    pub fn init(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.last_check = self.clock.now_ms();
        self.memory.record_activity();
        log::info!("Editor services initialised ({} block types)", self.registry.len());
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Drives periodic work. Returns true when the idle cleanup ran.
    pub fn tick(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        let now = self.clock.now_ms();
        if now.saturating_sub(self.last_check) < CHECK_INTERVAL_MS {
            return false;
        }
        self.last_check = now;
        self.cache.cleanup_expired();
        self.memory.check()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.cache.stats(),
            memory: self.memory.stats(),
            lazy_load: self.lazy_load.stats(),
            performance: self.performance.summary(),
        }
    }

    /// Releases every held resource. The services stay usable after a new
    /// [`init`](Self::init).
    pub fn dispose(&mut self) {
        if !self.mounted {
            return;
        }
        self.memory.full_cleanup(&mut self.cache);
        self.lazy_load.reset();
        self.performance.clear();
        self.responsive.clear();
        self.mounted = false;
        log::info!("Editor services disposed");
    }
}

impl Drop for EditorServices {
    fn drop(&mut self) {
        self.dispose();
    }
}
