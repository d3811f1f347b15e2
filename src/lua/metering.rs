//! Resource and object-model metering for Lua execution

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts what a script run consumed and what it built.
///
/// Clones share the same counters, so the registry, the sandbox and the
/// caller can all hold one.
#[derive(Debug, Clone)]
pub struct Metering {
    inner: Arc<MeteringInner>,
}

#[derive(Debug)]
struct MeteringInner {
    /// Number of Lua instructions executed
    instructions: AtomicU64,
    /// New classes, traits and namespaces (reopening does not count)
    declarations: AtomicU64,
    /// Instances created by invoking a class
    instances: AtomicU64,
    /// Super-views synthesized
    super_views: AtomicU64,
    /// Memory usage in bytes
    memory_bytes: AtomicU64,
}

impl Default for Metering {
    fn default() -> Self {
        Self::new()
    }
}

impl Metering {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MeteringInner {
                instructions: AtomicU64::new(0),
                declarations: AtomicU64::new(0),
                instances: AtomicU64::new(0),
                super_views: AtomicU64::new(0),
                memory_bytes: AtomicU64::new(0),
            }),
        }
    }

    /// Add to instruction count
    pub fn add_instructions(&self, count: u64) {
        self.inner.instructions.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current instruction count
    pub fn instructions(&self) -> u64 {
        self.inner.instructions.load(Ordering::Relaxed)
    }

    pub fn record_declaration(&self) {
        self.inner.declarations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn declarations(&self) -> u64 {
        self.inner.declarations.load(Ordering::Relaxed)
    }

    pub fn record_instance(&self) {
        self.inner.instances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn instances(&self) -> u64 {
        self.inner.instances.load(Ordering::Relaxed)
    }

    pub fn record_super_view(&self) {
        self.inner.super_views.fetch_add(1, Ordering::Relaxed);
    }

    pub fn super_views(&self) -> u64 {
        self.inner.super_views.load(Ordering::Relaxed)
    }

    /// Set current memory usage
    pub fn set_memory(&self, bytes: u64) {
        self.inner.memory_bytes.store(bytes, Ordering::Relaxed);
    }

    /// Get current memory usage
    pub fn memory_bytes(&self) -> u64 {
        self.inner.memory_bytes.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.inner.instructions.store(0, Ordering::Relaxed);
        self.inner.declarations.store(0, Ordering::Relaxed);
        self.inner.instances.store(0, Ordering::Relaxed);
        self.inner.super_views.store(0, Ordering::Relaxed);
        self.inner.memory_bytes.store(0, Ordering::Relaxed);
    }
}
