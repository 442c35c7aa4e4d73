//! Mark-and-sweep garbage collection.
//!
//! Node slots are not reference counted. A collection walks the live roots
//! (the explicitly protected registry plus any roots passed to
//! [`Bdd::collect_garbage`]), marks every reachable slot, then sweeps the
//! unique table and drops the operation cache, which may hold indices of
//! swept slots.
//!
//! The safe-point barrier is the manager-wide operation lock: every public
//! algebra entry point holds it shared for the duration of one operation,
//! and the collector takes it exclusively. A collection therefore never
//! observes a half-finished recursion, and workers never observe a
//! half-swept table.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering::Relaxed};

use log::{debug, info};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::bdd::Bdd;
use crate::node::Node;
use crate::reference::Ref;

/// Where the collector currently is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GcPhase {
    Idle,
    /// A collection has been requested but no thread has reached a safe
    /// point to run it yet.
    Requested,
    /// The collector is waiting for in-flight operations to drain.
    Barrier,
    Marking,
    Sweeping,
}

impl GcPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => GcPhase::Idle,
            1 => GcPhase::Requested,
            2 => GcPhase::Barrier,
            3 => GcPhase::Marking,
            4 => GcPhase::Sweeping,
            _ => unreachable!("invalid GC phase {}", v),
        }
    }
}

/// Counters reported by [`Bdd::gc_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub collections: u64,
    pub reclaimed: u64,
    pub live: usize,
    pub capacity: usize,
    pub protected_roots: usize,
}

pub(crate) struct GcState {
    phase: AtomicU8,
    requested: AtomicBool,
    /// The operation lock. Shared = an algebra operation is in flight,
    /// exclusive = the collector owns the whole manager.
    ops: RwLock<()>,
    /// Protected roots with their registration counts, keyed by node index.
    roots: Mutex<FxHashMap<u32, usize>>,
    collections: AtomicU64,
    reclaimed: AtomicU64,
    pub(crate) high_water: f64,
}

impl GcState {
    pub(crate) fn new(high_water: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&high_water),
            "GC high-water mark must be a fraction"
        );
        Self {
            phase: AtomicU8::new(GcPhase::Idle as u8),
            requested: AtomicBool::new(false),
            ops: RwLock::new(()),
            roots: Mutex::new(FxHashMap::default()),
            collections: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
            high_water,
        }
    }

    pub(crate) fn set_requested(&self) {
        self.requested.store(true, Relaxed);
        let _ = self.phase.compare_exchange(
            GcPhase::Idle as u8,
            GcPhase::Requested as u8,
            Relaxed,
            Relaxed,
        );
    }
}

impl Bdd {
    /// Registers `node` as a GC root. Registrations are counted:
    /// a node protected twice needs two [`Bdd::unprotect`] calls.
    pub fn protect(&self, node: Ref) {
        *self.gc.roots.lock().entry(node.index()).or_insert(0) += 1;
    }

    /// Drops one protection of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not currently protected.
    pub fn unprotect(&self, node: Ref) {
        let mut roots = self.gc.roots.lock();
        let count = roots
            .get_mut(&node.index())
            .unwrap_or_else(|| panic!("{} is not a protected root", node));
        *count -= 1;
        if *count == 0 {
            roots.remove(&node.index());
        }
    }

    pub fn gc_phase(&self) -> GcPhase {
        GcPhase::from_u8(self.gc.phase.load(Relaxed))
    }

    /// Asks for a collection at the next safe point.
    pub fn request_gc(&self) {
        self.gc.set_requested();
    }

    pub fn gc_stats(&self) -> GcStats {
        GcStats {
            collections: self.gc.collections.load(Relaxed),
            reclaimed: self.gc.reclaimed.load(Relaxed),
            live: self.table.live(),
            capacity: self.table.capacity(),
            protected_roots: self.gc.roots.lock().len(),
        }
    }

    /// Enters an algebra operation: holds the barrier shared until dropped.
    pub(crate) fn begin_op(&self) -> RwLockReadGuard<'_, ()> {
        // Recursive read: a wrapper may be called while another operation
        // on the same thread already holds the lock.
        self.gc.ops.read_recursive()
    }

    /// Runs a pending collection, if one was requested. Called by public
    /// entry points before they take the operation lock, so the calling
    /// thread is at a safe point. A concurrent duplicate collection is
    /// harmless, only wasteful.
    pub(crate) fn maybe_collect(&self) {
        if self.gc.requested.load(Relaxed) {
            self.collect_garbage(&[]);
        }
    }

    /// Collects garbage now, keeping everything reachable from `roots`,
    /// from the protected registry and from the terminals.
    ///
    /// Returns the number of reclaimed slots. Unreachable, unprotected
    /// handles are dangling after this returns.
    pub fn collect_garbage(&self, roots: &[Ref]) -> usize {
        self.gc.phase.store(GcPhase::Barrier as u8, Relaxed);
        let _exclusive = self.gc.ops.write();

        self.gc.phase.store(GcPhase::Marking as u8, Relaxed);
        let live_before = self.table.live();

        self.mark(self.one());
        for &root in roots {
            self.mark(root);
        }
        let protected: Vec<u32> = self.gc.roots.lock().keys().copied().collect();
        for index in protected {
            self.mark(Ref::positive(index));
        }

        self.gc.phase.store(GcPhase::Sweeping as u8, Relaxed);
        // Cached results may refer to swept slots.
        self.cache.clear();
        let freed = self.table.sweep();

        self.gc.collections.fetch_add(1, Relaxed);
        self.gc.reclaimed.fetch_add(freed as u64, Relaxed);
        self.gc.requested.store(false, Relaxed);
        self.gc.phase.store(GcPhase::Idle as u8, Relaxed);

        info!(
            "garbage collection reclaimed {} of {} slots, {} live",
            freed,
            live_before,
            self.table.live()
        );
        freed
    }

    fn mark(&self, root: Ref) {
        debug!("marking from root {}", root);
        let mut stack = vec![root.index()];
        while let Some(index) = stack.pop() {
            if self.table.set_mark(index) {
                match self.table.node(index) {
                    Node::Internal { low, high, .. } => {
                        stack.push(low.index());
                        stack.push(high.index());
                    }
                    Node::Leaf { .. } => {}
                    Node::Map { replace, next, .. } => {
                        stack.push(replace.index());
                        stack.push(next.index());
                    }
                }
            }
        }
    }
}
