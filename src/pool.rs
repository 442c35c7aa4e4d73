//! Fork/join worker-pool seam.
//!
//! The algebra never talks to a concrete scheduler: parallel entry points
//! take any [`WorkerPool`], fork their two cofactor recursions through
//! [`WorkerPool::join`], and fall back to plain sequential recursion once
//! the split depth is exhausted. [`Workers`] is the default rayon-backed
//! implementation; [`Sequential`] runs everything inline and is useful for
//! tests and single-threaded builds.

use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

/// A fork/join task-spawning capability.
///
/// Forked tasks run to completion; there is no cancellation. `join` is the
/// only suspension point the algebra uses.
pub trait WorkerPool: Sync {
    fn current_num_threads(&self) -> usize;

    /// Recursion depth up to which forking two subtasks is worthwhile.
    /// Below this depth the algebra recurses sequentially.
    fn split_depth(&self) -> u32;

    /// Runs `op` inside the pool, blocking until it completes.
    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R;

    /// Runs both closures, potentially in parallel, and returns both
    /// results.
    fn join<RA: Send, RB: Send>(
        &self,
        op_a: impl FnOnce() -> RA + Send,
        op_b: impl FnOnce() -> RB + Send,
    ) -> (RA, RB);
}

/// Work-stealing thread pool backed by rayon.
pub struct Workers {
    pool: rayon::ThreadPool,
    split_depth: AtomicU32,
}

impl Workers {
    /// Creates a pool with `threads` workers (0 = one per core).
    pub fn new(threads: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("paradd worker {i}"))
            .build()
            .expect("could not build thread pool");
        let split_depth = AtomicU32::new(Self::auto_split_depth(&pool));
        Self { pool, split_depth }
    }

    fn auto_split_depth(pool: &rayon::ThreadPool) -> u32 {
        let threads = pool.current_num_threads();
        if threads > 1 {
            (4096 * threads as u64).ilog2()
        } else {
            0
        }
    }

    /// Overrides the automatic split depth (`None` restores it).
    pub fn set_split_depth(&self, depth: Option<u32>) {
        let depth = depth.unwrap_or_else(|| Self::auto_split_depth(&self.pool));
        self.split_depth.store(depth, Relaxed);
    }
}

impl WorkerPool for Workers {
    fn current_num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn split_depth(&self) -> u32 {
        self.split_depth.load(Relaxed)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    fn join<RA: Send, RB: Send>(
        &self,
        op_a: impl FnOnce() -> RA + Send,
        op_b: impl FnOnce() -> RB + Send,
    ) -> (RA, RB) {
        self.pool.join(op_a, op_b)
    }
}

/// Runs everything on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl WorkerPool for Sequential {
    fn current_num_threads(&self) -> usize {
        1
    }

    fn split_depth(&self) -> u32 {
        0
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        op()
    }

    fn join<RA: Send, RB: Send>(
        &self,
        op_a: impl FnOnce() -> RA + Send,
        op_b: impl FnOnce() -> RB + Send,
    ) -> (RA, RB) {
        (op_a(), op_b())
    }
}
