//! Worker pool shared by every particle set.
//!
//! The pool is passed in explicitly. Slices are submitted only against a
//! lease; leases are granted without blocking, so a busy pool hands out
//! fewer and the caller runs the rest itself.

use std::sync::{Mutex, MutexGuard};

use rayon::{Scope, ThreadPool, ThreadPoolBuilder};

use seadrift_core::error::DriftError;

pub struct WorkerPool {
    pool: ThreadPool,
    idle: Mutex<usize>,
    threads: usize,
}

impl WorkerPool {
    /// Pool with `threads` leasable workers. Zero means every slice runs on
    /// the calling thread.
    pub fn new(threads: usize) -> Result<Self, DriftError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("seadrift-worker-{i}"))
            .build()
            .map_err(|e| DriftError::WorkerPool(e.to_string()))?;
        Ok(Self {
            pool,
            idle: Mutex::new(threads),
            threads,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn idle(&self) -> usize {
        *self.idle_count()
    }

    /// Take up to `wanted` leases. Never blocks.
    pub fn try_acquire(&self, wanted: usize) -> Vec<WorkerLease<'_>> {
        let granted = {
            let mut idle = self.idle_count();
            let granted = wanted.min(*idle);
            *idle -= granted;
            granted
        };
        (0..granted).map(|_| WorkerLease { pool: self }).collect()
    }

    /// Fork-join scope on the pool. The calling thread keeps running `op`
    /// and waits for every spawned job before returning.
    pub fn in_place_scope<'scope, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&Scope<'scope>) -> R,
    {
        self.pool.in_place_scope(op)
    }

    fn idle_count(&self) -> MutexGuard<'_, usize> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self) {
        *self.idle_count() += 1;
    }
}

/// Permission to run one slice on the pool. Returned on drop.
pub struct WorkerLease<'p> {
    pool: &'p WorkerPool,
}

impl Drop for WorkerLease<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}
