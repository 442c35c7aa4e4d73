//! Concurrent operation cache.
//!
//! A fixed-size direct-mapped cache: each key hashes to exactly one slot and
//! collisions overwrite the previous entry. The cache is purely a
//! memoization device — an evicted or overwritten entry only costs a
//! recomputation, never correctness — so slots are grouped into lock
//! stripes rather than being kept coherent globally.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::utils::MyHash;

const STRIPE_BITS: u32 = 6;

/// A bounded, lossy, thread-safe map from operation keys to results.
pub struct OpCache<K, V> {
    stripes: Vec<CachePadded<Mutex<Vec<Option<(K, V)>>>>>,
    slot_mask: u64,
    stripe_mask: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> OpCache<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Creates a cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(
            (STRIPE_BITS as usize..=31).contains(&bits),
            "cache bits must be in the range {}..=31",
            STRIPE_BITS
        );

        let num_stripes = 1usize << STRIPE_BITS;
        let slots_per_stripe = 1usize << (bits as u32 - STRIPE_BITS);
        let stripes = (0..num_stripes)
            .map(|_| CachePadded::new(Mutex::new(vec![None; slots_per_stripe])))
            .collect();

        Self {
            stripes,
            slot_mask: (1u64 << bits) - 1,
            stripe_mask: (num_stripes - 1) as u64,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        (self.slot_mask + 1) as usize
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Relaxed)
    }

    /// Drops every entry. O(capacity).
    pub fn clear(&self) {
        for stripe in &self.stripes {
            for slot in stripe.lock().iter_mut() {
                *slot = None;
            }
        }
    }
}

impl<K, V> OpCache<K, V>
where
    K: MyHash + Eq + Clone,
    V: Clone,
{
    fn position(&self, key: &K) -> (usize, usize) {
        let slot = key.hash() & self.slot_mask;
        (
            (slot & self.stripe_mask) as usize,
            (slot >> STRIPE_BITS) as usize,
        )
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let (stripe, slot) = self.position(key);
        let guard = self.stripes[stripe].lock();
        match &guard[slot] {
            Some((k, v)) if k == key => {
                self.hits.fetch_add(1, Relaxed);
                Some(v.clone())
            }
            _ => {
                self.misses.fetch_add(1, Relaxed);
                None
            }
        }
    }

    /// Inserts a key-value pair, overwriting whatever occupied the slot.
    pub fn insert(&self, key: K, value: V) {
        let (stripe, slot) = self.position(&key);
        self.stripes[stripe].lock()[slot] = Some((key, value));
    }
}
