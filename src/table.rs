//! Hash-consing unique table.
//!
//! The table is simultaneously the node store and the canonicalization map:
//! each shard is a chained-bucket hash table whose entries *are* the node
//! slots, addressed by a slot index. A global node index encodes
//! `(slot << shard_bits) | shard`, so edges stay narrow integers.
//!
//! Concurrency: the shard for a node is derived from its hash, so two
//! workers racing to intern an identical descriptor serialize on the same
//! shard lock and converge on exactly one canonical index. Reads take a
//! shard read lock; the GC takes every shard write lock during its
//! exclusive sweep.
//!
//! Capacity is fixed at construction. Allocating past a full shard is fatal:
//! the caller is expected to have collected garbage first, and if the live
//! set still does not fit there is no degraded mode.

use std::cmp::min;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use parking_lot::RwLock;

use crate::node::Node;
use crate::utils::MyHash;

#[derive(Clone)]
struct Entry {
    node: Node,
    /// Slot index of the next entry in the same bucket chain (0 = none).
    next: u32,
    occupied: bool,
    /// GC mark bit; meaningful only between the marking and sweeping
    /// phases of a collection.
    marked: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            node: Node::Leaf {
                tag: crate::node::LeafTag::Bool,
                value: 0,
            },
            next: 0,
            occupied: false,
            marked: false,
        }
    }
}

/// One shard: a chained-bucket table over its own slot arena.
///
/// Slot 0 is a sentry (always occupied, never a real node), so slot indices
/// and chain links can use 0 as "none".
struct Shard {
    data: Vec<Entry>,
    buckets: Vec<u32>,
    bucket_mask: u64,
    /// Index of the first *possibly* free (non-occupied) slot.
    min_free: u32,
    /// Index of the last slot ever allocated.
    last_index: u32,
    /// Number of occupied slots, excluding the sentry.
    live: u32,
}

impl Shard {
    fn new(slot_bits: u32) -> Self {
        let capacity = 1usize << slot_bits;
        let mut data = vec![Entry::default(); capacity];
        data[0].occupied = true; // sentry

        let bucket_bits = min(slot_bits, 16);
        let buckets = vec![0; 1 << bucket_bits];
        let bucket_mask = (1u64 << bucket_bits) - 1;

        Self {
            data,
            buckets,
            bucket_mask,
            min_free: 1,
            last_index: 0,
            live: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn is_occupied(&self, slot: u32) -> bool {
        self.data[slot as usize].occupied
    }

    fn value(&self, slot: u32) -> Node {
        assert!(self.is_occupied(slot), "slot {} is not occupied", slot);
        self.data[slot as usize].node
    }

    fn alloc(&mut self) -> u32 {
        let slot = (self.min_free..=self.last_index)
            .find(|&i| !self.is_occupied(i))
            .unwrap_or_else(|| {
                self.last_index += 1;
                self.last_index
            });

        if slot as usize >= self.capacity() {
            panic!(
                "unique table is full (shard capacity {} exhausted)",
                self.capacity()
            );
        }

        self.data[slot as usize].occupied = true;
        self.min_free = slot + 1;
        self.live += 1;

        slot
    }

    fn free_slot(&mut self, slot: u32) {
        debug_assert_ne!(slot, 0);
        self.data[slot as usize].occupied = false;
        self.min_free = min(self.min_free, slot);
        self.live -= 1;
    }

    /// Probe the bucket chain for `node`; insert it if missing.
    /// Returns the slot and whether a new slot was allocated.
    fn find_or_insert(&mut self, node: Node, hash: u64) -> (u32, bool) {
        let bucket = (hash & self.bucket_mask) as usize;
        let mut slot = self.buckets[bucket];

        if slot == 0 {
            let i = self.add(node);
            self.buckets[bucket] = i;
            return (i, true);
        }

        loop {
            debug_assert!(slot > 0);

            if node == self.value(slot) {
                return (slot, false);
            }

            let next = self.data[slot as usize].next;
            if next == 0 {
                let i = self.add(node);
                self.data[slot as usize].next = i;
                return (i, true);
            }
            slot = next;
        }
    }

    fn add(&mut self, node: Node) -> u32 {
        let slot = self.alloc();
        self.data[slot as usize].node = node;
        self.data[slot as usize].next = 0;
        slot
    }

    fn set_mark(&mut self, slot: u32) -> bool {
        let entry = &mut self.data[slot as usize];
        debug_assert!(entry.occupied);
        if entry.marked {
            false
        } else {
            entry.marked = true;
            true
        }
    }

    /// Unlink and free every unmarked slot, then clear all marks.
    /// Returns the number of freed slots.
    fn sweep(&mut self) -> usize {
        let mut freed = 0;

        for b in 0..self.buckets.len() {
            // Drop the dead prefix of the chain.
            let mut head = self.buckets[b];
            while head != 0 && !self.data[head as usize].marked {
                let next = self.data[head as usize].next;
                self.free_slot(head);
                freed += 1;
                head = next;
            }
            self.buckets[b] = head;

            // Unlink dead entries in the remainder of the chain.
            let mut prev = head;
            while prev != 0 {
                let mut cur = self.data[prev as usize].next;
                while cur != 0 && !self.data[cur as usize].marked {
                    let next = self.data[cur as usize].next;
                    self.free_slot(cur);
                    freed += 1;
                    cur = next;
                }
                self.data[prev as usize].next = cur;
                prev = cur;
            }
        }

        for entry in &mut self.data {
            entry.marked = false;
        }

        freed
    }
}

/// The sharded unique table.
pub struct UniqueTable {
    shards: Vec<RwLock<Shard>>,
    shard_bits: u32,
    shard_mask: u64,
    capacity: usize,
    live: AtomicUsize,
}

impl UniqueTable {
    /// Creates a table with `2^storage_bits` total slots split across
    /// `2^shard_bits` shards.
    pub fn new(storage_bits: usize, shard_bits: u32) -> Self {
        assert!(
            (1..=31).contains(&storage_bits),
            "storage bits must be in the range 1..=31"
        );
        assert!(
            (shard_bits as usize) < storage_bits,
            "shard bits must be less than storage bits"
        );

        let slot_bits = storage_bits as u32 - shard_bits;
        let num_shards = 1usize << shard_bits;
        let shards = (0..num_shards)
            .map(|_| RwLock::new(Shard::new(slot_bits)))
            .collect();

        Self {
            shards,
            shard_bits,
            shard_mask: (num_shards - 1) as u64,
            // One sentry slot per shard is unusable.
            capacity: (1usize << storage_bits) - num_shards,
            live: AtomicUsize::new(0),
        }
    }

    /// Total number of usable slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live (occupied) slots.
    pub fn live(&self) -> usize {
        self.live.load(Relaxed)
    }

    pub fn load_factor(&self) -> f64 {
        self.live() as f64 / self.capacity as f64
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    fn encode(&self, slot: u32, shard: usize) -> u32 {
        (slot << self.shard_bits) | shard as u32
    }

    fn decode(&self, index: u32) -> (usize, u32) {
        (
            (index as u64 & self.shard_mask) as usize,
            index >> self.shard_bits,
        )
    }

    /// Canonicalize `node`: return the index of the existing slot holding an
    /// identical descriptor, or claim a new slot.
    pub fn intern(&self, node: Node) -> u32 {
        let hash = MyHash::hash(&node);
        let shard_id = (hash & self.shard_mask) as usize;

        let (slot, inserted) = {
            let mut shard = self.shards[shard_id].write();
            shard.find_or_insert(node, hash >> self.shard_bits)
        };
        if inserted {
            self.live.fetch_add(1, Relaxed);
        }

        self.encode(slot, shard_id)
    }

    /// Read the node stored at `index`.
    pub fn node(&self, index: u32) -> Node {
        let (shard_id, slot) = self.decode(index);
        self.shards[shard_id].read().value(slot)
    }

    /// Set the GC mark bit; returns true if the slot was previously
    /// unmarked.
    pub(crate) fn set_mark(&self, index: u32) -> bool {
        let (shard_id, slot) = self.decode(index);
        self.shards[shard_id].write().set_mark(slot)
    }

    /// Free every unmarked slot and clear all marks.
    /// Returns the number of reclaimed slots.
    pub(crate) fn sweep(&self) -> usize {
        let mut freed = 0;
        for shard in &self.shards {
            freed += shard.write().sweep();
        }
        self.live.fetch_sub(freed, Relaxed);
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LeafTag;
    use crate::reference::Ref;

    fn internal(variable: u32, low: u32, high: u32) -> Node {
        Node::Internal {
            variable,
            low: -Ref::positive(low),
            high: Ref::positive(high),
        }
    }

    #[test]
    fn test_intern_dedup() {
        let table = UniqueTable::new(10, 2);
        let a = table.intern(internal(1, 1, 1));
        let b = table.intern(internal(1, 1, 1));
        let c = table.intern(internal(2, 1, 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.live(), 2);
        assert_eq!(table.node(a), internal(1, 1, 1));
        assert_eq!(table.node(c), internal(2, 1, 1));
    }

    #[test]
    fn test_intern_leaf_and_map() {
        let table = UniqueTable::new(10, 2);
        let leaf = table.intern(Node::Leaf { tag: LeafTag::Int, value: 42 });
        let leaf2 = table.intern(Node::Leaf { tag: LeafTag::Int, value: 42 });
        assert_eq!(leaf, leaf2);

        let map = Node::Map {
            variable: 2,
            replace: Ref::positive(leaf),
            next: Ref::positive(leaf),
        };
        let m1 = table.intern(map);
        let m2 = table.intern(map);
        assert_eq!(m1, m2);
        assert_eq!(table.live(), 2);
    }

    #[test]
    fn test_concurrent_intern_converges() {
        let table = UniqueTable::new(12, 3);
        let node = internal(7, 3, 5);

        let indices: Vec<u32> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| table.intern(node)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for &i in &indices {
            assert_eq!(i, indices[0]);
        }
        assert_eq!(table.live(), 1);
    }

    #[test]
    fn test_concurrent_intern_distinct() {
        let table = UniqueTable::new(12, 3);

        std::thread::scope(|scope| {
            for t in 0..4u32 {
                let table = &table;
                scope.spawn(move || {
                    for v in 1..=64 {
                        table.intern(internal(v, 1, 1 + t % 2));
                    }
                });
            }
        });

        // 64 variables times 2 distinct child combinations.
        assert_eq!(table.live(), 128);
    }

    #[test]
    fn test_mark_and_sweep() {
        let table = UniqueTable::new(10, 1);
        let a = table.intern(internal(1, 1, 1));
        let b = table.intern(internal(2, 1, 1));
        let c = table.intern(internal(3, 1, 1));
        assert_eq!(table.live(), 3);

        assert!(table.set_mark(a));
        assert!(!table.set_mark(a), "second mark reports already-marked");
        assert!(table.set_mark(c));

        let freed = table.sweep();
        assert_eq!(freed, 1);
        assert_eq!(table.live(), 2);
        assert_eq!(table.node(a), internal(1, 1, 1));
        assert_eq!(table.node(c), internal(3, 1, 1));

        // Marks were cleared by the sweep: an immediate second sweep with no
        // marking frees everything.
        let freed = table.sweep();
        assert_eq!(freed, 2);
        assert_eq!(table.live(), 0);
        let _ = b;
    }

    #[test]
    fn test_reinsert_after_sweep() {
        let table = UniqueTable::new(10, 1);
        let a = table.intern(internal(1, 1, 1));
        table.sweep();
        let b = table.intern(internal(1, 1, 1));
        // The slot is reused, and the chain stays consistent.
        assert_eq!(a, b);
        assert_eq!(table.live(), 1);
    }

    #[test]
    #[should_panic(expected = "unique table is full")]
    fn test_capacity_exhaustion_is_fatal() {
        let table = UniqueTable::new(3, 1);
        for v in 1..100 {
            table.intern(internal(v, 1, 1));
        }
    }
}
