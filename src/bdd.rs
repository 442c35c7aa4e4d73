//! The `Bdd` manager: canonical node construction and the ITE/apply algebra.
//!
//! All operations go through the manager, which owns the unique table, the
//! operation cache and the garbage-collector state. The manager is `Sync`:
//! workers share it by reference, interning serializes on table shards, and
//! the GC coordinates through the operation lock (see [`crate::gc`]).

use std::fmt::Debug;

use log::debug;

use crate::cache::OpCache;
use crate::gc::GcState;
use crate::node::{LeafTag, Node};
use crate::pool::{Sequential, WorkerPool};
use crate::reference::Ref;
use crate::table::UniqueTable;
use crate::types::{Var, VarSet};
use crate::utils::{pairing2, pairing3, MyHash};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

/// Sizing and GC configuration, supplied once at initialization.
#[derive(Debug, Clone)]
pub struct BddOptions {
    /// The unique table holds `2^storage_bits` slots in total. Hard
    /// ceiling: exceeding it without a successful collection is fatal.
    pub storage_bits: usize,
    /// The operation cache holds `2^cache_bits` entries.
    pub cache_bits: usize,
    /// The unique table is split into `2^shard_bits` independently locked
    /// shards.
    pub shard_bits: u32,
    /// Live-slot fraction above which a garbage collection is requested.
    pub gc_high_water: f64,
}

impl Default for BddOptions {
    fn default() -> Self {
        Self {
            storage_bits: 20,
            cache_bits: 16,
            shard_bits: 4,
            gc_high_water: 0.75,
        }
    }
}

/// Binary operators accepted by [`Bdd::apply_op`].
///
/// `And`/`Or`/`Xor` are Boolean and route through ITE. `Add`/`Min`/`Max`
/// operate on multi-terminal diagrams with `Int` leaves.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinOp {
    And,
    Or,
    Xor,
    Add,
    Min,
    Max,
}

impl BinOp {
    fn discriminant(self) -> u64 {
        match self {
            BinOp::And => 0,
            BinOp::Or => 1,
            BinOp::Xor => 2,
            BinOp::Add => 3,
            BinOp::Min => 4,
            BinOp::Max => 5,
        }
    }
}

/// Operation-cache key: the operator tag plus the operand edges.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OpKey {
    Ite(Ref, Ref, Ref),
    MtApply(BinOp, Ref, Ref),
    Exists(Ref, Ref),
    AndExists(Ref, Ref, Ref),
    Cofactor(Ref, Ref),
    Compose(Ref, Ref),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        let (tag, body) = match *self {
            OpKey::Ite(f, g, h) => (
                1,
                pairing3(f.unsigned() as u64, g.unsigned() as u64, h.unsigned() as u64),
            ),
            OpKey::MtApply(op, f, g) => (
                2,
                pairing3(op.discriminant(), f.unsigned() as u64, g.unsigned() as u64),
            ),
            OpKey::Exists(f, vars) => (3, pairing2(f.unsigned() as u64, vars.unsigned() as u64)),
            OpKey::AndExists(f, g, vars) => (
                4,
                pairing3(
                    f.unsigned() as u64,
                    g.unsigned() as u64,
                    vars.unsigned() as u64,
                ),
            ),
            OpKey::Cofactor(f, cube) => (5, pairing2(f.unsigned() as u64, cube.unsigned() as u64)),
            OpKey::Compose(f, map) => (6, pairing2(f.unsigned() as u64, map.unsigned() as u64)),
        };
        pairing2(tag, body)
    }
}

/// The decision-diagram manager.
pub struct Bdd {
    pub(crate) table: UniqueTable,
    pub(crate) cache: OpCache<OpKey, Ref>,
    pub(crate) gc: GcState,
    next_var: AtomicU32,
    one: Ref,
    zero: Ref,
}

impl Bdd {
    pub fn new(options: BddOptions) -> Self {
        let table = UniqueTable::new(options.storage_bits, options.shard_bits);
        let cache = OpCache::new(options.cache_bits);
        let gc = GcState::new(options.gc_high_water);

        // The shared Boolean terminal; `zero` is its complement edge.
        let one = Ref::positive(table.intern(Node::Leaf {
            tag: LeafTag::Bool,
            value: 1,
        }));
        let zero = -one;

        Self {
            table,
            cache,
            gc,
            next_var: AtomicU32::new(1),
            one,
            zero,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(BddOptions::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("capacity", &self.table.capacity())
            .field("live", &self.table.live())
            .field("gc_phase", &self.gc_phase())
            .finish()
    }
}

impl Bdd {
    pub fn one(&self) -> Ref {
        self.one
    }

    pub fn zero(&self) -> Ref {
        self.zero
    }

    /// The node descriptor stored at `index`.
    pub fn node(&self, index: u32) -> Node {
        self.table.node(index)
    }

    /// The decision variable of the node at `index` (0 for leaves).
    pub fn variable(&self, index: u32) -> u32 {
        self.node(index).variable()
    }

    pub fn low(&self, index: u32) -> Ref {
        match self.node(index) {
            Node::Internal { low, .. } => low,
            n => panic!("node {} has no low edge: {:?}", index, n),
        }
    }

    pub fn high(&self, index: u32) -> Ref {
        match self.node(index) {
            Node::Internal { high, .. } => high,
            n => panic!("node {} has no high edge: {:?}", index, n),
        }
    }

    /// The low cofactor of `node`, with the complement mark transferred.
    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }

    /// The high cofactor of `node`, with the complement mark transferred.
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }

    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }

    /// Whether `node` targets a leaf (of any type).
    pub fn is_leaf(&self, node: Ref) -> bool {
        self.node(node.index()).is_leaf()
    }

    /// Whether `node` is a Boolean terminal (constant true or false).
    pub fn is_terminal(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node)
    }

    /// The tag and payload of a leaf edge.
    pub fn leaf_value(&self, node: Ref) -> (LeafTag, u64) {
        match self.node(node.index()) {
            Node::Leaf { tag, value } => (tag, value),
            n => panic!("node {} is not a leaf: {:?}", node.index(), n),
        }
    }

    /// The `i64` payload of an `Int` leaf edge.
    pub fn int_value(&self, node: Ref) -> i64 {
        assert!(
            !node.is_negated(),
            "complement marks are not defined on arithmetic leaves"
        );
        match self.leaf_value(node) {
            (LeafTag::Int, value) => value as i64,
            (tag, _) => panic!("expected an Int leaf, found {:?}", tag),
        }
    }

    fn intern(&self, node: Node) -> Ref {
        let index = self.table.intern(node);
        if self.table.load_factor() > self.gc.high_water {
            self.gc.set_requested();
        }
        Ref::positive(index)
    }

    /// Allocates a fresh variable identifier.
    pub fn new_var(&self) -> Var {
        Var::new(self.next_var.fetch_add(1, Relaxed))
    }

    /// The canonical node for `(v, low, high)`, applying the reduction rule
    /// and complement normalization.
    ///
    /// # Panics
    ///
    /// Panics if `v` is 0 or if either child's variable is not strictly
    /// greater than `v` (a malformed ordering is a programming error).
    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "variable index must not be zero");

        // Canonical form: the stored high edge is never complemented.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Reduction rule: a node with identical children never exists.
        if low == high {
            return low;
        }

        let ordered = |child: Ref| {
            let n = self.node(child.index());
            n.is_leaf() || (!n.is_map() && n.variable() > v)
        };
        assert!(
            ordered(low) && ordered(high),
            "variable ordering violated: children of x{} must test greater variables",
            v
        );

        self.intern(Node::Internal {
            variable: v,
            low,
            high,
        })
    }

    /// The function "variable `v` is true".
    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "variable index must not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// The literal of `var` with the given polarity.
    pub fn mk_literal(&self, var: Var, positive: bool) -> Ref {
        let f = self.mk_var(var.id());
        if positive {
            f
        } else {
            -f
        }
    }

    /// An `Int` leaf carrying `value`.
    pub fn mk_int_leaf(&self, value: i64) -> Ref {
        self.intern(Node::Leaf {
            tag: LeafTag::Int,
            value: value as u64,
        })
    }

    /// The conjunction of the given literals (DIMACS signs).
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals: Vec<i32> = literals.into_iter().collect();
        literals.sort_by_key(|&v| v.abs());
        literals.reverse();
        let mut current = self.one;
        for lit in literals {
            assert_ne!(lit, 0, "variable index must not be zero");
            current = if lit < 0 {
                self.mk_node(-lit as u32, current, self.zero)
            } else {
                self.mk_node(lit as u32, self.zero, current)
            };
        }
        current
    }

    /// The disjunction of the given literals (DIMACS signs).
    pub fn mk_clause(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals: Vec<i32> = literals.into_iter().collect();
        literals.sort_by_key(|&v| v.abs());
        literals.reverse();
        let mut current = self.zero;
        for lit in literals {
            assert_ne!(lit, 0, "variable index must not be zero");
            current = if lit < 0 {
                self.mk_node(-lit as u32, self.one, current)
            } else {
                self.mk_node(lit as u32, current, self.one)
            };
        }
        current
    }

    /// The conjunction of the variables in `vars` as positive literals,
    /// used as the cube argument of quantification operations.
    pub fn mk_var_cube(&self, vars: &VarSet) -> Ref {
        let mut current = self.one;
        for v in vars.vars().iter().rev() {
            current = self.mk_node(v.id(), self.zero, current);
        }
        current
    }

    /// A hash-consed substitution chain mapping each variable to a
    /// replacement function. The empty map is the `one` terminal.
    pub fn mk_map(&self, pairs: &[(Var, Ref)]) -> Ref {
        let mut pairs: Vec<(Var, Ref)> = pairs.to_vec();
        pairs.sort_by_key(|&(v, _)| v);
        for w in pairs.windows(2) {
            assert_ne!(w[0].0, w[1].0, "duplicate variable in substitution map");
        }
        let mut chain = self.one;
        for &(v, replace) in pairs.iter().rev() {
            chain = self.intern(Node::Map {
                variable: v.id(),
                replace,
                next: chain,
            });
        }
        chain
    }

    /// A substitution chain renaming each `(from, to)` pair.
    pub fn mk_rename_map(&self, pairs: &[(Var, Var)]) -> Ref {
        let pairs: Vec<(Var, Ref)> = pairs
            .iter()
            .map(|&(from, to)| (from, self.mk_var(to.id())))
            .collect();
        self.mk_map(&pairs)
    }

    /// The cofactors of `node` with respect to `v`, assuming `v` is at or
    /// above `node`'s top variable.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "variable index must not be zero");

        let i = node.index();
        if self.is_leaf(node) || v < self.variable(i) {
            return (node, node);
        }
        assert_eq!(v, self.variable(i));
        if node.is_negated() {
            (-self.low(i), -self.high(i))
        } else {
            (self.low(i), self.high(i))
        }
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        self.ite_impl(f, g, h, &Sequential, 0)
    }

    /// Parallel ITE: forks the cofactor recursions through `pool` until its
    /// split depth is exhausted.
    pub fn apply_ite_par(&self, pool: &impl WorkerPool, f: Ref, g: Ref, h: Ref) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        pool.install(|| self.ite_impl(f, g, h, pool, 0))
    }

    pub(crate) fn ite_rec(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        self.ite_impl(f, g, h, &Sequential, 0)
    }

    pub(crate) fn ite_impl<P: WorkerPool>(&self, f: Ref, g: Ref, h: Ref, pool: &P, depth: u32) -> Ref {
        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // From now on, F is known not to be a constant.
        debug_assert!(!self.is_terminal(f));

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        //   ite(F,1,~F) => 1
        //   ite(F,F,1) => 1
        //   ite(F,~F,0) => 0
        //   ite(F,0,F) => F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }
        if self.is_one(g) && h == -f {
            return self.one;
        }
        if g == f && self.is_one(h) {
            return self.one;
        }
        if g == -f && self.is_zero(h) {
            return self.zero;
        }
        if self.is_zero(g) && h == f {
            return f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        let (g, h) = (
            if g == f {
                self.one
            } else if g == -f {
                self.zero
            } else {
                g
            },
            if h == f {
                self.zero
            } else if h == -f {
                self.one
            } else {
                h
            },
        );

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        debug_assert_ne!(i, 0);

        // Equivalent pairs:
        //   ite(F,1,H) == ite(H,1,F) == F ∨ H
        //   ite(F,G,0) == ite(G,F,0) == F ∧ G
        //   ite(F,G,1) == ite(~G,~F,1) == F -> G
        //   ite(F,0,H) == ite(~H,0,~F) == ~F ∧ H
        //   ite(F,G,~G) == ite(G,F,~F)
        // (choose the one with the lowest top variable)
        if self.is_one(g) && k != 0 && k < i {
            return self.ite_impl(h, self.one, f, pool, depth);
        }
        if self.is_zero(h) && j != 0 && j < i {
            return self.ite_impl(g, f, self.zero, pool, depth);
        }
        if self.is_one(h) && j != 0 && j < i {
            return self.ite_impl(-g, -f, self.one, pool, depth);
        }
        if self.is_zero(g) && k != 0 && k < i {
            return self.ite_impl(-h, self.zero, -f, pool, depth);
        }
        if g == -h && j != 0 && j < i {
            return self.ite_impl(g, f, -f, pool, depth);
        }

        // Make sure the first two operands are regular (not complemented):
        //   ite(~F,G,H) => ite(F,H,G)
        //   ite(F,~G,H) => ~ite(F,G,~H)
        let (mut f, mut g, mut h) = (f, g, h);
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }
        let (f, g, h) = (f, g, h);

        let key = OpKey::Ite(f, g, h);
        if let Some(res) = self.cache.get(&key) {
            return if n { -res } else { res };
        }

        // Shannon expansion on the top variable.
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        let mut m = self.variable(f.index());
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }
        debug_assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let (e, t) = if depth < pool.split_depth() {
            pool.join(
                || self.ite_impl(f0, g0, h0, pool, depth + 1),
                || self.ite_impl(f1, g1, h1, pool, depth + 1),
            )
        } else {
            (
                self.ite_impl(f0, g0, h0, pool, depth),
                self.ite_impl(f1, g1, h1, pool, depth),
            )
        };

        let res = self.mk_node(m, e, t);
        debug!("computed: ite({}, {}, {}) -> {}", f, g, h, res);
        self.cache.insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    fn maybe_constant(&self, node: Ref) -> Option<bool> {
        if self.is_zero(node) {
            Some(false)
        } else if self.is_one(node) {
            Some(true)
        } else {
            None
        }
    }

    /// Decides whether `ITE(f, g, h)` is a constant without constructing
    /// the result diagram. Returns `None` when it is not a constant.
    pub fn ite_constant(&self, f: Ref, g: Ref, h: Ref) -> Option<bool> {
        let _op = self.begin_op();
        self.ite_constant_rec(f, g, h)
    }

    fn ite_constant_rec(&self, f: Ref, g: Ref, h: Ref) -> Option<bool> {
        if self.is_one(f) {
            return self.maybe_constant(g);
        }
        if self.is_zero(f) {
            return self.maybe_constant(h);
        }
        debug_assert!(!self.is_terminal(f));

        if g == h {
            return self.maybe_constant(g);
        }
        if self.is_one(g) && self.is_zero(h) {
            return None;
        }
        if self.is_zero(g) && self.is_one(h) {
            return None;
        }
        if self.is_one(g) && h == -f {
            return Some(true);
        }
        if g == f && self.is_one(h) {
            return Some(true);
        }
        if g == -f && self.is_zero(h) {
            return Some(false);
        }
        if self.is_zero(g) && h == f {
            return None;
        }

        // A cached ITE result decides the question immediately.
        if let Some(res) = self.cache.get(&OpKey::Ite(f, g, h)) {
            return self.maybe_constant(res);
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        let mut m = i;
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }
        debug_assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let t = self.ite_constant_rec(f1, g1, h1)?;
        let e = self.ite_constant_rec(f0, g0, h0)?;
        if t == e {
            Some(t)
        } else {
            None
        }
    }

    /// Whether `f -> g` is a tautology.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.ite_constant(f, g, self.one) == Some(true)
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node);
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node);
        }
        res
    }

    /// Binary apply with leaf dispatch.
    ///
    /// Boolean operators reuse the ITE recursion. Arithmetic operators
    /// recurse over multi-terminal diagrams and combine `Int` leaves
    /// directly.
    pub fn apply_op(&self, op: BinOp, f: Ref, g: Ref) -> Ref {
        self.maybe_collect();
        let _guard = self.begin_op();
        match op {
            BinOp::And => self.ite_rec(f, g, self.zero),
            BinOp::Or => self.ite_rec(f, self.one, g),
            BinOp::Xor => self.ite_rec(f, -g, g),
            BinOp::Add | BinOp::Min | BinOp::Max => self.mt_apply_rec(op, f, g),
        }
    }

    fn combine_leaves(&self, op: BinOp, f: Ref, g: Ref) -> Ref {
        let a = self.int_value(f);
        let b = self.int_value(g);
        // Leaf payloads use two's-complement wrap-around on overflow, in
        // debug and release builds alike.
        let value = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Min => a.min(b),
            BinOp::Max => a.max(b),
            _ => unreachable!("Boolean operator in leaf combination"),
        };
        self.mk_int_leaf(value)
    }

    fn mt_apply_rec(&self, op: BinOp, f: Ref, g: Ref) -> Ref {
        if self.is_leaf(f) && self.is_leaf(g) {
            return self.combine_leaves(op, f, g);
        }

        // Add/Min/Max are commutative: order the operands for cache reuse.
        let (f, g) = if f.unsigned() > g.unsigned() { (g, f) } else { (f, g) };

        let key = OpKey::MtApply(op, f, g);
        if let Some(res) = self.cache.get(&key) {
            return res;
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let m = match (i, j) {
            (0, j) => j,
            (i, 0) => i,
            (i, j) => i.min(j),
        };
        debug_assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let e = self.mt_apply_rec(op, f0, g0);
        let t = self.mt_apply_rec(op, f1, g1);

        let res = self.mk_node(m, e, t);
        self.cache.insert(key, res);
        res
    }

    /// All node indices reachable from `nodes` (complement marks ignored).
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> FxHashSet<u32> {
        let mut visited = FxHashSet::default();
        let mut queue: VecDeque<u32> = nodes.into_iter().map(|r| r.index()).collect();

        while let Some(i) = queue.pop_front() {
            if visited.insert(i) {
                match self.node(i) {
                    Node::Internal { low, high, .. } => {
                        queue.push_back(low.index());
                        queue.push_back(high.index());
                    }
                    Node::Leaf { .. } => {}
                    Node::Map { replace, next, .. } => {
                        queue.push_back(replace.index());
                        queue.push_back(next.index());
                    }
                }
            }
        }

        visited
    }

    /// Number of nodes (including terminals) in the diagram rooted at `f`.
    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }

    /// The set of variables tested anywhere in the diagram rooted at `f`.
    pub fn support(&self, f: Ref) -> VarSet {
        let vars = self
            .descendants([f])
            .into_iter()
            .filter_map(|i| match self.node(i) {
                Node::Internal { variable, .. } => Some(Var::new(variable)),
                _ => None,
            });
        VarSet::new(vars)
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        }
        if self.is_one(node) {
            return "(1)".to_string();
        }
        match self.node(node.index()) {
            Node::Leaf { tag, value } => format!("({:?}:{})", tag, value),
            Node::Internal { variable, .. } => format!(
                "{}:(x{}, {}, {})",
                node,
                variable,
                self.to_bracket_string(self.high_node(node)),
                self.to_bracket_string(self.low_node(node))
            ),
            Node::Map { variable, replace, next } => format!(
                "map(x{} <- {}, {})",
                variable,
                self.to_bracket_string(replace),
                self.to_bracket_string(next)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let not_x = -x;

        assert_eq!(bdd.variable(not_x.index()), 1);
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();

        assert!(bdd.is_terminal(bdd.zero()));
        assert!(bdd.is_zero(bdd.zero()));
        assert!(!bdd.is_one(bdd.zero()));

        assert!(bdd.is_terminal(bdd.one()));
        assert!(!bdd.is_zero(bdd.one()));
        assert!(bdd.is_one(bdd.one()));

        assert_eq!(bdd.variable(bdd.one().index()), 0);
        assert!(bdd.is_leaf(bdd.one()));
        assert_eq!(bdd.leaf_value(bdd.one()), (LeafTag::Bool, 1));
    }

    #[test]
    fn test_new_var_is_fresh() {
        let bdd = Bdd::default();
        let a = bdd.new_var();
        let b = bdd.new_var();
        assert_ne!(a, b);
        assert_eq!(b.id(), a.id() + 1);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(bdd.apply_and(x1, x2), x3);
        assert_eq!(f, bdd.mk_cube([1, 2, 3]));

        let f = bdd.apply_and(bdd.apply_and(x1, -x2), -x3);
        assert_eq!(f, bdd.mk_cube([1, -2, -3]));
    }

    #[test]
    fn test_clause() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_or(bdd.apply_or(x1, x2), x3);
        assert_eq!(f, bdd.mk_clause([1, 2, 3]));

        let f = bdd.apply_or(bdd.apply_or(x1, -x2), -x3);
        assert_eq!(f, bdd.mk_clause([1, -2, -3]));
    }

    #[test]
    fn test_canonicity_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        // a ∧ b built directly and via De Morgan yields the same handle.
        let direct = bdd.apply_and(x, y);
        let de_morgan = -bdd.apply_or(-x, -y);
        assert_eq!(direct, de_morgan);

        let f = -bdd.apply_and(x, y);
        let g = bdd.apply_or(-x, -y);
        assert_eq!(f, g);
    }

    #[test]
    fn test_absorption_canonicalizes() {
        let bdd = Bdd::default();

        let a = bdd.mk_var(1);
        let b = bdd.mk_var(2);

        // a ∨ (a ∧ b) ≡ a, down to handle equality.
        let g = bdd.apply_or(a, bdd.apply_and(a, b));
        assert_eq!(g, a);
    }

    #[test]
    fn test_two_node_conjunction_shape() {
        let bdd = Bdd::default();

        let a = bdd.mk_var(1);
        let b = bdd.mk_var(2);
        let f = bdd.apply_and(a, b);

        let internals = bdd
            .descendants([f])
            .into_iter()
            .filter(|&i| !bdd.node(i).is_leaf())
            .count();
        assert_eq!(internals, 2);

        // The terminal is shared with every other diagram in the table.
        assert!(bdd.descendants([f]).contains(&bdd.one().index()));
    }

    #[test]
    fn test_xor_itself_and_contrary() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);

        assert_eq!(bdd.apply_xor(f, f), bdd.zero());
        assert_eq!(bdd.apply_xor(f, -f), bdd.one());
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        // Terminal cases.
        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one(), g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero(), g, h), h);

        // Standard triples, with f testing a variable above both g and h.
        let f = bdd.mk_node(1, bdd.one(), h);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, -g, bdd.one()), -bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, bdd.zero(), -h), -bdd.apply_or(f, h));

        // Constants.
        let f = bdd.mk_var(5);
        assert_eq!(bdd.apply_ite(f, g, g), g);
        assert_eq!(bdd.apply_ite(f, bdd.one(), bdd.zero()), f);
        assert_eq!(bdd.apply_ite(f, bdd.zero(), bdd.one()), -f);

        // General case with complemented operands.
        let f = bdd.mk_var(6);
        let g = bdd.mk_var(7);
        let h = bdd.mk_var(8);
        let result = bdd.mk_node(bdd.variable(f.index()), -g, -h);
        assert_eq!(bdd.apply_ite(-f, -g, -h), result);
    }

    #[test]
    fn test_ite_cache_polarity() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        let f = bdd.apply_xor(x1, x2);
        let g = bdd.apply_xor(x1, x2);
        assert_eq!(f, g);

        let f = bdd.apply_xor(x1, -x2);
        let g = bdd.apply_xor(x1, -x2);
        assert_eq!(f, g);
    }

    #[test]
    fn test_ite_constant() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, x2);

        assert!(bdd.is_implies(f, x1));
        assert!(bdd.is_implies(f, x2));
        assert!(!bdd.is_implies(f, -x1));
        assert!(!bdd.is_implies(f, -x2));
        assert!(bdd.is_implies(f, bdd.apply_and(x1, x2)));
        assert!(bdd.is_implies(f, bdd.apply_or(x1, x2)));
        assert!(bdd.is_implies(x1, bdd.one()));
        assert!(bdd.is_implies(bdd.zero(), x1));
        assert!(bdd.is_implies(x1, bdd.apply_or(x1, x2)));

        assert_eq!(bdd.ite_constant(x1, bdd.one(), bdd.one()), Some(true));
        assert_eq!(bdd.ite_constant(x1, x2, bdd.zero()), None);
    }

    #[test]
    fn test_parallel_ite_matches_sequential() {
        use crate::pool::Workers;

        let bdd = Bdd::default();
        let pool = Workers::new(4);
        pool.set_split_depth(Some(3));

        // An xor chain has exponentially many paths but a small diagram.
        let vars: Vec<Ref> = (1..=10).map(|v| bdd.mk_var(v)).collect();
        let seq = vars.iter().skip(1).fold(vars[0], |acc, &v| bdd.apply_xor(acc, v));
        let par = {
            let mut acc = vars[0];
            for &v in vars.iter().skip(1) {
                acc = bdd.apply_ite_par(&pool, acc, -v, v);
            }
            acc
        };
        assert_eq!(seq, par);
    }

    #[test]
    fn test_mt_apply_add() {
        let bdd = Bdd::default();

        let three = bdd.mk_int_leaf(3);
        let five = bdd.mk_int_leaf(5);
        assert_eq!(bdd.mk_int_leaf(3), three, "leaves are hash-consed");

        // f = if x1 then 3 else 5, g = if x2 then 10 else 0.
        let f = bdd.mk_node(1, five, three);
        let ten = bdd.mk_int_leaf(10);
        let zero = bdd.mk_int_leaf(0);
        let g = bdd.mk_node(2, zero, ten);

        let sum = bdd.apply_op(BinOp::Add, f, g);

        // x1=1, x2=1 -> 13; x1=0, x2=0 -> 5.
        let (s11, _) = {
            let (lo, hi) = bdd.top_cofactors(sum, 1);
            (bdd.top_cofactors(hi, 2).1, lo)
        };
        assert_eq!(bdd.int_value(s11), 13);
        let s00 = {
            let (lo, _) = bdd.top_cofactors(sum, 1);
            bdd.top_cofactors(lo, 2).0
        };
        assert_eq!(bdd.int_value(s00), 5);
    }

    #[test]
    fn test_mt_apply_add_wraps_on_overflow() {
        let bdd = Bdd::default();

        let big = bdd.mk_int_leaf(i64::MAX);
        let one = bdd.mk_int_leaf(1);
        let sum = bdd.apply_op(BinOp::Add, big, one);
        assert_eq!(bdd.int_value(sum), i64::MIN);
    }

    #[test]
    fn test_mt_apply_min_max() {
        let bdd = Bdd::default();

        let a = bdd.mk_node(1, bdd.mk_int_leaf(2), bdd.mk_int_leaf(9));
        let b = bdd.mk_node(1, bdd.mk_int_leaf(4), bdd.mk_int_leaf(1));

        let min = bdd.apply_op(BinOp::Min, a, b);
        let max = bdd.apply_op(BinOp::Max, a, b);

        let (min_lo, min_hi) = bdd.top_cofactors(min, 1);
        assert_eq!(bdd.int_value(min_lo), 2);
        assert_eq!(bdd.int_value(min_hi), 1);

        let (max_lo, max_hi) = bdd.top_cofactors(max, 1);
        assert_eq!(bdd.int_value(max_lo), 4);
        assert_eq!(bdd.int_value(max_hi), 9);
    }

    #[test]
    fn test_mt_apply_collapses_equal_children() {
        let bdd = Bdd::default();

        // min(f, 0) where f >= 0 everywhere collapses to the 0 leaf.
        let f = bdd.mk_node(1, bdd.mk_int_leaf(0), bdd.mk_int_leaf(7));
        let zero = bdd.mk_int_leaf(0);
        assert_eq!(bdd.apply_op(BinOp::Min, f, zero), zero);
    }

    #[test]
    fn test_support() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([1, -3, 5]);
        let support = bdd.support(f);
        let ids: Vec<u32> = support.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    #[should_panic(expected = "variable ordering violated")]
    fn test_mk_node_rejects_bad_ordering() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        // A node testing x2 may not have a child testing x1.
        bdd.mk_node(2, x1, bdd.one());
    }

    #[test]
    fn test_shared_structure_size() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let f = bdd.apply_or(bdd.apply_eq(x1, x2), x3);

        assert!(bdd.size(f) >= 3);
        assert_eq!(bdd.size(bdd.one()), 1);
    }
}
