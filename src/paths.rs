//! Path counting and enumeration of satisfying assignments.
//!
//! A path assigns only the variables actually tested along it, so it stands
//! for a whole cube of full assignments. Enumeration is depth-first and
//! visits the high branch before the low branch, so paths arrive in
//! lexicographic order with "true" first.

use num_bigint::BigUint;
use rustc_hash::FxHashMap;

use crate::bdd::Bdd;
use crate::node::Node;
use crate::reference::Ref;
use crate::types::Lit;

impl Bdd {
    /// Number of paths from `f` to the `1` terminal.
    ///
    /// Unlike [`Bdd::sat_count`] this depends on the diagram's shape, not
    /// only on the function.
    pub fn num_paths(&self, f: Ref) -> BigUint {
        let mut memo = FxHashMap::default();
        self.num_paths_rec(f, &mut memo)
    }

    fn num_paths_rec(&self, f: Ref, memo: &mut FxHashMap<i32, BigUint>) -> BigUint {
        if self.is_zero(f) {
            return BigUint::from(0u32);
        }
        if self.is_one(f) {
            return BigUint::from(1u32);
        }

        // Complement marks change which paths reach 1, so memoization is
        // keyed by the signed edge.
        if let Some(count) = memo.get(&f.get()) {
            return count.clone();
        }

        let count = self.num_paths_rec(self.low_node(f), memo)
            + self.num_paths_rec(self.high_node(f), memo);
        memo.insert(f.get(), count.clone());
        count
    }

    /// Calls `callback` once per satisfying path of `f`, with the literals
    /// of the variables tested along the path.
    pub fn for_each_path(&self, f: Ref, mut callback: impl FnMut(&[Lit])) {
        let mut path = Vec::new();
        self.walk_paths(f, &mut path, &mut callback);
    }

    fn walk_paths(&self, f: Ref, path: &mut Vec<Lit>, callback: &mut impl FnMut(&[Lit])) {
        if self.is_zero(f) {
            return;
        }
        if self.is_one(f) {
            callback(path);
            return;
        }

        let v = self.variable(f.index());
        path.push(Lit::pos(v));
        self.walk_paths(self.high_node(f), path, callback);
        path.pop();

        path.push(Lit::neg(v));
        self.walk_paths(self.low_node(f), path, callback);
        path.pop();
    }

    /// Calls `callback` once per root-to-leaf path of a multi-terminal
    /// diagram, with the path literals and the leaf edge reached.
    pub fn for_each_leaf(&self, f: Ref, mut callback: impl FnMut(&[Lit], Ref)) {
        let mut path = Vec::new();
        self.walk_leaves(f, &mut path, &mut callback);
    }

    fn walk_leaves(&self, f: Ref, path: &mut Vec<Lit>, callback: &mut impl FnMut(&[Lit], Ref)) {
        match self.node(f.index()) {
            Node::Leaf { .. } => callback(path, f),
            Node::Internal { variable, .. } => {
                path.push(Lit::pos(variable));
                self.walk_leaves(self.high_node(f), path, callback);
                path.pop();

                path.push(Lit::neg(variable));
                self.walk_leaves(self.low_node(f), path, callback);
                path.pop();
            }
            n => panic!("cannot enumerate paths of {:?}", n),
        }
    }

    /// One satisfying path of `f`, or `None` if `f` is unsatisfiable.
    /// Prefers the high branch, matching the enumeration order.
    pub fn first_sat(&self, f: Ref) -> Option<Vec<Lit>> {
        if self.is_zero(f) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = f;
        while !self.is_one(current) {
            let v = self.variable(current.index());
            let high = self.high_node(current);
            if self.is_zero(high) {
                path.push(Lit::neg(v));
                current = self.low_node(current);
            } else {
                path.push(Lit::pos(v));
                current = high;
            }
        }
        Some(path)
    }
}
