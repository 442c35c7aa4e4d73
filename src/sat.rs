//! Evaluation and model counting.

use num_bigint::BigUint;
use rustc_hash::FxHashMap;

use crate::bdd::Bdd;
use crate::node::Node;
use crate::reference::Ref;
use crate::types::{Var, VarSet};

impl Bdd {
    /// Evaluates `f` under the assignment that sets exactly the variables
    /// in `true_vars`.
    pub fn eval(&self, f: Ref, true_vars: &VarSet) -> bool {
        let mut current = f;
        loop {
            if self.is_one(current) {
                return true;
            }
            if self.is_zero(current) {
                return false;
            }
            match self.node(current.index()) {
                Node::Internal { variable, .. } => {
                    current = if true_vars.contains(Var::new(variable)) {
                        self.high_node(current)
                    } else {
                        self.low_node(current)
                    };
                }
                n => panic!("cannot evaluate {:?} as a Boolean diagram", n),
            }
        }
    }

    /// Evaluates a multi-terminal diagram to the payload of the leaf
    /// reached under the assignment.
    pub fn eval_int(&self, f: Ref, true_vars: &VarSet) -> i64 {
        let mut current = f;
        loop {
            match self.node(current.index()) {
                Node::Internal { variable, .. } => {
                    current = if true_vars.contains(Var::new(variable)) {
                        self.high_node(current)
                    } else {
                        self.low_node(current)
                    };
                }
                Node::Leaf { .. } => return self.int_value(current),
                n => panic!("cannot evaluate {:?}", n),
            }
        }
    }

    pub fn is_sat(&self, f: Ref) -> bool {
        !self.is_zero(f)
    }

    pub fn is_tautology(&self, f: Ref) -> bool {
        self.is_one(f)
    }

    /// Number of satisfying assignments of `f` over `num_vars` variables.
    ///
    /// Uses the halving identity `|f| = (|f0| + |f1|) / 2` on shared
    /// subdiagrams and the complement rule `|~f| = 2^n - |f|`, so counts
    /// stay exact for diagrams far beyond machine-word path counts.
    ///
    /// # Panics
    ///
    /// Panics if `num_vars` is smaller than some variable tested in `f`,
    /// or if `f` contains non-Boolean leaves.
    pub fn sat_count(&self, f: Ref, num_vars: u32) -> BigUint {
        for v in self.support(f).iter() {
            assert!(
                v.id() <= num_vars,
                "sat count over {} variables, but {} is tested",
                num_vars,
                v
            );
        }
        let mut memo = FxHashMap::default();
        self.sat_count_rec(f, num_vars, &mut memo)
    }

    /// Number of satisfying assignments of `f` over an explicit variable
    /// domain, which must contain the support of `f`.
    pub fn sat_count_over(&self, f: Ref, domain: &VarSet) -> BigUint {
        for v in self.support(f).iter() {
            assert!(
                domain.contains(v),
                "{} is tested but not in the counting domain {}",
                v,
                domain
            );
        }
        let mut memo = FxHashMap::default();
        self.sat_count_rec(f, domain.len() as u32, &mut memo)
    }

    fn sat_count_rec(&self, f: Ref, n: u32, memo: &mut FxHashMap<u32, BigUint>) -> BigUint {
        if self.is_zero(f) {
            return BigUint::from(0u32);
        }
        if self.is_one(f) {
            return BigUint::from(1u32) << n;
        }
        if f.is_negated() {
            return (BigUint::from(1u32) << n) - self.sat_count_rec(-f, n, memo);
        }

        if let Some(count) = memo.get(&f.index()) {
            return count.clone();
        }

        let count = match self.node(f.index()) {
            Node::Internal { low, high, .. } => {
                // Each cofactor is independent of the tested variable, so
                // its count over the full domain is even and the halving
                // stays exact.
                (self.sat_count_rec(low, n, memo) + self.sat_count_rec(high, n, memo)) >> 1u32
            }
            n => panic!("cannot count models of {:?}", n),
        };

        memo.insert(f.index(), count.clone());
        count
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_eval() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, -x2);

        assert!(bdd.eval(f, &VarSet::from_ids([1])));
        assert!(!bdd.eval(f, &VarSet::from_ids([1, 2])));
        assert!(!bdd.eval(f, &VarSet::from_ids([2])));
        assert!(!bdd.eval(f, &VarSet::new([])));
        assert!(bdd.eval(bdd.one(), &VarSet::new([])));
        assert!(!bdd.eval(bdd.zero(), &VarSet::new([])));
    }

    #[test]
    fn test_eval_int() {
        let bdd = Bdd::default();

        // if x1 then 7 else -3
        let f = bdd.mk_node(1, bdd.mk_int_leaf(-3), bdd.mk_int_leaf(7));
        assert_eq!(bdd.eval_int(f, &VarSet::from_ids([1])), 7);
        assert_eq!(bdd.eval_int(f, &VarSet::from_ids([2])), -3);
    }

    #[test]
    fn test_sat_count_conjunction() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let f = bdd.apply_and(x1, x2);

        assert_eq!(bdd.sat_count(f, 2), BigUint::from(1u32));
        assert_eq!(bdd.sat_count(f, 3), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(x1, 2), BigUint::from(2u32));
    }

    #[test]
    fn test_sat_count_complement() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([1, 2, 3]);
        let n = 5;
        let total = BigUint::from(1u32) << n;
        assert_eq!(
            bdd.sat_count(f, n) + bdd.sat_count(-f, n),
            total,
            "a function and its complement partition the space"
        );
    }

    #[test]
    fn test_sat_count_terminals() {
        let bdd = Bdd::default();

        assert_eq!(bdd.sat_count(bdd.zero(), 4), BigUint::from(0u32));
        assert_eq!(bdd.sat_count(bdd.one(), 4), BigUint::from(16u32));
        assert_eq!(bdd.sat_count(bdd.one(), 0), BigUint::from(1u32));
    }

    #[test]
    fn test_sat_count_xor_chain() {
        let bdd = Bdd::default();

        let n = 64;
        let mut f = bdd.mk_var(1);
        for v in 2..=n {
            f = bdd.apply_xor(f, bdd.mk_var(v));
        }
        // An xor chain is satisfied by exactly half of all assignments.
        assert_eq!(bdd.sat_count(f, n), BigUint::from(1u32) << (n - 1));
    }

    #[test]
    fn test_sat_count_agrees_with_quantification() {
        let bdd = Bdd::default();

        // f = (x1 ∨ x2) ∧ (¬x2 ∨ x3)
        let f = {
            let a = bdd.mk_clause([1, 2]);
            let b = bdd.mk_clause([-2, 3]);
            bdd.apply_and(a, b)
        };
        let g = bdd.exists(f, &VarSet::from_ids([2]));

        // Count (x1, x3) assignments for which some value of x2 satisfies
        // f, by brute force, and compare against counting ∃x2.f over the
        // remaining domain.
        let mut expected = 0u32;
        for bits in 0..4u32 {
            let mut assignment = Vec::new();
            if bits & 1 != 0 {
                assignment.push(1);
            }
            if bits & 2 != 0 {
                assignment.push(3);
            }
            let without_x2 = VarSet::from_ids(assignment.iter().copied());
            let with_x2 = VarSet::from_ids(assignment.iter().copied().chain([2]));
            if bdd.eval(f, &without_x2) || bdd.eval(f, &with_x2) {
                expected += 1;
            }
        }
        assert_eq!(expected, 3);
        assert_eq!(
            bdd.sat_count_over(g, &VarSet::from_ids([1, 3])),
            BigUint::from(expected)
        );
    }

    #[test]
    fn test_sat_count_over_sparse_domain() {
        let bdd = Bdd::default();

        let f = bdd.mk_var(5);
        assert_eq!(
            bdd.sat_count_over(f, &VarSet::from_ids([5])),
            BigUint::from(1u32)
        );
        assert_eq!(
            bdd.sat_count_over(f, &VarSet::from_ids([2, 5, 9])),
            BigUint::from(4u32)
        );
    }

    #[test]
    #[should_panic(expected = "not in the counting domain")]
    fn test_sat_count_over_rejects_missing_support() {
        let bdd = Bdd::default();
        let f = bdd.mk_var(5);
        bdd.sat_count_over(f, &VarSet::from_ids([1, 2]));
    }

    #[test]
    fn test_sat_count_after_gc() {
        let bdd = Bdd::default();

        let f = bdd.apply_or(bdd.mk_cube([1, 2]), bdd.mk_cube([3, 4]));
        let before = bdd.sat_count(f, 4);

        bdd.protect(f);
        for v in 20..40 {
            bdd.mk_cube([v, v + 1]);
        }
        bdd.collect_garbage(&[]);

        assert_eq!(bdd.sat_count(f, 4), before);
    }
}
