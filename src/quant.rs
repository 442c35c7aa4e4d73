//! Quantification, relational product, substitution.
//!
//! Quantified variables are passed as a cube of positive literals, which is
//! itself a hash-consed diagram, so quantification results are cacheable
//! under a `(function, cube)` key with no auxiliary set type on the hot
//! path. [`Bdd::and_exists`] fuses conjunction with existential
//! quantification and short-circuits a quantification level as soon as one
//! branch reaches `1`. Substitutions travel as hash-consed map chains
//! (see [`crate::node::Node::Map`]).
//!
//! Cubes and maps built by the entry points are interned while the
//! operation lock is held shared, so they stay live for the duration of
//! the call without being rooted.

use crate::bdd::{Bdd, OpKey};
use crate::node::Node;
use crate::pool::{Sequential, WorkerPool};
use crate::reference::Ref;
use crate::types::{Var, VarSet};

impl Bdd {
    /// Existential quantification: `∃ vars. f`.
    pub fn exists(&self, f: Ref, vars: &VarSet) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let cube = self.mk_var_cube(vars);
        self.exists_impl(f, cube, &Sequential, 0)
    }

    /// Parallel [`Bdd::exists`].
    pub fn exists_par(&self, pool: &impl WorkerPool, f: Ref, vars: &VarSet) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let cube = self.mk_var_cube(vars);
        pool.install(|| self.exists_impl(f, cube, pool, 0))
    }

    /// Universal quantification: `∀ vars. f = ¬∃ vars. ¬f`.
    pub fn forall(&self, f: Ref, vars: &VarSet) -> Ref {
        -self.exists(-f, vars)
    }

    /// Fused `∃ vars. (f ∧ g)` without materializing the conjunction.
    pub fn and_exists(&self, f: Ref, g: Ref, vars: &VarSet) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let cube = self.mk_var_cube(vars);
        self.and_exists_impl(f, g, cube, &Sequential, 0)
    }

    /// Parallel [`Bdd::and_exists`].
    pub fn and_exists_par(&self, pool: &impl WorkerPool, f: Ref, g: Ref, vars: &VarSet) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let cube = self.mk_var_cube(vars);
        pool.install(|| self.and_exists_impl(f, g, cube, pool, 0))
    }

    /// The image step of symbolic reachability.
    ///
    /// `pairs` lists `(current, next)` state variables. Computes
    /// `∃ current. (states ∧ rel)` and renames each next-state variable
    /// back to its current-state partner, so the result again ranges over
    /// current-state variables.
    pub fn relational_product(&self, states: Ref, rel: Ref, pairs: &[(Var, Var)]) -> Ref {
        self.relational_product_par(&Sequential, states, rel, pairs)
    }

    /// Parallel [`Bdd::relational_product`].
    pub fn relational_product_par(
        &self,
        pool: &impl WorkerPool,
        states: Ref,
        rel: Ref,
        pairs: &[(Var, Var)],
    ) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let current = VarSet::new(pairs.iter().map(|&(c, _)| c));
        let cube = self.mk_var_cube(&current);
        let back: Vec<(Var, Var)> = pairs.iter().map(|&(c, n)| (n, c)).collect();
        let map = self.mk_rename_map(&back);
        let image = pool.install(|| self.and_exists_impl(states, rel, cube, pool, 0));
        self.subst_rec(image, map)
    }

    /// Simultaneous substitution of every variable in the map chain by its
    /// replacement function. See [`Bdd::mk_map`].
    pub fn substitute(&self, f: Ref, map: Ref) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        self.subst_rec(f, map)
    }

    /// Renames each `(from, to)` variable pair in `f`.
    pub fn rename(&self, f: Ref, pairs: &[(Var, Var)]) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let map = self.mk_rename_map(pairs);
        self.subst_rec(f, map)
    }

    /// Functional composition: `f[v := g]`.
    pub fn compose(&self, f: Ref, v: Var, g: Ref) -> Ref {
        self.maybe_collect();
        let _op = self.begin_op();
        let map = self.mk_map(&[(v, g)]);
        self.subst_rec(f, map)
    }

    /// Restricts `f` by the assignment described by `cube`, which may
    /// contain literals of both polarities.
    pub fn cofactor_cube(&self, f: Ref, cube: Ref) -> Ref {
        assert!(!self.is_zero(cube), "restricting cube must not be false");
        self.maybe_collect();
        let _op = self.begin_op();
        self.cofactor_rec(f, cube)
    }

    fn exists_impl<P: WorkerPool>(&self, f: Ref, cube: Ref, pool: &P, depth: u32) -> Ref {
        debug_assert!(!cube.is_negated(), "quantification cube must be positive");
        if self.is_leaf(f) || self.is_one(cube) {
            return f;
        }

        let fv = self.variable(f.index());
        let mut cube = cube;
        while !self.is_one(cube) && self.variable(cube.index()) < fv {
            cube = self.high(cube.index());
        }
        if self.is_one(cube) {
            return f;
        }

        let key = OpKey::Exists(f, cube);
        if let Some(res) = self.cache.get(&key) {
            return res;
        }

        let cv = self.variable(cube.index());
        let (f0, f1) = self.top_cofactors(f, fv);

        let res = if cv == fv {
            let next = self.high(cube.index());
            let r0 = self.exists_impl(f0, next, pool, depth);
            if self.is_one(r0) {
                r0
            } else {
                let r1 = self.exists_impl(f1, next, pool, depth);
                self.ite_rec(r0, self.one(), r1)
            }
        } else {
            let (e, t) = if depth < pool.split_depth() {
                pool.join(
                    || self.exists_impl(f0, cube, pool, depth + 1),
                    || self.exists_impl(f1, cube, pool, depth + 1),
                )
            } else {
                (
                    self.exists_impl(f0, cube, pool, depth),
                    self.exists_impl(f1, cube, pool, depth),
                )
            };
            self.mk_node(fv, e, t)
        };

        self.cache.insert(key, res);
        res
    }

    fn and_exists_impl<P: WorkerPool>(
        &self,
        f: Ref,
        g: Ref,
        cube: Ref,
        pool: &P,
        depth: u32,
    ) -> Ref {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return self.zero();
        }
        if self.is_one(f) {
            return self.exists_impl(g, cube, pool, depth);
        }
        if self.is_one(g) || f == g {
            return self.exists_impl(f, cube, pool, depth);
        }
        if self.is_one(cube) {
            return self.ite_impl(f, g, self.zero(), pool, depth);
        }

        // Conjunction is commutative: order the operands for cache reuse.
        let (f, g) = if f.unsigned() > g.unsigned() { (g, f) } else { (f, g) };

        let fv = self.variable(f.index());
        let gv = self.variable(g.index());
        debug_assert!(fv != 0 && gv != 0);
        let m = fv.min(gv);

        let mut cube = cube;
        while !self.is_one(cube) && self.variable(cube.index()) < m {
            cube = self.high(cube.index());
        }
        if self.is_one(cube) {
            return self.ite_impl(f, g, self.zero(), pool, depth);
        }

        let key = OpKey::AndExists(f, g, cube);
        if let Some(res) = self.cache.get(&key) {
            return res;
        }

        let cv = self.variable(cube.index());
        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);

        let res = if cv == m {
            let next = self.high(cube.index());
            let r0 = self.and_exists_impl(f0, g0, next, pool, depth);
            if self.is_one(r0) {
                r0
            } else {
                let r1 = self.and_exists_impl(f1, g1, next, pool, depth);
                self.ite_rec(r0, self.one(), r1)
            }
        } else {
            let (e, t) = if depth < pool.split_depth() {
                pool.join(
                    || self.and_exists_impl(f0, g0, cube, pool, depth + 1),
                    || self.and_exists_impl(f1, g1, cube, pool, depth + 1),
                )
            } else {
                (
                    self.and_exists_impl(f0, g0, cube, pool, depth),
                    self.and_exists_impl(f1, g1, cube, pool, depth),
                )
            };
            self.mk_node(m, e, t)
        };

        self.cache.insert(key, res);
        res
    }

    pub(crate) fn subst_rec(&self, f: Ref, map: Ref) -> Ref {
        if self.is_leaf(f) {
            return f;
        }

        let fv = self.variable(f.index());
        let mut map = map;
        while let Node::Map { variable, next, .. } = self.node(map.index()) {
            if variable >= fv {
                break;
            }
            map = next;
        }
        if !self.node(map.index()).is_map() {
            return f;
        }

        let key = OpKey::Compose(f, map);
        if let Some(res) = self.cache.get(&key) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, fv);
        let res = match self.node(map.index()) {
            Node::Map { variable, replace, next } if variable == fv => {
                let r0 = self.subst_rec(f0, next);
                let r1 = self.subst_rec(f1, next);
                self.ite_rec(replace, r1, r0)
            }
            _ => {
                let r0 = self.subst_rec(f0, map);
                let r1 = self.subst_rec(f1, map);
                // Replacements may introduce variables above `fv`, so the
                // result is rebuilt with ITE instead of mk_node.
                self.ite_rec(self.mk_var(fv), r1, r0)
            }
        };

        self.cache.insert(key, res);
        res
    }

    fn cube_literal(&self, cube: Ref) -> (bool, Ref) {
        let low = self.low_node(cube);
        let high = self.high_node(cube);
        if self.is_zero(low) {
            (true, high)
        } else if self.is_zero(high) {
            (false, low)
        } else {
            panic!("{} is not a cube", cube)
        }
    }

    fn cofactor_rec(&self, f: Ref, cube: Ref) -> Ref {
        if self.is_leaf(f) || self.is_one(cube) {
            return f;
        }

        let fv = self.variable(f.index());
        let mut cube = cube;
        while !self.is_one(cube) && self.variable(cube.index()) < fv {
            cube = self.cube_literal(cube).1;
        }
        if self.is_one(cube) {
            return f;
        }

        let key = OpKey::Cofactor(f, cube);
        if let Some(res) = self.cache.get(&key) {
            return res;
        }

        let cv = self.variable(cube.index());
        let (f0, f1) = self.top_cofactors(f, fv);

        let res = if cv == fv {
            let (positive, next) = self.cube_literal(cube);
            self.cofactor_rec(if positive { f1 } else { f0 }, next)
        } else {
            let r0 = self.cofactor_rec(f0, cube);
            let r1 = self.cofactor_rec(f1, cube);
            self.mk_node(fv, r0, r1)
        };

        self.cache.insert(key, res);
        res
    }
}
