//! # paradd: Parallel Multi-Terminal Decision Diagrams in Rust
//!
//! **`paradd`** is a thread-safe, manager-centric library for **Binary Decision Diagrams (BDDs)**
//! and their multi-terminal variants. It is designed for symbolic model checking, formal
//! verification, and combinatorial analysis on shared-memory machines.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All operations go through the [`Bdd`][crate::bdd::Bdd] manager.
//!   This ensures structural sharing (hash consing) and maintains the canonical form invariant.
//! - **Concurrent by Construction**: The manager is `Sync`. The unique table is sharded, the
//!   operation cache is lossy and striped, and heavy operations have `_par` variants that fork
//!   through a work-stealing [`WorkerPool`][crate::pool::WorkerPool].
//! - **Complement Edges**: Negation is a sign flip on a [`Ref`][crate::reference::Ref] handle,
//!   never an allocation, and equivalence up to negation is a handle comparison.
//! - **Typed Leaves**: Boolean terminals and integer leaves share one node store, so plain BDDs
//!   and multi-terminal diagrams (`Add`/`Min`/`Max` over `Int` leaves) use the same algebra.
//! - **Explicit Garbage Collection**: Nodes are reclaimed by mark-and-sweep at safe points.
//!   Results held across operations are registered with [`Bdd::protect`][crate::bdd::Bdd::protect].
//! - **1-Based Indexing**: Variables are 1-indexed (reserving 0 for terminals), simplifying
//!   integration with standard formats like DIMACS.
//!
//! ## Basic Usage
//!
//! ```rust
//! use paradd::{Bdd, VarSet};
//!
//! // 1. Initialize the manager
//! let bdd = Bdd::default();
//!
//! // 2. Create variables (1-indexed)
//! let x1 = bdd.mk_var(1);
//! let x2 = bdd.mk_var(2);
//!
//! // 3. Build a formula: f = (x1 AND x2) OR (NOT x1)
//! let f = bdd.apply_or(bdd.apply_and(x1, x2), -x1);
//!
//! // 4. Canonicity makes semantic checks cheap
//! assert_eq!(f, bdd.apply_imply(x1, x2));
//!
//! // 5. Evaluate and count models
//! assert!(bdd.eval(f, &VarSet::from_ids([2])));
//! assert_eq!(bdd.sat_count(f, 2), 3u32.into());
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: The heart of the library. Contains the [`Bdd`][crate::bdd::Bdd] manager,
//!   node construction, and the ITE/apply algebra.
//! - **[`table`]**: The sharded hash-consing unique table.
//! - **[`gc`]**: Mark-and-sweep garbage collection and the safe-point barrier.
//! - **[`pool`]**: The fork/join scheduler seam used by `_par` operations.

pub mod bdd;
pub mod cache;
pub mod gc;
pub mod node;
pub mod pool;
pub mod reference;
pub mod table;
pub mod types;
pub mod utils;

mod dot;
mod paths;
mod quant;
mod sat;

pub use bdd::{Bdd, BddOptions, BinOp};
pub use gc::{GcPhase, GcStats};
pub use node::{LeafTag, Node};
pub use pool::{Sequential, WorkerPool, Workers};
pub use reference::Ref;
pub use types::{Lit, Var, VarSet};
