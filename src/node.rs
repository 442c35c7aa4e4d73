use crate::reference::Ref;
use crate::utils::{pairing2, pairing3, MyHash};

/// The type tag of a leaf node.
///
/// `Bool` leaves are the shared terminal of Boolean diagrams (there is a
/// single stored `1` terminal; `0` is its complement edge). `Int` leaves
/// carry an `i64` payload for multi-terminal diagrams.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LeafTag {
    Bool,
    Int,
}

impl LeafTag {
    fn discriminant(self) -> u64 {
        match self {
            LeafTag::Bool => 0,
            LeafTag::Int => 1,
        }
    }
}

/// A node descriptor: the value stored in a unique-table slot.
///
/// A fixed-size `Copy` record with an explicit kind discriminator, replacing
/// the historical two-word bit-packed layout. Edges are `Ref` indices, never
/// pointers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Node {
    /// An internal decision node. Invariant: `high` is never complemented
    /// in a stored node, and the children's variables are strictly greater
    /// than `variable`.
    Internal { variable: u32, low: Ref, high: Ref },
    /// A terminal carrying a type tag and an opaque payload.
    Leaf { tag: LeafTag, value: u64 },
    /// One link of a substitution chain for compose/rename: replace
    /// `variable` by the function `replace`, continue with `next`.
    /// Chains are ordered by ascending variable and terminated by the
    /// `one` terminal.
    Map { variable: u32, replace: Ref, next: Ref },
}

impl Node {
    /// The decision variable of this node; 0 for leaves, which sorts
    /// terminals below every real variable in top-variable comparisons.
    pub fn variable(&self) -> u32 {
        match *self {
            Node::Internal { variable, .. } | Node::Map { variable, .. } => variable,
            Node::Leaf { .. } => 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map { .. })
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        match *self {
            Node::Internal { variable, low, high } => pairing3(
                variable as u64,
                low.unsigned() as u64,
                high.unsigned() as u64,
            ),
            Node::Leaf { tag, value } => pairing3(u64::MAX, tag.discriminant(), value),
            Node::Map { variable, replace, next } => pairing2(
                u64::MAX - 1,
                pairing3(
                    variable as u64,
                    replace.unsigned() as u64,
                    next.unsigned() as u64,
                ),
            ),
        }
    }
}
