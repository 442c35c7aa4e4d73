use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// An edge handle: a node-store index plus a complement bit.
///
/// The absolute value is the index of the referenced node, the sign is the
/// complement mark: `-r` denotes the logical negation of `r` without
/// allocating a separate node. Index 0 is reserved (the table sentry), so
/// every valid `Ref` is non-zero and negation is always meaningful.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Ref(i32);

impl Ref {
    /// A positive (non-complemented) reference to the node at `index`.
    pub fn positive(index: u32) -> Self {
        assert!(index > 0, "Ref index must be non-zero");
        assert!(index <= i32::MAX as u32, "Ref index out of range");
        Self(index as i32)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// The raw signed representation.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// The index of the referenced node, with the complement mark stripped.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// An unsigned encoding `(index << 1) | complement`, used for hashing.
    pub const fn unsigned(self) -> u32 {
        (self.0.unsigned_abs() << 1) | (self.0 < 0) as u32
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}",
            if self.is_negated() { "~" } else { "" },
            self.index()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negate() {
        let r = Ref::positive(5);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!(r.index(), 5);
        assert_eq!((-r).index(), 5);
    }

    #[test]
    fn test_unsigned() {
        let r = Ref::positive(3);
        assert_eq!(r.unsigned(), 6);
        assert_eq!((-r).unsigned(), 7);
    }

    #[test]
    fn test_display() {
        let r = Ref::positive(7);
        assert_eq!(r.to_string(), "@7");
        assert_eq!((-r).to_string(), "~@7");
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_index_panics() {
        Ref::positive(0);
    }
}
