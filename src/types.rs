//! Type-safe wrappers for variables, literals and variable sets.

use std::fmt;

/// A variable identifier (1-indexed).
///
/// Variable IDs double as positions in the fixed variable order: smaller IDs
/// are closer to the root. ID 0 is reserved for terminals.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables are 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Returns the raw variable ID.
    pub fn id(self) -> u32 {
        self.0
    }

    /// The positive literal of this variable.
    pub fn pos(self) -> Lit {
        Lit(self.0 as i32)
    }

    /// The negative literal of this variable.
    pub fn neg(self) -> Lit {
        Lit(-(self.0 as i32))
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A literal: a variable together with a polarity, DIMACS-style.
///
/// Internally a non-zero `i32` whose absolute value is the variable ID and
/// whose sign is the polarity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(i32);

impl Lit {
    pub fn pos(var: u32) -> Self {
        assert_ne!(var, 0, "Variable IDs must be >= 1");
        Lit(var as i32)
    }

    pub fn neg(var: u32) -> Self {
        assert_ne!(var, 0, "Variable IDs must be >= 1");
        Lit(-(var as i32))
    }

    pub fn from_dimacs(value: i32) -> Self {
        assert_ne!(value, 0, "Literals must be non-zero");
        Lit(value)
    }

    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl From<i32> for Lit {
    fn from(value: i32) -> Self {
        Lit::from_dimacs(value)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-x{}", self.0.unsigned_abs())
        } else {
            write!(f, "x{}", self.0)
        }
    }
}

/// An ordered set of variables, optionally named.
///
/// Variable sets are the domain arguments of quantification, relational
/// products and model counting. The variables are kept sorted in the global
/// variable order and deduplicated.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VarSet {
    name: Option<String>,
    vars: Vec<Var>,
}

impl VarSet {
    pub fn new(vars: impl IntoIterator<Item = Var>) -> Self {
        let mut vars: Vec<Var> = vars.into_iter().collect();
        vars.sort();
        vars.dedup();
        Self { name: None, vars }
    }

    pub fn named(name: impl Into<String>, vars: impl IntoIterator<Item = Var>) -> Self {
        let mut set = Self::new(vars);
        set.name = Some(name.into());
        set
    }

    /// Convenience constructor from raw variable IDs.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self::new(ids.into_iter().map(Var::new))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn contains(&self, var: Var) -> bool {
        self.vars.binary_search(&var).is_ok()
    }

    /// The variables in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Var> + '_ {
        self.vars.iter().copied()
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// A copy of this set without `var`.
    pub fn without(&self, var: Var) -> VarSet {
        VarSet::new(self.iter().filter(|&v| v != var))
    }

    /// The union of two sets (unnamed).
    pub fn union(&self, other: &VarSet) -> VarSet {
        VarSet::new(self.iter().chain(other.iter()))
    }
}

impl fmt::Display for VarSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}", name)?;
        }
        write!(f, "{{")?;
        for (i, v) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}}")
    }
}
