use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

/// An opaque finite identity: a thread, an instruction occurrence, an
/// object, an array cell, or a primitive value.
///
/// Atoms are dense indices into their [`Universe`] and are immutable once
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom(u32);

impl Atom {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The finite set of atoms over which all relations in a problem are
/// defined.
///
/// Atoms are interned by name in allocation order; allocation order is
/// part of the determinism contract (repeated encodings of the same
/// program must produce the same universe).
#[derive(Debug, Clone, Default)]
pub struct Universe {
    names: Vec<String>,
    index: FxHashMap<String, Atom>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the existing atom if already present.
    pub fn atom(&mut self, name: &str) -> Atom {
        if let Some(&a) = self.index.get(name) {
            return a;
        }
        let a = Atom(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), a);
        a
    }

    pub fn lookup(&self, name: &str) -> Option<Atom> {
        self.index.get(name).copied()
    }

    /// Name of an atom. The atom must come from this universe.
    pub fn name(&self, atom: Atom) -> &str {
        &self.names[atom.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All atoms in allocation order.
    pub fn atoms(&self) -> impl Iterator<Item = Atom> + '_ {
        (0..self.names.len() as u32).map(Atom)
    }
}

/// An ordered tuple of atoms (arity 1 or 2 in this system).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple(Vec<Atom>);

impl Tuple {
    pub fn unary(a: Atom) -> Self {
        Tuple(vec![a])
    }

    pub fn pair(a: Atom, b: Atom) -> Self {
        Tuple(vec![a, b])
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn atom(&self, i: usize) -> Atom {
        self.0[i]
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.0
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, a) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", a.index())?;
        }
        write!(f, ")")
    }
}

/// A set of same-arity tuples with deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleSet {
    tuples: BTreeSet<Tuple>,
}

impl TupleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(t: Tuple) -> Self {
        let mut s = Self::new();
        s.insert(t);
        s
    }

    /// Insert a tuple; returns false if it was already present.
    pub fn insert(&mut self, t: Tuple) -> bool {
        self.tuples.insert(t)
    }

    pub fn contains(&self, t: &Tuple) -> bool {
        self.tuples.contains(t)
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    pub fn is_subset(&self, other: &TupleSet) -> bool {
        self.tuples.is_subset(&other.tuples)
    }
}

impl FromIterator<Tuple> for TupleSet {
    fn from_iter<I: IntoIterator<Item = Tuple>>(iter: I) -> Self {
        let mut s = Self::new();
        for t in iter {
            s.insert(t);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoms_are_interned_in_order() {
        let mut u = Universe::new();
        let a = u.atom("x");
        let b = u.atom("y");
        let a2 = u.atom("x");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(u.name(a), "x");
        assert_eq!(u.len(), 2);
    }

    #[test]
    fn lookup_missing_atom() {
        let u = Universe::new();
        assert!(u.lookup("nope").is_none());
        assert!(u.is_empty());
    }

    #[test]
    fn atoms_iterator_covers_universe() {
        let mut u = Universe::new();
        u.atom("a");
        u.atom("b");
        u.atom("c");
        let names: Vec<&str> = u.atoms().map(|a| u.name(a)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn tuple_arity_and_access() {
        let mut u = Universe::new();
        let a = u.atom("a");
        let b = u.atom("b");
        let t = Tuple::pair(a, b);
        assert_eq!(t.arity(), 2);
        assert_eq!(t.atom(0), a);
        assert_eq!(t.atom(1), b);
        assert_eq!(Tuple::unary(a).arity(), 1);
    }

    #[test]
    fn tuple_set_insert_and_contains() {
        let mut u = Universe::new();
        let a = u.atom("a");
        let b = u.atom("b");
        let mut s = TupleSet::new();
        assert!(s.insert(Tuple::pair(a, b)));
        assert!(!s.insert(Tuple::pair(a, b)));
        assert!(s.contains(&Tuple::pair(a, b)));
        assert!(!s.contains(&Tuple::pair(b, a)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn tuple_set_iteration_is_sorted() {
        let mut u = Universe::new();
        let a = u.atom("a");
        let b = u.atom("b");
        let s: TupleSet = vec![Tuple::unary(b), Tuple::unary(a)].into_iter().collect();
        let order: Vec<usize> = s.iter().map(|t| t.atom(0).index()).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn subset_check() {
        let mut u = Universe::new();
        let a = u.atom("a");
        let b = u.atom("b");
        let small = TupleSet::singleton(Tuple::unary(a));
        let big: TupleSet = vec![Tuple::unary(a), Tuple::unary(b)].into_iter().collect();
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
    }
}
