use std::fmt;

use crate::universe::TupleSet;

/// Handle to a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelId(u32);

impl RelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named finite relation of fixed arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    id: RelId,
    name: String,
    arity: usize,
}

impl Relation {
    pub fn id(&self) -> RelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Arena of declared relations.
///
/// Declaration order is deterministic and doubles as the relation's dense
/// index, so repeated encodings of the same program yield the same handle
/// for the same relation name.
#[derive(Debug, Clone, Default)]
pub struct RelationPool {
    relations: Vec<Relation>,
}

impl RelationPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, arity: usize) -> RelId {
        let id = RelId(self.relations.len() as u32);
        self.relations.push(Relation {
            id,
            name: name.into(),
            arity,
        });
        id
    }

    pub fn get(&self, id: RelId) -> &Relation {
        &self.relations[id.index()]
    }

    pub fn name(&self, id: RelId) -> &str {
        &self.relations[id.index()].name
    }

    pub fn arity(&self, id: RelId) -> usize {
        self.relations[id.index()].arity
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }
}

/// Errors from bound construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundsError {
    /// A tuple's arity does not match the relation's declared arity.
    ArityMismatch {
        relation: String,
        expected: usize,
        got: usize,
    },
    /// The lower bound is not contained in the upper bound.
    LowerNotContained { relation: String },
    /// The relation was already bounded; bounds are never widened.
    AlreadyBounded { relation: String },
}

impl fmt::Display for BoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsError::ArityMismatch {
                relation,
                expected,
                got,
            } => write!(
                f,
                "arity mismatch for relation {relation}: expected {expected}, got {got}"
            ),
            BoundsError::LowerNotContained { relation } => {
                write!(f, "lower bound of {relation} is not contained in its upper bound")
            }
            BoundsError::AlreadyBounded { relation } => {
                write!(f, "relation {relation} is already bounded")
            }
        }
    }
}

impl std::error::Error for BoundsError {}

/// Per-relation lower/upper tuple sets.
///
/// Bounds are write-once per relation: once set they are only read, never
/// widened. A solver must include every lower-bound tuple and may include
/// any upper-bound tuple.
#[derive(Debug, Clone, Default)]
pub struct Bounds {
    entries: Vec<Option<(TupleSet, TupleSet)>>,
}

impl Bounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound `rel` between `lower` and `upper`.
    pub fn bound(
        &mut self,
        pool: &RelationPool,
        rel: RelId,
        lower: TupleSet,
        upper: TupleSet,
    ) -> Result<(), BoundsError> {
        let arity = pool.arity(rel);
        for t in lower.iter().chain(upper.iter()) {
            if t.arity() != arity {
                return Err(BoundsError::ArityMismatch {
                    relation: pool.name(rel).to_string(),
                    expected: arity,
                    got: t.arity(),
                });
            }
        }
        if !lower.is_subset(&upper) {
            return Err(BoundsError::LowerNotContained {
                relation: pool.name(rel).to_string(),
            });
        }
        if self.entries.len() <= rel.index() {
            self.entries.resize(rel.index() + 1, None);
        }
        let slot = &mut self.entries[rel.index()];
        if slot.is_some() {
            return Err(BoundsError::AlreadyBounded {
                relation: pool.name(rel).to_string(),
            });
        }
        *slot = Some((lower, upper));
        Ok(())
    }

    /// Bound `rel` to exactly `tuples` (lower == upper).
    pub fn bound_exactly(
        &mut self,
        pool: &RelationPool,
        rel: RelId,
        tuples: TupleSet,
    ) -> Result<(), BoundsError> {
        self.bound(pool, rel, tuples.clone(), tuples)
    }

    pub fn is_bounded(&self, rel: RelId) -> bool {
        self.entries
            .get(rel.index())
            .map(|e| e.is_some())
            .unwrap_or(false)
    }

    pub fn lower(&self, rel: RelId) -> Option<&TupleSet> {
        self.entries.get(rel.index())?.as_ref().map(|(l, _)| l)
    }

    pub fn upper(&self, rel: RelId) -> Option<&TupleSet> {
        self.entries.get(rel.index())?.as_ref().map(|(_, u)| u)
    }
}
