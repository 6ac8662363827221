//! # membound-logic
//!
//! Finite-domain relational logic vocabulary for the bounded verifier.
//!
//! This crate defines the objects every encoding is made of: a finite
//! [`Universe`] of opaque atoms, [`Relation`] handles with per-relation
//! lower/upper tuple [`Bounds`], a boolean [`Formula`] AST whose literals
//! are tuple-membership tests, and a fixed-width two's-complement
//! [`IntExpr`] AST used for arithmetic sub-expressions (in particular the
//! floating-point encoder). A closed-term evaluator supports tests and
//! constant folding.
//!
//! Everything here is deterministic: atoms and relations are allocated in
//! insertion order, and tuple sets iterate in a stable order, so two
//! encodings of the same program are comparable structure-for-structure.

pub mod bounds;
pub mod eval;
pub mod expr;
pub mod fold;
pub mod formula;
pub mod universe;

pub use bounds::{Bounds, BoundsError, RelId, Relation, RelationPool};
pub use eval::{eval_formula, eval_int, EvalError};
pub use fold::fold_bounds;
pub use expr::IntExpr;
pub use formula::Formula;
pub use universe::{Atom, Tuple, TupleSet, Universe};
