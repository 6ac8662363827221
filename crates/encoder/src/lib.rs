//! Bounded encoding of shared-memory programs into satisfiability
//! problems over finite relations.
//!
//! A [`Program`] is a fixed set of per-thread instruction sequences
//! plus assertions about the values reads observe. [`justify`] turns a
//! program and a [`MemoryModel`] into a [`Justification`]: one formula,
//! one set of relation bounds, and the executions the formula ranges
//! over. A satisfying assignment within the bounds is a concrete run;
//! which verdict that implies depends on the [`AssertionMode`].
//!
//! The [`float`] module is independent of the memory-model machinery:
//! it builds IEEE-754 single-precision arithmetic out of the integer
//! expression trees from `membound-logic`, for encoding programs whose
//! values are floats.

pub mod action;
pub mod axioms;
pub mod cancel;
pub mod error;
pub mod execution;
pub mod float;
pub mod justify;
pub mod models;
pub mod program;
pub mod vocab;

pub use action::{ActionKind, InstrId, Instruction, ThreadId};
pub use cancel::CancelToken;
pub use error::EncodeError;
pub use execution::{Execution, OrderKey};
pub use justify::{
    justify, AssertionMode, CommitSet, EncodeConfig, Justification,
};
pub use models::MemoryModel;
pub use program::{Assertion, Program, ProgramBuilder, ProgramError};
pub use vocab::CoreRelations;
