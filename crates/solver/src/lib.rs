//! SMT backend for justifications.
//!
//! [`translate`] lowers a [`membound_encoder::Justification`] to an
//! SMT-LIB2 script over QF_BV with one boolean selector per optional
//! tuple. [`SmtSolver`] pipes the script to an external solver (Z3 or
//! cvc5) and parses the verdict and model. [`execution_trace`] maps a
//! model back to relation contents, and [`AnalysisOutcome`] states what
//! the verdict means for the analyzed program.

pub mod config;
pub mod error;
pub mod interpret;
pub mod model;
pub mod parser;
pub mod result;
pub mod solver;
pub mod translate;

pub use config::{SolverConfig, SolverKind};
pub use error::SolverError;
pub use interpret::{execution_trace, ExecutionTrace, RelationTrace};
pub use model::{Model, ModelValue};
pub use result::{AnalysisOutcome, SolverResult};
pub use solver::SmtSolver;
pub use translate::{selector_name, translate, Translation};
