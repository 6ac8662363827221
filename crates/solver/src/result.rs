use membound_encoder::AssertionMode;

use crate::interpret::ExecutionTrace;
use crate::model::Model;

/// Raw satisfiability verdict from one solver run.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverResult {
    /// Satisfiable; the model is absent only if the solver produced
    /// none.
    Sat(Option<Model>),
    Unsat,
    /// No verdict, with the solver's reason (timeout, resource limit).
    Unknown(String),
}

impl SolverResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, SolverResult::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, SolverResult::Unsat)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SolverResult::Unknown(_))
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            SolverResult::Sat(m) => m.as_ref(),
            _ => None,
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            SolverResult::Sat(_) => "sat",
            SolverResult::Unsat => "unsat",
            SolverResult::Unknown(_) => "unknown",
        }
    }
}

/// What a verdict means for the analyzed program. The reading depends
/// on how assertions entered the formula: searching for a violating
/// run, or constraining to runs where every assertion holds.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// A run violating some assertion exists; here it is.
    ViolationFound { trace: ExecutionTrace },
    /// Every run within the bounds satisfies all assertions.
    NoViolationWithinBounds,
    /// A consistent run satisfying all assertions exists; here it is.
    ConsistentExecution { trace: ExecutionTrace },
    /// The asserted outcome is unreachable under this model.
    NoConsistentExecution,
    Inconclusive { reason: String },
}

impl AnalysisOutcome {
    pub fn classify(mode: AssertionMode, result: &SolverResult, trace: Option<ExecutionTrace>) -> Self {
        match (result, mode) {
            (SolverResult::Sat(_), AssertionMode::Goals) => AnalysisOutcome::ViolationFound {
                trace: trace.unwrap_or_default(),
            },
            (SolverResult::Sat(_), AssertionMode::Assumptions) => {
                AnalysisOutcome::ConsistentExecution {
                    trace: trace.unwrap_or_default(),
                }
            }
            (SolverResult::Unsat, AssertionMode::Goals) => AnalysisOutcome::NoViolationWithinBounds,
            (SolverResult::Unsat, AssertionMode::Assumptions) => {
                AnalysisOutcome::NoConsistentExecution
            }
            (SolverResult::Unknown(reason), _) => AnalysisOutcome::Inconclusive {
                reason: reason.clone(),
            },
        }
    }

    pub fn trace(&self) -> Option<&ExecutionTrace> {
        match self {
            AnalysisOutcome::ViolationFound { trace }
            | AnalysisOutcome::ConsistentExecution { trace } => Some(trace),
            _ => None,
        }
    }
}
