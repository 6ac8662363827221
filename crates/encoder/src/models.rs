//! The shipped memory-model variants.
//!
//! Each variant is a case of one closed enum: it declares which keys get
//! an ordering relation and which axioms apply to which restricted
//! action sets. Adding a model means adding a variant and two match
//! arms, not a trait object.

use std::collections::BTreeSet;
use std::fmt;

use membound_logic::{Atom, Formula};

use crate::action::InstrId;
use crate::axioms;
use crate::execution::{Execution, OrderKey};
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryModel {
    /// One global total order over all actions.
    SequentialConsistency,
    /// One serialized view per thread; foreign writes pass through,
    /// foreign reads stay hidden.
    Pram,
    /// One serialized view per accessed variable.
    CacheCoherence,
    /// Per-thread views with causality instead of full serialization.
    CausalConsistency,
    /// Per-thread views tied to one global write order.
    ProcessorConsistency,
    /// Causal consistency with a chain of speculative executions whose
    /// committed actions must agree with the real run.
    SpeculativeCausal,
}

impl MemoryModel {
    pub fn name(&self) -> &'static str {
        match self {
            MemoryModel::SequentialConsistency => "sequential-consistency",
            MemoryModel::Pram => "pram",
            MemoryModel::CacheCoherence => "cache-coherence",
            MemoryModel::CausalConsistency => "causal-consistency",
            MemoryModel::ProcessorConsistency => "processor-consistency",
            MemoryModel::SpeculativeCausal => "speculative-causal",
        }
    }

    /// Whether the justification carries speculative executions.
    pub fn uses_speculation(&self) -> bool {
        matches!(self, MemoryModel::SpeculativeCausal)
    }

    /// Which ordering relations every execution of this model allocates.
    pub fn ordering_keys(&self, program: &Program) -> Vec<OrderKey> {
        match self {
            MemoryModel::SequentialConsistency => vec![OrderKey::Global],
            MemoryModel::Pram
            | MemoryModel::CausalConsistency
            | MemoryModel::SpeculativeCausal => {
                program.threads().map(OrderKey::Thread).collect()
            }
            MemoryModel::CacheCoherence => write_locations(program)
                .into_iter()
                .map(OrderKey::Location)
                .collect(),
            MemoryModel::ProcessorConsistency => {
                let mut keys = vec![OrderKey::Global];
                keys.extend(program.threads().map(OrderKey::Thread));
                keys
            }
        }
    }

    /// The model's consistency constraint over one execution.
    pub fn consistency(&self, program: &Program, exec: &Execution) -> Formula {
        let all: Vec<InstrId> = program.instr_ids().collect();
        match self {
            MemoryModel::SequentialConsistency => {
                let g = exec.ordering(OrderKey::Global);
                Formula::and_all(vec![
                    axioms::program_order(program, exec, &all, g),
                    axioms::serialization(program, exec, &all, g),
                    axioms::proper_locking(program, exec, g),
                ])
            }
            MemoryModel::Pram => Formula::and_all(
                program
                    .threads()
                    .map(|t| {
                        let acts = axioms::restrict_proc(program, &all, t);
                        let ord = exec.ordering(OrderKey::Thread(t));
                        Formula::and_all(vec![
                            axioms::program_order(program, exec, &acts, ord),
                            axioms::serialization(program, exec, &acts, ord),
                        ])
                    })
                    .collect(),
            ),
            MemoryModel::CacheCoherence => Formula::and_all(
                write_locations(program)
                    .into_iter()
                    .map(|l| {
                        let acts = axioms::restrict_var(program, &all, l);
                        let ord = exec.ordering(OrderKey::Location(l));
                        Formula::and_all(vec![
                            axioms::program_order(program, exec, &acts, ord),
                            axioms::serialization(program, exec, &acts, ord),
                        ])
                    })
                    .collect(),
            ),
            MemoryModel::CausalConsistency | MemoryModel::SpeculativeCausal => {
                Formula::and_all(
                    program
                        .threads()
                        .map(|t| {
                            let acts = axioms::restrict_proc(program, &all, t);
                            let ord = exec.ordering(OrderKey::Thread(t));
                            Formula::and_all(vec![
                                axioms::program_order(program, exec, &acts, ord),
                                axioms::write_into_order(program, exec, &acts, ord),
                                axioms::transitive_order(exec, &acts, ord),
                                axioms::read_value(program, exec, &acts, ord),
                                axioms::weak_total_order(exec, &acts, ord),
                                axioms::asymmetric_order(exec, &acts, ord),
                            ])
                        })
                        .collect(),
                )
            }
            MemoryModel::ProcessorConsistency => {
                let g = exec.ordering(OrderKey::Global);
                let mut parts: Vec<Formula> = write_locations(program)
                    .into_iter()
                    .map(|l| {
                        let writes = axioms::restrict_var_wr(program, &all, l);
                        axioms::weak_total_order(exec, &writes, g)
                    })
                    .collect();
                for t in program.threads() {
                    let acts = axioms::restrict_proc(program, &all, t);
                    let ord = exec.ordering(OrderKey::Thread(t));
                    parts.push(axioms::program_order(program, exec, &acts, ord));
                    parts.push(axioms::serialization(program, exec, &acts, ord));
                    parts.push(axioms::map_constraints(exec, &acts, ord, &all, g));
                }
                Formula::and_all(parts)
            }
        }
    }
}

impl fmt::Display for MemoryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distinct candidate locations of all writes, in atom order.
pub fn write_locations(program: &Program) -> Vec<Atom> {
    let set: BTreeSet<Atom> = program
        .instructions()
        .iter()
        .filter(|i| i.kind().is_write())
        .flat_map(|i| i.locations().iter().copied())
        .collect();
    set.into_iter().collect()
}

/// The action set an ordering key ranges over. Shared by the model's
/// consistency constraints and the bounds derivation so both see the
/// same restriction.
pub fn action_set(program: &Program, key: OrderKey) -> Vec<InstrId> {
    let all: Vec<InstrId> = program.instr_ids().collect();
    match key {
        OrderKey::Global => all,
        OrderKey::Thread(t) => axioms::restrict_proc(program, &all, t),
        OrderKey::Location(l) => axioms::restrict_var(program, &all, l),
    }
}
