//! Assembly of the final satisfiability problem.
//!
//! `justify` is a one-shot pipeline: build the execution(s) for the
//! chosen model, conjoin the model's consistency constraints with the
//! program's sequential-validity constraint and the user assertions,
//! derive bounds from the program, and fold the formula against them.
//! The caller's cancel token is checked between the phases; a cancelled
//! build returns an error, never a partial justification.

use membound_logic::{
    fold_bounds, Bounds, Formula, RelId, RelationPool, Tuple, TupleSet, Universe,
};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::EncodeError;
use crate::execution::Execution;
use crate::models::{self, MemoryModel};
use crate::program::{Assertion, Program};

/// How user assertions enter the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionMode {
    /// Search for a run violating some assertion. With no assertions
    /// there is nothing to violate and the problem is unsatisfiable.
    Goals,
    /// Constrain the search to runs satisfying every assertion.
    Assumptions,
}

/// Encoding configuration. Plain data with builder-style setters.
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Bit width of the two's-complement integer encoding.
    pub bit_width: u32,
    /// Length of the speculation chain for models that use one.
    pub max_speculations: usize,
    pub assertion_mode: AssertionMode,
    /// Atoms reserved for array index addressing.
    pub index_atoms: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            bit_width: 8,
            max_speculations: 2,
            assertion_mode: AssertionMode::Goals,
            index_atoms: 0,
        }
    }
}

impl EncodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bit_width(mut self, bits: u32) -> Self {
        self.bit_width = bits;
        self
    }

    pub fn with_max_speculations(mut self, n: usize) -> Self {
        self.max_speculations = n;
        self
    }

    pub fn with_assertion_mode(mut self, mode: AssertionMode) -> Self {
        self.assertion_mode = mode;
        self
    }

    pub fn with_index_atoms(mut self, n: usize) -> Self {
        self.index_atoms = n;
        self
    }
}

/// The actions a speculation may contribute to the real execution,
/// represented as one unary relation over occurrence atoms.
#[derive(Debug, Clone, Copy)]
pub struct CommitSet {
    rel: RelId,
}

impl CommitSet {
    pub fn rel(&self) -> RelId {
        self.rel
    }
}

/// The finished satisfiability problem: formula, bounds, the real
/// execution, and (for speculative models) the speculation chain.
/// Write-once; only read after construction.
#[derive(Debug)]
pub struct Justification {
    universe: Universe,
    pool: RelationPool,
    formula: Formula,
    bounds: Bounds,
    real: Execution,
    speculations: Vec<(Execution, CommitSet)>,
}

impl Justification {
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn pool(&self) -> &RelationPool {
        &self.pool
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn real(&self) -> &Execution {
        &self.real
    }

    pub fn speculations(&self) -> &[(Execution, CommitSet)] {
        &self.speculations
    }
}

/// Build the justification for `program` under `model`.
pub fn justify(
    program: &Program,
    model: MemoryModel,
    config: &EncodeConfig,
    cancel: &CancelToken,
) -> Result<Justification, EncodeError> {
    if cancel.is_cancelled() {
        return Err(EncodeError::Cancelled);
    }

    let mut universe = program.universe().clone();
    for k in 0..config.index_atoms {
        universe.atom(&format!("idx${k}"));
    }
    let mut pool = RelationPool::new();
    let keys = model.ordering_keys(program);
    let real = Execution::build(&mut pool, program, "r", false, &keys);
    debug!(
        model = model.name(),
        orderings = keys.len(),
        relations = pool.len(),
        "built real execution"
    );

    if cancel.is_cancelled() {
        return Err(EncodeError::Cancelled);
    }

    let mut parts = vec![
        model.consistency(program, &real),
        program.sequentially_valid(&real),
        assertion_constraint(program, &real, config.assertion_mode),
    ];

    let mut speculations = Vec::new();
    if model.uses_speculation() {
        for k in 0..config.max_speculations {
            let spec = Execution::build(&mut pool, program, &format!("s{k}"), true, &keys);
            let commit = CommitSet {
                rel: pool.declare(format!("commit@s{k}"), 1),
            };
            parts.push(model.consistency(program, &spec));
            parts.push(commit_agreement(program, &real, &spec, commit));
            if let Some(&(_, prev)) = speculations.last() {
                parts.push(commit_monotone(program, prev, commit));
            }
            speculations.push((spec, commit));
        }
        debug!(chain = speculations.len(), "built speculation chain");
    }
    let formula = Formula::and_all(parts);
    debug!(conjuncts = formula.conjunct_count(), "assembled constraints");

    if cancel.is_cancelled() {
        return Err(EncodeError::Cancelled);
    }

    let mut bounds = Bounds::new();
    bound_execution(&mut bounds, &pool, program, &real)?;
    for (spec, commit) in &speculations {
        bound_execution(&mut bounds, &pool, program, spec)?;
        let occs: TupleSet = program
            .instr_ids()
            .map(|i| Tuple::unary(program.occurrence(i)))
            .collect();
        bounds.bound(&pool, commit.rel, TupleSet::new(), occs)?;
    }
    let formula = fold_bounds(&formula, &bounds);
    debug!(
        conjuncts = formula.conjunct_count(),
        "folded formula against bounds"
    );

    Ok(Justification {
        universe,
        pool,
        formula,
        bounds,
        real,
        speculations,
    })
}

/// The given assertion holds: the read occurs and observes a write of
/// the asserted value.
fn assertion_holds(program: &Program, exec: &Execution, a: &Assertion) -> Formula {
    let value = match program.value_atom(a.value()) {
        Some(atom) => atom,
        None => return Formula::False,
    };
    let r = a.read();
    let read = program.instruction(r);
    let witnesses: Vec<Formula> = program
        .instructions()
        .iter()
        .filter(|wr| wr.kind().is_write() && wr.may_share_location(read))
        .map(|wr| {
            Formula::and_all(vec![
                exec.sees(r, wr.id()),
                exec.writes_value(wr.id(), value),
            ])
        })
        .collect();
    Formula::and_all(vec![exec.executes(r), Formula::or_all(witnesses)])
}

fn assertion_constraint(program: &Program, exec: &Execution, mode: AssertionMode) -> Formula {
    let holds: Vec<Formula> = program
        .assertions()
        .iter()
        .map(|a| assertion_holds(program, exec, a))
        .collect();
    match mode {
        AssertionMode::Goals => Formula::or_all(holds.into_iter().map(Formula::not).collect()),
        AssertionMode::Assumptions => Formula::and_all(holds),
    }
}

/// Committed speculative actions execute and agree with the real run on
/// occurrence, written value, and resolved location.
fn commit_agreement(
    program: &Program,
    real: &Execution,
    spec: &Execution,
    commit: CommitSet,
) -> Formula {
    let mut parts = Vec::new();
    for instr in program.instructions() {
        let i = instr.id();
        let committed = Formula::member(commit.rel, Tuple::unary(program.occurrence(i)));
        let mut agree = vec![spec.executes(i), real.executes(i)];
        for v in instr.values() {
            if let Some(atom) = program.value_atom(*v) {
                agree.push(Formula::iff(
                    spec.writes_value(i, atom),
                    real.writes_value(i, atom),
                ));
            }
        }
        for &l in instr.locations() {
            agree.push(Formula::iff(spec.located_at(i, l), real.located_at(i, l)));
        }
        parts.push(Formula::implies(committed, Formula::and_all(agree)));
    }
    Formula::and_all(parts)
}

/// Commits grow monotonically along the chain.
fn commit_monotone(program: &Program, prev: CommitSet, next: CommitSet) -> Formula {
    Formula::and_all(
        program
            .instr_ids()
            .map(|i| {
                let occ = Tuple::unary(program.occurrence(i));
                Formula::implies(
                    Formula::member(prev.rel, occ.clone()),
                    Formula::member(next.rel, occ),
                )
            })
            .collect(),
    )
}

/// Derive bounds for one execution's relations from the program's
/// candidate sets and the may-happen-before partial order.
fn bound_execution(
    bounds: &mut Bounds,
    pool: &RelationPool,
    program: &Program,
    exec: &Execution,
) -> Result<(), EncodeError> {
    let spec = exec.is_speculative();

    for instr in program.instructions() {
        let i = instr.id();
        let occ = TupleSet::singleton(Tuple::unary(program.occurrence(i)));
        if spec {
            bounds.bound(pool, exec.core().action(i), TupleSet::new(), occ)?;
        } else {
            bounds.bound_exactly(pool, exec.core().action(i), occ)?;
        }
    }

    let mut v_lower = TupleSet::new();
    let mut v_upper = TupleSet::new();
    for instr in program.instructions() {
        if !instr.kind().is_write() {
            continue;
        }
        let occ = program.occurrence(instr.id());
        for value in instr.values() {
            if let Some(atom) = program.value_atom(*value) {
                v_upper.insert(Tuple::pair(occ, atom));
                if !spec && instr.values().len() == 1 {
                    v_lower.insert(Tuple::pair(occ, atom));
                }
            }
        }
    }
    bounds.bound(pool, exec.core().v(), v_lower, v_upper)?;

    let mut w_upper = TupleSet::new();
    for read in program.instructions() {
        if !read.kind().is_read() {
            continue;
        }
        for write in program.instructions() {
            if write.kind().is_write() && write.may_share_location(read) {
                w_upper.insert(Tuple::pair(
                    program.occurrence(read.id()),
                    program.occurrence(write.id()),
                ));
            }
        }
    }
    bounds.bound(pool, exec.core().w(), TupleSet::new(), w_upper)?;

    let mut loc_lower = TupleSet::new();
    let mut loc_upper = TupleSet::new();
    let mut mon_lower = TupleSet::new();
    let mut mon_upper = TupleSet::new();
    for instr in program.instructions() {
        let occ = program.occurrence(instr.id());
        for &l in instr.locations() {
            loc_upper.insert(Tuple::pair(occ, l));
            if !spec && instr.locations().len() == 1 {
                loc_lower.insert(Tuple::pair(occ, l));
            }
        }
        for &m in instr.monitors() {
            mon_upper.insert(Tuple::pair(occ, m));
            if !spec && instr.monitors().len() == 1 {
                mon_lower.insert(Tuple::pair(occ, m));
            }
        }
    }
    bounds.bound(pool, exec.core().location(), loc_lower, loc_upper)?;
    bounds.bound(pool, exec.core().monitor(), mon_lower, mon_upper)?;

    for key in exec.ordered() {
        let ord = exec.ordering(key);
        let acts = models::action_set(program, key);
        let mut upper = TupleSet::new();
        for &i in &acts {
            for &j in &acts {
                if program.may_happen_before(i, j) {
                    upper.insert(Tuple::pair(
                        program.occurrence(i),
                        program.occurrence(j),
                    ));
                }
            }
        }
        bounds.bound(pool, ord, TupleSet::new(), upper)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramBuilder;

    fn store_buffering() -> Program {
        let mut b = ProgramBuilder::new();
        let init = b.thread("init");
        b.write(init, "wx0", "x", &[0]);
        b.write(init, "wy0", "y", &[0]);
        let t1 = b.thread("t1");
        let r1 = b.read(t1, "r1", "x");
        b.write(t1, "wy1", "y", &[1]);
        let t2 = b.thread("t2");
        let r2 = b.read(t2, "r2", "y");
        b.write(t2, "wx1", "x", &[1]);
        b.ends_before(init, t1);
        b.ends_before(init, t2);
        b.assert_reads(r1, 1);
        b.assert_reads(r2, 1);
        b.finish().unwrap()
    }

    #[test]
    fn config_defaults_and_builders() {
        let config = EncodeConfig::default();
        assert_eq!(config.bit_width, 8);
        assert_eq!(config.max_speculations, 2);
        assert_eq!(config.assertion_mode, AssertionMode::Goals);
        assert_eq!(config.index_atoms, 0);

        let config = EncodeConfig::new()
            .with_bit_width(32)
            .with_max_speculations(3)
            .with_assertion_mode(AssertionMode::Assumptions)
            .with_index_atoms(4);
        assert_eq!(config.bit_width, 32);
        assert_eq!(config.max_speculations, 3);
        assert_eq!(config.assertion_mode, AssertionMode::Assumptions);
        assert_eq!(config.index_atoms, 4);
    }

    #[test]
    fn cancelled_token_aborts_before_any_work() {
        let p = store_buffering();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = justify(
            &p,
            MemoryModel::SequentialConsistency,
            &EncodeConfig::default(),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::Cancelled));
    }

    #[test]
    fn non_speculative_models_carry_no_speculations() {
        let p = store_buffering();
        let j = justify(
            &p,
            MemoryModel::SequentialConsistency,
            &EncodeConfig::default().with_assertion_mode(AssertionMode::Assumptions),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(j.speculations().is_empty());
        assert!(!j.formula().is_true());
        assert!(!j.formula().is_false());
    }

    #[test]
    fn real_actions_are_bounded_exactly() {
        let p = store_buffering();
        let j = justify(
            &p,
            MemoryModel::SequentialConsistency,
            &EncodeConfig::default().with_assertion_mode(AssertionMode::Assumptions),
            &CancelToken::new(),
        )
        .unwrap();
        for i in p.instr_ids() {
            let rel = j.real().core().action(i);
            assert_eq!(j.bounds().lower(rel), j.bounds().upper(rel));
        }
    }

    #[test]
    fn ordering_upper_bound_excludes_reversed_program_order() {
        let p = store_buffering();
        let j = justify(
            &p,
            MemoryModel::SequentialConsistency,
            &EncodeConfig::default().with_assertion_mode(AssertionMode::Assumptions),
            &CancelToken::new(),
        )
        .unwrap();
        let ord = j
            .real()
            .ordering(crate::execution::OrderKey::Global);
        let upper = j.bounds().upper(ord).unwrap();
        let r1 = p.universe().lookup("r1").unwrap();
        let wy1 = p.universe().lookup("wy1").unwrap();
        assert!(upper.contains(&Tuple::pair(r1, wy1)));
        assert!(!upper.contains(&Tuple::pair(wy1, r1)));
    }

    #[test]
    fn speculative_model_builds_the_requested_chain() {
        let p = store_buffering();
        let config = EncodeConfig::default()
            .with_max_speculations(3)
            .with_assertion_mode(AssertionMode::Assumptions);
        let j = justify(
            &p,
            MemoryModel::SpeculativeCausal,
            &config,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(j.speculations().len(), 3);
        for (spec, commit) in j.speculations() {
            assert!(spec.is_speculative());
            assert!(j.bounds().is_bounded(commit.rel()));
            assert!(j.bounds().lower(commit.rel()).unwrap().is_empty());
        }
    }

    #[test]
    fn goals_mode_without_assertions_is_unsatisfiable() {
        let mut b = ProgramBuilder::new();
        let t = b.thread("t1");
        b.write(t, "w1", "x", &[1]);
        let p = b.finish().unwrap();
        let j = justify(
            &p,
            MemoryModel::SequentialConsistency,
            &EncodeConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(j.formula().is_false());
    }

    #[test]
    fn relation_naming_is_reproducible() {
        let p = store_buffering();
        let config = EncodeConfig::default().with_assertion_mode(AssertionMode::Assumptions);
        let a = justify(&p, MemoryModel::Pram, &config, &CancelToken::new()).unwrap();
        let b = justify(&p, MemoryModel::Pram, &config, &CancelToken::new()).unwrap();
        assert_eq!(a.pool().len(), b.pool().len());
        for (ra, rb) in a.pool().iter().zip(b.pool().iter()) {
            assert_eq!(ra.name(), rb.name());
        }
        assert_eq!(a.formula(), b.formula());
    }

    #[test]
    fn index_atoms_are_reserved_in_the_universe() {
        let p = store_buffering();
        let config = EncodeConfig::default()
            .with_index_atoms(2)
            .with_assertion_mode(AssertionMode::Assumptions);
        let j = justify(
            &p,
            MemoryModel::SequentialConsistency,
            &config,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(j.universe().lookup("idx$0").is_some());
        assert!(j.universe().lookup("idx$1").is_some());
        assert_eq!(j.universe().len(), p.universe().len() + 2);
    }
}
