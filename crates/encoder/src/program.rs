//! The finite program description consumed from the front end.
//!
//! A [`Program`] is immutable once built: threads with ordered
//! instruction lists, an acyclic inter-thread "ends-before" relation, and
//! per-instruction candidate location/monitor/value sets. The builder
//! inserts the `Start`/`End` marker actions itself so every thread's
//! action list is properly delimited.

use std::fmt;

use membound_logic::{Atom, Formula, Universe};
use rustc_hash::FxHashMap;

use crate::action::{ActionKind, InstrId, Instruction, ThreadId};
use crate::execution::Execution;

/// A programmer-supplied assertion: the given read observes the given
/// value. How assertions enter the formula (goal or assumption) is
/// decided at encoding time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assertion {
    pub(crate) read: InstrId,
    pub(crate) value: i64,
}

impl Assertion {
    pub fn read(&self) -> InstrId {
        self.read
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// Errors from program construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// An instruction label (or a label colliding with a location name)
    /// was used twice; labels key deterministic naming and must be unique.
    DuplicateLabel(String),
    /// The inter-thread ends-before relation contains a cycle.
    CyclicEndsBefore,
    /// An assertion references an instruction that is not a read.
    AssertionOnNonRead(String),
    /// A write instruction was given no candidate values.
    EmptyValueSet(String),
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::DuplicateLabel(l) => write!(f, "duplicate instruction label: {l}"),
            ProgramError::CyclicEndsBefore => {
                write!(f, "ends-before relation over threads contains a cycle")
            }
            ProgramError::AssertionOnNonRead(l) => {
                write!(f, "assertion targets non-read instruction: {l}")
            }
            ProgramError::EmptyValueSet(l) => {
                write!(f, "write instruction {l} has no candidate values")
            }
        }
    }
}

impl std::error::Error for ProgramError {}

#[derive(Debug, Clone)]
struct Thread {
    name: String,
    instrs: Vec<InstrId>,
}

/// The finite, immutable multi-threaded program under analysis.
#[derive(Debug, Clone)]
pub struct Program {
    universe: Universe,
    threads: Vec<Thread>,
    instructions: Vec<Instruction>,
    /// One occurrence atom per instruction, named after its label.
    occ: Vec<Atom>,
    /// Textual position of each instruction within its thread.
    position: Vec<usize>,
    value_atoms: FxHashMap<i64, Atom>,
    ends_before: Vec<(ThreadId, ThreadId)>,
    /// Transitive closure of ends-before, indexed `[from][to]`.
    eb_closure: Vec<Vec<bool>>,
    assertions: Vec<Assertion>,
}

impl Program {
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn threads(&self) -> impl Iterator<Item = ThreadId> {
        (0..self.threads.len() as u32).map(ThreadId)
    }

    pub fn thread_name(&self, t: ThreadId) -> &str {
        &self.threads[t.index()].name
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, i: InstrId) -> &Instruction {
        &self.instructions[i.index()]
    }

    pub fn instrs_of(&self, t: ThreadId) -> &[InstrId] {
        &self.threads[t.index()].instrs
    }

    /// All instruction ids, in allocation order.
    pub fn instr_ids(&self) -> impl Iterator<Item = InstrId> {
        (0..self.instructions.len() as u32).map(InstrId)
    }

    /// The occurrence atom standing for this instruction in the universe.
    pub fn occurrence(&self, i: InstrId) -> Atom {
        self.occ[i.index()]
    }

    /// Textual position of `i` within its thread (Start is 0).
    pub fn position(&self, i: InstrId) -> usize {
        self.position[i.index()]
    }

    /// Atom interned for a candidate value, if any instruction or
    /// assertion mentions it.
    pub fn value_atom(&self, v: i64) -> Option<Atom> {
        self.value_atoms.get(&v).copied()
    }

    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    pub fn ends_before_edges(&self) -> &[(ThreadId, ThreadId)] {
        &self.ends_before
    }

    /// Whether `a` transitively ends before `b`.
    pub fn ends_before(&self, a: ThreadId, b: ThreadId) -> bool {
        self.eb_closure[a.index()][b.index()]
    }

    /// Threads whose completion precedes every other thread: these are
    /// the "root" threads whose actions come first in every view. Only a
    /// thread that is an ends-before ancestor of all others qualifies, so
    /// two unrelated threads never both claim the role.
    pub fn root_threads(&self) -> Vec<ThreadId> {
        self.threads()
            .filter(|&t| {
                self.threads()
                    .all(|u| u == t || self.ends_before(t, u))
            })
            .collect()
    }

    /// Conservative "could `i` be ordered before `j`" partial order used
    /// to bound every ordering relation from above. Same-thread pairs
    /// follow textual order; cross-thread pairs are excluded only when
    /// `j`'s thread ends before `i`'s.
    pub fn may_happen_before(&self, i: InstrId, j: InstrId) -> bool {
        if i == j {
            return false;
        }
        let ti = self.instruction(i).thread;
        let tj = self.instruction(j).thread;
        if ti == tj {
            self.position(i) < self.position(j)
        } else {
            !self.ends_before(tj, ti)
        }
    }

    /// Single-thread soundness constraint: in the given execution every
    /// instruction occurs, each write stores exactly one of its candidate
    /// values, and each memory/sync instruction resolves to exactly one
    /// location/monitor. The front end owns the richer dataflow version;
    /// straight-line programs need only this.
    pub fn sequentially_valid(&self, exec: &Execution) -> Formula {
        let mut parts = Vec::new();
        for instr in &self.instructions {
            let i = instr.id;
            parts.push(exec.executes(i));
            if instr.kind.is_write() {
                let choices: Vec<Formula> = instr
                    .values
                    .iter()
                    .filter_map(|v| self.value_atom(*v))
                    .map(|a| exec.writes_value(i, a))
                    .collect();
                parts.push(exactly_one(choices));
            }
            if instr.kind.accesses_location() {
                let choices: Vec<Formula> = instr
                    .locations
                    .iter()
                    .map(|&l| exec.located_at(i, l))
                    .collect();
                parts.push(exactly_one(choices));
            }
            if instr.kind.is_sync() {
                let choices: Vec<Formula> = instr
                    .monitors
                    .iter()
                    .map(|&m| exec.uses_monitor(i, m))
                    .collect();
                parts.push(exactly_one(choices));
            }
        }
        Formula::and_all(parts)
    }
}

/// At-least-one plus pairwise at-most-one over the given literals.
fn exactly_one(choices: Vec<Formula>) -> Formula {
    let mut parts = vec![Formula::or_all(choices.clone())];
    for (n, a) in choices.iter().enumerate() {
        for b in &choices[n + 1..] {
            parts.push(Formula::not(Formula::and_all(vec![a.clone(), b.clone()])));
        }
    }
    Formula::and_all(parts)
}

/// Incremental program construction. `Start` markers are inserted when a
/// thread is declared and `End` markers when the builder finishes.
pub struct ProgramBuilder {
    universe: Universe,
    threads: Vec<Thread>,
    instructions: Vec<Instruction>,
    ends_before: Vec<(ThreadId, ThreadId)>,
    assertions: Vec<Assertion>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            universe: Universe::new(),
            threads: Vec::new(),
            instructions: Vec::new(),
            ends_before: Vec::new(),
            assertions: Vec::new(),
        }
    }

    /// Declare a thread. Its `Start` action is created immediately.
    pub fn thread(&mut self, name: &str) -> ThreadId {
        let t = ThreadId(self.threads.len() as u32);
        self.threads.push(Thread {
            name: name.to_string(),
            instrs: Vec::new(),
        });
        let label = format!("{name}.start");
        self.push_instr(t, ActionKind::Start, label, &[], &[], &[]);
        t
    }

    fn push_instr(
        &mut self,
        t: ThreadId,
        kind: ActionKind,
        label: String,
        locations: &[&str],
        monitors: &[&str],
        values: &[i64],
    ) -> InstrId {
        let id = InstrId(self.instructions.len() as u32);
        let locations = locations.iter().map(|l| self.universe.atom(l)).collect();
        let monitors = monitors.iter().map(|m| self.universe.atom(m)).collect();
        self.instructions.push(Instruction {
            id,
            thread: t,
            kind,
            label,
            locations,
            monitors,
            values: values.to_vec(),
        });
        self.threads[t.index()].instrs.push(id);
        id
    }

    pub fn read(&mut self, t: ThreadId, label: &str, location: &str) -> InstrId {
        self.push_instr(t, ActionKind::NormalRead, label.to_string(), &[location], &[], &[])
    }

    pub fn volatile_read(&mut self, t: ThreadId, label: &str, location: &str) -> InstrId {
        self.push_instr(t, ActionKind::VolatileRead, label.to_string(), &[location], &[], &[])
    }

    pub fn write(&mut self, t: ThreadId, label: &str, location: &str, values: &[i64]) -> InstrId {
        self.push_instr(t, ActionKind::NormalWrite, label.to_string(), &[location], &[], values)
    }

    pub fn volatile_write(
        &mut self,
        t: ThreadId,
        label: &str,
        location: &str,
        values: &[i64],
    ) -> InstrId {
        self.push_instr(t, ActionKind::VolatileWrite, label.to_string(), &[location], &[], values)
    }

    /// A read whose accessed cell is not statically known: any of the
    /// given candidate locations.
    pub fn read_any(&mut self, t: ThreadId, label: &str, locations: &[&str]) -> InstrId {
        self.push_instr(t, ActionKind::NormalRead, label.to_string(), locations, &[], &[])
    }

    pub fn lock(&mut self, t: ThreadId, label: &str, monitor: &str) -> InstrId {
        self.push_instr(t, ActionKind::Lock, label.to_string(), &[], &[monitor], &[])
    }

    pub fn unlock(&mut self, t: ThreadId, label: &str, monitor: &str) -> InstrId {
        self.push_instr(t, ActionKind::Unlock, label.to_string(), &[], &[monitor], &[])
    }

    pub fn special(&mut self, t: ThreadId, label: &str) -> InstrId {
        self.push_instr(t, ActionKind::Special, label.to_string(), &[], &[], &[])
    }

    /// Every action of `a` precedes every action of `b`.
    pub fn ends_before(&mut self, a: ThreadId, b: ThreadId) {
        self.ends_before.push((a, b));
    }

    /// Assert that `read` observes `value`.
    pub fn assert_reads(&mut self, read: InstrId, value: i64) {
        self.assertions.push(Assertion { read, value });
    }

    pub fn finish(mut self) -> Result<Program, ProgramError> {
        for t in 0..self.threads.len() as u32 {
            let t = ThreadId(t);
            let label = format!("{}.end", self.threads[t.index()].name);
            self.push_instr(t, ActionKind::End, label, &[], &[], &[]);
        }

        let eb_closure = closure(self.threads.len(), &self.ends_before)?;

        // Occurrence atoms are interned after every location and monitor
        // name, so the universe layout depends only on program content.
        let mut occ = Vec::with_capacity(self.instructions.len());
        for instr in &self.instructions {
            if instr.kind.is_write() && instr.values.is_empty() {
                return Err(ProgramError::EmptyValueSet(instr.label.clone()));
            }
            if self.universe.lookup(&instr.label).is_some() {
                return Err(ProgramError::DuplicateLabel(instr.label.clone()));
            }
            occ.push(self.universe.atom(&instr.label));
        }

        let mut value_atoms = FxHashMap::default();
        let candidate_values: Vec<i64> = self
            .instructions
            .iter()
            .flat_map(|i| i.values.iter().copied())
            .chain(self.assertions.iter().map(|a| a.value))
            .collect();
        for v in candidate_values {
            value_atoms
                .entry(v)
                .or_insert_with(|| self.universe.atom(&format!("#{v}")));
        }

        for a in &self.assertions {
            let instr = &self.instructions[a.read.index()];
            if !instr.kind.is_read() {
                return Err(ProgramError::AssertionOnNonRead(instr.label.clone()));
            }
        }

        let mut position = vec![0usize; self.instructions.len()];
        for thread in &self.threads {
            for (pos, &i) in thread.instrs.iter().enumerate() {
                position[i.index()] = pos;
            }
        }

        Ok(Program {
            universe: self.universe,
            threads: self.threads,
            instructions: self.instructions,
            occ,
            position,
            value_atoms,
            ends_before: self.ends_before,
            eb_closure,
            assertions: self.assertions,
        })
    }
}

/// Transitive closure of the ends-before edges, rejecting cycles.
fn closure(n: usize, edges: &[(ThreadId, ThreadId)]) -> Result<Vec<Vec<bool>>, ProgramError> {
    let mut reach = vec![vec![false; n]; n];
    for &(a, b) in edges {
        reach[a.index()][b.index()] = true;
    }
    for k in 0..n {
        for i in 0..n {
            if reach[i][k] {
                for j in 0..n {
                    if reach[k][j] {
                        reach[i][j] = true;
                    }
                }
            }
        }
    }
    for (i, row) in reach.iter().enumerate() {
        if row[i] {
            return Err(ProgramError::CyclicEndsBefore);
        }
    }
    Ok(reach)
}
