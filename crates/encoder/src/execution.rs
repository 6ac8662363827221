//! One candidate run of the program.
//!
//! An [`Execution`] is an assignment of the core relations over the
//! program's universe plus the ordering relations the chosen memory
//! model asked for. It is built once per analysis and only read
//! afterwards; the program itself is never touched.

use membound_logic::{Atom, Formula, RelId, RelationPool, Tuple};

use crate::action::{InstrId, ThreadId};
use crate::program::Program;
use crate::vocab::{declare_core, CoreRelations};

/// Key selecting one of an execution's ordering relations. Which keys
/// exist is decided by the memory model: one global order, one per
/// thread, or one per accessed variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderKey {
    Global,
    Thread(ThreadId),
    Location(Atom),
}

/// A candidate run: core relations, ordering relations, and whether this
/// run is speculative.
#[derive(Debug, Clone)]
pub struct Execution {
    speculative: bool,
    core: CoreRelations,
    orderings: Vec<(OrderKey, RelId)>,
    /// Occurrence atom per instruction, mirrored from the program.
    occ: Vec<Atom>,
}

impl Execution {
    /// Declare every relation of one execution. `tag` distinguishes the
    /// real execution from speculations and keeps names reproducible.
    pub fn build(
        pool: &mut RelationPool,
        program: &Program,
        tag: &str,
        speculative: bool,
        keys: &[OrderKey],
    ) -> Execution {
        let core = declare_core(pool, program, tag);
        let orderings = keys
            .iter()
            .map(|&key| {
                let name = match key {
                    OrderKey::Global => format!("ord$global@{tag}"),
                    OrderKey::Thread(t) => {
                        format!("ord${}@{tag}", program.thread_name(t))
                    }
                    OrderKey::Location(l) => {
                        format!("ord${}@{tag}", program.universe().name(l))
                    }
                };
                (key, pool.declare(name, 2))
            })
            .collect();
        let occ = program.instr_ids().map(|i| program.occurrence(i)).collect();
        Execution {
            speculative,
            core,
            orderings,
            occ,
        }
    }

    pub fn is_speculative(&self) -> bool {
        self.speculative
    }

    pub fn core(&self) -> &CoreRelations {
        &self.core
    }

    /// The ordering relation for `key`.
    ///
    /// Panics if the model never allocated an ordering for this key;
    /// that is a bug in model composition, not a user error.
    pub fn ordering(&self, key: OrderKey) -> RelId {
        match self.try_ordering(key) {
            Some(rel) => rel,
            None => panic!("no ordering relation allocated for {key:?}"),
        }
    }

    pub fn try_ordering(&self, key: OrderKey) -> Option<RelId> {
        self.orderings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, rel)| *rel)
    }

    /// Keys that have an ordering relation, in allocation order.
    pub fn ordered(&self) -> impl Iterator<Item = OrderKey> + '_ {
        self.orderings.iter().map(|(k, _)| *k)
    }

    /// The ordering relation handles, in allocation order.
    pub fn orderings(&self) -> impl Iterator<Item = RelId> + '_ {
        self.orderings.iter().map(|(_, rel)| *rel)
    }

    pub fn occurrence(&self, i: InstrId) -> Atom {
        self.occ[i.index()]
    }

    // --- formula helpers ---

    /// Instruction `i` occurs in this execution.
    pub fn executes(&self, i: InstrId) -> Formula {
        Formula::member(self.core.action(i), Tuple::unary(self.occ[i.index()]))
    }

    /// Read `r` observes write `wr`.
    pub fn sees(&self, r: InstrId, wr: InstrId) -> Formula {
        Formula::member(
            self.core.w(),
            Tuple::pair(self.occ[r.index()], self.occ[wr.index()]),
        )
    }

    /// Write `wr` stores the value behind `value` atom.
    pub fn writes_value(&self, wr: InstrId, value: Atom) -> Formula {
        Formula::member(self.core.v(), Tuple::pair(self.occ[wr.index()], value))
    }

    pub fn located_at(&self, i: InstrId, location: Atom) -> Formula {
        Formula::member(
            self.core.location(),
            Tuple::pair(self.occ[i.index()], location),
        )
    }

    pub fn uses_monitor(&self, i: InstrId, monitor: Atom) -> Formula {
        Formula::member(
            self.core.monitor(),
            Tuple::pair(self.occ[i.index()], monitor),
        )
    }

    /// `i` precedes `j` in the given ordering relation.
    pub fn precedes(&self, ord: RelId, i: InstrId, j: InstrId) -> Formula {
        Formula::member(ord, Tuple::pair(self.occ[i.index()], self.occ[j.index()]))
    }

    /// `i` and `j` resolve to the same location. Collapses to a constant
    /// when both candidate sets are singletons.
    pub fn same_location(&self, program: &Program, i: InstrId, j: InstrId) -> Formula {
        let li = program.instruction(i).locations();
        let lj = program.instruction(j).locations();
        if li.len() == 1 && lj.len() == 1 {
            return if li[0] == lj[0] {
                Formula::True
            } else {
                Formula::False
            };
        }
        Formula::or_all(
            li.iter()
                .filter(|l| lj.contains(l))
                .map(|&l| {
                    Formula::and_all(vec![self.located_at(i, l), self.located_at(j, l)])
                })
                .collect(),
        )
    }

    /// `i` and `j` synchronize on the same monitor.
    pub fn same_monitor(&self, program: &Program, i: InstrId, j: InstrId) -> Formula {
        let mi = program.instruction(i).monitors();
        let mj = program.instruction(j).monitors();
        if mi.len() == 1 && mj.len() == 1 {
            return if mi[0] == mj[0] {
                Formula::True
            } else {
                Formula::False
            };
        }
        Formula::or_all(
            mi.iter()
                .filter(|m| mj.contains(m))
                .map(|&m| {
                    Formula::and_all(vec![self.uses_monitor(i, m), self.uses_monitor(j, m)])
                })
                .collect(),
        )
    }
}
