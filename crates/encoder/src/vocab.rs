//! Core relation vocabulary shared by every execution.
//!
//! Relation names are derived from instruction labels and an execution
//! tag, so two encodings of the same program allocate the same relations
//! in the same order and the generated structures can be compared by
//! name.

use membound_logic::{RelId, RelationPool};

use crate::action::InstrId;
use crate::program::Program;

/// The five core relations of one execution: a unary `action` relation
/// per instruction (holding its occurrence atom when executed) and the
/// shared `v`, `w`, `location`, `monitor` binary relations.
#[derive(Debug, Clone)]
pub struct CoreRelations {
    /// Indexed by [`InstrId`].
    pub(crate) action: Vec<RelId>,
    /// write occurrence -> value atom.
    pub(crate) v: RelId,
    /// read occurrence -> the write occurrence it observes.
    pub(crate) w: RelId,
    /// occurrence -> accessed variable/cell.
    pub(crate) location: RelId,
    /// occurrence -> synchronized monitor.
    pub(crate) monitor: RelId,
}

impl CoreRelations {
    pub fn action(&self, i: InstrId) -> RelId {
        self.action[i.index()]
    }

    pub fn actions(&self) -> &[RelId] {
        &self.action
    }

    pub fn v(&self) -> RelId {
        self.v
    }

    pub fn w(&self) -> RelId {
        self.w
    }

    pub fn location(&self) -> RelId {
        self.location
    }

    pub fn monitor(&self) -> RelId {
        self.monitor
    }
}

/// Declare the core relations for one execution identified by `tag`
/// (`"r"` for the real execution, `"s0"`, `"s1"`, ... for speculations).
pub fn declare_core(pool: &mut RelationPool, program: &Program, tag: &str) -> CoreRelations {
    let action = program
        .instructions()
        .iter()
        .map(|instr| pool.declare(format!("action${}@{tag}", instr.label()), 1))
        .collect();
    let v = pool.declare(format!("v@{tag}"), 2);
    let w = pool.declare(format!("w@{tag}"), 2);
    let location = pool.declare(format!("loc@{tag}"), 2);
    let monitor = pool.declare(format!("mon@{tag}"), 2);
    CoreRelations {
        action,
        v,
        w,
        location,
        monitor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramBuilder;

    fn small_program() -> Program {
        let mut b = ProgramBuilder::new();
        let t = b.thread("t1");
        b.write(t, "w1", "x", &[1]);
        b.finish().unwrap()
    }

    #[test]
    fn naming_is_deterministic() {
        let p = small_program();
        let mut pool_a = RelationPool::new();
        let mut pool_b = RelationPool::new();
        let a = declare_core(&mut pool_a, &p, "r");
        let b = declare_core(&mut pool_b, &p, "r");
        assert_eq!(pool_a.len(), pool_b.len());
        for (ra, rb) in pool_a.iter().zip(pool_b.iter()) {
            assert_eq!(ra.name(), rb.name());
        }
        assert_eq!(a.v(), b.v());
        assert_eq!(pool_a.name(a.w()), "w@r");
    }

    #[test]
    fn action_relations_are_per_instruction() {
        let p = small_program();
        let mut pool = RelationPool::new();
        let core = declare_core(&mut pool, &p, "r");
        assert_eq!(core.actions().len(), p.instructions().len());
        let w1 = p
            .instructions()
            .iter()
            .find(|i| i.label() == "w1")
            .unwrap()
            .id();
        assert_eq!(pool.name(core.action(w1)), "action$w1@r");
        assert_eq!(pool.arity(core.action(w1)), 1);
        assert_eq!(pool.arity(core.v()), 2);
    }

    #[test]
    fn tags_separate_executions() {
        let p = small_program();
        let mut pool = RelationPool::new();
        let real = declare_core(&mut pool, &p, "r");
        let spec = declare_core(&mut pool, &p, "s0");
        assert_ne!(real.v(), spec.v());
        assert_eq!(pool.name(spec.v()), "v@s0");
    }
}
