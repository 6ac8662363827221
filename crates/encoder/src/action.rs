//! Action kinds and the per-instruction vocabulary.

use membound_logic::Atom;

/// Handle to a thread within a [`crate::program::Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub(crate) u32);

impl ThreadId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an instruction occurrence within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub(crate) u32);

impl InstrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The canonical memory-action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    NormalRead,
    VolatileRead,
    NormalWrite,
    VolatileWrite,
    Lock,
    Unlock,
    /// Thread start marker, first action of every thread.
    Start,
    /// Thread end marker, last action of every thread.
    End,
    /// Opaque call or other non-memory action.
    Special,
}

impl ActionKind {
    pub fn is_read(self) -> bool {
        matches!(self, ActionKind::NormalRead | ActionKind::VolatileRead)
    }

    pub fn is_write(self) -> bool {
        matches!(self, ActionKind::NormalWrite | ActionKind::VolatileWrite)
    }

    pub fn is_sync(self) -> bool {
        matches!(self, ActionKind::Lock | ActionKind::Unlock)
    }

    /// True for kinds that access a variable or array cell.
    pub fn accesses_location(self) -> bool {
        self.is_read() || self.is_write()
    }
}

/// One instruction occurrence: an action kind, its thread, and the
/// statically-bounded candidate sets the front end supplies for the
/// location/monitor it may access and the values it may write.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub(crate) id: InstrId,
    pub(crate) thread: ThreadId,
    pub(crate) kind: ActionKind,
    pub(crate) label: String,
    pub(crate) locations: Vec<Atom>,
    pub(crate) monitors: Vec<Atom>,
    pub(crate) values: Vec<i64>,
}

impl Instruction {
    pub fn id(&self) -> InstrId {
        self.id
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Unique label, used for deterministic relation and atom naming.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Candidate locations this instruction may access (reads/writes).
    pub fn locations(&self) -> &[Atom] {
        &self.locations
    }

    /// Candidate monitors this instruction may synchronize on.
    pub fn monitors(&self) -> &[Atom] {
        &self.monitors
    }

    /// Candidate values this instruction may write.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// True when the candidate locations of `self` and `other` intersect,
    /// i.e. the two instructions may access the same variable.
    pub fn may_share_location(&self, other: &Instruction) -> bool {
        self.locations.iter().any(|l| other.locations.contains(l))
    }

    /// True when the candidate monitors of `self` and `other` intersect.
    pub fn may_share_monitor(&self, other: &Instruction) -> bool {
        self.monitors.iter().any(|m| other.monitors.contains(m))
    }
}
