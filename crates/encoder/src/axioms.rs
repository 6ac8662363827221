//! Memory-model axiom combinators.
//!
//! Each axiom takes a finite action set (a list of instruction ids) and
//! an ordering relation and returns the constraint as an explicit
//! conjunction over the enumerated pairs or triples. Quantification is
//! always bounded: there are no quantifiers in the emitted formula, only
//! membership literals over the execution's relations.

use membound_logic::{Formula, IntExpr, RelId};

use crate::action::{InstrId, ThreadId};
use crate::execution::Execution;
use crate::program::Program;

/// At least one direction holds for every distinct executed pair.
/// Together with [`asymmetric_order`] this makes `ord` a strict total
/// order on the set.
pub fn weak_total_order(exec: &Execution, acts: &[InstrId], ord: RelId) -> Formula {
    let mut parts = Vec::new();
    for (n, &i) in acts.iter().enumerate() {
        for &j in &acts[n + 1..] {
            parts.push(Formula::implies(
                Formula::and_all(vec![exec.executes(i), exec.executes(j)]),
                Formula::or_all(vec![exec.precedes(ord, i, j), exec.precedes(ord, j, i)]),
            ));
        }
    }
    Formula::and_all(parts)
}

/// `ord` restricted to `acts` is transitively closed.
pub fn transitive_order(exec: &Execution, acts: &[InstrId], ord: RelId) -> Formula {
    let mut parts = Vec::new();
    for &i in acts {
        for &j in acts {
            if j == i {
                continue;
            }
            for &k in acts {
                if k == i || k == j {
                    continue;
                }
                parts.push(Formula::implies(
                    Formula::and_all(vec![
                        exec.precedes(ord, i, j),
                        exec.precedes(ord, j, k),
                    ]),
                    exec.precedes(ord, i, k),
                ));
            }
        }
    }
    Formula::and_all(parts)
}

/// No pair carries both directions, and nothing precedes itself.
pub fn asymmetric_order(exec: &Execution, acts: &[InstrId], ord: RelId) -> Formula {
    let mut parts = Vec::new();
    for (n, &i) in acts.iter().enumerate() {
        parts.push(Formula::not(exec.precedes(ord, i, i)));
        for &j in &acts[n + 1..] {
            parts.push(Formula::not(Formula::and_all(vec![
                exec.precedes(ord, i, j),
                exec.precedes(ord, j, i),
            ])));
        }
    }
    Formula::and_all(parts)
}

/// Every executed read in `acts` observes exactly one write in `acts`:
/// same location, not ordered after the read, and with no same-location
/// write interposed strictly between the observed write and the read.
pub fn read_value(program: &Program, exec: &Execution, acts: &[InstrId], ord: RelId) -> Formula {
    let writes: Vec<InstrId> = acts
        .iter()
        .copied()
        .filter(|&i| program.instruction(i).kind().is_write())
        .collect();
    let mut parts = Vec::new();
    for &r in acts {
        let instr = program.instruction(r);
        if !instr.kind().is_read() {
            continue;
        }
        let candidates: Vec<InstrId> = writes
            .iter()
            .copied()
            .filter(|&wr| program.instruction(wr).may_share_location(instr))
            .collect();

        // w(r) is a total function into the candidate writes
        parts.push(Formula::implies(
            exec.executes(r),
            Formula::or_all(candidates.iter().map(|&wr| exec.sees(r, wr)).collect()),
        ));
        for (n, &a) in candidates.iter().enumerate() {
            for &b in &candidates[n + 1..] {
                parts.push(Formula::not(Formula::and_all(vec![
                    exec.sees(r, a),
                    exec.sees(r, b),
                ])));
            }
        }

        for &wr in &candidates {
            let mut obligations = vec![
                exec.executes(wr),
                exec.same_location(program, r, wr),
                Formula::not(exec.precedes(ord, r, wr)),
            ];
            for &other in &writes {
                if other == wr || other == r {
                    continue;
                }
                obligations.push(Formula::implies(
                    Formula::and_all(vec![
                        exec.executes(other),
                        exec.same_location(program, other, r),
                    ]),
                    Formula::not(Formula::and_all(vec![
                        exec.precedes(ord, wr, other),
                        exec.precedes(ord, other, r),
                    ])),
                ));
            }
            parts.push(Formula::implies(
                exec.sees(r, wr),
                Formula::and_all(obligations),
            ));
        }
    }
    Formula::and_all(parts)
}

/// Strict total order respecting read-value consistency.
pub fn serialization(program: &Program, exec: &Execution, acts: &[InstrId], ord: RelId) -> Formula {
    Formula::and_all(vec![
        weak_total_order(exec, acts, ord),
        transitive_order(exec, acts, ord),
        asymmetric_order(exec, acts, ord),
        read_value(program, exec, acts, ord),
    ])
}

/// Per-thread textual order, plus the root-thread prefix: actions of a
/// thread that ends before every other thread precede all foreign
/// actions in the set.
pub fn program_order(program: &Program, exec: &Execution, acts: &[InstrId], ord: RelId) -> Formula {
    let mut parts = Vec::new();
    for (n, &i) in acts.iter().enumerate() {
        for &j in &acts[n + 1..] {
            let (first, second) = match textual_pair(program, i, j) {
                Some(pair) => pair,
                None => continue,
            };
            parts.push(Formula::implies(
                Formula::and_all(vec![exec.executes(first), exec.executes(second)]),
                exec.precedes(ord, first, second),
            ));
        }
    }
    for root in program.root_threads() {
        for &i in acts {
            if program.instruction(i).thread() != root {
                continue;
            }
            for &j in acts {
                if program.instruction(j).thread() == root {
                    continue;
                }
                parts.push(Formula::implies(
                    Formula::and_all(vec![exec.executes(i), exec.executes(j)]),
                    exec.precedes(ord, i, j),
                ));
            }
        }
    }
    Formula::and_all(parts)
}

/// Orders a same-thread pair textually, if the two belong to one thread.
fn textual_pair(program: &Program, i: InstrId, j: InstrId) -> Option<(InstrId, InstrId)> {
    let a = program.instruction(i);
    let b = program.instruction(j);
    if a.thread() != b.thread() {
        return None;
    }
    if program.position(i) < program.position(j) {
        Some((i, j))
    } else {
        Some((j, i))
    }
}

/// The observed write precedes its read.
pub fn write_into_order(
    program: &Program,
    exec: &Execution,
    acts: &[InstrId],
    ord: RelId,
) -> Formula {
    let mut parts = Vec::new();
    for &r in acts {
        if !program.instruction(r).kind().is_read() {
            continue;
        }
        for &wr in acts {
            if !program.instruction(wr).kind().is_write() {
                continue;
            }
            if !program
                .instruction(wr)
                .may_share_location(program.instruction(r))
            {
                continue;
            }
            parts.push(Formula::implies(
                exec.sees(r, wr),
                exec.precedes(ord, wr, r),
            ));
        }
    }
    Formula::and_all(parts)
}

/// Lock/unlock balance: for every lock `l` and every other thread `t`,
/// the numbers of `t`'s locks and unlocks on `l`'s monitor that precede
/// `l` in `ord` are equal, so no foreign thread holds the monitor when
/// `l` fires.
pub fn proper_locking(program: &Program, exec: &Execution, ord: RelId) -> Formula {
    let mut parts = Vec::new();
    for l in program.instructions() {
        if l.kind() != crate::action::ActionKind::Lock {
            continue;
        }
        for t in program.threads() {
            if t == l.thread() {
                continue;
            }
            let locks = sync_count(program, exec, ord, t, l.id(), true);
            let unlocks = sync_count(program, exec, ord, t, l.id(), false);
            parts.push(Formula::implies(
                exec.executes(l.id()),
                locks.eq(unlocks),
            ));
        }
    }
    Formula::and_all(parts)
}

/// Conditional count of thread `t`'s lock (or unlock) actions on `l`'s
/// monitor that precede `l`.
fn sync_count(
    program: &Program,
    exec: &Execution,
    ord: RelId,
    t: ThreadId,
    l: InstrId,
    locks: bool,
) -> IntExpr {
    let wanted = if locks {
        crate::action::ActionKind::Lock
    } else {
        crate::action::ActionKind::Unlock
    };
    let mut sum = IntExpr::lit(0);
    for &m in program.instrs_of(t) {
        let instr = program.instruction(m);
        if instr.kind() != wanted {
            continue;
        }
        if !instr.may_share_monitor(program.instruction(l)) {
            continue;
        }
        let counted = Formula::and_all(vec![
            exec.executes(m),
            exec.same_monitor(program, m, l),
            exec.precedes(ord, m, l),
        ]);
        sum = sum.add(IntExpr::ite(counted, IntExpr::lit(1), IntExpr::lit(0)));
    }
    sum
}

/// Actions that may access `location`.
pub fn restrict_var(
    program: &Program,
    acts: &[InstrId],
    location: membound_logic::Atom,
) -> Vec<InstrId> {
    acts.iter()
        .copied()
        .filter(|&i| program.instruction(i).locations().contains(&location))
        .collect()
}

/// Writes that may access `location`.
pub fn restrict_var_wr(
    program: &Program,
    acts: &[InstrId],
    location: membound_logic::Atom,
) -> Vec<InstrId> {
    restrict_var(program, acts, location)
        .into_iter()
        .filter(|&i| program.instruction(i).kind().is_write())
        .collect()
}

/// Thread `t`'s own actions, plus foreign non-reads: foreign writes pass
/// through a per-thread view while foreign reads stay hidden.
pub fn restrict_proc(program: &Program, acts: &[InstrId], t: ThreadId) -> Vec<InstrId> {
    acts.iter()
        .copied()
        .filter(|&i| {
            let instr = program.instruction(i);
            instr.thread() == t || !instr.kind().is_read()
        })
        .collect()
}

/// Every ordering decision of `ord1` on actions shared by both sets is
/// mirrored into `ord2`. Used to keep per-thread views consistent with a
/// global serialization.
pub fn map_constraints(
    exec: &Execution,
    acts1: &[InstrId],
    ord1: RelId,
    acts2: &[InstrId],
    ord2: RelId,
) -> Formula {
    let mut parts = Vec::new();
    for &i in acts1 {
        if !acts2.contains(&i) {
            continue;
        }
        for &j in acts1 {
            if j == i || !acts2.contains(&j) {
                continue;
            }
            parts.push(Formula::implies(
                exec.precedes(ord1, i, j),
                exec.precedes(ord2, i, j),
            ));
        }
    }
    Formula::and_all(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use membound_logic::RelationPool;
    use crate::execution::OrderKey;
    use crate::program::ProgramBuilder;

    fn setup() -> (Program, Execution, Vec<InstrId>) {
        let mut b = ProgramBuilder::new();
        let init = b.thread("init");
        b.write(init, "wx0", "x", &[0]);
        let t1 = b.thread("t1");
        b.read(t1, "r1", "x");
        b.write(t1, "wx1", "x", &[1]);
        b.ends_before(init, t1);
        let p = b.finish().unwrap();
        let mut pool = RelationPool::new();
        let exec = Execution::build(&mut pool, &p, "r", false, &[OrderKey::Global]);
        let acts: Vec<InstrId> = p.instr_ids().collect();
        (p, exec, acts)
    }

    fn count_pairs(f: &Formula, ord: RelId) -> usize {
        let mut n = 0;
        f.visit(&mut |sub| {
            if matches!(sub, Formula::Member(rel, _) if *rel == ord) {
                n += 1;
            }
        });
        n
    }

    #[test]
    fn weak_total_order_covers_all_pairs() {
        let (_, exec, acts) = setup();
        let ord = exec.ordering(OrderKey::Global);
        let f = weak_total_order(&exec, &acts, ord);
        // 7 instructions -> 21 unordered pairs, two directions each
        assert_eq!(count_pairs(&f, ord), 21 * 2);
    }

    #[test]
    fn transitivity_enumerates_ordered_triples() {
        let (_, exec, acts) = setup();
        let ord = exec.ordering(OrderKey::Global);
        let f = transitive_order(&exec, &acts[..3], ord);
        // 3 * 2 * 1 ordered triples, three literals each
        assert_eq!(count_pairs(&f, ord), 6 * 3);
    }

    #[test]
    fn asymmetry_forbids_self_loops() {
        let (_, exec, acts) = setup();
        let ord = exec.ordering(OrderKey::Global);
        let f = asymmetric_order(&exec, &acts[..1], ord);
        // single action: only the irreflexivity literal
        assert_eq!(count_pairs(&f, ord), 1);
    }

    #[test]
    fn read_value_only_considers_same_location_writes() {
        let (p, exec, acts) = setup();
        let ord = exec.ordering(OrderKey::Global);
        let f = read_value(&p, &exec, &acts, ord);
        let w_rel = exec.core().w();
        let mut sees = 0;
        f.visit(&mut |sub| {
            if matches!(sub, Formula::Member(rel, _) if *rel == w_rel) {
                sees += 1;
            }
        });
        // one read, two candidate writes: one at-least-one disjunction
        // (2 literals), one at-most-one pair (2), two obligation guards
        assert_eq!(sees, 2 + 2 + 2);
    }

    #[test]
    fn program_order_is_directed() {
        let (p, exec, acts) = setup();
        let ord = exec.ordering(OrderKey::Global);
        let f = program_order(&p, &exec, &acts, ord);
        let r1 = acts[3];
        let wx1 = acts[4];
        assert_eq!(p.instruction(r1).label(), "r1");
        assert_eq!(p.instruction(wx1).label(), "wx1");
        let forward = exec.precedes(ord, r1, wx1);
        let backward = exec.precedes(ord, wx1, r1);
        let mut saw_forward = false;
        let mut saw_backward = false;
        f.visit(&mut |sub| {
            if *sub == forward {
                saw_forward = true;
            }
            if *sub == backward {
                saw_backward = true;
            }
        });
        assert!(saw_forward);
        assert!(!saw_backward);
    }

    #[test]
    fn restriction_helpers_filter_as_documented() {
        let (p, _, acts) = setup();
        let x = p.universe().lookup("x").unwrap();
        let on_x = restrict_var(&p, &acts, x);
        assert_eq!(on_x.len(), 3); // wx0, r1, wx1
        let writes_x = restrict_var_wr(&p, &acts, x);
        assert_eq!(writes_x.len(), 2);

        // t1's view: own 4 actions plus init's non-reads (start, wx0, end)
        let t1 = p.threads().nth(1).unwrap();
        let view = restrict_proc(&p, &acts, t1);
        assert_eq!(view.len(), 7);
        // init's view hides t1's read
        let init = p.threads().next().unwrap();
        let view = restrict_proc(&p, &acts, init);
        assert_eq!(view.len(), 6);
    }

    #[test]
    fn map_constraints_links_shared_pairs_one_way() {
        let (p, _, acts) = setup();
        let mut pool = RelationPool::new();
        let keys = [OrderKey::Global, OrderKey::Thread(p.threads().next().unwrap())];
        let exec = Execution::build(&mut pool, &p, "r", false, &keys);
        let g = exec.ordering(OrderKey::Global);
        let t = exec.ordering(keys[1]);
        let f = map_constraints(&exec, &acts[..2], t, &acts[..3], g);
        // 2 shared actions -> 2 ordered pairs, an implication each
        assert_eq!(count_pairs(&f, t), 2);
        assert_eq!(count_pairs(&f, g), 2);
    }
}
