//! Lowering a justification to an SMT-LIB2 script over QF_BV.
//!
//! Every tuple that is in a relation's upper bound but not its lower
//! bound becomes one boolean selector constant; lower-bound tuples are
//! always in, tuples outside the upper bound are always out, so neither
//! needs a symbol. Integer expressions become bitvector terms at the
//! configured width. The selector naming is deterministic, which lets
//! the model reader map assignments back to tuples.

use std::fmt::Write;

use membound_encoder::Justification;
use membound_logic::{Formula, IntExpr, RelId, RelationPool, Tuple, Universe};
use rustc_hash::FxHashMap;
use tracing::debug;

/// A finished script plus the selector table needed to read a model
/// back into relation contents.
pub struct Translation {
    script: String,
    selectors: Vec<(String, RelId, Tuple)>,
    width: u32,
}

impl Translation {
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn selectors(&self) -> &[(String, RelId, Tuple)] {
        &self.selectors
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

impl std::fmt::Display for Translation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.script)
    }
}

/// Selector symbol for one optional tuple, without SMT-LIB quoting.
pub fn selector_name(
    pool: &RelationPool,
    universe: &Universe,
    rel: RelId,
    tuple: &Tuple,
) -> String {
    let atoms: Vec<&str> = tuple
        .atoms()
        .iter()
        .map(|a| universe.name(*a))
        .collect();
    format!("{}[{}]", pool.name(rel), atoms.join(","))
}

fn quoted(name: &str) -> String {
    format!("|{name}|")
}

/// Translate the justification's formula and bounds into one script,
/// ending in `(check-sat)` and `(get-model)`.
pub fn translate(justification: &Justification, width: u32) -> Translation {
    let pool = justification.pool();
    let universe = justification.universe();
    let bounds = justification.bounds();

    let mut selectors = Vec::new();
    let mut by_tuple: FxHashMap<(RelId, Tuple), String> = FxHashMap::default();
    for relation in pool.iter() {
        let rel = relation.id();
        let (lower, upper) = match (bounds.lower(rel), bounds.upper(rel)) {
            (Some(l), Some(u)) => (l, u),
            _ => continue,
        };
        for tuple in upper.iter() {
            if lower.contains(tuple) {
                continue;
            }
            let name = selector_name(pool, universe, rel, tuple);
            by_tuple.insert((rel, tuple.clone()), name.clone());
            selectors.push((name, rel, tuple.clone()));
        }
    }

    let mut vars = Vec::new();
    collect_vars(justification.formula(), &mut vars);
    vars.sort();
    vars.dedup();

    let emitter = Emitter {
        justification,
        by_tuple: &by_tuple,
        width,
    };

    let mut script = String::new();
    script.push_str("(set-logic QF_BV)\n");
    for (name, _, _) in &selectors {
        let _ = writeln!(script, "(declare-const {} Bool)", quoted(name));
    }
    for var in &vars {
        let _ = writeln!(script, "(declare-const {} (_ BitVec {width}))", quoted(var));
    }

    let formula = justification.formula();
    let conjuncts: Vec<&Formula> = match formula {
        Formula::And(fs) => fs.iter().collect(),
        single => vec![single],
    };
    for conjunct in conjuncts {
        script.push_str("(assert ");
        emitter.formula(&mut script, conjunct);
        script.push_str(")\n");
    }
    script.push_str("(check-sat)\n(get-model)\n");

    debug!(
        selectors = selectors.len(),
        vars = vars.len(),
        bytes = script.len(),
        "translated justification"
    );

    Translation {
        script,
        selectors,
        width,
    }
}

/// Free variables of a formula, including those inside `Ite` conditions.
fn collect_vars(f: &Formula, out: &mut Vec<String>) {
    f.visit(&mut |sub| match sub {
        Formula::IntEq(a, b) | Formula::IntLt(a, b) | Formula::IntLe(a, b) => {
            collect_expr_vars(a, out);
            collect_expr_vars(b, out);
        }
        _ => {}
    });
}

fn collect_expr_vars(e: &IntExpr, out: &mut Vec<String>) {
    match e {
        IntExpr::Lit(_) => {}
        IntExpr::Var(name) => out.push(name.clone()),
        IntExpr::Neg(a) | IntExpr::BitNot(a) => collect_expr_vars(a, out),
        IntExpr::Add(a, b)
        | IntExpr::Sub(a, b)
        | IntExpr::Mul(a, b)
        | IntExpr::BitAnd(a, b)
        | IntExpr::BitOr(a, b)
        | IntExpr::BitXor(a, b)
        | IntExpr::Shl(a, b)
        | IntExpr::Shr(a, b)
        | IntExpr::Sha(a, b) => {
            collect_expr_vars(a, out);
            collect_expr_vars(b, out);
        }
        IntExpr::Ite(cond, t, f) => {
            collect_vars(cond, out);
            collect_expr_vars(t, out);
            collect_expr_vars(f, out);
        }
    }
}

struct Emitter<'a> {
    justification: &'a Justification,
    by_tuple: &'a FxHashMap<(RelId, Tuple), String>,
    width: u32,
}

impl Emitter<'_> {
    fn formula(&self, out: &mut String, f: &Formula) {
        match f {
            Formula::True => out.push_str("true"),
            Formula::False => out.push_str("false"),
            Formula::Member(rel, tuple) => self.member(out, *rel, tuple),
            Formula::Not(inner) => {
                out.push_str("(not ");
                self.formula(out, inner);
                out.push(')');
            }
            Formula::And(fs) => self.nary(out, "and", fs),
            Formula::Or(fs) => self.nary(out, "or", fs),
            Formula::Implies(a, b) => {
                out.push_str("(=> ");
                self.formula(out, a);
                out.push(' ');
                self.formula(out, b);
                out.push(')');
            }
            Formula::Iff(a, b) => {
                out.push_str("(= ");
                self.formula(out, a);
                out.push(' ');
                self.formula(out, b);
                out.push(')');
            }
            Formula::IntEq(a, b) => self.comparison(out, "=", a, b),
            Formula::IntLt(a, b) => self.comparison(out, "bvslt", a, b),
            Formula::IntLe(a, b) => self.comparison(out, "bvsle", a, b),
        }
    }

    fn member(&self, out: &mut String, rel: RelId, tuple: &Tuple) {
        if let Some(name) = self.by_tuple.get(&(rel, tuple.clone())) {
            out.push_str(&quoted(name));
            return;
        }
        let bounds = self.justification.bounds();
        let in_lower = bounds
            .lower(rel)
            .map(|l| l.contains(tuple))
            .unwrap_or(false);
        out.push_str(if in_lower { "true" } else { "false" });
    }

    fn nary(&self, out: &mut String, op: &str, fs: &[Formula]) {
        out.push('(');
        out.push_str(op);
        for f in fs {
            out.push(' ');
            self.formula(out, f);
        }
        out.push(')');
    }

    fn comparison(&self, out: &mut String, op: &str, a: &IntExpr, b: &IntExpr) {
        out.push('(');
        out.push_str(op);
        out.push(' ');
        self.expr(out, a);
        out.push(' ');
        self.expr(out, b);
        out.push(')');
    }

    fn expr(&self, out: &mut String, e: &IntExpr) {
        match e {
            IntExpr::Lit(v) => self.literal(out, *v),
            IntExpr::Var(name) => out.push_str(&quoted(name)),
            IntExpr::Neg(a) => self.unary(out, "bvneg", a),
            IntExpr::BitNot(a) => self.unary(out, "bvnot", a),
            IntExpr::Add(a, b) => self.binary(out, "bvadd", a, b),
            IntExpr::Sub(a, b) => self.binary(out, "bvsub", a, b),
            IntExpr::Mul(a, b) => self.binary(out, "bvmul", a, b),
            IntExpr::BitAnd(a, b) => self.binary(out, "bvand", a, b),
            IntExpr::BitOr(a, b) => self.binary(out, "bvor", a, b),
            IntExpr::BitXor(a, b) => self.binary(out, "bvxor", a, b),
            IntExpr::Shl(a, b) => self.binary(out, "bvshl", a, b),
            IntExpr::Shr(a, b) => self.binary(out, "bvlshr", a, b),
            IntExpr::Sha(a, b) => self.binary(out, "bvashr", a, b),
            IntExpr::Ite(cond, t, f) => {
                out.push_str("(ite ");
                self.formula(out, cond);
                out.push(' ');
                self.expr(out, t);
                out.push(' ');
                self.expr(out, f);
                out.push(')');
            }
        }
    }

    fn literal(&self, out: &mut String, v: i64) {
        let mask = if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        };
        let bits = v as u64 & mask;
        if self.width % 4 == 0 {
            let digits = (self.width / 4) as usize;
            let _ = write!(out, "#x{bits:0digits$x}");
        } else {
            let digits = self.width as usize;
            let _ = write!(out, "#b{bits:0digits$b}");
        }
    }

    fn unary(&self, out: &mut String, op: &str, a: &IntExpr) {
        out.push('(');
        out.push_str(op);
        out.push(' ');
        self.expr(out, a);
        out.push(')');
    }

    fn binary(&self, out: &mut String, op: &str, a: &IntExpr, b: &IntExpr) {
        out.push('(');
        out.push_str(op);
        out.push(' ');
        self.expr(out, a);
        out.push(' ');
        self.expr(out, b);
        out.push(')');
    }
}
