use crate::bounds::RelId;
use crate::expr::IntExpr;
use crate::universe::Tuple;

/// Boolean constraint over finite relations and integer expressions.
///
/// The only relational literal is tuple membership; all quantification is
/// performed by the encoder, which enumerates the relevant finite action
/// sets and emits explicit conjunctions/disjunctions.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    True,
    False,
    /// `tuple ∈ relation`
    Member(RelId, Tuple),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    IntEq(Box<IntExpr>, Box<IntExpr>),
    /// Signed less-than at the configured width.
    IntLt(Box<IntExpr>, Box<IntExpr>),
    IntLe(Box<IntExpr>, Box<IntExpr>),
}

impl Formula {
    pub fn member(rel: RelId, tuple: Tuple) -> Formula {
        Formula::Member(rel, tuple)
    }

    /// Negation, folding constants.
    pub fn not(f: Formula) -> Formula {
        match f {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    /// N-ary conjunction, dropping `True`, short-circuiting on `False`,
    /// and collapsing empty/singleton vectors.
    pub fn and_all(fs: Vec<Formula>) -> Formula {
        let mut out = Vec::with_capacity(fs.len());
        for f in fs {
            match f {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::True,
            1 => out.pop().unwrap_or(Formula::True),
            _ => Formula::And(out),
        }
    }

    /// N-ary disjunction, dual of [`Formula::and_all`].
    pub fn or_all(fs: Vec<Formula>) -> Formula {
        let mut out = Vec::with_capacity(fs.len());
        for f in fs {
            match f {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::False,
            1 => out.pop().unwrap_or(Formula::False),
            _ => Formula::Or(out),
        }
    }

    /// Implication, folding constant premises and conclusions.
    pub fn implies(premise: Formula, conclusion: Formula) -> Formula {
        match (premise, conclusion) {
            (Formula::True, c) => c,
            (Formula::False, _) => Formula::True,
            (_, Formula::True) => Formula::True,
            (p, Formula::False) => Formula::not(p),
            (p, c) => Formula::Implies(Box::new(p), Box::new(c)),
        }
    }

    pub fn iff(a: Formula, b: Formula) -> Formula {
        match (a, b) {
            (Formula::True, x) | (x, Formula::True) => x,
            (Formula::False, x) | (x, Formula::False) => Formula::not(x),
            (a, b) => Formula::Iff(Box::new(a), Box::new(b)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Formula::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Formula::False)
    }

    /// Number of top-level conjuncts (1 for non-`And` formulas).
    pub fn conjunct_count(&self) -> usize {
        match self {
            Formula::And(fs) => fs.len(),
            _ => 1,
        }
    }

    /// Visit every subformula, including `self`.
    pub fn visit(&self, f: &mut impl FnMut(&Formula)) {
        f(self);
        match self {
            Formula::Not(inner) => inner.visit(f),
            Formula::And(fs) | Formula::Or(fs) => {
                for sub in fs {
                    sub.visit(f);
                }
            }
            Formula::Implies(a, b) | Formula::Iff(a, b) => {
                a.visit(f);
                b.visit(f);
            }
            _ => {}
        }
    }
}
