//! Bound-aware literal folding.
//!
//! A membership literal whose tuple lies outside the relation's upper
//! bound can never hold; one whose tuple lies inside the lower bound
//! always holds. Folding these to constants and rebuilding with the
//! smart constructors shrinks the formula before translation.

use std::rc::Rc;

use crate::bounds::Bounds;
use crate::expr::IntExpr;
use crate::formula::Formula;

/// Fold membership literals against `bounds`, rebuilding the formula
/// through the simplifying constructors.
pub fn fold_bounds(f: &Formula, bounds: &Bounds) -> Formula {
    match f {
        Formula::True => Formula::True,
        Formula::False => Formula::False,
        Formula::Member(rel, tuple) => {
            if let Some(upper) = bounds.upper(*rel) {
                if !upper.contains(tuple) {
                    return Formula::False;
                }
            }
            if let Some(lower) = bounds.lower(*rel) {
                if lower.contains(tuple) {
                    return Formula::True;
                }
            }
            f.clone()
        }
        Formula::Not(inner) => Formula::not(fold_bounds(inner, bounds)),
        Formula::And(fs) => {
            Formula::and_all(fs.iter().map(|sub| fold_bounds(sub, bounds)).collect())
        }
        Formula::Or(fs) => {
            Formula::or_all(fs.iter().map(|sub| fold_bounds(sub, bounds)).collect())
        }
        Formula::Implies(a, b) => {
            Formula::implies(fold_bounds(a, bounds), fold_bounds(b, bounds))
        }
        Formula::Iff(a, b) => Formula::iff(fold_bounds(a, bounds), fold_bounds(b, bounds)),
        Formula::IntEq(a, b) => Formula::IntEq(
            Box::new(fold_expr(a, bounds)),
            Box::new(fold_expr(b, bounds)),
        ),
        Formula::IntLt(a, b) => Formula::IntLt(
            Box::new(fold_expr(a, bounds)),
            Box::new(fold_expr(b, bounds)),
        ),
        Formula::IntLe(a, b) => Formula::IntLe(
            Box::new(fold_expr(a, bounds)),
            Box::new(fold_expr(b, bounds)),
        ),
    }
}

fn fold_expr(e: &IntExpr, bounds: &Bounds) -> IntExpr {
    match e {
        IntExpr::Lit(_) | IntExpr::Var(_) => e.clone(),
        IntExpr::Neg(a) => IntExpr::Neg(Rc::new(fold_expr(a, bounds))),
        IntExpr::BitNot(a) => IntExpr::BitNot(Rc::new(fold_expr(a, bounds))),
        IntExpr::Add(a, b) => bin(IntExpr::Add, a, b, bounds),
        IntExpr::Sub(a, b) => bin(IntExpr::Sub, a, b, bounds),
        IntExpr::Mul(a, b) => bin(IntExpr::Mul, a, b, bounds),
        IntExpr::BitAnd(a, b) => bin(IntExpr::BitAnd, a, b, bounds),
        IntExpr::BitOr(a, b) => bin(IntExpr::BitOr, a, b, bounds),
        IntExpr::BitXor(a, b) => bin(IntExpr::BitXor, a, b, bounds),
        IntExpr::Shl(a, b) => bin(IntExpr::Shl, a, b, bounds),
        IntExpr::Shr(a, b) => bin(IntExpr::Shr, a, b, bounds),
        IntExpr::Sha(a, b) => bin(IntExpr::Sha, a, b, bounds),
        IntExpr::Ite(cond, t, f) => {
            let cond = fold_bounds(cond, bounds);
            match cond {
                Formula::True => fold_expr(t, bounds),
                Formula::False => fold_expr(f, bounds),
                cond => IntExpr::ite(cond, fold_expr(t, bounds), fold_expr(f, bounds)),
            }
        }
    }
}

fn bin(
    ctor: fn(Rc<IntExpr>, Rc<IntExpr>) -> IntExpr,
    a: &IntExpr,
    b: &IntExpr,
    bounds: &Bounds,
) -> IntExpr {
    ctor(
        Rc::new(fold_expr(a, bounds)),
        Rc::new(fold_expr(b, bounds)),
    )
}
