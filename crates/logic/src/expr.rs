use std::rc::Rc;

use crate::formula::Formula;

/// Fixed-width two's-complement integer expression tree.
///
/// Width is not carried in the tree; it is supplied by the consumer (the
/// evaluator or the solver translation) as the problem's configured bit
/// width. Shift semantics are total: a shift by a negative or
/// width-or-larger amount yields 0 (all-ones for an arithmetic right
/// shift of a negative value), so every `Ite` branch can be evaluated.
///
/// Children are reference-counted, so cloning a node shares its subtrees
/// and composed expressions form a DAG. The evaluator caches results per
/// shared node; builders that reuse an operand many times stay cheap.
#[derive(Debug, Clone, PartialEq)]
pub enum IntExpr {
    /// Integer literal (interpreted at the configured width).
    Lit(i64),
    /// Named free variable supplied by the front end.
    Var(String),
    /// Two's complement negation.
    Neg(Rc<IntExpr>),
    Add(Rc<IntExpr>, Rc<IntExpr>),
    Sub(Rc<IntExpr>, Rc<IntExpr>),
    Mul(Rc<IntExpr>, Rc<IntExpr>),
    BitAnd(Rc<IntExpr>, Rc<IntExpr>),
    BitOr(Rc<IntExpr>, Rc<IntExpr>),
    BitXor(Rc<IntExpr>, Rc<IntExpr>),
    BitNot(Rc<IntExpr>),
    /// Left shift.
    Shl(Rc<IntExpr>, Rc<IntExpr>),
    /// Logical (zero-filling) right shift.
    Shr(Rc<IntExpr>, Rc<IntExpr>),
    /// Arithmetic (sign-filling) right shift.
    Sha(Rc<IntExpr>, Rc<IntExpr>),
    /// Conditional expression.
    Ite(Rc<Formula>, Rc<IntExpr>, Rc<IntExpr>),
}

impl IntExpr {
    pub fn lit(v: i64) -> Self {
        IntExpr::Lit(v)
    }

    pub fn var(name: impl Into<String>) -> Self {
        IntExpr::Var(name.into())
    }

    pub fn ite(cond: Formula, then: IntExpr, els: IntExpr) -> Self {
        IntExpr::Ite(Rc::new(cond), Rc::new(then), Rc::new(els))
    }

    pub fn neg(self) -> Self {
        IntExpr::Neg(Rc::new(self))
    }

    pub fn add(self, rhs: IntExpr) -> Self {
        IntExpr::Add(Rc::new(self), Rc::new(rhs))
    }

    pub fn sub(self, rhs: IntExpr) -> Self {
        IntExpr::Sub(Rc::new(self), Rc::new(rhs))
    }

    pub fn mul(self, rhs: IntExpr) -> Self {
        IntExpr::Mul(Rc::new(self), Rc::new(rhs))
    }

    pub fn and(self, rhs: IntExpr) -> Self {
        IntExpr::BitAnd(Rc::new(self), Rc::new(rhs))
    }

    pub fn or(self, rhs: IntExpr) -> Self {
        IntExpr::BitOr(Rc::new(self), Rc::new(rhs))
    }

    pub fn xor(self, rhs: IntExpr) -> Self {
        IntExpr::BitXor(Rc::new(self), Rc::new(rhs))
    }

    pub fn not(self) -> Self {
        IntExpr::BitNot(Rc::new(self))
    }

    pub fn shl(self, amount: IntExpr) -> Self {
        IntExpr::Shl(Rc::new(self), Rc::new(amount))
    }

    pub fn shr(self, amount: IntExpr) -> Self {
        IntExpr::Shr(Rc::new(self), Rc::new(amount))
    }

    pub fn sha(self, amount: IntExpr) -> Self {
        IntExpr::Sha(Rc::new(self), Rc::new(amount))
    }

    /// Bit `i` of this expression, as a 0/1 expression.
    pub fn bit(self, i: i64) -> Self {
        self.shr(IntExpr::lit(i)).and(IntExpr::lit(1))
    }

    // --- comparisons, producing formulas ---

    pub fn eq(self, rhs: IntExpr) -> Formula {
        Formula::IntEq(Box::new(self), Box::new(rhs))
    }

    pub fn lt(self, rhs: IntExpr) -> Formula {
        Formula::IntLt(Box::new(self), Box::new(rhs))
    }

    pub fn le(self, rhs: IntExpr) -> Formula {
        Formula::IntLe(Box::new(self), Box::new(rhs))
    }

    pub fn gt(self, rhs: IntExpr) -> Formula {
        Formula::IntLt(Box::new(rhs), Box::new(self))
    }

    pub fn ge(self, rhs: IntExpr) -> Formula {
        Formula::IntLe(Box::new(rhs), Box::new(self))
    }
}
