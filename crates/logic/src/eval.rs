//! Closed-term constant evaluation.
//!
//! Evaluates integer expressions and formulas that contain no free
//! variables and no relational literals, at a given bit width. Shared
//! subexpressions are evaluated once: results are cached per
//! reference-counted node, so a DAG built by operand-reusing builders
//! costs time proportional to its distinct nodes. Used by the float
//! encoder's test suite and for constant folding.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::expr::IntExpr;
use crate::formula::Formula;

/// Errors from closed-term evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The term references a free variable.
    FreeVariable(String),
    /// The formula contains a relational membership literal.
    RelationalLiteral(String),
    /// Unsupported width (must be 1..=64).
    BadWidth(u32),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::FreeVariable(name) => write!(f, "free variable in closed term: {name}"),
            EvalError::RelationalLiteral(rel) => {
                write!(f, "relational literal in closed formula: {rel}")
            }
            EvalError::BadWidth(w) => write!(f, "unsupported bit width: {w}"),
        }
    }
}

impl std::error::Error for EvalError {}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Sign-extend a `width`-bit pattern to i64.
fn signed(v: u64, width: u32) -> i64 {
    if width >= 64 {
        v as i64
    } else {
        let sign_bit = 1u64 << (width - 1);
        if v & sign_bit != 0 {
            (v | !mask(width)) as i64
        } else {
            v as i64
        }
    }
}

/// Evaluate a closed integer expression at `width` bits.
///
/// Returns the unsigned bit pattern (masked to `width`). Shift amounts
/// are interpreted signed; out-of-range amounts yield 0 (all-ones for an
/// arithmetic right shift of a negative value).
pub fn eval_int(e: &IntExpr, width: u32) -> Result<u64, EvalError> {
    Evaluator::new(width)?.node(e)
}

/// Evaluate a closed formula at `width` bits.
pub fn eval_formula(f: &Formula, width: u32) -> Result<bool, EvalError> {
    Evaluator::new(width)?.formula(f)
}

/// One evaluation pass. Closed terms have a fixed value, so the cache
/// is keyed by node address; every address stays live for the whole
/// pass because the root keeps its subtrees alive.
struct Evaluator {
    width: u32,
    mask: u64,
    memo: FxHashMap<*const IntExpr, u64>,
}

impl Evaluator {
    fn new(width: u32) -> Result<Self, EvalError> {
        if width == 0 || width > 64 {
            return Err(EvalError::BadWidth(width));
        }
        Ok(Self {
            width,
            mask: mask(width),
            memo: FxHashMap::default(),
        })
    }

    fn shared(&mut self, e: &Rc<IntExpr>) -> Result<u64, EvalError> {
        let key = Rc::as_ptr(e);
        if let Some(&v) = self.memo.get(&key) {
            return Ok(v);
        }
        let v = self.node(e)?;
        self.memo.insert(key, v);
        Ok(v)
    }

    fn node(&mut self, e: &IntExpr) -> Result<u64, EvalError> {
        let width = self.width;
        let v = match e {
            IntExpr::Lit(v) => *v as u64,
            IntExpr::Var(name) => return Err(EvalError::FreeVariable(name.clone())),
            IntExpr::Neg(x) => self.shared(x)?.wrapping_neg(),
            IntExpr::Add(a, b) => self.shared(a)?.wrapping_add(self.shared(b)?),
            IntExpr::Sub(a, b) => self.shared(a)?.wrapping_sub(self.shared(b)?),
            IntExpr::Mul(a, b) => self.shared(a)?.wrapping_mul(self.shared(b)?),
            IntExpr::BitAnd(a, b) => self.shared(a)? & self.shared(b)?,
            IntExpr::BitOr(a, b) => self.shared(a)? | self.shared(b)?,
            IntExpr::BitXor(a, b) => self.shared(a)? ^ self.shared(b)?,
            IntExpr::BitNot(a) => !self.shared(a)?,
            IntExpr::Shl(a, n) => {
                let v = self.shared(a)?;
                let n = signed(self.shared(n)?, width);
                if n < 0 || n >= width as i64 {
                    0
                } else {
                    v << n
                }
            }
            IntExpr::Shr(a, n) => {
                let v = self.shared(a)? & self.mask;
                let n = signed(self.shared(n)?, width);
                if n < 0 || n >= width as i64 {
                    0
                } else {
                    v >> n
                }
            }
            IntExpr::Sha(a, n) => {
                let v = signed(self.shared(a)? & self.mask, width);
                let n = signed(self.shared(n)?, width);
                if n < 0 || n >= width as i64 {
                    if v < 0 {
                        u64::MAX
                    } else {
                        0
                    }
                } else {
                    (v >> n) as u64
                }
            }
            IntExpr::Ite(cond, t, f) => {
                if self.formula(cond)? {
                    self.shared(t)?
                } else {
                    self.shared(f)?
                }
            }
        };
        Ok(v & self.mask)
    }

    fn formula(&mut self, f: &Formula) -> Result<bool, EvalError> {
        let width = self.width;
        let v = match f {
            Formula::True => true,
            Formula::False => false,
            Formula::Member(rel, _) => {
                return Err(EvalError::RelationalLiteral(format!(
                    "relation #{}",
                    rel.index()
                )))
            }
            Formula::Not(inner) => !self.formula(inner)?,
            Formula::And(fs) => {
                for sub in fs {
                    if !self.formula(sub)? {
                        return Ok(false);
                    }
                }
                true
            }
            Formula::Or(fs) => {
                for sub in fs {
                    if self.formula(sub)? {
                        return Ok(true);
                    }
                }
                false
            }
            Formula::Implies(a, b) => !self.formula(a)? || self.formula(b)?,
            Formula::Iff(a, b) => self.formula(a)? == self.formula(b)?,
            Formula::IntEq(a, b) => self.node(a)? == self.node(b)?,
            Formula::IntLt(a, b) => signed(self.node(a)?, width) < signed(self.node(b)?, width),
            Formula::IntLe(a, b) => signed(self.node(a)?, width) <= signed(self.node(b)?, width),
        };
        Ok(v)
    }
}
