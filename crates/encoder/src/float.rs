//! IEEE-754 single-precision arithmetic over integer expression trees.
//!
//! A float is its 32-bit pattern: 1 sign bit, 8 exponent bits biased by
//! 127, 23 mantissa bits with an implicit leading 1. Every operation
//! here is rebuilt from two's-complement integer operations so the
//! solver never needs native floating point. Rounding is
//! round-to-nearest-even via guard/round/sticky bits; division runs a
//! fixed 7-step Newton-Raphson reciprocal iteration in Q28 fixed point.
//!
//! Subnormals are flushed to zero (an exponent field of 0 reads as
//! zero), and NaN/infinity inputs are not propagated through the
//! arithmetic ops; the [`is_nan`]/[`is_infinite`] predicates classify
//! them for callers that care. Evaluating these trees needs a working
//! width of 64 bits.

use membound_logic::{Formula, IntExpr};

const SIGN_BIT: i64 = 1 << 31;
const EXP_MASK: i64 = 0xFF;
const MANT_MASK: i64 = 0x7F_FFFF;
const IMPLICIT: i64 = 1 << 23;
const BIAS: i64 = 127;

/// Newton-Raphson seed 48/17 - 32/17 * d, coefficients in Q28.
const SEED_A: i64 = (48 << 28) / 17;
const SEED_B: i64 = (32 << 28) / 17;
const TWO_Q28: i64 = 2 << 28;
const NR_STEPS: usize = 7;

fn lit(v: i64) -> IntExpr {
    IntExpr::lit(v)
}

pub fn sign(a: IntExpr) -> IntExpr {
    a.bit(31)
}

pub fn exponent(a: IntExpr) -> IntExpr {
    a.shr(lit(23)).and(lit(EXP_MASK))
}

pub fn mantissa(a: IntExpr) -> IntExpr {
    a.and(lit(MANT_MASK))
}

/// Mantissa with the implicit leading 1 restored; zero for a zero
/// exponent field.
pub fn significand(a: IntExpr) -> IntExpr {
    IntExpr::ite(
        exponent(a.clone()).eq(lit(0)),
        lit(0),
        mantissa(a).or(lit(IMPLICIT)),
    )
}

pub fn is_nan(a: IntExpr) -> Formula {
    Formula::and_all(vec![
        exponent(a.clone()).eq(lit(EXP_MASK)),
        Formula::not(mantissa(a).eq(lit(0))),
    ])
}

pub fn is_infinite(a: IntExpr) -> Formula {
    Formula::and_all(vec![
        exponent(a.clone()).eq(lit(EXP_MASK)),
        mantissa(a).eq(lit(0)),
    ])
}

fn is_zero(a: IntExpr) -> Formula {
    exponent(a).eq(lit(0))
}

fn infinity(sign: IntExpr) -> IntExpr {
    sign.shl(lit(31)).or(lit(EXP_MASK << 23))
}

/// Assemble a pattern from a 0/1 sign, a biased exponent, and a
/// mantissa whose implicit bit is stripped by masking.
fn pack(sign: IntExpr, exponent: IntExpr, mantissa: IntExpr) -> IntExpr {
    sign.shl(lit(31))
        .or(exponent.and(lit(EXP_MASK)).shl(lit(23)))
        .or(mantissa.and(lit(MANT_MASK)))
}

/// Index of the highest set bit among positions `0..=max_pos`, or -1
/// for zero.
pub fn max_set_bit(e: IntExpr, max_pos: u32) -> IntExpr {
    let mut acc = lit(-1);
    for k in 0..=max_pos {
        acc = IntExpr::ite(e.clone().bit(k as i64).eq(lit(1)), lit(k as i64), acc);
    }
    acc
}

/// Right-shift with round-to-nearest-even: the result is incremented
/// when the guard bit (first bit shifted out) is set and either a
/// sticky bit (any lower shifted-out bit) is set or the shifted
/// result's LSB is 1. A non-positive shift returns the value unchanged.
pub fn adjust_right(value: IntExpr, shift: IntExpr) -> IntExpr {
    let shifted = value.clone().shr(shift.clone());
    let guard = value
        .clone()
        .shr(shift.clone().sub(lit(1)))
        .and(lit(1));
    let sticky_mask = lit(1).shl(shift.clone().sub(lit(1))).sub(lit(1));
    let sticky = Formula::not(value.clone().and(sticky_mask).eq(lit(0)));
    let lsb = shifted.clone().bit(0);
    let round_up = Formula::and_all(vec![
        guard.eq(lit(1)),
        Formula::or_all(vec![sticky, lsb.eq(lit(1))]),
    ]);
    IntExpr::ite(
        shift.le(lit(0)),
        value,
        IntExpr::ite(round_up, shifted.clone().add(lit(1)), shifted),
    )
}

/// Convert a two's-complement integer to the nearest representable
/// float pattern. Zero maps to the zero pattern exactly.
pub fn int_to_float(n: IntExpr) -> IntExpr {
    let negative = n.clone().lt(lit(0));
    let sign = IntExpr::ite(negative.clone(), lit(1), lit(0));
    let abs = IntExpr::ite(negative, n.clone().neg(), n);
    let msb = max_set_bit(abs.clone(), 31);

    // wide case: round the mantissa down into the 23-bit window, then
    // absorb a rounding carry out of bit 24
    let rounded = adjust_right(abs.clone(), msb.clone().sub(lit(23)));
    let carry = rounded.clone().bit(24);
    let wide_mant = IntExpr::ite(carry.clone().eq(lit(1)), rounded.clone().shr(lit(1)), rounded);
    let wide_exp = msb.clone().add(lit(BIAS)).add(carry);

    // narrow case: shift left into the window, exactly
    let narrow_mant = abs.clone().shl(lit(23).sub(msb.clone()));
    let narrow_exp = msb.clone().add(lit(BIAS));

    IntExpr::ite(
        abs.eq(lit(0)),
        lit(0),
        IntExpr::ite(
            msb.gt(lit(23)),
            pack(sign.clone(), wide_exp, wide_mant),
            pack(sign, narrow_exp, narrow_mant),
        ),
    )
}

/// Truncate a float pattern toward zero into a two's-complement
/// integer. Exponents below zero yield 0.
pub fn float_to_int(f: IntExpr) -> IntExpr {
    let e = exponent(f.clone()).sub(lit(BIAS));
    let sig = significand(f.clone());
    let magnitude = IntExpr::ite(
        e.clone().lt(lit(0)),
        lit(0),
        IntExpr::ite(
            e.clone().lt(lit(23)),
            sig.clone().shr(lit(23).sub(e.clone())),
            sig.shl(e.sub(lit(23))),
        ),
    );
    IntExpr::ite(
        sign(f).eq(lit(1)),
        magnitude.clone().neg(),
        magnitude,
    )
}

pub fn float_flip_sign(a: IntExpr) -> IntExpr {
    a.xor(lit(SIGN_BIT))
}

/// Add two float patterns. The larger-magnitude operand is the
/// reference; the other's significand is aligned to its exponent with
/// rounding, then added or subtracted depending on the signs.
pub fn float_add(a: IntExpr, b: IntExpr) -> IntExpr {
    let mag_a = a.clone().and(lit(!SIGN_BIT & 0xFFFF_FFFF));
    let mag_b = b.clone().and(lit(!SIGN_BIT & 0xFFFF_FFFF));
    let b_bigger = mag_a.lt(mag_b);
    let big = IntExpr::ite(b_bigger.clone(), b.clone(), a.clone());
    let small = IntExpr::ite(b_bigger, a.clone(), b.clone());

    let eb = exponent(big.clone());
    let delta = eb.clone().sub(exponent(small.clone()));
    let sb = significand(big.clone());
    let aligned = adjust_right(significand(small), delta);
    let result_sign = sign(big);

    // same signs: magnitudes add, possibly carrying out of bit 24
    let sum = sb.clone().add(aligned.clone());
    let c1 = sum.clone().bit(24);
    let renorm = adjust_right(sum.clone(), lit(1));
    let c2 = renorm.clone().bit(24);
    let sum_mant = IntExpr::ite(
        c1.clone().eq(lit(1)),
        IntExpr::ite(c2.clone().eq(lit(1)), renorm.clone().shr(lit(1)), renorm.clone()),
        sum.clone(),
    );
    let sum_exp = eb.clone().add(c1.clone()).add(c1.mul(c2));
    let sum_pattern = IntExpr::ite(
        sum_exp.clone().ge(lit(EXP_MASK)),
        infinity(result_sign.clone()),
        pack(result_sign.clone(), sum_exp, sum_mant),
    );

    // opposite signs: magnitudes subtract, then the leading bit is
    // shifted back up into position 23
    let diff = sb.sub(aligned);
    let dmsb = max_set_bit(diff.clone(), 24);
    let norm = lit(23).sub(dmsb);
    let diff_exp = eb.sub(norm.clone());
    let diff_pattern = IntExpr::ite(
        diff.clone().eq(lit(0)),
        lit(0),
        IntExpr::ite(
            diff_exp.clone().le(lit(0)),
            lit(0),
            pack(result_sign, diff_exp, diff.clone().shl(norm)),
        ),
    );

    let same_sign = sign(a.clone()).eq(sign(b.clone()));
    let a_zero = is_zero(a.clone());
    let b_zero = is_zero(b.clone());
    IntExpr::ite(
        a_zero,
        b,
        IntExpr::ite(b_zero, a, IntExpr::ite(same_sign, sum_pattern, diff_pattern)),
    )
}

pub fn float_minus(a: IntExpr, b: IntExpr) -> IntExpr {
    float_add(a, float_flip_sign(b))
}

/// Unary negation: 0 - a.
pub fn float_negate(a: IntExpr) -> IntExpr {
    float_minus(lit(0), a)
}

/// 32x32 -> 64 bit unsigned multiply as an explicit shift-and-add over
/// all 32 multiplier bit positions.
pub fn full_unsigned_multiply(a: IntExpr, b: IntExpr) -> IntExpr {
    let mut acc = lit(0);
    for k in 0..32 {
        acc = acc.add(IntExpr::ite(
            b.clone().bit(k).eq(lit(1)),
            a.clone().shl(lit(k)),
            lit(0),
        ));
    }
    acc
}

/// Multiply two float patterns. Exponents add; the 48-bit significand
/// product is renormalized into the mantissa window.
pub fn float_multiply(a: IntExpr, b: IntExpr) -> IntExpr {
    let s = sign(a.clone()).xor(sign(b.clone()));
    let product = full_unsigned_multiply(significand(a.clone()), significand(b.clone()));
    let high = product.clone().bit(47);
    let mant = adjust_right(
        product,
        IntExpr::ite(high.clone().eq(lit(1)), lit(24), lit(23)),
    );
    let carry = mant.clone().bit(24);
    let mant = IntExpr::ite(carry.clone().eq(lit(1)), mant.clone().shr(lit(1)), mant);
    let e = exponent(a.clone())
        .add(exponent(b.clone()))
        .sub(lit(BIAS))
        .add(high)
        .add(carry);
    let either_zero = Formula::or_all(vec![is_zero(a), is_zero(b)]);
    IntExpr::ite(
        either_zero,
        lit(0),
        IntExpr::ite(
            e.clone().le(lit(0)),
            lit(0),
            IntExpr::ite(e.clone().ge(lit(EXP_MASK)), infinity(s.clone()), pack(s, e, mant)),
        ),
    )
}

/// Divide two float patterns via a reciprocal of the divisor.
///
/// The divisor's significand is scaled into [1/2, 1) in Q28 fixed
/// point; the reciprocal converges quadratically from the affine seed
/// and the quotient significand lands with its leading bit at position
/// 51 or 52. Division by zero yields a signed infinity.
pub fn float_divide(a: IntExpr, b: IntExpr) -> IntExpr {
    let s = sign(a.clone()).xor(sign(b.clone()));

    let d = significand(b.clone()).shl(lit(4));
    let mut x = lit(SEED_A).sub(lit(SEED_B).mul(d.clone()).shr(lit(28)));
    for _ in 0..NR_STEPS {
        let correction = lit(TWO_Q28).sub(d.clone().mul(x.clone()).shr(lit(28)));
        x = x.mul(correction).shr(lit(28));
    }

    let p = significand(a.clone()).mul(x);
    let pmsb = IntExpr::ite(p.clone().bit(52).eq(lit(1)), lit(52), lit(51));
    let mant = adjust_right(p, pmsb.clone().sub(lit(23)));
    let carry = mant.clone().bit(24);
    let mant = IntExpr::ite(carry.clone().eq(lit(1)), mant.clone().shr(lit(1)), mant);
    let e = exponent(a.clone())
        .sub(exponent(b.clone()))
        .add(pmsb)
        .sub(lit(52))
        .add(lit(BIAS))
        .add(carry);

    IntExpr::ite(
        is_zero(b),
        infinity(s.clone()),
        IntExpr::ite(
            is_zero(a),
            s.clone().shl(lit(31)),
            IntExpr::ite(
                e.clone().le(lit(0)),
                s.clone().shl(lit(31)),
                IntExpr::ite(e.clone().ge(lit(EXP_MASK)), infinity(s.clone()), pack(s, e, mant)),
            ),
        ),
    )
}

/// Lexicographic compare on (sign, exponent, mantissa): -1, 0, or 1.
/// Zeros compare equal regardless of sign.
pub fn float_compare(a: IntExpr, b: IntExpr) -> IntExpr {
    let mag_a = a.clone().and(lit(!SIGN_BIT & 0xFFFF_FFFF));
    let mag_b = b.clone().and(lit(!SIGN_BIT & 0xFFFF_FFFF));
    let magnitudes = IntExpr::ite(
        mag_a.clone().gt(mag_b.clone()),
        lit(1),
        IntExpr::ite(mag_a.lt(mag_b), lit(-1), lit(0)),
    );
    let same_sign = IntExpr::ite(
        sign(a.clone()).eq(lit(1)),
        magnitudes.clone().neg(),
        magnitudes,
    );
    let both_zero = Formula::and_all(vec![is_zero(a.clone()), is_zero(b.clone())]);
    IntExpr::ite(
        both_zero,
        lit(0),
        IntExpr::ite(
            sign(a.clone()).eq(sign(b.clone())),
            same_sign,
            IntExpr::ite(sign(a).eq(lit(1)), lit(-1), lit(1)),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use membound_logic::{eval_formula, eval_int};

    fn ev(e: &IntExpr) -> u64 {
        eval_int(e, 64).unwrap()
    }

    fn evs(e: &IntExpr) -> i64 {
        ev(e) as i64
    }

    fn fl(x: f32) -> IntExpr {
        IntExpr::lit(x.to_bits() as i64)
    }

    fn bits(x: f32) -> u64 {
        x.to_bits() as u64
    }

    #[test]
    fn field_extraction() {
        let x = fl(-2.5);
        assert_eq!(ev(&sign(x.clone())), 1);
        assert_eq!(ev(&exponent(x.clone())), 128);
        assert_eq!(ev(&mantissa(x.clone())), 0x20_0000);
        assert_eq!(ev(&significand(x)), 0xA0_0000);
        assert_eq!(ev(&significand(fl(0.0))), 0);
    }

    #[test]
    fn nan_and_infinity_classification() {
        assert!(eval_formula(&is_nan(fl(f32::NAN)), 64).unwrap());
        assert!(!eval_formula(&is_nan(fl(f32::INFINITY)), 64).unwrap());
        assert!(eval_formula(&is_infinite(fl(f32::INFINITY)), 64).unwrap());
        assert!(eval_formula(&is_infinite(fl(f32::NEG_INFINITY)), 64).unwrap());
        assert!(!eval_formula(&is_infinite(fl(1.0)), 64).unwrap());
    }

    #[test]
    fn max_set_bit_positions() {
        assert_eq!(evs(&max_set_bit(IntExpr::lit(0), 31)), -1);
        assert_eq!(evs(&max_set_bit(IntExpr::lit(0b1000), 31)), 3);
        assert_eq!(evs(&max_set_bit(IntExpr::lit(1), 31)), 0);
        assert_eq!(evs(&max_set_bit(IntExpr::lit(0b1010_0000), 31)), 7);
    }

    #[test]
    fn adjust_right_rounds_to_nearest_even() {
        let adj = |v: i64, s: i64| ev(&adjust_right(IntExpr::lit(v), IntExpr::lit(s)));
        assert_eq!(adj(0b1011, 1), 6); // 5.5 rounds up to even 6
        assert_eq!(adj(0b1001, 1), 4); // 4.5 rounds down to even 4
        assert_eq!(adj(0b1011, 2), 3); // 2.75 rounds up on sticky
        assert_eq!(adj(0b1000, 2), 2); // exact
        assert_eq!(adj(7, 0), 7); // no shift, no change
    }

    #[test]
    fn int_to_float_matches_hardware() {
        for n in [0i64, 1, 2, 5, 7, 100, -1, -12345, 16_777_215, -16_777_215] {
            let f = int_to_float(IntExpr::lit(n));
            assert_eq!(ev(&f), bits(n as f32), "n = {n}");
        }
        // beyond 24 significant bits: rounding engages
        for n in [(1i64 << 26) + 1, (1 << 25) + 3, -((1 << 26) + 5)] {
            let f = int_to_float(IntExpr::lit(n));
            assert_eq!(ev(&f), bits(n as f32), "n = {n}");
        }
    }

    #[test]
    fn float_to_int_truncates_toward_zero() {
        assert_eq!(evs(&float_to_int(fl(3.75))), 3);
        assert_eq!(evs(&float_to_int(fl(-3.75))), -3);
        assert_eq!(evs(&float_to_int(fl(0.5))), 0);
        assert_eq!(evs(&float_to_int(fl(0.0))), 0);
        assert_eq!(evs(&float_to_int(fl(16_777_215.0))), 16_777_215);
    }

    #[test]
    fn add_exact_cases_match_hardware() {
        let cases = [
            (1.5f32, 2.25f32),
            (1.0, 1.0),
            (0.5, -0.25),
            (100.0, 0.125),
            (-3.5, -4.5),
        ];
        for (x, y) in cases {
            let sum = float_add(fl(x), fl(y));
            assert_eq!(ev(&sum), bits(x + y), "{x} + {y}");
        }
    }

    #[test]
    fn add_with_zero_is_identity() {
        assert_eq!(ev(&float_add(fl(0.0), fl(2.5))), bits(2.5));
        assert_eq!(ev(&float_add(fl(2.5), fl(0.0))), bits(2.5));
    }

    #[test]
    fn add_cancellation_gives_positive_zero() {
        assert_eq!(ev(&float_add(fl(1.5), fl(-1.5))), 0);
        assert_eq!(ev(&float_add(fl(-1.5), fl(1.5))), 0);
    }

    #[test]
    fn add_is_commutative() {
        let cases = [(1.5f32, 2.25f32), (-0.75, 3.0), (123.456, -0.001)];
        for (x, y) in cases {
            assert_eq!(
                ev(&float_add(fl(x), fl(y))),
                ev(&float_add(fl(y), fl(x))),
                "{x} + {y}"
            );
        }
    }

    #[test]
    fn minus_and_negate() {
        assert_eq!(ev(&float_minus(fl(3.5), fl(1.25))), bits(2.25));
        assert_eq!(ev(&float_negate(fl(2.0))), bits(-2.0));
        assert_eq!(ev(&float_negate(fl(-2.0))), bits(2.0));
    }

    #[test]
    fn full_multiply_is_exact() {
        let m = full_unsigned_multiply(IntExpr::lit(0xFF_FFFF), IntExpr::lit(0xFF_FFFF));
        assert_eq!(ev(&m), 0xFF_FFFFu64 * 0xFF_FFFF);
        let m = full_unsigned_multiply(IntExpr::lit(12345), IntExpr::lit(6789));
        assert_eq!(ev(&m), 12345 * 6789);
    }

    #[test]
    fn multiply_matches_hardware() {
        let cases = [
            (3.0f32, 2.0f32),
            (1.5, 1.5),
            (1.5, -2.5),
            (0.5, 0.5),
            (1024.0, 1024.0),
        ];
        for (x, y) in cases {
            assert_eq!(ev(&float_multiply(fl(x), fl(y))), bits(x * y), "{x} * {y}");
        }
        assert_eq!(ev(&float_multiply(fl(0.0), fl(-7.5))), 0);
    }

    #[test]
    fn divide_exact_cases_match_hardware() {
        let cases = [
            (1.0f32, 1.0f32),
            (6.0, 2.0),
            (6.0, 3.0),
            (1.0, 2.0),
            (7.0, 2.0),
            (-6.0, 3.0),
            (3.0, -1.5),
        ];
        for (x, y) in cases {
            assert_eq!(ev(&float_divide(fl(x), fl(y))), bits(x / y), "{x} / {y}");
        }
    }

    #[test]
    fn divide_by_zero_is_signed_infinity() {
        assert_eq!(ev(&float_divide(fl(1.0), fl(0.0))), bits(f32::INFINITY));
        assert_eq!(
            ev(&float_divide(fl(-1.0), fl(0.0))),
            bits(f32::NEG_INFINITY)
        );
        assert_eq!(ev(&float_divide(fl(0.0), fl(5.0))), 0);
    }

    #[test]
    fn compare_orders_patterns() {
        let cmp = |x: f32, y: f32| evs(&float_compare(fl(x), fl(y)));
        assert_eq!(cmp(1.0, 2.0), -1);
        assert_eq!(cmp(2.0, -1.0), 1);
        assert_eq!(cmp(-1.0, -2.0), 1);
        assert_eq!(cmp(-2.0, -1.0), -1);
        assert_eq!(cmp(1.5, 1.5), 0);
        assert_eq!(cmp(0.0, -0.0), 0);
    }
}
