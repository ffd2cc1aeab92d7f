//! Approximate comparison of floating-point annotation values.
//!
//! Two values that describe the same quantity but took different arithmetic
//! paths can differ by a rounding error whose size grows with their binary
//! exponent. [`approx_cmp`] treats values as equal when they fall within a
//! window of `f32::EPSILON * 2^e`, where `e` is the exponent of the operand
//! with the larger magnitude.
//!
//! The window uses single-precision epsilon even though the comparison runs
//! in `f64`: INFO values are stored as 32-bit floats, so that is the
//! precision they actually carry.

use std::cmp::Ordering;
use std::fmt;

/// Three-way result of a tolerant comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    LessThan,
    Equal,
    GreaterThan,
}

impl Comparison {
    /// The result of the same comparison with operands swapped.
    pub fn reverse(self) -> Self {
        match self {
            Comparison::LessThan => Comparison::GreaterThan,
            Comparison::Equal => Comparison::Equal,
            Comparison::GreaterThan => Comparison::LessThan,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Comparison::LessThan => "less",
            Comparison::Equal => "equal",
            Comparison::GreaterThan => "greater",
        }
    }
}

impl From<Comparison> for Ordering {
    fn from(c: Comparison) -> Self {
        match c {
            Comparison::LessThan => Ordering::Less,
            Comparison::Equal => Ordering::Equal,
            Comparison::GreaterThan => Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compare `a` against `b` with a magnitude-scaled tolerance.
///
/// NaN operands compare `Equal` (no ordered test succeeds); infinities
/// compare by sign.
pub fn approx_cmp(a: f64, b: f64) -> Comparison {
    let max = if a.abs() > b.abs() { a } else { b };

    if !max.is_finite() {
        return match a.partial_cmp(&b) {
            Some(Ordering::Less) => Comparison::LessThan,
            Some(Ordering::Greater) => Comparison::GreaterThan,
            _ => Comparison::Equal,
        };
    }

    let delta = scale_pow2(f64::from(f32::EPSILON), exponent(max));
    let difference = a - b;

    if difference > delta {
        Comparison::GreaterThan
    } else if difference < -delta {
        Comparison::LessThan
    } else {
        Comparison::Equal
    }
}

/// Binary exponent `e` of `x = f * 2^e` with `1 <= |f| < 2`; 0 for zero.
fn exponent(x: f64) -> i32 {
    if x == 0.0 {
        return 0;
    }
    let biased = ((x.to_bits() >> 52) & 0x7FF) as i32;
    if biased == 0 {
        // subnormal: renormalise first
        return exponent(x * 2f64.powi(54)) - 54;
    }
    biased - 1023
}

/// `x * 2^e`, split in two steps so neither factor overflows.
fn scale_pow2(x: f64, e: i32) -> f64 {
    let half = e / 2;
    x * 2f64.powi(half) * 2f64.powi(e - half)
}
