//! Level-dispatched operations over `Number`
//!
//! Every binary operation first brings both operands to a common level through `coerce`,
//! then runs the level-specific operation and canonicalizes the result.

use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};

use num::bigint::BigInt;
use num::complex::Complex64;
use num::integer::Roots;
use num::rational::{BigRational, Ratio};
use num::traits::{One, Signed};
use num::Integer;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::number::{coerce, rat2flo, Coerced, Number};

macro_rules! impl_arith {
    ($tr:ident, $op:ident, $fix:ident) => {
        impl $tr<Number> for Number {
            type Output = Number;

            fn $op(self, other: Number) -> Number {
                match coerce(self, other) {
                    Coerced::Fixnum(l, r) => Number::from_i128((l as i128).$fix(r as i128)),
                    Coerced::Bignum(l, r) => Number::from_bigint(l.$op(r)),
                    Coerced::Rational(l, r) => Number::from_ratio(l.$op(r)),
                    Coerced::Real(l, r) => Number::Real(l.$op(r)),
                    Coerced::Complex(l, r) => Number::Complex(l.$op(r)),
                }
            }
        }
    }
}

// i128 holds any sum, difference or product of two i64 values without wrapping.
impl_arith!(Add, add, add);
impl_arith!(Sub, sub, sub);
impl_arith!(Mul, mul, mul);

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Fixnum(n) => Number::from_i128(-(n as i128)),
            Number::Bignum(n) => Number::from_bigint(-n),
            Number::Rational(r) => Number::Rational(-r),
            Number::Real(f) => Number::Real(-f),
            Number::Complex(c) => Number::Complex(-c),
        }
    }
}

fn divide_by_zero(op: &str) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::DivideByZero, format!("{}: division by zero", op))
}

fn integer_expected(op: &str, n: &Number) -> RuntimeError {
    RuntimeError::invalid_type(format!("{}: integer expected, but received {}", op, n))
}

fn complex_unordered(op: &str) -> RuntimeError {
    RuntimeError::invalid_type(format!("{}: complex numbers are not ordered", op))
}

/// Rounds to the nearest integer, breaking ties toward the even neighbour
fn round_half_even(r: &BigRational) -> BigInt {
    let floor = r.floor();
    let diff = r - &floor;
    let half = Ratio::new(BigInt::one(), BigInt::from(2));
    let floor = floor.to_integer();
    match diff.cmp(&half) {
        Ordering::Less => floor,
        Ordering::Greater => floor + BigInt::one(),
        Ordering::Equal => if floor.is_even() { floor } else { floor + BigInt::one() },
    }
}

fn exact_sqrt(n: &BigInt) -> Option<BigInt> {
    if n.is_negative() {
        return None;
    }
    let root = n.sqrt();
    if &root * &root == *n { Some(root) } else { None }
}

impl Number {
    /// General division. Exact operands produce an exact, possibly rational, result.
    pub fn div(self, other: Number) -> Result<Number, RuntimeError> {
        if other.is_zero() {
            return Err(divide_by_zero("/"));
        }
        match coerce(self, other) {
            Coerced::Fixnum(l, r) => Number::rational(BigInt::from(l), BigInt::from(r)),
            Coerced::Bignum(l, r) => Number::rational(l, r),
            Coerced::Rational(l, r) => Ok(Number::from_ratio(l / r)),
            Coerced::Real(l, r) => Ok(Number::Real(l / r)),
            Coerced::Complex(l, r) => Ok(Number::Complex(l / r)),
        }
    }

    /// Integer division truncating toward zero
    pub fn quotient(self, other: Number) -> Result<Number, RuntimeError> {
        if other.is_zero() {
            return Err(divide_by_zero("quotient"));
        }
        match coerce(self, other) {
            Coerced::Fixnum(l, r) => Ok(Number::from_i128(l as i128 / r as i128)),
            Coerced::Bignum(l, r) => Ok(Number::from_bigint(l / r)),
            Coerced::Rational(l, _) => Err(integer_expected("quotient", &Number::Rational(l))),
            Coerced::Real(l, _) => Err(integer_expected("quotient", &Number::Real(l))),
            Coerced::Complex(l, _) => Err(integer_expected("quotient", &Number::Complex(l))),
        }
    }

    /// Remainder with the sign of the dividend
    pub fn remainder(self, other: Number) -> Result<Number, RuntimeError> {
        if other.is_zero() {
            return Err(divide_by_zero("remainder"));
        }
        match coerce(self, other) {
            Coerced::Fixnum(l, r) => Ok(Number::from_i128(l as i128 % r as i128)),
            Coerced::Bignum(l, r) => Ok(Number::from_bigint(l % r)),
            Coerced::Rational(l, _) => Err(integer_expected("remainder", &Number::Rational(l))),
            Coerced::Real(l, _) => Err(integer_expected("remainder", &Number::Real(l))),
            Coerced::Complex(l, _) => Err(integer_expected("remainder", &Number::Complex(l))),
        }
    }

    /// Numeric equality across levels
    pub fn num_eq(self, other: Number) -> bool {
        match coerce(self, other) {
            Coerced::Fixnum(l, r) => l == r,
            Coerced::Bignum(l, r) => l == r,
            Coerced::Rational(l, r) => l == r,
            Coerced::Real(l, r) => l == r,
            Coerced::Complex(l, r) => l == r,
        }
    }

    /// Ordering of two real numbers. `None` when either side is NaN.
    pub fn compare(self, other: Number) -> Result<Option<Ordering>, RuntimeError> {
        match coerce(self, other) {
            Coerced::Fixnum(l, r) => Ok(Some(l.cmp(&r))),
            Coerced::Bignum(l, r) => Ok(Some(l.cmp(&r))),
            Coerced::Rational(l, r) => Ok(Some(l.cmp(&r))),
            Coerced::Real(l, r) => Ok(l.partial_cmp(&r)),
            Coerced::Complex(..) => Err(complex_unordered("compare")),
        }
    }

    pub fn lt(self, other: Number) -> Result<bool, RuntimeError> {
        Ok(self.compare(other)? == Some(Ordering::Less))
    }

    pub fn le(self, other: Number) -> Result<bool, RuntimeError> {
        Ok(matches!(self.compare(other)?, Some(Ordering::Less) | Some(Ordering::Equal)))
    }

    pub fn gt(self, other: Number) -> Result<bool, RuntimeError> {
        Ok(self.compare(other)? == Some(Ordering::Greater))
    }

    pub fn ge(self, other: Number) -> Result<bool, RuntimeError> {
        Ok(matches!(self.compare(other)?, Some(Ordering::Greater) | Some(Ordering::Equal)))
    }

    pub fn floor(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Rational(r) => Ok(Number::from_bigint(r.floor().to_integer())),
            Number::Real(f) => Ok(Number::Real(f.floor())),
            Number::Complex(_) => Err(complex_unordered("floor")),
            n => Ok(n),
        }
    }

    pub fn ceiling(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Rational(r) => Ok(Number::from_bigint(r.ceil().to_integer())),
            Number::Real(f) => Ok(Number::Real(f.ceil())),
            Number::Complex(_) => Err(complex_unordered("ceiling")),
            n => Ok(n),
        }
    }

    pub fn truncate(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Rational(r) => Ok(Number::from_bigint(r.trunc().to_integer())),
            Number::Real(f) => Ok(Number::Real(f.trunc())),
            Number::Complex(_) => Err(complex_unordered("truncate")),
            n => Ok(n),
        }
    }

    /// Round to nearest, ties to even
    pub fn round(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Rational(r) => Ok(Number::from_bigint(round_half_even(&r))),
            Number::Real(f) => Ok(Number::Real(f.round_ties_even())),
            Number::Complex(_) => Err(complex_unordered("round")),
            n => Ok(n),
        }
    }

    /// Exact when the root is exactly representable, real otherwise, complex for negative reals
    pub fn sqrt(self) -> Number {
        match self {
            Number::Fixnum(n) if n >= 0 => {
                let root = Roots::sqrt(&n);
                if root * root == n {
                    Number::Fixnum(root)
                } else {
                    Number::Real((n as f64).sqrt())
                }
            }
            Number::Bignum(ref n) if !n.is_negative() => match exact_sqrt(n) {
                Some(root) => Number::from_bigint(root),
                None => Number::Real(self.to_f64().sqrt()),
            },
            Number::Rational(ref r) if !r.is_negative() => {
                match (exact_sqrt(r.numer()), exact_sqrt(r.denom())) {
                    (Some(n), Some(d)) => Number::from_ratio(Ratio::new(n, d)),
                    _ => Number::Real(rat2flo(r).sqrt()),
                }
            }
            Number::Complex(c) => Number::Complex(c.sqrt()),
            n => {
                let f = n.to_f64();
                if f < 0.0 {
                    Number::complex(0.0, (-f).sqrt())
                } else {
                    Number::Real(f.sqrt())
                }
            }
        }
    }

    /// Exponentiation through floating point, whatever the exactness of the operands
    pub fn expt(self, other: Number) -> Number {
        match (self, other) {
            (Number::Complex(b), e) => Number::Complex(b.powc(to_complex(e))),
            (b, Number::Complex(e)) => Number::Complex(to_complex(b).powc(e)),
            (b, e) => Number::Real(b.to_f64().powf(e.to_f64())),
        }
    }

    pub fn to_inexact(self) -> Number {
        match self {
            c @ Number::Complex(_) => c,
            n => Number::Real(n.to_f64()),
        }
    }

    pub fn to_exact(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Real(f) => BigRational::from_float(f)
                .map(Number::from_ratio)
                .ok_or_else(|| RuntimeError::domain(format!("inexact->exact: {} has no exact representation", Number::Real(f)))),
            Number::Complex(c) if c.im == 0.0 => Number::Real(c.re).to_exact(),
            c @ Number::Complex(_) => Err(RuntimeError::domain(format!("inexact->exact: {} has no exact representation", c))),
            n => Ok(n),
        }
    }

    pub fn numerator(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Rational(r) => Ok(Number::from_bigint(r.numer().clone())),
            Number::Real(_) => Ok(self.to_exact()?.numerator()?.to_inexact()),
            Number::Complex(_) => Err(RuntimeError::invalid_type("numerator: rational expected")),
            n => Ok(n),
        }
    }

    pub fn denominator(self) -> Result<Number, RuntimeError> {
        match self {
            Number::Rational(r) => Ok(Number::from_bigint(r.denom().clone())),
            Number::Real(_) => Ok(self.to_exact()?.denominator()?.to_inexact()),
            Number::Complex(_) => Err(RuntimeError::invalid_type("denominator: rational expected")),
            _ => Ok(Number::Fixnum(1)),
        }
    }
}

fn to_complex(n: Number) -> Complex64 {
    match n {
        Number::Complex(c) => c,
        n => Complex64::new(n.to_f64(), 0.0),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::number::Level;

    fn rat(n: i64, d: i64) -> Number {
        Number::rational(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn test_fixnum_overflow() {
        let sum = Number::Fixnum(i64::MAX) + Number::Fixnum(i64::MAX);
        assert_eq!(sum, Number::Bignum(BigInt::from(i64::MAX) * 2));

        let product = Number::Fixnum(i64::MIN) * Number::Fixnum(-1);
        assert_eq!(product.level(), Level::Bignum);

        let back = sum - Number::Fixnum(i64::MAX);
        assert_eq!(back, Number::Fixnum(i64::MAX));
        assert_eq!(-Number::Fixnum(i64::MIN), Number::Bignum(-BigInt::from(i64::MIN)));
    }

    #[test]
    fn test_contagion() {
        assert_eq!(Number::Fixnum(1) + Number::Real(0.5), Number::Real(1.5));
        assert_eq!(rat(1, 2) + rat(1, 2), Number::Fixnum(1));
        assert_eq!(rat(1, 3) * Number::Fixnum(3), Number::Fixnum(1));
        assert_eq!(Number::Fixnum(2) * Number::complex(1.0, 1.0), Number::complex(2.0, 2.0));
    }

    #[test]
    fn test_div() {
        assert_eq!(Number::Fixnum(6).div(Number::Fixnum(4)).unwrap(), rat(3, 2));
        assert_eq!(Number::Fixnum(6).div(Number::Fixnum(3)).unwrap(), Number::Fixnum(2));
        assert_eq!(Number::Real(1.0).div(Number::Fixnum(4)).unwrap(), Number::Real(0.25));

        for zero in vec![Number::Fixnum(0), Number::Real(0.0), Number::complex(0.0, 0.0)] {
            let err = Number::Fixnum(1).div(zero).unwrap_err();
            assert_eq!(err.kind, RuntimeErrorKind::DivideByZero);
        }
    }

    #[test]
    fn test_quotient_remainder() {
        assert_eq!(Number::Fixnum(-7).quotient(Number::Fixnum(2)).unwrap(), Number::Fixnum(-3));
        assert_eq!(Number::Fixnum(-7).remainder(Number::Fixnum(2)).unwrap(), Number::Fixnum(-1));
        assert_eq!(Number::Fixnum(i64::MIN).quotient(Number::Fixnum(-1)).unwrap().level(), Level::Bignum);
        assert_eq!(rat(1, 2).quotient(Number::Fixnum(1)).unwrap_err().kind, RuntimeErrorKind::InvalidType);
        assert_eq!(Number::Real(4.0).remainder(Number::Fixnum(2)).unwrap_err().kind, RuntimeErrorKind::InvalidType);
        assert_eq!(Number::Fixnum(4).remainder(Number::Fixnum(0)).unwrap_err().kind, RuntimeErrorKind::DivideByZero);
    }

    #[test]
    fn test_compare() {
        assert!(Number::Fixnum(1).num_eq(Number::Real(1.0)));
        assert!(rat(1, 2).num_eq(Number::Real(0.5)));
        assert!(rat(1, 3).lt(rat(1, 2)).unwrap());
        assert!(Number::Fixnum(2).ge(Number::Fixnum(2)).unwrap());
        assert!(!Number::Real(f64::NAN).le(Number::Real(1.0)).unwrap());
        assert!(Number::complex(1.0, 1.0).lt(Number::Fixnum(1)).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(rat(5, 2).round().unwrap(), Number::Fixnum(2));
        assert_eq!(rat(7, 2).round().unwrap(), Number::Fixnum(4));
        assert_eq!(rat(-5, 2).round().unwrap(), Number::Fixnum(-2));
        assert_eq!(rat(7, 3).round().unwrap(), Number::Fixnum(2));
        assert_eq!(Number::Real(2.5).round().unwrap(), Number::Real(2.0));
        assert_eq!(Number::Real(-3.5).round().unwrap(), Number::Real(-4.0));
        assert_eq!(rat(-7, 2).floor().unwrap(), Number::Fixnum(-4));
        assert_eq!(rat(-7, 2).ceiling().unwrap(), Number::Fixnum(-3));
        assert_eq!(rat(-7, 2).truncate().unwrap(), Number::Fixnum(-3));
        assert_eq!(Number::Fixnum(5).floor().unwrap(), Number::Fixnum(5));
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(Number::Fixnum(16).sqrt(), Number::Fixnum(4));
        assert_eq!(Number::Fixnum(2).sqrt(), Number::Real(2f64.sqrt()));
        assert_eq!(rat(9, 4).sqrt(), rat(3, 2));
        assert_eq!(Number::Fixnum(-4).sqrt(), Number::complex(0.0, 2.0));
        let square = Number::Bignum(BigInt::from(10).pow(40u32));
        assert_eq!(square.sqrt(), Number::Bignum(BigInt::from(10).pow(20u32)));
    }

    #[test]
    fn test_expt_is_inexact() {
        assert_eq!(Number::Fixnum(2).expt(Number::Fixnum(10)), Number::Real(1024.0));
        assert_eq!(rat(1, 4).expt(rat(1, 2)), Number::Real(0.5));
    }

    #[test]
    fn test_exactness() {
        assert_eq!(Number::Real(0.5).to_exact().unwrap(), rat(1, 2));
        assert_eq!(Number::Real(3.0).to_exact().unwrap(), Number::Fixnum(3));
        assert!(Number::Real(f64::NAN).to_exact().is_err());
        assert_eq!(rat(1, 4).to_inexact(), Number::Real(0.25));
        assert_eq!(rat(6, 4).numerator().unwrap(), Number::Fixnum(3));
        assert_eq!(rat(6, 4).denominator().unwrap(), Number::Fixnum(2));
        assert_eq!(Number::Real(0.5).denominator().unwrap(), Number::Real(2.0));
    }
}
