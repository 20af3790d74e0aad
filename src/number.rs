use std::cmp::max;
use std::fmt;

use num::bigint::BigInt;
use num::complex::Complex64;
use num::rational::{BigRational, Ratio};
use num::traits::{One, Signed, ToPrimitive, Zero};

use crate::error::RuntimeError;

/// Rank of a representation in the numerical tower
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Fixnum = 1,
    Bignum = 2,
    Rational = 3,
    Real = 4,
    Complex = 5,
}

/// Numerical tower
///
/// Exact values are always kept in canonical form: a `Bignum` never fits in `i64`, and a
/// `Rational` is reduced with a positive denominator other than one. The constructors below
/// are the only places that build exact variants from raw parts.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Fixnum(i64),
    Bignum(BigInt),
    Rational(BigRational),
    Real(f64),
    Complex(Complex64),
}

#[inline]
pub fn fix2big(n: i64) -> BigInt {
    BigInt::from(n)
}

#[inline]
pub fn big2rat(n: BigInt) -> BigRational {
    Ratio::from_integer(n)
}

#[inline]
pub fn big2flo(n: &BigInt) -> f64 {
    n.to_f64().unwrap_or(f64::NAN)
}

#[inline]
pub fn rat2flo(r: &BigRational) -> f64 {
    r.to_f64().unwrap_or(f64::NAN)
}

impl Number {
    /// Canonical integer: `Fixnum` when the value fits, `Bignum` otherwise
    pub fn from_bigint(n: BigInt) -> Number {
        match n.to_i64() {
            Some(i) => Number::Fixnum(i),
            None => Number::Bignum(n),
        }
    }

    /// Canonical integer from a wide intermediate, used by overflow-checked fixnum arithmetic
    pub fn from_i128(n: i128) -> Number {
        if n >= i64::MIN as i128 && n <= i64::MAX as i128 {
            Number::Fixnum(n as i64)
        } else {
            Number::Bignum(BigInt::from(n))
        }
    }

    /// Canonical form of an already reduced ratio
    pub fn from_ratio(r: BigRational) -> Number {
        if r.denom().is_one() {
            Number::from_bigint(r.numer().clone())
        } else {
            Number::Rational(r)
        }
    }

    /// Builds `numer/denom`, reducing by the gcd and moving the sign into the numerator.
    /// Collapses to an integer when the denominator reduces to one.
    pub fn rational(numer: BigInt, denom: BigInt) -> Result<Number, RuntimeError> {
        if denom.is_zero() {
            return Err(RuntimeError::domain(format!("rational {}/0 has a zero denominator", numer)));
        }
        Ok(Number::from_ratio(Ratio::new(numer, denom)))
    }

    pub fn complex(re: f64, im: f64) -> Number {
        Number::Complex(Complex64::new(re, im))
    }

    pub fn level(&self) -> Level {
        match *self {
            Number::Fixnum(_) => Level::Fixnum,
            Number::Bignum(_) => Level::Bignum,
            Number::Rational(_) => Level::Rational,
            Number::Real(_) => Level::Real,
            Number::Complex(_) => Level::Complex,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.level() <= Level::Rational
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Number::Fixnum(n) => n == 0,
            Number::Bignum(ref n) => n.is_zero(),
            Number::Rational(ref r) => r.is_zero(),
            Number::Real(f) => f == 0.0,
            Number::Complex(c) => c.re == 0.0 && c.im == 0.0,
        }
    }

    /// True for exact integers and for finite reals without a fractional part
    pub fn is_integer(&self) -> bool {
        match *self {
            Number::Fixnum(_) | Number::Bignum(_) => true,
            Number::Rational(_) => false,
            Number::Real(f) => f.is_finite() && f.fract() == 0.0,
            Number::Complex(c) => c.im == 0.0 && c.re.is_finite() && c.re.fract() == 0.0,
        }
    }

    pub fn is_real(&self) -> bool {
        self.level() <= Level::Real
    }

    pub fn is_rational(&self) -> bool {
        match *self {
            Number::Real(f) => f.is_finite(),
            Number::Complex(_) => false,
            _ => true,
        }
    }

    pub fn is_negative(&self) -> bool {
        match *self {
            Number::Fixnum(n) => n < 0,
            Number::Bignum(ref n) => n.is_negative(),
            Number::Rational(ref r) => r.is_negative(),
            Number::Real(f) => f < 0.0,
            Number::Complex(_) => false,
        }
    }

    /// Lifts the number exactly one level. Complex numbers are already at the top.
    pub fn promote(self) -> Number {
        match self {
            Number::Fixnum(n) => Number::Bignum(fix2big(n)),
            Number::Bignum(n) => Number::Rational(big2rat(n)),
            Number::Rational(r) => Number::Real(rat2flo(&r)),
            Number::Real(f) => Number::complex(f, 0.0),
            c @ Number::Complex(_) => c,
        }
    }

    /// Lifts the number to `level`, which must not be lower than its own.
    /// Intermediate results may be non-canonical and only live until the operation is dispatched.
    pub fn promote_to(self, level: Level) -> Number {
        let mut n = self;
        while n.level() < level {
            n = n.promote();
        }
        n
    }

    pub fn to_f64(&self) -> f64 {
        match *self {
            Number::Fixnum(n) => n as f64,
            Number::Bignum(ref n) => big2flo(n),
            Number::Rational(ref r) => rat2flo(r),
            Number::Real(f) => f,
            Number::Complex(c) => c.re,
        }
    }

    /// Exact integer value, when the number is one
    pub fn to_bigint(&self) -> Option<BigInt> {
        match *self {
            Number::Fixnum(n) => Some(fix2big(n)),
            Number::Bignum(ref n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Formats the number in `radix`. Only integers may use a radix other than ten.
    pub fn to_string_radix(&self, radix: u32) -> Result<String, RuntimeError> {
        if !(2..=36).contains(&radix) {
            return Err(RuntimeError::domain(format!("unsupported base {}", radix)));
        }
        match *self {
            Number::Fixnum(n) => Ok(fix2big(n).to_str_radix(radix)),
            Number::Bignum(ref n) => Ok(n.to_str_radix(radix)),
            _ if radix != 10 => Err(RuntimeError::domain(format!(
                "unsupported base {}: only integers may be converted in a base other than 10", radix))),
            _ => Ok(self.to_string()),
        }
    }
}

/// Operands lifted to their common level
pub enum Coerced {
    Fixnum(i64, i64),
    Bignum(BigInt, BigInt),
    Rational(BigRational, BigRational),
    Real(f64, f64),
    Complex(Complex64, Complex64),
}

/// Promotes the lower operand until both share a level
pub fn coerce(lhs: Number, rhs: Number) -> Coerced {
    let level = max(lhs.level(), rhs.level());
    match (lhs.promote_to(level), rhs.promote_to(level)) {
        (Number::Fixnum(l), Number::Fixnum(r)) => Coerced::Fixnum(l, r),
        (Number::Bignum(l), Number::Bignum(r)) => Coerced::Bignum(l, r),
        (Number::Rational(l), Number::Rational(r)) => Coerced::Rational(l, r),
        (Number::Real(l), Number::Real(r)) => Coerced::Real(l, r),
        (Number::Complex(l), Number::Complex(r)) => Coerced::Complex(l, r),
        (l, r) => unreachable!("promotion to {:?} left operands at {:?} and {:?}",
                               level, l.level(), r.level()),
    }
}

pub fn format_flonum(f: f64) -> String {
    if f.is_nan() {
        "+nan.0".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "+inf.0".to_string() } else { "-inf.0".to_string() }
    } else {
        format!("{:?}", f)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Number::Fixnum(n) => write!(f, "{}", n),
            Number::Bignum(ref n) => write!(f, "{}", n),
            Number::Rational(ref r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Number::Real(x) => f.write_str(&format_flonum(x)),
            Number::Complex(c) => {
                let im = format_flonum(c.im);
                let sign = if im.starts_with('+') || im.starts_with('-') { "" } else { "+" };
                write!(f, "{}{}{}i", format_flonum(c.re), sign, im)
            }
        }
    }
}
