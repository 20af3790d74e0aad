use gc::{Gc, GcCell};

use crate::datum::{Datum, DatumType, Pair};
use crate::error::RuntimeError;
use crate::number::Number;
use crate::runtime::Procedure;
use crate::symbol::Symbol;

/// Types with implementing DatumCast trait can cast from/to Datum
pub trait DatumCast: Sized {
    /// Casts Datum into Self, possibly raising error
    fn unwrap(datum: Datum) -> Result<Self, RuntimeError>;
    /// Casts Self into Datum
    fn wrap(self) -> Datum;
}

fn type_error(expected: &str, datum: &Datum) -> RuntimeError {
    RuntimeError::invalid_type(format!("expected {}, but received {:?}", expected, DatumType::get_type(datum)))
}

impl DatumCast for Datum {
    fn unwrap(datum: Datum) -> Result<Datum, RuntimeError> {
        Ok(datum)
    }

    fn wrap(self) -> Datum {
        self
    }
}

impl DatumCast for Number {
    fn unwrap(datum: Datum) -> Result<Number, RuntimeError> {
        match datum {
            Datum::Num(ref n) => Ok(n.clone()),
            _ => Err(type_error("Num", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Num(self)
    }
}

impl DatumCast for bool {
    fn unwrap(datum: Datum) -> Result<bool, RuntimeError> {
        match datum {
            Datum::Bool(b) => Ok(b),
            _ => Err(type_error("Bool", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Bool(self)
    }
}

impl DatumCast for char {
    fn unwrap(datum: Datum) -> Result<char, RuntimeError> {
        match datum {
            Datum::Char(c) => Ok(c),
            _ => Err(type_error("Char", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Char(self)
    }
}

impl DatumCast for Symbol {
    fn unwrap(datum: Datum) -> Result<Symbol, RuntimeError> {
        match datum {
            Datum::Sym(ref s) => Ok(s.clone()),
            _ => Err(type_error("Sym", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Sym(self)
    }
}

/// Non-negative exact integer, used for lengths and indices
impl DatumCast for usize {
    fn unwrap(datum: Datum) -> Result<usize, RuntimeError> {
        match datum {
            Datum::Num(Number::Fixnum(n)) if n >= 0 => Ok(n as usize),
            Datum::Num(Number::Fixnum(_)) | Datum::Num(Number::Bignum(_)) =>
                Err(RuntimeError::domain(format!("index {:?} out of range", datum))),
            _ => Err(type_error("non-negative exact integer", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Num(Number::from_i128(self as i128))
    }
}

impl DatumCast for Gc<GcCell<Pair>> {
    fn unwrap(datum: Datum) -> Result<Gc<GcCell<Pair>>, RuntimeError> {
        match datum {
            Datum::Cons(ref p) => Ok(p.clone()),
            _ => Err(type_error("Pair", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Cons(self)
    }
}

impl DatumCast for Gc<GcCell<String>> {
    fn unwrap(datum: Datum) -> Result<Gc<GcCell<String>>, RuntimeError> {
        match datum {
            Datum::String(ref s) => Ok(s.clone()),
            _ => Err(type_error("String", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::String(self)
    }
}

impl DatumCast for Gc<GcCell<Vec<Datum>>> {
    fn unwrap(datum: Datum) -> Result<Gc<GcCell<Vec<Datum>>>, RuntimeError> {
        match datum {
            Datum::Vector(ref v) => Ok(v.clone()),
            _ => Err(type_error("Vector", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Vector(self)
    }
}

impl DatumCast for Procedure {
    fn unwrap(datum: Datum) -> Result<Procedure, RuntimeError> {
        match datum {
            Datum::Proc(ref p) => Ok(p.clone()),
            _ => Err(type_error("Procedure", &datum)),
        }
    }

    fn wrap(self) -> Datum {
        Datum::Proc(self)
    }
}
