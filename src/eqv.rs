use gc::Gc;

use crate::datum::Datum;

/// Identity comparison behind `eq?`
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

impl Identical for Datum {
    fn identical(&self, other: &Datum) -> bool {
        match (self, other) {
            (&Datum::Nil, &Datum::Nil) => true,
            (&Datum::Unspecified, &Datum::Unspecified) => true,
            (&Datum::Eof, &Datum::Eof) => true,
            (&Datum::Bool(l), &Datum::Bool(r)) => l == r,
            (&Datum::Char(l), &Datum::Char(r)) => l == r,
            (&Datum::Sym(ref l), &Datum::Sym(ref r)) => l == r,
            // Numbers are immediate values; equal numbers at the same level are the same object.
            (&Datum::Num(ref l), &Datum::Num(ref r)) => l == r,
            (&Datum::String(ref l), &Datum::String(ref r)) => Gc::ptr_eq(l, r),
            (&Datum::Vector(ref l), &Datum::Vector(ref r)) => Gc::ptr_eq(l, r),
            (&Datum::Cons(ref l), &Datum::Cons(ref r)) => Gc::ptr_eq(l, r),
            (&Datum::Proc(ref l), &Datum::Proc(ref r)) => l.ptr_eq(r),
            (&Datum::Macro(ref l), &Datum::Macro(ref r)) => Gc::ptr_eq(l, r),
            _ => false,
        }
    }
}
