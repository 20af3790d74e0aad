use std::io::{self, Write};

use gc::{Gc, GcCell};

use crate::cast::DatumCast;
use crate::datum::{Datum, Pair};
use crate::eqv::Identical;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::number::Number;
use crate::parser::{parse_number, NumberError};
use crate::runtime::{Arity, NativeFunc, NativeProc, Procedure};
use crate::symbol::Symbol;

/// Casts the i-th argument. Arity is checked before any primitive runs.
fn arg<T: DatumCast>(args: &[Datum], i: usize) -> Result<T, RuntimeError> {
    DatumCast::unwrap(args[i].clone())
}

fn opt_arg<T: DatumCast>(args: &[Datum], i: usize) -> Result<Option<T>, RuntimeError> {
    match args.get(i) {
        Some(datum) => DatumCast::unwrap(datum.clone()).map(Some),
        None => Ok(None),
    }
}

fn numbers(args: &[Datum]) -> Result<Vec<Number>, RuntimeError> {
    args.iter().map(|datum| Number::unwrap(datum.clone())).collect()
}

fn out_of_range(index: usize, len: usize) -> RuntimeError {
    RuntimeError::domain(format!("index {} out of range for length {}", index, len))
}

fn too_large(name: &str, k: usize) -> RuntimeError {
    RuntimeError::domain(format!("{}: cannot allocate {} elements", name, k))
}

/// `(+ n0 n1 ...)`
fn add(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let mut sum = Number::Fixnum(0);
    for n in numbers(args)? {
        sum = sum + n;
    }
    Ok(sum.wrap())
}

/// `(* n0 n1 ...)`
fn mul(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let mut product = Number::Fixnum(1);
    for n in numbers(args)? {
        product = product * n;
    }
    Ok(product.wrap())
}

/// `(- n0 n1 ...)`
fn sub(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let mut it = numbers(args)?.into_iter();
    let first = it.next().unwrap_or(Number::Fixnum(0));
    if args.len() == 1 {
        return Ok((-first).wrap());
    }
    let mut diff = first;
    for n in it {
        diff = diff - n;
    }
    Ok(diff.wrap())
}

/// `(/ n0 n1 ...)`
fn div(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let mut it = numbers(args)?.into_iter();
    let first = it.next().unwrap_or(Number::Fixnum(1));
    if args.len() == 1 {
        return Ok(Number::Fixnum(1).div(first)?.wrap());
    }
    let mut quotient = first;
    for n in it {
        quotient = quotient.div(n)?;
    }
    Ok(quotient.wrap())
}

fn compare_chain(args: &[Datum], cmp: fn(Number, Number) -> Result<bool, RuntimeError>)
        -> Result<Datum, RuntimeError>
{
    let nums = numbers(args)?;
    for pair in nums.windows(2) {
        if !cmp(pair[0].clone(), pair[1].clone())? {
            return Ok(Datum::Bool(false));
        }
    }
    Ok(Datum::Bool(true))
}

fn num_eq(args: &[Datum]) -> Result<Datum, RuntimeError> {
    compare_chain(args, |l, r| Ok(l.num_eq(r)))
}

fn num_lt(args: &[Datum]) -> Result<Datum, RuntimeError> {
    compare_chain(args, Number::lt)
}

fn num_gt(args: &[Datum]) -> Result<Datum, RuntimeError> {
    compare_chain(args, Number::gt)
}

fn num_le(args: &[Datum]) -> Result<Datum, RuntimeError> {
    compare_chain(args, Number::le)
}

fn num_ge(args: &[Datum]) -> Result<Datum, RuntimeError> {
    compare_chain(args, Number::ge)
}

fn quotient(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let (n, d): (Number, Number) = (arg(args, 0)?, arg(args, 1)?);
    Ok(n.quotient(d)?.wrap())
}

fn remainder(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let (n, d): (Number, Number) = (arg(args, 0)?, arg(args, 1)?);
    Ok(n.remainder(d)?.wrap())
}

macro_rules! unary {
    ($name:ident, $method:ident) => (
        fn $name(args: &[Datum]) -> Result<Datum, RuntimeError> {
            let n: Number = arg(args, 0)?;
            Ok(n.$method()?.wrap())
        }
    )
}

unary!(floor, floor);
unary!(ceiling, ceiling);
unary!(truncate, truncate);
unary!(round, round);
unary!(to_exact, to_exact);
unary!(numerator, numerator);
unary!(denominator, denominator);

fn sqrt(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: Number = arg(args, 0)?;
    Ok(n.sqrt().wrap())
}

/// Always computed in floating point, even for exact operands
fn expt(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let (base, power): (Number, Number) = (arg(args, 0)?, arg(args, 1)?);
    Ok(base.expt(power).wrap())
}

fn to_inexact(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: Number = arg(args, 0)?;
    Ok(n.to_inexact().wrap())
}

fn is_number(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Num(_))))
}

fn is_real(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(match args[0] {
        Datum::Num(ref n) => n.is_real(),
        _ => false,
    }))
}

fn is_rational(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(match args[0] {
        Datum::Num(ref n) => n.is_rational(),
        _ => false,
    }))
}

fn is_integer(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(match args[0] {
        Datum::Num(ref n) => n.is_integer(),
        _ => false,
    }))
}

fn is_exact(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: Number = arg(args, 0)?;
    Ok(Datum::Bool(n.is_exact()))
}

fn is_inexact(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: Number = arg(args, 0)?;
    Ok(Datum::Bool(!n.is_exact()))
}

fn is_nan(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: Number = arg(args, 0)?;
    Ok(Datum::Bool(match n {
        Number::Real(f) => f.is_nan(),
        Number::Complex(c) => c.re.is_nan() || c.im.is_nan(),
        _ => false,
    }))
}

fn radix(args: &[Datum], i: usize) -> Result<u32, RuntimeError> {
    match opt_arg::<usize>(args, i)? {
        None => Ok(10),
        Some(r @ (2 | 8 | 10 | 16)) => Ok(r as u32),
        Some(r) => Err(RuntimeError::domain(format!("unsupported base {}", r))),
    }
}

/// `(number->string z [radix])`
fn number_to_string(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: Number = arg(args, 0)?;
    let s = n.to_string_radix(radix(args, 1)?)?;
    Ok(Datum::string(&s))
}

/// `(string->number s [radix])`, `#f` when `s` is not a number
fn string_to_number(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let s: Gc<GcCell<String>> = arg(args, 0)?;
    let radix = radix(args, 1)?;
    let s = s.borrow();
    match parse_number(&s, radix) {
        Ok(n) => Ok(Datum::Num(n)),
        Err(NumberError::Invalid) => Ok(Datum::Bool(false)),
        Err(NumberError::UnsupportedBase) =>
            Err(RuntimeError::domain(format!("unsupported base {} for {:?}", radix, *s))),
    }
}

fn cons(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::cons(args[0].clone(), args[1].clone()))
}

fn car(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let p: Gc<GcCell<Pair>> = arg(args, 0)?;
    let car = p.borrow().car.clone();
    Ok(car)
}

fn cdr(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let p: Gc<GcCell<Pair>> = arg(args, 0)?;
    let cdr = p.borrow().cdr.clone();
    Ok(cdr)
}

fn set_car(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let p: Gc<GcCell<Pair>> = arg(args, 0)?;
    p.borrow_mut().car = args[1].clone();
    Ok(Datum::Unspecified)
}

fn set_cdr(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let p: Gc<GcCell<Pair>> = arg(args, 0)?;
    p.borrow_mut().cdr = args[1].clone();
    Ok(Datum::Unspecified)
}

fn is_pair(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Cons(_))))
}

fn is_null(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Nil)))
}

fn is_eq(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(args[0].identical(&args[1])))
}

fn is_boolean(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Bool(_))))
}

fn is_symbol(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Sym(_))))
}

fn is_string(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::String(_))))
}

fn is_char(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Char(_))))
}

fn is_vector(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Vector(_))))
}

fn is_procedure(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Proc(_))))
}

fn is_macro(args: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Bool(matches!(args[0], Datum::Macro(_))))
}

fn symbol_to_string(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let sym: Symbol = arg(args, 0)?;
    Ok(Datum::string(sym.as_str()))
}

fn string_to_symbol(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let s: Gc<GcCell<String>> = arg(args, 0)?;
    let sym = Symbol::intern(&s.borrow());
    Ok(Datum::Sym(sym))
}

fn gensym(_: &[Datum]) -> Result<Datum, RuntimeError> {
    Ok(Datum::Sym(Symbol::gensym()))
}

fn char_to_integer(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let c: char = arg(args, 0)?;
    Ok(Datum::Num(Number::Fixnum(c as i64)))
}

fn integer_to_char(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let n: usize = arg(args, 0)?;
    u32::try_from(n).ok()
        .and_then(char::from_u32)
        .map(Datum::Char)
        .ok_or_else(|| RuntimeError::domain(format!("{} is not a unicode scalar value", n)))
}

/// `(make-string k [char])`
fn make_string(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let k: usize = arg(args, 0)?;
    let fill = opt_arg::<char>(args, 1)?.unwrap_or(' ');
    let mut s = String::new();
    k.checked_mul(fill.len_utf8())
        .and_then(|bytes| s.try_reserve_exact(bytes).ok())
        .ok_or_else(|| too_large("make-string", k))?;
    s.extend(std::iter::repeat(fill).take(k));
    Ok(Datum::string(&s))
}

fn string_length(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let s: Gc<GcCell<String>> = arg(args, 0)?;
    let len = s.borrow().chars().count();
    Ok(len.wrap())
}

fn string_ref(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let s: Gc<GcCell<String>> = arg(args, 0)?;
    let k: usize = arg(args, 1)?;
    let s = s.borrow();
    s.chars().nth(k).map(Datum::Char).ok_or_else(|| out_of_range(k, s.chars().count()))
}

fn string_set(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let s: Gc<GcCell<String>> = arg(args, 0)?;
    let k: usize = arg(args, 1)?;
    let c: char = arg(args, 2)?;
    let mut chars: Vec<char> = s.borrow().chars().collect();
    if k >= chars.len() {
        return Err(out_of_range(k, chars.len()));
    }
    chars[k] = c;
    *s.borrow_mut() = chars.into_iter().collect();
    Ok(Datum::Unspecified)
}

/// `(make-vector k [fill])`
fn make_vector(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let k: usize = arg(args, 0)?;
    let fill = args.get(1).cloned().unwrap_or(Datum::Bool(false));
    let mut items = Vec::new();
    items.try_reserve_exact(k).map_err(|_| too_large("make-vector", k))?;
    items.resize(k, fill);
    Ok(Datum::vector(items))
}

fn vector_length(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let v: Gc<GcCell<Vec<Datum>>> = arg(args, 0)?;
    let len = v.borrow().len();
    Ok(len.wrap())
}

fn vector_ref(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let v: Gc<GcCell<Vec<Datum>>> = arg(args, 0)?;
    let k: usize = arg(args, 1)?;
    let v = v.borrow();
    v.get(k).cloned().ok_or_else(|| out_of_range(k, v.len()))
}

fn vector_set(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let v: Gc<GcCell<Vec<Datum>>> = arg(args, 0)?;
    let k: usize = arg(args, 1)?;
    let mut v = v.borrow_mut();
    let len = v.len();
    match v.get_mut(k) {
        Some(slot) => *slot = args[2].clone(),
        None => return Err(out_of_range(k, len)),
    }
    Ok(Datum::Unspecified)
}

/// `(error message irritant ...)`
fn error(args: &[Datum]) -> Result<Datum, RuntimeError> {
    let mut desc = format!("{}", args[0]);
    for irritant in &args[1..] {
        desc.push_str(&format!(" {:?}", irritant));
    }
    Err(RuntimeError::new(RuntimeErrorKind::UserError, desc))
}

fn emit(text: String) -> Result<Datum, RuntimeError> {
    let mut stdout = io::stdout();
    stdout.write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| RuntimeError::internal(format!("failed to write to stdout: {}", e)))?;
    Ok(Datum::Unspecified)
}

fn display(args: &[Datum]) -> Result<Datum, RuntimeError> {
    emit(format!("{}", args[0]))
}

fn write(args: &[Datum]) -> Result<Datum, RuntimeError> {
    emit(format!("{:?}", args[0]))
}

const fn simple(name: &'static str, arity: Arity, f: fn(&[Datum]) -> Result<Datum, RuntimeError>) -> NativeProc {
    NativeProc { name: name, arity: arity, func: NativeFunc::Simple(f) }
}

/// Every native procedure installed in the global environment
pub static PRIMITIVES: &[NativeProc] = &[
    simple("+", Arity::AtLeast(0), add),
    simple("-", Arity::AtLeast(1), sub),
    simple("*", Arity::AtLeast(0), mul),
    simple("/", Arity::AtLeast(1), div),
    simple("=", Arity::AtLeast(1), num_eq),
    simple("<", Arity::AtLeast(1), num_lt),
    simple(">", Arity::AtLeast(1), num_gt),
    simple("<=", Arity::AtLeast(1), num_le),
    simple(">=", Arity::AtLeast(1), num_ge),
    simple("quotient", Arity::Exact(2), quotient),
    simple("remainder", Arity::Exact(2), remainder),
    simple("floor", Arity::Exact(1), floor),
    simple("ceiling", Arity::Exact(1), ceiling),
    simple("truncate", Arity::Exact(1), truncate),
    simple("round", Arity::Exact(1), round),
    simple("sqrt", Arity::Exact(1), sqrt),
    simple("expt", Arity::Exact(2), expt),
    simple("exact->inexact", Arity::Exact(1), to_inexact),
    simple("inexact->exact", Arity::Exact(1), to_exact),
    simple("inexact", Arity::Exact(1), to_inexact),
    simple("exact", Arity::Exact(1), to_exact),
    simple("numerator", Arity::Exact(1), numerator),
    simple("denominator", Arity::Exact(1), denominator),
    simple("number?", Arity::Exact(1), is_number),
    simple("complex?", Arity::Exact(1), is_number),
    simple("real?", Arity::Exact(1), is_real),
    simple("rational?", Arity::Exact(1), is_rational),
    simple("integer?", Arity::Exact(1), is_integer),
    simple("exact?", Arity::Exact(1), is_exact),
    simple("inexact?", Arity::Exact(1), is_inexact),
    simple("nan?", Arity::Exact(1), is_nan),
    simple("number->string", Arity::Range(1, 2), number_to_string),
    simple("string->number", Arity::Range(1, 2), string_to_number),
    simple("cons", Arity::Exact(2), cons),
    simple("car", Arity::Exact(1), car),
    simple("cdr", Arity::Exact(1), cdr),
    simple("set-car!", Arity::Exact(2), set_car),
    simple("set-cdr!", Arity::Exact(2), set_cdr),
    simple("pair?", Arity::Exact(1), is_pair),
    simple("null?", Arity::Exact(1), is_null),
    simple("eq?", Arity::Exact(2), is_eq),
    simple("boolean?", Arity::Exact(1), is_boolean),
    simple("symbol?", Arity::Exact(1), is_symbol),
    simple("string?", Arity::Exact(1), is_string),
    simple("char?", Arity::Exact(1), is_char),
    simple("vector?", Arity::Exact(1), is_vector),
    simple("procedure?", Arity::Exact(1), is_procedure),
    simple("macro?", Arity::Exact(1), is_macro),
    simple("symbol->string", Arity::Exact(1), symbol_to_string),
    simple("string->symbol", Arity::Exact(1), string_to_symbol),
    simple("gensym", Arity::Exact(0), gensym),
    simple("char->integer", Arity::Exact(1), char_to_integer),
    simple("integer->char", Arity::Exact(1), integer_to_char),
    simple("make-string", Arity::Range(1, 2), make_string),
    simple("string-length", Arity::Exact(1), string_length),
    simple("string-ref", Arity::Exact(2), string_ref),
    simple("string-set!", Arity::Exact(3), string_set),
    simple("make-vector", Arity::Range(1, 2), make_vector),
    simple("vector-length", Arity::Exact(1), vector_length),
    simple("vector-ref", Arity::Exact(2), vector_ref),
    simple("vector-set!", Arity::Exact(3), vector_set),
    simple("error", Arity::AtLeast(1), error),
    simple("display", Arity::Exact(1), display),
    simple("write", Arity::Exact(1), write),
    NativeProc { name: "apply", arity: Arity::AtLeast(2), func: NativeFunc::Apply },
    NativeProc { name: "eval", arity: Arity::Exact(1), func: NativeFunc::Eval },
    NativeProc { name: "macroexpand", arity: Arity::Exact(1), func: NativeFunc::MacroExpand },
];

/// Datum wrapping a primitive from the catalogue
pub fn primitive(native: &'static NativeProc) -> Datum {
    Datum::Proc(Procedure::Native(native))
}
