#![crate_name = "schemer"]

//! schemer is a small embeddable Scheme interpreter with a leveled numeric tower,
//! proper tail calls and runtime `defmacro` expansion

#[cfg(test)]
macro_rules! list {
    ($($x:expr),*) => (
        vec![$($x),*].into_iter().collect::<$crate::datum::Datum>()
    )
}

#[cfg(test)]
macro_rules! sym {
    ($e:expr) => (
        $crate::datum::Datum::sym($e)
    )
}

#[cfg(test)]
macro_rules! num {
    ($e:expr) => (
        $crate::datum::Datum::Num($crate::number::Number::Fixnum($e))
    )
}

/// Error values returned from parser, compiler or runtime
pub mod error;
/// Interned symbols
pub mod symbol;
/// Numerical tower
pub mod number;
/// Arithmetic over the numerical tower
pub mod numeric;
/// Basic datum types
pub mod datum;
/// Conversions between datum and native types
pub mod cast;
pub mod eqv;
/// Lexical environments
pub mod environment;
pub mod lexer;
pub mod parser;
/// Compiles datum into a bytecode
pub mod compiler;
/// Virtual machine running the bytecode
pub mod runtime;
/// Primitive functions
pub mod primitive;
/// Base library
pub mod base;

pub use crate::datum::Datum;
pub use crate::environment::{Env, Environment};
pub use crate::error::{EvalError, ParserError, RuntimeError, RuntimeErrorKind};
pub use crate::number::Number;
pub use crate::parser::Parser;
pub use crate::runtime::{Runtime, RuntimeOptions};
pub use crate::symbol::Symbol;
