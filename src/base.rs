use log::info;

use crate::environment::Env;
use crate::error::EvalError;
use crate::parser::Parser;
use crate::primitive::{primitive, PRIMITIVES};
use crate::runtime::Runtime;
use crate::symbol::Symbol;

/// Library procedures and macros written in Scheme on top of the primitives
static PRELUDE: &str = include_str!("base.scm");

/// Binds every primitive in `env`
pub fn libbase(env: &Env) {
    for native in PRIMITIVES {
        env.define(Symbol::intern(native.name), primitive(native));
    }
}

/// Evaluates the base library form by form, stopping at the first failure
pub fn load_prelude(runtime: &mut Runtime) -> Result<(), EvalError> {
    let mut parser = Parser::new(PRELUDE);
    let mut count = 0;
    while let Some(datum) = parser.parse_next()? {
        runtime.eval(&datum)?;
        count += 1;
    }
    info!("base library loaded: {} forms", count);
    Ok(())
}
