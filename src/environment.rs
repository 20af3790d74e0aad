use std::collections::HashMap;

use gc::{Finalize, Gc, GcCell, Trace};

use crate::datum::Datum;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::symbol::Symbol;

/// Shared handle to an environment frame
pub type Env = Gc<Environment>;

/// One frame of the lexical environment chain
#[derive(Trace, Finalize)]
pub struct Environment {
    vars: GcCell<HashMap<Symbol, Datum>>,
    parent: Option<Env>,
}

fn unbound(sym: &Symbol) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::UnboundVariable, format!("{} is not bound", sym))
}

impl Environment {
    /// Creates a root frame
    pub fn new_global() -> Env {
        Gc::new(Environment { vars: GcCell::new(HashMap::new()), parent: None })
    }

    /// Creates an empty frame whose lookups fall back to `parent`
    pub fn new_child(parent: &Env) -> Env {
        Gc::new(Environment { vars: GcCell::new(HashMap::new()), parent: Some(parent.clone()) })
    }

    /// Binds `sym` in this frame, replacing any previous binding here
    pub fn define(&self, sym: Symbol, value: Datum) {
        self.vars.borrow_mut().insert(sym, value);
    }

    pub fn lookup(&self, sym: &Symbol) -> Result<Datum, RuntimeError> {
        let mut env = self;
        loop {
            if let Some(value) = env.vars.borrow().get(sym) {
                return Ok(value.clone());
            }
            match env.parent {
                Some(ref parent) => env = &**parent,
                None => return Err(unbound(sym)),
            }
        }
    }

    /// Assigns the innermost existing binding of `sym`
    pub fn set(&self, sym: &Symbol, value: Datum) -> Result<(), RuntimeError> {
        let mut env = self;
        loop {
            if let Some(slot) = env.vars.borrow_mut().get_mut(sym) {
                *slot = value;
                return Ok(());
            }
            match env.parent {
                Some(ref parent) => env = &**parent,
                None => return Err(unbound(sym)),
            }
        }
    }

    pub fn is_bound(&self, sym: &Symbol) -> bool {
        self.lookup(sym).is_ok()
    }

    /// Number of bindings held directly in this frame
    pub fn len(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.borrow().is_empty()
    }
}
