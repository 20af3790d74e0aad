use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use gc::{unsafe_empty_trace, Finalize, Trace};

/// Interned identifier
///
/// Every distinct name has exactly one allocation in the registry, so equality and hashing
/// compare addresses instead of text.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Returns the unique symbol named `name`, creating it on first use
    pub fn intern(name: &str) -> Symbol {
        SYMBOLS.with(|table| table.borrow_mut().intern(name))
    }

    /// Creates a fresh symbol whose name no reader-produced symbol uses
    pub fn gensym() -> Symbol {
        let id = GENSYM_COUNTER.with(|c| {
            let id = c.get();
            c.set(id + 1);
            id
        });
        Symbol::intern(&format!("#:g{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Symbol) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.as_ptr() as usize).hash(state)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Finalize for Symbol {}

unsafe impl Trace for Symbol {
    unsafe_empty_trace!();
}

/// Name-keyed registry backing `Symbol::intern`
#[derive(Default)]
pub struct SymbolTable {
    names: HashSet<Rc<str>>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(existing) = self.names.get(name) {
            return Symbol(existing.clone());
        }
        let name: Rc<str> = Rc::from(name);
        self.names.insert(name.clone());
        Symbol(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// Symbols hold `Rc`s, so the registry is scoped to the thread that owns the runtime.
thread_local! {
    static SYMBOLS: RefCell<SymbolTable> = RefCell::new(SymbolTable::new());
    static GENSYM_COUNTER: Cell<u64> = Cell::new(0);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_intern_identity() {
        let a = Symbol::intern("lambda");
        let b = Symbol::intern(&String::from("lambda"));
        assert_eq!(a, b);
        assert!(Rc::ptr_eq(&a.0, &b.0));
        assert!(Symbol::intern("lambda") != Symbol::intern("define"));
    }

    #[test]
    fn test_table() {
        let mut table = SymbolTable::new();
        let x = table.intern("x");
        let y = table.intern("y");
        assert_eq!(table.intern("x"), x);
        assert!(x != y);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_gensym_unique() {
        let a = Symbol::gensym();
        let b = Symbol::gensym();
        assert!(a != b);
        assert!(a.as_str().starts_with("#:g"));
    }
}
