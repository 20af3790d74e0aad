use std::cell::RefCell;
use std::fmt;
use std::iter::FromIterator;

use gc::{Finalize, Gc, GcCell, Trace};

use crate::number::Number;
use crate::runtime::{Closure, Procedure};
use crate::symbol::Symbol;

/// Mutable cons cell
#[derive(Finalize)]
pub struct Pair {
    pub car: Datum,
    pub cdr: Datum,
}

thread_local! {
    /// Fields of pairs reached while another pair is being marked
    static DEFERRED_MARKS: RefCell<Option<Vec<*const Datum>>> = RefCell::new(None);
}

/// Marking is iterative over pairs, so list length never turns into host stack depth.
/// The outermost pair drains a work list; pairs reached from it only enqueue their fields.
/// The pointers stay valid because nothing is freed or mutated while marking.
unsafe impl Trace for Pair {
    unsafe fn trace(&self) {
        let nested = DEFERRED_MARKS.with(|deferred| {
            let mut deferred = deferred.borrow_mut();
            match *deferred {
                Some(ref mut pending) => {
                    pending.push(&self.car as *const Datum);
                    pending.push(&self.cdr as *const Datum);
                    true
                }
                None => {
                    *deferred = Some(Vec::new());
                    false
                }
            }
        });
        if nested {
            return;
        }

        self.car.trace();
        self.cdr.trace();
        while let Some(next) = DEFERRED_MARKS.with(|deferred| deferred.borrow_mut().as_mut().and_then(|p| p.pop())) {
            (*next).trace();
        }
        DEFERRED_MARKS.with(|deferred| *deferred.borrow_mut() = None);
    }

    unsafe fn root(&self) {
        self.car.root();
        self.cdr.root();
    }

    unsafe fn unroot(&self) {
        self.car.unroot();
        self.cdr.unroot();
    }

    fn finalize_glue(&self) {
        Finalize::finalize(self);
        self.car.finalize_glue();
        self.cdr.finalize_glue();
    }
}

/// Datum is the primary data type of Scheme
///
/// Heap objects live behind `Gc` handles, so cycles created through `set-car!` or
/// `vector-set!` are reclaimed by the collector.
#[derive(Clone, Trace, Finalize)]
pub enum Datum {
    /// `()`
    Nil,
    /// Boolean
    Bool(bool),
    /// Character
    Char(char),
    /// Interned symbol
    Sym(Symbol),
    /// Number
    Num(#[unsafe_ignore_trace] Number),
    /// Mutable string
    String(Gc<GcCell<String>>),
    /// Fixed-length mutable vector
    Vector(Gc<GcCell<Vec<Datum>>>),
    /// Pair
    Cons(Gc<GcCell<Pair>>),
    /// Primitive or closure
    Proc(Procedure),
    /// Macro transformer, called with unevaluated operands
    Macro(Gc<Closure>),
    /// Value of expressions evaluated only for their effect
    Unspecified,
    /// End of input marker
    Eof,
}

/// Type representation of Datum
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DatumType {
    Null,
    Bool,
    Char,
    Sym,
    Num,
    String,
    Vector,
    Pair,
    Procedure,
    Macro,
    Unspecified,
    Eof,
}

impl DatumType {
    /// Get the type of datum
    pub fn get_type(datum: &Datum) -> DatumType {
        match *datum {
            Datum::Nil => DatumType::Null,
            Datum::Bool(_) => DatumType::Bool,
            Datum::Char(_) => DatumType::Char,
            Datum::Sym(_) => DatumType::Sym,
            Datum::Num(_) => DatumType::Num,
            Datum::String(_) => DatumType::String,
            Datum::Vector(_) => DatumType::Vector,
            Datum::Cons(_) => DatumType::Pair,
            Datum::Proc(_) => DatumType::Procedure,
            Datum::Macro(_) => DatumType::Macro,
            Datum::Unspecified => DatumType::Unspecified,
            Datum::Eof => DatumType::Eof,
        }
    }
}

impl Datum {
    pub fn cons(car: Datum, cdr: Datum) -> Datum {
        Datum::Cons(Gc::new(GcCell::new(Pair { car: car, cdr: cdr })))
    }

    pub fn sym(name: &str) -> Datum {
        Datum::Sym(Symbol::intern(name))
    }

    pub fn string(s: &str) -> Datum {
        Datum::String(Gc::new(GcCell::new(s.to_string())))
    }

    pub fn vector(items: Vec<Datum>) -> Datum {
        Datum::Vector(Gc::new(GcCell::new(items)))
    }

    /// Builds a list ending in `tail` instead of `()`
    pub fn list_with_tail(items: Vec<Datum>, tail: Datum) -> Datum {
        items.into_iter().rev().fold(tail, |acc, item| Datum::cons(item, acc))
    }

    /// Everything except `#f` counts as true
    pub fn is_true(&self) -> bool {
        !matches!(*self, Datum::Bool(false))
    }

    pub fn car(&self) -> Option<Datum> {
        match *self {
            Datum::Cons(ref p) => Some(p.borrow().car.clone()),
            _ => None,
        }
    }

    pub fn cdr(&self) -> Option<Datum> {
        match *self {
            Datum::Cons(ref p) => Some(p.borrow().cdr.clone()),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match *self {
            Datum::Sym(ref s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a proper list. `None` for improper or circular lists.
    pub fn list_to_vec(&self) -> Option<Vec<Datum>> {
        let mut items = Vec::new();
        let mut tail = self.clone();
        // Brent-style cycle check: compare against a checkpoint that moves at powers of two.
        let mut checkpoint: Option<usize> = None;
        let mut next_checkpoint = 1;
        loop {
            let next = match tail {
                Datum::Nil => return Some(items),
                Datum::Cons(ref p) => {
                    let addr = pair_addr(p);
                    if checkpoint == Some(addr) {
                        return None;
                    }
                    if items.len() + 1 == next_checkpoint {
                        checkpoint = Some(addr);
                        next_checkpoint *= 2;
                    }
                    let pair = p.borrow();
                    items.push(pair.car.clone());
                    pair.cdr.clone()
                }
                _ => return None,
            };
            tail = next;
        }
    }
}

/// Collects into a proper list
impl FromIterator<Datum> for Datum {
    fn from_iter<I: IntoIterator<Item = Datum>>(iter: I) -> Datum {
        let items: Vec<Datum> = iter.into_iter().collect();
        Datum::list_with_tail(items, Datum::Nil)
    }
}

fn pair_addr(p: &Gc<GcCell<Pair>>) -> usize {
    &**p as *const GcCell<Pair> as usize
}

fn vector_addr(v: &Gc<GcCell<Vec<Datum>>>) -> usize {
    &**v as *const GcCell<Vec<Datum>> as usize
}

/// Structural equality, used by tests and by the reader's callers.
/// `eq?` semantics live in `eqv.rs`.
impl PartialEq for Datum {
    fn eq(&self, rhs: &Datum) -> bool {
        let mut lhs = self.clone();
        let mut rhs = rhs.clone();
        loop {
            let (next_l, next_r) = match (&lhs, &rhs) {
                (&Datum::Cons(ref l), &Datum::Cons(ref r)) => {
                    if Gc::ptr_eq(l, r) {
                        return true;
                    }
                    let (l, r) = (l.borrow(), r.borrow());
                    if l.car != r.car {
                        return false;
                    }
                    (l.cdr.clone(), r.cdr.clone())
                }
                (&Datum::Nil, &Datum::Nil) => return true,
                (&Datum::Bool(l), &Datum::Bool(r)) => return l == r,
                (&Datum::Char(l), &Datum::Char(r)) => return l == r,
                (&Datum::Sym(ref l), &Datum::Sym(ref r)) => return l == r,
                (&Datum::Num(ref l), &Datum::Num(ref r)) => return l == r,
                (&Datum::String(ref l), &Datum::String(ref r)) => return *l.borrow() == *r.borrow(),
                (&Datum::Vector(ref l), &Datum::Vector(ref r)) => return *l.borrow() == *r.borrow(),
                (&Datum::Proc(ref l), &Datum::Proc(ref r)) => return l.ptr_eq(r),
                (&Datum::Macro(ref l), &Datum::Macro(ref r)) => return Gc::ptr_eq(l, r),
                (&Datum::Unspecified, &Datum::Unspecified) => return true,
                (&Datum::Eof, &Datum::Eof) => return true,
                _ => return false,
            };
            lhs = next_l;
            rhs = next_r;
        }
    }
}

fn char_name(c: char) -> Option<&'static str> {
    match c {
        ' ' => Some("space"),
        '\n' => Some("newline"),
        '\t' => Some("tab"),
        '\r' => Some("return"),
        '\0' => Some("nul"),
        '\x07' => Some("alarm"),
        '\x08' => Some("backspace"),
        '\x7f' => Some("delete"),
        '\x1b' => Some("escape"),
        _ => None,
    }
}

fn quote_prefix(sym: &Symbol) -> Option<&'static str> {
    match sym.as_str() {
        "quote" => Some("'"),
        "quasiquote" => Some("`"),
        "unquote" => Some(","),
        "unquote-splicing" => Some(",@"),
        _ => None,
    }
}

/// Writes data in external representation, marking back references instead of looping
struct Printer<'a, 'b: 'a> {
    f: &'a mut fmt::Formatter<'b>,
    /// `write` mode quotes strings and characters, `display` mode prints them raw
    write: bool,
    /// Pairs and vectors currently being printed
    active: Vec<usize>,
}

impl<'a, 'b> Printer<'a, 'b> {
    fn print(&mut self, datum: &Datum) -> fmt::Result {
        match *datum {
            Datum::Nil => write!(self.f, "()"),
            Datum::Bool(true) => write!(self.f, "#t"),
            Datum::Bool(false) => write!(self.f, "#f"),
            Datum::Char(c) if self.write => match char_name(c) {
                Some(name) => write!(self.f, "#\\{}", name),
                None if c.is_control() => write!(self.f, "#\\x{:x}", c as u32),
                None => write!(self.f, "#\\{}", c),
            },
            Datum::Char(c) => write!(self.f, "{}", c),
            Datum::Sym(ref s) => write!(self.f, "{}", s),
            Datum::Num(ref n) => write!(self.f, "{}", n),
            Datum::String(ref s) if self.write => self.print_string(&s.borrow()),
            Datum::String(ref s) => write!(self.f, "{}", *s.borrow()),
            Datum::Vector(ref v) => self.print_vector(v),
            Datum::Cons(ref p) => self.print_list(p),
            Datum::Proc(ref p) => match p.name() {
                Some(name) => write!(self.f, "#<{} {}>", p.kind_name(), name),
                None => write!(self.f, "#<{}>", p.kind_name()),
            },
            Datum::Macro(ref p) => match p.name() {
                Some(name) => write!(self.f, "#<macro {}>", name),
                None => write!(self.f, "#<macro>"),
            },
            Datum::Unspecified => write!(self.f, "#<unspecified>"),
            Datum::Eof => write!(self.f, "#<eof>"),
        }
    }

    fn print_string(&mut self, s: &str) -> fmt::Result {
        write!(self.f, "\"")?;
        for c in s.chars() {
            match c {
                '"' => write!(self.f, "\\\"")?,
                '\\' => write!(self.f, "\\\\")?,
                '\n' => write!(self.f, "\\n")?,
                '\t' => write!(self.f, "\\t")?,
                '\r' => write!(self.f, "\\r")?,
                c if c.is_control() => write!(self.f, "\\x{:x};", c as u32)?,
                c => write!(self.f, "{}", c)?,
            }
        }
        write!(self.f, "\"")
    }

    fn print_vector(&mut self, v: &Gc<GcCell<Vec<Datum>>>) -> fmt::Result {
        let addr = vector_addr(v);
        if self.active.contains(&addr) {
            return write!(self.f, "#<cycle>");
        }
        self.active.push(addr);
        write!(self.f, "#(")?;
        for (i, item) in v.borrow().iter().enumerate() {
            if i > 0 {
                write!(self.f, " ")?;
            }
            self.print(item)?;
        }
        self.active.pop();
        write!(self.f, ")")
    }

    fn print_list(&mut self, head: &Gc<GcCell<Pair>>) -> fmt::Result {
        let base = self.active.len();
        let addr = pair_addr(head);
        if self.active.contains(&addr) {
            return write!(self.f, "#<cycle>");
        }

        let (car, cdr) = {
            let pair = head.borrow();
            (pair.car.clone(), pair.cdr.clone())
        };

        if let Datum::Sym(ref s) = car {
            if let Some(prefix) = quote_prefix(s) {
                if let Datum::Cons(ref rest) = cdr {
                    let rest = rest.borrow();
                    if let Datum::Nil = rest.cdr {
                        self.active.push(addr);
                        write!(self.f, "{}", prefix)?;
                        self.print(&rest.car)?;
                        self.active.truncate(base);
                        return Ok(());
                    }
                }
            }
        }

        self.active.push(addr);
        write!(self.f, "(")?;
        self.print(&car)?;
        let mut tail = cdr;
        loop {
            let next = match tail {
                Datum::Nil => break,
                Datum::Cons(ref p) => {
                    let addr = pair_addr(p);
                    if self.active.contains(&addr) {
                        write!(self.f, " . #<cycle>")?;
                        break;
                    }
                    self.active.push(addr);
                    let (car, cdr) = {
                        let pair = p.borrow();
                        (pair.car.clone(), pair.cdr.clone())
                    };
                    write!(self.f, " ")?;
                    self.print(&car)?;
                    cdr
                }
                ref other => {
                    write!(self.f, " . ")?;
                    self.print(other)?;
                    break;
                }
            };
            tail = next;
        }
        self.active.truncate(base);
        write!(self.f, ")")
    }
}

/// External representation, as produced by `write`
impl fmt::Debug for Datum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Printer { f: f, write: true, active: Vec::new() }.print(self)
    }
}

/// Human-readable representation, as produced by `display`
impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Printer { f: f, write: false, active: Vec::new() }.print(self)
    }
}
