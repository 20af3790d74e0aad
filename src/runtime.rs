use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::ptr;
use std::rc::Rc;

use gc::{Finalize, Gc, Trace};
use log::{debug, trace};

use crate::base::{libbase, load_prelude};
use crate::compiler::Compiler;
use crate::datum::Datum;
use crate::environment::{Env, Environment};
use crate::error::{EvalError, RuntimeError, RuntimeErrorKind};
use crate::parser::Parser;
use crate::symbol::Symbol;

/// Compiled instruction sequence, shared between closures created from the same lambda
pub type Code = Rc<[Inst]>;

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    /// Push a constant
    Const(Datum),
    /// Push the value bound to the symbol
    GetVar(Symbol),
    /// Pop a value and assign it to an existing binding
    SetVar(Symbol),
    /// Pop a value and bind it in the current frame
    DefineVar(Symbol),
    /// Pop a procedure and bind it as a macro transformer
    DefineMacro(Symbol),
    /// Push a closure capturing the current environment
    MakeClosure(Rc<Lambda>),
    Pop,
    Jump(usize),
    JumpIfFalse(usize),
    /// If the value on top of the stack is a macro, expand `operands` with it instead of
    /// evaluating the arguments. A non-tail expansion continues at `resume`.
    CheckMacro { operands: Datum, tail: bool, resume: usize, cache: Rc<ExpansionCache> },
    /// Fail with an error found while compiling an operand. Operands of a macro call are
    /// never evaluated, so the error only surfaces when the call is an application.
    Raise(RuntimeError),
    /// Call the procedure below the top n values
    Call(usize),
    /// Same as `Call`, but reuses the current frame
    TailCall(usize),
    Return,
}

/// Compiled lambda expression
#[derive(Debug, PartialEq)]
pub struct Lambda {
    pub name: Option<Symbol>,
    pub params: Vec<Symbol>,
    pub rest: Option<Symbol>,
    pub body: Code,
}

/// Compiled expansion of one macro call site, valid while the site's transformer stays the same
#[derive(Default)]
pub struct ExpansionCache(RefCell<Option<(Gc<Closure>, Code)>>);

impl ExpansionCache {
    fn get(&self, transformer: &Gc<Closure>) -> Option<Code> {
        match *self.0.borrow() {
            Some((ref cached, ref code)) if Gc::ptr_eq(cached, transformer) => Some(code.clone()),
            _ => None,
        }
    }

    fn store(&self, transformer: Gc<Closure>, code: Code) {
        *self.0.borrow_mut() = Some((transformer, code));
    }
}

/// Caches are not part of an instruction's meaning
impl PartialEq for ExpansionCache {
    fn eq(&self, _: &ExpansionCache) -> bool {
        true
    }
}

impl fmt::Debug for ExpansionCache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0.borrow() {
            Some(_) => write!(f, "<cached>"),
            None => write!(f, "<empty>"),
        }
    }
}

/// Arity contract of a procedure
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive range
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(m) => n == m,
            Arity::AtLeast(m) => n >= m,
            Arity::Range(lo, hi) => lo <= n && n <= hi,
        }
    }

    pub fn check(self, name: &str, n: usize) -> Result<(), RuntimeError> {
        if self.accepts(n) {
            Ok(())
        } else {
            Err(RuntimeError::new(RuntimeErrorKind::NumArgs,
                format!("{}: expected {}, received {}", name, self, n)))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Arity::Exact(1) => write!(f, "1 argument"),
            Arity::Exact(n) => write!(f, "{} arguments", n),
            Arity::AtLeast(1) => write!(f, "at least 1 argument"),
            Arity::AtLeast(n) => write!(f, "at least {} arguments", n),
            Arity::Range(lo, hi) => write!(f, "{} to {} arguments", lo, hi),
        }
    }
}

pub type PrimFn = fn(&[Datum]) -> Result<Datum, RuntimeError>;

/// Body of a native procedure
#[derive(Copy, Clone)]
pub enum NativeFunc {
    /// Plain function of its evaluated arguments
    Simple(PrimFn),
    /// `apply`: calls its first argument with the remaining arguments, spreading the last one
    Apply,
    /// `eval`: evaluates its argument in the global environment
    Eval,
    /// `macroexpand`: runs the transformer of a macro form once
    MacroExpand,
}

/// Native procedure implemented by the runtime
pub struct NativeProc {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFunc,
}

/// User-defined procedure: a compiled lambda and the environment it was created in
#[derive(Trace, Finalize)]
pub struct Closure {
    #[unsafe_ignore_trace]
    pub lambda: Rc<Lambda>,
    pub env: Env,
}

impl Closure {
    pub fn name(&self) -> Option<String> {
        self.lambda.name.as_ref().map(|s| s.to_string())
    }

    fn arity(&self) -> Arity {
        if self.lambda.rest.is_some() {
            Arity::AtLeast(self.lambda.params.len())
        } else {
            Arity::Exact(self.lambda.params.len())
        }
    }
}

#[derive(Clone, Trace, Finalize)]
pub enum Procedure {
    Native(#[unsafe_ignore_trace] &'static NativeProc),
    Closure(Gc<Closure>),
}

impl Procedure {
    pub fn name(&self) -> Option<String> {
        match *self {
            Procedure::Native(native) => Some(native.name.to_string()),
            Procedure::Closure(ref closure) => closure.name(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match *self {
            Procedure::Native(_) => "primitive",
            Procedure::Closure(_) => "procedure",
        }
    }

    pub fn ptr_eq(&self, other: &Procedure) -> bool {
        match (self, other) {
            (&Procedure::Native(l), &Procedure::Native(r)) => ptr::eq(l, r),
            (&Procedure::Closure(ref l), &Procedure::Closure(ref r)) => Gc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "#<{} {}>", self.kind_name(), name),
            None => write!(f, "#<{}>", self.kind_name()),
        }
    }
}

/// What the caller does with the value a frame returns
enum Continuation {
    /// Push it onto the value stack
    Push,
    /// Treat it as the expansion of a macro form and evaluate it
    Expand { site: ExpansionSite },
}

/// Where a macro expansion goes once the transformer has produced it
struct ExpansionSite {
    transformer: Gc<Closure>,
    cache: Rc<ExpansionCache>,
    tail: bool,
    resume: usize,
}

struct Frame {
    code: Code,
    pc: usize,
    env: Env,
    /// Height of the value stack when the frame was entered
    stack_base: usize,
    on_return: Continuation,
}

enum Step {
    Continue,
    Done(Datum),
}

/// One evaluation in flight
///
/// Scheme calls never recurse on the host stack: non-tail calls push a `Frame`, tail calls
/// overwrite the current one.
struct Machine<'a> {
    global: Env,
    options: &'a RuntimeOptions,
    arg_stack: Vec<Datum>,
    call_stack: Vec<Frame>,
    frame: Frame,
}

impl<'a> Machine<'a> {
    fn new(global: Env, options: &'a RuntimeOptions, code: Code, env: Env) -> Machine<'a> {
        Machine {
            global: global,
            options: options,
            arg_stack: Vec::new(),
            call_stack: Vec::new(),
            frame: Frame { code: code, pc: 0, env: env, stack_base: 0, on_return: Continuation::Push },
        }
    }

    fn run(&mut self) -> Result<Datum, RuntimeError> {
        loop {
            if let Step::Done(value) = self.step()? {
                return Ok(value);
            }
        }
    }

    /// Applies `callee` as if it were in tail position of the initial frame
    fn call(&mut self, callee: Datum, args: Vec<Datum>) -> Result<Datum, RuntimeError> {
        match self.apply(callee, args, true)? {
            Step::Done(value) => Ok(value),
            Step::Continue => self.run(),
        }
    }

    fn push(&mut self, value: Datum) {
        self.arg_stack.push(value)
    }

    fn pop(&mut self) -> Result<Datum, RuntimeError> {
        if self.arg_stack.len() <= self.frame.stack_base {
            return Err(RuntimeError::internal("value stack underflow"));
        }
        self.arg_stack.pop().ok_or_else(|| RuntimeError::internal("value stack underflow"))
    }

    fn step(&mut self) -> Result<Step, RuntimeError> {
        let code = self.frame.code.clone();
        let pc = self.frame.pc;
        let inst = code.get(pc)
            .ok_or_else(|| RuntimeError::internal(format!("program counter {} out of range", pc)))?;
        trace!("[{}] {:>4}: {:?}", self.call_stack.len(), pc, inst);
        self.frame.pc += 1;

        match *inst {
            Inst::Const(ref value) => self.push(value.clone()),
            Inst::GetVar(ref sym) => {
                let value = self.frame.env.lookup(sym)?;
                self.push(value);
            }
            Inst::SetVar(ref sym) => {
                let value = self.pop()?;
                self.frame.env.set(sym, value)?;
                self.push(Datum::Unspecified);
            }
            Inst::DefineVar(ref sym) => {
                let value = self.pop()?;
                self.frame.env.define(sym.clone(), value);
                self.push(Datum::Unspecified);
            }
            Inst::DefineMacro(ref sym) => {
                match self.pop()? {
                    Datum::Proc(Procedure::Closure(ref transformer)) =>
                        self.frame.env.define(sym.clone(), Datum::Macro(transformer.clone())),
                    other => return Err(RuntimeError::internal(
                        format!("macro transformer for {} must be a closure, but received {:?}", sym, other))),
                }
                self.push(Datum::Unspecified);
            }
            Inst::MakeClosure(ref lambda) => {
                let closure = Closure { lambda: lambda.clone(), env: self.frame.env.clone() };
                self.push(Datum::Proc(Procedure::Closure(Gc::new(closure))));
            }
            Inst::Pop => {
                self.pop()?;
            }
            Inst::Jump(target) => self.frame.pc = target,
            Inst::JumpIfFalse(target) => {
                if !self.pop()?.is_true() {
                    self.frame.pc = target;
                }
            }
            Inst::CheckMacro { ref operands, tail, resume, ref cache } => {
                let transformer = match self.arg_stack.last() {
                    Some(&Datum::Macro(ref transformer)) => transformer.clone(),
                    _ => return Ok(Step::Continue),
                };
                self.pop()?;
                if let Some(code) = cache.get(&transformer) {
                    return self.enter_expansion(code, tail, resume);
                }
                let forms = operands.list_to_vec()
                    .ok_or_else(|| RuntimeError::bad_syntax(format!("improper macro operands {:?}", operands)))?;
                let site = ExpansionSite { transformer: transformer.clone(), cache: cache.clone(), tail: tail, resume: resume };
                let env = bind_arguments(&transformer, forms)?;
                self.push_frame(transformer.lambda.body.clone(), env, Continuation::Expand { site: site })?;
                return Ok(Step::Continue);
            }
            Inst::Raise(ref err) => return Err(err.clone()),
            Inst::Call(n) => return self.call_from_stack(n, false),
            Inst::TailCall(n) => return self.call_from_stack(n, true),
            Inst::Return => {
                let value = self.pop()?;
                return self.return_value(value);
            }
        }
        Ok(Step::Continue)
    }

    fn call_from_stack(&mut self, n: usize, tail: bool) -> Result<Step, RuntimeError> {
        let len = self.arg_stack.len();
        if len < self.frame.stack_base + n + 1 {
            return Err(RuntimeError::internal("value stack underflow"));
        }
        let args = self.arg_stack.split_off(len - n);
        let callee = self.pop()?;
        self.apply(callee, args, tail)
    }

    fn apply(&mut self, callee: Datum, args: Vec<Datum>, tail: bool) -> Result<Step, RuntimeError> {
        let mut callee = callee;
        let mut args = args;
        loop {
            let procedure = match callee {
                Datum::Proc(ref procedure) => procedure.clone(),
                ref other => return Err(RuntimeError::invalid_type(format!("{:?} is not callable", other))),
            };

            let closure = match procedure {
                Procedure::Closure(ref closure) => closure.clone(),
                Procedure::Native(native) => {
                    native.arity.check(native.name, args.len())?;
                    match native.func {
                        NativeFunc::Simple(f) => {
                            let value = f(&args)?;
                            return self.deliver(value, tail);
                        }
                        NativeFunc::Apply => {
                            let spread = args.pop().unwrap_or(Datum::Nil);
                            let spread = spread.list_to_vec().ok_or_else(||
                                RuntimeError::invalid_type(format!("apply: expected a proper list, but received {:?}", spread)))?;
                            callee = args.remove(0);
                            args.extend(spread);
                            continue;
                        }
                        NativeFunc::Eval => {
                            let code = Compiler::compile(&args[0])?;
                            let global = self.global.clone();
                            self.enter(code, global, tail)?;
                            return Ok(Step::Continue);
                        }
                        NativeFunc::MacroExpand => {
                            let form = args.remove(0);
                            match self.macro_transformer(&form)? {
                                Some((transformer, operands)) => {
                                    callee = Datum::Proc(Procedure::Closure(transformer));
                                    args = operands;
                                    continue;
                                }
                                None => return self.deliver(form, tail),
                            }
                        }
                    }
                }
            };

            debug!("calling {:?} with {} arguments", Procedure::Closure(closure.clone()), args.len());
            let env = bind_arguments(&closure, args)?;
            self.enter(closure.lambda.body.clone(), env, tail)?;
            return Ok(Step::Continue);
        }
    }

    /// Finds the transformer of a macro form, with the form's operands
    fn macro_transformer(&self, form: &Datum) -> Result<Option<(Gc<Closure>, Vec<Datum>)>, RuntimeError> {
        let head = match form.car() {
            Some(Datum::Sym(ref head)) => head.clone(),
            _ => return Ok(None),
        };
        match self.frame.env.lookup(&head) {
            Ok(Datum::Macro(ref transformer)) => {
                let operands = form.cdr().and_then(|d| d.list_to_vec())
                    .ok_or_else(|| RuntimeError::bad_syntax(format!("improper macro form {:?}", form)))?;
                Ok(Some((transformer.clone(), operands)))
            }
            _ => Ok(None),
        }
    }

    /// Evaluates a macro expansion in place of the form that produced it
    fn expand(&mut self, expansion: Datum, site: ExpansionSite) -> Result<Step, RuntimeError> {
        debug!("expanded to {:?}", expansion);
        let code = Compiler::compile(&expansion)?;
        site.cache.store(site.transformer, code.clone());
        self.enter_expansion(code, site.tail, site.resume)
    }

    fn enter_expansion(&mut self, code: Code, tail: bool, resume: usize) -> Result<Step, RuntimeError> {
        let env = self.frame.env.clone();
        if !tail {
            self.frame.pc = resume;
        }
        self.enter(code, env, tail)?;
        Ok(Step::Continue)
    }

    fn deliver(&mut self, value: Datum, tail: bool) -> Result<Step, RuntimeError> {
        if tail {
            self.return_value(value)
        } else {
            self.push(value);
            Ok(Step::Continue)
        }
    }

    fn enter(&mut self, code: Code, env: Env, tail: bool) -> Result<(), RuntimeError> {
        if tail {
            self.arg_stack.truncate(self.frame.stack_base);
            self.frame.code = code;
            self.frame.pc = 0;
            self.frame.env = env;
            Ok(())
        } else {
            self.push_frame(code, env, Continuation::Push)
        }
    }

    fn push_frame(&mut self, code: Code, env: Env, on_return: Continuation) -> Result<(), RuntimeError> {
        if self.call_stack.len() >= self.options.max_call_depth {
            return Err(RuntimeError::new(RuntimeErrorKind::StackOverflow,
                format!("call depth exceeded {}", self.options.max_call_depth)));
        }
        let frame = Frame {
            code: code,
            pc: 0,
            env: env,
            stack_base: self.arg_stack.len(),
            on_return: on_return,
        };
        let caller = mem::replace(&mut self.frame, frame);
        self.call_stack.push(caller);
        Ok(())
    }

    fn return_value(&mut self, value: Datum) -> Result<Step, RuntimeError> {
        self.arg_stack.truncate(self.frame.stack_base);
        let caller = match self.call_stack.pop() {
            Some(caller) => caller,
            None => return Ok(Step::Done(value)),
        };
        let finished = mem::replace(&mut self.frame, caller);
        match finished.on_return {
            Continuation::Push => {
                self.push(value);
                Ok(Step::Continue)
            }
            Continuation::Expand { site } => self.expand(value, site),
        }
    }
}

/// Creates the frame of a closure invocation, child of the closure's own environment
fn bind_arguments(closure: &Closure, args: Vec<Datum>) -> Result<Env, RuntimeError> {
    let lambda = &closure.lambda;
    let name = match lambda.name {
        Some(ref name) => name.as_str(),
        None => "anonymous procedure",
    };
    closure.arity().check(name, args.len())?;

    let env = Environment::new_child(&closure.env);
    let mut args = args.into_iter();
    for (param, arg) in lambda.params.iter().zip(&mut args) {
        env.define(param.clone(), arg);
    }
    if let Some(ref rest) = lambda.rest {
        env.define(rest.clone(), args.collect());
    }
    Ok(env)
}

/// Tunables of a runtime instance
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    /// Maximum number of nested non-tail calls
    pub max_call_depth: usize,
}

impl Default for RuntimeOptions {
    fn default() -> RuntimeOptions {
        RuntimeOptions { max_call_depth: 1_000_000 }
    }
}

/// An interpreter instance: the global environment with the base library loaded
pub struct Runtime {
    global: Env,
    options: RuntimeOptions,
}

impl Runtime {
    pub fn new() -> Result<Runtime, EvalError> {
        Runtime::with_options(RuntimeOptions::default())
    }

    /// Builds the global environment and runs the base library. Any failure in the
    /// library aborts construction.
    pub fn with_options(options: RuntimeOptions) -> Result<Runtime, EvalError> {
        let global = Environment::new_global();
        libbase(&global);
        let mut runtime = Runtime { global: global, options: options };
        load_prelude(&mut runtime)?;
        Ok(runtime)
    }

    pub fn global_env(&self) -> Env {
        self.global.clone()
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Evaluates `datum` in the global environment
    pub fn eval(&mut self, datum: &Datum) -> Result<Datum, RuntimeError> {
        let global = self.global.clone();
        self.eval_in(datum, &global)
    }

    pub fn eval_in(&mut self, datum: &Datum, env: &Env) -> Result<Datum, RuntimeError> {
        let code = Compiler::compile(datum)?;
        self.execute(code, env)
    }

    /// Reads and evaluates every datum in `source`, returning the value of the last one
    pub fn eval_str(&mut self, source: &str) -> Result<Datum, EvalError> {
        let mut parser = Parser::new(source);
        let mut last = Datum::Unspecified;
        while let Some(datum) = parser.parse_next()? {
            last = self.eval(&datum)?;
        }
        Ok(last)
    }

    /// Applies a procedure to already evaluated arguments
    pub fn apply(&mut self, procedure: &Datum, args: Vec<Datum>) -> Result<Datum, RuntimeError> {
        let empty: Code = Rc::from(Vec::new());
        let mut machine = Machine::new(self.global.clone(), &self.options, empty, self.global.clone());
        machine.call(procedure.clone(), args)
    }

    /// Expands a macro form once without evaluating the expansion.
    /// Forms whose head is not a macro are returned unchanged.
    pub fn macro_expand(&mut self, form: &Datum) -> Result<Datum, RuntimeError> {
        let empty: Code = Rc::from(Vec::new());
        let mut machine = Machine::new(self.global.clone(), &self.options, empty, self.global.clone());
        match machine.macro_transformer(form)? {
            Some((transformer, operands)) => machine.call(Datum::Proc(Procedure::Closure(transformer)), operands),
            None => Ok(form.clone()),
        }
    }

    fn execute(&mut self, code: Code, env: &Env) -> Result<Datum, RuntimeError> {
        let mut machine = Machine::new(self.global.clone(), &self.options, code, env.clone());
        machine.run()
    }
}
