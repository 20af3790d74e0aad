use std::rc::Rc;

use phf::phf_map;

use crate::datum::Datum;
use crate::error::RuntimeError;
use crate::runtime::{Code, ExpansionCache, Inst, Lambda};
use crate::symbol::Symbol;

/// Special form keywords
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Syntax {
    Quote,
    If,
    Define,
    Set,
    Lambda,
    Begin,
    DefMacro,
}

static SYNTAX: phf::Map<&'static str, Syntax> = phf_map! {
    "quote" => Syntax::Quote,
    "if" => Syntax::If,
    "define" => Syntax::Define,
    "set!" => Syntax::Set,
    "lambda" => Syntax::Lambda,
    "begin" => Syntax::Begin,
    "defmacro" => Syntax::DefMacro,
};

impl Syntax {
    pub fn lookup(sym: &Symbol) -> Option<Syntax> {
        SYNTAX.get(sym.as_str()).cloned()
    }
}

fn bad_syntax(form: &Datum, reason: &str) -> RuntimeError {
    RuntimeError::bad_syntax(format!("{}: {:?}", reason, form))
}

/// Compiles datum into a bytecode
///
/// Every compiled sequence ends in `Return` or `TailCall`, so a frame never runs off its code.
pub struct Compiler {
    code: Vec<Inst>,
}

impl Compiler {
    /// Compiles a top-level expression
    pub fn compile(datum: &Datum) -> Result<Code, RuntimeError> {
        let mut compiler = Compiler { code: Vec::new() };
        compiler.compile_expr(datum, true)?;
        Ok(compiler.code.into())
    }

    fn compile_body(body: &[Datum]) -> Result<Code, RuntimeError> {
        let mut compiler = Compiler { code: Vec::new() };
        compiler.compile_sequence(body, true)?;
        Ok(compiler.code.into())
    }

    fn emit(&mut self, inst: Inst) -> usize {
        self.code.push(inst);
        self.code.len() - 1
    }

    fn finish(&mut self, tail: bool) -> Result<(), RuntimeError> {
        if tail {
            self.emit(Inst::Return);
        }
        Ok(())
    }

    fn compile_expr(&mut self, datum: &Datum, tail: bool) -> Result<(), RuntimeError> {
        match *datum {
            Datum::Sym(ref s) => {
                self.emit(Inst::GetVar(s.clone()));
                self.finish(tail)
            }
            Datum::Cons(_) => self.compile_form(datum, tail),
            Datum::Nil => Err(bad_syntax(datum, "empty combination")),
            _ => {
                self.emit(Inst::Const(datum.clone()));
                self.finish(tail)
            }
        }
    }

    fn compile_sequence(&mut self, forms: &[Datum], tail: bool) -> Result<(), RuntimeError> {
        match forms.split_last() {
            None => {
                self.emit(Inst::Const(Datum::Unspecified));
                self.finish(tail)
            }
            Some((last, init)) => {
                for form in init {
                    self.compile_expr(form, false)?;
                    self.emit(Inst::Pop);
                }
                self.compile_expr(last, tail)
            }
        }
    }

    fn compile_form(&mut self, form: &Datum, tail: bool) -> Result<(), RuntimeError> {
        let items = match form.list_to_vec() {
            Some(items) => items,
            None => return Err(bad_syntax(form, "improper list in combination")),
        };
        let (head, operands) = match items.split_first() {
            Some(split) => split,
            None => return Err(bad_syntax(form, "empty combination")),
        };

        if let Datum::Sym(ref s) = *head {
            if let Some(syntax) = Syntax::lookup(s) {
                return self.compile_syntax(syntax, form, operands, tail);
            }
        }

        let operand_forms = form.cdr().unwrap_or(Datum::Nil);
        self.compile_application(head, operands, operand_forms, tail)
    }

    fn compile_application(&mut self, head: &Datum, operands: &[Datum], operand_forms: Datum, tail: bool)
            -> Result<(), RuntimeError>
    {
        self.compile_expr(head, false)?;
        // Patched below, once the resume address is known
        let check = self.emit(Inst::Pop);
        for operand in operands {
            self.compile_operand(operand);
        }
        if tail {
            self.emit(Inst::TailCall(operands.len()));
        } else {
            self.emit(Inst::Call(operands.len()));
        }
        let resume = self.code.len();
        self.code[check] = Inst::CheckMacro {
            operands: operand_forms,
            tail: tail,
            resume: resume,
            cache: Rc::new(ExpansionCache::default()),
        };
        Ok(())
    }

    /// Operands may be unevaluated macro arguments, so a malformed one is only an error
    /// once it is about to be evaluated
    fn compile_operand(&mut self, operand: &Datum) {
        let start = self.code.len();
        if let Err(err) = self.compile_expr(operand, false) {
            self.code.truncate(start);
            self.emit(Inst::Raise(err));
        }
    }

    fn compile_syntax(&mut self, syntax: Syntax, form: &Datum, operands: &[Datum], tail: bool)
            -> Result<(), RuntimeError>
    {
        match syntax {
            Syntax::Quote => match operands {
                [datum] => {
                    self.emit(Inst::Const(datum.clone()));
                    self.finish(tail)
                }
                _ => Err(bad_syntax(form, "quote expects exactly one datum")),
            },
            Syntax::If => {
                let (test, conseq, alt) = match operands {
                    [test, conseq] => (test, conseq, None),
                    [test, conseq, alt] => (test, conseq, Some(alt)),
                    _ => return Err(bad_syntax(form, "if expects a test and one or two branches")),
                };
                self.compile_expr(test, false)?;
                let jump_if_false = self.emit(Inst::JumpIfFalse(0));
                self.compile_expr(conseq, tail)?;
                let skip_alt = if tail { None } else { Some(self.emit(Inst::Jump(0))) };
                self.code[jump_if_false] = Inst::JumpIfFalse(self.code.len());
                match alt {
                    Some(alt) => self.compile_expr(alt, tail)?,
                    None => {
                        self.emit(Inst::Const(Datum::Bool(false)));
                        self.finish(tail)?;
                    }
                }
                if let Some(skip_alt) = skip_alt {
                    self.code[skip_alt] = Inst::Jump(self.code.len());
                }
                Ok(())
            }
            Syntax::Define => {
                let target = operands.first().ok_or_else(|| bad_syntax(form, "define expects a target"))?;
                match *target {
                    Datum::Sym(ref name) => {
                        match &operands[1..] {
                            [] => {
                                self.emit(Inst::Const(Datum::Unspecified));
                            }
                            [value] => self.compile_named(name, value)?,
                            _ => return Err(bad_syntax(form, "define expects a single value")),
                        }
                        self.emit(Inst::DefineVar(name.clone()));
                    }
                    Datum::Cons(_) => {
                        // (define (name . formals) body ...)
                        let name = match target.car() {
                            Some(Datum::Sym(ref name)) => name.clone(),
                            _ => return Err(bad_syntax(form, "procedure name must be a symbol")),
                        };
                        let formals = target.cdr().unwrap_or(Datum::Nil);
                        let lambda = compile_lambda(Some(name.clone()), &formals, &operands[1..], form)?;
                        self.emit(Inst::MakeClosure(lambda));
                        self.emit(Inst::DefineVar(name));
                    }
                    _ => return Err(bad_syntax(form, "define target must be a symbol or a list")),
                }
                self.finish(tail)
            }
            Syntax::Set => match operands {
                [Datum::Sym(name), value] => {
                    self.compile_expr(value, false)?;
                    self.emit(Inst::SetVar(name.clone()));
                    self.finish(tail)
                }
                _ => Err(bad_syntax(form, "set! expects a symbol and a value")),
            },
            Syntax::Lambda => {
                let formals = operands.first().ok_or_else(|| bad_syntax(form, "lambda without parameter list"))?;
                let lambda = compile_lambda(None, formals, &operands[1..], form)?;
                self.emit(Inst::MakeClosure(lambda));
                self.finish(tail)
            }
            Syntax::Begin => self.compile_sequence(operands, tail),
            Syntax::DefMacro => match operands {
                [Datum::Sym(name), formals, body @ ..] => {
                    let lambda = compile_lambda(Some(name.clone()), formals, body, form)?;
                    self.emit(Inst::MakeClosure(lambda));
                    self.emit(Inst::DefineMacro(name.clone()));
                    self.finish(tail)
                }
                _ => Err(bad_syntax(form, "defmacro expects a name, a parameter list and a body")),
            },
        }
    }

    /// Compiles the value of a definition, naming it when it is a lambda expression
    fn compile_named(&mut self, name: &Symbol, value: &Datum) -> Result<(), RuntimeError> {
        if let Some(Datum::Sym(ref head)) = value.car() {
            if Syntax::lookup(head) == Some(Syntax::Lambda) {
                if let Some(operands) = value.cdr().and_then(|d| d.list_to_vec()) {
                    if let Some((formals, body)) = operands.split_first() {
                        let lambda = compile_lambda(Some(name.clone()), formals, body, value)?;
                        self.emit(Inst::MakeClosure(lambda));
                        return Ok(());
                    }
                }
            }
        }
        self.compile_expr(value, false)
    }
}

/// Splits a parameter list into fixed parameters and an optional rest parameter
fn parse_formals(formals: &Datum, form: &Datum) -> Result<(Vec<Symbol>, Option<Symbol>), RuntimeError> {
    let mut params: Vec<Symbol> = Vec::new();
    let mut tail = formals.clone();
    let rest = loop {
        let next = match tail {
            Datum::Nil => break None,
            Datum::Sym(ref s) => break Some(s.clone()),
            Datum::Cons(ref p) => {
                let pair = p.borrow();
                match pair.car {
                    Datum::Sym(ref s) => params.push(s.clone()),
                    _ => return Err(bad_syntax(form, "parameter must be a symbol")),
                }
                pair.cdr.clone()
            }
            _ => return Err(bad_syntax(form, "malformed parameter list")),
        };
        tail = next;
    };

    let all = params.iter().chain(rest.iter());
    for (i, param) in all.clone().enumerate() {
        if all.clone().skip(i + 1).any(|other| other == param) {
            return Err(bad_syntax(form, &format!("duplicate parameter {}", param)));
        }
    }
    Ok((params, rest))
}

fn compile_lambda(name: Option<Symbol>, formals: &Datum, body: &[Datum], form: &Datum)
        -> Result<Rc<Lambda>, RuntimeError>
{
    if body.is_empty() {
        return Err(bad_syntax(form, "empty body"));
    }
    let (params, rest) = parse_formals(formals, form)?;
    Ok(Rc::new(Lambda {
        name: name,
        params: params,
        rest: rest,
        body: Compiler::compile_body(body)?,
    }))
}
