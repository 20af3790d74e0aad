use std::env;
use std::fs;
use std::process;

use log::info;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use schemer::{Datum, ParserError, Parser, Runtime};

enum Input {
    Data(Vec<Datum>),
    Invalid(ParserError),
}

/// Reads lines until they hold complete data
fn read(rl: &mut DefaultEditor) -> Result<Input, ReadlineError> {
    let mut input = rl.readline(">> ")?;
    loop {
        match parse(&input) {
            Ok(Some(data)) => {
                if !data.is_empty() {
                    let _ = rl.add_history_entry(input.as_str());
                }
                return Ok(Input::Data(data));
            }
            Ok(None) => (),
            Err(e) => {
                let _ = rl.add_history_entry(input.as_str());
                return Ok(Input::Invalid(e));
            }
        }

        let line = rl.readline(".. ")?;
        input.push('\n');
        input.push_str(&line);
    }
}

/// `Ok(None)` when the input ends in the middle of a datum
fn parse(input: &str) -> Result<Option<Vec<Datum>>, ParserError> {
    let mut parser = Parser::new(input);
    let mut data = Vec::new();
    loop {
        match parser.parse_next() {
            Ok(Some(datum)) => data.push(datum),
            Ok(None) => return Ok(Some(data)),
            Err(e) if e.is_incomplete() => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

fn load_file(runtime: &mut Runtime, path: &str) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| e.to_string())?;
    runtime.eval_str(&source).map_err(|e| e.to_string())?;
    info!("loaded {}", path);
    Ok(())
}

fn main() {
    env_logger::init();

    let mut no_repl = false;
    let mut files = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--no-repl" {
            no_repl = true;
        } else {
            files.push(arg);
        }
    }

    let mut runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to load base library: {}", e);
            process::exit(1);
        }
    };

    for file in &files {
        if let Err(e) = load_file(&mut runtime, file) {
            eprintln!("Error: {}: {}", file, e);
            process::exit(1);
        }
    }

    if no_repl {
        return;
    }

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    loop {
        match read(&mut rl) {
            Ok(Input::Data(data)) => {
                for datum in data {
                    match runtime.eval(&datum) {
                        Ok(Datum::Unspecified) => (),
                        Ok(v) => println!("{:?}", v),
                        Err(e) => {
                            println!("Error: {}", e);
                            break;
                        }
                    }
                }
            }
            Ok(Input::Invalid(e)) => println!("Error: {}", e),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return,
            Err(e) => {
                println!("Error: {}", e);
                return;
            }
        }
    }
}
