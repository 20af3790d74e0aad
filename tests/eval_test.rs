use schemer::{Datum, EvalError, Parser, Runtime, RuntimeErrorKind, Symbol};

macro_rules! assert_evaluates_to {
    ($src:expr, $expected:expr) => (
        {
            let mut runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => panic!("failed to create runtime: {}", e),
            };
            assert_evaluates_to!(runtime, $src, $expected)
        }
    );
    ($runtime:expr, $src:expr, $expected:expr) => (
        {
            let expected = match Parser::new($expected).parse_full() {
                Ok(val) => val,
                Err(e) => panic!("failed to parse result: {:?}", e),
            };
            let result = match $runtime.eval_str($src) {
                Ok(val) => val,
                Err(e) => panic!("failed to evaluate `{}`: {}", $src, e),
            };
            if !((result == expected) && (expected == result)) {
                panic!("test failed: `{}` expected `{:?}` but got `{:?}`", $src, expected, result);
            }
        }
    )
}

fn runtime_error(runtime: &mut Runtime, src: &str) -> schemer::RuntimeError {
    match runtime.eval_str(src) {
        Err(EvalError::Runtime(e)) => e,
        other => panic!("expected a runtime error from `{}`, got {:?}", src, other),
    }
}

#[test]
fn lexical_scoping() {
    // Dynamic scope would see the caller's y and return #f
    assert_evaluates_to!("((lambda (y f) (f 2)) #f ((lambda (y) (lambda (x) y)) #t))", "#t");
}

#[test]
fn closure_keeps_defining_environment() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(define (make-adder n) (lambda (x) (+ x n)))").unwrap();
    runtime.eval_str("(define add5 (make-adder 5))").unwrap();
    runtime.eval_str("(define n 100)").unwrap();
    assert_evaluates_to!(runtime, "(add5 10)", "15");
}

#[test]
fn counter_closure() {
    assert_evaluates_to!("(define (make-counter)
                            (define count 0)
                            (lambda () (set! count (+ count 1)) count))
                          (define c (make-counter))
                          (c) (c)
                          (c)", "3");
}

#[test]
fn if_expression_test() {
    assert_evaluates_to!("(if #t 1 0)", "1");
    assert_evaluates_to!("(if #f 1 0)", "0");
    assert_evaluates_to!("(if '() 1 0)", "1");
    assert_evaluates_to!("(if #f 1)", "#f");
}

#[test]
fn eval_to_self_test() {
    assert_evaluates_to!("#t", "#t");
    assert_evaluates_to!("23", "23");
    assert_evaluates_to!("\"abc\"", "\"abc\"");
    assert_evaluates_to!("#\\a", "#\\a");
    assert_evaluates_to!("#(1 2)", "#(1 2)");
}

#[test]
fn numeric_expressions_test() {
    assert_evaluates_to!("(+ 23 42)", "65");
    assert_evaluates_to!("(+ 14 (* 23 42))", "980");
    assert_evaluates_to!("(- 3 1)", "2");
    assert_evaluates_to!("(- 3)", "-3");
    assert_evaluates_to!("(/ 6 4)", "3/2");
    assert_evaluates_to!("(/ 6 3)", "2");
    assert_evaluates_to!("(+ 1/2 1/2)", "1");
    assert_evaluates_to!("(+ 1/2 0.5)", "1.0");
    assert_evaluates_to!("(* 1.5 2)", "3.0");
    assert_evaluates_to!("(quotient 17 5)", "3");
    assert_evaluates_to!("(remainder -17 5)", "-2");
    assert_evaluates_to!("(modulo -17 5)", "3");
    assert_evaluates_to!("(modulo 17 -5)", "-3");
    assert_evaluates_to!("(< 1 2 3)", "#t");
    assert_evaluates_to!("(< 1 3 2)", "#f");
    assert_evaluates_to!("(= 1 1.0)", "#t");
}

#[test]
fn fixnum_overflow_promotes() {
    assert_evaluates_to!("(+ 9223372036854775807 9223372036854775807)", "18446744073709551614");
    assert_evaluates_to!("(* 9223372036854775807 2)", "18446744073709551614");
    assert_evaluates_to!("(- -9223372036854775808 1)", "-9223372036854775809");
    assert_evaluates_to!("(- (+ 9223372036854775807 1) 1)", "9223372036854775807");
}

#[test]
fn rounding_test() {
    assert_evaluates_to!("(round 5/2)", "2");
    assert_evaluates_to!("(round 7/2)", "4");
    assert_evaluates_to!("(round 2.5)", "2.0");
    assert_evaluates_to!("(floor -7/2)", "-4");
    assert_evaluates_to!("(ceiling -7/2)", "-3");
    assert_evaluates_to!("(truncate -7/2)", "-3");
}

#[test]
fn sqrt_and_expt() {
    assert_evaluates_to!("(sqrt 16)", "4");
    assert_evaluates_to!("(sqrt 1/4)", "1/2");
    assert_evaluates_to!("(sqrt 2.25)", "1.5");
    assert_evaluates_to!("(exact? (sqrt 2))", "#f");
    assert_evaluates_to!("(expt 2 10)", "1024.0");
}

#[test]
fn number_string_conversion() {
    assert_evaluates_to!("(number->string 255 16)", "\"ff\"");
    assert_evaluates_to!("(number->string 3/4)", "\"3/4\"");
    assert_evaluates_to!("(string->number \"#b101\")", "5");
    assert_evaluates_to!("(string->number \"hello\")", "#f");

    let mut runtime = Runtime::new().unwrap();
    let err = runtime_error(&mut runtime, "(number->string 1/2 2)");
    assert_eq!(err.kind, RuntimeErrorKind::Domain);
}

#[test]
fn division_by_zero() {
    let mut runtime = Runtime::new().unwrap();
    for src in &["(/ 1 0)", "(/ 0)", "(quotient 1 0)", "(remainder 5 0)", "(/ 1/2 0)"] {
        let err = runtime_error(&mut runtime, src);
        assert!(err.kind.is_domain_error(), "{} raised {:?}", src, err);
    }
}

#[test]
fn unbound_variable_leaves_environment_unchanged() {
    let mut runtime = Runtime::new().unwrap();
    let global = runtime.global_env();
    let before = global.len();

    let err = runtime_error(&mut runtime, "never-defined-anywhere");
    assert_eq!(err.kind, RuntimeErrorKind::UnboundVariable);
    let err = runtime_error(&mut runtime, "(set! never-defined-anywhere 1)");
    assert_eq!(err.kind, RuntimeErrorKind::UnboundVariable);

    assert_eq!(global.len(), before);
    assert!(!global.is_bound(&Symbol::intern("never-defined-anywhere")));
}

#[test]
fn runtime_usable_after_error() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(define x 1)").unwrap();
    let err = runtime_error(&mut runtime, "(car 5)");
    assert_eq!(err.kind, RuntimeErrorKind::InvalidType);
    assert_evaluates_to!(runtime, "x", "1");
}

#[test]
fn error_kinds() {
    let mut runtime = Runtime::new().unwrap();
    assert_eq!(runtime_error(&mut runtime, "(car 1 2)").kind, RuntimeErrorKind::NumArgs);
    assert_eq!(runtime_error(&mut runtime, "((lambda (x) x))").kind, RuntimeErrorKind::NumArgs);
    assert_eq!(runtime_error(&mut runtime, "(+ 1 'a)").kind, RuntimeErrorKind::InvalidType);
    assert_eq!(runtime_error(&mut runtime, "(1 2)").kind, RuntimeErrorKind::InvalidType);
    assert_eq!(runtime_error(&mut runtime, "(lambda)").kind, RuntimeErrorKind::BadSyntax);
    assert_eq!(runtime_error(&mut runtime, "(error \"boom\" 1)").kind, RuntimeErrorKind::UserError);
    assert_eq!(runtime_error(&mut runtime, "(quotient 1.5 1)").kind, RuntimeErrorKind::InvalidType);
}

#[test]
fn tail_calls_do_not_grow() {
    assert_evaluates_to!("(define (loop n) (if (= n 0) 'done (loop (- n 1))))
                          (loop 1000000)", "done");
}

#[test]
fn mutual_tail_calls() {
    assert_evaluates_to!("(define (my-even? n) (if (= n 0) #t (my-odd? (- n 1))))
                          (define (my-odd? n) (if (= n 0) #f (my-even? (- n 1))))
                          (my-even? 100001)", "#f");
}

#[test]
fn tail_calls_through_macros() {
    assert_evaluates_to!("(define (count-down n) (cond ((= n 0) 'done) (else (count-down (- n 1)))))
                          (count-down 100000)", "done");
}

#[test]
fn let_test() {
    assert_evaluates_to!("(let ((x 23) (y 42)) (+ x y))", "65");
    assert_evaluates_to!("(let* ((x 1) (y (+ x 1))) (* x y))", "2");
    assert_evaluates_to!("(letrec ((f (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))))) (f 5))", "120");
    assert_evaluates_to!("(let loop ((i 0) (acc '())) (if (= i 3) acc (loop (+ i 1) (cons i acc))))", "(2 1 0)");
}

#[test]
fn set_test() {
    assert_evaluates_to!("(let ((x 23)) (set! x 24) x)", "24");
}

#[test]
fn define_forms() {
    assert_evaluates_to!("(define (f . args) args) (f 1 2)", "(1 2)");
    assert_evaluates_to!("(define (f a . rest) rest) (f 1 2 3)", "(2 3)");
    assert_evaluates_to!("(define x) (define x 5) x", "5");
    assert_evaluates_to!("((lambda args (length args)) 1 2 3)", "3");
}

#[test]
fn procedure_names() {
    let mut runtime = Runtime::new().unwrap();
    let value = runtime.eval_str("(define square (lambda (x) (* x x))) square").unwrap();
    assert_eq!(format!("{:?}", value), "#<procedure square>");
    let value = runtime.eval_str("car").unwrap();
    assert_eq!(format!("{:?}", value), "#<primitive car>");
}

#[test]
fn macro_receives_unevaluated_forms() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(defmacro twice (x) (list '+ x x))").unwrap();
    assert_evaluates_to!(runtime, "(macroexpand '(twice (error \"boom\")))", "(+ (error \"boom\") (error \"boom\"))");
    assert_evaluates_to!(runtime, "(twice 21)", "42");

    let err = runtime_error(&mut runtime, "(twice (error \"boom\"))");
    assert_eq!(err.kind, RuntimeErrorKind::UserError);
}

#[test]
fn macro_expand_from_host() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(defmacro swap! (a b) `(let ((tmp ,a)) (set! ,a ,b) (set! ,b tmp)))").unwrap();
    let form = Parser::new("(swap! x y)").parse_full().unwrap();
    let expected = Parser::new("(let ((tmp x)) (set! x y) (set! y tmp))").parse_full().unwrap();
    assert_eq!(runtime.macro_expand(&form), Ok(expected));

    let plain = Parser::new("(+ 1 2)").parse_full().unwrap();
    assert_eq!(runtime.macro_expand(&plain), Ok(plain.clone()));

    assert_evaluates_to!(runtime, "(define x 1) (define y 2) (swap! x y) (list x y)", "(2 1)");
}

#[test]
fn variadic_macro() {
    assert_evaluates_to!("(defmacro my-list args (cons 'list args)) (my-list 1 (+ 1 1) 3)", "(1 2 3)");
    assert_evaluates_to!("(defmacro first-of (a . rest) a) (first-of 7 (error \"unused\"))", "7");
}

#[test]
fn macro_is_not_a_procedure() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(defmacro twice (x) (list '+ x x))").unwrap();
    let err = runtime_error(&mut runtime, "(apply twice '(1))");
    assert_eq!(err.kind, RuntimeErrorKind::InvalidType);
    assert_evaluates_to!(runtime, "(macro? twice)", "#t");
    assert_evaluates_to!(runtime, "(procedure? twice)", "#f");
}

#[test]
fn runtime_starts() {
    assert!(Runtime::new().is_ok());
}

#[test]
fn macro_operands_are_not_compiled() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(defmacro inc! (v) `(set! ,v (+ ,v 1)))").unwrap();
    assert_evaluates_to!(runtime, "(define x 1) (inc! x) (inc! x) x", "3");
    assert_evaluates_to!(runtime, "(defmacro quoted-set (form) (list 'quote form)) (quoted-set (set! 1))", "(set! 1)");
}

#[test]
fn malformed_operand_of_application() {
    let mut runtime = Runtime::new().unwrap();
    assert_eq!(runtime_error(&mut runtime, "(car (lambda))").kind, RuntimeErrorKind::BadSyntax);
    assert_eq!(runtime_error(&mut runtime, "(list 1 (set! 2 3))").kind, RuntimeErrorKind::BadSyntax);
    // Operands to the left are evaluated before the error is raised
    runtime.eval_str("(define hits 0)").unwrap();
    runtime_error(&mut runtime, "(list (set! hits 1) (if))");
    assert_evaluates_to!(runtime, "hits", "1");
}

#[test]
fn expansion_runs_once_per_site() {
    let mut runtime = Runtime::new().unwrap();
    runtime.eval_str("(define expansions 0)
                      (defmacro counted (x) (set! expansions (+ expansions 1)) x)
                      (define (f y) (counted y))").unwrap();
    assert_evaluates_to!(runtime, "(list (f 1) (f 2) (f 3))", "(1 2 3)");
    assert_evaluates_to!(runtime, "expansions", "1");

    // Redefining the macro invalidates the cached expansion
    runtime.eval_str("(defmacro counted (x) (set! expansions (+ expansions 1)) (list '* x 10))").unwrap();
    assert_evaluates_to!(runtime, "(list (f 1) (f 2))", "(10 20)");
    assert_evaluates_to!(runtime, "expansions", "2");
}

#[test]
fn long_lists() {
    let mut runtime = Runtime::new().unwrap();
    assert_evaluates_to!(runtime, "(length (range 1 100000))", "100000");
    assert_evaluates_to!(runtime, "(define big (range 1 1000000)) (length big)", "1000000");
    assert_evaluates_to!(runtime, "(set! big #f) (length (range 1 10))", "10");
}

#[test]
fn quasiquote_test() {
    assert_evaluates_to!("(let ((x 1) (xs '(2 3))) `(a ,x ,@xs b))", "(a 1 2 3 b)");
    assert_evaluates_to!("`(1 . ,(+ 1 1))", "(1 . 2)");
    assert_evaluates_to!("(let ((x 5)) `#(a ,x))", "#(a 5)");
    assert_evaluates_to!("`()", "()");
}

#[test]
fn boolean_macros() {
    assert_evaluates_to!("(and)", "#t");
    assert_evaluates_to!("(and 1 2)", "2");
    assert_evaluates_to!("(and 1 #f (error \"unreachable\"))", "#f");
    assert_evaluates_to!("(or)", "#f");
    assert_evaluates_to!("(or #f 2 (error \"unreachable\"))", "2");
    assert_evaluates_to!("(or #f #f)", "#f");
    assert_evaluates_to!("(aif (memq 'b '(a b c)) (car it) 'none)", "b");
    assert_evaluates_to!("(awhen (assq 'k '((k . 1))) (cdr it))", "1");
}

#[test]
fn conditional_macros() {
    assert_evaluates_to!("(cond ((= 1 2) 'a) ((= 1 1) 'b) (else 'c))", "b");
    assert_evaluates_to!("(cond (#f 1) (else 2 3))", "3");
    assert_evaluates_to!("(cond ((assv 2 '((1 . a) (2 . b)))))", "(2 . b)");
    assert_evaluates_to!("(case (* 2 3) ((2 3 5 7) 'prime) ((1 4 6 8 9) 'composite))", "composite");
    assert_evaluates_to!("(case 'x ((a) 1) (else 2))", "2");
    assert_evaluates_to!("(when (> 1 0) 'a 'b)", "b");
    assert_evaluates_to!("(unless (> 1 0) 'a)", "#f");
}

#[test]
fn loop_macros() {
    assert_evaluates_to!("(define total 0) (dotimes (i 5) (set! total (+ total i))) total", "10");
    assert_evaluates_to!("(define acc '()) (dolist (x '(1 2 3)) (set! acc (cons x acc))) acc", "(3 2 1)");
}

#[test]
fn promises() {
    assert_evaluates_to!("(define n 0)
                          (define p (delay (begin (set! n (+ n 1)) n)))
                          (force p) (force p)
                          n", "1");
    assert_evaluates_to!("(force (delay (* 6 7)))", "42");
}

#[test]
fn list_library() {
    assert_evaluates_to!("(list 1 2 3)", "(1 2 3)");
    assert_evaluates_to!("(length '(1 2 3))", "3");
    assert_evaluates_to!("(append '(1) '(2 3) '() '(4))", "(1 2 3 4)");
    assert_evaluates_to!("(append)", "()");
    assert_evaluates_to!("(append '(1) 2)", "(1 . 2)");
    assert_evaluates_to!("(reverse '(1 2 3))", "(3 2 1)");
    assert_evaluates_to!("(list-tail '(1 2 3) 1)", "(2 3)");
    assert_evaluates_to!("(list-ref '(a b c) 2)", "c");
    assert_evaluates_to!("(last-pair '(1 2 3))", "(3)");
    assert_evaluates_to!("(last '(1 2 3))", "3");
    assert_evaluates_to!("(dotted-list? '(1 2 . 3))", "#t");
    assert_evaluates_to!("(dotted-list? '(1 2))", "#f");
    assert_evaluates_to!("(make-proper-list '(1 2 . 3))", "(1 2 3)");
    assert_evaluates_to!("(fold cons '() '(1 2 3))", "(3 2 1)");
    assert_evaluates_to!("(reduce + 0 '(1 2 3 4))", "10");
    assert_evaluates_to!("(reduce + 0 '())", "0");
    assert_evaluates_to!("(map (lambda (x) (* x x)) '(1 2 3))", "(1 4 9)");
    assert_evaluates_to!("(map + '(1 2 3) '(10 20 30))", "(11 22 33)");
    assert_evaluates_to!("(filter odd? (range 1 6))", "(1 3 5)");
    assert_evaluates_to!("(range 3 5)", "(3 4 5)");
    assert_evaluates_to!("(every positive? '(1 2))", "#t");
    assert_evaluates_to!("(any negative? '(1 2))", "#f");
    assert_evaluates_to!("(find even? '(1 3 4 5))", "4");
    assert_evaluates_to!("(find-tail even? '(1 3 4 5))", "(4 5)");
    assert_evaluates_to!("(take '(1 2 3 4) 2)", "(1 2)");
    assert_evaluates_to!("(drop '(1 2 3 4) 2)", "(3 4)");
    assert_evaluates_to!("(take-while odd? '(1 3 4 5))", "(1 3)");
    assert_evaluates_to!("(drop-while odd? '(1 3 4 5))", "(4 5)");
    assert_evaluates_to!("(memq 'c '(a b c d))", "(c d)");
    assert_evaluates_to!("(member '(1) '((0) (1) (2)))", "((1) (2))");
    assert_evaluates_to!("(assv 2 '((1 . a) (2 . b)))", "(2 . b)");
    assert_evaluates_to!("(assoc \"b\" '((\"a\" . 1) (\"b\" . 2)))", "(\"b\" . 2)");
    assert_evaluates_to!("(cadr '(1 2 3))", "2");
    assert_evaluates_to!("(cddddr '(1 2 3 4 5))", "(5)");
    assert_evaluates_to!("(apply + 1 2 '(3 4))", "10");
    assert_evaluates_to!("((flip cons) 1 2)", "(2 . 1)");
}

#[test]
fn for_each_visits_in_order() {
    assert_evaluates_to!("(define seen '())
                          (for-each (lambda (x) (set! seen (cons x seen))) '(1 2 3))
                          seen", "(3 2 1)");
}

#[test]
fn numeric_library() {
    assert_evaluates_to!("(abs -5)", "5");
    assert_evaluates_to!("(abs -1/2)", "1/2");
    assert_evaluates_to!("(gcd 12 18)", "6");
    assert_evaluates_to!("(gcd)", "0");
    assert_evaluates_to!("(lcm 4 6)", "12");
    assert_evaluates_to!("(min 3 1 2)", "1");
    assert_evaluates_to!("(max 3 1 2)", "3");
    assert_evaluates_to!("(even? 10)", "#t");
    assert_evaluates_to!("(odd? 10)", "#f");
    assert_evaluates_to!("(zero? 0.0)", "#t");

    let mut runtime = Runtime::new().unwrap();
    assert_eq!(runtime_error(&mut runtime, "(min)").kind, RuntimeErrorKind::NumArgs);
}

#[test]
fn equality() {
    assert_evaluates_to!("(eq? 'a 'a)", "#t");
    assert_evaluates_to!("(eq? '(1) '(1))", "#f");
    assert_evaluates_to!("(eqv? 2 2)", "#t");
    assert_evaluates_to!("(eqv? 2 2.0)", "#f");
    assert_evaluates_to!("(eqv? 100000000000000000000 100000000000000000000)", "#t");
    assert_evaluates_to!("(equal? '(1 (2 #(3))) '(1 (2 #(3))))", "#t");
    assert_evaluates_to!("(equal? \"abc\" \"abc\")", "#t");
    assert_evaluates_to!("(equal? '(1 2) '(1 3))", "#f");
}

#[test]
fn char_library() {
    assert_evaluates_to!("(char<? #\\a #\\b)", "#t");
    assert_evaluates_to!("(char-ci=? #\\a #\\A)", "#t");
    assert_evaluates_to!("(char-upcase #\\a)", "#\\A");
    assert_evaluates_to!("(char-downcase #\\A)", "#\\a");
    assert_evaluates_to!("(char-alphabetic? #\\1)", "#f");
    assert_evaluates_to!("(char-numeric? #\\1)", "#t");
    assert_evaluates_to!("(char-whitespace? #\\tab)", "#t");
    assert_evaluates_to!("(char->integer #\\A)", "65");
    assert_evaluates_to!("(integer->char 97)", "#\\a");
}

#[test]
fn string_library() {
    assert_evaluates_to!("(string=? \"abc\" \"abc\")", "#t");
    assert_evaluates_to!("(string<? \"abc\" \"abd\")", "#t");
    assert_evaluates_to!("(string<? \"ab\" \"abc\")", "#t");
    assert_evaluates_to!("(string>? \"b\" \"abc\")", "#t");
    assert_evaluates_to!("(string-ci=? \"AbC\" \"abc\")", "#t");
    assert_evaluates_to!("(string->list \"abc\")", "(#\\a #\\b #\\c)");
    assert_evaluates_to!("(list->string '(#\\a #\\b))", "\"ab\"");
    assert_evaluates_to!("(string #\\x #\\y)", "\"xy\"");
    assert_evaluates_to!("(substring \"hello\" 1 3)", "\"el\"");
    assert_evaluates_to!("(string-append \"foo\" \"bar\" \"\")", "\"foobar\"");
    assert_evaluates_to!("(let ((s (make-string 3 #\\a))) (string-fill! s #\\z) s)", "\"zzz\"");
    assert_evaluates_to!("(let* ((a \"abc\") (b (string-copy a))) (string-set! b 0 #\\x) (list a b))",
                         "(\"abc\" \"xbc\")");
    assert_evaluates_to!("(symbol->string 'abc)", "\"abc\"");
    assert_evaluates_to!("(string->symbol \"abc\")", "abc");
}

#[test]
fn vector_library() {
    assert_evaluates_to!("(vector 1 2 3)", "#(1 2 3)");
    assert_evaluates_to!("(vector->list #(1 2))", "(1 2)");
    assert_evaluates_to!("(list->vector '(a b))", "#(a b)");
    assert_evaluates_to!("(let ((v (make-vector 2 0))) (vector-fill! v 7) v)", "#(7 7)");
    assert_evaluates_to!("(vector-length (make-vector 4))", "4");
}

#[test]
fn eval_and_apply() {
    assert_evaluates_to!("(eval '(+ 1 2))", "3");
    assert_evaluates_to!("(eval (list 'define 'z 9)) z", "9");
    assert_evaluates_to!("(apply max '(3 9 2))", "9");
    assert_evaluates_to!("(apply (lambda (a b) (- a b)) '(10 3))", "7");
}

#[test]
fn gensym_is_unique() {
    assert_evaluates_to!("(eq? (gensym) (gensym))", "#f");
    assert_evaluates_to!("(symbol? (gensym))", "#t");
}

#[test]
fn cyclic_structures() {
    let mut runtime = Runtime::new().unwrap();
    let value = runtime.eval_str("(define l (list 1 2)) (set-cdr! (cdr l) l) l").unwrap();
    assert_eq!(format!("{:?}", value), "(1 2 . #<cycle>)");
    assert_evaluates_to!(runtime, "(car (cddr l))", "1");
}

#[test]
fn eval_str_returns_last_value() {
    let mut runtime = Runtime::new().unwrap();
    assert_eq!(runtime.eval_str(""), Ok(Datum::Unspecified));
    assert_eq!(runtime.eval_str("(define a 1)"), Ok(Datum::Unspecified));
    assert_evaluates_to!(runtime, "1 2 3", "3");
    match runtime.eval_str("(+ 1") {
        Err(EvalError::Parser(e)) => assert!(e.is_incomplete()),
        other => panic!("unexpected {:?}", other),
    }
}
