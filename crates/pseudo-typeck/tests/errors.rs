//! Integration tests for rejected programs.
//!
//! Every test asserts the kind and message of the first error, which
//! aborts the whole unit.

use pseudo_syntax::build::*;
use pseudo_syntax::{BinOp, CmpOp, Pos};
use pseudo_typeck::{ErrorKind, TranslateError, Ty};

// ── Helpers ────────────────────────────────────────────────────────────

/// Translate `body` and return its error, failing the test on success.
fn error_of(body: Vec<pseudo_syntax::Stmt>) -> TranslateError {
    error_in(body, "")
}

fn error_in(body: Vec<pseudo_syntax::Stmt>, source: &str) -> TranslateError {
    match pseudo_typeck::translate(&module(body), source) {
        Ok(out) => panic!("expected an error, got: {:?}", out),
        Err(e) => e,
    }
}

fn assert_error(err: &TranslateError, kind: ErrorKind, message: &str) {
    assert_eq!(err.kind, kind, "unexpected kind for: {}", err.message);
    assert_eq!(err.message, message);
}

// ── Top level ──────────────────────────────────────────────────────────

#[test]
fn test_constant_after_code() {
    let err = error_of(vec![let_("x", int(1)), let_("K", int(2))]);
    assert_error(
        &err,
        ErrorKind::NotTranslatable,
        "constants must be initialized before all other top level code",
    );
    assert_eq!(err.right.as_deref(), Some("K = 2\ndef .."));
}

#[test]
fn test_constant_override() {
    let err = error_of(vec![let_("K", int(1)), let_("K", int(2))]);
    assert_error(&err, ErrorKind::TypeCheck, "you can't override a constant");
}

#[test]
fn test_constant_assigned_in_main() {
    let err = error_of(vec![
        let_("K", int(1)),
        let_("x", int(0)),
        let_("K", int(2)),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "you can't override a constant");
}

#[test]
fn test_constant_needs_literal() {
    let err = error_of(vec![let_("K", binop(int(1), BinOp::Add, int(2)))]);
    assert_error(
        &err,
        ErrorKind::NotTranslatable,
        "You can initialize constants only with literals",
    );
}

#[test]
fn test_mixed_case_name() {
    let err = error_of(vec![let_("myVar", int(1))]);
    assert_eq!(err.kind, ErrorKind::TypeCheck);
    assert!(err.message.starts_with("myVar is neither snake_case"), "{}", err.message);
}

#[test]
fn test_import_after_code() {
    let err = error_of(vec![let_("x", int(1)), import("math")]);
    assert_error(&err, ErrorKind::NotTranslatable, "imports can be only on top");
}

#[test]
fn test_unsupported_module() {
    let err = error_of(vec![import("socket")]);
    assert_error(&err, ErrorKind::NotTranslatable, "module socket is not supported");
    assert!(err.suggestion.as_deref().unwrap_or("").contains("math"));
}

#[test]
fn test_module_not_imported() {
    let err = error_of(vec![let_("r", call(attr(name("math"), "sqrt"), vec![int(2)]))]);
    assert_error(
        &err,
        ErrorKind::TypeCheck,
        "module math not imported: impossible to use math.sqrt",
    );
}

// ── Functions ──────────────────────────────────────────────────────────

/// A function that nothing calls has no evidence for its parameters.
#[test]
fn test_uncalled_function() {
    let err = error_of(vec![def("g", &["a"], vec![ret(name("a"))])]);
    assert_error(&err, ErrorKind::TypeCheck, "cannot infer the types of g");
}

#[test]
fn test_recursion_before_return() {
    let err = error_of(vec![
        def(
            "down",
            &["n"],
            vec![ret(call(name("down"), vec![binop(name("n"), BinOp::Sub, int(1))]))],
        ),
        expr(call(name("down"), vec![int(3)])),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "please move recursion in a next branch in down");
}

#[test]
fn test_float_argument_for_int_param() {
    let err = error_of(vec![
        def("f", &["a"], vec![ret(name("a"))]),
        expr(call(name("f"), vec![int(1)])),
        expr(call(name("f"), vec![float(1.5)])),
    ]);
    assert_eq!(err.kind, ErrorKind::TypeCheck);
    assert!(err.message.starts_with("can't convert f arg 0"), "{}", err.message);
}

#[test]
fn test_wrong_arity() {
    let err = error_of(vec![
        def("f", &["a"], vec![ret(name("a"))]),
        expr(call(name("f"), vec![int(1), int(2)])),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "f expects 1 args, not 2");
}

#[test]
fn test_inconsistent_return_types() {
    let err = error_of(vec![
        def(
            "pick",
            &["flag"],
            vec![
                if_(name("flag"), vec![ret(int(1))], vec![]),
                ret(string("no")),
            ],
        ),
        expr(call(name("pick"), vec![boolean(true)])),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "expected Int return type for pick");
    assert_eq!(err.wrong_type, Some(Ty::string()));
}

#[test]
fn test_default_arguments() {
    let mut stmt = def("f", &["a"], vec![ret(name("a"))]);
    if let pseudo_syntax::StmtKind::FunctionDef(def) = &mut stmt.kind {
        def.args.defaults.push(int(1));
    }
    let err = error_of(vec![stmt]);
    assert_error(&err, ErrorKind::NotTranslatable, "default arguments in f are not supported");
}

#[test]
fn test_keyword_arguments() {
    let err = error_of(vec![
        def("f", &["a"], vec![ret(name("a"))]),
        expr(call_kw(name("f"), vec![], vec![("a", int(1))])),
    ]);
    assert_error(&err, ErrorKind::NotTranslatable, "keyword arguments are not supported");
}

// ── Names and values ───────────────────────────────────────────────────

#[test]
fn test_undefined_name() {
    let err = error_of(vec![expr(call(name("print"), vec![name("ghost")]))]);
    assert_error(&err, ErrorKind::TypeCheck, "ghost is not defined");
}

#[test]
fn test_reassignment_with_another_type() {
    let err = error_of(vec![let_("x", int(1)), let_("x", string("a"))]);
    assert_error(
        &err,
        ErrorKind::TypeCheck,
        "can't change the type of variable x in global scope from Int to String",
    );
}

#[test]
fn test_mixed_list() {
    let err = error_of(vec![let_("xs", list(vec![int(1), string("a")]))]);
    assert_error(&err, ErrorKind::TypeCheck, "can't use different types in a list");
}

#[test]
fn test_int_list_rejects_float_element() {
    let err = error_of(vec![let_("xs", list(vec![int(1), float(2.5)]))]);
    assert_error(&err, ErrorKind::TypeCheck, "can't use different types in a list");
    assert_eq!(err.wrong_type, Some(Ty::float()));
}

#[test]
fn test_strict_comparison() {
    let err = error_of(vec![let_("b", cmp(int(1), CmpOp::Lt, string("a")))]);
    assert_error(&err, ErrorKind::TypeCheck, "Int not comparable with String");
}

#[test]
fn test_unsupported_comparison_operator() {
    let err = error_of(vec![
        let_("xs", list(vec![int(1)])),
        let_("b", cmp(int(1), CmpOp::In, name("xs"))),
    ]);
    assert_error(&err, ErrorKind::NotTranslatable, "comparison operator in is not supported");
}

#[test]
fn test_lambda() {
    let err = error_of(vec![let_("f", lambda(&["x"], name("x")))]);
    assert_error(&err, ErrorKind::NotTranslatable, "lambda is not supported");
}

#[test]
fn test_string_is_immutable() {
    let err = error_of(vec![
        let_("s", string("abc")),
        assign(index(name("s"), int(0)), string("z")),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "String is immutable");
}

#[test]
fn test_untestable_condition() {
    let err = error_of(vec![
        class("Box", None, vec![pass()]),
        let_("b", call(name("Box"), vec![])),
        if_(name("b"), vec![pass()], vec![]),
    ]);
    assert_eq!(err.kind, ErrorKind::TypeCheck);
    assert!(err.message.starts_with("expected a Boolean"), "{}", err.message);
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn test_break_outside_loop() {
    let err = error_of(vec![break_()]);
    assert_error(&err, ErrorKind::NotTranslatable, "break outside of a loop");
}

#[test]
fn test_return_outside_function() {
    let err = error_of(vec![ret(int(1))]);
    assert_error(&err, ErrorKind::NotTranslatable, "return outside of a function");
}

#[test]
fn test_range_with_float_bound() {
    let err = error_of(vec![for_(
        name("i"),
        call(name("range"), vec![float(1.5)]),
        vec![pass()],
    )]);
    assert_error(&err, ErrorKind::TypeCheck, "expected Int for range end");
    assert_eq!(err.wrong_type, Some(Ty::float()));
}

#[test]
fn test_range_outside_loop() {
    let err = error_of(vec![let_("r", call(name("range"), vec![int(3)]))]);
    assert_error(&err, ErrorKind::NotTranslatable, "range can be used only in a for loop");
}

#[test]
fn test_loop_variable_shadows_local() {
    let err = error_of(vec![
        let_("x", int(0)),
        let_("xs", list(vec![int(1)])),
        for_(name("x"), name("xs"), vec![pass()]),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "the loop variable x shadows a variable of global scope");
}

/// A function body sees module names, so its loops can't reuse them.
#[test]
fn test_loop_variable_in_function_shadows_module_name() {
    let err = error_of(vec![
        def(
            "f",
            &["n"],
            vec![for_(
                name("x"),
                call(name("range"), vec![name("n")]),
                vec![expr(call(name("print"), vec![name("x")]))],
            )],
        ),
        let_("x", string("outer")),
        expr(call(name("f"), vec![int(3)])),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "the loop variable x shadows a variable of global scope");
}

#[test]
fn test_loop_variable_shadows_parameter() {
    let err = error_of(vec![
        def(
            "f",
            &["n"],
            vec![for_(name("n"), call(name("range"), vec![int(3)]), vec![pass()])],
        ),
        expr(call(name("f"), vec![int(3)])),
    ]);
    assert_error(&err, ErrorKind::TypeCheck, "the loop variable n shadows a variable of f");
}

#[test]
fn test_iterating_a_number() {
    let err = error_of(vec![for_(name("x"), int(3), vec![pass()])]);
    assert_error(&err, ErrorKind::TypeCheck, "expected an iterable type, not Int");
}

// ── Locations ──────────────────────────────────────────────────────────

#[test]
fn test_error_carries_location_and_line() {
    let source = "x = 1\ny = ghost\n";
    let err = error_in(
        vec![
            let_("x", int(1)).at(1, 0),
            assign(name("y").at(2, 0), name("ghost").at(2, 4)).at(2, 0),
        ],
        source,
    );
    assert_eq!(err.location, Some(Pos::new(2, 4)));
    assert_eq!(err.source_line.as_deref(), Some("y = ghost"));
}
