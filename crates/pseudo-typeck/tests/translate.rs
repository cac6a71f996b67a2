//! Integration tests for function inference and IR shape.
//!
//! These tests exercise:
//! - Lazy inference of functions from the argument types of their first call
//! - Constants, builtin calls and the standard method tables
//! - Refinement of empty containers through later calls
//! - Loops, comprehensions, file blocks and imported namespaces

use pseudo_syntax::build::*;
use pseudo_syntax::{BinOp, CmpOp};
use pseudo_typeck::{ir, TranslateError};
use serde_json::{json, Value};

// ── Helpers ────────────────────────────────────────────────────────────

fn translate(body: Vec<pseudo_syntax::Stmt>) -> Result<ir::Module, TranslateError> {
    pseudo_typeck::translate(&module(body), "")
}

/// Translate and serialize, failing the test on any error.
fn ir_of(body: Vec<pseudo_syntax::Stmt>) -> Value {
    let module = translate(body).unwrap_or_else(|e| panic!("expected a translation, got: {}", e));
    serde_json::to_value(&module).unwrap()
}

// ── Functions ──────────────────────────────────────────────────────────

/// A function is typed by its only call site.
#[test]
fn test_function_inferred_from_call() {
    let out = ir_of(vec![
        def("x", &["a"], vec![ret(int(42))]),
        expr(call(name("x"), vec![int(0)])),
    ]);

    assert_eq!(
        out["definitions"],
        json!([{
            "type": "function_definition",
            "name": "x",
            "params": ["a"],
            "block": [{
                "type": "implicit_return",
                "value": {"type": "int", "value": 42, "pseudo_type": "Int"},
                "pseudo_type": "Int"
            }],
            "pseudo_type": ["Function", "Int", "Int"],
            "return_type": "Int"
        }])
    );
    assert_eq!(
        out["main"],
        json!([{
            "type": "call",
            "function": {"type": "local", "name": "x", "pseudo_type": ["Function", "Int", "Int"]},
            "args": [{"type": "int", "value": 0, "pseudo_type": "Int"}],
            "pseudo_type": "Int"
        }])
    );
    assert_eq!(out["type"], "module");
    assert_eq!(out["dependencies"], json!([]));
}

/// Functions without parameters are translated even when never called.
#[test]
fn test_zero_arg_function_needs_no_call() {
    let out = ir_of(vec![def("answer", &[], vec![ret(int(42))])]);
    assert_eq!(out["definitions"][0]["pseudo_type"], json!(["Function", "Int"]));
    assert_eq!(out["definitions"][0]["return_type"], "Int");
    assert_eq!(out["main"], json!([]));
}

/// A body without a return is Void.
#[test]
fn test_function_without_return_is_void() {
    let out = ir_of(vec![
        def("show", &["s"], vec![expr(call(name("print"), vec![name("s")]))]),
        expr(call(name("show"), vec![string("hi")])),
    ]);
    assert_eq!(out["definitions"][0]["pseudo_type"], json!(["Function", "String", "Void"]));
    assert_eq!(
        out["definitions"][0]["block"][0],
        json!({
            "type": "standard_call",
            "namespace": "io",
            "function": "display",
            "args": [{"type": "local", "name": "s", "pseudo_type": "String"}],
            "pseudo_type": "Void"
        })
    );
}

/// The recursive call comes after the base case fixed the return type.
#[test]
fn test_recursion_after_base_case() {
    let n = || name("n");
    let out = ir_of(vec![
        def(
            "fib",
            &["n"],
            vec![
                if_(cmp(n(), CmpOp::Lt, int(2)), vec![ret(n())], vec![]),
                ret(binop(
                    call(name("fib"), vec![binop(n(), BinOp::Sub, int(1))]),
                    BinOp::Add,
                    call(name("fib"), vec![binop(n(), BinOp::Sub, int(2))]),
                )),
            ],
        ),
        expr(call(name("fib"), vec![int(10)])),
    ]);

    let fib = &out["definitions"][0];
    assert_eq!(fib["pseudo_type"], json!(["Function", "Int", "Int"]));
    assert_eq!(fib["block"][0]["type"], "if_statement");
    assert_eq!(fib["block"][0]["block"][0]["type"], "explicit_return");
    assert_eq!(fib["block"][1]["type"], "implicit_return");
    assert_eq!(fib["block"][1]["value"]["type"], "binary_op");
    assert_eq!(fib["block"][1]["value"]["op"], "+");
}

/// A later call with a narrower argument still matches.
#[test]
fn test_int_argument_widens_to_float_param() {
    let out = ir_of(vec![
        def("half", &["x"], vec![ret(binop(name("x"), BinOp::Div, float(2.0)))]),
        expr(call(name("half"), vec![float(3.0)])),
        expr(call(name("half"), vec![int(3)])),
    ]);
    assert_eq!(out["definitions"][0]["pseudo_type"], json!(["Function", "Float", "Float"]));
    assert_eq!(out["main"][1]["pseudo_type"], "Float");
}

// ── Constants and builtins ─────────────────────────────────────────────

#[test]
fn test_constants_are_hoisted() {
    let out = ir_of(vec![
        let_("LIMIT", int(2)),
        expr(call(name("print"), vec![name("LIMIT")])),
    ]);
    assert_eq!(
        out["constants"],
        json!([{
            "type": "constant",
            "constant": "LIMIT",
            "init": {"type": "int", "value": 2, "pseudo_type": "Int"},
            "pseudo_type": "Int"
        }])
    );
    assert_eq!(out["main"][0]["args"][0], json!({"type": "local", "name": "LIMIT", "pseudo_type": "Int"}));
}

/// `+` on strings has no primitive form and becomes a method call.
#[test]
fn test_string_concat_is_a_standard_method_call() {
    let out = ir_of(vec![let_("s", binop(string("a"), BinOp::Add, string("b")))]);
    assert_eq!(
        out["main"][0],
        json!({
            "type": "local_assignment",
            "local": "s",
            "value": {
                "type": "standard_method_call",
                "receiver": {"type": "string", "value": "a", "pseudo_type": "String"},
                "message": "concat",
                "args": [{"type": "string", "value": "b", "pseudo_type": "String"}],
                "pseudo_type": "String"
            },
            "value_type": "String",
            "pseudo_type": "Void"
        })
    );
}

#[test]
fn test_arithmetic_widens_to_float() {
    let out = ir_of(vec![let_("y", binop(int(1), BinOp::Add, float(0.5)))]);
    assert_eq!(out["main"][0]["value"]["type"], "binary_op");
    assert_eq!(out["main"][0]["value_type"], "Float");
}

#[test]
fn test_len_becomes_length() {
    let out = ir_of(vec![
        let_("xs", list(vec![int(1), int(2)])),
        let_("n", call(name("len"), vec![name("xs")])),
    ]);
    let value = &out["main"][1]["value"];
    assert_eq!(value["type"], "standard_method_call");
    assert_eq!(value["message"], "length");
    assert_eq!(value["receiver"]["pseudo_type"], json!(["List", "Int"]));
    assert_eq!(value["pseudo_type"], "Int");
}

/// An empty list takes its element type from the first push.
#[test]
fn test_empty_list_is_refined_by_append() {
    let out = ir_of(vec![
        let_("xs", list(vec![])),
        expr(method(name("xs"), "append", vec![int(1)])),
        let_("y", index(name("xs"), int(0))),
    ]);
    assert_eq!(out["main"][0]["value_type"], json!(["List", null]));
    assert_eq!(
        out["main"][1],
        json!({
            "type": "standard_method_call",
            "receiver": {"type": "local", "name": "xs", "pseudo_type": ["List", "Int"]},
            "message": "push",
            "args": [{"type": "int", "value": 1, "pseudo_type": "Int"}],
            "pseudo_type": "Void"
        })
    );
    assert_eq!(out["main"][2]["value_type"], "Int");
}

#[test]
fn test_homogeneous_tuple_is_an_array() {
    let out = ir_of(vec![let_("t", tuple(vec![int(1), int(2), int(3)]))]);
    assert_eq!(out["main"][0]["value"]["type"], "array");
    assert_eq!(out["main"][0]["value_type"], json!(["Array", "Int", 3]));
}

#[test]
fn test_mixed_tuple_stays_a_tuple() {
    let out = ir_of(vec![let_("t", tuple(vec![int(1), string("a")]))]);
    assert_eq!(out["main"][0]["value"]["type"], "tuple");
    assert_eq!(out["main"][0]["value_type"], json!(["Tuple", "Int", "String"]));
}

/// Widening runs left to right only: an Int after a Float does not join it.
#[test]
fn test_float_then_int_tuple_stays_a_tuple() {
    let out = ir_of(vec![let_("t", tuple(vec![float(2.5), int(1)]))]);
    assert_eq!(out["main"][0]["value"]["type"], "tuple");
    assert_eq!(out["main"][0]["value_type"], json!(["Tuple", "Float", "Int"]));
}

#[test]
fn test_int_then_float_tuple_widens_to_array() {
    let out = ir_of(vec![let_("t", tuple(vec![int(1), float(2.5)]))]);
    assert_eq!(out["main"][0]["value"]["type"], "array");
    assert_eq!(out["main"][0]["value_type"], json!(["Array", "Float", 2]));
}

#[test]
fn test_float_list_accepts_int_elements() {
    let out = ir_of(vec![let_("xs", list(vec![float(2.5), int(1)]))]);
    assert_eq!(out["main"][0]["value_type"], json!(["List", "Float"]));
}

#[test]
fn test_dictionary_literal() {
    let out = ir_of(vec![let_("d", dict(vec![(string("a"), int(1))]))]);
    assert_eq!(out["main"][0]["value_type"], json!(["Dictionary", "String", "Int"]));
    assert_eq!(out["main"][0]["value"]["pairs"][0]["type"], "pair");
}

// ── Loops and comprehensions ───────────────────────────────────────────

#[test]
fn test_for_range_defaults() {
    let out = ir_of(vec![for_(
        name("i"),
        call(name("range"), vec![int(3)]),
        vec![expr(call(name("print"), vec![name("i")]))],
    )]);
    let stmt = &out["main"][0];
    assert_eq!(stmt["type"], "for_range_statement");
    assert_eq!(stmt["start"], json!({"type": "int", "value": 0, "pseudo_type": "Int"}));
    assert_eq!(stmt["end"], json!({"type": "int", "value": 3, "pseudo_type": "Int"}));
    assert_eq!(stmt["step"], json!({"type": "int", "value": 1, "pseudo_type": "Int"}));
    assert_eq!(stmt["index"], json!({"type": "local", "name": "i", "pseudo_type": "Int"}));
}

/// The loop variable leaves scope with its loop, so it can be reused.
#[test]
fn test_loop_variable_is_scoped_to_its_loop() {
    let body = || vec![expr(call(name("print"), vec![name("i")]))];
    let out = ir_of(vec![
        for_(name("i"), call(name("range"), vec![int(3)]), body()),
        for_(name("i"), call(name("range"), vec![int(1), int(4)]), body()),
    ]);
    assert_eq!(out["main"][1]["start"]["value"], 1);
}

#[test]
fn test_for_over_dictionary_items() {
    let out = ir_of(vec![
        let_("d", dict(vec![(string("a"), float(1.5))])),
        for_(
            tuple(vec![name("k"), name("v")]),
            method(name("d"), "items", vec![]),
            vec![expr(call(name("print"), vec![name("k"), name("v")]))],
        ),
    ]);
    let stmt = &out["main"][1];
    assert_eq!(stmt["type"], "for_statement");
    assert_eq!(stmt["sequences"]["type"], "for_sequence_with_items");
    assert_eq!(
        stmt["iterators"],
        json!({
            "type": "for_iterator_with_items",
            "key": {"type": "local", "name": "k", "pseudo_type": "String"},
            "value": {"type": "local", "name": "v", "pseudo_type": "Float"}
        })
    );
}

#[test]
fn test_enumerate_binds_index() {
    let out = ir_of(vec![
        let_("xs", list(vec![string("a")])),
        for_(
            tuple(vec![name("i"), name("x")]),
            call(name("enumerate"), vec![name("xs")]),
            vec![expr(call(name("print"), vec![name("i"), name("x")]))],
        ),
    ]);
    let stmt = &out["main"][1];
    assert_eq!(stmt["sequences"]["type"], "for_sequence_with_index");
    assert_eq!(stmt["iterators"]["index"]["pseudo_type"], "Int");
    assert_eq!(stmt["iterators"]["iterator"]["pseudo_type"], "String");
}

#[test]
fn test_while_with_break() {
    let out = ir_of(vec![
        let_("n", int(0)),
        while_(
            cmp(name("n"), CmpOp::Lt, int(10)),
            vec![
                aug_assign(name("n"), BinOp::Add, int(1)),
                if_(cmp(name("n"), CmpOp::Eq, int(5)), vec![break_()], vec![]),
            ],
        ),
    ]);
    let stmt = &out["main"][1];
    assert_eq!(stmt["type"], "while_statement");
    assert_eq!(stmt["block"][0]["type"], "local_assignment");
    assert_eq!(stmt["block"][1]["block"][0], json!({"type": "break", "pseudo_type": "Void"}));
}

#[test]
fn test_list_comprehension_is_a_map() {
    let out = ir_of(vec![
        let_("xs", list(vec![int(1), int(2)])),
        let_(
            "ys",
            list_comp(binop(name("x"), BinOp::Mult, int(2)), name("x"), name("xs"), vec![]),
        ),
    ]);
    let value = &out["main"][1]["value"];
    assert_eq!(value["type"], "standard_iterable_call");
    assert_eq!(value["function"], "map");
    assert_eq!(value["sequences"]["type"], "for_sequence");
    assert_eq!(value["iterators"]["iterator"], json!({"type": "local", "name": "x", "pseudo_type": "Int"}));
    assert!(value.get("test").is_none());
    assert_eq!(value["pseudo_type"], json!(["List", "Int"]));
}

#[test]
fn test_filtered_comprehension_is_a_filter_map() {
    let out = ir_of(vec![
        let_("xs", list(vec![int(1), int(2)])),
        let_(
            "ys",
            list_comp(
                call(name("str"), vec![name("x")]),
                name("x"),
                name("xs"),
                vec![cmp(name("x"), CmpOp::Gt, int(1))],
            ),
        ),
    ]);
    let value = &out["main"][1]["value"];
    assert_eq!(value["function"], "filter_map");
    assert_eq!(value["test"]["type"], "comparison");
    assert_eq!(value["pseudo_type"], json!(["List", "String"]));
}

// ── Namespaces and files ───────────────────────────────────────────────

#[test]
fn test_library_call_records_dependency() {
    let out = ir_of(vec![
        import("math"),
        let_("r", call(attr(name("math"), "sqrt"), vec![int(2)])),
    ]);
    assert_eq!(out["dependencies"], json!(["math"]));
    assert_eq!(
        out["main"][0]["value"],
        json!({
            "type": "standard_call",
            "namespace": "math",
            "function": "sqrt",
            "args": [{"type": "int", "value": 2, "pseudo_type": "Int"}],
            "pseudo_type": "Float"
        })
    );
}

/// Importing without using leaves the dependency list empty.
#[test]
fn test_unused_import_is_not_a_dependency() {
    let out = ir_of(vec![import("math"), let_("x", int(1))]);
    assert_eq!(out["dependencies"], json!([]));
}

#[test]
fn test_with_open_reads_whole_file() {
    let out = ir_of(vec![with_(
        call(name("open"), vec![string("notes.txt"), string("r")]),
        Some("f"),
        vec![let_("text", method(name("f"), "read", vec![]))],
    )]);
    assert_eq!(
        out["main"][0],
        json!({
            "type": "local_assignment",
            "local": "text",
            "value": {
                "type": "standard_call",
                "namespace": "io",
                "function": "read_file",
                "args": [{"type": "string", "value": "notes.txt", "pseudo_type": "String"}],
                "pseudo_type": "String"
            },
            "value_type": "String",
            "pseudo_type": "Void"
        })
    );
}

// ── Operators and conditions ───────────────────────────────────────────

/// `a < b < c` becomes two comparisons joined by `and`.
#[test]
fn test_chained_comparison() {
    let out = ir_of(vec![
        let_("x", int(2)),
        let_("ok", compare(int(1), vec![(CmpOp::Lt, name("x")), (CmpOp::Lt, int(3))])),
    ]);
    let value = &out["main"][1]["value"];
    assert_eq!(value["type"], "binary_op");
    assert_eq!(value["op"], "and");
    assert_eq!(value["left"]["op"], "<");
    assert_eq!(value["right"]["left"], json!({"type": "local", "name": "x", "pseudo_type": "Int"}));
    assert_eq!(value["pseudo_type"], "Boolean");
}

/// Non-boolean conditions are rewritten to an explicit test.
#[test]
fn test_sized_condition_tests_length() {
    let out = ir_of(vec![
        let_("xs", list(vec![int(1)])),
        if_(name("xs"), vec![expr(call(name("print"), vec![name("xs")]))], vec![]),
    ]);
    let test = &out["main"][1]["test"];
    assert_eq!(test["type"], "comparison");
    assert_eq!(test["op"], ">");
    assert_eq!(test["left"]["message"], "length");
    assert_eq!(test["right"], json!({"type": "int", "value": 0, "pseudo_type": "Int"}));
}

#[test]
fn test_elif_chain() {
    let n = || name("n");
    let show = |s: &str| vec![expr(call(name("print"), vec![string(s)]))];
    let out = ir_of(vec![
        let_("n", int(3)),
        if_(
            cmp(n(), CmpOp::Lt, int(0)),
            show("negative"),
            vec![if_(cmp(n(), CmpOp::Eq, int(0)), show("zero"), show("positive"))],
        ),
    ]);
    let stmt = &out["main"][1];
    assert_eq!(stmt["type"], "if_statement");
    assert_eq!(stmt["otherwise"]["type"], "elseif_statement");
    assert_eq!(stmt["otherwise"]["otherwise"]["type"], "else_statement");
    assert_eq!(stmt["otherwise"]["otherwise"]["block"][0]["args"][0]["value"], "positive");
}

#[test]
fn test_string_format_wraps_argument() {
    let out = ir_of(vec![let_("s", binop(string("hi %s"), BinOp::Mod, string("bob")))]);
    let value = &out["main"][0]["value"];
    assert_eq!(value["type"], "standard_method_call");
    assert_eq!(value["message"], "c_format");
    assert_eq!(value["args"][0]["type"], "array");
    assert_eq!(value["args"][0]["pseudo_type"], json!(["Array", "String", 1]));
}

/// `sep.join(items)` is a method of the list, not of the separator.
#[test]
fn test_join_swaps_receiver() {
    let out = ir_of(vec![
        let_("xs", list(vec![string("a"), string("b")])),
        let_("s", method(string(", "), "join", vec![name("xs")])),
    ]);
    let value = &out["main"][1]["value"];
    assert_eq!(value["receiver"]["name"], "xs");
    assert_eq!(value["message"], "join");
    assert_eq!(value["args"][0]["value"], ", ");
    assert_eq!(value["pseudo_type"], "String");
}

#[test]
fn test_slice_of_list() {
    let out = ir_of(vec![
        let_("xs", list(vec![int(1), int(2), int(3)])),
        let_("tail", slice(name("xs"), Some(int(1)), None)),
    ]);
    let value = &out["main"][1]["value"];
    assert_eq!(value["type"], "standard_method_call");
    assert_eq!(value["message"], "slice_from");
    assert_eq!(value["pseudo_type"], json!(["List", "Int"]));
}

#[test]
fn test_index_assignment_on_dictionary() {
    let out = ir_of(vec![
        let_("d", dict(vec![])),
        assign(index(name("d"), string("k")), int(1)),
        let_("v", index(name("d"), string("k"))),
    ]);
    assert_eq!(out["main"][1]["type"], "index_assignment");
    assert_eq!(out["main"][1]["sequence"]["pseudo_type"], json!(["Dictionary", "String", "Int"]));
    assert_eq!(out["main"][2]["value_type"], "Int");
}

/// A compiled pattern matched in a condition becomes a `has_match` test.
#[test]
fn test_regex_match_condition() {
    let out = ir_of(vec![
        import("re"),
        let_("m", call(attr(name("re"), "match"), vec![string("[a-z]+"), string("abc")])),
        if_(name("m"), vec![pass()], vec![]),
    ]);
    assert_eq!(out["dependencies"], json!(["re"]));
    let value = &out["main"][0]["value"];
    assert_eq!(value["receiver"], json!({"type": "regex", "value": "[a-z]+", "pseudo_type": "Regexp"}));
    assert_eq!(value["pseudo_type"], "RegexpMatch");
    assert_eq!(out["main"][1]["test"]["message"], "has_match");
}

// ── Configuration ──────────────────────────────────────────────────────

#[test]
fn test_overrides_change_the_target_call() {
    let overrides = pseudo_typeck::ApiOverrides::from_str(
        r#"
[functions.math.sqrt]
function = "square_root"
signature = ["Number", "Float"]
"#,
    )
    .unwrap();
    let api = pseudo_typeck::ApiTables::standard().with_overrides(&overrides).unwrap();
    let options = pseudo_typeck::TranslateOptions::default().with_api(api);
    let module = module(vec![
        import("math"),
        let_("r", call(attr(name("math"), "sqrt"), vec![float(2.0)])),
    ]);
    let out = serde_json::to_value(pseudo_typeck::translate_with(&module, &options).unwrap()).unwrap();
    assert_eq!(out["main"][0]["value"]["function"], "square_root");
    assert_eq!(out["main"][0]["value_type"], "Float");
}
