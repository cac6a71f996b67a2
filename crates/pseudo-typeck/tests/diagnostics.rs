//! Snapshot tests for rendered translation errors.
//!
//! Each test triggers a specific error through a full translation and
//! renders it, either plain or against the source with ariadne.

use pseudo_syntax::build::*;
use pseudo_typeck::diagnostics::{render, render_plain};
use pseudo_typeck::TranslateError;

// ── Helpers ────────────────────────────────────────────────────────────

fn first_error(body: Vec<pseudo_syntax::Stmt>, source: &str) -> TranslateError {
    pseudo_typeck::translate(&module(body), source)
        .expect_err("expected the translation to fail")
}

// ── Plain rendering ────────────────────────────────────────────────────

#[test]
fn test_plain_undefined_name() {
    let source = "x = 1\ny = ghost\n";
    let err = first_error(
        vec![
            let_("x", int(1)).at(1, 0),
            assign(name("y").at(2, 0), name("ghost").at(2, 4)).at(2, 0),
        ],
        source,
    );
    insta::assert_snapshot!(render_plain(&err), @r"
    [P0002] type check error: ghost is not defined
      at 2:4
      | y = ghost
    ");
}

#[test]
fn test_plain_constant_order() {
    let source = "x = 1\nK = 2\n";
    let err = first_error(
        vec![
            let_("x", int(1)).at(1, 0),
            assign(name("K").at(2, 0), int(2).at(2, 4)).at(2, 0),
        ],
        source,
    );
    insta::assert_snapshot!(render_plain(&err), @r"
    [P0001] not translatable: constants must be initialized before all other top level code
      at 2:0
      | K = 2
      right:
        K = 2
        def ..
      wrong:
        def ..
        K = 2
    ");
}

#[test]
fn test_plain_unimported_module() {
    let source = "r = math.sqrt(2)\n";
    let err = first_error(
        vec![let_("r", call(attr(name("math").at(1, 4), "sqrt").at(1, 4), vec![int(2).at(1, 14)]).at(1, 4)).at(1, 0)],
        source,
    );
    insta::assert_snapshot!(render_plain(&err), @r"
    [P0002] type check error: module math not imported: impossible to use math.sqrt
      at 1:4
      | r = math.sqrt(2)
      help: add `import math` at the top of the file
    ");
}

// ── Source rendering ───────────────────────────────────────────────────

#[test]
fn test_render_points_at_offending_word() {
    let source = "def f(a):\n    return a\nf(1)\nf(2.5)\n";
    let err = first_error(
        vec![
            def("f", &["a"], vec![ret(name("a")).at(2, 4)]).at(1, 0),
            expr(call(name("f").at(3, 0), vec![int(1).at(3, 2)]).at(3, 0)).at(3, 0),
            expr(call(name("f").at(4, 0), vec![float(2.5).at(4, 2)]).at(4, 0)).at(4, 0),
        ],
        source,
    );
    let out = render(&err, source);
    assert!(out.contains("P0002"), "{out}");
    assert!(out.contains("can't convert f arg 0 from Float to Int"), "{out}");
    assert!(out.contains("f(2.5)"), "{out}");
}
