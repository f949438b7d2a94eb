//! Test and describe execution.

mod common;

use ast::build::*;
use common::interpreter;
use vm::ExecutionError;

fn bump_and_check() -> Vec<ast::Tree> {
    vec![
        assign("counter", send(reference("counter"), "+", vec![number(1.0)])),
        send(
            reference("assert"),
            "equals",
            vec![number(1.0), reference("counter")],
        ),
    ]
}

#[test]
fn tests_do_not_see_each_other() {
    let interpreter = interpreter(vec![
        var("counter", number(0.0)),
        test("first", bump_and_check()),
        test("second", bump_and_check()),
    ]);
    let report = interpreter.run_tests().unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 2);
    assert!(report.is_success());
}

#[test]
fn failures_are_reported_by_name() {
    let interpreter = interpreter(vec![
        test("passes", vec![send(reference("assert"), "that", vec![boolean(true)])]),
        test("fails", vec![send(reference("assert"), "that", vec![boolean(false)])]),
        test("crashes", vec![send(number(1.0), "explode", vec![])]),
    ]);
    let report = interpreter.run_tests().unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 1);
    let names: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["p.fails", "p.crashes"]);
    assert_eq!(
        report.failures[0].error,
        ExecutionError::UnhandledException {
            module: "wollok.lib.AssertionException".into(),
            message: "Value was not true".into(),
        }
    );
}

#[test]
fn describes_run_fixtures_before_each_test() {
    let check = |expected: f64| {
        send(
            reference("assert"),
            "equals",
            vec![number(expected), reference("x")],
        )
    };
    let interpreter = interpreter(vec![describe(
        "counting",
        vec![
            var("x", number(0.0)),
            fixture(vec![assign("x", number(5.0))]),
            test("starts at five", vec![check(5.0)]),
            test(
                "increments",
                vec![
                    assign("x", send(reference("x"), "+", vec![number(1.0)])),
                    check(6.0),
                ],
            ),
            test("is fresh again", vec![check(5.0)]),
        ],
    )]);
    let report = interpreter.run_tests().unwrap();
    assert_eq!(report.failures, vec![]);
    assert_eq!(report.passed, 3);
}

#[test]
fn describe_methods_are_callable_from_tests() {
    let interpreter = interpreter(vec![describe(
        "helpers",
        vec![
            method("two", &[], vec![ret(number(2.0))]),
            test(
                "uses a helper",
                vec![send(
                    reference("assert"),
                    "equals",
                    vec![number(2.0), send(self_ref(), "two", vec![])],
                )],
            ),
        ],
    )]);
    let report = interpreter.run_tests().unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
}
