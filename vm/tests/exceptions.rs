//! Exceptions, `always` blocks and the faults the machine turns into
//! program exceptions.

mod common;

use ast::build::*;
use common::{println, run, run_with, value_of};
use vm::{EvaluationSettings, ExecutionError};

fn thrower() -> ast::Tree {
    class(
        "Thrower",
        vec![method(
            "boom",
            &[],
            vec![
                println(string("boom")),
                throw(new("Exception", vec![string("bad")])),
                println(string("unreachable")),
            ],
        )],
    )
}

#[test]
fn exceptions_unwind_to_the_nearest_handler() {
    let sentences = vec![
        try_always(
            vec![
                send(new("Thrower", vec![]), "boom", vec![]),
                println(string("after")),
            ],
            vec![catch(
                "e",
                "Exception",
                vec![println(send(
                    string("caught "),
                    "+",
                    vec![send(reference("e"), "message", vec![])],
                ))],
            )],
            vec![println(string("always"))],
        ),
        println(string("end")),
    ];
    let outcome = run(vec![thrower()], sentences).unwrap();
    assert_eq!(outcome.console, vec!["boom", "caught bad", "always", "end"]);
}

#[test]
fn handlers_are_tried_in_order() {
    let members = vec![class("Custom", vec![]).inherits("Exception")];
    let handled = |exception: &str| {
        vec![try_catch(
            vec![throw(new(exception, vec![]))],
            vec![
                catch("e", "Custom", vec![string("custom")]),
                catch("e", "Exception", vec![string("general")]),
            ],
        )]
    };
    assert_eq!(value_of(members.clone(), handled("Custom")), "custom");
    assert_eq!(value_of(members, handled("Exception")), "general");
}

#[test]
fn unmatched_exceptions_keep_propagating() {
    let members = vec![class("Custom", vec![]).inherits("Exception")];
    let sentences = vec![try_catch(
        vec![try_catch(
            vec![throw(new("Exception", vec![string("outer")]))],
            vec![catch("e", "Custom", vec![string("inner")])],
        )],
        vec![catch_any("e", vec![send(reference("e"), "message", vec![])])],
    )];
    assert_eq!(value_of(members, sentences), "outer");
}

#[test]
fn always_runs_when_returning() {
    let members = vec![class(
        "Early",
        vec![method(
            "m",
            &[],
            vec![
                try_always(
                    vec![ret(number(1.0))],
                    vec![],
                    vec![println(string("always"))],
                ),
                ret(number(2.0)),
            ],
        )],
    )];
    let outcome = run(members, vec![send(new("Early", vec![]), "m", vec![])]).unwrap();
    assert_eq!(outcome.value, "1");
    assert_eq!(outcome.console, vec!["always"]);
}

#[test]
fn always_runs_when_an_exception_escapes() {
    let sentences = vec![try_catch(
        vec![try_always(
            vec![throw(new("Exception", vec![string("x")]))],
            vec![],
            vec![println(string("inner always"))],
        )],
        vec![catch_any(
            "e",
            vec![println(send(
                string("outer "),
                "+",
                vec![send(reference("e"), "message", vec![])],
            ))],
        )],
    )];
    let outcome = run(vec![], sentences).unwrap();
    assert_eq!(outcome.console, vec!["inner always", "outer x"]);
}

#[test]
fn always_keeps_the_try_value() {
    let sentences = vec![try_always(
        vec![string("body")],
        vec![],
        vec![string("ignored")],
    )];
    assert_eq!(value_of(vec![], sentences), "body");
}

fn message_of(body: Vec<ast::Tree>) -> ast::Tree {
    try_catch(
        body,
        vec![catch_any("e", vec![send(reference("e"), "message", vec![])])],
    )
}

#[test]
fn exceptions_from_a_handler_replace_the_caught_one() {
    let sentences = vec![message_of(vec![try_always(
        vec![throw(new("Exception", vec![string("first")]))],
        vec![catch_any(
            "e",
            vec![throw(new("Exception", vec![string("second")]))],
        )],
        vec![println(string("always"))],
    )])];
    let outcome = run(vec![], sentences).unwrap();
    assert_eq!(outcome.value, "second");
    assert_eq!(outcome.console, vec!["always"]);
}

#[test]
fn exceptions_from_always_replace_the_try_value() {
    let sentences = vec![message_of(vec![try_always(
        vec![number(1.0)],
        vec![],
        vec![throw(new("Exception", vec![string("from always")]))],
    )])];
    assert_eq!(value_of(vec![], sentences), "from always");
}

#[test]
fn handlers_can_return_through_always() {
    let members = vec![class(
        "Rescuer",
        vec![method(
            "m",
            &[],
            vec![
                try_always(
                    vec![throw(new("Exception", vec![string("x")]))],
                    vec![catch_any("e", vec![ret(number(5.0))])],
                    vec![println(string("always"))],
                ),
                ret(number(2.0)),
            ],
        )],
    )];
    let outcome = run(members, vec![send(new("Rescuer", vec![]), "m", vec![])]).unwrap();
    assert_eq!(outcome.value, "5");
    assert_eq!(outcome.console, vec!["always"]);
}

#[test]
fn uncaught_exceptions_end_the_program() {
    let result = run(
        vec![],
        vec![throw(new("Exception", vec![string("oops")]))],
    );
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lang.Exception".into(),
            message: "oops".into(),
        }
    );
}

#[test]
fn unknown_messages_throw_message_not_understood() {
    let sentences = vec![try_catch(
        vec![send(number(1.0), "fly", vec![number(2.0)])],
        vec![catch(
            "e",
            "MessageNotUnderstoodException",
            vec![send(reference("e"), "message", vec![])],
        )],
    )];
    assert_eq!(value_of(vec![], sentences), "1 does not understand fly/1");

    let result = run(vec![class("Rock", vec![])], vec![send(new("Rock", vec![]), "roll", vec![])]);
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lang.MessageNotUnderstoodException".into(),
            message: "a Rock does not understand roll/0".into(),
        }
    );
}

#[test]
fn faults_become_evaluation_errors() {
    let sentences = vec![try_catch(
        vec![send(number(1.0), "/", vec![number(0.0)])],
        vec![catch(
            "e",
            "EvaluationError",
            vec![send(reference("e"), "message", vec![])],
        )],
    )];
    assert_eq!(value_of(vec![], sentences), "division by zero");

    let result = run(vec![], vec![if_then(number(1.0), vec![])]);
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lang.EvaluationError".into(),
            message: "expected Boolean but got 1".into(),
        }
    );
}

#[test]
fn missing_constructors_are_evaluation_errors() {
    let result = run(
        vec![class("Plain", vec![])],
        vec![new("Plain", vec![number(1.0), number(2.0)])],
    );
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lang.EvaluationError".into(),
            message: "p.Plain has no constructor for 2 arguments".into(),
        }
    );
}

fn looper() -> ast::Tree {
    class(
        "Looper",
        vec![method(
            "loop",
            &[],
            vec![ret(send(self_ref(), "loop", vec![]))],
        )],
    )
}

#[test]
fn stack_overflow_is_catchable() {
    let sentences = vec![try_catch(
        vec![send(new("Looper", vec![]), "loop", vec![])],
        vec![catch("e", "EvaluationError", vec![string("overflow")])],
    )];
    assert_eq!(value_of(vec![looper()], sentences), "overflow");
}

#[test]
fn stack_limit_follows_settings() {
    let settings = EvaluationSettings {
        max_frames: 64,
        echo_console: false,
    };
    let result = run_with(
        settings,
        vec![looper()],
        vec![send(new("Looper", vec![]), "loop", vec![])],
    );
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lang.EvaluationError".into(),
            message: "stack overflow: more than 64 frames".into(),
        }
    );
}

#[test]
fn assertions_throw_assertion_exceptions() {
    let result = run(
        vec![],
        vec![send(
            reference("assert"),
            "equals",
            vec![number(1.0), number(2.0)],
        )],
    );
    assert_eq!(
        result.unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lib.AssertionException".into(),
            message: "Expected <1> but got <2>".into(),
        }
    );

    let throws = |sentences| {
        vec![send(
            reference("assert"),
            "throwsException",
            vec![closure(&[], sentences)],
        )]
    };
    assert_eq!(
        value_of(vec![], throws(vec![throw(new("Exception", vec![]))])),
        "void"
    );
    assert_eq!(
        run(vec![], throws(vec![number(1.0)])).unwrap_err(),
        ExecutionError::UnhandledException {
            module: "wollok.lib.AssertionException".into(),
            message: "Block should have failed".into(),
        }
    );
}
