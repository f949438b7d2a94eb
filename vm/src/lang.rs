//! The standard library every program links against.
//!
//! `wollok.lang` holds the core classes, `wollok.lib` the well-known
//! objects. Most behavior is native (see [`crate::natives`]); what can be
//! written in the language itself is.

use ast::Tree;
use ast::build::*;

pub use ast::{CLOSURE, LIST, OBJECT};

pub const BOOLEAN: &str = "wollok.lang.Boolean";
pub const NUMBER: &str = "wollok.lang.Number";
pub const STRING: &str = "wollok.lang.String";
pub const EXCEPTION: &str = "wollok.lang.Exception";
pub const EVALUATION_ERROR: &str = "wollok.lang.EvaluationError";
pub const MESSAGE_NOT_UNDERSTOOD: &str = "wollok.lang.MessageNotUnderstoodException";
pub const CONSOLE: &str = "wollok.lib.console";
pub const ASSERT: &str = "wollok.lib.assert";
pub const ASSERTION_EXCEPTION: &str = "wollok.lib.AssertionException";

fn object() -> Tree {
    class(
        "Object",
        vec![
            native_method("==", &["other"]),
            native_method("identity", &[]),
            native_method("toString", &[]),
            native_method("className", &[]),
            native_method("messageNotUnderstood", &["name", "parameters"]),
            method("initialize", &[], vec![]),
            method(
                "!=",
                &["other"],
                vec![ret(send(
                    send(self_ref(), "==", vec![reference("other")]),
                    "negate",
                    vec![],
                ))],
            ),
            method(
                "equals",
                &["other"],
                vec![ret(send(self_ref(), "==", vec![reference("other")]))],
            ),
            method("printString", &[], vec![ret(send(self_ref(), "toString", vec![]))]),
        ],
    )
}

fn number_class() -> Tree {
    let natives = ["+", "-", "*", "/", "%", "<", ">", "<=", ">="]
        .into_iter()
        .map(|op| native_method(op, &["other"]));
    let mut members: Vec<Tree> = natives.collect();
    members.push(native_method("abs", &[]));
    members.push(native_method("toString", &[]));
    members.push(method(
        "even",
        &[],
        vec![ret(send(
            send(self_ref(), "%", vec![number(2.0)]),
            "==",
            vec![number(0.0)],
        ))],
    ));
    members.push(method(
        "between",
        &["min", "max"],
        vec![ret(send(
            send(self_ref(), ">=", vec![reference("min")]),
            "&&",
            vec![send(self_ref(), "<=", vec![reference("max")])],
        ))],
    ));
    class("Number", members)
}

fn list_class() -> Tree {
    class(
        "List",
        vec![
            native_method("add", &["element"]),
            native_method("get", &["index"]),
            native_method("size", &[]),
            native_method("isEmpty", &[]),
            native_method("forEach", &["closure"]),
            native_method("map", &["closure"]),
            method("first", &[], vec![ret(send(self_ref(), "get", vec![number(0.0)]))]),
            method(
                "sum",
                &[],
                vec![
                    var("total", number(0.0)),
                    send(
                        self_ref(),
                        "forEach",
                        vec![closure(
                            &["element"],
                            vec![assign(
                                "total",
                                send(reference("total"), "+", vec![reference("element")]),
                            )],
                        )],
                    ),
                    ret(reference("total")),
                ],
            ),
        ],
    )
}

fn exceptions() -> Vec<Tree> {
    vec![
        class(
            "Exception",
            vec![
                bare_field("message"),
                constructor(&[], vec![]),
                constructor(
                    &["aMessage"],
                    vec![assign("message", reference("aMessage"))],
                ),
                method("message", &[], vec![ret(reference("message"))]),
            ],
        ),
        class("EvaluationError", vec![]).inherits("Exception"),
        class("MessageNotUnderstoodException", vec![]).inherits("Exception"),
    ]
}

fn lang() -> Tree {
    let mut members = vec![
        object(),
        class(
            "Boolean",
            vec![
                native_method("&&", &["other"]),
                native_method("||", &["other"]),
                native_method("negate", &[]),
                native_method("toString", &[]),
            ],
        ),
        number_class(),
        class(
            "String",
            vec![
                native_method("+", &["other"]),
                native_method("size", &[]),
                native_method("toUpperCase", &[]),
                native_method("toString", &[]),
                method(
                    "isEmpty",
                    &[],
                    vec![ret(send(
                        send(self_ref(), "size", vec![]),
                        "==",
                        vec![number(0.0)],
                    ))],
                ),
            ],
        ),
        list_class(),
        class("Closure", vec![]),
    ];
    members.extend(exceptions());
    package("lang", members)
}

fn lib() -> Tree {
    package(
        "lib",
        vec![
            class("AssertionException", vec![]).inherits("wollok.lang.Exception"),
            singleton("console", vec![native_method("println", &["value"])]),
            singleton(
                "assert",
                vec![
                    native_method("that", &["condition"]),
                    native_method("notThat", &["condition"]),
                    native_method("equals", &["expected", "actual"]),
                    method(
                        "throwsException",
                        &["block"],
                        vec![
                            try_catch(
                                vec![send(reference("block"), "apply", vec![])],
                                vec![catch_any("e", vec![ret_void()])],
                            ),
                            throw(new(
                                "AssertionException",
                                vec![string("Block should have failed")],
                            )),
                        ],
                    ),
                ],
            ),
        ],
    )
}

/// The `wollok` package tree, ready to be put in front of user packages.
pub fn prelude() -> Vec<Tree> {
    vec![package("wollok", vec![lang(), lib()])]
}
