//! Whole programs run through the interpreter: globals, construction,
//! dispatch and closures.

mod common;

use ast::build::*;
use common::{println, run, value_of};
use vm::ExecutionError;

#[test]
fn arithmetic_and_strings() {
    assert_eq!(
        value_of(vec![], vec![send(number(1.0), "+", vec![number(2.0)])]),
        "3"
    );
    assert_eq!(
        value_of(
            vec![],
            vec![send(string("total: "), "+", vec![send(number(7.0), "/", vec![number(2.0)])])]
        ),
        "total: 3.5"
    );
    assert_eq!(
        value_of(vec![], vec![send(number(4.0), "even", vec![])]),
        "true"
    );
}

#[test]
fn last_sentence_is_the_value() {
    let sentences = vec![
        var("x", number(1.0)),
        assign("x", send(reference("x"), "+", vec![number(1.0)])),
        reference("x"),
    ];
    assert_eq!(value_of(vec![], sentences), "2");
    assert_eq!(value_of(vec![], vec![var("y", number(1.0))]), "void");
}

#[test]
fn conditionals_pick_a_branch() {
    let choose = |condition| {
        if_else(condition, vec![string("yes")], vec![string("no")])
    };
    assert_eq!(
        value_of(vec![], vec![choose(send(number(1.0), "<", vec![number(2.0)]))]),
        "yes"
    );
    assert_eq!(
        value_of(vec![], vec![choose(send(number(3.0), "<", vec![number(2.0)]))]),
        "no"
    );
    assert_eq!(
        value_of(vec![], vec![if_then(boolean(false), vec![string("never")])]),
        "void"
    );
}

#[test]
fn console_collects_lines() {
    let outcome = run(
        vec![],
        vec![
            println(string("hi")),
            println(send(number(2.0), "*", vec![number(3.5)])),
            println(list(vec![number(1.0), string("a")])),
        ],
    )
    .unwrap();
    assert_eq!(outcome.console, vec!["hi", "7", "[1, a]"]);
}

fn pepita() -> Vec<ast::Tree> {
    vec![
        singleton(
            "pepita",
            vec![
                field("energy", number(100.0)),
                method(
                    "fly",
                    &[],
                    vec![assign(
                        "energy",
                        send(reference("energy"), "-", vec![number(10.0)]),
                    )],
                ),
                method("energy", &[], vec![ret(reference("energy"))]),
            ],
        ),
        var("initial", send(reference("pepita"), "energy", vec![])),
    ]
}

#[test]
fn singletons_keep_state() {
    let sentences = vec![
        send(reference("pepita"), "fly", vec![]),
        send(reference("pepita"), "fly", vec![]),
        send(reference("pepita"), "energy", vec![]),
    ];
    assert_eq!(value_of(pepita(), sentences), "80");
}

#[test]
fn package_variables_see_initialized_singletons() {
    let interpreter = common::interpreter(pepita());
    let evaluation = interpreter.evaluation().unwrap();
    let initial = evaluation.global("p.initial").unwrap();
    assert_eq!(evaluation.display(initial), "100");
    let pepita = evaluation.global("p.pepita").unwrap();
    assert_eq!(evaluation.display(pepita), "pepita");
}

#[test]
fn package_variables_can_be_reassigned() {
    let members = vec![var("count", number(0.0))];
    let sentences = vec![
        assign("count", send(reference("count"), "+", vec![number(5.0)])),
        reference("count"),
    ];
    assert_eq!(value_of(members, sentences), "5");
}

fn bird() -> ast::Tree {
    class(
        "Bird",
        vec![
            bare_field("name"),
            constructor(&["aName"], vec![assign("name", reference("aName"))]),
            method("name", &[], vec![ret(reference("name"))]),
        ],
    )
}

#[test]
fn constructors_bind_arguments() {
    let sentences = vec![send(new("Bird", vec![string("tweety")]), "name", vec![])];
    assert_eq!(value_of(vec![bird()], sentences), "tweety");
}

#[test]
fn singletons_pass_arguments_to_their_superclass() {
    let members = vec![
        bird(),
        singleton("tweety", vec![])
            .inherits("Bird")
            .with_supercall_args(vec![string("Tweety")]),
    ];
    let sentences = vec![send(reference("tweety"), "name", vec![])];
    assert_eq!(value_of(members, sentences), "Tweety");
}

#[test]
fn constructors_chain_to_super() {
    let members = vec![
        class(
            "Base",
            vec![
                bare_field("n"),
                constructor(&["v"], vec![assign("n", reference("v"))]),
            ],
        ),
        class(
            "Child",
            vec![
                constructor_calling(&[], true, vec![number(7.0)], vec![]),
                method("n", &[], vec![ret(reference("n"))]),
            ],
        )
        .inherits("Base"),
    ];
    let sentences = vec![send(new("Child", vec![]), "n", vec![])];
    assert_eq!(value_of(members, sentences), "7");
}

#[test]
fn named_arguments_override_initializers() {
    let members = vec![class(
        "Pair",
        vec![
            field("a", number(1.0)),
            field("b", number(2.0)),
            field("log", string("")),
            method(
                "initialize",
                &[],
                vec![assign("log", send(string("init "), "+", vec![reference("a")]))],
            ),
            method("sum", &[], vec![ret(send(reference("a"), "+", vec![reference("b")]))]),
            method("log", &[], vec![ret(reference("log"))]),
        ],
    )];
    let sum = vec![send(new_named("Pair", vec![("b", number(10.0))]), "sum", vec![])];
    assert_eq!(value_of(members.clone(), sum), "11");
    let log = vec![send(new_named("Pair", vec![("a", number(5.0))]), "log", vec![])];
    assert_eq!(value_of(members, log), "init 5");
}

#[test]
fn super_continues_lookup_above_the_caller() {
    let members = vec![
        class("A", vec![method("greet", &[], vec![ret(string("A"))])]),
        class(
            "B",
            vec![method(
                "greet",
                &[],
                vec![ret(send(string("B"), "+", vec![super_call(vec![])]))],
            )],
        )
        .inherits("A"),
        class(
            "C",
            vec![method(
                "greet",
                &[],
                vec![ret(send(string("C"), "+", vec![super_call(vec![])]))],
            )],
        )
        .inherits("B"),
    ];
    let sentences = vec![send(new("C", vec![]), "greet", vec![])];
    assert_eq!(value_of(members, sentences), "CBA");
}

#[test]
fn mixins_come_before_the_superclass() {
    let members = vec![
        mixin("Loud", vec![method("speak", &[], vec![ret(string("LOUD"))])]),
        class("Animal", vec![method("speak", &[], vec![ret(string("quiet"))])]),
        class("Dog", vec![]).inherits("Animal").mixed_with(&["Loud"]),
    ];
    let sentences = vec![send(new("Dog", vec![]), "speak", vec![])];
    assert_eq!(value_of(members, sentences), "LOUD");
}

#[test]
fn var_args_collect_the_rest() {
    let members = vec![class(
        "V",
        vec![
            method("count", &["xs..."], vec![ret(send(reference("xs"), "size", vec![]))]),
            method("rest", &["x", "ys..."], vec![ret(reference("ys"))]),
        ],
    )];
    let count = |args: Vec<ast::Tree>| vec![send(new("V", vec![]), "count", args)];
    assert_eq!(value_of(members.clone(), count(vec![])), "0");
    assert_eq!(value_of(members.clone(), count(vec![number(1.0)])), "1");
    assert_eq!(
        value_of(members.clone(), count(vec![number(1.0), number(2.0)])),
        "2"
    );

    let rest = |args: Vec<ast::Tree>| vec![send(new("V", vec![]), "rest", args)];
    assert_eq!(value_of(members.clone(), rest(vec![number(1.0)])), "[]");
    assert_eq!(
        value_of(members.clone(), rest(vec![number(1.0), number(2.0)])),
        "[2]"
    );
    assert_eq!(
        value_of(
            members.clone(),
            rest(vec![number(1.0), number(2.0), number(3.0)])
        ),
        "[2, 3]"
    );
    assert!(matches!(
        run(members, rest(vec![])),
        Err(ExecutionError::UnhandledException { module, .. })
            if module == "wollok.lang.MessageNotUnderstoodException"
    ));
}

#[test]
fn closures_capture_their_scope() {
    let sentences = vec![
        var("count", number(0.0)),
        send(
            list(vec![number(1.0), number(2.0), number(3.0)]),
            "forEach",
            vec![closure(
                &["x"],
                vec![assign(
                    "count",
                    send(reference("count"), "+", vec![reference("x")]),
                )],
            )],
        ),
        reference("count"),
    ];
    assert_eq!(value_of(vec![], sentences), "6");
}

#[test]
fn lists_map_and_sum() {
    let numbers = || list(vec![number(1.0), number(2.0), number(3.0)]);
    let doubled = vec![send(
        numbers(),
        "map",
        vec![closure(&["x"], vec![send(reference("x"), "*", vec![number(2.0)])])],
    )];
    assert_eq!(value_of(vec![], doubled), "[2, 4, 6]");
    assert_eq!(value_of(vec![], vec![send(numbers(), "sum", vec![])]), "6");
    assert_eq!(value_of(vec![], vec![send(numbers(), "first", vec![])]), "1");
}

#[test]
fn closures_see_the_enclosing_self() {
    let members = vec![class(
        "Holder",
        vec![
            field("k", number(10.0)),
            method(
                "shifted",
                &[],
                vec![ret(send(
                    list(vec![number(1.0), number(2.0)]),
                    "map",
                    vec![closure(&["x"], vec![send(reference("x"), "+", vec![reference("k")])])],
                ))],
            ),
            method(
                "me",
                &[],
                vec![ret(send(closure(&[], vec![self_ref()]), "apply", vec![]))],
            ),
        ],
    )];
    let shifted = vec![send(new("Holder", vec![]), "shifted", vec![])];
    assert_eq!(value_of(members.clone(), shifted), "[11, 12]");

    let same = vec![
        var("h", new("Holder", vec![])),
        send(send(reference("h"), "me", vec![]), "==", vec![reference("h")]),
    ];
    assert_eq!(value_of(members, same), "true");
}

#[test]
fn objects_print_with_an_article() {
    let members = vec![class("Apple", vec![]), class("Pear", vec![])];
    assert_eq!(
        value_of(members.clone(), vec![send(new("Apple", vec![]), "toString", vec![])]),
        "an Apple"
    );
    assert_eq!(
        value_of(members.clone(), vec![send(new("Pear", vec![]), "printString", vec![])]),
        "a Pear"
    );
    assert_eq!(
        value_of(members, vec![send(new("Pear", vec![]), "className", vec![])]),
        "p.Pear"
    );
}
