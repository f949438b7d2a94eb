//! Property tests for hierarchy linearization and method lookup over
//! arbitrary, possibly cyclic, module graphs.

use std::collections::HashSet;

use ast::build::*;
use ast::{Forest, Tree};
use linker::{Environment, link};
use proptest::prelude::*;

/// One generated module: an optional superclass index and mixin indices.
#[derive(Debug, Clone)]
struct Shape {
    superclass: Option<usize>,
    mixins: Vec<usize>,
    declares: bool,
}

fn arb_graph(max: usize) -> impl Strategy<Value = Vec<Shape>> {
    (1..=max).prop_flat_map(|size| {
        prop::collection::vec(
            (
                prop::option::of(0..size),
                prop::collection::vec(0..size, 0..3),
                any::<bool>(),
            )
                .prop_map(|(superclass, mixins, declares)| Shape {
                    superclass,
                    mixins,
                    declares,
                }),
            size,
        )
    })
}

/// Rewrites a shape so that it only points at lower indices.
fn acyclic(shapes: Vec<Shape>) -> Vec<Shape> {
    shapes
        .into_iter()
        .enumerate()
        .map(|(index, shape)| Shape {
            superclass: shape.superclass.filter(|_| index > 0).map(|s| s % index.max(1)),
            mixins: if index == 0 {
                Vec::new()
            } else {
                shape.mixins.iter().map(|m| m % index).collect()
            },
            declares: shape.declares,
        })
        .collect()
}

fn class_name(index: usize) -> String {
    format!("C{index}")
}

fn mixin_name(index: usize) -> String {
    format!("M{index}")
}

fn lang() -> Tree {
    package(
        "wollok",
        vec![package(
            "lang",
            vec![class("Object", vec![]), class("List", vec![]), class("Closure", vec![])],
        )],
    )
}

/// Every index yields a class `C<i>` and a mixin `M<i>`; classes inherit
/// classes and mix in mixins, mixins mix in mixins.
fn build(shapes: &[Shape]) -> Environment {
    let mut members = Vec::new();
    for (index, shape) in shapes.iter().enumerate() {
        let mixins: Vec<String> = shape.mixins.iter().map(|&m| mixin_name(m)).collect();
        let mixins: Vec<&str> = mixins.iter().map(String::as_str).collect();
        let methods = if shape.declares {
            vec![method("m", &[], vec![])]
        } else {
            vec![]
        };

        let mut module = class(&class_name(index), methods.clone()).mixed_with(&mixins);
        if let Some(superclass) = shape.superclass {
            module = module.inherits(&class_name(superclass));
        }
        members.push(module);
        members.push(mixin(&mixin_name(index), methods).mixed_with(&mixins));
    }
    let forest = Forest::new(vec![lang(), package("g", members)]);
    match link(forest.fill(), None) {
        Ok(environment) => environment,
        Err(err) => panic!("link failed: {err}"),
    }
}

fn entity(environment: &Environment, fqn: &str) -> ast::NodeId {
    environment
        .entity(fqn)
        .unwrap_or_else(|| panic!("missing {fqn}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hierarchy_terminates_without_duplicates(shapes in arb_graph(6)) {
        let environment = build(&shapes);
        for index in 0..shapes.len() {
            for fqn in [format!("g.{}", class_name(index)), format!("g.{}", mixin_name(index))] {
                let module = entity(&environment, &fqn);
                let hierarchy = environment.hierarchy(module);
                let unique: HashSet<_> = hierarchy.iter().collect();
                prop_assert_eq!(unique.len(), hierarchy.len());
                prop_assert_eq!(hierarchy.first().copied(), Some(module));
            }
        }
    }

    #[test]
    fn lookup_is_inherited_by_descendants(shapes in arb_graph(6).prop_map(acyclic)) {
        let environment = build(&shapes);
        for index in 0..shapes.len() {
            let module = entity(&environment, &format!("g.{}", class_name(index)));
            let Some(found) = environment.lookup_method(module, "m", 0) else {
                continue;
            };
            // A descendant sees the same method unless something ahead of
            // `module` in its own hierarchy declares `m`.
            for other in 0..shapes.len() {
                let descendant = entity(&environment, &format!("g.{}", class_name(other)));
                if descendant == module || !environment.inherits(descendant, module) {
                    continue;
                }
                let hierarchy = environment.hierarchy(descendant);
                let Some(position) = hierarchy.iter().position(|&m| m == module) else {
                    continue;
                };
                let declared_before = hierarchy[..position].iter().any(|&m| {
                    environment.kind(m).members().iter().any(|&member| {
                        environment.name(member) == Some("m")
                    })
                });
                if !declared_before {
                    prop_assert_eq!(environment.lookup_method(descendant, "m", 0), Some(found));
                }
            }
        }
    }
}
