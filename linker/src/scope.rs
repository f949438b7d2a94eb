//! Name scopes.
//!
//! The scope of a node is the scope of its parent plus the names its parent
//! introduces (its *contribution*). Inner names shadow outer ones. Scopes
//! are recomputed on demand rather than stored per node; the linker walks
//! the tree keeping a stack of contributions instead.

use std::collections::HashMap;

use ast::{Kind, NodeId};

use crate::environment::Environment;

pub type Scope = HashMap<String, NodeId>;

/// Name under which the standard library lives. The members of its
/// immediate sub-packages are visible everywhere, unqualified.
pub const GLOBAL_PACKAGE: &str = "wollok";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visibility {
    /// Only lexically declared names. Used before supertypes are resolved.
    Lexical,
    /// Lexical names plus fields inherited through the hierarchy.
    Inherited,
}

impl Environment {
    fn named(&self, id: NodeId) -> Option<(String, NodeId)> {
        self.name(id).map(|name| (name.to_string(), id))
    }

    /// Names `id` introduces for its descendants, outermost first: later
    /// entries win.
    pub(crate) fn contribution(&self, id: NodeId, visibility: Visibility) -> Vec<(String, NodeId)> {
        let mut out = Vec::new();
        match self.kind(id) {
            Kind::Environment { members } => {
                let global = members.iter().copied().find(|&member| {
                    matches!(self.kind(member), Kind::Package { name, .. } if name == GLOBAL_PACKAGE)
                });
                if let Some(global) = global {
                    for &package in self.kind(global).members() {
                        if matches!(self.kind(package), Kind::Package { .. }) {
                            out.extend(
                                self.kind(package)
                                    .members()
                                    .iter()
                                    .filter_map(|&member| self.named(member)),
                            );
                        }
                    }
                }
                out.extend(members.iter().filter_map(|&member| self.named(member)));
            }
            Kind::Package {
                imports, members, ..
            } => {
                for &import in imports {
                    out.extend(self.imported(import));
                }
                out.extend(members.iter().filter_map(|&member| self.named(member)));
            }
            Kind::Class { .. } | Kind::Singleton { .. } | Kind::Mixin { .. } => {
                match visibility {
                    Visibility::Lexical => out.extend(self.own_fields(id)),
                    Visibility::Inherited => {
                        for &ancestor in self.hierarchy(id).iter().rev() {
                            out.extend(self.own_fields(ancestor));
                        }
                    }
                }
            }
            Kind::Describe { members, .. } => {
                out.extend(
                    members
                        .iter()
                        .filter(|&&member| {
                            matches!(self.kind(member), Kind::Field { .. } | Kind::Variable { .. })
                        })
                        .filter_map(|&member| self.named(member)),
                );
            }
            Kind::Method { parameters, .. } | Kind::Constructor { parameters, .. } => {
                out.extend(parameters.iter().filter_map(|&p| self.named(p)));
            }
            Kind::Body { sentences } => {
                out.extend(
                    sentences
                        .iter()
                        .filter(|&&s| matches!(self.kind(s), Kind::Variable { .. }))
                        .filter_map(|&s| self.named(s)),
                );
            }
            Kind::Catch { parameter, .. } => out.extend(self.named(*parameter)),
            _ => {}
        }
        out
    }

    fn own_fields(&self, module: NodeId) -> Vec<(String, NodeId)> {
        self.kind(module)
            .members()
            .iter()
            .filter(|&&member| matches!(self.kind(member), Kind::Field { .. }))
            .filter_map(|&member| self.named(member))
            .collect()
    }

    fn imported(&self, import: NodeId) -> Vec<(String, NodeId)> {
        let Kind::Import { entity, generic } = self.kind(import) else {
            return Vec::new();
        };
        let Some(target) = self.target(*entity) else {
            return Vec::new();
        };
        if *generic {
            self.kind(target)
                .members()
                .iter()
                .filter_map(|&member| self.named(member))
                .collect()
        } else {
            self.named(target).into_iter().collect()
        }
    }

    pub(crate) fn scope_with(&self, id: NodeId, visibility: Visibility) -> Scope {
        let mut scope = Scope::new();
        let mut ancestors = self.ancestors(id);
        ancestors.reverse();
        for ancestor in ancestors {
            scope.extend(self.contribution(ancestor, visibility));
        }
        scope
    }

    /// Every name visible from `id`, with its resolution target.
    pub fn scope(&self, id: NodeId) -> Scope {
        self.scope_with(id, Visibility::Inherited)
    }

    /// Walks `segments` down through named members, starting at `from`.
    pub(crate) fn walk_members<'a>(
        &self,
        from: NodeId,
        segments: impl Iterator<Item = &'a str>,
    ) -> Option<NodeId> {
        let mut current = from;
        for segment in segments {
            current = self
                .kind(current)
                .members()
                .iter()
                .copied()
                .find(|&member| self.name(member) == Some(segment))?;
        }
        Some(current)
    }

    /// Resolves a possibly dotted name: the head through `lookup`, the rest
    /// through member names.
    pub(crate) fn resolve_name(
        &self,
        name: &str,
        lookup: impl Fn(&str) -> Option<NodeId>,
    ) -> Option<NodeId> {
        let mut segments = name.split('.');
        let head = lookup(segments.next()?)?;
        self.walk_members(head, segments)
    }

    /// Resolves a fully-qualified name from the environment root.
    pub fn resolve_qualified(&self, fqn: &str) -> Option<NodeId> {
        self.walk_members(self.root, fqn.split('.'))
    }
}

/// Stack of contributions kept while walking the tree top-down.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<Scope>,
}

impl ScopeStack {
    pub(crate) fn push(&mut self, contribution: Vec<(String, NodeId)>) {
        self.frames.push(contribution.into_iter().collect());
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<NodeId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::link_packages;
    use ast::build::*;
    use ast::Kind;

    #[test]
    fn inner_names_shadow_outer_ones() {
        let env = link_packages(vec![package(
            "p",
            vec![
                class("x", vec![]),
                class(
                    "A",
                    vec![
                        field("x", null()),
                        method("m", &["x"], vec![reference("x")]),
                        method("n", &[], vec![reference("x")]),
                    ],
                ),
            ],
        )]);
        let references: Vec<_> = env
            .descendants(env.root())
            .into_iter()
            .filter(|&id| matches!(env.kind(id), Kind::Reference { name, .. } if name == "x"))
            .collect();
        assert_eq!(references.len(), 2);
        let targets: Vec<&str> = references
            .iter()
            .filter_map(|&r| env.target(r))
            .map(|t| env.kind(t).kind_name())
            .collect();
        assert_eq!(targets, vec!["Parameter", "Field"]);
    }

    #[test]
    fn scope_sees_globals_and_inherited_fields() {
        let env = link_packages(vec![package(
            "p",
            vec![
                class("A", vec![field("a", null())]),
                class("B", vec![method("m", &[], vec![])]).inherits("A"),
            ],
        )]);
        let Some(b) = env.entity("p.B") else {
            panic!("missing p.B");
        };
        let method = env.kind(b).members()[0];
        let scope = env.scope(method);
        assert!(scope.contains_key("a"));
        assert!(scope.contains_key("Object"));
        assert!(scope.contains_key("A"));
        assert!(!scope.contains_key("m"));
    }
}
