//! Owned, unlinked trees and the stage-typed package forest.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::node::{Kind, LiteralValue, Node};

/// An owned node whose children are owned nodes.
///
/// This is the representation of every stage before linking. Nodes that come
/// out of a linked environment keep their `id`; fresh ones have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree(pub Box<Node<Tree>>);

impl Tree {
    pub fn new(kind: Kind<Tree>) -> Self {
        Self(Box::new(Node::new(kind)))
    }

    pub fn into_node(self) -> Node<Tree> {
        *self.0
    }

    /// Every node below this one, pre-order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Tree> {
        let mut out = Vec::new();
        let mut stack: Vec<&Tree> = self.children().into_iter().rev().collect();
        while let Some(tree) = stack.pop() {
            out.push(tree);
            stack.extend(tree.children().into_iter().rev());
        }
        out
    }

    /// Folds `f` over this node and its descendants, pre-order.
    pub fn reduce<T, F>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, &Tree) -> T,
    {
        let acc = f(init, self);
        self.descendants().into_iter().fold(acc, f)
    }

    /// Rebuilds the tree bottom-up: children are transformed before `f` sees
    /// their parent.
    pub fn transform<F>(self, f: &mut F) -> Tree
    where
        F: FnMut(Tree) -> Tree,
    {
        let node = self.into_node().map_children(|child| child.transform(&mut *f));
        f(Tree(Box::new(node)))
    }
}

impl Deref for Tree {
    type Target = Node<Tree>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Tree {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Kind<Tree>> for Tree {
    fn from(kind: Kind<Tree>) -> Self {
        Tree::new(kind)
    }
}

/// Freshly parsed: no defaults applied.
#[derive(Debug, Clone, Copy)]
pub struct Raw;

/// Defaults applied, ready to link.
#[derive(Debug, Clone, Copy)]
pub struct Filled;

/// A list of independent package declarations at stage `S`.
#[derive(Debug, Clone)]
pub struct Forest<S> {
    packages: Vec<Tree>,
    stage: PhantomData<S>,
}

impl<S> Forest<S> {
    pub fn packages(&self) -> &[Tree] {
        &self.packages
    }

    pub fn into_packages(self) -> Vec<Tree> {
        self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Forest<Raw> {
    pub fn new(packages: Vec<Tree>) -> Self {
        Self {
            packages,
            stage: PhantomData,
        }
    }

    pub fn extend(mut self, packages: impl IntoIterator<Item = Tree>) -> Self {
        self.packages.extend(packages);
        self
    }

    /// Applies the defaults every later stage relies on.
    pub fn fill(self) -> Forest<Filled> {
        let mut path = Vec::new();
        let packages = self
            .packages
            .into_iter()
            .map(|package| fill_tree(package, &mut path))
            .collect();
        Forest {
            packages,
            stage: PhantomData,
        }
    }
}

pub const OBJECT: &str = "wollok.lang.Object";
pub const CLOSURE: &str = "wollok.lang.Closure";
pub const LIST: &str = "wollok.lang.List";

fn reference_to(fqn: &str) -> Tree {
    Tree::new(Kind::Reference {
        name: fqn.to_string(),
        target: None,
    })
}

fn null_literal() -> Tree {
    Tree::new(Kind::Literal {
        value: LiteralValue::Null,
    })
}

fn empty_body() -> Tree {
    Tree::new(Kind::Body {
        sentences: Vec::new(),
    })
}

fn is_root_object(name: &str, path: &[String]) -> bool {
    name == "Object" && path.len() == 2 && path[0] == "wollok" && path[1] == "lang"
}

fn fill_tree(tree: Tree, path: &mut Vec<String>) -> Tree {
    let Node { id, span, kind } = tree.into_node();
    let package_name = match &kind {
        Kind::Package { name, .. } => Some(name.clone()),
        _ => None,
    };
    if let Some(name) = &package_name {
        path.push(name.clone());
    }
    let kind = kind.map_children(|child| fill_tree(child, path));
    let kind = match kind {
        Kind::Class {
            name,
            superclass: None,
            mixins,
            members,
        } => {
            let superclass = (!is_root_object(&name, path)).then(|| reference_to(OBJECT));
            Kind::Class {
                name,
                superclass,
                mixins,
                members,
            }
        }
        Kind::Singleton {
            name,
            superclass: None,
            supercall_args,
            mixins,
            members,
            closure,
        } => Kind::Singleton {
            name,
            superclass: Some(reference_to(if closure { CLOSURE } else { OBJECT })),
            supercall_args,
            mixins,
            members,
            closure,
        },
        Kind::Variable {
            name,
            constant,
            value: None,
        } => Kind::Variable {
            name,
            constant,
            value: Some(null_literal()),
        },
        Kind::Field {
            name,
            constant,
            value: None,
        } => Kind::Field {
            name,
            constant,
            value: Some(null_literal()),
        },
        Kind::If {
            condition,
            then_body,
            else_body: None,
        } => Kind::If {
            condition,
            then_body,
            else_body: Some(empty_body()),
        },
        Kind::Try {
            body,
            catches,
            always: None,
        } => Kind::Try {
            body,
            catches,
            always: Some(empty_body()),
        },
        other => other,
    };
    if package_name.is_some() {
        path.pop();
    }
    Tree(Box::new(Node { id, span, kind }))
}
