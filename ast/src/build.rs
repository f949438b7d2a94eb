//! Builders for unlinked trees.
//!
//! These play the role of the parser for code assembled in Rust: the
//! standard-library prelude and the tests. Dotted names passed to
//! [`reference`] are resolved by the linker segment by segment.

use crate::node::{BaseCall, Kind, LiteralValue};
use crate::span::Span;
use crate::tree::{LIST, Tree};

fn names(trees: &[Tree]) -> impl Iterator<Item = &str> {
    trees.iter().filter_map(|t| t.name())
}

// Entities

pub fn package(name: &str, members: Vec<Tree>) -> Tree {
    package_importing(name, Vec::new(), members)
}

pub fn package_importing(name: &str, imports: Vec<Tree>, members: Vec<Tree>) -> Tree {
    Tree::new(Kind::Package {
        name: name.to_string(),
        imports,
        members,
    })
}

/// `import a.b.C`
pub fn import(entity: &str) -> Tree {
    Tree::new(Kind::Import {
        entity: reference(entity),
        generic: false,
    })
}

/// `import a.b.*`
pub fn import_all(entity: &str) -> Tree {
    Tree::new(Kind::Import {
        entity: reference(entity),
        generic: true,
    })
}

pub fn program(name: &str, sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Program {
        name: name.to_string(),
        body: body(sentences),
    })
}

pub fn test(name: &str, sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Test {
        name: name.to_string(),
        body: body(sentences),
    })
}

pub fn describe(name: &str, members: Vec<Tree>) -> Tree {
    Tree::new(Kind::Describe {
        name: name.to_string(),
        members,
    })
}

pub fn class(name: &str, members: Vec<Tree>) -> Tree {
    Tree::new(Kind::Class {
        name: name.to_string(),
        superclass: None,
        mixins: Vec::new(),
        members,
    })
}

/// A named, well-known object.
pub fn singleton(name: &str, members: Vec<Tree>) -> Tree {
    Tree::new(Kind::Singleton {
        name: Some(name.to_string()),
        superclass: None,
        supercall_args: Vec::new(),
        mixins: Vec::new(),
        members,
        closure: false,
    })
}

fn anonymous(members: Vec<Tree>, closure: bool) -> Tree {
    Tree::new(Kind::Singleton {
        name: None,
        superclass: None,
        supercall_args: Vec::new(),
        mixins: Vec::new(),
        members,
        closure,
    })
}

/// An anonymous object expression: `object { ... }`.
pub fn object_literal(members: Vec<Tree>) -> Tree {
    Tree::new(Kind::Literal {
        value: LiteralValue::Singleton(anonymous(members, false)),
    })
}

/// `{ a, b => sentences }`. The last sentence is the closure's value.
pub fn closure(parameters: &[&str], mut sentences: Vec<Tree>) -> Tree {
    if let Some(last) = sentences.pop() {
        sentences.push(if last.kind.is_expression() {
            ret(last)
        } else {
            last
        });
    }
    let apply = method("apply", parameters, sentences);
    Tree::new(Kind::Literal {
        value: LiteralValue::Singleton(anonymous(vec![apply], true)),
    })
}

pub fn mixin(name: &str, members: Vec<Tree>) -> Tree {
    Tree::new(Kind::Mixin {
        name: name.to_string(),
        mixins: Vec::new(),
        members,
    })
}

// Variables and fields

fn variable(name: &str, constant: bool, value: Option<Tree>) -> Tree {
    Tree::new(Kind::Variable {
        name: name.to_string(),
        constant,
        value,
    })
}

pub fn var(name: &str, value: Tree) -> Tree {
    variable(name, false, Some(value))
}

/// `var name` without an initial value.
pub fn bare_var(name: &str) -> Tree {
    variable(name, false, None)
}

pub fn constant(name: &str, value: Tree) -> Tree {
    variable(name, true, Some(value))
}

fn field_decl(name: &str, constant: bool, value: Option<Tree>) -> Tree {
    Tree::new(Kind::Field {
        name: name.to_string(),
        constant,
        value,
    })
}

pub fn field(name: &str, value: Tree) -> Tree {
    field_decl(name, false, Some(value))
}

pub fn bare_field(name: &str) -> Tree {
    field_decl(name, false, None)
}

pub fn const_field(name: &str, value: Tree) -> Tree {
    field_decl(name, true, Some(value))
}

// Behavior

/// A parameter name ending in `...` declares a var-arg parameter.
pub fn param(name: &str) -> Tree {
    let (name, var_arg) = match name.strip_suffix("...") {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };
    Tree::new(Kind::Parameter {
        name: name.to_string(),
        var_arg,
    })
}

fn params(parameters: &[&str]) -> Vec<Tree> {
    parameters.iter().map(|p| param(p)).collect()
}

pub fn method(name: &str, parameters: &[&str], sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Method {
        name: name.to_string(),
        parameters: params(parameters),
        body: Some(body(sentences)),
        native: false,
    })
}

pub fn native_method(name: &str, parameters: &[&str]) -> Tree {
    Tree::new(Kind::Method {
        name: name.to_string(),
        parameters: params(parameters),
        body: None,
        native: true,
    })
}

pub fn abstract_method(name: &str, parameters: &[&str]) -> Tree {
    Tree::new(Kind::Method {
        name: name.to_string(),
        parameters: params(parameters),
        body: None,
        native: false,
    })
}

pub fn constructor(parameters: &[&str], sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Constructor {
        parameters: params(parameters),
        base_call: None,
        body: body(sentences),
    })
}

/// `constructor(ps) = super(args) { ... }` or `= self(args)` when
/// `calls_super` is false.
pub fn constructor_calling(
    parameters: &[&str],
    calls_super: bool,
    args: Vec<Tree>,
    sentences: Vec<Tree>,
) -> Tree {
    Tree::new(Kind::Constructor {
        parameters: params(parameters),
        base_call: Some(BaseCall { calls_super, args }),
        body: body(sentences),
    })
}

pub fn fixture(sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Fixture {
        body: body(sentences),
    })
}

pub fn body(sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Body { sentences })
}

/// `catch name: exception_type { ... }`
pub fn catch(parameter: &str, exception_type: &str, sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Catch {
        parameter: param(parameter),
        parameter_type: Some(reference(exception_type)),
        body: body(sentences),
    })
}

/// `catch name { ... }`, matching any exception.
pub fn catch_any(parameter: &str, sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::Catch {
        parameter: param(parameter),
        parameter_type: None,
        body: body(sentences),
    })
}

// Expressions and sentences

pub fn reference(name: &str) -> Tree {
    Tree::new(Kind::Reference {
        name: name.to_string(),
        target: None,
    })
}

pub fn self_ref() -> Tree {
    Tree::new(Kind::SelfRef)
}

fn literal(value: LiteralValue<Tree>) -> Tree {
    Tree::new(Kind::Literal { value })
}

pub fn null() -> Tree {
    literal(LiteralValue::Null)
}

pub fn boolean(value: bool) -> Tree {
    literal(LiteralValue::Boolean(value))
}

pub fn number(value: f64) -> Tree {
    literal(LiteralValue::Number(value))
}

pub fn string(value: &str) -> Tree {
    literal(LiteralValue::String(value.to_string()))
}

pub fn list(elements: Vec<Tree>) -> Tree {
    literal(LiteralValue::Collection {
        module: reference(LIST),
        elements,
    })
}

pub fn send(receiver: Tree, message: &str, args: Vec<Tree>) -> Tree {
    Tree::new(Kind::Send {
        receiver,
        message: message.to_string(),
        args,
    })
}

pub fn super_call(args: Vec<Tree>) -> Tree {
    Tree::new(Kind::Super { args })
}

pub fn new(class: &str, args: Vec<Tree>) -> Tree {
    Tree::new(Kind::New {
        instantiated: reference(class),
        args,
    })
}

/// `new C(a = 1, b = 2)`
pub fn new_named(class: &str, args: Vec<(&str, Tree)>) -> Tree {
    let args = args
        .into_iter()
        .map(|(name, value)| {
            Tree::new(Kind::NamedArgument {
                name: name.to_string(),
                value,
            })
        })
        .collect();
    Tree::new(Kind::New {
        instantiated: reference(class),
        args,
    })
}

pub fn if_then(condition: Tree, then_sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::If {
        condition,
        then_body: body(then_sentences),
        else_body: None,
    })
}

pub fn if_else(condition: Tree, then_sentences: Vec<Tree>, else_sentences: Vec<Tree>) -> Tree {
    Tree::new(Kind::If {
        condition,
        then_body: body(then_sentences),
        else_body: Some(body(else_sentences)),
    })
}

pub fn throw(exception: Tree) -> Tree {
    Tree::new(Kind::Throw { exception })
}

pub fn try_catch(sentences: Vec<Tree>, catches: Vec<Tree>) -> Tree {
    Tree::new(Kind::Try {
        body: body(sentences),
        catches,
        always: None,
    })
}

pub fn try_always(sentences: Vec<Tree>, catches: Vec<Tree>, always: Vec<Tree>) -> Tree {
    Tree::new(Kind::Try {
        body: body(sentences),
        catches,
        always: Some(body(always)),
    })
}

pub fn ret(value: Tree) -> Tree {
    Tree::new(Kind::Return { value: Some(value) })
}

pub fn ret_void() -> Tree {
    Tree::new(Kind::Return { value: None })
}

pub fn assign(variable: &str, value: Tree) -> Tree {
    Tree::new(Kind::Assignment {
        variable: reference(variable),
        value,
    })
}

// Modifiers

impl Tree {
    /// Sets the superclass of a class or singleton.
    pub fn inherits(mut self, superclass: &str) -> Self {
        if let Kind::Class { superclass: s, .. } | Kind::Singleton { superclass: s, .. } =
            &mut self.kind
        {
            *s = Some(reference(superclass));
        }
        self
    }

    /// Appends mixins to a module, in linearization order.
    pub fn mixed_with(mut self, mixins: &[&str]) -> Self {
        if let Kind::Class { mixins: m, .. }
        | Kind::Singleton { mixins: m, .. }
        | Kind::Mixin { mixins: m, .. } = &mut self.kind
        {
            m.extend(mixins.iter().map(|name| reference(name)));
        }
        self
    }

    /// Arguments passed to the superclass constructor of a singleton.
    pub fn with_supercall_args(mut self, args: Vec<Tree>) -> Self {
        match &mut self.kind {
            Kind::Singleton { supercall_args, .. } => *supercall_args = args,
            Kind::Literal {
                value: LiteralValue::Singleton(singleton),
            } => {
                if let Kind::Singleton { supercall_args, .. } = &mut singleton.kind {
                    *supercall_args = args;
                }
            }
            _ => {}
        }
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Names declared directly by this tree (members of containers).
    pub fn member_names(&self) -> Vec<&str> {
        names(self.kind.members()).collect()
    }
}
