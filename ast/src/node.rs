//! The node model shared by every stage of the pipeline.
//!
//! A node is a tagged record: [`Kind`] is a closed sum type over every node
//! kind, generic over the handle used for children. Unlinked trees own their
//! children ([`crate::Tree`]); a linked environment stores nodes in an arena
//! and refers to children by [`NodeId`].
//!
//! The structural operations ([`Kind::children`], [`Kind::try_map`]) are
//! written once per kind as exhaustive matches, so adding a kind is a compile
//! error everywhere it needs handling.

use std::convert::Infallible;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Identity of a linked node: its index in the owning environment's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<C> {
    /// Present from the linked stage onward.
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub span: Option<Span>,
    pub kind: Kind<C>,
}

/// Explicit `self(...)` / `super(...)` call at the start of a constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseCall<C> {
    pub calls_super: bool,
    pub args: Vec<C>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue<C> {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// `[a, b]`: `module` is a reference to the collection class.
    Collection { module: C, elements: Vec<C> },
    /// An anonymous object (or closure) declared inline.
    Singleton(C),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Kind<C> {
    Environment {
        members: Vec<C>,
    },
    Package {
        name: String,
        imports: Vec<C>,
        members: Vec<C>,
    },
    Import {
        entity: C,
        generic: bool,
    },
    Program {
        name: String,
        body: C,
    },
    Test {
        name: String,
        body: C,
    },
    Describe {
        name: String,
        members: Vec<C>,
    },
    Class {
        name: String,
        superclass: Option<C>,
        mixins: Vec<C>,
        members: Vec<C>,
    },
    Singleton {
        name: Option<String>,
        superclass: Option<C>,
        supercall_args: Vec<C>,
        mixins: Vec<C>,
        members: Vec<C>,
        #[serde(default)]
        closure: bool,
    },
    Mixin {
        name: String,
        mixins: Vec<C>,
        members: Vec<C>,
    },
    /// A package-level variable or constant, or a local declaration.
    Variable {
        name: String,
        constant: bool,
        value: Option<C>,
    },
    Field {
        name: String,
        constant: bool,
        value: Option<C>,
    },
    Method {
        name: String,
        parameters: Vec<C>,
        /// `None` for abstract and native methods.
        body: Option<C>,
        native: bool,
    },
    Constructor {
        parameters: Vec<C>,
        base_call: Option<BaseCall<C>>,
        body: C,
    },
    Fixture {
        body: C,
    },
    Parameter {
        name: String,
        var_arg: bool,
    },
    Body {
        sentences: Vec<C>,
    },
    Catch {
        parameter: C,
        parameter_type: Option<C>,
        body: C,
    },
    NamedArgument {
        name: String,
        value: C,
    },
    Return {
        value: Option<C>,
    },
    Assignment {
        variable: C,
        value: C,
    },
    Reference {
        name: String,
        /// Resolution target, always present once linked.
        #[serde(default)]
        target: Option<NodeId>,
    },
    SelfRef,
    Literal {
        value: LiteralValue<C>,
    },
    Send {
        receiver: C,
        message: String,
        args: Vec<C>,
    },
    Super {
        args: Vec<C>,
    },
    New {
        instantiated: C,
        args: Vec<C>,
    },
    If {
        condition: C,
        then_body: C,
        else_body: Option<C>,
    },
    Throw {
        exception: C,
    },
    Try {
        body: C,
        catches: Vec<C>,
        always: Option<C>,
    },
}

fn map_vec<C, D, E, F>(items: Vec<C>, f: &mut F) -> Result<Vec<D>, E>
where
    F: FnMut(C) -> Result<D, E>,
{
    items.into_iter().map(&mut *f).collect()
}

fn map_opt<C, D, E, F>(item: Option<C>, f: &mut F) -> Result<Option<D>, E>
where
    F: FnMut(C) -> Result<D, E>,
{
    item.map(&mut *f).transpose()
}

impl<C> LiteralValue<C> {
    fn children(&self) -> Vec<&C> {
        match self {
            Self::Null | Self::Boolean(_) | Self::Number(_) | Self::String(_) => {
                Vec::new()
            }
            Self::Collection { module, elements } => {
                let mut out = vec![module];
                out.extend(elements);
                out
            }
            Self::Singleton(singleton) => vec![singleton],
        }
    }

    fn try_map<D, E, F>(self, f: &mut F) -> Result<LiteralValue<D>, E>
    where
        F: FnMut(C) -> Result<D, E>,
    {
        Ok(match self {
            Self::Null => LiteralValue::Null,
            Self::Boolean(value) => LiteralValue::Boolean(value),
            Self::Number(value) => LiteralValue::Number(value),
            Self::String(value) => LiteralValue::String(value),
            Self::Collection { module, elements } => LiteralValue::Collection {
                module: f(module)?,
                elements: map_vec(elements, f)?,
            },
            Self::Singleton(singleton) => LiteralValue::Singleton(f(singleton)?),
        })
    }
}

impl<C> Kind<C> {
    /// Direct children in declaration order.
    pub fn children(&self) -> Vec<&C> {
        let mut out = Vec::new();
        match self {
            Self::Environment { members } | Self::Describe { members, .. } => {
                out.extend(members)
            }
            Self::Package {
                imports, members, ..
            } => {
                out.extend(imports);
                out.extend(members);
            }
            Self::Import { entity, .. } => out.push(entity),
            Self::Program { body, .. }
            | Self::Test { body, .. }
            | Self::Fixture { body } => out.push(body),
            Self::Class {
                superclass,
                mixins,
                members,
                ..
            } => {
                out.extend(superclass);
                out.extend(mixins);
                out.extend(members);
            }
            Self::Singleton {
                superclass,
                supercall_args,
                mixins,
                members,
                ..
            } => {
                out.extend(superclass);
                out.extend(supercall_args);
                out.extend(mixins);
                out.extend(members);
            }
            Self::Mixin {
                mixins, members, ..
            } => {
                out.extend(mixins);
                out.extend(members);
            }
            Self::Variable { value, .. } | Self::Field { value, .. } => {
                out.extend(value)
            }
            Self::Method {
                parameters, body, ..
            } => {
                out.extend(parameters);
                out.extend(body);
            }
            Self::Constructor {
                parameters,
                base_call,
                body,
            } => {
                out.extend(parameters);
                if let Some(call) = base_call {
                    out.extend(&call.args);
                }
                out.push(body);
            }
            Self::Parameter { .. } | Self::Reference { .. } | Self::SelfRef => {}
            Self::Body { sentences } => out.extend(sentences),
            Self::Catch {
                parameter,
                parameter_type,
                body,
            } => {
                out.push(parameter);
                out.extend(parameter_type);
                out.push(body);
            }
            Self::NamedArgument { value, .. } => out.push(value),
            Self::Return { value } => out.extend(value),
            Self::Assignment { variable, value } => {
                out.push(variable);
                out.push(value);
            }
            Self::Literal { value } => out.extend(value.children()),
            Self::Send { receiver, args, .. } => {
                out.push(receiver);
                out.extend(args);
            }
            Self::Super { args } => out.extend(args),
            Self::New { instantiated, args } => {
                out.push(instantiated);
                out.extend(args);
            }
            Self::If {
                condition,
                then_body,
                else_body,
            } => {
                out.push(condition);
                out.push(then_body);
                out.extend(else_body);
            }
            Self::Throw { exception } => out.push(exception),
            Self::Try {
                body,
                catches,
                always,
            } => {
                out.push(body);
                out.extend(catches);
                out.extend(always);
            }
        }
        out
    }

    /// Rebuilds this kind with every child replaced by `f(child)`, in the
    /// same order as [`Kind::children`].
    pub fn try_map<D, E, F>(self, f: &mut F) -> Result<Kind<D>, E>
    where
        F: FnMut(C) -> Result<D, E>,
    {
        Ok(match self {
            Self::Environment { members } => Kind::Environment {
                members: map_vec(members, f)?,
            },
            Self::Package {
                name,
                imports,
                members,
            } => Kind::Package {
                name,
                imports: map_vec(imports, f)?,
                members: map_vec(members, f)?,
            },
            Self::Import { entity, generic } => Kind::Import {
                entity: f(entity)?,
                generic,
            },
            Self::Program { name, body } => Kind::Program {
                name,
                body: f(body)?,
            },
            Self::Test { name, body } => Kind::Test {
                name,
                body: f(body)?,
            },
            Self::Describe { name, members } => Kind::Describe {
                name,
                members: map_vec(members, f)?,
            },
            Self::Class {
                name,
                superclass,
                mixins,
                members,
            } => Kind::Class {
                name,
                superclass: map_opt(superclass, f)?,
                mixins: map_vec(mixins, f)?,
                members: map_vec(members, f)?,
            },
            Self::Singleton {
                name,
                superclass,
                supercall_args,
                mixins,
                members,
                closure,
            } => Kind::Singleton {
                name,
                superclass: map_opt(superclass, f)?,
                supercall_args: map_vec(supercall_args, f)?,
                mixins: map_vec(mixins, f)?,
                members: map_vec(members, f)?,
                closure,
            },
            Self::Mixin {
                name,
                mixins,
                members,
            } => Kind::Mixin {
                name,
                mixins: map_vec(mixins, f)?,
                members: map_vec(members, f)?,
            },
            Self::Variable {
                name,
                constant,
                value,
            } => Kind::Variable {
                name,
                constant,
                value: map_opt(value, f)?,
            },
            Self::Field {
                name,
                constant,
                value,
            } => Kind::Field {
                name,
                constant,
                value: map_opt(value, f)?,
            },
            Self::Method {
                name,
                parameters,
                body,
                native,
            } => Kind::Method {
                name,
                parameters: map_vec(parameters, f)?,
                body: map_opt(body, f)?,
                native,
            },
            Self::Constructor {
                parameters,
                base_call,
                body,
            } => {
                let parameters = map_vec(parameters, f)?;
                let base_call = match base_call {
                    Some(call) => Some(BaseCall {
                        calls_super: call.calls_super,
                        args: map_vec(call.args, f)?,
                    }),
                    None => None,
                };
                Kind::Constructor {
                    parameters,
                    base_call,
                    body: f(body)?,
                }
            }
            Self::Fixture { body } => Kind::Fixture { body: f(body)? },
            Self::Parameter { name, var_arg } => Kind::Parameter { name, var_arg },
            Self::Body { sentences } => Kind::Body {
                sentences: map_vec(sentences, f)?,
            },
            Self::Catch {
                parameter,
                parameter_type,
                body,
            } => Kind::Catch {
                parameter: f(parameter)?,
                parameter_type: map_opt(parameter_type, f)?,
                body: f(body)?,
            },
            Self::NamedArgument { name, value } => Kind::NamedArgument {
                name,
                value: f(value)?,
            },
            Self::Return { value } => Kind::Return {
                value: map_opt(value, f)?,
            },
            Self::Assignment { variable, value } => Kind::Assignment {
                variable: f(variable)?,
                value: f(value)?,
            },
            Self::Reference { name, target } => Kind::Reference { name, target },
            Self::SelfRef => Kind::SelfRef,
            Self::Literal { value } => Kind::Literal {
                value: value.try_map(f)?,
            },
            Self::Send {
                receiver,
                message,
                args,
            } => Kind::Send {
                receiver: f(receiver)?,
                message,
                args: map_vec(args, f)?,
            },
            Self::Super { args } => Kind::Super {
                args: map_vec(args, f)?,
            },
            Self::New { instantiated, args } => Kind::New {
                instantiated: f(instantiated)?,
                args: map_vec(args, f)?,
            },
            Self::If {
                condition,
                then_body,
                else_body,
            } => Kind::If {
                condition: f(condition)?,
                then_body: f(then_body)?,
                else_body: map_opt(else_body, f)?,
            },
            Self::Throw { exception } => Kind::Throw {
                exception: f(exception)?,
            },
            Self::Try {
                body,
                catches,
                always,
            } => Kind::Try {
                body: f(body)?,
                catches: map_vec(catches, f)?,
                always: map_opt(always, f)?,
            },
        })
    }

    pub fn map_children<D, F>(self, mut f: F) -> Kind<D>
    where
        F: FnMut(C) -> D,
    {
        match self.try_map(&mut |child| Ok::<D, Infallible>(f(child))) {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }

    /// The declared name of named kinds. Anonymous singletons have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Package { name, .. }
            | Self::Program { name, .. }
            | Self::Test { name, .. }
            | Self::Describe { name, .. }
            | Self::Class { name, .. }
            | Self::Mixin { name, .. }
            | Self::Variable { name, .. }
            | Self::Field { name, .. }
            | Self::Method { name, .. }
            | Self::Parameter { name, .. }
            | Self::NamedArgument { name, .. }
            | Self::Reference { name, .. } => Some(name),
            Self::Singleton { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Environment { .. } => "Environment",
            Self::Package { .. } => "Package",
            Self::Import { .. } => "Import",
            Self::Program { .. } => "Program",
            Self::Test { .. } => "Test",
            Self::Describe { .. } => "Describe",
            Self::Class { .. } => "Class",
            Self::Singleton { .. } => "Singleton",
            Self::Mixin { .. } => "Mixin",
            Self::Variable { .. } => "Variable",
            Self::Field { .. } => "Field",
            Self::Method { .. } => "Method",
            Self::Constructor { .. } => "Constructor",
            Self::Fixture { .. } => "Fixture",
            Self::Parameter { .. } => "Parameter",
            Self::Body { .. } => "Body",
            Self::Catch { .. } => "Catch",
            Self::NamedArgument { .. } => "NamedArgument",
            Self::Return { .. } => "Return",
            Self::Assignment { .. } => "Assignment",
            Self::Reference { .. } => "Reference",
            Self::SelfRef => "Self",
            Self::Literal { .. } => "Literal",
            Self::Send { .. } => "Send",
            Self::Super { .. } => "Super",
            Self::New { .. } => "New",
            Self::If { .. } => "If",
            Self::Throw { .. } => "Throw",
            Self::Try { .. } => "Try",
        }
    }

    /// Class, Singleton or Mixin.
    pub fn is_module(&self) -> bool {
        matches!(
            self,
            Self::Class { .. } | Self::Singleton { .. } | Self::Mixin { .. }
        )
    }

    /// Kinds that can be a direct member of a package.
    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            Self::Package { .. }
                | Self::Program { .. }
                | Self::Test { .. }
                | Self::Describe { .. }
                | Self::Class { .. }
                | Self::Singleton { .. }
                | Self::Mixin { .. }
                | Self::Variable { .. }
        )
    }

    /// Kinds that leave a value when evaluated.
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            Self::Reference { .. }
                | Self::SelfRef
                | Self::Literal { .. }
                | Self::Send { .. }
                | Self::Super { .. }
                | Self::New { .. }
                | Self::If { .. }
                | Self::Try { .. }
        )
    }

    /// Mixins declared by a module, in declaration order.
    pub fn mixins(&self) -> &[C] {
        match self {
            Self::Class { mixins, .. }
            | Self::Singleton { mixins, .. }
            | Self::Mixin { mixins, .. } => mixins,
            _ => &[],
        }
    }

    /// Members of container kinds (packages, modules, describes).
    pub fn members(&self) -> &[C] {
        match self {
            Self::Environment { members }
            | Self::Package { members, .. }
            | Self::Describe { members, .. }
            | Self::Class { members, .. }
            | Self::Singleton { members, .. }
            | Self::Mixin { members, .. } => members,
            _ => &[],
        }
    }
}

impl<C> Node<C> {
    pub fn new(kind: Kind<C>) -> Self {
        Self {
            id: None,
            span: None,
            kind,
        }
    }

    pub fn children(&self) -> Vec<&C> {
        self.kind.children()
    }

    pub fn try_map<D, E, F>(self, f: &mut F) -> Result<Node<D>, E>
    where
        F: FnMut(C) -> Result<D, E>,
    {
        Ok(Node {
            id: self.id,
            span: self.span,
            kind: self.kind.try_map(f)?,
        })
    }

    pub fn map_children<D, F>(self, f: F) -> Node<D>
    where
        F: FnMut(C) -> D,
    {
        Node {
            id: self.id,
            span: self.span,
            kind: self.kind.map_children(f),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.kind.name()
    }
}
