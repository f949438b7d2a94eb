//! Runtime objects and lexical contexts.
//!
//! Objects and contexts live in two flat tables addressed by index. Nothing
//! is ever reclaimed: volume is bounded by what the program allocates.
//!
//! Name lookup walks a chain of [`Link`]s: a context checks its locals, an
//! object checks its fields (and answers `self`), then the walk continues
//! with the parent. Method contexts hang from their receiver; objects hang
//! from the root context, except singleton literals, which hang from the
//! context that created them.

use std::collections::HashMap;

use ast::NodeId;
use bytecode::ObjectId;

use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

impl ContextId {
    pub const ROOT: ContextId = ContextId(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Context(ContextId),
    Object(ObjectId),
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    pub parent: Option<Link>,
    pub locals: HashMap<String, ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inner {
    Number(f64),
    String(String),
    Collection(Vec<ObjectId>),
}

#[derive(Debug, Clone)]
pub struct RuntimeObject {
    pub id: ObjectId,
    pub module: NodeId,
    pub fields: HashMap<String, ObjectId>,
    pub inner: Option<Inner>,
    pub parent: ContextId,
    /// Closures are transparent to `self`.
    pub answers_self: bool,
}

/// Interning key of a number: fixed five-decimal precision.
pub fn number_key(value: f64) -> String {
    format!("N!{:.5}", canonical_number(value))
}

pub fn string_key(value: &str) -> String {
    format!("S!{value}")
}

/// Canonical value of a number once interned. Anything that rounds to
/// zero is positive zero.
pub fn canonical_number(value: f64) -> f64 {
    let rounded: f64 = format!("{value:.5}").parse().unwrap_or(value);
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Modules of the objects every heap starts with.
#[derive(Debug, Clone, Copy)]
pub struct WellKnown {
    pub null: NodeId,
    pub boolean: NodeId,
    pub void: NodeId,
}

#[derive(Debug, Clone)]
pub struct Heap {
    objects: Vec<RuntimeObject>,
    contexts: Vec<Context>,
    interned: HashMap<String, ObjectId>,
}

impl Heap {
    pub fn new(well_known: WellKnown) -> Self {
        let mut heap = Self {
            objects: Vec::new(),
            contexts: vec![Context::default()],
            interned: HashMap::new(),
        };
        heap.allocate(well_known.null, None, ContextId::ROOT, true);
        heap.allocate(well_known.boolean, None, ContextId::ROOT, true);
        heap.allocate(well_known.boolean, None, ContextId::ROOT, true);
        heap.allocate(well_known.void, None, ContextId::ROOT, true);
        heap
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Result<&RuntimeObject, RuntimeError> {
        self.objects
            .get(id.index())
            .ok_or(RuntimeError::UnknownObject(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut RuntimeObject, RuntimeError> {
        self.objects
            .get_mut(id.index())
            .ok_or(RuntimeError::UnknownObject(id))
    }

    pub fn allocate(
        &mut self,
        module: NodeId,
        inner: Option<Inner>,
        parent: ContextId,
        answers_self: bool,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(RuntimeObject {
            id,
            module,
            fields: HashMap::new(),
            inner,
            parent,
            answers_self,
        });
        id
    }

    /// Returns the object interned under `key`, allocating it on first use.
    pub fn intern(&mut self, key: String, module: NodeId, inner: impl FnOnce() -> Inner) -> ObjectId {
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = self.allocate(module, Some(inner()), ContextId::ROOT, true);
        self.interned.insert(key, id);
        id
    }

    pub fn number(&mut self, value: f64, module: NodeId) -> ObjectId {
        self.intern(number_key(value), module, || {
            Inner::Number(canonical_number(value))
        })
    }

    pub fn string(&mut self, value: &str, module: NodeId) -> ObjectId {
        self.intern(string_key(value), module, || Inner::String(value.to_string()))
    }

    pub fn context(&self, id: ContextId) -> &Context {
        &self.contexts[id.index()]
    }

    pub fn new_context(&mut self, parent: Link) -> ContextId {
        let id = ContextId(self.contexts.len() as u32);
        self.contexts.push(Context {
            parent: Some(parent),
            locals: HashMap::new(),
        });
        id
    }

    /// Binds `name` in `context` itself, shadowing outer bindings.
    pub fn declare(&mut self, context: ContextId, name: &str, value: ObjectId) {
        self.contexts[context.index()]
            .locals
            .insert(name.to_string(), value);
    }

    pub fn lookup(&self, from: ContextId, name: &str) -> Option<ObjectId> {
        let mut link = Some(Link::Context(from));
        while let Some(current) = link {
            match current {
                Link::Context(id) => {
                    let context = &self.contexts[id.index()];
                    if let Some(&value) = context.locals.get(name) {
                        return Some(value);
                    }
                    link = context.parent;
                }
                Link::Object(id) => {
                    let object = self.objects.get(id.index())?;
                    if object.answers_self && name == "self" {
                        return Some(id);
                    }
                    if let Some(&value) = object.fields.get(name) {
                        return Some(value);
                    }
                    link = Some(Link::Context(object.parent));
                }
            }
        }
        None
    }

    /// Rebinds the nearest existing binding of `name`. Returns false when
    /// there is none.
    pub fn assign(&mut self, from: ContextId, name: &str, value: ObjectId) -> bool {
        let mut link = Some(Link::Context(from));
        while let Some(current) = link {
            match current {
                Link::Context(id) => {
                    let context = &mut self.contexts[id.index()];
                    if let Some(slot) = context.locals.get_mut(name) {
                        *slot = value;
                        return true;
                    }
                    link = context.parent;
                }
                Link::Object(id) => {
                    let Some(object) = self.objects.get_mut(id.index()) else {
                        return false;
                    };
                    if let Some(slot) = object.fields.get_mut(name) {
                        *slot = value;
                        return true;
                    }
                    link = Some(Link::Context(object.parent));
                }
            }
        }
        false
    }
}
