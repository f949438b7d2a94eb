//! Relations derived from a linked [`Environment`].
//!
//! All of these are pure functions of the environment. The expensive ones
//! are memoized in the environment's own cache, so two environments never
//! share results.

use std::collections::HashSet;
use std::sync::Arc;

use ast::{Kind, NodeId, OBJECT};
use log::trace;

use crate::environment::Environment;
use crate::error::LinkError;

impl Environment {
    /// The node whose children include `id`.
    pub fn parent_of(&self, id: NodeId) -> Result<NodeId, LinkError> {
        self.parent_index()
            .get(id.index())
            .copied()
            .flatten()
            .ok_or(LinkError::MissingAncestor(id))
    }

    /// Parent chain of `id`, nearest first. Does not include `id`.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let parents = self.parent_index();
        let mut out = Vec::new();
        let mut current = id;
        while let Some(Some(parent)) = parents.get(current.index()) {
            out.push(*parent);
            current = *parent;
        }
        out
    }

    /// Nearest enclosing module or describe, excluding `id` itself.
    pub fn enclosing_module(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).into_iter().find(|&ancestor| {
            let kind = self.kind(ancestor);
            kind.is_module() || matches!(kind, Kind::Describe { .. })
        })
    }

    /// Nearest enclosing method, excluding `id` itself.
    pub fn enclosing_method(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|&ancestor| matches!(self.kind(ancestor), Kind::Method { .. }))
    }

    /// Declared superclass of a class or singleton. Describes inherit the
    /// root object class implicitly.
    pub fn superclass(&self, module: NodeId) -> Option<NodeId> {
        let declared = match self.kind(module) {
            Kind::Class { superclass, .. } | Kind::Singleton { superclass, .. } => {
                superclass.and_then(|reference| self.target(reference))
            }
            Kind::Describe { .. } => self.entity(OBJECT),
            _ => None,
        };
        declared.filter(|&target| self.kind(target).is_module())
    }

    /// Mixins then superclass, as declared.
    pub(crate) fn supertypes(&self, module: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .kind(module)
            .mixins()
            .iter()
            .filter_map(|&reference| self.target(reference))
            .filter(|&target| self.kind(target).is_module())
            .collect();
        out.extend(self.superclass(module));
        out
    }

    /// Linearized ancestors of `module`, starting with `module` itself.
    ///
    /// Each supertype is expanded depth-first; a module already visited is
    /// never expanded again, so this terminates on cyclic graphs and never
    /// lists a module twice.
    pub fn hierarchy(&self, module: NodeId) -> Arc<[NodeId]> {
        if let Some(found) = self.cache.read().hierarchies.get(&module) {
            return found.clone();
        }
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.expand_hierarchy(module, &mut visited, &mut out);
        let hierarchy: Arc<[NodeId]> = out.into();
        self.cache
            .write()
            .hierarchies
            .insert(module, hierarchy.clone());
        hierarchy
    }

    fn expand_hierarchy(
        &self,
        module: NodeId,
        visited: &mut HashSet<NodeId>,
        out: &mut Vec<NodeId>,
    ) {
        if !visited.insert(module) {
            return;
        }
        out.push(module);
        for supertype in self.supertypes(module) {
            self.expand_hierarchy(supertype, visited, out);
        }
    }

    pub fn inherits(&self, module: NodeId, ancestor: NodeId) -> bool {
        self.hierarchy(module).contains(&ancestor)
    }

    /// Fields declared across the hierarchy, outermost-declared first.
    pub fn fields_of(&self, module: NodeId) -> Vec<NodeId> {
        self.hierarchy(module)
            .iter()
            .rev()
            .flat_map(|&ancestor| self.kind(ancestor).members().iter().copied())
            .filter(|&member| matches!(self.kind(member), Kind::Field { .. }))
            .collect()
    }

    /// True if a method or constructor with these parameters accepts `arity`
    /// arguments. A trailing var-arg parameter accepts zero or more.
    pub fn accepts_arity(&self, parameters: &[NodeId], arity: usize) -> bool {
        match parameters.last().map(|&last| self.kind(last)) {
            Some(Kind::Parameter { var_arg: true, .. }) => arity + 1 >= parameters.len(),
            _ => arity == parameters.len(),
        }
    }

    fn declares_method(&self, module: NodeId, name: &str, arity: usize) -> Option<NodeId> {
        self.kind(module).members().iter().copied().find(|&member| {
            matches!(
                self.kind(member),
                Kind::Method { name: method, parameters, body, native }
                    if method == name
                        && (body.is_some() || *native)
                        && self.accepts_arity(parameters, arity)
            )
        })
    }

    /// First concrete method answering `name` with `arity` arguments along
    /// the hierarchy of `module`. `None` is not an error: callers fall back
    /// to `messageNotUnderstood`.
    pub fn lookup_method(&self, module: NodeId, name: &str, arity: usize) -> Option<NodeId> {
        let key = (module, name.to_string(), arity);
        if let Some(found) = self.cache.read().methods.get(&key) {
            return *found;
        }
        let found = self
            .hierarchy(module)
            .iter()
            .find_map(|&ancestor| self.declares_method(ancestor, name, arity));
        trace!("lookup {name}/{arity} on {module} -> {found:?}");
        self.cache.write().methods.insert(key, found);
        found
    }

    /// Like [`Environment::lookup_method`], but only considers the modules
    /// after `start` in the hierarchy of `module`. This is how `super` skips
    /// the definition it is called from.
    pub fn lookup_method_after(
        &self,
        module: NodeId,
        name: &str,
        arity: usize,
        start: NodeId,
    ) -> Option<NodeId> {
        let hierarchy = self.hierarchy(module);
        let position = hierarchy.iter().position(|&ancestor| ancestor == start)?;
        hierarchy[position + 1..]
            .iter()
            .find_map(|&ancestor| self.declares_method(ancestor, name, arity))
    }

    /// Constructor for `arity` arguments. Modules that declare no constructor
    /// use their superclass's.
    pub fn lookup_constructor(&self, module: NodeId, arity: usize) -> Option<NodeId> {
        let mut visited = HashSet::new();
        let mut current = Some(module);
        while let Some(module) = current {
            if !visited.insert(module) {
                return None;
            }
            let constructors: Vec<NodeId> = self
                .kind(module)
                .members()
                .iter()
                .copied()
                .filter(|&member| matches!(self.kind(member), Kind::Constructor { .. }))
                .collect();
            if !constructors.is_empty() {
                return constructors.into_iter().find(|&constructor| {
                    matches!(
                        self.kind(constructor),
                        Kind::Constructor { parameters, .. }
                            if self.accepts_arity(parameters, arity)
                    )
                });
            }
            current = self.superclass(module);
        }
        None
    }

    /// Dotted path of package, describe and entity names. Anonymous singletons
    /// are named after their superclass and identity: `wollok.lang.Object#42`.
    pub fn fully_qualified_name(&self, id: NodeId) -> String {
        if let Some(name) = self.cache.read().names.get(&id) {
            return name.clone();
        }
        let name = match self.kind(id) {
            Kind::Singleton { name: None, .. } => {
                let base = match self.superclass(id) {
                    Some(superclass) => self.fully_qualified_name(superclass),
                    None => OBJECT.to_string(),
                };
                format!("{base}#{id}")
            }
            kind => {
                let own = kind.name().unwrap_or(kind.kind_name());
                let mut path: Vec<&str> = self
                    .ancestors(id)
                    .into_iter()
                    .filter(|&ancestor| {
                        matches!(
                            self.kind(ancestor),
                            Kind::Package { .. } | Kind::Describe { .. }
                        )
                    })
                    .filter_map(|ancestor| self.name(ancestor))
                    .collect();
                path.reverse();
                path.push(own);
                path.join(".")
            }
        };
        self.cache.write().names.insert(id, name.clone());
        name
    }
}
