//! The linked program graph.
//!
//! Nodes live in a flat arena indexed by [`NodeId`]; every cross-node
//! relationship (children, reference targets, parents, hierarchies) is an
//! index. Derived relations are memoized in [`Caches`], which belong to one
//! environment and can be dropped at any time without changing results.

use std::collections::HashMap;
use std::sync::Arc;

use ast::{Kind, Node, NodeId, Tree};
use parking_lot::RwLock;

#[derive(Default)]
pub(crate) struct Caches {
    pub(crate) parents: Option<Arc<[Option<NodeId>]>>,
    pub(crate) hierarchies: HashMap<NodeId, Arc<[NodeId]>>,
    pub(crate) methods: HashMap<(NodeId, String, usize), Option<NodeId>>,
    pub(crate) names: HashMap<NodeId, String>,
    pub(crate) entities: Option<Arc<HashMap<String, NodeId>>>,
}

pub struct Environment {
    pub(crate) nodes: Vec<Node<NodeId>>,
    pub(crate) root: NodeId,
    pub(crate) cache: RwLock<Caches>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Environment {
    pub(crate) fn from_nodes(nodes: Vec<Node<NodeId>>, root: NodeId) -> Self {
        Self {
            nodes,
            root,
            cache: RwLock::new(Caches::default()),
        }
    }

    /// # Panics
    ///
    /// Panics if `id` was not minted by this environment.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<NodeId> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node<NodeId>> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &Kind<NodeId> {
        &self.node(id).kind
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level packages.
    pub fn members(&self) -> &[NodeId] {
        self.kind(self.root).members()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children().into_iter().copied().collect()
    }

    /// Every node below `id`, pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Resolution target of a reference node.
    pub fn target(&self, reference: NodeId) -> Option<NodeId> {
        match self.kind(reference) {
            Kind::Reference { target, .. } => *target,
            _ => None,
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.kind(id).name()
    }

    /// Finds a named entity by fully-qualified name.
    pub fn entity(&self, fqn: &str) -> Option<NodeId> {
        self.entities().get(fqn).copied()
    }

    pub(crate) fn entities(&self) -> Arc<HashMap<String, NodeId>> {
        if let Some(entities) = &self.cache.read().entities {
            return entities.clone();
        }
        let mut entities = HashMap::new();
        for id in self.descendants(self.root) {
            if self.is_addressable(id) {
                entities.insert(self.fully_qualified_name(id), id);
            }
        }
        let entities = Arc::new(entities);
        self.cache.write().entities = Some(entities.clone());
        entities
    }

    fn is_addressable(&self, id: NodeId) -> bool {
        let kind = self.kind(id);
        if !kind.is_entity() || kind.name().is_none() {
            return false;
        }
        match self.parent_of(id).map(|parent| self.kind(parent)) {
            Ok(Kind::Environment { .. } | Kind::Package { .. }) => true,
            Ok(Kind::Describe { .. }) => matches!(kind, Kind::Test { .. }),
            _ => false,
        }
    }

    pub fn clear_caches(&self) {
        *self.cache.write() = Caches::default();
    }

    pub(crate) fn parent_index(&self) -> Arc<[Option<NodeId>]> {
        if let Some(parents) = &self.cache.read().parents {
            return parents.clone();
        }
        let mut parents = vec![None; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            for child in self.children(id) {
                parents[child.index()] = Some(id);
                stack.push(child);
            }
        }
        let parents: Arc<[Option<NodeId>]> = parents.into();
        self.cache.write().parents = Some(parents.clone());
        parents
    }

    /// Rebuilds owned trees for the top-level packages, keeping identities.
    pub fn unlink(&self) -> Vec<Tree> {
        self.members().iter().map(|&id| self.unlink_node(id)).collect()
    }

    pub(crate) fn unlink_node(&self, id: NodeId) -> Tree {
        let node = self.node(id).clone();
        Tree(Box::new(node.map_children(|child| self.unlink_node(child))))
    }

    pub(crate) fn set_target(&mut self, reference: NodeId, resolved: NodeId) {
        if let Kind::Reference { target, .. } = &mut self.nodes[reference.index()].kind {
            *target = Some(resolved);
        }
    }
}
