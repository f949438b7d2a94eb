use ast::{Filled, Forest, Kind, Node, NodeId, Tree};
use log::{debug, trace};

use crate::environment::Environment;
use crate::error::LinkError;
use crate::scope::{ScopeStack, Visibility};

/// Links a filled forest, optionally on top of an already linked base.
///
/// Packages sharing a name are merged, every node without an identity gets
/// a fresh one (base nodes keep theirs), and every reference is resolved.
pub fn link(forest: Forest<Filled>, base: Option<&Environment>) -> Result<Environment, LinkError> {
    let (mut packages, root_id, mut next) = match base {
        Some(base) => (base.unlink(), Some(base.root()), base.len() as u32),
        None => (Vec::new(), None, 0),
    };

    for package in forest.into_packages() {
        merge_into(&mut packages, package);
    }
    debug!("merged into {} top-level packages", packages.len());

    let mut root = Tree::new(Kind::Environment { members: packages });
    root.id = root_id;
    let root = assign_ids(root, &mut next);

    let mut slots: Vec<Option<Node<NodeId>>> = Vec::with_capacity(next as usize);
    let root = flatten(root, &mut slots)?;
    let nodes = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| LinkError::MalformedBase(format!("no node with identity {index}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!("assigned {} identities", nodes.len());

    let mut environment = Environment::from_nodes(nodes, root);
    environment.parent_index();

    let imports = resolve_imports(&environment)?;
    apply(&mut environment, imports);
    let supertypes = resolve_supertypes(&environment)?;
    apply(&mut environment, supertypes);
    environment.clear_caches();
    let references = resolve_references(&environment)?;
    apply(&mut environment, references);

    environment.clear_caches();
    debug!("linked environment with {} nodes", environment.len());
    Ok(environment)
}

fn merge_into(packages: &mut Vec<Tree>, package: Tree) {
    let existing = packages.iter_mut().find(|candidate| {
        matches!(candidate.kind, Kind::Package { .. }) && candidate.name() == package.name()
    });
    match existing {
        Some(existing) => merge_package(existing, package),
        None => packages.push(package),
    }
}

fn merge_package(into: &mut Tree, package: Tree) {
    let Kind::Package {
        imports: new_imports,
        members: new_members,
        ..
    } = package.into_node().kind
    else {
        return;
    };
    if let Kind::Package {
        imports, members, ..
    } = &mut into.kind
    {
        imports.extend(new_imports);
        for member in new_members {
            if matches!(member.kind, Kind::Package { .. }) {
                merge_into(members, member);
            } else {
                members.push(member);
            }
        }
    }
}

fn assign_ids(tree: Tree, next: &mut u32) -> Tree {
    let mut node = tree.into_node();
    if node.id.is_none() {
        node.id = Some(NodeId(*next));
        *next += 1;
    }
    Tree(Box::new(node.map_children(|child| assign_ids(child, next))))
}

fn flatten(tree: Tree, slots: &mut Vec<Option<Node<NodeId>>>) -> Result<NodeId, LinkError> {
    let node = tree.into_node();
    let id = node
        .id
        .ok_or_else(|| LinkError::MalformedBase("node without identity".into()))?;
    let node = node.try_map(&mut |child| flatten(child, slots))?;
    let index = id.index();
    if slots.len() <= index {
        slots.resize_with(index + 1, || None);
    }
    if slots[index].replace(node).is_some() {
        return Err(LinkError::MalformedBase(format!("duplicate identity {id}")));
    }
    Ok(id)
}

fn apply(environment: &mut Environment, resolved: Vec<(NodeId, NodeId)>) {
    for (reference, target) in resolved {
        environment.set_target(reference, target);
    }
}

fn unresolved(environment: &Environment, reference: NodeId) -> LinkError {
    let node = environment.node(reference);
    LinkError::UnresolvedReference {
        name: node.name().unwrap_or_default().to_string(),
        span: node.span,
    }
}

fn pending_reference(environment: &Environment, id: NodeId) -> Option<&str> {
    match environment.kind(id) {
        Kind::Reference { name, target: None } => Some(name),
        _ => None,
    }
}

/// Imports name entities from the root, not from the importing scope.
fn resolve_imports(environment: &Environment) -> Result<Vec<(NodeId, NodeId)>, LinkError> {
    let mut resolved = Vec::new();
    for id in environment.ids() {
        let Kind::Import { entity, .. } = environment.kind(id) else {
            continue;
        };
        let Some(name) = pending_reference(environment, *entity) else {
            continue;
        };
        let target = environment
            .resolve_qualified(name)
            .ok_or_else(|| unresolved(environment, *entity))?;
        trace!("import {name} -> {target}");
        resolved.push((*entity, target));
    }
    debug!("resolved {} imports", resolved.len());
    Ok(resolved)
}

/// Supertypes are resolved before anything else so that module scopes can
/// include inherited names. They only see lexically declared names.
fn resolve_supertypes(environment: &Environment) -> Result<Vec<(NodeId, NodeId)>, LinkError> {
    let mut resolved = Vec::new();
    for id in environment.ids() {
        let kind = environment.kind(id);
        if !kind.is_module() {
            continue;
        }
        let mut supertypes: Vec<NodeId> = kind.mixins().to_vec();
        if let Kind::Class {
            superclass: Some(superclass),
            ..
        }
        | Kind::Singleton {
            superclass: Some(superclass),
            ..
        } = kind
        {
            supertypes.push(*superclass);
        }

        for reference in supertypes {
            let Some(name) = pending_reference(environment, reference) else {
                continue;
            };
            let scope = environment.scope_with(reference, Visibility::Lexical);
            let target = environment
                .resolve_name(name, |head| scope.get(head).copied())
                .ok_or_else(|| unresolved(environment, reference))?;
            if !environment.kind(target).is_module() {
                return Err(LinkError::MissingAncestor(id));
            }
            trace!("supertype {name} of {id} -> {target}");
            resolved.push((reference, target));
        }
    }
    debug!("resolved {} supertypes", resolved.len());
    Ok(resolved)
}

fn resolve_references(environment: &Environment) -> Result<Vec<(NodeId, NodeId)>, LinkError> {
    let mut resolved = Vec::new();
    let mut scopes = ScopeStack::default();
    visit(environment, environment.root(), &mut scopes, &mut resolved)?;
    debug!("resolved {} references", resolved.len());
    Ok(resolved)
}

fn visit(
    environment: &Environment,
    id: NodeId,
    scopes: &mut ScopeStack,
    resolved: &mut Vec<(NodeId, NodeId)>,
) -> Result<(), LinkError> {
    if let Some(name) = pending_reference(environment, id) {
        let target = environment
            .resolve_name(name, |head| scopes.lookup(head))
            .ok_or_else(|| unresolved(environment, id))?;
        trace!("{name} -> {target}");
        resolved.push((id, target));
        return Ok(());
    }

    scopes.push(environment.contribution(id, Visibility::Inherited));
    for child in environment.children(id) {
        visit(environment, child, scopes, resolved)?;
    }
    scopes.pop();
    Ok(())
}
