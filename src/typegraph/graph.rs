//! Arena of type nodes addressed by [`TypeId`] and by [`QualifiedName`].

use std::{
    collections::{HashMap, HashSet},
    ops::{Index, IndexMut},
};

use crate::typegraph::{wellknown, QualifiedName, TypeId, TypeKind, TypeNode};

/// Identity-addressed store of type nodes
///
/// Nodes are never removed. Pointer views and inline arrays are owned by the graph like any
/// other node and referenced by id everywhere else. A mapping table redirects identities that
/// are emitted as another node, such as `BOOL` as `System.Boolean` or a deduplicated clone.
#[derive(Debug, Default)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    by_name: HashMap<QualifiedName, TypeId>,
    mapped: HashMap<QualifiedName, TypeId>,
}

impl TypeGraph {
    /// An empty graph
    #[must_use]
    pub fn new() -> Self {
        TypeGraph::default()
    }

    /// A graph holding the system types and their typedef mappings
    #[must_use]
    pub fn with_well_known() -> Self {
        let mut graph = TypeGraph::new();
        wellknown::register(&mut graph);
        graph
    }

    /// Add `node`, replacing a node of the same name in place
    pub fn insert(&mut self, node: TypeNode) -> TypeId {
        if let Some(&id) = self.by_name.get(&node.name) {
            self.nodes[id.0] = node;
            return id;
        }

        let id = TypeId(self.nodes.len());
        self.by_name.insert(node.name.clone(), id);
        self.nodes.push(node);
        id
    }

    /// The node behind `id`
    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&TypeNode> {
        self.nodes.get(id.0)
    }

    /// The node behind `id`, mutably
    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut TypeNode> {
        self.nodes.get_mut(id.0)
    }

    /// Id of the node named `name`
    #[must_use]
    pub fn find(&self, name: &QualifiedName) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Id of the node whose dotted full name is `full_name`
    #[must_use]
    pub fn find_full_name(&self, full_name: &str) -> Option<TypeId> {
        self.find(&QualifiedName::parse(full_name))
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph holds no node
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (TypeId(index), node))
    }

    /// The pointer-stripped node of `id`
    #[must_use]
    pub fn strip_pointer(&self, id: TypeId) -> TypeId {
        match self.get(id).map(|node| &node.kind) {
            Some(TypeKind::Pointer { base, .. }) => *base,
            _ => id,
        }
    }

    /// The node for `levels` more levels of indirection over `target`, created on first use
    pub fn pointer_to(&mut self, target: TypeId, levels: usize) -> TypeId {
        if levels == 0 {
            return target;
        }

        let (base, existing) = match self.get(target).map(|node| &node.kind) {
            Some(TypeKind::Pointer { base, indirections }) => (*base, *indirections),
            _ => (target, 0),
        };

        let indirections = existing + levels;
        let name = self[base].name.with_indirections(indirections);
        if let Some(id) = self.find(&name) {
            return id;
        }

        let mut node = TypeNode::new(name, TypeKind::Pointer { base, indirections });
        node.is_nested = self[base].is_nested;
        self.insert(node)
    }

    /// Copy `id` under a new identity
    pub fn clone_as(&mut self, id: TypeId, name: QualifiedName) -> TypeId {
        let copy = self[id].clone_as(name);
        self.insert(copy)
    }

    /// Emit `from` as `to`
    pub fn add_mapping(&mut self, from: QualifiedName, to: TypeId) {
        self.mapped.insert(from, to);
    }

    /// The node `name` is emitted as, if it is redirected
    #[must_use]
    pub fn mapping(&self, name: &QualifiedName) -> Option<TypeId> {
        self.mapped.get(name).copied()
    }

    /// The node `id` is emitted as
    ///
    /// Pointers over a redirected base map to the pointer over the target when that pointer
    /// exists; [`TypeGraph::materialize_mapped_pointers`] creates them.
    #[must_use]
    pub fn map(&self, id: TypeId) -> TypeId {
        let Some(node) = self.get(id) else {
            return id;
        };

        if let Some(target) = self.mapping(&node.name) {
            if target != id {
                return target;
            }
        }

        if let TypeKind::Pointer { base, indirections } = node.kind {
            if let Some(target) = self.mapping(&self[base].name) {
                let name = self[target].name.with_indirections(indirections);
                if let Some(pointer) = self.find(&name) {
                    return pointer;
                }
            }
        }

        id
    }

    /// Create the pointer views that [`TypeGraph::map`] redirects to
    pub fn materialize_mapped_pointers(&mut self) {
        let pending: Vec<(TypeId, usize)> = self
            .nodes
            .iter()
            .filter_map(|node| match node.kind {
                TypeKind::Pointer { base, indirections } => self
                    .mapping(&self[base].name)
                    .map(|target| (target, indirections)),
                _ => None,
            })
            .collect();

        for (target, indirections) in pending {
            self.pointer_to(target, indirections);
        }
    }

    /// Interfaces of `id` and of its interfaces, depth first
    #[must_use]
    pub fn all_interfaces(&self, id: TypeId) -> Vec<TypeId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_interfaces(id, &mut seen, &mut out);
        out
    }

    fn collect_interfaces(&self, id: TypeId, seen: &mut HashSet<TypeId>, out: &mut Vec<TypeId>) {
        let Some(node) = self.get(id) else {
            return;
        };

        for &iface in &node.interfaces {
            if seen.insert(iface) {
                out.push(iface);
                self.collect_interfaces(iface, seen, out);
            }
        }
    }
}

impl Index<TypeId> for TypeGraph {
    type Output = TypeNode;

    fn index(&self, id: TypeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl IndexMut<TypeId> for TypeGraph {
    fn index_mut(&mut self, id: TypeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}
