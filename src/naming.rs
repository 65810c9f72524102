//! Output identities.
//!
//! Every emitted node lands in one unit whose relative path is its namespace as directories
//! followed by its file name. In unified mode all nodes share a single namespace, so distinct
//! types can claim the same path; file systems compare names case-insensitively, which makes
//! `AVIStreamHeader` and `AVISTREAMHEADER` collide as well. The [`NameArbiter`] resolves each
//! colliding group by prefixing the simple names with namespace segments, right to left, until
//! they are unique, and clones the nodes under the shortened names. A group that stays
//! ambiguous once every segment is used gets `_0`, `_1`, ... file name suffixes.
//!
//! Unified mode also routes the constants and functions of API holders into two aggregate
//! units, built by [`NameArbiter::build_aggregates`].

use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
};

use log::{debug, info};

use crate::{
    config::Unified,
    metadata::catalog::FieldAttributes,
    typegraph::{wellknown, Field, QualifiedName, TypeGraph, TypeId, TypeKind, TypeNode},
};

/// Nodes to emit and the API holders feeding the unified aggregates
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    /// Nodes emitted as units of their own, sorted by qualified name
    pub types: Vec<TypeId>,
    /// API holders whose fields go to the constants aggregate
    pub constant_sources: Vec<TypeId>,
    /// API holders whose methods go to the functions aggregate
    pub function_sources: Vec<TypeId>,
}

/// Assigns output paths and settles path collisions
pub struct NameArbiter {
    unified: Option<Unified>,
    extension: String,
}

impl NameArbiter {
    /// An arbiter for units with file `extension`, in unified mode if `unified` is set
    #[must_use]
    pub fn new(unified: Option<Unified>, extension: impl Into<String>) -> Self {
        NameArbiter {
            unified,
            extension: extension.into(),
        }
    }

    /// The unified settings, if active
    #[must_use]
    pub fn unified(&self) -> Option<&Unified> {
        self.unified.as_ref()
    }

    /// The namespace `node` is emitted in
    #[must_use]
    pub fn namespace<'n>(&'n self, node: &'n TypeNode) -> &'n str {
        match &self.unified {
            Some(unified) => &unified.namespace,
            None => node.name.namespace(),
        }
    }

    /// Path of the unit of `node`, relative to the output directory
    #[must_use]
    pub fn relative_path(&self, node: &TypeNode) -> PathBuf {
        let mut path: PathBuf = self
            .namespace(node)
            .split('.')
            .filter(|segment| !segment.is_empty())
            .collect();
        path.push(format!("{}.{}", node.file_name(), self.extension));
        path
    }

    /// True if `node` is one of the aggregates
    #[must_use]
    pub fn is_aggregate(&self, node: &TypeNode) -> bool {
        let Some(unified) = &self.unified else {
            return false;
        };

        node.name.namespace() == unified.namespace
            && [&unified.constants_file_name, &unified.functions_file_name]
                .into_iter()
                .flatten()
                .any(|name| name == node.name.name())
    }

    /// The emission plan for the must-emit set `types`
    ///
    /// Mapped nodes are replaced by their target, nodes that are not generated are dropped.
    /// In unified mode API holders are diverted to the aggregates and colliding nodes are
    /// replaced by clones with unique names; the graph records each replacement as a mapping.
    pub fn plan(&self, graph: &mut TypeGraph, types: &[TypeId]) -> OutputPlan {
        let mut sorted = types.to_vec();
        sorted.sort_by(|a, b| graph[*a].name.cmp(&graph[*b].name));

        let mut plan = OutputPlan::default();
        let mut seen = HashSet::new();
        for id in sorted {
            let id = graph.map(id);
            let node = &graph[id];
            if !node.is_generated || !seen.insert(id) {
                continue;
            }

            if let Some(unified) = &self.unified {
                if node.is_api_holder() && !self.is_aggregate(node) {
                    if unified.constants_file_name.is_some() {
                        plan.constant_sources.push(id);
                    }
                    if unified.functions_file_name.is_some() {
                        plan.function_sources.push(id);
                    }
                    if unified.constants_file_name.is_some()
                        && unified.functions_file_name.is_some()
                    {
                        continue;
                    }
                }
            }

            plan.types.push(id);
        }

        if self.unified.is_some() {
            self.deduplicate(graph, &mut plan.types);
            graph.materialize_mapped_pointers();
        }

        info!("{} units planned", plan.types.len());
        plan
    }

    fn deduplicate(&self, graph: &mut TypeGraph, types: &mut Vec<TypeId>) {
        let mut groups: BTreeMap<String, Vec<TypeId>> = BTreeMap::new();
        for &id in types.iter() {
            let path = self.relative_path(&graph[id]);
            groups
                .entry(path.to_string_lossy().to_lowercase())
                .or_default()
                .push(id);
        }

        let mut taken: HashSet<String> = groups
            .values()
            .filter(|group| group.len() == 1)
            .map(|group| graph[group[0]].file_name().to_lowercase())
            .collect();

        let mut replacements = Vec::new();
        for group in groups.values().filter(|group| group.len() > 1) {
            match shortened_names(graph, group, &taken) {
                Some(names) => {
                    for (&id, short) in group.iter().zip(names) {
                        taken.insert(short.to_lowercase());
                        let name = clone_name(&graph[id], &short);
                        if name == graph[id].name {
                            continue;
                        }
                        debug!("Renaming {} to {}", graph[id].name, name);
                        let original = graph[id].name.clone();
                        let clone = graph.clone_as(id, name);
                        graph.add_mapping(original, clone);
                        replacements.push((id, clone));
                    }
                }
                None => {
                    for (index, &id) in group.iter().enumerate() {
                        let file_name = format!("{}_{}", graph[id].file_name(), index);
                        taken.insert(file_name.to_lowercase());
                        debug!("Renaming file of {} to {}", graph[id].name, file_name);
                        graph[id].set_file_name(file_name);
                    }
                }
            }
        }

        for (original, clone) in replacements {
            if let Some(slot) = types.iter_mut().find(|id| **id == original) {
                *slot = clone;
            }
        }
        types.sort_by(|a, b| graph[*a].name.cmp(&graph[*b].name));
    }

    /// Create the unified aggregates and add them to `plan`
    ///
    /// The constants aggregate gathers the generated fields of every source plus a `Guid`
    /// constant for each demoted marker type not already present; the functions aggregate
    /// gathers the generated methods.
    pub fn build_aggregates(
        &self,
        graph: &mut TypeGraph,
        plan: &mut OutputPlan,
        guids: &BTreeMap<String, uguid::Guid>,
    ) {
        let Some(unified) = &self.unified else {
            return;
        };

        if let Some(name) = &unified.constants_file_name {
            let mut fields: Vec<Field> = plan
                .constant_sources
                .iter()
                .flat_map(|id| graph[*id].generated_fields().cloned().collect::<Vec<_>>())
                .collect();

            if let Some(guid_type) = graph.find_full_name(wellknown::GUID) {
                for (key, guid) in guids {
                    if fields.iter().any(|field| &field.name == key) {
                        continue;
                    }
                    let mut field = Field::new(None, key.clone(), guid_type);
                    field.attributes = FieldAttributes::PUBLIC | FieldAttributes::STATIC;
                    field.default_value = Some(guid.to_bytes().to_vec());
                    fields.push(field);
                }
            }

            let mut node = TypeNode::new(
                QualifiedName::new(unified.namespace.clone(), name.clone()),
                TypeKind::ApiHolder,
            );
            node.fields = fields;
            plan.types.push(graph.insert(node));
        }

        if let Some(name) = &unified.functions_file_name {
            let methods = plan
                .function_sources
                .iter()
                .flat_map(|id| graph[*id].generated_methods().cloned().collect::<Vec<_>>())
                .collect();

            let mut node = TypeNode::new(
                QualifiedName::new(unified.namespace.clone(), name.clone()),
                TypeKind::ApiHolder,
            );
            node.methods = methods;
            plan.types.push(graph.insert(node));
        }

        plan.types.sort_by(|a, b| graph[*a].name.cmp(&graph[*b].name));
        plan.types.dedup();
    }
}

/// Full dotted names the short names are cut from; inline arrays use their element
fn source_name(graph: &TypeGraph, id: TypeId) -> String {
    match graph[id].kind {
        TypeKind::InlineArray { element, .. } => graph[element].name.full_name(),
        _ => graph[id].name.full_name(),
    }
}

/// Unique names from the fewest trailing segments, `None` when all segments do not suffice
fn shortened_names(graph: &TypeGraph, group: &[TypeId], taken: &HashSet<String>) -> Option<Vec<String>> {
    let segments: Vec<Vec<String>> = group
        .iter()
        .map(|id| {
            source_name(graph, *id)
                .split('.')
                .map(str::to_string)
                .collect()
        })
        .collect();
    let depth = segments.iter().map(Vec::len).max().unwrap_or(0);

    for count in 1..=depth {
        let names: Vec<String> = segments
            .iter()
            .map(|parts| parts[parts.len().saturating_sub(count)..].concat())
            .collect();

        let unique: HashSet<String> = names.iter().map(|name| name.to_lowercase()).collect();
        if unique.len() == names.len() && unique.iter().all(|name| !taken.contains(name)) {
            return Some(names);
        }
    }

    None
}

fn clone_name(node: &TypeNode, short: &str) -> QualifiedName {
    match node.kind {
        TypeKind::InlineArray { size, .. } => QualifiedName::new(
            node.name.namespace(),
            format!("InlineArray{}_{}", short, size),
        ),
        _ => QualifiedName::new(node.name.namespace(), short),
    }
}
