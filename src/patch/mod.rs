//! User overrides applied to resolved members.
//!
//! The [`PatchEngine`] walks the must-emit set after resolution and writes patch values into
//! the members they designate: emitted names, return type text, the last-error flag, field
//! types and values, and parameter descriptors. A parameter patch that forces optionality
//! sets the parameter's optional flag before any descriptor is synthesized, so the decision
//! order sees it like metadata; the rest of the descriptor is merged over the synthesized
//! one later. Patches that designate nothing are reported with a warning.

mod document;

pub use document::{FieldPatch, MethodPatch, ParameterPatch, PatchDocument, TypePatch};

use log::{debug, warn};

use crate::{
    metadata::catalog::ParamAttributes,
    typegraph::{Field, Method, TypeGraph, TypeId},
};

/// Outcome of [`PatchEngine::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// Members changed
    pub patched: usize,
    /// Patches that designated nothing, e.g. `method 'Apis::NoSuchFn'`
    pub missing: Vec<String>,
}

/// Hit counts of one method patch and of each of its parameter patches
#[derive(Clone)]
struct MethodHits {
    methods: usize,
    parameters: Vec<usize>,
}

impl MethodHits {
    fn new(patch: &MethodPatch) -> Self {
        MethodHits {
            methods: 0,
            parameters: vec![0; patch.parameters.len()],
        }
    }

    fn report(&self, patch: &MethodPatch, scope: &str, missing: &mut Vec<String>) {
        let name = patch.name.as_deref().unwrap_or_default();
        if self.methods == 0 {
            missing.push(format!("method '{}{}'", scope, name));
            return;
        }

        for (parameter, _) in patch
            .parameters
            .iter()
            .zip(&self.parameters)
            .filter(|(_, hits)| **hits == 0)
        {
            missing.push(format!(
                "parameter '{}' of method '{}{}'",
                parameter.name.as_deref().unwrap_or_default(),
                scope,
                name
            ));
        }
    }
}

/// Applies a [`PatchDocument`] to a type graph
pub struct PatchEngine<'a> {
    document: &'a PatchDocument,
}

impl<'a> PatchEngine<'a> {
    /// An engine applying `document`
    #[must_use]
    pub fn new(document: &'a PatchDocument) -> Self {
        PatchEngine { document }
    }

    /// Patch the members of every node in `types`
    ///
    /// Every type, method, field and parameter patch that matched nothing is logged with a
    /// warning and listed in [`PatchSummary::missing`].
    pub fn apply(&self, graph: &mut TypeGraph, types: &[TypeId]) -> PatchSummary {
        let document = self.document;
        let mut type_hits = vec![0usize; document.types.len()];
        let mut root_hits: Vec<MethodHits> = document.methods.iter().map(MethodHits::new).collect();
        let mut method_hits: Vec<Vec<MethodHits>> = document
            .types
            .iter()
            .map(|patch| patch.methods.iter().map(MethodHits::new).collect())
            .collect();
        let mut field_hits: Vec<Vec<usize>> = document
            .types
            .iter()
            .map(|patch| vec![0; patch.fields.len()])
            .collect();
        let mut summary = PatchSummary::default();

        for &id in types {
            let type_index = document
                .types
                .iter()
                .position(|patch| patch.matches(&graph[id].name));
            if let Some(index) = type_index {
                type_hits[index] += 1;
            }

            let node = &mut graph[id];
            for method in &mut node.methods {
                let root = document
                    .methods
                    .iter()
                    .position(|patch| patch.matches(&method.name));
                let (patch, hits) = match (root, type_index) {
                    (Some(index), _) => (&document.methods[index], &mut root_hits[index]),
                    (None, Some(type_index)) => {
                        let patches = &document.types[type_index].methods;
                        let Some(index) = patches.iter().position(|patch| patch.matches(&method.name))
                        else {
                            continue;
                        };
                        (&patches[index], &mut method_hits[type_index][index])
                    }
                    (None, None) => continue,
                };

                debug!("Patching method {}.{}", node.name, method.name);
                hits.methods += 1;
                apply_method(patch, method, &mut hits.parameters);
                summary.patched += 1;
            }

            if let Some(type_index) = type_index {
                let patches = &document.types[type_index].fields;
                for field in &mut node.fields {
                    if let Some(index) = patches.iter().position(|patch| patch.matches(&field.name)) {
                        debug!("Patching field {}.{}", node.name, field.name);
                        field_hits[type_index][index] += 1;
                        apply_field(&patches[index], field);
                        summary.patched += 1;
                    }
                }
            }
        }

        for (index, patch) in document.types.iter().enumerate() {
            let type_name = patch.type_name.as_deref().unwrap_or_default();
            if type_hits[index] == 0 {
                summary.missing.push(format!("type '{}'", type_name));
                continue;
            }

            let scope = format!("{}::", type_name);
            for (method, hits) in patch.methods.iter().zip(&method_hits[index]) {
                hits.report(method, &scope, &mut summary.missing);
            }
            for (field, _) in patch
                .fields
                .iter()
                .zip(&field_hits[index])
                .filter(|(_, hits)| **hits == 0)
            {
                summary.missing.push(format!(
                    "field '{}{}'",
                    scope,
                    field.name.as_deref().unwrap_or_default()
                ));
            }
        }
        for (patch, hits) in document.methods.iter().zip(&root_hits) {
            hits.report(patch, "", &mut summary.missing);
        }

        for target in &summary.missing {
            warn!("Patch target not found: {}", target);
        }
        summary
    }
}

fn apply_method(patch: &MethodPatch, method: &mut Method, parameter_hits: &mut [usize]) {
    if let Some(name) = patch.new_name.as_ref().filter(|name| !name.is_empty()) {
        method.new_name = Some(name.clone());
    }
    if let Some(type_name) = patch.type_name.as_ref().filter(|name| !name.is_empty()) {
        method.return_type_name = Some(type_name.clone());
    }
    if patch.set_last_error.is_some() {
        method.set_last_error = patch.set_last_error;
    }

    for (index, parameter) in method.parameters.iter_mut().enumerate() {
        let Some(position) = patch
            .parameters
            .iter()
            .position(|patch| patch.matches(parameter, index))
        else {
            continue;
        };
        parameter_hits[position] += 1;
        let Some(def) = patch.parameters[position].def.as_ref() else {
            continue;
        };

        match def.optional {
            Some(true) => parameter.attributes |= ParamAttributes::OPTIONAL,
            Some(false) => parameter.attributes.remove(ParamAttributes::OPTIONAL),
            None => {}
        }
        parameter.def = Some(def.clone());
    }
}

fn apply_field(patch: &FieldPatch, field: &mut Field) {
    if let Some(name) = patch.new_name.as_ref().filter(|name| !name.is_empty()) {
        field.new_name = Some(name.clone());
    }
    if let Some(type_name) = patch.type_name.as_ref().filter(|name| !name.is_empty()) {
        field.type_name = Some(type_name.clone());
    }
    if patch.value.is_some() {
        field.value.clone_from(&patch.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        marshal::Direction,
        typegraph::{wellknown, Parameter, QualifiedName, TypeKind, TypeNode},
    };

    fn graph() -> (TypeGraph, TypeId, TypeId) {
        let mut graph = TypeGraph::with_well_known();
        let int = graph.find_full_name(wellknown::INT32).unwrap();

        let mut apis = TypeNode::new(
            QualifiedName::new("Windows.Win32.System.Threading", "Apis"),
            TypeKind::ApiHolder,
        );
        let mut wait = Method::new(None, "WaitForSingleObject");
        wait.parameters = vec![
            Parameter::new("hHandle", 1, int),
            Parameter::new("dwMilliseconds", 2, int),
        ];
        apis.methods = vec![wait, Method::new(None, "GetLastError")];
        apis.fields = vec![Field::new(None, "INFINITE", int)];
        let apis = graph.insert(apis);

        let mut other = TypeNode::new(
            QualifiedName::new("Windows.Win32.System.Memory", "Apis"),
            TypeKind::ApiHolder,
        );
        other.methods = vec![Method::new(None, "GetLastError")];
        let other = graph.insert(other);

        (graph, apis, other)
    }

    #[test]
    fn members_are_patched() {
        let document = PatchDocument::from_json(
            r#"{
                "Types": [
                    {
                        "TypeName": "Windows.Win32.System.Threading.Apis",
                        "Methods": [
                            {
                                "Name": "WaitFor*",
                                "NewName": "Wait",
                                "TypeName": "uint",
                                "Parameters": [
                                    { "Name": "1", "Def": { "Direction": "Ref", "Optional": true } }
                                ]
                            }
                        ],
                        "Fields": [ { "Name": "INFINITE", "TypeName": "uint", "Value": "0xFFFFFFFF" } ]
                    }
                ],
                "Methods": [ { "Name": "GetLastError", "SetLastError": false } ]
            }"#,
        )
        .unwrap();

        let (mut graph, apis, other) = graph();
        let summary = PatchEngine::new(&document).apply(&mut graph, &[apis, other]);
        assert_eq!(summary.patched, 4);
        assert!(summary.missing.is_empty(), "{:?}", summary.missing);

        let wait = &graph[apis].methods[0];
        assert_eq!(wait.emitted_name(), "Wait");
        assert_eq!(wait.return_type_name.as_deref(), Some("uint"));
        let milliseconds = &wait.parameters[1];
        assert!(milliseconds.is_optional());
        assert_eq!(
            milliseconds.def.as_ref().and_then(|def| def.direction),
            Some(Direction::Ref)
        );
        assert!(wait.parameters[0].def.is_none());

        assert_eq!(graph[apis].methods[1].set_last_error, Some(false));
        assert_eq!(graph[other].methods[0].set_last_error, Some(false));

        let infinite = &graph[apis].fields[0];
        assert_eq!(infinite.type_name.as_deref(), Some("uint"));
        assert_eq!(infinite.value.as_deref(), Some("0xFFFFFFFF"));
    }

    #[test]
    fn reverse_and_missing_targets() {
        let document = PatchDocument::from_json(
            r#"{
                "Types": [
                    { "TypeName": "!Apis", "Methods": [ { "Name": "GetLastError", "NewName": "X" } ] },
                    { "TypeName": "Missing", "Methods": [ { "Name": "GetLastError", "NewName": "Y" } ] }
                ]
            }"#,
        )
        .unwrap();

        let (mut graph, apis, other) = graph();
        let summary = PatchEngine::new(&document).apply(&mut graph, &[apis, other]);
        assert_eq!(summary.patched, 0);
        assert_eq!(summary.missing, ["type '!Apis'", "type 'Missing'"]);
        assert_eq!(graph[apis].methods[1].emitted_name(), "GetLastError");
    }

    #[test]
    fn missing_members_and_parameters() {
        let document = PatchDocument::from_json(
            r#"{
                "Types": [
                    {
                        "TypeName": "Windows.Win32.System.Threading.Apis",
                        "Methods": [
                            { "Name": "NoSuchFn", "NewName": "X" },
                            {
                                "Name": "WaitForSingleObject",
                                "Parameters": [
                                    { "Name": "hHandle", "Def": { "Optional": true } },
                                    { "Name": "lpNothing", "Def": { "Optional": true } },
                                    { "Name": "7", "Def": { "Optional": true } }
                                ]
                            }
                        ],
                        "Fields": [ { "Name": "NO_SUCH_FIELD", "Value": "0" } ]
                    }
                ],
                "Methods": [
                    { "Name": "GetLastError", "Parameters": [ { "Name": "0" } ] },
                    { "Name": "Nowhere" }
                ]
            }"#,
        )
        .unwrap();

        let (mut graph, apis, other) = graph();
        let summary = PatchEngine::new(&document).apply(&mut graph, &[apis, other]);
        assert_eq!(summary.patched, 3);
        assert_eq!(
            summary.missing,
            [
                "method 'Windows.Win32.System.Threading.Apis::NoSuchFn'",
                "parameter 'lpNothing' of method 'Windows.Win32.System.Threading.Apis::WaitForSingleObject'",
                "parameter '7' of method 'Windows.Win32.System.Threading.Apis::WaitForSingleObject'",
                "field 'Windows.Win32.System.Threading.Apis::NO_SUCH_FIELD'",
                "parameter '0' of method 'GetLastError'",
                "method 'Nowhere'",
            ]
        );
        assert!(graph[apis].methods[0].parameters[0].is_optional());
        assert!(!graph[apis].methods[0].parameters[1].is_optional());
    }
}
