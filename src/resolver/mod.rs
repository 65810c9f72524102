//! Transitive dependency closure.
//!
//! The [`DependencyResolver`] creates one node per visible `TypeDef` up front, then resolves
//! the selected roots: base type, nested types, methods with their parameter and return
//! types, implemented interfaces and fields. Every type reached that way is resolved in turn,
//! exactly once, and lands in the must-emit set. The root COM interface is turned into the
//! `is_iunknown_derived` flag of the interfaces deriving from it instead of an edge.
//!
//! # Example
//!
//! ```rust,no_run
//! use dotinterop::config::Architecture;
//! use dotinterop::metadata::catalog::MetadataCatalog;
//! use dotinterop::resolver::DependencyResolver;
//! use dotinterop::selection::{Pattern, SelectionEngine};
//! use std::path::Path;
//!
//! let catalog = MetadataCatalog::from_file(Path::new("Windows.Win32.winmd"))?;
//! let engine = SelectionEngine::new(vec![Pattern::parse("IShellItem")], vec![], Architecture::X64);
//! let selection = engine.select(&catalog);
//!
//! let resolution = DependencyResolver::resolve(&catalog, &selection, Architecture::X64)?;
//! for id in resolution.types() {
//!     println!("{}", resolution.graph[id].name);
//! }
//! # Ok::<(), dotinterop::Error>(())
//! ```

mod context;
mod signature;

pub use context::ResolutionContext;

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};

use crate::{
    config::Architecture,
    metadata::{
        catalog::{
            DefinitionKind, FieldAttributes, FieldDefinition, MetadataCatalog, MethodAttributes,
            MethodDefinition, TypeDefinition, TypeName,
        },
        tables::TableId,
        token::Token,
    },
    selection::Selection,
    typegraph::{
        wellknown, CallingConvention, Field, LayoutKind, Method, NativeArray, Parameter,
        QualifiedName, TypeGraph, TypeId, TypeKind, TypeNode,
    },
    Result,
};

/// The closed type graph and what must be emitted from it
#[derive(Debug)]
pub struct Resolution {
    /// Every node the resolver created
    pub graph: TypeGraph,
    /// Nodes that were resolved and are candidates for emission
    pub types_to_build: HashSet<TypeId>,
    /// GUIDs of demoted marker types, by simple name
    pub constants: BTreeMap<String, uguid::Guid>,
}

impl Resolution {
    /// The must-emit set sorted by namespace then name
    #[must_use]
    pub fn types(&self) -> Vec<TypeId> {
        let mut types: Vec<TypeId> = self.types_to_build.iter().copied().collect();
        types.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));
        types
    }

    /// True if `id` is in the must-emit set
    #[must_use]
    pub fn contains(&self, id: TypeId) -> bool {
        self.types_to_build.contains(&id)
    }
}

/// Resolves selected roots into a closed [`TypeGraph`]
pub struct DependencyResolver<'a> {
    catalog: &'a MetadataCatalog,
    graph: TypeGraph,
    context: ResolutionContext,
    by_token: HashMap<Token, TypeId>,
    types_to_build: HashSet<TypeId>,
    constants: BTreeMap<String, uguid::Guid>,
}

impl<'a> DependencyResolver<'a> {
    /// Create the nodes of every type of `catalog` visible on `architecture`
    #[must_use]
    pub fn new(catalog: &'a MetadataCatalog, architecture: Architecture) -> Self {
        let mut graph = TypeGraph::with_well_known();
        let mut by_token = HashMap::new();

        for def in catalog.types() {
            if !def.supports_architecture(architecture.flag()) {
                continue;
            }

            let kind = match catalog.kind(def) {
                DefinitionKind::Interface => TypeKind::Interface {
                    is_iunknown_derived: false,
                },
                DefinitionKind::Structure => TypeKind::Structure {
                    layout: if def.flags.is_explicit_layout()
                        || def.fields.iter().any(|field| field.offset.is_some())
                    {
                        LayoutKind::Explicit
                    } else {
                        LayoutKind::Sequential
                    },
                    packing_size: def
                        .layout
                        .map(|layout| layout.packing_size)
                        .filter(|size| *size > 0),
                    class_size: def
                        .layout
                        .map(|layout| layout.class_size)
                        .filter(|size| *size > 0),
                },
                DefinitionKind::Enum => TypeKind::Enum {
                    is_flags: false,
                    underlying: None,
                },
                DefinitionKind::Delegate => TypeKind::Delegate {
                    calling_convention: None,
                },
                DefinitionKind::Class => TypeKind::ApiHolder,
            };

            let mut node = TypeNode::new(QualifiedName::from(&def.name), kind);
            node.definition = Some(def.token);
            node.is_nested = def.is_nested();
            by_token.insert(def.token, graph.insert(node));
        }

        DependencyResolver {
            catalog,
            graph,
            context: ResolutionContext::new(),
            by_token,
            types_to_build: HashSet::new(),
            constants: BTreeMap::new(),
        }
    }

    /// Select, resolve and close over `selection` in one go
    ///
    /// # Errors
    /// Returns an error on signature forms native metadata never uses, on inconsistent
    /// method rows and on resolution stack violations.
    pub fn resolve(
        catalog: &'a MetadataCatalog,
        selection: &Selection,
        architecture: Architecture,
    ) -> Result<Resolution> {
        let mut resolver = DependencyResolver::new(catalog, architecture);
        resolver.resolve_selection(selection)?;
        Ok(resolver.finish())
    }

    /// The graph built so far
    #[must_use]
    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// The node created for a `TypeDef`
    #[must_use]
    pub fn node_of(&self, token: Token) -> Option<TypeId> {
        self.by_token.get(&token).copied()
    }

    /// Transfer member narrowing and exclusion onto the roots, then resolve them
    ///
    /// # Errors
    /// See [`DependencyResolver::resolve`]
    pub fn resolve_selection(&mut self, selection: &Selection) -> Result<()> {
        let mut roots = Vec::with_capacity(selection.roots.len());
        for token in &selection.roots {
            let Some(id) = self.node_of(*token) else {
                continue;
            };

            let node = &mut self.graph[id];
            if !selection.is_generated(*token) {
                node.is_generated = false;
            }
            if let Some(filter) = selection.filter(*token) {
                for member in &filter.included {
                    if member.is_table(TableId::MethodDef) {
                        node.included_methods.insert(*member);
                    } else {
                        node.included_fields.insert(*member);
                    }
                }
                for member in &filter.excluded {
                    if member.is_table(TableId::MethodDef) {
                        node.excluded_methods.insert(*member);
                    } else {
                        node.excluded_fields.insert(*member);
                    }
                }
            }
            roots.push(id);
        }

        for id in roots {
            self.add_dependencies(id)?;
        }
        Ok(())
    }

    /// Resolve the type behind `id` unless it is resolved already or not a `TypeDef`
    ///
    /// Pointers resolve their base.
    ///
    /// # Errors
    /// See [`DependencyResolver::resolve`]
    pub fn add_dependencies(&mut self, id: TypeId) -> Result<()> {
        let id = self.graph.strip_pointer(id);
        if self.types_to_build.contains(&id) {
            return Ok(());
        }

        let catalog = self.catalog;
        let Some(def) = self.graph[id].definition.and_then(|token| catalog.get(token)) else {
            return Ok(());
        };

        self.resolve_type(id, def)
    }

    /// Drop the root COM interface from the must-emit set and hand the graph over
    #[must_use]
    pub fn finish(mut self) -> Resolution {
        if let Some(iunknown) = self.graph.find_full_name(wellknown::IUNKNOWN) {
            self.types_to_build.remove(&iunknown);
        }

        // vtable and layout order must survive
        let ids: Vec<TypeId> = self.types_to_build.iter().copied().collect();
        for id in ids {
            let node = &mut self.graph[id];
            let keeps_field_order = node.is_structure()
                || node.is_enum()
                || matches!(node.kind, TypeKind::InlineArray { .. });
            if !node.is_interface() {
                node.methods.sort_by(|a, b| a.name.cmp(&b.name));
            }
            if !keeps_field_order {
                node.fields.sort_by(|a, b| a.name.cmp(&b.name));
            }

            let mut interfaces = std::mem::take(&mut node.interfaces);
            let mut nested_types = std::mem::take(&mut node.nested_types);
            interfaces.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));
            nested_types.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));
            let node = &mut self.graph[id];
            node.interfaces = interfaces;
            node.nested_types = nested_types;
        }

        info!(
            "Resolved {} types ({} nodes, {} GUID constants)",
            self.types_to_build.len(),
            self.graph.len(),
            self.constants.len()
        );

        Resolution {
            graph: self.graph,
            types_to_build: self.types_to_build,
            constants: self.constants,
        }
    }

    fn resolve_type(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        let catalog = self.catalog;
        let node = &mut self.graph[id];
        node.guid = def.attributes.guid();
        node.is_handle = node.is_structure()
            && catalog.is_handle(def)
            && node.name.full_name() != wellknown::LRESULT;
        node.is_nested = def.is_nested();
        debug!("Resolving {}", node.name);

        self.types_to_build.insert(id);
        self.context.push(id, &self.graph)?;
        let resolved = self.resolve_definition(id, def);
        let popped = self.context.pop(id, &self.graph);
        resolved.and(popped)
    }

    fn resolve_definition(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        if !def.extends.is_null() {
            let base = self.base_type(def.extends);
            self.graph[id].base = base;
        }

        let node = &mut self.graph[id];
        node.documentation = def.attributes.documentation();
        node.supported_os_platform = def.attributes.supported_os_platform();

        self.resolve_nested_types(id, def)?;
        self.resolve_methods(id, def)?;
        self.resolve_interfaces(id, def)?;
        if self.graph[id].is_enum() {
            self.resolve_enum_values(id, def)?;
        } else {
            self.resolve_fields(id, def)?;
        }

        let node = &mut self.graph[id];
        match &mut node.kind {
            TypeKind::Enum { is_flags, .. } => {
                *is_flags = def.attributes.has("FlagsAttribute");
            }
            TypeKind::Delegate { calling_convention } => {
                *calling_convention = def
                    .attributes
                    .unmanaged_function_pointer()
                    .and_then(CallingConvention::from_value);
            }
            _ => {}
        }

        if !node.is_interface()
            && node.methods.is_empty()
            && node.fields.is_empty()
            && node.nested_types.is_empty()
        {
            if let Some(guid) = node.guid {
                self.constants.insert(node.name.name().to_string(), guid);
            }
            node.is_generated = false;
        }

        Ok(())
    }

    fn base_type(&self, extends: Token) -> Option<TypeId> {
        if let Some(id) = self.by_token.get(&extends) {
            return Some(*id);
        }

        self.catalog
            .type_name(extends)
            .and_then(|name| self.graph.find(&QualifiedName::from(name)))
    }

    fn resolve_nested_types(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        for token in &def.nested {
            let Some(nested) = self.node_of(*token) else {
                continue;
            };

            let node = &mut self.graph[nested];
            node.is_nested = true;
            node.is_generated = false;

            self.add_dependencies(nested)?;
            self.graph[id].nested_types.push(nested);
        }
        Ok(())
    }

    fn resolve_methods(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        for method_def in &def.methods {
            let node = &self.graph[id];
            if node.has_member_filter() && !node.included_methods.contains(&method_def.token) {
                continue;
            }

            let method = self.resolve_method(method_def)?;
            self.graph[id].methods.push(method);
        }
        Ok(())
    }

    fn resolve_method(&mut self, def: &MethodDefinition) -> Result<Method> {
        let mut method = Method::new(Some(def.token), def.name.clone());
        method.attributes = def.flags;
        method.impl_attributes = def.impl_flags;
        method.is_ansi = def.attributes.has("AnsiAttribute");
        method.is_unicode = def.attributes.has("UnicodeAttribute");
        if def.flags.contains(MethodAttributes::PINVOKE_IMPL) {
            method.import = def.import.clone();
        }
        method.supported_os_platform = def.attributes.supported_os_platform();
        method.documentation = def.attributes.documentation();

        let return_type = self.parameter_type(&def.signature.return_type)?;
        method.return_type = Some(return_type);

        // sequence 0 rows describe the return value
        for param in def.params.iter().filter(|param| param.sequence != 0) {
            let mut parameter = Parameter::new(param.name.clone(), param.sequence, return_type);
            parameter.attributes = param.flags;
            parameter.is_com_out_ptr = param.attributes.has("ComOutPtrAttribute");
            parameter.is_const = param.attributes.has("ConstAttribute");
            parameter.native_array = param.attributes.native_array_info().map(|info| NativeArray {
                count_const: info.count_const,
                count_param_index: info.count_param_index,
                count_field_name: info.count_field_name,
                count_parameter: None,
            });
            parameter.bytes_param_index = param.attributes.bytes_param_index();
            method.parameters.push(parameter);
        }
        method.sort_and_link_parameters();

        if method.parameters.len() != def.signature.params.len() {
            return Err(malformed_error!(
                "Method '{}' has {} parameter rows for {} signature parameters",
                def.name,
                method.parameters.len(),
                def.signature.params.len()
            ));
        }

        for (parameter, signature) in method.parameters.iter_mut().zip(&def.signature.params) {
            parameter.type_id = self.parameter_type(signature)?;
        }

        self.add_dependencies(return_type)?;
        for parameter in &method.parameters {
            self.add_dependencies(parameter.type_id)?;
        }

        Ok(method)
    }

    fn resolve_interfaces(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        let catalog = self.catalog;
        let object = self.well_known(wellknown::OBJECT)?;

        for token in &def.interfaces {
            let name = catalog.type_name(*token).map(TypeName::full_name);
            if name.as_deref() == Some(wellknown::IUNKNOWN) {
                if let TypeKind::Interface {
                    is_iunknown_derived,
                } = &mut self.graph[id].kind
                {
                    *is_iunknown_derived = true;
                    continue;
                }
            }

            let interface = self.token_type(*token)?;
            if interface == object {
                continue;
            }

            self.add_dependencies(interface)?;
            let inherited = self.graph[interface].is_iunknown_derived();
            let node = &mut self.graph[id];
            if let TypeKind::Interface {
                is_iunknown_derived,
            } = &mut node.kind
            {
                *is_iunknown_derived |= inherited;
            }
            node.interfaces.push(interface);
        }
        Ok(())
    }

    fn resolve_fields(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        for field_def in &def.fields {
            let node = &self.graph[id];
            if node.has_member_filter() && !node.included_fields.contains(&field_def.token) {
                continue;
            }

            let field = self.resolve_field(field_def)?;
            let type_id = field.type_id;
            self.graph[id].fields.push(field);
            self.add_dependencies(type_id)?;
        }
        Ok(())
    }

    fn resolve_field(&mut self, def: &FieldDefinition) -> Result<Field> {
        let type_id = self.signature_type(&def.signature)?;

        let mut field = Field::new(Some(def.token), def.name.clone(), type_id);
        field.attributes = def.flags;
        field.default_value = def.constant.as_ref().map(|constant| constant.bytes.clone());
        field.is_flexible_array = def.attributes.has("FlexibleArrayAttribute");
        field.offset = def.offset;

        if field.default_value.is_none() {
            if self.graph[type_id].name.full_name() == wellknown::GUID {
                field.default_value = def
                    .attributes
                    .guid()
                    .map(|guid| guid.to_bytes().to_vec());
            }
            if field.default_value.is_none() {
                field.text_constant = def.attributes.constant();
            }
        }

        Ok(field)
    }

    fn resolve_enum_values(&mut self, id: TypeId, def: &'a TypeDefinition) -> Result<()> {
        for field_def in &def.fields {
            if field_def.flags.contains(FieldAttributes::RT_SPECIAL_NAME) {
                let underlying = self.signature_type(&field_def.signature)?;
                if let TypeKind::Enum {
                    underlying: slot, ..
                } = &mut self.graph[id].kind
                {
                    *slot = Some(underlying);
                }
                continue;
            }

            let mut field = Field::new(Some(field_def.token), field_def.name.clone(), id);
            field.attributes = field_def.flags;
            field.default_value = field_def
                .constant
                .as_ref()
                .map(|constant| constant.bytes.clone());
            self.graph[id].fields.push(field);
        }
        Ok(())
    }
}
