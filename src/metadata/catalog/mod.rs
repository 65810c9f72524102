//! The decoded metadata universe.
//!
//! [`MetadataCatalog`] reads the streams of a WinMD image once and copies everything the
//! binding pipeline needs into owned [`TypeDefinition`]s: names with nesting resolved, member
//! ranges split per type, signatures and custom attributes decoded, P/Invoke imports, layouts
//! and constants attached. Nothing borrows the input after loading, so later stages can keep
//! the catalog around without the file.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotinterop::metadata::catalog::MetadataCatalog;
//! use std::path::Path;
//!
//! let catalog = MetadataCatalog::from_file(Path::new("Windows.Win32.winmd"))?;
//! for def in catalog.types().iter().filter(|def| def.is_interface()) {
//!     println!("{} {:?}", def.full_name(), def.attributes.guid());
//! }
//! # Ok::<(), dotinterop::Error>(())
//! ```

mod attributes;
mod definitions;

pub use attributes::{Attributes, CustomAttribute, NativeArrayInfo};
pub use definitions::*;

use std::{collections::HashMap, path::Path};

use log::{debug, warn};

use crate::{
    file::File,
    metadata::{
        cor20header::Cor20Header,
        customattributes::{parse_custom_attribute, AttributeTypeResolver},
        root::Root,
        signatures::{
            parse_field_signature, parse_method_signature, SignatureMethod, TypeSignature,
        },
        streams::{Blob, Strings, TablesHeader},
        tables::{
            ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldLayoutRaw, FieldRaw,
            ImplMapRaw, InterfaceImplRaw, MemberRefRaw, MetadataTable, MethodDefRaw, ModuleRaw,
            ModuleRefRaw, NestedClassRaw, ParamRaw, RowReadable, TableId, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Deepest chain of nested types or nested type references that is followed
pub const MAX_NESTING_DEPTH: usize = 32;

/// Read-only view of every type, member and attribute in a metadata image.
pub struct MetadataCatalog {
    module: String,
    types: Vec<TypeDefinition>,
    type_refs: Vec<TypeName>,
    by_name: HashMap<String, usize>,
}

impl MetadataCatalog {
    /// Memory-map and decode the WinMD file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not a PE image with a CLR header, or
    /// its metadata is malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_pe(&File::from_file(path)?)
    }

    /// Decode a WinMD image that is already in memory.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a PE image with a CLR header, or its metadata
    /// is malformed.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        Self::from_pe(&File::from_mem(data)?)
    }

    fn from_pe(file: &File) -> Result<Self> {
        let (clr_rva, clr_size) = file.clr()?;
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let cor20 = Cor20Header::read(file.data_slice(clr_offset, clr_size)?)?;

        let metadata_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, cor20.meta_data_size as usize)?;
        Self::from_metadata(metadata)
    }

    /// Decode a bare metadata root (the bytes starting with `BSJB`).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a required stream is missing or a row,
    /// signature or name is invalid, [`crate::Error::OutOfBounds`] for truncated data.
    pub fn from_metadata(data: &[u8]) -> Result<Self> {
        let root = Root::read(data)?;

        let mut tables = None;
        let mut strings = None;
        let mut blobs = None;
        for stream in &root.stream_headers {
            let start = stream.offset as usize;
            let Some(stream_data) = start
                .checked_add(stream.size as usize)
                .and_then(|end| data.get(start..end))
            else {
                return Err(out_of_bounds_error!());
            };

            match stream.name.as_str() {
                "#~" | "#-" => tables = Some(TablesHeader::from(stream_data)?),
                "#Strings" => strings = Some(Strings::from(stream_data)?),
                "#Blob" => blobs = Some(Blob::from(stream_data)?),
                _ => {}
            }
        }

        let Some(tables) = tables else {
            return Err(malformed_error!("Metadata has no #~ stream"));
        };
        let Some(strings) = strings else {
            return Err(malformed_error!("Metadata has no #Strings stream"));
        };
        let empty_blob = [0_u8];
        let blobs = match blobs {
            Some(blobs) => blobs,
            None => Blob::from(&empty_blob)?,
        };

        Loader::new(&tables, strings, blobs)?.load()
    }

    /// Name of the module, e.g. `Windows.Win32.winmd`
    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module
    }

    /// All types in `TypeDef` order; index `n` holds row `n + 1`
    #[must_use]
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /// The type behind a `TypeDef` token
    #[must_use]
    pub fn get(&self, token: Token) -> Option<&TypeDefinition> {
        if !token.is_table(TableId::TypeDef) || token.row() == 0 {
            return None;
        }
        self.types.get(token.row() as usize - 1)
    }

    /// The type named `full_name` (`Namespace.Name`, nested names joined with `+`)
    #[must_use]
    pub fn find(&self, full_name: &str) -> Option<&TypeDefinition> {
        self.by_name.get(full_name).map(|index| &self.types[*index])
    }

    /// Name of a `TypeDef` or `TypeRef`
    #[must_use]
    pub fn type_name(&self, token: Token) -> Option<&TypeName> {
        if token.row() == 0 {
            return None;
        }
        let index = token.row() as usize - 1;

        if token.is_table(TableId::TypeDef) {
            self.types.get(index).map(|def| &def.name)
        } else if token.is_table(TableId::TypeRef) {
            self.type_refs.get(index)
        } else {
            None
        }
    }

    /// The definition a `TypeDef` or `TypeRef` token denotes inside this image
    #[must_use]
    pub fn resolve(&self, token: Token) -> Option<&TypeDefinition> {
        if token.is_table(TableId::TypeDef) {
            return self.get(token);
        }
        self.type_name(token)
            .and_then(|name| self.find(&name.full_name()))
    }

    /// Full name of the base type, `None` for types without one
    #[must_use]
    pub fn base_type_name(&self, def: &TypeDefinition) -> Option<String> {
        self.type_name(def.extends).map(TypeName::full_name)
    }

    /// Classify `def` the way the generator treats it
    #[must_use]
    pub fn kind(&self, def: &TypeDefinition) -> DefinitionKind {
        if def.is_interface() {
            return DefinitionKind::Interface;
        }

        let base = self.base_type_name(def);
        match base.as_deref() {
            Some("System.ValueType") if def.flags.is_public() || def.flags.is_nested_public() => {
                DefinitionKind::Structure
            }
            Some("System.Enum") => DefinitionKind::Enum,
            Some("System.MulticastDelegate") => DefinitionKind::Delegate,
            _ => DefinitionKind::Class,
        }
    }

    /// True for a `NativeTypedef` structure wrapping a single public instance `IntPtr`
    #[must_use]
    pub fn is_handle(&self, def: &TypeDefinition) -> bool {
        if !def.attributes.has("NativeTypedefAttribute") || def.fields.len() != 1 {
            return false;
        }

        let field = &def.fields[0];
        field.flags.is_public()
            && !field.flags.contains(FieldAttributes::STATIC)
            && match &field.signature {
                TypeSignature::I => true,
                TypeSignature::ValueType(token) => self
                    .type_name(*token)
                    .is_some_and(|name| name.full_name() == "System.IntPtr"),
                _ => false,
            }
    }

    /// Underlying integer type of an enum, taken from its runtime special field
    #[must_use]
    pub fn enum_underlying_type<'a>(&self, def: &'a TypeDefinition) -> Option<&'a TypeSignature> {
        def.fields
            .iter()
            .find(|field| field.flags.contains(FieldAttributes::RT_SPECIAL_NAME))
            .map(|field| &field.signature)
    }
}

/// Byte size of an enum's underlying integer type
fn enum_storage_size(signature: &TypeSignature) -> Option<usize> {
    match signature {
        TypeSignature::Boolean | TypeSignature::I1 | TypeSignature::U1 => Some(1),
        TypeSignature::Char | TypeSignature::I2 | TypeSignature::U2 => Some(2),
        TypeSignature::I4 | TypeSignature::U4 => Some(4),
        TypeSignature::I8 | TypeSignature::U8 => Some(8),
        _ => None,
    }
}

fn read_rows<T: RowReadable>(tables: &TablesHeader) -> Result<Vec<T>> {
    let table: Option<MetadataTable<'_, T>> = tables.table()?;
    match table {
        Some(table) => table.iter().collect(),
        None => Ok(Vec::new()),
    }
}

/// Contiguous 1-based row range `[start, next_start)` owned by entry `index` of a list
fn owned_range(starts: &[u32], index: usize, total: usize) -> std::ops::Range<usize> {
    let start = (starts[index] as usize).max(1) - 1;
    let end = starts
        .get(index + 1)
        .map_or(total, |next| (*next as usize).max(1) - 1);
    start.min(total)..end.clamp(start.min(total), total)
}

/// Names and enum sizes used while decoding attribute blobs
struct AttributeNames<'a> {
    type_defs: &'a [TypeName],
    type_refs: &'a [TypeName],
    enum_sizes: &'a HashMap<String, usize>,
}

impl AttributeTypeResolver for AttributeNames<'_> {
    fn type_name(&self, token: Token) -> Option<String> {
        let index = (token.row() as usize).checked_sub(1)?;
        if token.is_table(TableId::TypeDef) {
            self.type_defs.get(index).map(TypeName::full_name)
        } else if token.is_table(TableId::TypeRef) {
            self.type_refs.get(index).map(TypeName::full_name)
        } else {
            None
        }
    }

    fn enum_size(&self, type_name: &str) -> Option<usize> {
        self.enum_sizes.get(type_name).copied()
    }
}

struct Loader<'a> {
    strings: Strings<'a>,
    blobs: Blob<'a>,
    module: Vec<ModuleRaw>,
    type_refs: Vec<TypeRefRaw>,
    type_defs: Vec<TypeDefRaw>,
    fields: Vec<FieldRaw>,
    methods: Vec<MethodDefRaw>,
    params: Vec<ParamRaw>,
    interface_impls: Vec<InterfaceImplRaw>,
    member_refs: Vec<MemberRefRaw>,
    constants: Vec<ConstantRaw>,
    custom_attributes: Vec<CustomAttributeRaw>,
    class_layouts: Vec<ClassLayoutRaw>,
    field_layouts: Vec<FieldLayoutRaw>,
    module_refs: Vec<ModuleRefRaw>,
    impl_maps: Vec<ImplMapRaw>,
    nested_classes: Vec<NestedClassRaw>,
}

impl<'a> Loader<'a> {
    fn new(tables: &TablesHeader<'a>, strings: Strings<'a>, blobs: Blob<'a>) -> Result<Self> {
        if tables.rows(TableId::FieldPtr) != 0
            || tables.rows(TableId::MethodPtr) != 0
            || tables.rows(TableId::ParamPtr) != 0
        {
            return Err(malformed_error!(
                "Uncompressed metadata with pointer tables is not supported"
            ));
        }

        Ok(Loader {
            strings,
            blobs,
            module: read_rows(tables)?,
            type_refs: read_rows(tables)?,
            type_defs: read_rows(tables)?,
            fields: read_rows(tables)?,
            methods: read_rows(tables)?,
            params: read_rows(tables)?,
            interface_impls: read_rows(tables)?,
            member_refs: read_rows(tables)?,
            constants: read_rows(tables)?,
            custom_attributes: read_rows(tables)?,
            class_layouts: read_rows(tables)?,
            field_layouts: read_rows(tables)?,
            module_refs: read_rows(tables)?,
            impl_maps: read_rows(tables)?,
            nested_classes: read_rows(tables)?,
        })
    }

    fn string(&self, index: u32) -> Result<String> {
        Ok(self.strings.get(index as usize)?.to_string())
    }

    fn type_ref_names(&self) -> Result<Vec<TypeName>> {
        (0..self.type_refs.len())
            .map(|index| self.type_ref_name(index, 0))
            .collect()
    }

    fn type_ref_name(&self, index: usize, depth: usize) -> Result<TypeName> {
        if depth > MAX_NESTING_DEPTH {
            return Err(RecursionLimit(MAX_NESTING_DEPTH));
        }

        let Some(row) = self.type_refs.get(index) else {
            return Err(out_of_bounds_error!());
        };
        let name = self.string(row.type_name)?;
        let scope = row.resolution_scope;

        if scope.tag == TableId::TypeRef && !scope.is_null() {
            let outer = self.type_ref_name(scope.row as usize - 1, depth + 1)?;
            return Ok(TypeName::new(outer.namespace, format!("{}+{}", outer.name, name)));
        }

        Ok(TypeName::new(self.string(row.type_namespace)?, name))
    }

    fn type_def_names(&self, enclosing: &HashMap<u32, u32>) -> Result<Vec<TypeName>> {
        (0..self.type_defs.len())
            .map(|index| self.type_def_name(index, enclosing, 0))
            .collect()
    }

    fn type_def_name(
        &self,
        index: usize,
        enclosing: &HashMap<u32, u32>,
        depth: usize,
    ) -> Result<TypeName> {
        if depth > MAX_NESTING_DEPTH {
            return Err(RecursionLimit(MAX_NESTING_DEPTH));
        }

        let Some(row) = self.type_defs.get(index) else {
            return Err(out_of_bounds_error!());
        };
        let name = self.string(row.type_name)?;

        match enclosing.get(&row.rid) {
            Some(outer) if *outer != 0 && *outer as usize <= self.type_defs.len() => {
                let outer = self.type_def_name(*outer as usize - 1, enclosing, depth + 1)?;
                Ok(TypeName::new(outer.namespace, format!("{}+{}", outer.name, name)))
            }
            _ => Ok(TypeName::new(self.string(row.type_namespace)?, name)),
        }
    }

    fn method_signature(&self, blob: u32) -> Result<SignatureMethod> {
        parse_method_signature(self.blobs.get(blob as usize)?)
    }

    /// Attribute type and constructor signature behind a `CustomAttributeType` index
    fn attribute_constructor(
        &self,
        constructor: Token,
        method_owner: &[usize],
        type_defs: &[TypeName],
        type_refs: &[TypeName],
    ) -> Result<Option<(TypeName, SignatureMethod)>> {
        let Some(index) = (constructor.row() as usize).checked_sub(1) else {
            return Ok(None);
        };

        if constructor.is_table(TableId::MethodDef) {
            let (Some(method), Some(owner)) = (self.methods.get(index), method_owner.get(index))
            else {
                return Ok(None);
            };
            return Ok(Some((
                type_defs[*owner].clone(),
                self.method_signature(method.signature)?,
            )));
        }

        let Some(member) = self.member_refs.get(index) else {
            return Ok(None);
        };
        let parent = member.class;
        let Some(parent_index) = (parent.row as usize).checked_sub(1) else {
            return Ok(None);
        };
        let name = match parent.tag {
            TableId::TypeRef => type_refs.get(parent_index),
            TableId::TypeDef => type_defs.get(parent_index),
            _ => None,
        };

        match name {
            Some(name) => Ok(Some((name.clone(), self.method_signature(member.signature)?))),
            None => Ok(None),
        }
    }

    fn load(self) -> Result<MetadataCatalog> {
        let module = match self.module.first() {
            Some(row) => self.string(row.name)?,
            None => String::new(),
        };

        let enclosing: HashMap<u32, u32> = self
            .nested_classes
            .iter()
            .map(|row| (row.nested_class, row.enclosing_class))
            .collect();

        let type_ref_names = self.type_ref_names()?;
        let type_def_names = self.type_def_names(&enclosing)?;

        let field_starts: Vec<u32> = self.type_defs.iter().map(|row| row.field_list).collect();
        let method_starts: Vec<u32> = self.type_defs.iter().map(|row| row.method_list).collect();
        let param_starts: Vec<u32> = self.methods.iter().map(|row| row.param_list).collect();

        let mut method_owner = vec![0_usize; self.methods.len()];
        for index in 0..self.type_defs.len() {
            for method in owned_range(&method_starts, index, self.methods.len()) {
                method_owner[method] = index;
            }
        }

        // Field signatures first: enum sizes are needed to decode attribute blobs
        let mut field_signatures = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let blob = self.blobs.get(field.signature as usize)?;
            field_signatures.push(parse_field_signature(blob)?.base);
        }

        let mut enum_sizes = HashMap::new();
        for (index, row) in self.type_defs.iter().enumerate() {
            let base = match row.extends.tag {
                TableId::TypeRef => row
                    .extends
                    .row
                    .checked_sub(1)
                    .and_then(|base| type_ref_names.get(base as usize)),
                _ => None,
            };
            if !base.is_some_and(|base| base.full_name() == "System.Enum") {
                continue;
            }

            for field in owned_range(&field_starts, index, self.fields.len()) {
                let flags = FieldAttributes::from_bits_retain(self.fields[field].flags);
                if flags.contains(FieldAttributes::RT_SPECIAL_NAME) {
                    if let Some(size) = enum_storage_size(&field_signatures[field]) {
                        enum_sizes.insert(type_def_names[index].full_name(), size);
                    }
                }
            }
        }

        let mut attributes: HashMap<Token, Attributes> = HashMap::new();
        {
            let resolver = AttributeNames {
                type_defs: &type_def_names,
                type_refs: &type_ref_names,
                enum_sizes: &enum_sizes,
            };

            for row in &self.custom_attributes {
                let Some((name, constructor)) = self.attribute_constructor(
                    row.constructor.token,
                    &method_owner,
                    &type_def_names,
                    &type_ref_names,
                )?
                else {
                    debug!("Skipping custom attribute {} with unknown constructor", row.token);
                    continue;
                };

                let blob = self.blobs.get(row.value as usize)?;
                match parse_custom_attribute(blob, &constructor, &resolver) {
                    Ok(value) => attributes
                        .entry(row.parent.token)
                        .or_default()
                        .push(CustomAttribute { name, value }),
                    Err(error) => warn!(
                        "Skipping custom attribute {} on {}: {}",
                        name.full_name(),
                        row.parent.token,
                        error
                    ),
                }
            }
        }

        let mut constants: HashMap<Token, ConstantValue> = HashMap::new();
        for row in &self.constants {
            constants.insert(
                row.parent.token,
                ConstantValue {
                    element_type: row.base,
                    bytes: self.blobs.get(row.value as usize)?.to_vec(),
                },
            );
        }

        let field_offsets: HashMap<u32, u32> = self
            .field_layouts
            .iter()
            .map(|row| (row.field, row.field_offset))
            .collect();

        let mut imports: HashMap<u32, ImportInfo> = HashMap::new();
        for row in &self.impl_maps {
            if row.member_forwarded.tag != TableId::MethodDef {
                continue;
            }
            let module = match row.import_scope.checked_sub(1) {
                Some(index) => match self.module_refs.get(index as usize) {
                    Some(module_ref) => self.string(module_ref.name)?,
                    None => String::new(),
                },
                None => String::new(),
            };
            imports.insert(
                row.member_forwarded.row,
                ImportInfo {
                    flags: ImportFlags::from_bits_retain(row.mapping_flags),
                    entry_point: self.string(row.import_name)?,
                    module,
                },
            );
        }

        let mut nested: HashMap<u32, Vec<Token>> = HashMap::new();
        for row in &self.nested_classes {
            nested
                .entry(row.enclosing_class)
                .or_default()
                .push(Token::from_parts(TableId::TypeDef, row.nested_class));
        }

        let mut interfaces: HashMap<u32, Vec<Token>> = HashMap::new();
        for row in &self.interface_impls {
            interfaces
                .entry(row.class)
                .or_default()
                .push(row.interface.token);
        }

        let layouts: HashMap<u32, ClassLayout> = self
            .class_layouts
            .iter()
            .map(|row| {
                (
                    row.parent,
                    ClassLayout {
                        packing_size: row.packing_size,
                        class_size: row.class_size,
                    },
                )
            })
            .collect();

        let mut field_signatures: Vec<Option<TypeSignature>> =
            field_signatures.into_iter().map(Some).collect();

        let mut types = Vec::with_capacity(self.type_defs.len());
        for (index, row) in self.type_defs.iter().enumerate() {
            let mut fields = Vec::new();
            for field_index in owned_range(&field_starts, index, self.fields.len()) {
                let field = &self.fields[field_index];
                fields.push(FieldDefinition {
                    token: field.token,
                    name: self.string(field.name)?,
                    flags: FieldAttributes::from_bits_retain(field.flags),
                    signature: field_signatures[field_index].take().unwrap_or_default(),
                    constant: constants.remove(&field.token),
                    offset: field_offsets.get(&field.rid).copied(),
                    attributes: attributes.remove(&field.token).unwrap_or_default(),
                });
            }

            let mut methods = Vec::new();
            for method_index in owned_range(&method_starts, index, self.methods.len()) {
                let method = &self.methods[method_index];

                let mut params = Vec::new();
                for param_index in owned_range(&param_starts, method_index, self.params.len()) {
                    let param = &self.params[param_index];
                    params.push(ParameterDefinition {
                        token: param.token,
                        sequence: u16::try_from(param.sequence).unwrap_or(u16::MAX),
                        name: self.string(param.name)?,
                        flags: ParamAttributes::from_bits_retain(param.flags),
                        attributes: attributes.remove(&param.token).unwrap_or_default(),
                    });
                }

                methods.push(MethodDefinition {
                    token: method.token,
                    name: self.string(method.name)?,
                    flags: MethodAttributes::from_bits_retain(method.flags),
                    impl_flags: MethodImplAttributes::from_bits_retain(method.impl_flags),
                    signature: self.method_signature(method.signature)?,
                    params,
                    import: imports.remove(&method.rid),
                    attributes: attributes.remove(&method.token).unwrap_or_default(),
                });
            }

            types.push(TypeDefinition {
                token: row.token,
                name: type_def_names[index].clone(),
                flags: TypeAttributes::from_bits_retain(row.flags),
                extends: row.extends.token,
                enclosing: enclosing
                    .get(&row.rid)
                    .map(|outer| Token::from_parts(TableId::TypeDef, *outer)),
                nested: nested.remove(&row.rid).unwrap_or_default(),
                interfaces: interfaces.remove(&row.rid).unwrap_or_default(),
                methods,
                fields,
                layout: layouts.get(&row.rid).copied(),
                attributes: attributes.remove(&row.token).unwrap_or_default(),
            });
        }

        let by_name = types
            .iter()
            .enumerate()
            .map(|(index, def)| (def.full_name(), index))
            .collect();

        debug!(
            "Loaded {} types and {} type references from '{}'",
            types.len(),
            type_ref_names.len(),
            module
        );

        Ok(MetadataCatalog {
            module,
            types,
            type_refs: type_ref_names,
            by_name,
        })
    }
}
