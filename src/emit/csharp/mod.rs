//! C# emission targeting source-generated interop.
//!
//! Every unit holds one top-level declaration in a file-scoped namespace:
//!
//! - functions and constants become a `static partial class` with `[LibraryImport]` methods,
//! - structures become `partial struct`s with their nested types inlined; handles also get
//!   equality members, a `Null` value and conversions to and from their value,
//! - IUnknown-derived interfaces become `[GeneratedComInterface]` interfaces, other
//!   interfaces become structs calling through their dispatch table,
//! - enums, delegates and inline arrays map to their C# counterpart.
//!
//! Parameter, field and return representations come from the
//! [`crate::marshal::SignatureSynthesizer`]; the emitter only spells them.

mod methods;
mod names;
mod values;

pub use names::{identifier, type_keyword, CSharpNamer};
pub use values::{is_constable, is_supported_constant, literal};

use std::fmt::Write as _;

use log::warn;

use crate::{
    com,
    emit::{CodeWriter, EmitContext, Emitter, Unit},
    marshal::{SignatureSynthesizer, SynthesisOptions, TypeNamer, RAW_HANDLE, VOID},
    metadata::catalog::{FieldAttributes, MethodAttributes},
    typegraph::{wellknown, CallingConvention, Field, LayoutKind, TypeGraph, TypeId, TypeKind, Value},
    Error, Result,
};

use methods::MethodOptions;

const VTABLE_POINTER: &str = "VTablePtr";
const INLINE_ARRAY_ELEMENT: &str = "Data";

/// The C# emitter
#[derive(Debug, Default, Clone, Copy)]
pub struct CSharpEmitter;

impl CSharpEmitter {
    /// A C# emitter
    #[must_use]
    pub fn new() -> Self {
        CSharpEmitter
    }
}

impl Emitter for CSharpEmitter {
    fn extension(&self) -> &'static str {
        "cs"
    }

    fn emit(&self, context: &EmitContext<'_>, id: TypeId) -> Result<Unit> {
        let graph = context.graph;
        let node = &graph[id];
        let namespace = context.arbiter.namespace(node).to_string();

        let namer = CSharpNamer::new(context.arbiter.unified().is_some()).in_namespace(&namespace);
        let scope = Scope {
            graph,
            namer: &namer,
            synthesizer: SignatureSynthesizer::new(graph, context.generation, &namer),
        };

        let mut w = CodeWriter::new();
        if context.generation.add_nullable_enable {
            w.writeln("#nullable enable");
        }
        writeln!(w, "namespace {};", identifier(&namespace))?;
        w.newline();
        if let Some(documentation) = &node.documentation {
            writeln!(w, "// {}", documentation)?;
        }
        scope.write_type(&mut w, id)?;

        Ok(Unit {
            path: context.arbiter.relative_path(node),
            text: w.into_text(),
        })
    }
}

/// Everything a single unit is written with
pub(crate) struct Scope<'a> {
    graph: &'a TypeGraph,
    namer: &'a CSharpNamer,
    synthesizer: SignatureSynthesizer<'a>,
}

impl Scope<'_> {
    /// The declared name of `id`
    fn declared_name(&self, id: TypeId) -> String {
        identifier(&self.namer.generated_name(&self.graph[id].name))
    }

    /// The reference name of `id` after mapping
    fn type_name(&self, id: TypeId) -> String {
        self.synthesizer.type_name(id)
    }

    fn write_type(&self, w: &mut CodeWriter, id: TypeId) -> Result<()> {
        match &self.graph[id].kind {
            TypeKind::Enum { .. } => self.write_enum(w, id),
            TypeKind::Interface { .. } => self.write_interface(w, id),
            TypeKind::Delegate { calling_convention } => {
                self.write_delegate(w, id, *calling_convention)
            }
            TypeKind::InlineArray { element, size } => {
                self.write_inline_array(w, id, *element, *size)
            }
            TypeKind::Structure {
                layout,
                packing_size,
                ..
            } => self.write_structure(w, id, *layout, *packing_size),
            TypeKind::ApiHolder | TypeKind::Builtin => self.write_api_holder(w, id),
            TypeKind::Pointer { .. } | TypeKind::Array { .. } => Err(Error::NotSupported(
                format!("{} is not emitted on its own", self.graph[id].name),
            )),
        }
    }

    fn write_platform(&self, w: &mut CodeWriter, platform: Option<&String>) -> Result<()> {
        if let Some(platform) = platform {
            writeln!(w, "[SupportedOSPlatform(\"{}\")]", platform)?;
        }
        Ok(())
    }

    fn write_api_holder(&self, w: &mut CodeWriter, id: TypeId) -> Result<()> {
        let node = &self.graph[id];
        writeln!(w, "public static partial class {}", self.declared_name(id))?;

        let fields: Vec<&Field> = node
            .generated_fields()
            .filter(|field| {
                field.type_name.is_some()
                    || is_supported_constant(self.graph, self.graph.map(field.type_id))
            })
            .collect();
        let methods: Vec<_> = node.generated_methods().collect();

        w.block(|w| {
            let mut first = true;
            for field in fields {
                let Some(value) = self.constant_value(field) else {
                    warn!("Constant {}.{} has no value", node.name, field.name);
                    continue;
                };
                if !first {
                    w.newline();
                }
                first = false;

                let mapped = self.graph.map(field.type_id);
                if let Some(unmanaged_type) = self.graph[mapped].unmanaged_type {
                    writeln!(w, "[MarshalAs(UnmanagedType.{})]", unmanaged_type)?;
                }
                let modifier = if field.attributes.contains(FieldAttributes::LITERAL)
                    && is_constable(self.graph, mapped)
                {
                    "const"
                } else {
                    "static readonly"
                };
                let type_name = field
                    .type_name
                    .clone()
                    .unwrap_or_else(|| self.type_name(field.type_id));
                let value = if self.graph[mapped].is_enum() && field.value.is_none() {
                    format!("({}){}", type_name, value)
                } else {
                    value
                };
                writeln!(
                    w,
                    "public {} {} {} = {};",
                    modifier,
                    type_name,
                    identifier(field.emitted_name()),
                    value
                )?;
            }

            for method in methods {
                if !first {
                    w.newline();
                }
                first = false;
                self.write_method(w, id, method, MethodOptions::empty())?;
            }
            Ok(())
        })
    }

    /// The literal of a constant field: patched text, then attribute text, then the
    /// decoded default value
    fn constant_value(&self, field: &Field) -> Option<String> {
        if let Some(value) = &field.value {
            return Some(value.clone());
        }
        if let Some(text) = &field.text_constant {
            return Some(text.clone());
        }

        let bytes = field.default_value.as_deref()?;
        let value = self.graph.decode_value(self.value_type(field.type_id), bytes)?;
        Some(literal(Some(&value)))
    }

    /// The type a value of `id` is decoded as
    fn value_type(&self, id: TypeId) -> TypeId {
        match self.graph[id].kind {
            TypeKind::Enum {
                underlying: Some(underlying),
                ..
            } => underlying,
            _ => id,
        }
    }

    fn write_structure(
        &self,
        w: &mut CodeWriter,
        id: TypeId,
        layout: LayoutKind,
        packing_size: Option<u16>,
    ) -> Result<()> {
        let node = &self.graph[id];
        if let Some(guid) = node.guid {
            writeln!(w, "[Guid(\"{}\")]", guid)?;
        }
        self.write_platform(w, node.supported_os_platform.as_ref())?;

        let pack = packing_size.filter(|pack| *pack > 0);
        if pack.is_some() || layout != LayoutKind::Sequential {
            let kind = match layout {
                LayoutKind::Sequential => "Sequential",
                LayoutKind::Explicit => "Explicit",
            };
            match pack {
                Some(pack) => writeln!(w, "[StructLayout(LayoutKind.{}, Pack = {})]", kind, pack)?,
                None => writeln!(w, "[StructLayout(LayoutKind.{})]", kind)?,
            }
        }

        let name = self.declared_name(id);
        let is_handle = node.is_handle && !node.fields.is_empty();
        if node.is_nested {
            writeln!(w, "public struct {}", name)?;
        } else if is_handle {
            writeln!(w, "public partial struct {} : IEquatable<{}>", name, name)?;
        } else {
            writeln!(w, "public partial struct {}", name)?;
        }

        w.block(|w| {
            if is_handle {
                writeln!(w, "public static readonly {} Null = new();", name)?;
                w.newline();
            }

            for &nested in &node.nested_types {
                self.write_type(w, nested)?;
                w.newline();
            }

            for (index, field) in node.fields.iter().enumerate() {
                let def = self.synthesizer.field(field);
                if (def.marshal_as.is_some() || field.offset.is_some()) && index > 0 {
                    w.newline();
                }
                if let Some(marshal_as) = &def.marshal_as {
                    writeln!(w, "[MarshalAs(UnmanagedType.{})]", marshal_as.unmanaged_type)?;
                }
                if let Some(offset) = field.offset {
                    writeln!(w, "[FieldOffset({})]", offset)?;
                }
                write!(w, "public {} {};", def.type_name(), identifier(field.emitted_name()))?;
                if field.is_flexible_array {
                    w.write(" // variable-length array placeholder");
                }
                w.newline();
            }

            if is_handle {
                self.write_handle_members(w, id, &name)?;
            }
            Ok(())
        })
    }

    fn write_handle_members(&self, w: &mut CodeWriter, id: TypeId, name: &str) -> Result<()> {
        let Some(field) = self.graph[id].fields.first() else {
            return Ok(());
        };
        let value = identifier(field.emitted_name());
        let mut value_type = self.synthesizer.field(field).type_name().to_string();
        if value_type == VOID {
            value_type = RAW_HANDLE.to_string();
        }

        w.newline();
        writeln!(w, "public {}({} value) => this.{} = value;", name, value_type, value)?;
        writeln!(w, "public override string ToString() => $\"0x{{{}:x}}\";", value)?;
        w.newline();
        writeln!(
            w,
            "public override readonly bool Equals(object? obj) => obj is {} value && Equals(value);",
            name
        )?;
        writeln!(
            w,
            "public readonly bool Equals({} other) => other.{} == {};",
            name, value, value
        )?;
        writeln!(w, "public override readonly int GetHashCode() => {}.GetHashCode();", value)?;
        writeln!(
            w,
            "public static bool operator ==({} left, {} right) => left.Equals(right);",
            name, name
        )?;
        writeln!(
            w,
            "public static bool operator !=({} left, {} right) => !left.Equals(right);",
            name, name
        )?;
        writeln!(
            w,
            "public static implicit operator {}({} value) => value.{};",
            value_type, name, value
        )?;
        writeln!(
            w,
            "public static implicit operator {}({} value) => new(value);",
            name, value_type
        )?;
        Ok(())
    }

    fn write_enum(&self, w: &mut CodeWriter, id: TypeId) -> Result<()> {
        let node = &self.graph[id];
        let TypeKind::Enum {
            is_flags,
            underlying,
        } = node.kind
        else {
            return Ok(());
        };

        self.write_platform(w, node.supported_os_platform.as_ref())?;
        if is_flags {
            w.writeln("[Flags]");
        }

        write!(w, "public enum {}", self.declared_name(id))?;
        if let Some(underlying) = underlying {
            let name = self.type_name(underlying);
            if name != "int" {
                write!(w, " : {}", name)?;
            }
        }
        w.newline();

        let value_type = match underlying {
            Some(underlying) => Some(underlying),
            None => self.graph.find_full_name(wellknown::INT32),
        };
        w.block(|w| {
            for field in &node.fields {
                w.write(&identifier(field.emitted_name()));
                let value: Option<Value> = match (value_type, field.default_value.as_deref()) {
                    (Some(value_type), Some(bytes)) => self.graph.decode_value(value_type, bytes),
                    _ => None,
                };
                if let Some(value) = value {
                    write!(w, " = {}", literal(Some(&value)))?;
                }
                w.writeln(",");
            }
            Ok(())
        })
    }

    fn write_delegate(
        &self,
        w: &mut CodeWriter,
        id: TypeId,
        calling_convention: Option<CallingConvention>,
    ) -> Result<()> {
        let node = &self.graph[id];
        let methods: Vec<_> = node
            .methods
            .iter()
            .filter(|method| !method.attributes.contains(MethodAttributes::SPECIAL_NAME))
            .collect();

        let name = self.declared_name(id);
        for (index, method) in methods.iter().enumerate() {
            if index > 0 {
                w.newline();
            }
            writeln!(
                w,
                "[UnmanagedFunctionPointer(CallingConvention.{})]",
                calling_convention.unwrap_or(CallingConvention::Winapi)
            )?;

            let returned = self.synthesizer.return_value(node, method);
            if let Some(marshal_as) = &returned.marshal_as {
                writeln!(w, "[return: MarshalAs(UnmanagedType.{})]", marshal_as.unmanaged_type)?;
            }

            let mut parameters = Vec::with_capacity(method.parameters.len());
            for parameter in &method.parameters {
                let def = self
                    .synthesizer
                    .parameter(node, method, parameter, SynthesisOptions::empty())?;
                parameters.push(methods::parameter_text(
                    &def,
                    def.direction,
                    &identifier(&parameter.name),
                ));
            }
            writeln!(
                w,
                "public delegate {} {}({});",
                returned.type_name(),
                name,
                parameters.join(", ")
            )?;
        }
        Ok(())
    }

    fn write_inline_array(
        &self,
        w: &mut CodeWriter,
        id: TypeId,
        element: TypeId,
        size: u32,
    ) -> Result<()> {
        let name = self.declared_name(id);
        let mapped = &self.graph[self.graph.map(element)];
        let element_type = if mapped.is_pointer() || mapped.is_interface() || mapped.is_delegate() {
            RAW_HANDLE.to_string()
        } else {
            self.type_name(element)
        };

        writeln!(w, "[InlineArray({}.Length)]", name)?;
        writeln!(w, "public partial struct {}", name)?;
        w.block(|w| {
            writeln!(w, "public const int Length = {};", size)?;
            w.newline();
            writeln!(w, "public {} {};", element_type, INLINE_ARRAY_ELEMENT)?;

            if element_type == "char" {
                w.newline();
                w.writeln("public override readonly string ToString() => ((ReadOnlySpan<char>)this).ToString().TrimEnd('\\0');");
                writeln!(
                    w,
                    "public void CopyFrom(string? str) => DirectNExtensions.CopyFrom<{}>(str, this, Length);",
                    name
                )?;
                writeln!(
                    w,
                    "public static implicit operator {}(string? str) {{ var n = new {}(); n.CopyFrom(str); return n; }}",
                    name, name
                )?;
            }
            Ok(())
        })
    }

    fn write_interface(&self, w: &mut CodeWriter, id: TypeId) -> Result<()> {
        let node = &self.graph[id];
        self.write_platform(w, node.supported_os_platform.as_ref())?;
        let name = self.declared_name(id);

        if !node.is_iunknown_derived() {
            return self.write_dispatch_struct(w, id, &name);
        }

        writeln!(
            w,
            "[GeneratedComInterface, Guid(\"{}\")]",
            node.guid.unwrap_or(uguid::Guid::ZERO)
        )?;
        write!(w, "public partial interface {}", name)?;
        if !node.interfaces.is_empty() {
            let bases: Vec<String> = node
                .interfaces
                .iter()
                .map(|base| identifier(&self.namer.reference_name(self.graph, self.graph.map(*base))))
                .collect();
            write!(w, " : {}", bases.join(", "))?;
        }
        w.newline();

        w.block(|w| {
            for (index, method) in node.methods.iter().enumerate() {
                if index > 0 {
                    w.newline();
                }
                self.write_method(w, id, method, MethodOptions::empty())?;
            }
            Ok(())
        })
    }

    fn write_dispatch_struct(&self, w: &mut CodeWriter, id: TypeId, name: &str) -> Result<()> {
        let slots = com::dispatch_slots(self.graph, id, 0)?;
        let inherits = slots.iter().any(|slot| slot.owner != id);
        let options = MethodOptions::FOR_IMPLEMENTATION
            | MethodOptions::PUBLIC
            | MethodOptions::OUT_AS_REF
            | MethodOptions::COM_OUT_PTR_AS_RAW_HANDLE
            | MethodOptions::UNSAFE;

        writeln!(w, "public partial struct {}", name)?;
        w.block(|w| {
            writeln!(w, "public static readonly {} Null = new();", name)?;
            w.newline();
            writeln!(w, "public nint {};", VTABLE_POINTER)?;
            w.newline();

            let mut current = None;
            for (index, slot) in slots.iter().enumerate() {
                if current != Some(slot.owner) {
                    if index > 0 {
                        w.newline();
                    }
                    if inherits {
                        writeln!(w, "// {} methods", self.graph[slot.owner].name.name())?;
                    }
                    current = Some(slot.owner);
                } else {
                    w.newline();
                }

                let method = &self.graph[slot.owner].methods[slot.method];
                let written = self.write_method(w, slot.owner, method, options)?;
                w.writeln(" =>");

                let argument_types: String = written
                    .parameters
                    .iter()
                    .map(|parameter| format!(",{}", parameter.argument_type()))
                    .collect();
                let arguments: String = written
                    .parameters
                    .iter()
                    .map(|parameter| format!(", {}", parameter.argument()))
                    .collect();

                w.indent();
                writeln!(
                    w,
                    "((delegate* unmanaged<{name}*{argument_types}, {ret}>)(((void**)*((void**){vtable}))[{slot}]))(({name}*){vtable}{arguments});",
                    name = name,
                    argument_types = argument_types,
                    ret = written.return_type,
                    vtable = VTABLE_POINTER,
                    slot = slot.slot,
                    arguments = arguments,
                )?;
                w.dedent();
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests;
