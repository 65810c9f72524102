//! Method and parameter declarations.

use std::fmt::Write as _;

use bitflags::bitflags;

use crate::{
    com,
    emit::{
        csharp::{names::identifier, Scope},
        CodeWriter,
    },
    marshal::{Direction, MarshalUsing, ParameterDef, SynthesisOptions, RAW_HANDLE},
    metadata::catalog::{ImportCallConv, MethodAttributes},
    typegraph::{Method, Parameter, TypeId},
    Result,
};

/// Member names inherited from `object` that a struct method hides
const OBJECT_MEMBERS: &[&str] = &["GetType", "ToString", "Equals", "GetHashCode"];

bitflags! {
    /// How a method declaration is written
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(super) struct MethodOptions: u8 {
        /// A body follows instead of `;`
        const FOR_IMPLEMENTATION = 0x01;
        /// `public` even inside an interface
        const PUBLIC = 0x02;
        /// `out` parameters are written `ref`
        const OUT_AS_REF = 0x04;
        /// COM output pointers are raw handles
        const COM_OUT_PTR_AS_RAW_HANDLE = 0x08;
        /// `unsafe` modifier
        const UNSAFE = 0x10;
    }
}

/// A parameter as written, for building the dispatch call
pub(super) struct WrittenParameter {
    pub name: String,
    pub type_name: String,
    pub direction: Option<Direction>,
}

impl WrittenParameter {
    fn by_pointer(&self) -> bool {
        matches!(self.direction, Some(Direction::Out | Direction::Ref))
    }

    /// The type in a function pointer signature
    pub fn argument_type(&self) -> String {
        if self.by_pointer() {
            format!("{}*", self.type_name)
        } else {
            self.type_name.clone()
        }
    }

    /// The expression passed through a function pointer
    pub fn argument(&self) -> String {
        if self.by_pointer() {
            format!("({}*)Unsafe.AsPointer(ref {})", self.type_name, self.name)
        } else {
            self.name.clone()
        }
    }
}

/// A method declaration as written
pub(super) struct WrittenMethod {
    pub return_type: String,
    pub parameters: Vec<WrittenParameter>,
}

fn calling_convention_type(method: &Method) -> Option<&'static str> {
    match method.import.as_ref()?.flags.call_conv() {
        ImportCallConv::Cdecl => Some("CallConvCdecl"),
        ImportCallConv::Stdcall => Some("CallConvStdcall"),
        ImportCallConv::Thiscall => Some("CallConvThiscall"),
        ImportCallConv::Fastcall => Some("CallConvFastcall"),
        ImportCallConv::Winapi | ImportCallConv::Unspecified => None,
    }
}

fn module_name(module: &str) -> &str {
    const DLL: &str = ".dll";
    match module.len().checked_sub(DLL.len()) {
        Some(split)
            if module.is_char_boundary(split) && module[split..].eq_ignore_ascii_case(DLL) =>
        {
            &module[..split]
        }
        _ => module,
    }
}

impl Scope<'_> {
    /// Write the declaration of `method` of `owner`, without a trailing line break when a
    /// body follows
    pub(super) fn write_method(
        &self,
        w: &mut CodeWriter,
        owner: TypeId,
        method: &Method,
        options: MethodOptions,
    ) -> Result<WrittenMethod> {
        let node = &self.graph[owner];
        let synthesizer = &self.synthesizer;

        if let Some(documentation) = &method.documentation {
            writeln!(w, "// {}", documentation)?;
        }

        if let Some(import) = &method.import {
            write!(w, "[LibraryImport(\"{}\"", module_name(&import.module))?;
            if method.is_unicode {
                w.write(", StringMarshalling = StringMarshalling.Utf16");
            }
            if synthesizer.set_last_error(node, method) {
                w.write(", SetLastError = true");
            }
            w.writeln(")]");
        }

        if let Some(platform) = &method.supported_os_platform {
            writeln!(w, "[SupportedOSPlatform(\"{}\")]", platform)?;
        }

        if !options.contains(MethodOptions::FOR_IMPLEMENTATION) {
            w.writeln("[PreserveSig]");
            if let Some(convention) = calling_convention_type(method) {
                writeln!(w, "[UnmanagedCallConv(CallConvs = [typeof({})])]", convention)?;
            }
        }

        let returned = synthesizer.return_value(node, method);
        if let Some(MarshalUsing {
            type_name: Some(marshaller),
            ..
        }) = &returned.marshal_using
        {
            writeln!(w, "[return: MarshalUsing(typeof({}))]", marshaller)?;
        }
        if let Some(marshal_as) = &returned.marshal_as {
            writeln!(w, "[return: MarshalAs(UnmanagedType.{})]", marshal_as.unmanaged_type)?;
        }
        let return_type = returned.type_name().to_string();

        let (name, comment) = com::method_name(synthesizer, self.graph, owner, method);
        let name = identifier(&name);

        let public = if !node.is_interface() || options.contains(MethodOptions::PUBLIC) {
            "public "
        } else {
            ""
        };
        let unsafe_code = if options.contains(MethodOptions::UNSAFE) {
            "unsafe "
        } else {
            ""
        };
        let new_code = if options.contains(MethodOptions::FOR_IMPLEMENTATION)
            && OBJECT_MEMBERS.contains(&method.name.as_str())
        {
            "new "
        } else {
            ""
        };
        let static_code = if method.attributes.contains(MethodAttributes::STATIC) {
            "static partial "
        } else {
            ""
        };

        write!(
            w,
            "{}{}{}{}{} {}(",
            public, unsafe_code, new_code, static_code, return_type, name
        )?;

        let mut parameters = Vec::with_capacity(method.parameters.len());
        for (index, parameter) in method.parameters.iter().enumerate() {
            if index > 0 {
                w.write(", ");
            }
            parameters.push(self.write_parameter(w, owner, method, parameter, options)?);
        }

        w.write(")");
        if !options.contains(MethodOptions::FOR_IMPLEMENTATION) {
            w.write(";");
        }
        if let Some(comment) = comment {
            w.write(comment);
        }
        if !options.contains(MethodOptions::FOR_IMPLEMENTATION) {
            w.newline();
        }

        Ok(WrittenMethod {
            return_type,
            parameters,
        })
    }

    fn write_parameter(
        &self,
        w: &mut CodeWriter,
        owner: TypeId,
        method: &Method,
        parameter: &Parameter,
        options: MethodOptions,
    ) -> Result<WrittenParameter> {
        let synthesis = if options.contains(MethodOptions::COM_OUT_PTR_AS_RAW_HANDLE) {
            SynthesisOptions::COM_OUT_PTR_AS_RAW_HANDLE
        } else {
            SynthesisOptions::empty()
        };
        let def = self
            .synthesizer
            .parameter(&self.graph[owner], method, parameter, synthesis)?;

        let name = identifier(&parameter.name);
        let direction = match def.direction {
            Some(Direction::Out) if options.contains(MethodOptions::OUT_AS_REF) => {
                Some(Direction::Ref)
            }
            direction => direction,
        };

        w.write(&parameter_text(&def, direction, &name));
        Ok(WrittenParameter {
            name,
            type_name: def.type_name().to_string(),
            direction,
        })
    }
}

/// `[In][Out][MarshalAs(..)] [MarshalUsing(..)] out Type/* comment */ name`
pub(super) fn parameter_text(def: &ParameterDef, direction: Option<Direction>, name: &str) -> String {
    let mut text = String::new();
    if def.is_in == Some(true) {
        text.push_str("[In]");
    }
    if def.is_out == Some(true) {
        text.push_str("[Out]");
    }

    if let Some(marshal_as) = &def.marshal_as {
        text.push_str(&format!("[MarshalAs(UnmanagedType.{}", marshal_as.unmanaged_type));
        if let Some(sub_type) = marshal_as.array_sub_type {
            text.push_str(&format!(", ArraySubType = UnmanagedType.{}", sub_type));
        }
        text.push_str(")] ");
    } else if let Some(using) = def.marshal_using.as_ref().filter(|_| def.type_name() != RAW_HANDLE) {
        let mut arguments = Vec::new();
        if let Some(type_name) = &using.type_name {
            arguments.push(format!("typeof({})", type_name));
        }
        if let Some(count) = &using.count_element_name {
            arguments.push(format!("CountElementName = nameof({})", count));
        }
        if let Some(count) = using.constant_element_count {
            arguments.push(format!("ConstantElementCount = {}", count));
        }
        text.push_str(&format!("[MarshalUsing({})] ", arguments.join(", ")));
    }

    if let Some(direction) = direction {
        text.push_str(&format!("{} ", direction));
    }
    text.push_str(def.type_name());
    if let Some(comments) = &def.comments {
        text.push_str(comments);
    }
    text.push(' ');
    text.push_str(name);
    text
}
