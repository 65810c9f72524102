//! Parameter, field and return value descriptors.

use bitflags::bitflags;

use crate::{
    config::{ComOutPtrTarget, Generation},
    marshal::{
        Direction, MarshalAs, MarshalUsing, ParameterDef, TypeNamer, UnmanagedType, RAW_HANDLE,
        UNSIGNED_RAW_HANDLE, VOID,
    },
    metadata::catalog::MethodAttributes,
    typegraph::{wellknown, Field, Method, NativeArray, Parameter, TypeGraph, TypeId, TypeNode},
    Error, Result,
};

const BOOL: &str = "bool";
const BYTE: &str = "byte";
const OBJECT: &str = "object";

bitflags! {
    /// Adjustments for the call site a descriptor is built for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SynthesisOptions: u8 {
        /// Every COM output pointer becomes a raw handle, as dispatch-table calls need
        const COM_OUT_PTR_AS_RAW_HANDLE = 0x01;
    }
}

/// Maps resolved members to their target representation
pub struct SignatureSynthesizer<'a> {
    pub(super) graph: &'a TypeGraph,
    pub(super) generation: &'a Generation,
    namer: &'a dyn TypeNamer,
}

impl<'a> SignatureSynthesizer<'a> {
    /// A synthesizer over `graph` following `generation`
    #[must_use]
    pub fn new(graph: &'a TypeGraph, generation: &'a Generation, namer: &'a dyn TypeNamer) -> Self {
        SignatureSynthesizer {
            graph,
            generation,
            namer,
        }
    }

    /// The reference name of `id` after mapping
    #[must_use]
    pub fn type_name(&self, id: TypeId) -> String {
        self.namer.reference_name(self.graph, self.graph.map(id))
    }

    /// The descriptor of `parameter` with its patch merged over it
    ///
    /// # Errors
    /// See [`SignatureSynthesizer::synthesize`]
    pub fn parameter(
        &self,
        owner: &TypeNode,
        method: &Method,
        parameter: &Parameter,
        options: SynthesisOptions,
    ) -> Result<ParameterDef> {
        let mut def = self.synthesize(owner, method, parameter, options)?;
        if let Some(patch) = &parameter.def {
            def.patch_from(patch);
        }
        Ok(def)
    }

    /// The computed descriptor of `parameter` of `method` declared by `owner`
    ///
    /// The first matching rule wins: untyped COM output pointers, optional pointers, untyped
    /// pointers, byte buffers, delegate parameters, arrays, multi-level output pointers and
    /// finally the mapped type as declared.
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for an input array that has neither a count parameter
    /// nor a constant count.
    pub fn synthesize(
        &self,
        owner: &TypeNode,
        method: &Method,
        parameter: &Parameter,
        options: SynthesisOptions,
    ) -> Result<ParameterDef> {
        let graph = self.graph;
        let declared = &graph[parameter.type_id];
        let indirections = declared.is_pointer().then(|| declared.indirections());
        let mapped = &graph[graph.map(parameter.type_id)];

        let type_name = self.type_name(parameter.type_id);
        if self.is_unknown_com_out_ptr(parameter) {
            return Ok(self.unknown_com_out_ptr(&type_name, options));
        }

        let mut def = ParameterDef {
            type_name: Some(type_name.clone()),
            ..ParameterDef::default()
        };

        if parameter.is_out() {
            def.direction = Some(if parameter.is_in() {
                Direction::Ref
            } else {
                Direction::Out
            });
        }

        if let Some(unmanaged_type) = parameter.unmanaged_type.or(mapped.unmanaged_type) {
            def.marshal_as = Some(MarshalAs::new(unmanaged_type));
        }

        if def.direction.is_none()
            && mapped.is_pointer()
            && type_name != RAW_HANDLE
            && type_name != UNSIGNED_RAW_HANDLE
        {
            def.direction = Some(Direction::In);
        }

        if parameter.is_optional() {
            if let Some(indirections) = indirections {
                return Ok(ParameterDef {
                    type_name: Some(RAW_HANDLE.to_string()),
                    comments: Some(format!(
                        " /* optional {}{} */",
                        type_name,
                        "*".repeat(indirections)
                    )),
                    ..ParameterDef::default()
                });
            }
        }

        if type_name == VOID && mapped.is_pointer() {
            def.type_name = Some(RAW_HANDLE.to_string());
            def.marshal_as = None;
            def.direction = (mapped.indirections() != 1).then_some(Direction::Out);
            return Ok(def);
        }

        if type_name == BYTE {
            if let Some(indirections) = indirections {
                def.type_name = Some(RAW_HANDLE.to_string());
                def.comments = Some(" /* byte array */".to_string());
                def.marshal_as = None;
                def.direction = (indirections != 1).then_some(Direction::Out);
                return Ok(def);
            }
        }

        if owner.is_delegate() {
            if def.direction.is_some() || declared.is_interface() || declared.is_delegate() {
                def.comments = Some(match def.direction {
                    Some(direction) => format!(" /* {} {} */", direction, type_name),
                    None => format!(" /* {} */", type_name),
                });
                def.direction = None;
                def.type_name = Some(RAW_HANDLE.to_string());
            }
            return Ok(def);
        }

        if let Some(array) = &parameter.native_array {
            return self.native_array(def, method, parameter, array, indirections.is_some(), mapped);
        }

        if def.direction == Some(Direction::Out)
            && type_name == OBJECT
            && def.marshal_using.is_none()
            && def.marshal_as.is_none()
        {
            def.type_name = Some(RAW_HANDLE.to_string());
            return Ok(def);
        }

        if def.direction == Some(Direction::Out) && indirections.is_some_and(|n| n > 1) {
            def.type_name = Some(RAW_HANDLE.to_string());
            return Ok(def);
        }

        // buffers sized by a byte count are written through, never returned
        if def.direction == Some(Direction::Out) && parameter.bytes_param_index.is_some() {
            def.direction = None;
            if mapped.is_pointer() {
                def.type_name = Some(RAW_HANDLE.to_string());
            }
        }

        // a nullable value type would be a managed, non-blittable wrapper
        if parameter.is_optional()
            && def.type_name() != RAW_HANDLE
            && !declared.is_value_type
            && (!declared.is_interface() || declared.is_iunknown_derived())
        {
            if let Some(name) = &mut def.type_name {
                name.push('?');
            }
        }

        let base = &graph[graph.strip_pointer(parameter.type_id)];
        if indirections.is_some() && base.is_interface() && def.direction == Some(Direction::Out) {
            if options.contains(SynthesisOptions::COM_OUT_PTR_AS_RAW_HANDLE) {
                return Ok(ParameterDef {
                    type_name: Some(RAW_HANDLE.to_string()),
                    direction: Some(Direction::Out),
                    ..ParameterDef::default()
                });
            }

            if self.generation.com_out_ptr_target == ComOutPtrTarget::UniqueObject {
                let type_name = def.type_name().to_string();
                return Ok(ParameterDef {
                    direction: Some(Direction::Out),
                    marshal_using: Some(MarshalUsing {
                        type_name: Some(format!("UniqueComInterfaceMarshaller<{}>", type_name)),
                        ..MarshalUsing::default()
                    }),
                    type_name: Some(type_name),
                    ..ParameterDef::default()
                });
            }
        }

        Ok(def)
    }

    /// True for a `ComOutPtr` parameter whose pointee is `void` or `object`
    #[must_use]
    pub fn is_unknown_com_out_ptr(&self, parameter: &Parameter) -> bool {
        if !parameter.is_com_out_ptr {
            return false;
        }

        let base = self.graph[self.graph.strip_pointer(parameter.type_id)]
            .name
            .full_name();
        base == wellknown::VOID || base == wellknown::OBJECT
    }

    fn unknown_com_out_ptr(&self, type_name: &str, options: SynthesisOptions) -> ParameterDef {
        let target = if options.contains(SynthesisOptions::COM_OUT_PTR_AS_RAW_HANDLE) {
            ComOutPtrTarget::IntPtr
        } else {
            self.generation.unknown_com_out_ptr_target
        };

        let comments = Some(format!(" /* {} */", type_name));
        match target {
            ComOutPtrTarget::Object => ParameterDef {
                direction: Some(Direction::Out),
                type_name: Some(OBJECT.to_string()),
                marshal_as: Some(MarshalAs::new(UnmanagedType::Interface)),
                comments,
                ..ParameterDef::default()
            },
            ComOutPtrTarget::UniqueObject => ParameterDef {
                direction: Some(Direction::Out),
                type_name: Some(OBJECT.to_string()),
                marshal_using: Some(MarshalUsing {
                    type_name: Some("UniqueComInterfaceMarshaller<object>".to_string()),
                    ..MarshalUsing::default()
                }),
                comments,
                ..ParameterDef::default()
            },
            ComOutPtrTarget::IntPtr => ParameterDef {
                direction: Some(Direction::Out),
                type_name: Some(RAW_HANDLE.to_string()),
                comments,
                ..ParameterDef::default()
            },
        }
    }

    fn native_array(
        &self,
        mut def: ParameterDef,
        method: &Method,
        parameter: &Parameter,
        array: &NativeArray,
        is_pointer: bool,
        mapped: &TypeNode,
    ) -> Result<ParameterDef> {
        def.marshal_as = (def.type_name() == BOOL).then(|| MarshalAs {
            unmanaged_type: UnmanagedType::LPArray,
            array_sub_type: Some(UnmanagedType::U4),
        });

        let full_name = mapped.name.full_name();
        let implicit = !is_pointer
            && [wellknown::PWSTR, wellknown::PSTR, wellknown::BSTR].contains(&full_name.as_str());
        if !implicit {
            if let Some(name) = &mut def.type_name {
                name.push_str("[]");
            }
        }

        let count_parameter = array
            .count_parameter
            .and_then(|index| method.parameters.get(index));
        if let Some(count) = count_parameter {
            def.marshal_using = Some(MarshalUsing {
                count_element_name: Some(count.name.clone()),
                ..MarshalUsing::default()
            });
            if def.direction.is_none() {
                def.is_in = Some(true);
                def.is_out = Some(true);
            } else if !count.is_out() && (is_pointer || implicit) {
                def.direction = None;
                if parameter.is_out() {
                    def.is_out = Some(true);
                }
                def.is_in = Some(true);
            }
        } else if let Some(count) = array.count_const {
            def.marshal_using = Some(MarshalUsing {
                constant_element_count: Some(count),
                ..MarshalUsing::default()
            });
            if def.direction.is_none() {
                def.is_in = Some(true);
                def.is_out = Some(true);
            } else if (is_pointer || implicit) && parameter.is_out() {
                def.direction = None;
                def.is_in = Some(true);
                def.is_out = Some(true);
            }
        } else if def.direction == Some(Direction::Out) {
            def.type_name = Some(RAW_HANDLE.to_string());
        } else {
            return Err(Error::NotSupported(format!(
                "Array parameter '{}' of '{}' has no element count",
                parameter.name, method.name
            )));
        }

        if implicit {
            def.is_in = None;
            def.is_out = None;
        }

        if def.direction == Some(Direction::In) && def.is_array_type_name() {
            def.direction = None;
            def.is_in = Some(true);
        }

        Ok(def)
    }

    /// The descriptor of the return value of `method` declared by `owner`
    ///
    /// COM methods return `HRESULT` marshaled as an error; pointers and non-COM interfaces
    /// become raw handles.
    #[must_use]
    pub fn return_value(&self, owner: &TypeNode, method: &Method) -> ParameterDef {
        if let Some(type_name) = &method.return_type_name {
            return ParameterDef {
                type_name: Some(type_name.clone()),
                ..ParameterDef::default()
            };
        }

        let void = ParameterDef {
            type_name: Some(VOID.to_string()),
            ..ParameterDef::default()
        };
        let Some(return_type) = method.return_type else {
            return void;
        };
        if self.graph[return_type].name.full_name() == wellknown::VOID {
            return void;
        }

        let mapped = &self.graph[self.graph.map(return_type)];
        let mut def = ParameterDef::default();

        if owner.is_delegate() {
            def.type_name = Some(if mapped.is_interface() || mapped.is_pointer() {
                RAW_HANDLE.to_string()
            } else {
                self.type_name(return_type)
            });
            def.marshal_as = mapped.unmanaged_type.map(MarshalAs::new);
            return def;
        }

        if mapped.is_iunknown_derived() {
            def.marshal_using = Some(MarshalUsing {
                type_name: Some(format!(
                    "UniqueComInterfaceMarshaller<{}>",
                    mapped.name.name()
                )),
                ..MarshalUsing::default()
            });
        }

        if mapped.is_pointer() || (mapped.is_interface() && !mapped.is_iunknown_derived()) {
            def.type_name = Some(RAW_HANDLE.to_string());
            return def;
        }

        let full_name = mapped.name.full_name();
        let unmanaged_type = if full_name == wellknown::HRESULT {
            Some(UnmanagedType::Error)
        } else {
            mapped.unmanaged_type
        };
        if let Some(unmanaged_type) = unmanaged_type {
            if !method.attributes.contains(MethodAttributes::STATIC) || full_name == wellknown::BOOLEAN
            {
                def.marshal_as = Some(MarshalAs::new(unmanaged_type));
            }
        }
        def.type_name = Some(self.type_name(return_type));
        def
    }

    /// The descriptor of a structure or constant field
    ///
    /// Interfaces, delegates and pointers are stored as raw handles.
    #[must_use]
    pub fn field(&self, field: &Field) -> ParameterDef {
        let mapped = &self.graph[self.graph.map(field.type_id)];
        let type_name = match &field.type_name {
            Some(type_name) => type_name.clone(),
            None if mapped.is_interface() || mapped.is_delegate() || mapped.is_pointer() => {
                RAW_HANDLE.to_string()
            }
            None => self.type_name(field.type_id),
        };

        ParameterDef {
            type_name: Some(type_name),
            marshal_as: mapped.unmanaged_type.map(MarshalAs::new),
            ..ParameterDef::default()
        }
    }
}
