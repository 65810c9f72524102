//! Representation descriptors.
//!
//! A [`ParameterDef`] is what the synthesizer decides for one parameter, field or return value:
//! the target type text, the passing direction, an optional marshaling directive and a comment
//! that records what the native shape was when the representation had to be flattened.
//! Patches carry the same structure and are merged over the computed value with
//! [`ParameterDef::patch_from`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Passing direction of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Read-only reference
    In,
    /// Written by the callee
    Out,
    /// Read and written by the callee
    Ref,
}

/// Native representation of a marshaled value
///
/// The names are those of `System.Runtime.InteropServices.UnmanagedType`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum UnmanagedType {
    Bool,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    Currency,
    BStr,
    LPStr,
    LPWStr,
    LPTStr,
    ByValTStr,
    IUnknown,
    IDispatch,
    Struct,
    Interface,
    SafeArray,
    ByValArray,
    SysInt,
    SysUInt,
    VBByRefStr,
    AnsiBStr,
    TBStr,
    VariantBool,
    FunctionPtr,
    AsAny,
    LPArray,
    LPStruct,
    CustomMarshaler,
    Error,
    IInspectable,
    HString,
    LPUTF8Str,
}

/// A `MarshalAs` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarshalAs {
    /// Native representation of the value
    pub unmanaged_type: UnmanagedType,
    /// Native representation of array elements
    #[serde(default)]
    pub array_sub_type: Option<UnmanagedType>,
}

impl MarshalAs {
    /// Marshal as `unmanaged_type` without an element subtype
    #[must_use]
    pub fn new(unmanaged_type: UnmanagedType) -> Self {
        MarshalAs {
            unmanaged_type,
            array_sub_type: None,
        }
    }

    /// Overwrite with the values present in `patch`
    pub fn patch_from(&mut self, patch: &MarshalAs) {
        self.unmanaged_type = patch.unmanaged_type;
        if patch.array_sub_type.is_some() {
            self.array_sub_type = patch.array_sub_type;
        }
    }
}

/// A `MarshalUsing` directive: a custom marshaller or an element count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MarshalUsing {
    /// Marshaller type name
    pub type_name: Option<String>,
    /// Name of the sibling parameter holding the element count
    pub count_element_name: Option<String>,
    /// Compile-time element count
    pub constant_element_count: Option<i32>,
}

impl MarshalUsing {
    /// Overwrite with the values present in `patch`
    pub fn patch_from(&mut self, patch: &MarshalUsing) {
        if patch.type_name.is_some() {
            self.type_name.clone_from(&patch.type_name);
        }
        if patch.count_element_name.is_some() {
            self.count_element_name.clone_from(&patch.count_element_name);
        }
        if patch.constant_element_count.is_some() {
            self.constant_element_count = patch.constant_element_count;
        }
    }
}

/// Marshaling directive implied by a [`ParameterDef`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalDirective {
    /// Blittable, passed as is
    None,
    /// `MarshalAs` with an optional element subtype
    ByValue(MarshalAs),
    /// Array whose length is held by a sibling parameter
    CountPaired(String),
    /// Array with a compile-time length
    ConstantCount(i32),
    /// A custom marshaller
    Custom(String),
}

/// The target representation of one parameter, field or return value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterDef {
    /// Passing direction, `None` for by-value
    pub direction: Option<Direction>,
    /// `MarshalAs` directive
    pub marshal_as: Option<MarshalAs>,
    /// `MarshalUsing` directive
    pub marshal_using: Option<MarshalUsing>,
    /// Target type text
    pub type_name: Option<String>,
    /// Comment emitted after the type, e.g. ` /* optional IUnknown** */`
    pub comments: Option<String>,
    /// Explicit `[In]`
    pub is_in: Option<bool>,
    /// Explicit `[Out]`
    pub is_out: Option<bool>,
    /// Treat the parameter as optional before synthesis
    pub optional: Option<bool>,
}

impl ParameterDef {
    /// Overwrite with the values present in `patch`
    pub fn patch_from(&mut self, patch: &ParameterDef) {
        if patch.direction.is_some() {
            self.direction = patch.direction;
        }

        if let Some(marshal_as) = &patch.marshal_as {
            match &mut self.marshal_as {
                Some(existing) => existing.patch_from(marshal_as),
                None => self.marshal_as = Some(marshal_as.clone()),
            }
        }

        if let Some(marshal_using) = &patch.marshal_using {
            match &mut self.marshal_using {
                Some(existing) => existing.patch_from(marshal_using),
                None => self.marshal_using = Some(marshal_using.clone()),
            }
        }

        if patch.type_name.is_some() {
            self.type_name.clone_from(&patch.type_name);
        }
        if patch.comments.is_some() {
            self.comments.clone_from(&patch.comments);
        }
        if patch.is_in.is_some() {
            self.is_in = patch.is_in;
        }
        if patch.is_out.is_some() {
            self.is_out = patch.is_out;
        }
    }

    /// The type text, empty if none was decided
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or_default()
    }

    /// True if the type text denotes a managed array
    #[must_use]
    pub fn is_array_type_name(&self) -> bool {
        self.type_name().ends_with("[]")
    }

    /// True if the type text carries the nullable marker
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.type_name().ends_with('?')
    }

    /// The marshaling directive this descriptor implies
    #[must_use]
    pub fn directive(&self) -> MarshalDirective {
        if let Some(marshal_as) = &self.marshal_as {
            return MarshalDirective::ByValue(marshal_as.clone());
        }

        match &self.marshal_using {
            Some(MarshalUsing {
                count_element_name: Some(name),
                ..
            }) => MarshalDirective::CountPaired(name.clone()),
            Some(MarshalUsing {
                constant_element_count: Some(count),
                ..
            }) => MarshalDirective::ConstantCount(*count),
            Some(MarshalUsing {
                type_name: Some(name),
                ..
            }) => MarshalDirective::Custom(name.clone()),
            _ => MarshalDirective::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_merges() {
        let mut def = ParameterDef {
            direction: Some(Direction::Out),
            type_name: Some("int".into()),
            marshal_using: Some(MarshalUsing {
                count_element_name: Some("cItems".into()),
                ..MarshalUsing::default()
            }),
            ..ParameterDef::default()
        };

        let patch: ParameterDef = serde_json::from_str(
            r#"{ "Direction": "Ref", "MarshalUsing": { "ConstantElementCount": 4 } }"#,
        )
        .unwrap();
        def.patch_from(&patch);

        assert_eq!(def.direction, Some(Direction::Ref));
        assert_eq!(def.type_name(), "int");
        let using = def.marshal_using.as_ref().unwrap();
        assert_eq!(using.count_element_name.as_deref(), Some("cItems"));
        assert_eq!(using.constant_element_count, Some(4));
    }

    #[test]
    fn directives() {
        let def = ParameterDef {
            marshal_as: Some(MarshalAs {
                unmanaged_type: UnmanagedType::LPArray,
                array_sub_type: Some(UnmanagedType::U4),
            }),
            ..ParameterDef::default()
        };
        assert!(matches!(def.directive(), MarshalDirective::ByValue(_)));

        let def = ParameterDef {
            marshal_using: Some(MarshalUsing {
                constant_element_count: Some(16),
                ..MarshalUsing::default()
            }),
            ..ParameterDef::default()
        };
        assert_eq!(def.directive(), MarshalDirective::ConstantCount(16));
        assert_eq!(ParameterDef::default().directive(), MarshalDirective::None);
    }

    #[test]
    fn names() {
        assert_eq!(Direction::Out.to_string(), "out");
        assert_eq!(UnmanagedType::LPWStr.to_string(), "LPWStr");
        let def = ParameterDef {
            type_name: Some("IStream?".into()),
            ..ParameterDef::default()
        };
        assert!(def.is_nullable());
        assert!(!def.is_array_type_name());
    }
}
