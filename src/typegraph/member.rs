//! Methods, parameters and fields of a type node.

use crate::{
    marshal::{ParameterDef, UnmanagedType},
    metadata::{
        catalog::{
            FieldAttributes, ImportInfo, MethodAttributes, MethodImplAttributes, ParamAttributes,
        },
        token::Token,
    },
    typegraph::TypeId,
};

/// Array size hints of a parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeArray {
    /// Fixed element count
    pub count_const: Option<i32>,
    /// Index of the parameter holding the element count, as stored in metadata
    pub count_param_index: Option<i16>,
    /// Name of the field holding the element count
    pub count_field_name: Option<String>,
    /// Position of the count parameter after sorting, linked by [`Method::sort_and_link_parameters`]
    pub count_parameter: Option<usize>,
}

/// A method parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Declared name
    pub name: String,
    /// 1-based position in the signature
    pub sequence: u16,
    /// Resolved type
    pub type_id: TypeId,
    /// Param row flags
    pub attributes: ParamAttributes,
    /// Carries `ComOutPtrAttribute`
    pub is_com_out_ptr: bool,
    /// Carries `ConstAttribute`
    pub is_const: bool,
    /// `NativeArrayInfoAttribute` hints
    pub native_array: Option<NativeArray>,
    /// `MemorySizeAttribute(BytesParamIndex)`
    pub bytes_param_index: Option<i16>,
    /// Explicit native representation
    pub unmanaged_type: Option<UnmanagedType>,
    /// Patched representation, merged over the synthesized one
    pub def: Option<ParameterDef>,
}

impl Parameter {
    /// A plain parameter of type `type_id`
    #[must_use]
    pub fn new(name: impl Into<String>, sequence: u16, type_id: TypeId) -> Self {
        Parameter {
            name: name.into(),
            sequence,
            type_id,
            attributes: ParamAttributes::empty(),
            is_com_out_ptr: false,
            is_const: false,
            native_array: None,
            bytes_param_index: None,
            unmanaged_type: None,
            def: None,
        }
    }

    /// `[In]`
    #[must_use]
    pub fn is_in(&self) -> bool {
        self.attributes.contains(ParamAttributes::IN)
    }

    /// `[Out]`
    #[must_use]
    pub fn is_out(&self) -> bool {
        self.attributes.contains(ParamAttributes::OUT)
    }

    /// `[Optional]`
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.attributes.contains(ParamAttributes::OPTIONAL)
    }
}

/// A method of a type node
#[derive(Debug, Clone)]
pub struct Method {
    /// MethodDef token, `None` for synthesized methods
    pub token: Option<Token>,
    /// Declared name
    pub name: String,
    /// MethodDef flags
    pub attributes: MethodAttributes,
    /// MethodDef implementation flags
    pub impl_attributes: MethodImplAttributes,
    /// Carries `AnsiAttribute`
    pub is_ansi: bool,
    /// Carries `UnicodeAttribute`
    pub is_unicode: bool,
    /// P/Invoke entry point and module
    pub import: Option<ImportInfo>,
    /// Minimum supported platform
    pub supported_os_platform: Option<String>,
    /// Documentation link
    pub documentation: Option<String>,
    /// Resolved return type
    pub return_type: Option<TypeId>,
    /// Parameters sorted by sequence
    pub parameters: Vec<Parameter>,
    /// Patched name
    pub new_name: Option<String>,
    /// Patched return type text
    pub return_type_name: Option<String>,
    /// Patched last-error flag
    pub set_last_error: Option<bool>,
}

impl Method {
    /// An empty method named `name`
    #[must_use]
    pub fn new(token: Option<Token>, name: impl Into<String>) -> Self {
        Method {
            token,
            name: name.into(),
            attributes: MethodAttributes::empty(),
            impl_attributes: MethodImplAttributes::empty(),
            is_ansi: false,
            is_unicode: false,
            import: None,
            supported_os_platform: None,
            documentation: None,
            return_type: None,
            parameters: Vec::new(),
            new_name: None,
            return_type_name: None,
            set_last_error: None,
        }
    }

    /// The name to emit
    #[must_use]
    pub fn emitted_name(&self) -> &str {
        self.new_name.as_deref().unwrap_or(&self.name)
    }

    /// Sort parameters by sequence and link count parameters to their position
    pub fn sort_and_link_parameters(&mut self) {
        self.parameters.sort_by_key(|parameter| parameter.sequence);

        let count = self.parameters.len();
        for parameter in &mut self.parameters {
            if let Some(array) = &mut parameter.native_array {
                array.count_parameter = array
                    .count_param_index
                    .and_then(|index| usize::try_from(index).ok())
                    .filter(|index| *index < count);
            }
        }
    }
}

/// A field of a type node
#[derive(Debug, Clone)]
pub struct Field {
    /// Field token, `None` for synthesized fields
    pub token: Option<Token>,
    /// Declared name
    pub name: String,
    /// Resolved type
    pub type_id: TypeId,
    /// Field row flags
    pub attributes: FieldAttributes,
    /// Explicit offset from FieldLayout
    pub offset: Option<u32>,
    /// Raw default value
    pub default_value: Option<Vec<u8>>,
    /// Value text from `ConstantAttribute`
    pub text_constant: Option<String>,
    /// Carries `FlexibleArrayAttribute`
    pub is_flexible_array: bool,
    /// Patched name
    pub new_name: Option<String>,
    /// Patched type text
    pub type_name: Option<String>,
    /// Patched value text
    pub value: Option<String>,
}

impl Field {
    /// A plain field of type `type_id`
    #[must_use]
    pub fn new(token: Option<Token>, name: impl Into<String>, type_id: TypeId) -> Self {
        Field {
            token,
            name: name.into(),
            type_id,
            attributes: FieldAttributes::empty(),
            offset: None,
            default_value: None,
            text_constant: None,
            is_flexible_array: false,
            new_name: None,
            type_name: None,
            value: None,
        }
    }

    /// The name to emit
    #[must_use]
    pub fn emitted_name(&self) -> &str {
        self.new_name.as_deref().unwrap_or(&self.name)
    }

    /// True for `const` and `static` fields
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.attributes.contains(FieldAttributes::STATIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_and_link() {
        let id = TypeId(0);
        let mut method = Method::new(None, "GetItems");
        let mut items = Parameter::new("items", 2, id);
        items.native_array = Some(NativeArray {
            count_param_index: Some(0),
            ..NativeArray::default()
        });
        let mut broken = Parameter::new("broken", 3, id);
        broken.native_array = Some(NativeArray {
            count_param_index: Some(7),
            ..NativeArray::default()
        });
        method.parameters = vec![items, broken, Parameter::new("count", 1, id)];
        method.sort_and_link_parameters();

        let names: Vec<_> = method.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["count", "items", "broken"]);
        assert_eq!(
            method.parameters[1].native_array.as_ref().unwrap().count_parameter,
            Some(0)
        );
        assert_eq!(
            method.parameters[2].native_array.as_ref().unwrap().count_parameter,
            None
        );
    }

    #[test]
    fn flags_and_names() {
        let mut parameter = Parameter::new("ppv", 1, TypeId(0));
        parameter.attributes = ParamAttributes::OUT | ParamAttributes::OPTIONAL;
        assert!(parameter.is_out());
        assert!(parameter.is_optional());
        assert!(!parameter.is_in());

        let mut method = Method::new(None, "Create");
        assert_eq!(method.emitted_name(), "Create");
        method.new_name = Some("CreateEx".into());
        assert_eq!(method.emitted_name(), "CreateEx");
    }
}
