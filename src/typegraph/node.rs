//! Type nodes.

use std::collections::HashSet;

use crate::{
    marshal::UnmanagedType,
    metadata::token::Token,
    typegraph::{Field, Method, QualifiedName},
};

/// Index of a node in its [`crate::typegraph::TypeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Raw arena index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Field placement of a structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutKind {
    /// Fields follow each other in declaration order
    #[default]
    Sequential,
    /// Every field carries its own offset
    Explicit,
}

/// Native calling convention of a delegate, numbered as `CallingConvention`
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CallingConvention {
    /// Platform default
    Winapi,
    /// Caller cleans the stack
    Cdecl,
    /// Callee cleans the stack
    StdCall,
    /// `this` in a register
    ThisCall,
    /// Arguments in registers
    FastCall,
}

impl CallingConvention {
    /// Map the integer stored in `UnmanagedFunctionPointerAttribute`
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(CallingConvention::Winapi),
            2 => Some(CallingConvention::Cdecl),
            3 => Some(CallingConvention::StdCall),
            4 => Some(CallingConvention::ThisCall),
            5 => Some(CallingConvention::FastCall),
            _ => None,
        }
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// A pre-registered system type
    Builtin,
    /// A plain class holding constants and functions
    ApiHolder,
    /// A value type
    Structure {
        /// Field placement
        layout: LayoutKind,
        /// `Pack` from ClassLayout, 0 when unspecified
        packing_size: Option<u16>,
        /// Total size from ClassLayout
        class_size: Option<u32>,
    },
    /// An interface; only IUnknown-derived ones carry a COM dispatch table
    Interface {
        /// Derives from the root COM interface
        is_iunknown_derived: bool,
    },
    /// An enumeration
    Enum {
        /// Carries `FlagsAttribute`
        is_flags: bool,
        /// Integer type of the values
        underlying: Option<TypeId>,
    },
    /// A function pointer type
    Delegate {
        /// Declared calling convention
        calling_convention: Option<CallingConvention>,
    },
    /// A view over its base with `indirections` levels of pointers
    Pointer {
        /// The pointer-stripped node
        base: TypeId,
        /// Levels of indirection
        indirections: usize,
    },
    /// A fixed-size array stored inline
    InlineArray {
        /// Element node
        element: TypeId,
        /// Number of elements
        size: u32,
    },
    /// A general array without a fixed size
    Array {
        /// Element node
        element: TypeId,
        /// Number of dimensions
        rank: u32,
    },
}

/// One node of the type graph
#[derive(Debug, Clone)]
pub struct TypeNode {
    /// Identity
    pub name: QualifiedName,
    /// Node kind and kind-specific data
    pub kind: TypeKind,
    /// The TypeDef this node was created from
    pub definition: Option<Token>,
    /// Eligible for emission
    pub is_generated: bool,
    /// Has value semantics
    pub is_value_type: bool,
    /// Declared inside another type
    pub is_nested: bool,
    /// A native handle typedef
    pub is_handle: bool,
    /// Interface or class identifier
    pub guid: Option<uguid::Guid>,
    /// Minimum supported platform, e.g. `windows8.0`
    pub supported_os_platform: Option<String>,
    /// Documentation link
    pub documentation: Option<String>,
    /// Base type
    pub base: Option<TypeId>,
    /// Implemented interfaces in metadata order
    pub interfaces: Vec<TypeId>,
    /// Nested types in metadata order
    pub nested_types: Vec<TypeId>,
    /// Declared methods
    pub methods: Vec<Method>,
    /// Declared fields
    pub fields: Vec<Field>,
    /// Methods selected explicitly; empty means all
    pub included_methods: HashSet<Token>,
    /// Methods removed explicitly
    pub excluded_methods: HashSet<Token>,
    /// Fields selected explicitly; empty means all
    pub included_fields: HashSet<Token>,
    /// Fields removed explicitly
    pub excluded_fields: HashSet<Token>,
    /// Native representation when used as a parameter
    pub unmanaged_type: Option<UnmanagedType>,
    file_name: Option<String>,
}

impl TypeNode {
    /// Create an empty node of `kind`
    #[must_use]
    pub fn new(name: QualifiedName, kind: TypeKind) -> Self {
        let is_value_type = matches!(kind, TypeKind::Structure { .. } | TypeKind::Enum { .. });
        let is_generated = !matches!(
            kind,
            TypeKind::Builtin | TypeKind::Pointer { .. } | TypeKind::Array { .. }
        );

        TypeNode {
            name,
            kind,
            definition: None,
            is_generated,
            is_value_type,
            is_nested: false,
            is_handle: false,
            guid: None,
            supported_os_platform: None,
            documentation: None,
            base: None,
            interfaces: Vec::new(),
            nested_types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            included_methods: HashSet::new(),
            excluded_methods: HashSet::new(),
            included_fields: HashSet::new(),
            excluded_fields: HashSet::new(),
            unmanaged_type: None,
            file_name: None,
        }
    }

    /// A pre-registered system type
    #[must_use]
    pub fn builtin(name: QualifiedName, is_value_type: bool) -> Self {
        let mut node = TypeNode::new(name, TypeKind::Builtin);
        node.is_value_type = is_value_type;
        node
    }

    /// File name without extension, the simple name unless overridden
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(self.name.name())
    }

    /// Override the file name
    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = Some(file_name.into());
    }

    /// True for interfaces, COM or not
    #[must_use]
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface { .. })
    }

    /// True for IUnknown-derived interfaces
    #[must_use]
    pub fn is_iunknown_derived(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Interface {
                is_iunknown_derived: true
            }
        )
    }

    /// True for structures
    #[must_use]
    pub fn is_structure(&self) -> bool {
        matches!(self.kind, TypeKind::Structure { .. })
    }

    /// True for enums
    #[must_use]
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum { .. })
    }

    /// True for delegates
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        matches!(self.kind, TypeKind::Delegate { .. })
    }

    /// True for pointer views
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    /// True for plain classes holding constants and functions
    #[must_use]
    pub fn is_api_holder(&self) -> bool {
        matches!(self.kind, TypeKind::ApiHolder)
    }

    /// Pointer indirection levels, 0 for non-pointers
    #[must_use]
    pub fn indirections(&self) -> usize {
        match self.kind {
            TypeKind::Pointer { indirections, .. } => indirections,
            _ => 0,
        }
    }

    /// True if explicit member inclusion narrows this node
    #[must_use]
    pub fn has_member_filter(&self) -> bool {
        !self.included_methods.is_empty() || !self.included_fields.is_empty()
    }

    /// Methods left after member-level narrowing
    pub fn generated_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|method| {
            narrowed(
                method.token,
                &self.included_methods,
                &self.excluded_methods,
            )
        })
    }

    /// Fields left after member-level narrowing
    pub fn generated_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(|field| narrowed(field.token, &self.included_fields, &self.excluded_fields))
    }

    /// Copy everything but the identity into a new node named `name`
    #[must_use]
    pub fn clone_as(&self, name: QualifiedName) -> TypeNode {
        let mut copy = self.clone();
        copy.name = name;
        copy.file_name = None;
        copy
    }
}

fn narrowed(token: Option<Token>, included: &HashSet<Token>, excluded: &HashSet<Token>) -> bool {
    let Some(token) = token else {
        return true;
    };

    if excluded.contains(&token) {
        return false;
    }

    included.is_empty() || included.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typegraph::TypeGraph;

    fn method(row: u32, name: &str) -> Method {
        Method::new(Some(Token::new(0x0600_0000 | row)), name)
    }

    #[test]
    fn kinds_default_flags() {
        let node = TypeNode::new(
            QualifiedName::new("A", "S"),
            TypeKind::Structure {
                layout: LayoutKind::Sequential,
                packing_size: None,
                class_size: None,
            },
        );
        assert!(node.is_value_type);
        assert!(node.is_generated);

        let graph = TypeGraph::with_well_known();
        let void = graph.find_full_name("System.Void").unwrap();
        let node = TypeNode::new(
            QualifiedName::new("System", "Void*"),
            TypeKind::Pointer {
                base: void,
                indirections: 1,
            },
        );
        assert!(!node.is_generated);
        assert_eq!(node.indirections(), 1);
    }

    #[test]
    fn member_narrowing() {
        let mut node = TypeNode::new(QualifiedName::new("A", "Apis"), TypeKind::ApiHolder);
        node.methods = vec![method(1, "One"), method(2, "Two"), Method::new(None, "Synth")];
        assert_eq!(node.generated_methods().count(), 3);

        node.excluded_methods.insert(Token::new(0x0600_0001));
        let names: Vec<_> = node.generated_methods().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Two", "Synth"]);

        node.excluded_methods.clear();
        node.included_methods.insert(Token::new(0x0600_0001));
        let names: Vec<_> = node.generated_methods().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["One", "Synth"]);
    }

    #[test]
    fn file_names() {
        let mut node = TypeNode::new(QualifiedName::new("A", "HWND"), TypeKind::ApiHolder);
        assert_eq!(node.file_name(), "HWND");
        node.set_file_name("HWND_0");
        assert_eq!(node.file_name(), "HWND_0");
        let copy = node.clone_as(QualifiedName::new("A", "Handle"));
        assert_eq!(copy.file_name(), "Handle");
        assert_eq!(CallingConvention::from_value(1), Some(CallingConvention::Winapi));
        assert_eq!(CallingConvention::from_value(9), None);
    }
}
