//! Owned definitions produced by the catalog.
//!
//! Every row the binding pipeline needs is copied out of the metadata streams into these
//! plain structures, with heap indices resolved to strings, blobs decoded into signatures and
//! custom attributes attached to their owners.

use bitflags::bitflags;

use crate::metadata::{
    catalog::Attributes,
    signatures::{SignatureMethod, TypeSignature},
    token::Token,
};

/// Mask for the visibility bits of [`TypeAttributes`]
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;
/// Mask for the layout bits of [`TypeAttributes`]
pub const TYPE_LAYOUT_MASK: u32 = 0x0000_0018;
/// Mask for the access bits of [`MethodAttributes`] and [`FieldAttributes`]
pub const MEMBER_ACCESS_MASK: u32 = 0x0000_0007;
/// Mask for the calling convention bits of [`ImportFlags`]
pub const IMPORT_CALL_CONV_MASK: u16 = 0x0700;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `TypeDef` flags (ECMA-335 II.23.1.15)
    pub struct TypeAttributes: u32 {
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested with public visibility
        const NESTED_PUBLIC = 0x0000_0002;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Fields carry explicit offsets
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// The type is an interface
        const INTERFACE = 0x0000_0020;
        /// Abstract type
        const ABSTRACT = 0x0000_0080;
        /// Sealed type
        const SEALED = 0x0000_0100;
        /// Name has special meaning
        const SPECIAL_NAME = 0x0000_0400;
        /// Imported from a type library
        const IMPORT = 0x0000_1000;
        /// Windows Runtime type
        const WINDOWS_RUNTIME = 0x0000_4000;
        /// Strings marshal as UTF-16
        const UNICODE_CLASS = 0x0001_0000;
        /// Strings marshal platform dependent
        const AUTO_CLASS = 0x0002_0000;
        /// Static initialization may run lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

impl TypeAttributes {
    /// Raw visibility value (`0` not public, `1` public, `2` nested public, ...)
    #[must_use]
    pub fn visibility(self) -> u32 {
        self.bits() & TYPE_VISIBILITY_MASK
    }

    /// Public top-level type
    #[must_use]
    pub fn is_public(self) -> bool {
        self.visibility() == 1
    }

    /// Nested type with public visibility
    #[must_use]
    pub fn is_nested_public(self) -> bool {
        self.visibility() == 2
    }

    /// Any nested visibility
    #[must_use]
    pub fn is_nested(self) -> bool {
        self.visibility() >= 2
    }

    /// Fields carry explicit offsets
    #[must_use]
    pub fn is_explicit_layout(self) -> bool {
        self.bits() & TYPE_LAYOUT_MASK == Self::EXPLICIT_LAYOUT.bits()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `MethodDef` flags (ECMA-335 II.23.1.10)
    pub struct MethodAttributes: u32 {
        /// Public access; compare with [`MethodAttributes::access`]
        const PUBLIC = 0x0006;
        /// Static method
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual method
        const VIRTUAL = 0x0040;
        /// Hidden by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Takes a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Abstract method
        const ABSTRACT = 0x0400;
        /// Name has special meaning
        const SPECIAL_NAME = 0x0800;
        /// Name has special meaning to the runtime
        const RT_SPECIAL_NAME = 0x1000;
        /// Implemented through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Has security attached
        const HAS_SECURITY = 0x4000;
    }
}

impl MethodAttributes {
    /// Raw member access value
    #[must_use]
    pub fn access(self) -> u32 {
        self.bits() & MEMBER_ACCESS_MASK
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `MethodDef` implementation flags (ECMA-335 II.23.1.11)
    pub struct MethodImplAttributes: u32 {
        /// Provided by the runtime
        const RUNTIME = 0x0003;
        /// Unmanaged implementation
        const UNMANAGED = 0x0004;
        /// Signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Internal call
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// `Field` flags (ECMA-335 II.23.1.5)
    pub struct FieldAttributes: u32 {
        /// Public access; compare with [`FieldAttributes::access`]
        const PUBLIC = 0x0006;
        /// Static field
        const STATIC = 0x0010;
        /// Only assigned in the constructor
        const INIT_ONLY = 0x0020;
        /// Compile-time constant
        const LITERAL = 0x0040;
        /// Not serialized
        const NOT_SERIALIZED = 0x0080;
        /// Has an RVA
        const HAS_FIELD_RVA = 0x0100;
        /// Name has special meaning
        const SPECIAL_NAME = 0x0200;
        /// Name has special meaning to the runtime
        const RT_SPECIAL_NAME = 0x0400;
        /// Has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Implemented through P/Invoke
        const PINVOKE_IMPL = 0x2000;
        /// Has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

impl FieldAttributes {
    /// Raw member access value
    #[must_use]
    pub fn access(self) -> u32 {
        self.bits() & MEMBER_ACCESS_MASK
    }

    /// Public access
    #[must_use]
    pub fn is_public(self) -> bool {
        self.access() == Self::PUBLIC.bits()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// `Param` flags (ECMA-335 II.23.1.13)
    pub struct ParamAttributes: u32 {
        /// Input parameter
        const IN = 0x0001;
        /// Output parameter
        const OUT = 0x0002;
        /// Optional parameter
        const OPTIONAL = 0x0010;
        /// Has a default value
        const HAS_DEFAULT = 0x1000;
        /// Has marshalling information
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// `ImplMap` flags (ECMA-335 II.23.1.8)
    pub struct ImportFlags: u16 {
        /// Use the member name as specified
        const NO_MANGLE = 0x0001;
        /// Marshal strings as ANSI
        const CHAR_SET_ANSI = 0x0002;
        /// Marshal strings as UTF-16
        const CHAR_SET_UNICODE = 0x0004;
        /// The callee reports failures through the last-error channel
        const SUPPORTS_LAST_ERROR = 0x0040;
        /// Low calling convention bit
        const CALL_CONV_LOW = 0x0100;
        /// Middle calling convention bit
        const CALL_CONV_MID = 0x0200;
        /// High calling convention bit
        const CALL_CONV_HIGH = 0x0400;
    }
}

/// Calling convention of a P/Invoke import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportCallConv {
    /// Not specified
    Unspecified,
    /// The platform default
    Winapi,
    /// `cdecl`
    Cdecl,
    /// `stdcall`
    Stdcall,
    /// `thiscall`
    Thiscall,
    /// `fastcall`
    Fastcall,
}

impl ImportFlags {
    /// Calling convention encoded in bits 8..11
    #[must_use]
    pub fn call_conv(self) -> ImportCallConv {
        match self.bits() & IMPORT_CALL_CONV_MASK {
            0x0100 => ImportCallConv::Winapi,
            0x0200 => ImportCallConv::Cdecl,
            0x0300 => ImportCallConv::Stdcall,
            0x0400 => ImportCallConv::Thiscall,
            0x0500 => ImportCallConv::Fastcall,
            _ => ImportCallConv::Unspecified,
        }
    }
}

/// P/Invoke information of a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// `ImplMap` flags
    pub flags: ImportFlags,
    /// Exported symbol
    pub entry_point: String,
    /// Native module, e.g. `KERNEL32.dll`
    pub module: String,
}

/// A default value from the Constant table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantValue {
    /// `ELEMENT_TYPE` of the stored value
    pub element_type: u8,
    /// Raw little-endian bytes
    pub bytes: Vec<u8>,
}

/// Packing and size of a type from the `ClassLayout` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassLayout {
    /// Field alignment, 0 for the default
    pub packing_size: u16,
    /// Total size in bytes, 0 if unspecified
    pub class_size: u32,
}

/// Namespace and name of a TypeDef or TypeRef, nested names joined with `+`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// Namespace of the outermost declaring type
    pub namespace: String,
    /// Simple name, `Outer+Inner` for nested types
    pub name: String,
}

impl TypeName {
    /// Create a name from its parts
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `Namespace.Name`, or just the name without a namespace
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Innermost segment of a nested name
    #[must_use]
    pub fn nested_name(&self) -> &str {
        self.name.rsplit('+').next().unwrap_or(&self.name)
    }
}

/// A parameter row of a method
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    /// `Param` token
    pub token: Token,
    /// Position; 0 is the return value
    pub sequence: u16,
    /// Parameter name
    pub name: String,
    /// Flags
    pub flags: ParamAttributes,
    /// Attached custom attributes
    pub attributes: Attributes,
}

/// A method of a type
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// `MethodDef` token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Flags
    pub flags: MethodAttributes,
    /// Implementation flags
    pub impl_flags: MethodImplAttributes,
    /// Decoded signature
    pub signature: SignatureMethod,
    /// Parameter rows in table order
    pub params: Vec<ParameterDefinition>,
    /// P/Invoke information, if any
    pub import: Option<ImportInfo>,
    /// Attached custom attributes
    pub attributes: Attributes,
}

/// A field of a type
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// `Field` token
    pub token: Token,
    /// Field name
    pub name: String,
    /// Flags
    pub flags: FieldAttributes,
    /// Decoded field type
    pub signature: TypeSignature,
    /// Default value
    pub constant: Option<ConstantValue>,
    /// Explicit offset from `FieldLayout`
    pub offset: Option<u32>,
    /// Attached custom attributes
    pub attributes: Attributes,
}

/// A type declared by the metadata
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// `TypeDef` token
    pub token: Token,
    /// Namespace and (nested) name
    pub name: TypeName,
    /// Flags
    pub flags: TypeAttributes,
    /// Base type, a null token if there is none
    pub extends: Token,
    /// Declaring type for nested types
    pub enclosing: Option<Token>,
    /// Types nested in this one, in table order
    pub nested: Vec<Token>,
    /// Implemented interfaces, in table order
    pub interfaces: Vec<Token>,
    /// Methods
    pub methods: Vec<MethodDefinition>,
    /// Fields
    pub fields: Vec<FieldDefinition>,
    /// Layout from `ClassLayout`
    pub layout: Option<ClassLayout>,
    /// Attached custom attributes
    pub attributes: Attributes,
}

impl TypeDefinition {
    /// `Namespace.Name`
    #[must_use]
    pub fn full_name(&self) -> String {
        self.name.full_name()
    }

    /// The interface flag is set
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeAttributes::INTERFACE)
    }

    /// The type is nested in another type
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.enclosing.is_some()
    }

    /// False if `SupportedArchitectureAttribute` excludes the architecture flag `flag`
    #[must_use]
    pub fn supports_architecture(&self, flag: u32) -> bool {
        self.attributes
            .supported_architecture()
            .map_or(true, |mask| mask & flag == flag)
    }
}

/// Shape of a type definition, derived from its flags and base type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum DefinitionKind {
    /// Interface flag set
    Interface,
    /// Public value type
    Structure,
    /// Derives from `System.Enum`
    Enum,
    /// Derives from `System.MulticastDelegate`
    Delegate,
    /// Anything else, typically a holder of constants and functions
    Class,
}
