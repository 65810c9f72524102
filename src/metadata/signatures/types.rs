use crate::metadata::token::Token;

/// A decoded type from a signature blob (ECMA-335 II.23.2.12)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeSignature {
    /// Placeholder before decoding
    #[default]
    Unknown,
    /// `void`
    Void,
    /// `bool`
    Boolean,
    /// UTF-16 code unit
    Char,
    /// `int8`
    I1,
    /// `uint8`
    U1,
    /// `int16`
    I2,
    /// `uint16`
    U2,
    /// `int32`
    I4,
    /// `uint32`
    U4,
    /// `int64`
    I8,
    /// `uint64`
    U8,
    /// `float32`
    R4,
    /// `float64`
    R8,
    /// `string`
    String,
    /// Unmanaged pointer
    Ptr(SignaturePointer),
    /// Managed reference
    ByRef(Box<TypeSignature>),
    /// Value type named by a TypeDef, TypeRef or TypeSpec token
    ValueType(Token),
    /// Reference type named by a TypeDef, TypeRef or TypeSpec token
    Class(Token),
    /// Generic type parameter by index
    GenericParamType(u32),
    /// General array with rank and bounds
    Array(SignatureArray),
    /// Instantiated generic type
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// `typedref`
    TypedByRef,
    /// `native int`
    I,
    /// `native unsigned int`
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// `object`
    Object,
    /// Single-dimensional zero-based array
    SzArray(SignatureSzArray),
    /// Generic method parameter by index
    GenericParamMethod(u32),
}

impl TypeSignature {
    /// Number of unmanaged pointer levels wrapping the innermost element type
    #[must_use]
    pub fn indirections(&self) -> usize {
        match self {
            TypeSignature::Ptr(pointer) => 1 + pointer.base.indirections(),
            _ => 0,
        }
    }

    /// The innermost type below all pointer levels
    #[must_use]
    pub fn pointee(&self) -> &TypeSignature {
        match self {
            TypeSignature::Ptr(pointer) => pointer.base.pointee(),
            other => other,
        }
    }
}

/// Dimensions of a general array (ECMA-335 II.23.2.13)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureArray {
    /// Element type
    pub base: Box<TypeSignature>,
    /// Number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions that have one
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions that have one
    pub lower_bounds: Vec<i32>,
}

/// A single-dimensional array
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers before the element type
    pub modifiers: Vec<Token>,
    /// Element type
    pub base: Box<TypeSignature>,
}

/// An unmanaged pointer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignaturePointer {
    /// Custom modifiers before the pointee
    pub modifiers: Vec<Token>,
    /// The pointee
    pub base: Box<TypeSignature>,
}

/// A parameter or return type of a method signature
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureParameter {
    /// Custom modifiers
    pub modifiers: Vec<Token>,
    /// Passed by managed reference
    pub by_ref: bool,
    /// The parameter type
    pub base: TypeSignature,
}

/// Calling convention encoded in the low nibble of a method signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureCallingConvention {
    /// Managed default
    #[default]
    Default,
    /// `cdecl`
    C,
    /// `stdcall`
    StdCall,
    /// `thiscall`
    ThisCall,
    /// `fastcall`
    FastCall,
    /// Managed varargs
    VarArg,
    /// Any other value
    Other(u8),
}

impl From<u8> for SignatureCallingConvention {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => SignatureCallingConvention::Default,
            0x1 => SignatureCallingConvention::C,
            0x2 => SignatureCallingConvention::StdCall,
            0x3 => SignatureCallingConvention::ThisCall,
            0x4 => SignatureCallingConvention::FastCall,
            0x5 => SignatureCallingConvention::VarArg,
            other => SignatureCallingConvention::Other(other),
        }
    }
}

/// A method signature (ECMA-335 II.23.2.1)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureMethod {
    /// Instance method
    pub has_this: bool,
    /// `this` is passed explicitly as the first parameter
    pub explicit_this: bool,
    /// Calling convention
    pub calling_convention: SignatureCallingConvention,
    /// Number of generic parameters, 0 if not generic
    pub param_count_generic: u32,
    /// Return type
    pub return_type: SignatureParameter,
    /// Fixed parameters
    pub params: Vec<SignatureParameter>,
    /// Parameters after the vararg sentinel
    pub varargs: Vec<SignatureParameter>,
}

/// A field signature (ECMA-335 II.23.2.4)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureField {
    /// Custom modifiers
    pub modifiers: Vec<Token>,
    /// The field type
    pub base: TypeSignature,
}
