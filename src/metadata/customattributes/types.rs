//! Decoded custom attribute values.

/// A parsed custom attribute value with fixed and named arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeValue {
    /// Fixed arguments from the constructor signature
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Named arguments (fields and properties)
    pub named_args: Vec<CustomAttributeNamedArgument>,
}

impl CustomAttributeValue {
    /// Value of the named argument `name`, fields and properties alike
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&CustomAttributeArgument> {
        self.named_args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// Represents a single custom attribute argument value
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// Boolean value
    Bool(bool),
    /// Character value (16-bit Unicode)
    Char(char),
    /// Signed 8-bit integer
    I1(i8),
    /// Unsigned 8-bit integer
    U1(u8),
    /// Signed 16-bit integer
    I2(i16),
    /// Unsigned 16-bit integer
    U2(u16),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// String, `None` for a null string
    String(Option<String>),
    /// Type reference (as string)
    Type(Option<String>),
    /// Array of arguments
    Array(Vec<CustomAttributeArgument>),
    /// Enum value (type name + underlying value)
    Enum(String, Box<CustomAttributeArgument>),
}

impl CustomAttributeArgument {
    /// The value as a signed integer, looking through enums. Floats and strings give `None`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CustomAttributeArgument::Bool(value) => Some(i64::from(*value)),
            CustomAttributeArgument::Char(value) => Some(i64::from(u32::from(*value))),
            CustomAttributeArgument::I1(value) => Some(i64::from(*value)),
            CustomAttributeArgument::U1(value) => Some(i64::from(*value)),
            CustomAttributeArgument::I2(value) => Some(i64::from(*value)),
            CustomAttributeArgument::U2(value) => Some(i64::from(*value)),
            CustomAttributeArgument::I4(value) => Some(i64::from(*value)),
            CustomAttributeArgument::U4(value) => Some(i64::from(*value)),
            CustomAttributeArgument::I8(value) => Some(*value),
            CustomAttributeArgument::U8(value) => i64::try_from(*value).ok(),
            CustomAttributeArgument::Enum(_, value) => value.as_i64(),
            _ => None,
        }
    }

    /// The value as a string slice, for non-null strings and type names
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CustomAttributeArgument::String(Some(value))
            | CustomAttributeArgument::Type(Some(value)) => Some(value),
            _ => None,
        }
    }
}

/// Represents a named argument (field or property) in a custom attribute
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// Whether this is a field (true) or property (false)
    pub is_field: bool,
    /// Name of the field or property
    pub name: String,
    /// Value of the argument
    pub value: CustomAttributeArgument,
}

/// `CorSerializationType` constants as defined in corhdr.h
#[allow(non_snake_case, missing_docs)]
pub mod SERIALIZATION_TYPE {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const TAGGED_OBJECT: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}
