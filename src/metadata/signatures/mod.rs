//! Signature blob decoding (ECMA-335 II.23.2).
//!
//! A WinMD file describes every field type, method shape and function pointer through
//! signature blobs in the `#Blob` heap. This module decodes the three kinds a binding
//! generator needs:
//!
//! - **Method signatures** - `MethodDef` and `MemberRef` signatures, also nested in `FNPTR`
//! - **Field signatures** - the type of a `Field` row
//! - **TypeSpec signatures** - a bare type, used for array and generic type references
//!
//! # Examples
//!
//! ```rust
//! use dotinterop::metadata::signatures::{parse_method_signature, TypeSignature};
//!
//! // static uint32 (int32)
//! let method = parse_method_signature(&[0x00, 0x01, 0x09, 0x08])?;
//! assert_eq!(method.return_type.base, TypeSignature::U4);
//! assert_eq!(method.params[0].base, TypeSignature::I4);
//! # Ok::<(), dotinterop::Error>(())
//! ```

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::Result;

#[allow(non_snake_case, dead_code, missing_docs)]
/// Bytes that identify element types inside a signature blob
pub mod ELEMENT_TYPE {
    // Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter of a type, as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter of a method, as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
}

/// Parse a method signature from a blob
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parse a field signature from a blob
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Parse a `TypeSpec` signature, which is a single type
///
/// # Errors
/// Returns an error if the signature data is malformed or truncated
pub fn parse_type_spec_signature(data: &[u8]) -> Result<TypeSignature> {
    let mut parser = SignatureParser::new(data);
    parser.parse_type()
}
