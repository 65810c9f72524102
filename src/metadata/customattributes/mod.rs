//! Custom attribute blob decoding (ECMA-335 II.23.3).
//!
//! WinMD files carry most interop facts as custom attributes: interface GUIDs, native array
//! sizes, `SupportedOSPlatform`, architecture filters and more. A blob has three parts:
//!
//! - **Prolog** - the `0x0001` marker
//! - **Fixed arguments** - constructor parameter values, typed by the constructor signature
//! - **Named arguments** - field and property assignments, each carrying its own type tag
//!
//! Fixed arguments carry no type information, so decoding needs the constructor's
//! [`crate::metadata::signatures::SignatureMethod`] plus an [`AttributeTypeResolver`] for
//! the names and enum sizes of referenced types.
//!
//! # Examples
//!
//! ```rust
//! use dotinterop::metadata::customattributes::{parse_custom_attribute, AttributeTypeResolver};
//! use dotinterop::metadata::signatures::parse_method_signature;
//! use dotinterop::metadata::token::Token;
//!
//! struct NoTypes;
//! impl AttributeTypeResolver for NoTypes {
//!     fn type_name(&self, _token: Token) -> Option<String> {
//!         None
//!     }
//! }
//!
//! // instance void .ctor(string)
//! let ctor = parse_method_signature(&[0x20, 0x01, 0x01, 0x0E])?;
//! let value = parse_custom_attribute(&[0x01, 0x00, 0x02, b'h', b'i', 0x00, 0x00], &ctor, &NoTypes)?;
//! assert_eq!(value.fixed_args[0].as_str(), Some("hi"));
//! # Ok::<(), dotinterop::Error>(())
//! ```

mod parser;
mod types;

pub use parser::{AttributeTypeResolver, CustomAttributeParser, MAX_NESTING_DEPTH};
pub use types::*;

use crate::{metadata::signatures::SignatureMethod, Result};

/// Decode a custom attribute blob against the signature of its constructor
///
/// # Errors
/// Returns an error if the blob is malformed, truncated, or references a type the
/// resolver does not know.
pub fn parse_custom_attribute(
    data: &[u8],
    constructor: &SignatureMethod,
    resolver: &dyn AttributeTypeResolver,
) -> Result<CustomAttributeValue> {
    CustomAttributeParser::new(data, resolver).parse_custom_attribute(constructor)
}
