//! Metadata streams: the heaps and the tables stream.
//!
//! - `#Strings` ([`Strings`]) - identifiers
//! - `#Blob` ([`Blob`]) - signatures, attribute values, constants
//! - `#GUID` ([`Guid`]) - module ids
//! - `#~` ([`TablesHeader`]) - the metadata tables
//!
//! The `#US` heap holds string literals for method bodies and is never needed for bindings.

mod blob;
mod guid;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
