//! Metadata tables of the `#~` stream.
//!
//! The tables stream stores every table back to back with variable-width columns. This module
//! provides the sizing model ([`TableInfo`], [`CodedIndexType`]), a generic typed view
//! ([`MetadataTable`]) over any row type implementing [`RowReadable`], and raw row types for
//! the tables a WinMD binding generator consumes.
//!
//! # Example
//!
//! ```rust,ignore
//! let typedefs = tables.table::<TypeDefRaw>()?;
//! for row in typedefs.iter() {
//!     let row = row?;
//!     println!("{} {}", row.token, row.flags);
//! }
//! ```
//!
//! # Reference
//! * [ECMA-335 II.22 - Metadata logical format: tables](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod codedindex;
mod rows;
mod table;
mod tableid;
mod tableinfo;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use rows::*;
pub use table::{MetadataTable, RowReadable, TableIterator};
pub use tableid::TableId;
pub use tableinfo::{TableInfo, TableInfoRef, TableRowInfo};
