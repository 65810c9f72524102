//! Metadata decoding for WinMD images.
//!
//! A WinMD file is a PE image whose CLI header points at an ECMA-335 metadata root. This
//! module reads that root bottom-up: the [`cor20header`] locates the metadata, the [`root`]
//! lists its streams, [`streams`] exposes the heaps and the `#~` table stream, [`tables`]
//! decodes the rows the generator needs, [`signatures`] and [`customattributes`] decode the
//! blobs those rows point to. The [`catalog`] ties everything together into owned
//! definitions that the rest of the crate works from.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotinterop::metadata::catalog::MetadataCatalog;
//! use std::path::Path;
//!
//! let catalog = MetadataCatalog::from_file(Path::new("Windows.Win32.winmd"))?;
//! if let Some(def) = catalog.find("Windows.Win32.UI.Shell.IShellItem") {
//!     println!("{} methods", def.methods.len());
//! }
//! # Ok::<(), dotinterop::Error>(())
//! ```

/// Owned type, member and attribute definitions
pub mod catalog;
/// Implementation of the Header of CIL
pub mod cor20header;
/// Implementation of custom attribute parsing and representation
pub mod customattributes;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of method and type signatures
pub mod signatures;
/// Implementation of the metadata streams
pub mod streams;
/// Implementation of the metadata tables
pub mod tables;
/// Implementation of the metadata tokens
pub mod token;
