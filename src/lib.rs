// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotinterop
//!
//! Interop binding generation from Windows metadata (WinMD) images.
//!
//! `dotinterop` decodes the ECMA-335 metadata embedded in a WinMD file, carves a requested
//! subset of types and functions out of it, closes that subset over everything it depends on
//! and emits source bindings that reproduce native signatures, memory layouts and marshaling
//! behavior. C# with source-generated interop is the registered target.
//!
//! ## Pipeline
//!
//! Each stage only reads what the previous one produced:
//!
//! 1. [`metadata::catalog::MetadataCatalog`] decodes the image into owned definitions,
//! 2. [`selection::SelectionEngine`] evaluates the configured type and member patterns,
//! 3. [`resolver::DependencyResolver`] builds the [`typegraph::TypeGraph`] and the
//!    must-emit set,
//! 4. [`patch::PatchEngine`] applies user overrides to resolved members,
//! 5. [`naming::NameArbiter`] settles output paths and unified-mode collisions,
//! 6. [`marshal::SignatureSynthesizer`] decides every parameter, field and return
//!    representation while an [`emit::Emitter`] spells it out.
//!
//! [`builder::Builder`] runs all of them for one [`config::BuilderConfiguration`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotinterop::builder::Builder;
//! use dotinterop::config::{BuilderConfiguration, PatternInput};
//!
//! let config = BuilderConfiguration {
//!     type_inputs: vec![PatternInput::new("Windows.Win32.UI.Shell.IShellItem")],
//!     generate_files: false,
//!     ..BuilderConfiguration::default()
//! };
//!
//! let result = Builder::new(config, "win32.json")
//!     .with_win_md("Windows.Win32.winmd")
//!     .build()?;
//! for unit in &result.units {
//!     println!("{}", unit.path.display());
//! }
//! # Ok::<(), dotinterop::Error>(())
//! ```
//!
//! ## Errors
//!
//! Every fallible operation returns [`Result`]. Configuration problems are reported before
//! any metadata is resolved; patterns that match nothing, patches that designate nothing and
//! dangling type references are logged through the `log` facade and do not abort a run.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Definitions, parsing and decoding of WinMD metadata based on ECMA-335
///
/// # Key Components
///
/// - [`metadata::catalog`] - owned definitions and attribute-derived facts
/// - [`metadata::cor20header`] - CLR 2.0 header information
/// - [`metadata::root`] - Metadata root and stream directory
/// - [`metadata::streams`] - String, GUID and Blob heaps and the table stream header
/// - [`metadata::tables`] - Raw rows of the tables the generator reads
/// - [`metadata::signatures`] - Method and field signatures
/// - [`metadata::customattributes`] - Custom attribute blobs
pub mod metadata;

/// Resolved type nodes, members and the arena graph holding them
pub mod typegraph;

/// Builder configuration and generation policy
pub mod config;

/// Pattern evaluation over the metadata universe
pub mod selection;

/// Transitive dependency closure
pub mod resolver;

/// User overrides applied after resolution
pub mod patch;

/// Output paths, unified mode and collision handling
pub mod naming;

/// Parameter, field and return value representations
pub mod marshal;

/// COM dispatch table layout
pub mod com;

/// Target language emission and output files
pub mod emit;

/// End-to-end orchestration
pub mod builder;

/// `dotinterop` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use dotinterop::{metadata::catalog::MetadataCatalog, Result};
///
/// fn load(path: &str) -> Result<MetadataCatalog> {
///     MetadataCatalog::from_file(std::path::Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotinterop` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use dotinterop::{metadata::catalog::MetadataCatalog, Error};
///
/// match MetadataCatalog::from_file(std::path::Path::new("broken.winmd")) {
///     Ok(catalog) => println!("{} types", catalog.types().len()),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// A loaded PE image carrying a metadata root
pub use file::File;

/// Cursor over signature and attribute blobs
pub use file::parser::Parser;
