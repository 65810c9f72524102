//! Emission of planned nodes as source units.
//!
//! An [`Emitter`] renders one node of the type graph into the text of one [`Unit`]. The
//! strategy is chosen by [`EmitterKind`] in the configuration; C# is the only one registered.
//! Emitters never touch the file system; the [`UnitWriter`] does, and skips files whose
//! text is unchanged so repeated runs leave the output directory untouched.

pub mod csharp;
mod writer;

pub use writer::{CodeWriter, UnitWriter, WriteOutcome, WriteSummary};

use std::path::PathBuf;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::{
    config::Generation,
    naming::NameArbiter,
    typegraph::{TypeGraph, TypeId},
    Result,
};

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Path relative to the output directory
    pub path: PathBuf,
    /// Complete file text
    pub text: String,
}

/// Everything an emitter reads
pub struct EmitContext<'a> {
    /// The resolved, patched and arbitrated graph
    pub graph: &'a TypeGraph,
    /// Generation policy
    pub generation: &'a Generation,
    /// Output identities
    pub arbiter: &'a NameArbiter,
}

/// A target language
pub trait Emitter {
    /// File extension of the units, without the dot
    fn extension(&self) -> &'static str;

    /// Render the unit of `id`
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for nodes the language cannot express
    fn emit(&self, context: &EmitContext<'_>, id: TypeId) -> Result<Unit>;
}

/// Registered emission strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
pub enum EmitterKind {
    /// C# with source-generated interop
    #[default]
    CSharp,
}

impl EmitterKind {
    /// An emitter of this kind
    #[must_use]
    pub fn create(self) -> Box<dyn Emitter> {
        match self {
            EmitterKind::CSharp => Box::new(csharp::CSharpEmitter::new()),
        }
    }

    /// File extension of units of this kind
    #[must_use]
    pub fn extension(self) -> &'static str {
        self.create().extension()
    }
}
