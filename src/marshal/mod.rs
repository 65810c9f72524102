//! Native representation decisions.
//!
//! The [`SignatureSynthesizer`] turns a resolved parameter, field or return value into a
//! [`ParameterDef`]: the target type text, the passing direction, the marshaling directive and
//! an optional comment preserving the native shape when the representation is flattened to a
//! raw handle. Decisions depend only on the type graph, the generation policy and the names
//! a [`TypeNamer`] gives to graph nodes, so identical inputs always yield identical
//! descriptors.
//!
//! The last-error heuristic lives beside it in [`SignatureSynthesizer::has_set_last_error`].

mod descriptor;
mod lasterror;
mod synthesizer;

pub use descriptor::{Direction, MarshalAs, MarshalDirective, MarshalUsing, ParameterDef, UnmanagedType};
pub use synthesizer::{SignatureSynthesizer, SynthesisOptions};

use crate::typegraph::{TypeGraph, TypeId};

/// Text of the pointer-sized signed integer in the target language
pub const RAW_HANDLE: &str = "nint";
/// Text of the pointer-sized unsigned integer in the target language
pub const UNSIGNED_RAW_HANDLE: &str = "nuint";
/// Text of the empty return type
pub const VOID: &str = "void";

/// Names graph nodes the way the emitter refers to them
pub trait TypeNamer {
    /// The reference name of `id` with any pointer markers stripped
    ///
    /// System types use their language keyword where one exists.
    fn reference_name(&self, graph: &TypeGraph, id: TypeId) -> String;
}
