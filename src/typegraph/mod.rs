//! The resolved type graph.
//!
//! Every type the generator knows about is a [`TypeNode`] stored in a [`TypeGraph`] arena and
//! addressed by a [`TypeId`]. Nodes are identified by their [`QualifiedName`]; pointer types
//! are nodes of their own whose name is the base name followed by `*` markers, and fixed-size
//! arrays are synthesized `InlineArray` nodes. The node kind is the closed [`TypeKind`] sum
//! type, so the resolver, the synthesizer and the emitters match on it exhaustively.
//!
//! # Example
//!
//! ```rust
//! use dotinterop::typegraph::{wellknown, TypeGraph};
//!
//! let mut graph = TypeGraph::with_well_known();
//! let void = graph.find_full_name(wellknown::VOID).unwrap();
//! let pointer = graph.pointer_to(void, 2);
//! assert_eq!(graph[pointer].name.full_name(), "System.Void**");
//! assert_eq!(graph.strip_pointer(pointer), void);
//! ```

mod graph;
mod member;
mod name;
mod node;
mod value;
pub mod wellknown;

pub use graph::TypeGraph;
pub use member::{Field, Method, NativeArray, Parameter};
pub use name::{QualifiedName, NESTED_SEPARATOR, POINTER_MARKER};
pub use node::{CallingConvention, LayoutKind, TypeId, TypeKind, TypeNode};
pub use value::Value;
