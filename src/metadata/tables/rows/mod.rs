//! Raw rows of the tables the catalog decodes.
//!
//! Rows hold heap indexes and row numbers exactly as stored; resolution into names, signatures
//! and owned definitions happens in [`crate::metadata::catalog`].

mod classlayout;
mod constant;
mod customattribute;
mod field;
mod fieldlayout;
mod implmap;
mod interfaceimpl;
mod memberref;
mod methoddef;
mod module;
mod moduleref;
mod nestedclass;
mod param;
mod typedef;
mod typeref;

pub use classlayout::ClassLayoutRaw;
pub use constant::ConstantRaw;
pub use customattribute::CustomAttributeRaw;
pub use field::FieldRaw;
pub use fieldlayout::FieldLayoutRaw;
pub use implmap::ImplMapRaw;
pub use interfaceimpl::InterfaceImplRaw;
pub use memberref::MemberRefRaw;
pub use methoddef::MethodDefRaw;
pub use module::ModuleRaw;
pub use moduleref::ModuleRefRaw;
pub use nestedclass::NestedClassRaw;
pub use param::ParamRaw;
pub use typedef::TypeDefRaw;
pub use typeref::TypeRefRaw;
