//! System types known to the generator before any metadata is read.
//!
//! Win32 metadata refers to a handful of runtime types directly (`System.Guid`, `System.Void`,
//! primitive types appearing in signatures) and to a few Win32 typedefs that the target
//! language represents with a runtime type instead (`BOOL` is a `System.Boolean`).

use crate::{
    marshal::UnmanagedType,
    typegraph::{QualifiedName, TypeGraph, TypeNode},
};

/// `System`
pub const SYSTEM_NAMESPACE: &str = "System";
/// Namespace of generated inline array helpers
pub const INTEROP_TYPES_NAMESPACE: &str = "System.Runtime.InteropServices.InteropTypes";
/// `Windows.Win32.Foundation`
pub const FOUNDATION_NAMESPACE: &str = "Windows.Win32.Foundation";
/// `Windows.Win32.System.Com`
pub const COM_NAMESPACE: &str = "Windows.Win32.System.Com";
/// `Windows.Win32.Foundation.Metadata`
pub const METADATA_NAMESPACE: &str = "Windows.Win32.Foundation.Metadata";

/// `System.Boolean`
pub const BOOLEAN: &str = "System.Boolean";
/// `System.Byte`
pub const BYTE: &str = "System.Byte";
/// `System.Char`
pub const CHAR: &str = "System.Char";
/// `System.Double`
pub const DOUBLE: &str = "System.Double";
/// `System.Decimal`
pub const DECIMAL: &str = "System.Decimal";
/// `System.Enum`
pub const ENUM: &str = "System.Enum";
/// `System.Guid`
pub const GUID: &str = "System.Guid";
/// `System.Int16`
pub const INT16: &str = "System.Int16";
/// `System.Int32`
pub const INT32: &str = "System.Int32";
/// `System.Int64`
pub const INT64: &str = "System.Int64";
/// `System.IntPtr`
pub const INTPTR: &str = "System.IntPtr";
/// `System.MulticastDelegate`
pub const MULTICAST_DELEGATE: &str = "System.MulticastDelegate";
/// `System.Object`
pub const OBJECT: &str = "System.Object";
/// `System.SByte`
pub const SBYTE: &str = "System.SByte";
/// `System.Single`
pub const SINGLE: &str = "System.Single";
/// `System.String`
pub const STRING: &str = "System.String";
/// `System.UInt16`
pub const UINT16: &str = "System.UInt16";
/// `System.UInt32`
pub const UINT32: &str = "System.UInt32";
/// `System.UInt64`
pub const UINT64: &str = "System.UInt64";
/// `System.UIntPtr`
pub const UINTPTR: &str = "System.UIntPtr";
/// `System.ValueType`
pub const VALUE_TYPE: &str = "System.ValueType";
/// `System.Void`
pub const VOID: &str = "System.Void";
/// `System.Attribute`
pub const ATTRIBUTE: &str = "System.Attribute";

/// Root of all COM interfaces
pub const IUNKNOWN: &str = "Windows.Win32.System.Com.IUnknown";
/// COM status code
pub const HRESULT: &str = "Windows.Win32.Foundation.HRESULT";
/// Window procedure result, a handle-shaped typedef that is not a handle
pub const LRESULT: &str = "Windows.Win32.Foundation.LRESULT";
/// Win32 4-byte boolean
pub const BOOL: &str = "Windows.Win32.Foundation.BOOL";
/// Win32 decimal
pub const WIN32_DECIMAL: &str = "Windows.Win32.Foundation.DECIMAL";
/// Untyped function pointer
pub const FARPROC: &str = "Windows.Win32.Foundation.FARPROC";
/// UTF-16 string pointer
pub const PWSTR: &str = "Windows.Win32.Foundation.PWSTR";
/// ANSI string pointer
pub const PSTR: &str = "Windows.Win32.Foundation.PSTR";
/// COM string
pub const BSTR: &str = "Windows.Win32.Foundation.BSTR";

const BUILTINS: &[(&str, bool)] = &[
    (BOOLEAN, true),
    (BYTE, true),
    (CHAR, true),
    (DOUBLE, true),
    (DECIMAL, true),
    (ENUM, true),
    (GUID, true),
    (INT16, true),
    (INT32, true),
    (INT64, true),
    (INTPTR, true),
    (MULTICAST_DELEGATE, false),
    (OBJECT, false),
    (SBYTE, true),
    (SINGLE, true),
    (STRING, false),
    (UINT16, true),
    (UINT32, true),
    (UINT64, true),
    (UINTPTR, true),
    (VALUE_TYPE, false),
    (VOID, false),
    (ATTRIBUTE, false),
];

const MAPPINGS: &[(&str, &str)] = &[
    (BOOL, BOOLEAN),
    (WIN32_DECIMAL, DECIMAL),
    (IUNKNOWN, INTPTR),
    (FARPROC, INTPTR),
];

/// True if `full_name` is one of the pre-registered system types
#[must_use]
pub fn is_well_known(full_name: &str) -> bool {
    BUILTINS.iter().any(|(name, _)| *name == full_name)
}

/// Add the system types and the typedef mappings to `graph`
pub(crate) fn register(graph: &mut TypeGraph) {
    for (full_name, is_value_type) in BUILTINS {
        let mut node = TypeNode::builtin(QualifiedName::parse(full_name), *is_value_type);
        if *full_name == BOOLEAN {
            node.unmanaged_type = Some(UnmanagedType::U4);
        }
        graph.insert(node);
    }

    for (from, to) in MAPPINGS {
        if let Some(target) = graph.find_full_name(to) {
            graph.add_mapping(QualifiedName::parse(from), target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered() {
        let graph = TypeGraph::with_well_known();
        assert_eq!(graph.len(), BUILTINS.len());

        let boolean = graph.find_full_name(BOOLEAN).unwrap();
        assert!(graph[boolean].is_value_type);
        assert!(!graph[boolean].is_generated);
        assert_eq!(graph[boolean].unmanaged_type, Some(UnmanagedType::U4));

        let string = graph.find_full_name(STRING).unwrap();
        assert!(!graph[string].is_value_type);

        assert!(is_well_known(GUID));
        assert!(!is_well_known(BOOL));
        assert_eq!(
            graph.mapping(&QualifiedName::parse(BOOL)),
            Some(boolean)
        );
    }
}
