//! C# identifiers and type reference names.

use crate::{
    marshal::TypeNamer,
    typegraph::{wellknown, QualifiedName, TypeGraph, TypeId, TypeKind},
};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "virtual", "void",
    "volatile", "while",
];

const TYPE_KEYWORDS: &[(&str, &str)] = &[
    (wellknown::BOOLEAN, "bool"),
    (wellknown::BYTE, "byte"),
    (wellknown::CHAR, "char"),
    (wellknown::DOUBLE, "double"),
    (wellknown::DECIMAL, "decimal"),
    (wellknown::INT16, "short"),
    (wellknown::INT32, "int"),
    (wellknown::INT64, "long"),
    (wellknown::INTPTR, "nint"),
    (wellknown::OBJECT, "object"),
    (wellknown::SBYTE, "sbyte"),
    (wellknown::SINGLE, "float"),
    (wellknown::STRING, "string"),
    (wellknown::UINT16, "ushort"),
    (wellknown::UINT32, "uint"),
    (wellknown::UINT64, "ulong"),
    (wellknown::UINTPTR, "nuint"),
    (wellknown::VOID, "void"),
];

/// Namespaces whose types are referenced by simple name everywhere
const IMPLICIT_NAMESPACES: &[&str] = &[
    wellknown::SYSTEM_NAMESPACE,
    wellknown::INTEROP_TYPES_NAMESPACE,
];

/// `name` with an `@` prefix if it is a keyword; dotted names are escaped per segment
#[must_use]
pub fn identifier(name: &str) -> String {
    if name.contains('.') {
        return name
            .split('.')
            .map(identifier)
            .collect::<Vec<_>>()
            .join(".");
    }

    if KEYWORDS.contains(&name) {
        format!("@{}", name)
    } else {
        name.to_string()
    }
}

/// The keyword of a system type, if it has one
#[must_use]
pub fn type_keyword(full_name: &str) -> Option<&'static str> {
    TYPE_KEYWORDS
        .iter()
        .find(|(name, _)| *name == full_name)
        .map(|(_, keyword)| *keyword)
}

/// Names graph nodes relative to the namespace of the unit being written
#[derive(Debug, Clone, Default)]
pub struct CSharpNamer {
    unified: bool,
    namespace: Option<String>,
}

impl CSharpNamer {
    /// A namer; in unified mode every type is referenced by its simple name
    #[must_use]
    pub fn new(unified: bool) -> Self {
        CSharpNamer {
            unified,
            namespace: None,
        }
    }

    /// Reference types of `namespace` by their simple name
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The name `name` is written as, before keyword substitution
    #[must_use]
    pub fn generated_name(&self, name: &QualifiedName) -> String {
        let name = name.without_pointer();
        if name.is_nested() {
            return name.nested_name().to_string();
        }

        let namespace = name.namespace();
        if IMPLICIT_NAMESPACES.contains(&namespace)
            || self.namespace.as_deref() == Some(namespace)
            || self.unified
        {
            return name.name().to_string();
        }

        name.full_name()
    }
}

impl TypeNamer for CSharpNamer {
    fn reference_name(&self, graph: &TypeGraph, id: TypeId) -> String {
        let id = graph.strip_pointer(id);
        let node = &graph[id];
        if let TypeKind::Array { element, rank } = node.kind {
            let element = self.reference_name(graph, graph.map(element));
            let commas = ",".repeat(rank.saturating_sub(1) as usize);
            return format!("{}[{}]", element, commas);
        }

        match type_keyword(&node.name.full_name()) {
            Some(keyword) => keyword.to_string(),
            None => self.generated_name(&node.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typegraph::{LayoutKind, TypeNode};

    #[test]
    fn identifiers() {
        assert_eq!(identifier("event"), "@event");
        assert_eq!(identifier("hWnd"), "hWnd");
        assert_eq!(identifier("Windows.Win32.System.Com"), "Windows.Win32.System.Com");
        assert_eq!(identifier("A.base.C"), "A.@base.C");
    }

    #[test]
    fn reference_names() {
        let mut graph = TypeGraph::with_well_known();
        let uint = graph.find_full_name(wellknown::UINT32).unwrap();
        let guid = graph.find_full_name(wellknown::GUID).unwrap();
        let rect = graph.insert(TypeNode::new(
            QualifiedName::new("Windows.Win32.Foundation", "RECT"),
            TypeKind::Structure {
                layout: LayoutKind::Sequential,
                packing_size: None,
                class_size: None,
            },
        ));
        let rect_ptr = graph.pointer_to(rect, 2);
        let nested = graph.insert(TypeNode::new(
            QualifiedName::new("Windows.Win32.Foundation", "RECT+_Anonymous_e__Union"),
            TypeKind::Structure {
                layout: LayoutKind::Explicit,
                packing_size: None,
                class_size: None,
            },
        ));

        let local = CSharpNamer::new(false).in_namespace("Windows.Win32.Foundation");
        let foreign = CSharpNamer::new(false).in_namespace("Windows.Win32.UI.Shell");
        let unified = CSharpNamer::new(true).in_namespace("DirectN");

        assert_eq!(local.reference_name(&graph, uint), "uint");
        assert_eq!(foreign.reference_name(&graph, guid), "Guid");
        assert_eq!(local.reference_name(&graph, rect_ptr), "RECT");
        assert_eq!(foreign.reference_name(&graph, rect), "Windows.Win32.Foundation.RECT");
        assert_eq!(unified.reference_name(&graph, rect), "RECT");
        assert_eq!(foreign.reference_name(&graph, nested), "_Anonymous_e__Union");
    }

    #[test]
    fn arrays() {
        let mut graph = TypeGraph::with_well_known();
        let short = graph.find_full_name(wellknown::INT16).unwrap();
        let array = graph.insert(TypeNode::new(
            QualifiedName::new("System", "Int16[,]"),
            TypeKind::Array {
                element: short,
                rank: 2,
            },
        ));
        assert_eq!(CSharpNamer::new(false).reference_name(&graph, array), "short[,]");
    }
}
