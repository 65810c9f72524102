//! Qualified type names.
//!
//! A [`QualifiedName`] is the identity of a node in the [`crate::typegraph::TypeGraph`]. Nested
//! types keep the namespace of their outermost declaring type and join their names with `+`
//! (`POINT+_Anonymous_e__Union`). Pointer types are the base name followed by one `*` per level
//! of indirection.

use std::{cmp::Ordering, fmt};

use crate::metadata::catalog::TypeName;

/// Separator between declaring and nested type names
pub const NESTED_SEPARATOR: char = '+';

/// Suffix marking one level of pointer indirection
pub const POINTER_MARKER: char = '*';

/// Namespace + name identity of a type node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    namespace: String,
    name: String,
}

impl QualifiedName {
    /// Create a name from its parts
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        QualifiedName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split a dotted full name at the last `.` that precedes any nested separator
    ///
    /// ```rust
    /// use dotinterop::typegraph::QualifiedName;
    ///
    /// let name = QualifiedName::parse("Windows.Win32.Foundation.POINT+_Anonymous_e__Union");
    /// assert_eq!(name.namespace(), "Windows.Win32.Foundation");
    /// assert_eq!(name.name(), "POINT+_Anonymous_e__Union");
    /// ```
    #[must_use]
    pub fn parse(full_name: &str) -> Self {
        let head = full_name
            .find(NESTED_SEPARATOR)
            .map_or(full_name, |pos| &full_name[..pos]);

        match head.rfind('.') {
            Some(pos) => QualifiedName::new(&full_name[..pos], &full_name[pos + 1..]),
            None => QualifiedName::new("", full_name),
        }
    }

    /// The namespace, empty for global types
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The simple name, including nested segments and pointer markers
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Namespace.Name`
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Number of trailing pointer markers
    #[must_use]
    pub fn indirections(&self) -> usize {
        self.name.chars().filter(|c| *c == POINTER_MARKER).count()
    }

    /// True if this names a pointer type
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        self.name.ends_with(POINTER_MARKER)
    }

    /// The pointer-stripped identity
    #[must_use]
    pub fn without_pointer(&self) -> QualifiedName {
        QualifiedName::new(
            self.namespace.clone(),
            self.name.trim_end_matches(POINTER_MARKER),
        )
    }

    /// The pointer-stripped identity with exactly `indirections` markers
    #[must_use]
    pub fn with_indirections(&self, indirections: usize) -> QualifiedName {
        let mut name = self.name.trim_end_matches(POINTER_MARKER).to_string();
        name.extend(std::iter::repeat(POINTER_MARKER).take(indirections));
        QualifiedName::new(self.namespace.clone(), name)
    }

    /// True for `Outer+Inner` names
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.name.contains(NESTED_SEPARATOR)
    }

    /// Innermost segment of a nested name, the whole name otherwise
    #[must_use]
    pub fn nested_name(&self) -> &str {
        self.name
            .rsplit(NESTED_SEPARATOR)
            .next()
            .unwrap_or(&self.name)
    }

    /// The declaring type of a nested name
    #[must_use]
    pub fn declaring(&self) -> Option<QualifiedName> {
        let (outer, _) = self.name.rsplit_once(NESTED_SEPARATOR)?;
        Some(QualifiedName::new(self.namespace.clone(), outer))
    }

    /// Namespace segments in order
    pub fn namespace_segments(&self) -> impl Iterator<Item = &str> {
        self.namespace.split('.').filter(|s| !s.is_empty())
    }
}

impl From<&TypeName> for QualifiedName {
    fn from(value: &TypeName) -> Self {
        QualifiedName::new(value.namespace.clone(), value.name.clone())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let name = QualifiedName::parse("Windows.Win32.Foundation.HWND");
        assert_eq!(name.namespace(), "Windows.Win32.Foundation");
        assert_eq!(name.name(), "HWND");

        let name = QualifiedName::parse("Global");
        assert_eq!(name.namespace(), "");
        assert_eq!(name.full_name(), "Global");

        let name = QualifiedName::parse("A.B.Outer+Inner.Part");
        assert_eq!(name.namespace(), "A.B");
        assert_eq!(name.name(), "Outer+Inner.Part");
    }

    #[test]
    fn pointers() {
        let name = QualifiedName::new("System", "Void**");
        assert!(name.is_pointer());
        assert_eq!(name.indirections(), 2);
        assert_eq!(name.without_pointer(), QualifiedName::new("System", "Void"));
        assert_eq!(
            name.with_indirections(1),
            QualifiedName::new("System", "Void*")
        );
        assert_eq!(name.without_pointer().indirections(), 0);
    }

    #[test]
    fn nested() {
        let name = QualifiedName::new("Windows.Win32", "POINT+_Anonymous_e__Union");
        assert!(name.is_nested());
        assert_eq!(name.nested_name(), "_Anonymous_e__Union");
        assert_eq!(
            name.declaring(),
            Some(QualifiedName::new("Windows.Win32", "POINT"))
        );

        let plain = QualifiedName::new("Windows.Win32", "POINT");
        assert!(!plain.is_nested());
        assert_eq!(plain.nested_name(), "POINT");
        assert!(plain.declaring().is_none());
    }

    #[test]
    fn ordering_and_display() {
        let mut names = vec![
            QualifiedName::new("B", "A"),
            QualifiedName::new("A", "Z"),
            QualifiedName::new("A", "B"),
        ];
        names.sort();
        let full: Vec<_> = names.iter().map(ToString::to_string).collect();
        assert_eq!(full, ["A.B", "A.Z", "B.A"]);
        assert_eq!(
            QualifiedName::new("A.B.C", "D")
                .namespace_segments()
                .collect::<Vec<_>>(),
            ["A", "B", "C"]
        );
    }
}
