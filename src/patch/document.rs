//! The patch document.
//!
//! ```json
//! {
//!   "Types": [
//!     {
//!       "TypeName": "IShellItem",
//!       "Methods": [
//!         { "Name": "BindToHandler", "Parameters": [ { "Name": "ppv", "Def": { "Direction": "Out" } } ] }
//!       ]
//!     }
//!   ],
//!   "Methods": [ { "Name": "GetLastError", "SetLastError": false } ]
//! }
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    marshal::ParameterDef,
    selection::Pattern,
    typegraph::{Parameter, QualifiedName},
    Error, Result,
};

/// Root of a patch document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PatchDocument {
    /// Patches scoped to the types their pattern matches
    pub types: Vec<TypePatch>,
    /// Method patches tried on every type before the type-scoped ones
    pub methods: Vec<MethodPatch>,
}

impl PatchDocument {
    /// Parse a patch document
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the document is malformed
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|error| Error::Configuration(error.to_string()))
    }

    /// Load the patch document at `path`
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|error| Error::Configuration(format!("{}: {}", path.display(), error)))?;
        serde_json::from_str(&text)
            .map_err(|error| Error::Configuration(format!("{}: {}", path.display(), error)))
    }

    /// The first type patch matching `name`
    #[must_use]
    pub fn type_patch(&self, name: &QualifiedName) -> Option<&TypePatch> {
        self.types.iter().find(|patch| patch.matches(name))
    }

    /// True if the document patches nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.methods.is_empty()
    }
}

fn pattern(name: Option<&str>) -> Option<Pattern> {
    let pattern = Pattern::parse(name?);
    if pattern.is_reverse() || (pattern.text().is_empty() && !pattern.is_wildcard()) {
        return None;
    }
    Some(pattern)
}

/// Overrides for the members of matching types
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TypePatch {
    /// Type pattern
    pub type_name: Option<String>,
    /// Method patches
    pub methods: Vec<MethodPatch>,
    /// Field patches
    pub fields: Vec<FieldPatch>,
}

impl TypePatch {
    /// True if the pattern matches `name`; reverse patterns never match
    #[must_use]
    pub fn matches(&self, name: &QualifiedName) -> bool {
        pattern(self.type_name.as_deref()).is_some_and(|pattern| pattern.matches_type(name))
    }

    /// The first method patch matching `name`
    #[must_use]
    pub fn method_patch(&self, name: &str) -> Option<&MethodPatch> {
        self.methods.iter().find(|patch| patch.matches(name))
    }

    /// The first field patch matching `name`
    #[must_use]
    pub fn field_patch(&self, name: &str) -> Option<&FieldPatch> {
        self.fields.iter().find(|patch| patch.matches(name))
    }
}

/// Overrides for a method
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MethodPatch {
    /// Method pattern
    pub name: Option<String>,
    /// Return type text
    pub type_name: Option<String>,
    /// Emitted name
    pub new_name: Option<String>,
    /// Forced last-error capture
    pub set_last_error: Option<bool>,
    /// Parameter overrides
    pub parameters: Vec<ParameterPatch>,
}

impl MethodPatch {
    /// True if the pattern matches the method `name`
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        pattern(self.name.as_deref()).is_some_and(|pattern| pattern.matches_member(name))
    }

    /// The first parameter patch matching `parameter` at `index`
    #[must_use]
    pub fn parameter_patch(&self, parameter: &Parameter, index: usize) -> Option<&ParameterPatch> {
        self.parameters
            .iter()
            .find(|patch| patch.matches(parameter, index))
    }
}

/// Override for one parameter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ParameterPatch {
    /// Parameter name, `prefix*` or zero-based index
    pub name: Option<String>,
    /// Representation merged over the computed one
    pub def: Option<ParameterDef>,
}

impl ParameterPatch {
    /// True if the patch designates `parameter`, the `index`-th parameter of its method
    #[must_use]
    pub fn matches(&self, parameter: &Parameter, index: usize) -> bool {
        let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) else {
            return false;
        };

        if parameter.name.eq_ignore_ascii_case(name) {
            return true;
        }

        if let Some(prefix) = name.strip_suffix('*') {
            let matched = parameter
                .name
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if matched {
                return true;
            }
        }

        name.parse::<usize>().is_ok_and(|position| position == index)
    }
}

/// Overrides for a field or constant
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FieldPatch {
    /// Field pattern
    pub name: Option<String>,
    /// Type text
    pub type_name: Option<String>,
    /// Emitted name
    pub new_name: Option<String>,
    /// Value text, emitted verbatim
    pub value: Option<String>,
}

impl FieldPatch {
    /// True if the pattern matches the field `name`
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        pattern(self.name.as_deref()).is_some_and(|pattern| pattern.matches_member(name))
    }
}
