//! Builder configuration.
//!
//! The configuration is a JSON document with PascalCase keys. Unknown keys are ignored so a
//! document written for a newer version still loads.
//!
//! ```json
//! {
//!   "WinMdPath": "Windows.Win32.winmd",
//!   "Architecture": "X64",
//!   "TypeInputs": [ "Windows.Win32.UI.Shell.IShellItem", { "Name": "Windows.Win32.Foundation.HWND" } ],
//!   "MemberInputs": [ "MessageBox*" ],
//!   "Generation": { "Unified": { "Namespace": "DirectN" } }
//! }
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Deserializer};
use strum::{Display, EnumString};

use crate::{emit::EmitterKind, Error, Result};

/// Patch document name used when the configuration does not name one
pub const DEFAULT_PATCHES_FILE_NAME: &str = "Patches.json";

/// Target CPU architecture; also the bit used by `SupportedArchitectureAttribute`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Architecture {
    /// 32-bit x86
    X86 = 1,
    /// x86-64
    X64 = 2,
    /// AArch64
    Arm64 = 4,
}

impl Architecture {
    /// The `SupportedArchitectureAttribute` flag of this architecture
    #[must_use]
    pub fn flag(self) -> u32 {
        self as u32
    }
}

/// What an untyped COM output pointer becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display)]
pub enum ComOutPtrTarget {
    /// `out nint`
    #[default]
    IntPtr,
    /// `[MarshalAs(UnmanagedType.Interface)] out object`
    Object,
    /// `[MarshalUsing(typeof(UniqueComInterfaceMarshaller<object>))] out object`
    UniqueObject,
}

/// How functions are flagged as reporting errors through the thread's last error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display)]
pub enum SetLastErrorMode {
    /// Guess from the return type when the import flag is not set
    #[default]
    Auto,
    /// Trust the import flag only
    Attributed,
}

/// A type or member pattern with its extension properties
///
/// Accepts either a plain string or an object with a `Name` key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternInput {
    /// The pattern text
    pub name: String,
    /// Free-form properties attached to the pattern
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl PatternInput {
    /// A pattern without properties
    pub fn new(name: impl Into<String>) -> Self {
        PatternInput {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }
}

impl<'de> Deserialize<'de> for PatternInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                #[serde(rename = "Name")]
                name: String,
                #[serde(flatten)]
                properties: BTreeMap<String, serde_json::Value>,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(name) => PatternInput::new(name),
            Raw::Object { name, properties } => PatternInput { name, properties },
        })
    }
}

/// Unified namespace settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UnifiedGeneration {
    /// Shared namespace; unified mode is active when this is non-empty
    pub namespace: Option<String>,
    /// Aggregate unit holding every function, empty to disable
    pub functions_file_name: Option<String>,
    /// Aggregate unit holding every constant, empty to disable
    pub constants_file_name: Option<String>,
}

impl Default for UnifiedGeneration {
    fn default() -> Self {
        UnifiedGeneration {
            namespace: None,
            functions_file_name: Some("Functions".to_string()),
            constants_file_name: Some("Constants".to_string()),
        }
    }
}

/// Unified settings with empty values normalized away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unified {
    /// Shared namespace
    pub namespace: String,
    /// Functions aggregate name
    pub functions_file_name: Option<String>,
    /// Constants aggregate name
    pub constants_file_name: Option<String>,
}

/// Generation policy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Generation {
    /// Target of `void**`/`object**` COM output pointers
    pub unknown_com_out_ptr_target: ComOutPtrTarget,
    /// Target of typed COM output pointers
    pub com_out_ptr_target: ComOutPtrTarget,
    /// Last-error detection mode
    pub set_last_error_mode: SetLastErrorMode,
    /// Emit `#nullable enable`
    pub add_nullable_enable: bool,
    /// Unified namespace settings
    pub unified: UnifiedGeneration,
}

impl Default for Generation {
    fn default() -> Self {
        Generation {
            unknown_com_out_ptr_target: ComOutPtrTarget::IntPtr,
            com_out_ptr_target: ComOutPtrTarget::UniqueObject,
            set_last_error_mode: SetLastErrorMode::Auto,
            add_nullable_enable: true,
            unified: UnifiedGeneration::default(),
        }
    }
}

/// The builder configuration document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BuilderConfiguration {
    /// Metadata image path, relative to the configuration file
    pub win_md_path: Option<PathBuf>,
    /// Output directory, relative to the configuration file
    pub output_directory_path: Option<PathBuf>,
    /// Patch document, relative to the configuration file
    pub patches_file_path: Option<PathBuf>,
    /// Write units to disk
    pub generate_files: bool,
    /// Delete the output directory before writing
    pub delete_output_directory: bool,
    /// Delete files in the output directory that this run did not produce
    pub remove_non_generated_files: bool,
    /// Type patterns
    pub type_inputs: Vec<PatternInput>,
    /// Member patterns
    pub member_inputs: Vec<PatternInput>,
    /// Generation policy
    pub generation: Generation,
    /// Architecture name, validated by [`BuilderConfiguration::architecture`]
    pub architecture: String,
    /// Emission strategy
    pub emitter: EmitterKind,
}

impl Default for BuilderConfiguration {
    fn default() -> Self {
        BuilderConfiguration {
            win_md_path: None,
            output_directory_path: None,
            patches_file_path: Some(PathBuf::from(DEFAULT_PATCHES_FILE_NAME)),
            generate_files: true,
            delete_output_directory: false,
            remove_non_generated_files: true,
            type_inputs: Vec::new(),
            member_inputs: Vec::new(),
            generation: Generation::default(),
            architecture: Architecture::X64.to_string(),
            emitter: EmitterKind::default(),
        }
    }
}

impl BuilderConfiguration {
    /// Parse a configuration document
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the document is not a valid configuration
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|error| Error::Configuration(error.to_string()))
    }

    /// Load the configuration at `path`
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|error| {
            Error::Configuration(format!("{}: {}", path.display(), error))
        })?;
        serde_json::from_str(&text)
            .map_err(|error| Error::Configuration(format!("{}: {}", path.display(), error)))
    }

    /// The validated target architecture
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedArchitecture`] for anything but `X86`, `X64` and `Arm64`
    pub fn architecture(&self) -> Result<Architecture> {
        self.architecture
            .parse()
            .map_err(|_| Error::UnsupportedArchitecture(self.architecture.clone()))
    }

    /// Unified settings if unified mode is active
    #[must_use]
    pub fn unified(&self) -> Option<Unified> {
        let unified = &self.generation.unified;
        let namespace = non_empty(&unified.namespace)?;
        Some(Unified {
            namespace,
            functions_file_name: non_empty(&unified.functions_file_name),
            constants_file_name: non_empty(&unified.constants_file_name),
        })
    }

    /// The patch document path, resolved against the configuration directory
    #[must_use]
    pub fn patches_path(&self, base: &Path) -> Option<PathBuf> {
        self.patches_file_path
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| base.join(path))
    }

    /// The output directory, by default a directory named after the configuration file
    #[must_use]
    pub fn output_path(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        match &self.output_directory_path {
            Some(path) => base.join(path),
            None => base.join(config_path.file_stem().unwrap_or_default()),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
