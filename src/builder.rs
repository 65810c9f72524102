//! Pipeline orchestration.
//!
//! A [`Builder`] runs one configuration end to end: the patch document is loaded first so a
//! malformed one fails before any work is done, then the metadata image is decoded, the
//! patterns are evaluated, the selection is closed over its dependencies, patches are
//! applied, output identities are settled and every planned node is emitted. Units are
//! written below the output directory unless the configuration disables file generation.
//!
//! # Example
//!
//! ```rust,no_run
//! use dotinterop::builder::Builder;
//! use std::path::Path;
//!
//! let result = Builder::from_file(Path::new("win32.json"))?
//!     .with_win_md("Windows.Win32.winmd")
//!     .build()?;
//! println!("{} units", result.units.len());
//! # Ok::<(), dotinterop::Error>(())
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    config::BuilderConfiguration,
    emit::{EmitContext, Unit, UnitWriter, WriteSummary},
    metadata::catalog::MetadataCatalog,
    naming::NameArbiter,
    patch::{PatchDocument, PatchEngine},
    resolver::DependencyResolver,
    selection::{Selection, SelectionEngine},
    Error, Result,
};

/// What a [`Builder`] run produced
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Every emitted unit, sorted by qualified name of its node
    pub units: Vec<Unit>,
    /// File totals, `None` when files were not generated
    pub summary: Option<WriteSummary>,
    /// Directory the units are relative to
    pub output_directory: PathBuf,
    /// Patterns that matched nothing
    pub unmatched: Vec<String>,
    /// Number of patched members
    pub patched: usize,
    /// Patches that designated nothing
    pub missing_patches: Vec<String>,
}

/// Runs the generation pipeline for one configuration
#[derive(Debug, Clone)]
pub struct Builder {
    config: BuilderConfiguration,
    config_path: PathBuf,
    win_md: Option<PathBuf>,
    output_directory: Option<PathBuf>,
}

impl Builder {
    /// A builder for `config`; relative paths resolve against the directory of `config_path`
    #[must_use]
    pub fn new(config: BuilderConfiguration, config_path: impl Into<PathBuf>) -> Self {
        Builder {
            config,
            config_path: config_path.into(),
            win_md: None,
            output_directory: None,
        }
    }

    /// A builder for the configuration file at `path`
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = BuilderConfiguration::from_file(path)?;
        Ok(Builder::new(config, path))
    }

    /// Read metadata from `path` instead of the configured image
    #[must_use]
    pub fn with_win_md(mut self, path: impl Into<PathBuf>) -> Self {
        self.win_md = Some(path.into());
        self
    }

    /// Write units below `path` instead of the configured directory
    #[must_use]
    pub fn with_output_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(path.into());
        self
    }

    /// The configuration being run
    #[must_use]
    pub fn config(&self) -> &BuilderConfiguration {
        &self.config
    }

    fn base_directory(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// The metadata image path
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if neither an override nor `WinMdPath` is set
    pub fn win_md_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.win_md {
            return Ok(path.clone());
        }

        match &self.config.win_md_path {
            Some(path) if !path.as_os_str().is_empty() => Ok(self.base_directory().join(path)),
            _ => Err(Error::Configuration("WinMdPath is not set".to_string())),
        }
    }

    /// The directory units are written below
    #[must_use]
    pub fn output_directory(&self) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| self.config.output_path(&self.config_path))
    }

    /// The patch document, empty when the configured file does not exist
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the file exists but is malformed
    pub fn patches(&self) -> Result<PatchDocument> {
        let Some(path) = self.config.patches_path(self.base_directory()) else {
            return Ok(PatchDocument::default());
        };

        if !path.is_file() {
            debug!("No patch document at {}", path.display());
            return Ok(PatchDocument::default());
        }

        info!("Loading patches from {}", path.display());
        PatchDocument::from_file(&path)
    }

    /// Decode the metadata image
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if no image is configured, or the decoding error
    pub fn load_catalog(&self) -> Result<MetadataCatalog> {
        let path = self.win_md_path()?;
        info!("Reading metadata from {}", path.display());
        MetadataCatalog::from_file(&path)
    }

    /// Evaluate the configured patterns against `catalog`
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedArchitecture`] if the configured architecture is unknown
    pub fn select(&self, catalog: &MetadataCatalog) -> Result<Selection> {
        Ok(SelectionEngine::from_config(&self.config)?.select(catalog))
    }

    /// Run every stage up to emission over `catalog`, without touching the file system
    ///
    /// # Errors
    /// Returns configuration errors before resolution starts, resolution errors and emitter
    /// failures other than nodes the target language cannot express, which are skipped with
    /// a warning.
    pub fn generate(&self, catalog: &MetadataCatalog) -> Result<BuildResult> {
        let patches = self.patches()?;
        let engine = SelectionEngine::from_config(&self.config)?;
        let selection = engine.select(catalog);

        let resolution = DependencyResolver::resolve(catalog, &selection, engine.architecture())?;
        let types = resolution.types();
        let mut graph = resolution.graph;
        let patches = PatchEngine::new(&patches).apply(&mut graph, &types);

        let emitter = self.config.emitter.create();
        let arbiter = NameArbiter::new(self.config.unified(), emitter.extension());
        let mut plan = arbiter.plan(&mut graph, &types);
        arbiter.build_aggregates(&mut graph, &mut plan, &resolution.constants);

        let context = EmitContext {
            graph: &graph,
            generation: &self.config.generation,
            arbiter: &arbiter,
        };
        let mut units = Vec::with_capacity(plan.types.len());
        for &id in &plan.types {
            match emitter.emit(&context, id) {
                Ok(unit) => units.push(unit),
                Err(Error::NotSupported(reason)) => {
                    warn!("Skipping {}: {}", graph[id].name, reason);
                }
                Err(error) => return Err(error),
            }
        }
        info!("Emitted {} units", units.len());

        Ok(BuildResult {
            units,
            summary: None,
            output_directory: self.output_directory(),
            unmatched: selection.unmatched,
            patched: patches.patched,
            missing_patches: patches.missing,
        })
    }

    /// Write `units` below the output directory as configured
    ///
    /// # Errors
    /// Returns [`Error::FileError`] on file system failures
    pub fn write(&self, units: &[Unit]) -> Result<WriteSummary> {
        let directory = self.output_directory();
        let mut writer = UnitWriter::new(
            &directory,
            self.config.delete_output_directory,
            self.config.remove_non_generated_files,
            self.config.emitter.extension(),
        )?;
        for unit in units {
            writer.write(unit)?;
        }

        let summary = writer.finish()?;
        info!(
            "{}: {} written, {} unchanged, {} removed",
            directory.display(),
            summary.written,
            summary.unchanged,
            summary.removed
        );
        Ok(summary)
    }

    /// Load the image, generate and write the units
    ///
    /// # Errors
    /// See [`Builder::load_catalog`], [`Builder::generate`] and [`Builder::write`]
    pub fn build(&self) -> Result<BuildResult> {
        // configuration errors come before any decoding
        self.patches()?;
        self.config.architecture()?;

        let catalog = self.load_catalog()?;
        let mut result = self.generate(&catalog)?;
        if self.config.generate_files {
            result.summary = Some(self.write(&result.units)?);
        }
        Ok(result)
    }
}
