//! Text buffers and the output directory.

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{emit::Unit, Result};

const INDENT: &str = "    ";

/// Indentation-aware text buffer
///
/// Indentation is applied at the start of every non-empty line.
#[derive(Debug, Default)]
pub struct CodeWriter {
    buffer: String,
    depth: usize,
    mid_line: bool,
}

impl CodeWriter {
    /// An empty buffer
    #[must_use]
    pub fn new() -> Self {
        CodeWriter::default()
    }

    /// Increase the indentation of the following lines
    pub fn indent(&mut self) {
        self.depth += 1;
    }

    /// Decrease the indentation of the following lines
    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Append `text`
    pub fn write(&mut self, text: &str) {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.buffer.push('\n');
                self.mid_line = false;
            }
            if line.is_empty() {
                continue;
            }
            if !self.mid_line {
                for _ in 0..self.depth {
                    self.buffer.push_str(INDENT);
                }
                self.mid_line = true;
            }
            self.buffer.push_str(line);
        }
    }

    /// Append `text` and end the line
    pub fn writeln(&mut self, text: &str) {
        self.write(text);
        self.newline();
    }

    /// End the current line
    pub fn newline(&mut self) {
        self.buffer.push('\n');
        self.mid_line = false;
    }

    /// Write `{`, run `body` one level deeper, write `}`
    ///
    /// # Errors
    /// Whatever `body` returns
    pub fn block<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.writeln("{");
        self.indent();
        let result = body(self);
        self.dedent();
        self.writeln("}");
        result
    }

    /// The text written so far
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consume the writer and return its text
    #[must_use]
    pub fn into_text(self) -> String {
        self.buffer
    }
}

impl fmt::Write for CodeWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s);
        Ok(())
    }
}

/// What happened to one unit on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created or its text replaced
    Written,
    /// The file already held the same text
    Unchanged,
}

/// Totals of a [`UnitWriter`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WriteSummary {
    /// Files created or replaced
    pub written: usize,
    /// Files left untouched because their text did not change
    pub unchanged: usize,
    /// Stale files deleted
    pub removed: usize,
}

/// Writes units below an output directory, skipping unchanged files
pub struct UnitWriter {
    root: PathBuf,
    stale: Option<HashMap<PathBuf, PathBuf>>,
    summary: WriteSummary,
}

impl UnitWriter {
    /// A writer into `root`
    ///
    /// With `delete_first` the directory is removed before anything is written. With
    /// `remove_stale` every file with `extension` already present and not rewritten by this
    /// run is deleted by [`UnitWriter::finish`].
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the directory cannot be deleted or listed
    pub fn new(root: &Path, delete_first: bool, remove_stale: bool, extension: &str) -> Result<Self> {
        if delete_first && root.is_dir() {
            debug!("Deleting {}", root.display());
            fs::remove_dir_all(root)?;
        }

        let stale = if remove_stale {
            let mut files = HashMap::new();
            if root.is_dir() {
                collect_files(root, extension, &mut files)?;
            }
            Some(files)
        } else {
            None
        };

        Ok(UnitWriter {
            root: root.to_path_buf(),
            stale,
            summary: WriteSummary::default(),
        })
    }

    /// Write `unit` unless the file already holds its text
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] on file system failures
    pub fn write(&mut self, unit: &Unit) -> Result<WriteOutcome> {
        let path = self.root.join(&unit.path);
        if let Some(stale) = &mut self.stale {
            stale.remove(&case_key(&path));
        }

        if fs::read_to_string(&path).is_ok_and(|existing| existing == unit.text) {
            debug!("Unchanged {}", path.display());
            self.summary.unchanged += 1;
            return Ok(WriteOutcome::Unchanged);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Writing {}", path.display());
        fs::write(&path, &unit.text)?;
        self.summary.written += 1;
        Ok(WriteOutcome::Written)
    }

    /// Delete stale files and empty directories, returning the totals
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] on file system failures
    pub fn finish(mut self) -> Result<WriteSummary> {
        if let Some(stale) = self.stale.take() {
            let mut stale: Vec<PathBuf> = stale.into_values().collect();
            stale.sort();
            for path in stale {
                debug!("Removing {}", path.display());
                fs::remove_file(&path)?;
                self.summary.removed += 1;
            }
            if self.root.is_dir() {
                remove_empty_directories(&self.root)?;
            }
        }

        Ok(self.summary)
    }
}

/// File names compare case-insensitively on the platforms the output targets
fn case_key(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

fn collect_files(
    directory: &Path,
    extension: &str,
    files: &mut HashMap<PathBuf, PathBuf>,
) -> Result<()> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, extension, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            files.insert(case_key(&path), path);
        }
    }
    Ok(())
}

fn remove_empty_directories(directory: &Path) -> Result<bool> {
    let mut empty = true;
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() && remove_empty_directories(&path)? {
            fs::remove_dir(&path)?;
        } else {
            empty = false;
        }
    }
    Ok(empty)
}
