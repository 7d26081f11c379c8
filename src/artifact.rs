//! Filesystem store that agents exchange work through.
//!
//! Every agent reads context from, and writes results into, subdirectories
//! of one base directory. A zero-byte `.done` file in a subdirectory is the
//! completion sentinel the reaper polls for.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Default base directory, relative to the working directory of the run.
pub const BASE_DIR: &str = "artifacts";

/// Sentinel filename touched by an agent when its output is complete.
pub const SENTINEL: &str = ".done";

/// The fixed set of subdirectories a run uses.
pub const LAYOUT: &[&str] = &[
    "contracts",
    "code/backend",
    "code/frontend",
    "schemas",
    "reviews",
    "shared-context",
];

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base: PathBuf,
}

impl ArtifactStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create the base directory and every subdirectory in the layout.
    pub fn ensure_layout(&self) -> Result<()> {
        for subdir in LAYOUT {
            fs::create_dir_all(self.base.join(subdir))?;
        }
        Ok(())
    }

    pub fn write(&self, subdir: &str, filename: &str, content: &str) -> Result<()> {
        let dir = self.base.join(subdir);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(filename), content)?;
        Ok(())
    }

    pub fn read(&self, subdir: &str, filename: &str) -> Result<String> {
        Ok(fs::read_to_string(self.base.join(subdir).join(filename))?)
    }

    /// Read every regular file in a subdirectory, keyed by filename.
    pub fn read_all(&self, subdir: &str) -> Result<BTreeMap<String, String>> {
        let dir = self.base.join(subdir);
        let mut result = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            result.insert(name, fs::read_to_string(entry.path())?);
        }
        Ok(result)
    }

    /// Concatenate every file in a subdirectory under `=== name ===` headers,
    /// in filename order.
    pub fn read_dir(&self, subdir: &str) -> Result<String> {
        let files = self.read_all(subdir)?;
        let mut out = String::new();
        for (name, content) in &files {
            let _ = writeln!(out, "=== {} ===\n{}\n", name, content);
        }
        Ok(out)
    }

    pub fn sentinel_path(&self, subdir: &str) -> PathBuf {
        self.base.join(subdir).join(SENTINEL)
    }

    /// True if the subdirectory's completion sentinel exists. Any file
    /// counts, including zero-size.
    pub fn sentinel_exists(&self, subdir: &str) -> bool {
        self.sentinel_path(subdir).exists()
    }

    /// Remove a stale sentinel. Missing files are fine.
    pub fn clear_sentinel(&self, subdir: &str) -> Result<()> {
        match fs::remove_file(self.sentinel_path(subdir)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(BASE_DIR)
    }
}
