//! Local File Store
//!
//! A single directory that requests read from and write to by name.
//!
//! ## Responsibilities
//! - Resolve plain file names inside the store directory
//! - Read files as text lines
//! - Overwrite files with reassembled content
//! - Delete files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, TransferError};

/// Directory-scoped file access
///
/// Names are single path components: separators, `.` and `..` are rejected
/// so every operation stays inside `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if it doesn't exist
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory backing this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file name to its path inside the store
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
        if invalid {
            return Err(TransferError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Read a file as lines, without terminators
    pub fn read_lines(&self, name: &str) -> Result<Vec<String>> {
        let path = self.resolve(name)?;
        let text = fs::read_to_string(&path).map_err(|e| not_found_or(e, name))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    /// Read a whole file
    pub fn read(&self, name: &str) -> Result<String> {
        let path = self.resolve(name)?;
        fs::read_to_string(&path).map_err(|e| not_found_or(e, name))
    }

    /// Create or overwrite a file
    pub fn write(&self, name: &str, content: &str) -> Result<()> {
        let path = self.resolve(name)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Delete a file
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        fs::remove_file(&path).map_err(|e| not_found_or(e, name))
    }

    /// Check whether a file exists
    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }
}

fn not_found_or(err: io::Error, name: &str) -> TransferError {
    if err.kind() == io::ErrorKind::NotFound {
        TransferError::NotFound(name.to_string())
    } else {
        TransferError::Io(err)
    }
}
