// crates/proofpack-store-fs/src/store.rs
// ============================================================================
// Module: Filesystem Artifact Store
// Description: Directory-backed implementation of the artifact store.
// Purpose: Read and write proof-pack files without escaping the store root.
// Dependencies: proofpack-core
// ============================================================================

//! ## Overview
//! Every store path is validated with the same rules the proof-pack writer
//! applies to artifact names, then resolved one directory at a time against
//! the canonical root. Symlinks are followed only when their target stays
//! under the root; anything else is rejected as an invalid path before a
//! byte is read or written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use proofpack_core::ArtifactError;
use proofpack_core::ArtifactStore;
use proofpack_core::canonical_path;
use proofpack_core::validate_relative_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length, root included.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: File Artifact Store
// ============================================================================

/// Artifact store rooted at a directory.
///
/// # Invariants
/// - `root` is canonical and exists.
/// - Every resolved path starts with `root`.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    /// Canonical root directory.
    root: PathBuf,
}

impl FileArtifactStore {
    /// Opens a store rooted at an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::InvalidPath`] when the root exceeds length
    /// limits, [`ArtifactError::NotFound`] when it does not exist, or
    /// [`ArtifactError::Io`] when it is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        validate_length(&root)?;
        let canonical = root.canonicalize().map_err(|err| {
            let display = root.display().to_string();
            if err.kind() == ErrorKind::NotFound {
                ArtifactError::NotFound(display)
            } else {
                ArtifactError::Io(format!("{display}: {err}"))
            }
        })?;
        if !canonical.is_dir() {
            return Err(ArtifactError::Io(format!(
                "store root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: canonical,
        })
    }

    /// Creates the root directory when needed, then opens the store.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the directory cannot be created or
    /// opened.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        validate_length(&root)?;
        fs::create_dir_all(&root)
            .map_err(|err| ArtifactError::Io(format!("{}: {err}", root.display())))?;
        Self::open(root)
    }

    /// Returns the canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a store path to a file location under the root.
    ///
    /// Returns `None` when a parent directory is missing and `create` is
    /// false.
    fn resolve(&self, relative: &str, create: bool) -> Result<Option<PathBuf>, ArtifactError> {
        validate_relative_path(relative)
            .map_err(|err| ArtifactError::InvalidPath(err.to_string()))?;
        let canonical = canonical_path(relative);
        let segments: Vec<&str> = canonical.split('/').collect();
        let Some((file_name, parents)) = segments.split_last() else {
            return Err(ArtifactError::InvalidPath(format!("{relative}: path is empty")));
        };
        validate_length(&self.root.join(canonical.as_str()))?;

        let mut dir = self.root.clone();
        for segment in parents {
            let next = dir.join(segment);
            match fs::symlink_metadata(&next) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    dir = self.contained(&next, relative)?;
                    if !dir.is_dir() {
                        return Err(not_a_directory(relative));
                    }
                }
                Ok(meta) if meta.is_dir() => dir = next,
                Ok(_) => return Err(not_a_directory(relative)),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    if !create {
                        return Ok(None);
                    }
                    match fs::create_dir(&next) {
                        Ok(()) => {}
                        Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                        Err(err) => return Err(io_error(relative, &err)),
                    }
                    dir = next;
                }
                Err(err) => return Err(io_error(relative, &err)),
            }
        }

        let file = dir.join(file_name);
        match fs::symlink_metadata(&file) {
            Ok(meta) if meta.file_type().is_symlink() => self.contained(&file, relative).map(Some),
            _ => Ok(Some(file)),
        }
    }

    /// Follows a symlink and requires its target to stay under the root.
    fn contained(&self, link: &Path, relative: &str) -> Result<PathBuf, ArtifactError> {
        let target = link.canonicalize().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ArtifactError::NotFound(relative.to_string())
            } else {
                io_error(relative, &err)
            }
        })?;
        if !target.starts_with(&self.root) {
            return Err(ArtifactError::InvalidPath(format!("{relative}: escapes store root")));
        }
        Ok(target)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError> {
        let resolved =
            self.resolve(path, false)?.ok_or_else(|| ArtifactError::NotFound(path.to_string()))?;
        let file = File::open(&resolved).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ArtifactError::NotFound(path.to_string())
            } else {
                io_error(path, &err)
            }
        })?;
        let meta = file.metadata().map_err(|err| io_error(path, &err))?;
        if !meta.is_file() {
            return Err(ArtifactError::Io(format!("{path}: not a regular file")));
        }
        let too_large = |actual_bytes| ArtifactError::TooLarge {
            path: path.to_string(),
            max_bytes,
            actual_bytes,
        };
        let declared = usize::try_from(meta.len()).unwrap_or(usize::MAX);
        if declared > max_bytes {
            return Err(too_large(declared));
        }
        let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::with_capacity(declared);
        file.take(limit).read_to_end(&mut bytes).map_err(|err| io_error(path, &err))?;
        if bytes.len() > max_bytes {
            return Err(too_large(bytes.len()));
        }
        Ok(bytes)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let resolved = self
            .resolve(path, true)?
            .ok_or_else(|| ArtifactError::Io(format!("{path}: unable to create parent")))?;
        fs::write(&resolved, bytes).map_err(|err| io_error(path, &err))
    }

    fn exists(&self, path: &str) -> Result<bool, ArtifactError> {
        let resolved = match self.resolve(path, false) {
            Ok(Some(resolved)) => resolved,
            Ok(None) | Err(ArtifactError::NotFound(_)) => return Ok(false),
            Err(err) => return Err(err),
        };
        match fs::metadata(&resolved) {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_error(path, &err)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects paths that exceed the total or per-component length limits.
fn validate_length(path: &Path) -> Result<(), ArtifactError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ArtifactError::InvalidPath(format!(
            "{}: path exceeds max length",
            path.display()
        )));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ArtifactError::InvalidPath(format!(
            "{}: path component too long",
            path.display()
        )));
    }
    Ok(())
}

/// Wraps an I/O failure with the store path it concerns.
fn io_error(path: &str, err: &io::Error) -> ArtifactError {
    ArtifactError::Io(format!("{path}: {err}"))
}

/// Error for a path whose parent segment is not a directory.
fn not_a_directory(path: &str) -> ArtifactError {
    ArtifactError::Io(format!("{path}: parent is not a directory"))
}
