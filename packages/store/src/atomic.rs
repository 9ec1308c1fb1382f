//! Write-to-temporary-then-rename helpers.
//!
//! [`stage`] writes a file next to its destination without touching it;
//! [`Staging`] collects several staged files and renames them only after
//! every one was written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::StoreError;
use crate::paths::ensure_dir;

fn temporary_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

/// A file written to its temporary sibling and not yet moved into place.
///
/// Dropping it without [`StagedFile::commit`] removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: Option<PathBuf>,
    path: PathBuf,
}

impl StagedFile {
    /// Destination the file is renamed to on commit.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the temporary file over the destination.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the rename fails; the temporary file is
    /// removed and the destination is left as it was.
    pub fn commit(mut self) -> Result<(), StoreError> {
        let Some(tmp_path) = self.tmp_path.take() else {
            return Ok(());
        };
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            std::fs::remove_file(&tmp_path).ok();
            StoreError::io(&self.path, e)
        })
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(tmp_path) = self.tmp_path.take() {
            std::fs::remove_file(tmp_path).ok();
        }
    }
}

/// Writes the contents of `path` through `write` into a temporary sibling.
///
/// The parent directory is created if needed. Nothing at `path` changes
/// until the returned file is committed.
///
/// # Errors
///
/// Returns the error from `write`, or an I/O error if the temporary file
/// cannot be created or flushed. The temporary file is removed on error.
pub fn stage<F>(path: &Path, write: F) -> Result<StagedFile, StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StoreError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = temporary_sibling(path);
    let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
    let staged = StagedFile {
        tmp_path: Some(tmp_path),
        path: path.to_path_buf(),
    };

    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    drop(writer);

    Ok(staged)
}

/// Writes `path` through `write`, atomically replacing any existing file.
///
/// If `write` fails the temporary file is removed and `path` is left as it
/// was.
///
/// # Errors
///
/// Returns the error from `write`, or an I/O error if the temporary file
/// cannot be created, flushed, or renamed.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), StoreError>,
{
    stage(path, write)?.commit()
}

/// Stages a copy of `from` at `to`.
///
/// # Errors
///
/// Returns an I/O error if `from` cannot be read or the copy cannot be
/// written.
pub fn stage_copy(from: &Path, to: &Path) -> Result<StagedFile, StoreError> {
    stage(to, |writer| {
        let mut source = File::open(from).map_err(|e| StoreError::io(from, e))?;
        std::io::copy(&mut source, writer).map_err(|e| StoreError::io(to, e))?;
        Ok(())
    })
}

/// A set of staged files committed together.
///
/// Files are renamed in the order they were added. Dropping the set before
/// [`Staging::commit`] discards every temporary file.
#[derive(Debug, Default)]
pub struct Staging {
    files: Vec<StagedFile>,
}

impl Staging {
    pub fn push(&mut self, file: StagedFile) {
        self.files.push(file);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Renames every staged file into place.
    ///
    /// # Errors
    ///
    /// Returns the first rename error. Files after the failing one are
    /// discarded.
    pub fn commit(self) -> Result<(), StoreError> {
        for file in self.files {
            file.commit()?;
        }
        Ok(())
    }
}
