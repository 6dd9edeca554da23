use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

const DEFAULT_ARCHIVE: &str = "processed_files.zip";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("download directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the download directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Local file name for a result archive URL.
///
/// `/dl/abc.zip` keeps its name; `/download/abc` becomes
/// `processed_files_abc.zip`. Anything outside `[A-Za-z0-9._-]` is replaced.
pub fn archive_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    let safe: String = last
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('.');
    if safe.is_empty() {
        DEFAULT_ARCHIVE.to_string()
    } else if safe.to_ascii_lowercase().ends_with(".zip") {
        safe.to_string()
    } else {
        format!("processed_files_{safe}.zip")
    }
}

/// Stages `{dir}/{filename}` in a temp file in the same directory; the final
/// name only appears on [`StagedFile::commit`], so a partial archive never does.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn begin(&self, filename: &str) -> Result<StagedFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        Ok(StagedFile {
            tmp: NamedTempFile::new_in(&self.dir)?,
            target: self.dir.join(filename),
        })
    }
}

/// Dropping it without committing removes the temp file.
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    /// Second handle on the temp file, for writers that need ownership.
    pub fn handle(&self) -> Result<File, PersistError> {
        Ok(self.tmp.as_file().try_clone()?)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn commit(self) -> Result<PathBuf, PersistError> {
        self.tmp.as_file().sync_all()?;
        if self.target.exists() {
            fs::remove_file(&self.target)?;
        }
        let target = self.target;
        self.tmp
            .persist(&target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
