//! Turns command-line paths into intake candidates, the way a browser file
//! picker would: name, size and a MIME type guessed from the extension.

use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::engine_warn;
use ocrdrop_core::PendingFile;

const UNKNOWN_MIME: &str = "application/octet-stream";

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<PendingFile>,
    /// Paths that could not be inspected, for the warning banner.
    pub unreadable: Vec<String>,
}

pub fn scan_paths(paths: &[PathBuf]) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for path in paths {
        match inspect(path) {
            Some(file) => outcome.files.push(file),
            None => outcome.unreadable.push(path.display().to_string()),
        }
    }
    outcome
}

fn inspect(path: &Path) -> Option<PendingFile> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            engine_warn!("Cannot read {}: {}", path.display(), err);
            return None;
        }
    };
    if !meta.is_file() {
        engine_warn!("{} is not a regular file", path.display());
        return None;
    }
    let name = path.file_name()?.to_string_lossy().into_owned();
    let mime = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(UNKNOWN_MIME);
    Some(PendingFile::new(name, meta.len(), mime, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pdfs_and_others_get_guessed_types() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Report.PDF");
        let txt = dir.path().join("notes.txt");
        fs::write(&pdf, vec![0_u8; 2048]).unwrap();
        fs::write(&txt, "hello").unwrap();

        let outcome = scan_paths(&[pdf.clone(), txt]);
        assert!(outcome.unreadable.is_empty());
        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.files[0].name, "Report.PDF");
        assert_eq!(outcome.files[0].size_bytes, 2048);
        assert!(outcome.files[0].is_pdf());
        assert_eq!(outcome.files[0].source, pdf);
        assert!(!outcome.files[1].is_pdf());
    }

    #[test]
    fn missing_paths_and_directories_are_unreadable() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.pdf");
        let outcome = scan_paths(&[missing.clone(), dir.path().to_path_buf()]);
        assert!(outcome.files.is_empty());
        assert_eq!(
            outcome.unreadable,
            vec![
                missing.display().to_string(),
                dir.path().display().to_string()
            ]
        );
    }

    #[test]
    fn extensionless_files_are_not_pdfs() {
        let dir = TempDir::new().unwrap();
        let blob = dir.path().join("scan");
        fs::write(&blob, "%PDF-1.7").unwrap();
        let outcome = scan_paths(&[blob]);
        assert_eq!(outcome.files[0].mime_type, UNKNOWN_MIME);
    }
}
