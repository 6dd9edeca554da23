use std::path::PathBuf;

use thiserror::Error;

/// Aggregate upload limit: 1.5 GiB.
pub const SIZE_CAP_BYTES: u64 = 1_610_612_736;

pub const PDF_MIME: &str = "application/pdf";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// A file the user has selected but not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    /// Where the bytes live on disk; read only when the job is submitted.
    pub source: PathBuf,
}

impl PendingFile {
    pub fn new(
        name: impl Into<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            source: source.into(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntakeReport {
    pub added: usize,
    pub skipped_non_pdf: usize,
    pub skipped_over_cap: usize,
    /// Size the list would have had if every PDF candidate had been accepted.
    pub attempted_total_bytes: u64,
}

impl IntakeReport {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.skipped_non_pdf > 0 {
            warnings.push("Some files were skipped because they are not PDFs.".to_string());
        }
        if self.skipped_over_cap > 0 {
            warnings.push(format!(
                "Total file size exceeds the 1.5GB limit. Current total: {:.2}GB",
                self.attempted_total_bytes as f64 / GIB
            ));
        }
        warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("no file at index {index} (list has {len} files)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Ordered list of pending files with an aggregate size cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIntake {
    files: Vec<PendingFile>,
    cap_bytes: u64,
}

impl Default for FileIntake {
    fn default() -> Self {
        Self::with_cap(SIZE_CAP_BYTES)
    }
}

impl FileIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(cap_bytes: u64) -> Self {
        Self {
            files: Vec::new(),
            cap_bytes,
        }
    }

    /// Adds PDF candidates in order until the next one would break the cap.
    ///
    /// Non-PDF candidates are dropped and never count toward the cap. Once a
    /// candidate does not fit, the rest of the batch is dropped as well.
    pub fn add_files(&mut self, candidates: Vec<PendingFile>) -> IntakeReport {
        let total_candidates = candidates.len();
        let pdfs: Vec<PendingFile> = candidates.into_iter().filter(PendingFile::is_pdf).collect();

        let mut report = IntakeReport {
            skipped_non_pdf: total_candidates - pdfs.len(),
            attempted_total_bytes: pdfs
                .iter()
                .map(|file| file.size_bytes)
                .fold(self.total_bytes(), u64::saturating_add),
            ..IntakeReport::default()
        };

        let mut total = self.total_bytes();
        let pdf_count = pdfs.len();
        for file in pdfs {
            match total.checked_add(file.size_bytes) {
                Some(next) if next <= self.cap_bytes => {
                    total = next;
                    self.files.push(file);
                    report.added += 1;
                }
                _ => break,
            }
        }
        report.skipped_over_cap = pdf_count - report.added;
        report
    }

    pub fn remove_file(&mut self, index: usize) -> Result<PendingFile, IntakeError> {
        if index >= self.files.len() {
            return Err(IntakeError::IndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }
        Ok(self.files.remove(index))
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.size_bytes).sum()
    }

    pub fn cap_bytes(&self) -> u64 {
        self.cap_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Human-readable size, matching the upload page: bytes, then KB/MB with one decimal.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    if bytes < 1024 * 1024 {
        return format!("{:.1} KB", bytes as f64 / 1024.0);
    }
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

