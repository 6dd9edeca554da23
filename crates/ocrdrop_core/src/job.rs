/// Generation counter for job-scoped messages. Bumped whenever a new job
/// starts or the current one is abandoned, so late replies can be told apart.
pub type Epoch = u64;

/// Opaque server-side job identifier. Never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    process_id: String,
}

impl JobHandle {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
        }
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }
}

/// One `/status` snapshot. Overwritten by every poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStatus {
    pub is_processing: bool,
    pub current_file_index: u32,
    pub total_files: u32,
    pub current_file_name: Option<String>,
    pub elapsed_seconds: Option<f64>,
    pub possible_hang: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub page_count: u32,
    pub size_mb: Option<f64>,
    pub from_cache: bool,
    pub optimized: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStats {
    pub from_cache: u32,
    pub optimized_files: u32,
    pub cpu_cores: Option<u32>,
    pub total_files: Option<u32>,
}

impl JobStats {
    /// Workers the server used, or an estimate of `min(4, total_files)` when
    /// it did not say.
    pub fn worker_count(&self) -> u32 {
        match self.cpu_cores {
            Some(cores) if cores > 0 => cores,
            _ => self.total_files.filter(|n| *n > 0).unwrap_or(1).min(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobResult {
    pub download_url: Option<String>,
    pub total_pages: Option<u32>,
    pub file_info: Vec<FileInfo>,
    pub stats: Option<JobStats>,
    /// Per-file problems reported alongside an otherwise successful run.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(JobResult),
    Failed { message: String },
}

/// Why `/process` did not hand back a job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    PayloadTooLarge,
    Rejected { status: u16, message: Option<String> },
    MalformedResponse,
    Transport,
    /// A selected file could not be read from disk at upload time.
    Unreadable { name: String },
}

impl SubmitFailure {
    pub fn user_message(&self) -> String {
        match self {
            SubmitFailure::PayloadTooLarge => "File size limit exceeded (maximum 1.5GB combined). \
                 Please upload smaller files or fewer files at once."
                .to_string(),
            SubmitFailure::Rejected { message, .. } => message
                .clone()
                .unwrap_or_else(|| "An unknown error occurred".to_string()),
            SubmitFailure::MalformedResponse => {
                "The server returned an unexpected response".to_string()
            }
            SubmitFailure::Transport => "An error occurred while processing the files".to_string(),
            SubmitFailure::Unreadable { name } => format!("Could not read {name}"),
        }
    }
}
