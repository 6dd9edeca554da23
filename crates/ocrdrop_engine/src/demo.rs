//! Offline stand-in for the OCR server.
//!
//! Fabricates per-file progress, log lines and a result so the whole client
//! lifecycle can be exercised without a backend. Page counts and badges are
//! derived from a hash of the file name so repeated runs look the same.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use crate::client::{OcrBackend, UploadFile};
use crate::{
    ApiError, CacheClearResponse, FileInfoBody, LogRecord, ProcessStatusBody, ServerStatus,
    StatsBody, SubmitError, WireTimestamp,
};

const DEMO_WORKERS: u32 = 4;
const LOG_CAPACITY: usize = 100;
const DEMO_DOWNLOAD_MESSAGE: &str = "Demo mode: no archive is produced. Point the client at a \
                                     real server to download OCR-processed PDFs.";

#[derive(Debug, Clone)]
struct DemoFile {
    name: String,
    size_mb: f64,
    pages: u32,
    from_cache: bool,
    optimized: bool,
}

impl DemoFile {
    fn from_upload(file: &UploadFile) -> Self {
        let digest = Sha256::digest(file.name.as_bytes());
        Self {
            name: file.name.clone(),
            size_mb: (file.size_bytes as f64 / (1024.0 * 1024.0) * 10.0).round() / 10.0,
            pages: u32::from(digest[0] % 20) + 5,
            from_cache: digest[1] % 10 >= 7,
            optimized: digest[2] % 10 >= 8,
        }
    }
}

#[derive(Debug)]
struct DemoJob {
    id: String,
    files: Vec<DemoFile>,
    started: Instant,
    canceled: bool,
    /// Files whose log lines have already been written.
    logged: usize,
    finished_logged: bool,
}

impl DemoJob {
    fn files_done(&self, step: Duration) -> usize {
        if step.is_zero() {
            return self.files.len();
        }
        let done = self.started.elapsed().as_millis() / step.as_millis().max(1);
        usize::try_from(done).unwrap_or(usize::MAX).min(self.files.len())
    }

    fn is_complete(&self, step: Duration) -> bool {
        self.files_done(step) == self.files.len()
    }
}

#[derive(Debug, Default)]
struct DemoState {
    next_id: u64,
    job: Option<DemoJob>,
    logs: VecDeque<LogRecord>,
    log_seq: f64,
}

impl DemoState {
    fn push_log(&mut self, level: &str, message: String) {
        self.log_seq += 1.0;
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(LogRecord {
            timestamp: WireTimestamp::Number(self.log_seq),
            level: level.to_string(),
            message,
        });
    }

    /// Writes log lines for whatever progress the clock says has happened.
    fn advance(&mut self, step: Duration) {
        let Some(job) = self.job.as_mut() else {
            return;
        };
        if job.canceled {
            return;
        }
        let done = job.files_done(step);
        let total = job.files.len();
        let mut pending = Vec::new();
        for index in job.logged..done {
            let file = &job.files[index];
            pending.push(format!(
                "Processing file {}/{}: {}",
                index + 1,
                total,
                file.name
            ));
            if file.optimized {
                pending.push(format!("Optimizing large PDF: {}", file.name));
            }
            if file.from_cache {
                pending.push(format!("Cache hit for {} - loading from cache", file.name));
            } else {
                pending.push(format!("OCR processing complete for {}", file.name));
            }
        }
        job.logged = done;
        let finish = done == total && !job.finished_logged;
        if finish {
            job.finished_logged = true;
            pending.push("Creating ZIP archive...".to_string());
            pending.push(format!("Successfully processed {total} files"));
        }
        for message in pending {
            self.push_log("INFO", message);
        }
    }
}

/// Simulated backend selected with `--demo`.
#[derive(Debug)]
pub struct DemoBackend {
    step: Duration,
    state: Mutex<DemoState>,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::with_step(Duration::from_millis(1000))
    }
}

impl DemoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `step` is the simulated time spent per file. Zero finishes instantly.
    pub fn with_step(step: Duration) -> Self {
        Self {
            step,
            state: Mutex::new(DemoState::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DemoState>, ApiError> {
        self.state
            .lock()
            .map_err(|_| ApiError::Io("demo state poisoned".to_string()))
    }

    fn unknown_process() -> ApiError {
        ApiError::Status {
            status: 404,
            message: Some("Process ID not found".to_string()),
        }
    }
}

#[async_trait::async_trait]
impl OcrBackend for DemoBackend {
    async fn submit(&self, files: &[UploadFile]) -> Result<String, SubmitError> {
        if files.is_empty() {
            return Err(SubmitError::Rejected {
                status: 400,
                message: Some("No files provided".to_string()),
            });
        }
        let mut state = self
            .state
            .lock()
            .map_err(|_| SubmitError::Transport("demo state poisoned".to_string()))?;
        state.next_id += 1;
        let id = format!("demo-{}", state.next_id);
        state.job = Some(DemoJob {
            id: id.clone(),
            files: files.iter().map(DemoFile::from_upload).collect(),
            started: Instant::now(),
            canceled: false,
            logged: 0,
            finished_logged: false,
        });
        state.push_log("INFO", "Initializing OCR processor...".to_string());
        state.push_log(
            "INFO",
            format!("Setting up parallel processing with {DEMO_WORKERS} CPU cores..."),
        );
        Ok(id)
    }

    async fn process_status(&self, process_id: &str) -> Result<ProcessStatusBody, ApiError> {
        let state = self.lock()?;
        let job = state
            .job
            .as_ref()
            .filter(|job| job.id == process_id)
            .ok_or_else(Self::unknown_process)?;

        let mut body = ProcessStatusBody {
            process_id: Some(job.id.clone()),
            ..ProcessStatusBody::default()
        };
        if job.canceled {
            body.success = Some(false);
            body.error = Some("Processing was canceled".to_string());
            return Ok(body);
        }
        if !job.is_complete(self.step) {
            body.elapsed_seconds = Some(job.started.elapsed().as_secs_f64());
            return Ok(body);
        }

        let file_info: Vec<FileInfoBody> = job
            .files
            .iter()
            .map(|file| FileInfoBody {
                name: file.name.clone(),
                page_count: file.pages,
                size_mb: Some(file.size_mb),
                from_cache: file.from_cache,
                optimized: file.optimized,
            })
            .collect();
        let count = |pred: fn(&DemoFile) -> bool| {
            u32::try_from(job.files.iter().filter(|f| pred(f)).count()).unwrap_or(u32::MAX)
        };
        body.success = Some(true);
        body.download_url = Some(format!("demo://processed_files_{}.zip", job.id));
        body.total_pages = Some(job.files.iter().map(|file| file.pages).sum());
        body.stats = Some(StatsBody {
            from_cache: Some(count(|f| f.from_cache)),
            optimized_files: Some(count(|f| f.optimized)),
            cpu_cores: Some(DEMO_WORKERS),
            total_files: Some(u32::try_from(job.files.len()).unwrap_or(u32::MAX)),
        });
        body.file_info = Some(file_info);
        Ok(body)
    }

    async fn status(&self) -> Result<ServerStatus, ApiError> {
        let state = self.lock()?;
        let Some(job) = state.job.as_ref().filter(|job| !job.canceled) else {
            return Ok(ServerStatus::default());
        };
        if job.is_complete(self.step) {
            return Ok(ServerStatus::default());
        }
        let done = job.files_done(self.step);
        Ok(ServerStatus {
            is_processing: true,
            current_file_index: u32::try_from(done + 1).ok(),
            total_files: u32::try_from(job.files.len()).ok(),
            current_file: job.files.get(done).map(|file| file.name.clone()),
            elapsed_seconds: Some(job.started.elapsed().as_secs_f64()),
            possible_hang: Some(false),
        })
    }

    async fn logs(&self) -> Result<Vec<LogRecord>, ApiError> {
        let mut state = self.lock()?;
        state.advance(self.step);
        Ok(state.logs.iter().cloned().collect())
    }

    async fn cancel(&self, process_id: &str) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        let job = state
            .job
            .as_mut()
            .filter(|job| job.id == process_id)
            .ok_or_else(Self::unknown_process)?;
        if job.is_complete(self.step) {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Process already completed".to_string()),
            });
        }
        job.canceled = true;
        state.push_log("WARNING", format!("Cancel requested for process ID: {process_id}"));
        Ok(())
    }

    async fn clear_cache(&self) -> Result<CacheClearResponse, ApiError> {
        Ok(CacheClearResponse {
            success: true,
            message: "Demo mode: there is no cache to clear.".to_string(),
        })
    }

    async fn download(
        &self,
        _url: &str,
        _out: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ApiError> {
        Err(ApiError::Unsupported(DEMO_DOWNLOAD_MESSAGE.to_string()))
    }
}
