use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mirrors the controller's job generation counter.
pub type Epoch = u64;

const UNKNOWN_ERROR: &str = "An unknown error occurred";
const CANCELED: &str = "Processing was canceled";
const UNEXPECTED_STATUS: &str = "The server returned an unexpected job status";

/// `GET /status`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub current_file_index: Option<u32>,
    #[serde(default)]
    pub total_files: Option<u32>,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub elapsed_seconds: Option<f64>,
    #[serde(default)]
    pub possible_hang: Option<bool>,
}

/// Log timestamps arrive as formatted text from the real server and as
/// numbers from some deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Number(f64),
    Text(String),
}

/// One element of `GET /logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: WireTimestamp,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfoBody {
    pub name: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub size_mb: Option<f64>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub optimized: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsBody {
    #[serde(default)]
    pub from_cache: Option<u32>,
    #[serde(default)]
    pub optimized_files: Option<u32>,
    #[serde(default)]
    pub cpu_cores: Option<u32>,
    #[serde(default)]
    pub total_files: Option<u32>,
}

/// `GET /process-status/{id}`. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessStatusBody {
    /// Explicit lifecycle marker; newer servers send it, older ones do not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<Vec<FileInfoBody>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

/// Classified `/process-status` reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessState {
    Running { elapsed_seconds: Option<f64> },
    Succeeded(ProcessStatusBody),
    Failed { message: String },
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessState::Running { .. })
    }
}

impl ProcessStatusBody {
    /// Classifies the reply.
    ///
    /// An explicit `status` field wins when it is recognised. Otherwise the
    /// job is running exactly when `process_id` is present and both `success`
    /// and `error` are absent; every other shape is terminal.
    pub fn state(&self) -> ProcessState {
        if let Some(state) = self.explicit_state() {
            return state;
        }
        if self.process_id.is_some() && self.success.is_none() && self.error.is_none() {
            return ProcessState::Running {
                elapsed_seconds: self.elapsed_seconds,
            };
        }
        self.terminal_state()
    }

    fn explicit_state(&self) -> Option<ProcessState> {
        let status = self.status.as_deref()?.trim().to_ascii_lowercase();
        match status.as_str() {
            "running" | "processing" | "queued" | "pending" => Some(ProcessState::Running {
                elapsed_seconds: self.elapsed_seconds,
            }),
            "succeeded" | "success" | "completed" | "done" => {
                Some(ProcessState::Succeeded(self.clone()))
            }
            "failed" | "error" => Some(ProcessState::Failed {
                message: self.error_message(),
            }),
            "canceled" | "cancelled" => Some(ProcessState::Failed {
                message: CANCELED.to_string(),
            }),
            _ => None,
        }
    }

    fn terminal_state(&self) -> ProcessState {
        if self.error.is_some() || self.success == Some(false) {
            return ProcessState::Failed {
                message: self.error_message(),
            };
        }
        if self.success == Some(true) {
            return ProcessState::Succeeded(self.clone());
        }
        ProcessState::Failed {
            message: UNEXPECTED_STATUS.to_string(),
        }
    }

    fn error_message(&self) -> String {
        self.error
            .clone()
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}

/// `GET /clear-cache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheClearResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("io error: {0}")]
    Io(String),
}

impl ApiError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("upload exceeds the server size limit")]
    PayloadTooLarge,
    #[error("server rejected upload with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("server reply did not contain a process id")]
    MalformedResponse,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not read {name}: {message}")]
    Unreadable { name: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted {
        epoch: Epoch,
        result: Result<String, SubmitError>,
    },
    Status {
        epoch: Epoch,
        status: ServerStatus,
    },
    Logs {
        epoch: Epoch,
        records: Vec<LogRecord>,
    },
    /// Terminal `/process-status` reply. Never sent for a running job.
    Finished {
        epoch: Epoch,
        state: ProcessState,
    },
    CancelFinished {
        epoch: Epoch,
        accepted: bool,
    },
    CacheCleared {
        result: Result<CacheClearResponse, ApiError>,
    },
    Downloaded {
        epoch: Epoch,
        result: Result<PathBuf, String>,
    },
}
