use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::Local;
use engine_logging::{engine_info, engine_warn};
use ocrdrop_core::{
    Effect, FileInfo, JobHandle, JobOutcome, JobResult, JobStats, JobStatus, LogEntry, LogLevel,
    LogTimestamp, Msg, SubmitFailure,
};
use ocrdrop_engine::{
    EngineEvent, EngineHandle, LogRecord, ProcessState, ProcessStatusBody, ServerStatus,
    SubmitError, UploadFile, WireTimestamp,
};

const NO_DOWNLOAD_DIR: &str = "No download directory configured";
const EVENT_WAIT: Duration = Duration::from_millis(50);

/// Executes controller effects on the engine and feeds engine events back as
/// [`Msg`]s.
pub struct EffectRunner {
    engine: EngineHandle,
    download_dir: Option<PathBuf>,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        download_dir: Option<PathBuf>,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        let runner = Self {
            engine,
            download_dir,
            msg_tx,
        };
        runner.spawn_event_loop();
        runner
    }

    pub fn can_download(&self) -> bool {
        self.download_dir.is_some()
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit { epoch, files } => {
                    engine_info!("Submit epoch={} files={}", epoch, files.len());
                    let uploads = files
                        .into_iter()
                        .map(|file| UploadFile {
                            name: file.name,
                            path: file.source,
                            size_bytes: file.size_bytes,
                        })
                        .collect();
                    self.engine.submit(epoch, uploads);
                }
                Effect::StartPolling { epoch, job } => {
                    self.engine.start_polling(epoch, job.process_id());
                }
                Effect::StopPolling => self.engine.stop_polling(),
                Effect::CancelJob { epoch, job } => {
                    engine_info!("Cancel requested for process {}", job.process_id());
                    self.engine.cancel(epoch, job.process_id());
                }
                Effect::ClearCache => self.engine.clear_cache(),
                Effect::Download { epoch, url } => match &self.download_dir {
                    Some(dir) => {
                        engine_info!(
                            "Download of {} started at {}",
                            url,
                            Local::now().to_rfc3339()
                        );
                        self.engine.download(epoch, url, dir.clone());
                    }
                    None => {
                        let _ = self.msg_tx.send(Msg::DownloadFinished {
                            epoch,
                            result: Err(NO_DOWNLOAD_DIR.to_string()),
                        });
                    }
                },
                Effect::HardReset => {
                    engine_warn!("Controller reset after a failed cancel");
                    self.engine.stop_polling();
                }
            }
        }
    }

    fn spawn_event_loop(&self) {
        let engine = self.engine.clone();
        let msg_tx = self.msg_tx.clone();
        thread::spawn(move || forward_events(|wait| engine.recv_timeout(wait), &msg_tx));
    }
}

/// Pumps engine events into the controller until either side hangs up.
fn forward_events(
    mut next: impl FnMut(Duration) -> Result<EngineEvent, RecvTimeoutError>,
    msg_tx: &mpsc::Sender<Msg>,
) {
    loop {
        match next(EVENT_WAIT) {
            Ok(event) => {
                let Some(msg) = map_event(event) else {
                    continue;
                };
                if msg_tx.send(msg).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                engine_warn!("Engine event channel closed");
                break;
            }
        }
    }
}

pub fn map_event(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::Submitted { epoch, result } => match result {
            Ok(process_id) => Msg::SubmitAccepted {
                epoch,
                job: JobHandle::new(process_id),
            },
            Err(err) => {
                engine_warn!("Submit epoch={} failed: {}", epoch, err);
                Msg::SubmitFailed {
                    epoch,
                    failure: map_submit_error(err),
                }
            }
        },
        EngineEvent::Status { epoch, status } => Msg::StatusPolled {
            epoch,
            status: map_status(status),
        },
        EngineEvent::Logs { epoch, records } => Msg::LogsPolled {
            epoch,
            entries: records.into_iter().map(map_log).collect(),
        },
        EngineEvent::Finished { epoch, state } => {
            let outcome = match state {
                ProcessState::Running { .. } => return None,
                ProcessState::Succeeded(body) => JobOutcome::Succeeded(map_result(body)),
                ProcessState::Failed { message } => JobOutcome::Failed { message },
            };
            Msg::JobFinished { epoch, outcome }
        }
        EngineEvent::CancelFinished { epoch, accepted } => Msg::CancelFinished { epoch, accepted },
        EngineEvent::CacheCleared { result } => match result {
            Ok(reply) => Msg::CacheCleared {
                success: reply.success,
                message: reply.message,
            },
            Err(err) => {
                engine_warn!("Error clearing cache: {}", err);
                Msg::CacheCleared {
                    success: false,
                    message: "An error occurred while clearing the cache".to_string(),
                }
            }
        },
        EngineEvent::Downloaded { epoch, result } => Msg::DownloadFinished {
            epoch,
            result: result.map(|path| path.display().to_string()),
        },
    };
    Some(msg)
}

fn map_submit_error(err: SubmitError) -> SubmitFailure {
    match err {
        SubmitError::PayloadTooLarge => SubmitFailure::PayloadTooLarge,
        SubmitError::Rejected { status, message } => SubmitFailure::Rejected { status, message },
        SubmitError::MalformedResponse => SubmitFailure::MalformedResponse,
        SubmitError::Transport(_) => SubmitFailure::Transport,
        SubmitError::Unreadable { name, .. } => SubmitFailure::Unreadable { name },
    }
}

fn map_status(status: ServerStatus) -> JobStatus {
    JobStatus {
        is_processing: status.is_processing,
        current_file_index: status.current_file_index.unwrap_or(0),
        total_files: status.total_files.unwrap_or(0),
        current_file_name: status.current_file,
        elapsed_seconds: status.elapsed_seconds,
        possible_hang: status.possible_hang.unwrap_or(false),
    }
}

fn map_log(record: LogRecord) -> LogEntry {
    let timestamp = match record.timestamp {
        WireTimestamp::Number(value) => LogTimestamp::Numeric(value),
        WireTimestamp::Text(text) => LogTimestamp::Text(text),
    };
    LogEntry::new(timestamp, LogLevel::parse(&record.level), record.message)
}

fn map_result(body: ProcessStatusBody) -> JobResult {
    JobResult {
        download_url: body.download_url,
        total_pages: body.total_pages,
        file_info: body
            .file_info
            .unwrap_or_default()
            .into_iter()
            .map(|file| FileInfo {
                name: file.name,
                page_count: file.page_count,
                size_mb: file.size_mb,
                from_cache: file.from_cache,
                optimized: file.optimized,
            })
            .collect(),
        stats: body.stats.map(|stats| JobStats {
            from_cache: stats.from_cache.unwrap_or(0),
            optimized_files: stats.optimized_files.unwrap_or(0),
            cpu_cores: stats.cpu_cores,
            total_files: stats.total_files,
        }),
        errors: body.errors.unwrap_or_default(),
    }
}
