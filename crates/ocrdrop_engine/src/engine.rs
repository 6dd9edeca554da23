use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use tokio::runtime::Runtime;

use crate::client::{OcrBackend, UploadFile};
use crate::persist::{archive_file_name, AtomicFileWriter};
use crate::poller::{ChannelEventSink, EventSink, PollSettings, Poller};
use crate::{EngineEvent, Epoch};

enum EngineCommand {
    Submit {
        epoch: Epoch,
        files: Vec<UploadFile>,
    },
    StartPolling {
        epoch: Epoch,
        process_id: String,
    },
    StopPolling,
    Cancel {
        epoch: Epoch,
        process_id: String,
    },
    ClearCache,
    Download {
        epoch: Epoch,
        url: String,
        dir: PathBuf,
    },
}

/// Owns the tokio runtime and the pollers. Commands go in on one channel,
/// [`EngineEvent`]s come back on another.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(backend: Arc<dyn OcrBackend>, poll: PollSettings) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = Runtime::new()?;

        thread::Builder::new()
            .name("ocrdrop-engine".to_string())
            .spawn(move || {
                let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));
                let mut poller = Poller::new();
                while let Ok(command) = cmd_rx.recv() {
                    handle_command(&runtime, &backend, &sink, &poll, &mut poller, command);
                }
                poller.stop();
                engine_info!("Engine command channel closed");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn submit(&self, epoch: Epoch, files: Vec<UploadFile>) {
        self.send(EngineCommand::Submit { epoch, files });
    }

    pub fn start_polling(&self, epoch: Epoch, process_id: impl Into<String>) {
        self.send(EngineCommand::StartPolling {
            epoch,
            process_id: process_id.into(),
        });
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    pub fn cancel(&self, epoch: Epoch, process_id: impl Into<String>) {
        self.send(EngineCommand::Cancel {
            epoch,
            process_id: process_id.into(),
        });
    }

    pub fn clear_cache(&self) {
        self.send(EngineCommand::ClearCache);
    }

    pub fn download(&self, epoch: Epoch, url: impl Into<String>, dir: PathBuf) {
        self.send(EngineCommand::Download {
            epoch,
            url: url.into(),
            dir,
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    /// `Err(Disconnected)` means the engine thread is gone and nothing more
    /// will arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        let rx = self
            .event_rx
            .lock()
            .map_err(|_| RecvTimeoutError::Disconnected)?;
        rx.recv_timeout(timeout)
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_error!("Engine thread is gone; command dropped");
        }
    }
}

fn handle_command(
    runtime: &Runtime,
    backend: &Arc<dyn OcrBackend>,
    sink: &Arc<dyn EventSink>,
    poll: &PollSettings,
    poller: &mut Poller,
    command: EngineCommand,
) {
    match command {
        EngineCommand::Submit { epoch, files } => {
            let backend = backend.clone();
            let sink = sink.clone();
            runtime.spawn(async move {
                let result = backend.submit(&files).await;
                if let Err(err) = &result {
                    engine_warn!("Submit failed: {}", err);
                }
                sink.emit(EngineEvent::Submitted { epoch, result });
            });
        }
        EngineCommand::StartPolling { epoch, process_id } => {
            poller.start(
                runtime.handle(),
                backend.clone(),
                sink.clone(),
                poll,
                epoch,
                process_id,
            );
        }
        EngineCommand::StopPolling => poller.stop(),
        EngineCommand::Cancel { epoch, process_id } => {
            let backend = backend.clone();
            let sink = sink.clone();
            runtime.spawn(async move {
                let accepted = match backend.cancel(&process_id).await {
                    Ok(()) => true,
                    Err(err) => {
                        engine_error!("Error canceling process {}: {}", process_id, err);
                        false
                    }
                };
                sink.emit(EngineEvent::CancelFinished { epoch, accepted });
            });
        }
        EngineCommand::ClearCache => {
            let backend = backend.clone();
            let sink = sink.clone();
            runtime.spawn(async move {
                let result = backend.clear_cache().await;
                sink.emit(EngineEvent::CacheCleared { result });
            });
        }
        EngineCommand::Download { epoch, url, dir } => {
            let backend = backend.clone();
            let sink = sink.clone();
            runtime.spawn(async move {
                let result = download_archive(backend.as_ref(), &url, dir).await;
                if let Err(err) = &result {
                    engine_warn!("Download of {} failed: {}", url, err);
                }
                sink.emit(EngineEvent::Downloaded { epoch, result });
            });
        }
    }
}

/// Streams the archive into a staged temp file, then renames it into place.
async fn download_archive(
    backend: &dyn OcrBackend,
    url: &str,
    dir: PathBuf,
) -> Result<PathBuf, String> {
    let name = archive_file_name(url);
    let staged = tokio::task::spawn_blocking(move || AtomicFileWriter::new(dir).begin(&name))
        .await
        .map_err(|err| err.to_string())?
        .map_err(|err| err.to_string())?;

    let mut file = tokio::fs::File::from_std(staged.handle().map_err(|err| err.to_string())?);
    let written = backend
        .download(url, &mut file)
        .await
        .map_err(|err| err.to_string())?;
    drop(file);
    engine_info!("Saving {} bytes to {}", written, staged.target().display());

    tokio::task::spawn_blocking(move || staged.commit())
        .await
        .map_err(|err| err.to_string())?
        .map_err(|err| err.to_string())
}
