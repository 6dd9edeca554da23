use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::OcrBackend;
use crate::{EngineEvent, Epoch, ProcessState};

const LOST_CONTACT: &str = "Lost contact with the server while waiting for the job to finish";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub status_interval: Duration,
    pub log_interval: Duration,
    pub completion_interval: Duration,
    /// Consecutive `/process-status` failures tolerated before giving up.
    pub max_completion_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(1),
            log_interval: Duration::from_secs(1),
            completion_interval: Duration::from_secs(2),
            max_completion_failures: 5,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// The three repeating tasks that watch one job.
///
/// `stop` cancels future ticks only; a request already in flight completes
/// but its reply is dropped.
#[derive(Default)]
pub struct Poller {
    token: Option<CancellationToken>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Starts polling `process_id`, stopping any previous job's pollers first.
    pub fn start(
        &mut self,
        runtime: &Handle,
        backend: Arc<dyn OcrBackend>,
        sink: Arc<dyn EventSink>,
        settings: &PollSettings,
        epoch: Epoch,
        process_id: String,
    ) {
        self.stop();
        engine_info!("Polling process {} (epoch {})", process_id, epoch);
        let token = CancellationToken::new();

        runtime.spawn(poll_status(
            backend.clone(),
            sink.clone(),
            settings.status_interval,
            epoch,
            token.child_token(),
        ));
        runtime.spawn(poll_logs(
            backend.clone(),
            sink.clone(),
            settings.log_interval,
            epoch,
            token.child_token(),
        ));
        runtime.spawn(poll_completion(
            backend,
            sink,
            settings.clone(),
            epoch,
            process_id,
            token.child_token(),
        ));
        self.token = Some(token);
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            engine_debug!("Stopping pollers");
            token.cancel();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn poll_status(
    backend: Arc<dyn OcrBackend>,
    sink: Arc<dyn EventSink>,
    period: Duration,
    epoch: Epoch,
    token: CancellationToken,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        match backend.status().await {
            Ok(status) if !token.is_cancelled() => sink.emit(EngineEvent::Status { epoch, status }),
            Ok(_) => break,
            Err(err) => engine_warn!("Error fetching status: {}", err),
        }
    }
}

async fn poll_logs(
    backend: Arc<dyn OcrBackend>,
    sink: Arc<dyn EventSink>,
    period: Duration,
    epoch: Epoch,
    token: CancellationToken,
) {
    let mut interval = ticker(period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        match backend.logs().await {
            Ok(records) if !token.is_cancelled() => {
                sink.emit(EngineEvent::Logs { epoch, records })
            }
            Ok(_) => break,
            Err(err) => engine_warn!("Error fetching logs: {}", err),
        }
    }
}

async fn poll_completion(
    backend: Arc<dyn OcrBackend>,
    sink: Arc<dyn EventSink>,
    settings: PollSettings,
    epoch: Epoch,
    process_id: String,
    token: CancellationToken,
) {
    let mut failures = 0_u32;
    loop {
        let reply = backend.process_status(&process_id).await;
        if token.is_cancelled() {
            break;
        }
        match reply.map(|body| body.state()) {
            Ok(ProcessState::Running { .. }) => failures = 0,
            Ok(state) => {
                engine_info!("Process {} reached a terminal state", process_id);
                sink.emit(EngineEvent::Finished { epoch, state });
                break;
            }
            Err(err) => {
                failures += 1;
                engine_warn!(
                    "Error checking process status ({}/{}): {}",
                    failures,
                    settings.max_completion_failures,
                    err
                );
                if failures >= settings.max_completion_failures {
                    sink.emit(EngineEvent::Finished {
                        epoch,
                        state: ProcessState::Failed {
                            message: LOST_CONTACT.to_string(),
                        },
                    });
                    break;
                }
            }
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(settings.completion_interval) => {}
        }
    }
}
