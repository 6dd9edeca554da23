use engine_logging::{engine_debug, engine_warn};

use crate::state::DownloadState;
use crate::view_model::{Notice, NoticeSeverity};
use crate::{AppState, Effect, Epoch, JobOutcome, Msg, Phase};

const CANCELED_MESSAGE: &str = "Processing was canceled";
const INTAKE_LOCKED_MESSAGE: &str = "Files cannot be changed while a job is running.";
const DOWNLOAD_ACK: &str = "Download started! The archive is being saved.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesAdded { files, unreadable } => {
            if state.phase().is_job_active() {
                state.set_errors(vec![INTAKE_LOCKED_MESSAGE.to_string()]);
                return (state, Vec::new());
            }
            let report = state.intake_mut().add_files(files);
            let mut warnings: Vec<String> = unreadable
                .iter()
                .map(|path| format!("Could not read {path}"))
                .collect();
            warnings.extend(report.warnings());
            if !warnings.is_empty() {
                state.set_errors(warnings);
            }
            state.mark_dirty();
            state.settle_selection()
        }
        Msg::RemoveFileClicked(index) => {
            if state.phase().is_job_active() {
                state.set_errors(vec![INTAKE_LOCKED_MESSAGE.to_string()]);
                return (state, Vec::new());
            }
            match state.intake_mut().remove_file(index) {
                Ok(removed) => {
                    engine_debug!("Removed {} from the upload list", removed.name);
                    state.mark_dirty();
                    state.settle_selection()
                }
                Err(err) => {
                    engine_warn!("Ignoring remove request: {}", err);
                    Vec::new()
                }
            }
        }
        Msg::DismissErrorsClicked => {
            state.clear_errors();
            Vec::new()
        }
        Msg::SubmitClicked => {
            let can_submit = matches!(
                state.phase(),
                Phase::FilesSelected | Phase::Error | Phase::Done
            ) && !state.intake().is_empty();
            if can_submit {
                state.transition(Phase::Submitting)
            } else {
                Vec::new()
            }
        }
        Msg::SubmitAccepted { epoch, job } => {
            if !is_current(&state, epoch) {
                return (state, Vec::new());
            }
            match state.phase().clone() {
                Phase::Submitting => state.transition(Phase::Processing { job }),
                Phase::Canceling { job: None } => {
                    state.transition(Phase::Canceling { job: Some(job) })
                }
                _ => Vec::new(),
            }
        }
        Msg::SubmitFailed { epoch, failure } => {
            if !is_current(&state, epoch) {
                return (state, Vec::new());
            }
            match state.phase().clone() {
                Phase::Submitting => {
                    engine_warn!("Submission failed: {:?}", failure);
                    state.set_errors(vec![failure.user_message()]);
                    state.transition(Phase::Error)
                }
                Phase::Canceling { job: None } => {
                    state.set_errors(vec![CANCELED_MESSAGE.to_string()]);
                    state.retire_epoch();
                    state.settle_selection()
                }
                _ => Vec::new(),
            }
        }
        Msg::StatusPolled { epoch, status } => {
            if is_current(&state, epoch) && is_processing(&state) {
                state.apply_status(status);
            }
            Vec::new()
        }
        Msg::LogsPolled { epoch, entries } => {
            if is_current(&state, epoch) && is_processing(&state) {
                state.apply_logs(entries);
            }
            Vec::new()
        }
        Msg::JobFinished { epoch, outcome } => {
            if !is_current(&state, epoch) || !is_processing(&state) {
                return (state, Vec::new());
            }
            match outcome {
                JobOutcome::Succeeded(result) => {
                    if !result.errors.is_empty() {
                        state.set_errors(result.errors.clone());
                    }
                    state.set_result(result);
                    state.transition(Phase::Done)
                }
                JobOutcome::Failed { message } => {
                    state.set_errors(vec![message]);
                    state.transition(Phase::Error)
                }
            }
        }
        Msg::CancelConfirmed => match state.phase().clone() {
            Phase::Submitting => state.transition(Phase::Canceling { job: None }),
            Phase::Processing { job } => state.transition(Phase::Canceling { job: Some(job) }),
            _ => Vec::new(),
        },
        Msg::CancelFinished { epoch, accepted } => {
            let canceling = matches!(state.phase(), Phase::Canceling { job: Some(_) });
            if !is_current(&state, epoch) || !canceling {
                return (state, Vec::new());
            }
            if accepted {
                state.retire_epoch();
                state.set_errors(vec![CANCELED_MESSAGE.to_string()]);
                state.settle_selection()
            } else {
                engine_warn!("Cancel request failed; discarding client state");
                state.hard_reset();
                vec![Effect::StopPolling, Effect::HardReset]
            }
        }
        Msg::ClearCacheClicked => vec![Effect::ClearCache],
        Msg::CacheCleared { success, message } => {
            let severity = if success {
                NoticeSeverity::Success
            } else {
                NoticeSeverity::Error
            };
            state.set_cache_notice(Notice {
                severity,
                text: message,
            });
            Vec::new()
        }
        Msg::DownloadClicked => {
            let url = match (state.phase(), state.result()) {
                (Phase::Done, Some(result)) => result.download_url.clone(),
                _ => None,
            };
            match url {
                Some(url) if *state.download() != DownloadState::InFlight => {
                    state.set_download(DownloadState::InFlight);
                    vec![Effect::Download {
                        epoch: state.epoch(),
                        url,
                    }]
                }
                _ => Vec::new(),
            }
        }
        Msg::DownloadFinished { epoch, result } => {
            if is_current(&state, epoch) && *state.download() == DownloadState::InFlight {
                let next = match result {
                    Ok(path) => DownloadState::Saved(path),
                    Err(message) => DownloadState::Failed(message),
                };
                state.set_download(next);
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Acknowledgment shown while a download is in flight.
pub(crate) fn download_ack() -> &'static str {
    DOWNLOAD_ACK
}

fn is_current(state: &AppState, epoch: Epoch) -> bool {
    let current = state.epoch() == epoch;
    if !current {
        engine_debug!(
            "Dropping reply for epoch {} (current epoch {})",
            epoch,
            state.epoch()
        );
    }
    current
}

fn is_processing(state: &AppState) -> bool {
    matches!(state.phase(), Phase::Processing { .. })
}
