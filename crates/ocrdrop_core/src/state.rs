use engine_logging::engine_info;

use crate::logs::LogLine;
use crate::view_model::{build_view, AppViewModel, Notice};
use crate::{Effect, Epoch, FileIntake, JobHandle, JobResult, JobStatus, LogCursor, LogEntry};

/// Lifecycle of one upload session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    FilesSelected,
    /// `/process` request in flight.
    Submitting,
    Processing {
        job: JobHandle,
    },
    /// Cancel confirmed. `job` is `None` while the submit ack is still pending.
    Canceling {
        job: Option<JobHandle>,
    },
    Done,
    Error,
}

impl Phase {
    pub fn is_job_active(&self) -> bool {
        matches!(
            self,
            Phase::Submitting | Phase::Processing { .. } | Phase::Canceling { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::FilesSelected => "FilesSelected",
            Phase::Submitting => "Submitting",
            Phase::Processing { .. } => "Processing",
            Phase::Canceling { .. } => "Canceling",
            Phase::Done => "Done",
            Phase::Error => "Error",
        }
    }
}

/// Instruction step highlighted in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    SelectFiles = 1,
    ReviewFiles = 2,
    Processing = 3,
    Download = 4,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    NotRequested,
    InFlight,
    Saved(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    /// Elapsed time after which the "may be stuck" advisory is shown.
    pub hang_threshold_secs: f64,
    pub size_cap_bytes: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            hang_threshold_secs: 120.0,
            size_cap_bytes: crate::SIZE_CAP_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    settings: ControllerSettings,
    phase: Phase,
    intake: FileIntake,
    epoch: Epoch,
    log_cursor: LogCursor,
    new_log_lines: Vec<LogLine>,
    progress: Option<JobStatus>,
    hang_warning: bool,
    result: Option<JobResult>,
    errors: Vec<String>,
    cache_notice: Option<Notice>,
    download: DownloadState,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(ControllerSettings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ControllerSettings) -> Self {
        Self {
            settings,
            phase: Phase::Idle,
            intake: FileIntake::with_cap(settings.size_cap_bytes),
            epoch: 0,
            log_cursor: LogCursor::new(),
            new_log_lines: Vec::new(),
            progress: None,
            hang_warning: false,
            result: None,
            errors: Vec::new(),
            cache_notice: None,
            download: DownloadState::NotRequested,
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        build_view(self)
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn settings(&self) -> ControllerSettings {
        self.settings
    }

    pub fn intake(&self) -> &FileIntake {
        &self.intake
    }

    pub fn progress(&self) -> Option<&JobStatus> {
        self.progress.as_ref()
    }

    pub fn hang_warning(&self) -> bool {
        self.hang_warning
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn cache_notice(&self) -> Option<&Notice> {
        self.cache_notice.as_ref()
    }

    pub fn download(&self) -> &DownloadState {
        &self.download
    }

    pub fn last_log_timestamp(&self) -> Option<&crate::LogTimestamp> {
        self.log_cursor.last()
    }

    /// Returns and clears the dirty flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Log lines accepted since the last call, oldest first.
    pub fn take_new_log_lines(&mut self) -> Vec<LogLine> {
        std::mem::take(&mut self.new_log_lines)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn intake_mut(&mut self) -> &mut FileIntake {
        &mut self.intake
    }

    pub(crate) fn set_errors(&mut self, errors: Vec<String>) {
        self.errors = errors;
        self.dirty = true;
    }

    pub(crate) fn clear_errors(&mut self) {
        if !self.errors.is_empty() {
            self.errors.clear();
            self.dirty = true;
        }
    }

    pub(crate) fn set_cache_notice(&mut self, notice: Notice) {
        self.cache_notice = Some(notice);
        self.dirty = true;
    }

    pub(crate) fn set_download(&mut self, download: DownloadState) {
        self.download = download;
        self.dirty = true;
    }

    pub(crate) fn set_result(&mut self, result: JobResult) {
        self.result = Some(result);
        self.dirty = true;
    }

    pub(crate) fn apply_status(&mut self, status: JobStatus) {
        if status.is_processing {
            let over_threshold = status
                .elapsed_seconds
                .is_some_and(|secs| secs > self.settings.hang_threshold_secs);
            if over_threshold || status.possible_hang {
                self.hang_warning = true;
            }
        }
        self.progress = Some(status);
        self.dirty = true;
    }

    pub(crate) fn apply_logs(&mut self, entries: Vec<LogEntry>) {
        let fresh = self.log_cursor.accept(entries);
        if !fresh.is_empty() {
            self.new_log_lines.extend(fresh.into_iter().map(LogLine::from));
            self.dirty = true;
        }
    }

    /// Moves to `next`, returning the effects owed to that transition.
    ///
    /// This is the only place phase-entry and phase-exit side effects are
    /// produced, so each fires once per transition regardless of how many
    /// poll replies arrive while a phase is current.
    pub(crate) fn transition(&mut self, next: Phase) -> Vec<Effect> {
        if self.phase == next {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.phase, next);
        engine_info!(
            "Phase {} -> {} (epoch {})",
            previous.label(),
            self.phase.label(),
            self.epoch
        );
        self.dirty = true;

        let mut effects = Vec::new();
        if matches!(previous, Phase::Processing { .. }) {
            effects.push(Effect::StopPolling);
        }

        match self.phase.clone() {
            Phase::Submitting => {
                self.epoch += 1;
                self.result = None;
                self.progress = None;
                self.hang_warning = false;
                self.download = DownloadState::NotRequested;
                self.errors.clear();
                effects.push(Effect::Submit {
                    epoch: self.epoch,
                    files: self.intake.files().to_vec(),
                });
            }
            Phase::Processing { job } => {
                self.log_cursor.reset();
                self.new_log_lines.push(LogLine::local("Starting process..."));
                effects.push(Effect::StartPolling {
                    epoch: self.epoch,
                    job,
                });
            }
            Phase::Canceling { job: Some(job) } => {
                effects.push(Effect::CancelJob {
                    epoch: self.epoch,
                    job,
                });
            }
            Phase::Done => {
                self.intake.clear();
            }
            Phase::Idle | Phase::FilesSelected | Phase::Error | Phase::Canceling { job: None } => {}
        }
        effects
    }

    /// Settles into `Idle` or `FilesSelected` depending on the file list.
    pub(crate) fn settle_selection(&mut self) -> Vec<Effect> {
        let next = if self.intake.is_empty() {
            Phase::Idle
        } else {
            Phase::FilesSelected
        };
        self.transition(next)
    }

    /// Abandons the current job: later replies for it will not match.
    pub(crate) fn retire_epoch(&mut self) {
        self.epoch += 1;
    }

    /// Discards everything, keeping only settings and a fresh epoch.
    pub(crate) fn hard_reset(&mut self) {
        engine_info!("Hard reset from phase {}", self.phase.label());
        let next_epoch = self.epoch + 1;
        *self = AppState::with_settings(self.settings);
        self.epoch = next_epoch;
        self.dirty = true;
    }
}
