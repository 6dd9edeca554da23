//! ocrdrop core: pure job-lifecycle state machine and view-model helpers.
//!
//! Nothing in this crate performs I/O. The platform layer feeds [`Msg`]s into
//! [`update`], executes the returned [`Effect`]s and renders [`AppViewModel`].
mod effect;
mod intake;
mod job;
mod logs;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use intake::{
    format_file_size, FileIntake, IntakeError, IntakeReport, PendingFile, PDF_MIME, SIZE_CAP_BYTES,
};
pub use job::{
    Epoch, FileInfo, JobHandle, JobOutcome, JobResult, JobStats, JobStatus, SubmitFailure,
};
pub use logs::{LogCursor, LogEntry, LogLevel, LogLine, LogTimestamp};
pub use msg::Msg;
pub use state::{AppState, ControllerSettings, DownloadState, Phase, Step};
pub use update::update;
pub use view_model::{
    estimate_remaining, format_elapsed, AppViewModel, FileRowView, Notice, NoticeSeverity,
    PhaseKind, ProgressView, ResultView, StatsView,
};
