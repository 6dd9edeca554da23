use crate::{Epoch, JobHandle, JobOutcome, JobStatus, LogEntry, PendingFile, SubmitFailure};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User dropped or selected files. `unreadable` names paths that could
    /// not be inspected at all.
    FilesAdded {
        files: Vec<PendingFile>,
        unreadable: Vec<String>,
    },
    /// User removed the file at this list index.
    RemoveFileClicked(usize),
    /// User dismissed the error banner.
    DismissErrorsClicked,
    /// User clicked Process.
    SubmitClicked,
    /// `/process` acknowledged the upload.
    SubmitAccepted { epoch: Epoch, job: JobHandle },
    /// `/process` failed before a job id was obtained.
    SubmitFailed { epoch: Epoch, failure: SubmitFailure },
    /// `/status` snapshot.
    StatusPolled { epoch: Epoch, status: JobStatus },
    /// `/logs` contents (cumulative).
    LogsPolled { epoch: Epoch, entries: Vec<LogEntry> },
    /// `/process-status/{id}` reported a terminal state.
    JobFinished { epoch: Epoch, outcome: JobOutcome },
    /// User confirmed the cancel prompt.
    CancelConfirmed,
    /// `/cancel-process/{id}` replied; `accepted` is false on any failure.
    CancelFinished { epoch: Epoch, accepted: bool },
    ClearCacheClicked,
    CacheCleared { success: bool, message: String },
    DownloadClicked,
    /// Archive download finished; `Ok` carries where it was saved.
    DownloadFinished {
        epoch: Epoch,
        result: Result<String, String>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
