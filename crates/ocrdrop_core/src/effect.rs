use crate::{Epoch, JobHandle, PendingFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Submit {
        epoch: Epoch,
        files: Vec<PendingFile>,
    },
    /// Start the status, log and completion pollers for `job`.
    StartPolling { epoch: Epoch, job: JobHandle },
    /// Stop every poller. Safe to repeat.
    StopPolling,
    CancelJob { epoch: Epoch, job: JobHandle },
    ClearCache,
    Download { epoch: Epoch, url: String },
    /// Controller state was discarded after a failed cancel; the platform
    /// must drop anything it holds for the old session.
    HardReset,
}
