//! ocrdrop engine: HTTP backend, demo backend, pollers and effect execution.
mod client;
mod demo;
mod engine;
mod persist;
mod poller;
mod types;

pub use client::{HttpBackend, OcrBackend, ServerSettings, UploadFile};
pub use demo::DemoBackend;
pub use engine::EngineHandle;
pub use persist::{
    archive_file_name, ensure_output_dir, AtomicFileWriter, PersistError, StagedFile,
};
pub use poller::{ChannelEventSink, EventSink, PollSettings, Poller};
pub use types::{
    ApiError, CacheClearResponse, EngineEvent, Epoch, FileInfoBody, LogRecord, ProcessState,
    ProcessStatusBody, ServerStatus, StatsBody, SubmitError, WireTimestamp,
};
