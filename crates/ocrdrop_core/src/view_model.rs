use crate::state::DownloadState;
use crate::{format_file_size, AppState, FileInfo, JobResult, JobStatus, Phase, Step};

/// Data-free mirror of [`Phase`] for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseKind {
    #[default]
    Idle,
    FilesSelected,
    Submitting,
    Processing,
    Canceling,
    Done,
    Error,
}

impl From<&Phase> for PhaseKind {
    fn from(phase: &Phase) -> Self {
        match phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::FilesSelected => PhaseKind::FilesSelected,
            Phase::Submitting => PhaseKind::Submitting,
            Phase::Processing { .. } => PhaseKind::Processing,
            Phase::Canceling { .. } => PhaseKind::Canceling,
            Phase::Done => PhaseKind::Done,
            Phase::Error => PhaseKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRowView {
    pub index: usize,
    pub name: String,
    pub size_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub current_file_index: u32,
    pub total_files: u32,
    pub current_file_name: String,
    pub percent: f64,
    pub elapsed_text: Option<String>,
    pub remaining_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsView {
    pub cached: u32,
    pub optimized: u32,
    pub workers: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub download_url: Option<String>,
    pub total_pages: Option<u32>,
    pub file_lines: Vec<String>,
    pub stats: Option<StatsView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub phase: PhaseKind,
    pub step: Step,
    pub process_id: Option<String>,
    pub files: Vec<FileRowView>,
    pub total_size_text: Option<String>,
    pub submit_enabled: bool,
    pub cancel_enabled: bool,
    pub progress_visible: bool,
    pub progress: Option<ProgressView>,
    pub hang_warning: bool,
    pub errors: Vec<String>,
    pub result: Option<ResultView>,
    pub cache_notice: Option<Notice>,
    pub download_notice: Option<Notice>,
    pub dirty: bool,
}

pub(crate) fn build_view(state: &AppState) -> AppViewModel {
    let phase = state.phase();
    let job_active = phase.is_job_active();

    let files: Vec<FileRowView> = state
        .intake()
        .files()
        .iter()
        .enumerate()
        .map(|(index, file)| FileRowView {
            index,
            name: file.name.clone(),
            size_text: format_file_size(file.size_bytes),
        })
        .collect();
    let total_size_text =
        (!files.is_empty()).then(|| format_file_size(state.intake().total_bytes()));

    let process_id = match phase {
        Phase::Processing { job } | Phase::Canceling { job: Some(job) } => {
            Some(job.process_id().to_string())
        }
        _ => None,
    };

    AppViewModel {
        phase: PhaseKind::from(phase),
        step: step_for(phase),
        process_id,
        files,
        total_size_text,
        submit_enabled: !job_active && !state.intake().is_empty(),
        cancel_enabled: matches!(phase, Phase::Submitting | Phase::Processing { .. }),
        progress_visible: job_active,
        progress: state
            .progress()
            .filter(|status| job_active && status.is_processing)
            .map(progress_view),
        hang_warning: job_active && state.hang_warning(),
        errors: state.errors().to_vec(),
        result: state.result().map(result_view),
        cache_notice: state.cache_notice().cloned(),
        download_notice: download_notice(state.download()),
        dirty: state.is_dirty(),
    }
}

fn step_for(phase: &Phase) -> Step {
    match phase {
        Phase::Idle => Step::SelectFiles,
        Phase::FilesSelected | Phase::Error => Step::ReviewFiles,
        Phase::Submitting | Phase::Processing { .. } | Phase::Canceling { .. } => Step::Processing,
        Phase::Done => Step::Download,
    }
}

fn progress_view(status: &JobStatus) -> ProgressView {
    let percent = if status.total_files > 0 {
        f64::from(status.current_file_index) / f64::from(status.total_files) * 100.0
    } else {
        0.0
    };
    let elapsed = status.elapsed_seconds.filter(|secs| *secs > 0.0);
    let remaining_text = elapsed
        .filter(|_| status.current_file_index > 0)
        .map(|secs| estimate_remaining(status.current_file_index, status.total_files, secs));
    ProgressView {
        current_file_index: status.current_file_index,
        total_files: status.total_files,
        current_file_name: status.current_file_name.clone().unwrap_or_default(),
        percent,
        elapsed_text: elapsed.map(format_elapsed),
        remaining_text,
    }
}

fn result_view(result: &JobResult) -> ResultView {
    ResultView {
        download_url: result.download_url.clone(),
        total_pages: result.total_pages,
        file_lines: result.file_info.iter().map(file_line).collect(),
        stats: result.stats.as_ref().map(|stats| StatsView {
            cached: stats.from_cache,
            optimized: stats.optimized_files,
            workers: stats.worker_count(),
        }),
    }
}

fn file_line(file: &FileInfo) -> String {
    let mut line = format!("{}: {} pages", file.name, file.page_count);
    if let Some(size_mb) = file.size_mb.filter(|mb| *mb > 0.0) {
        line.push_str(&format!(" ({size_mb} MB)"));
    }
    if file.from_cache {
        line.push_str(" [from cache]");
    }
    if file.optimized {
        line.push_str(" [optimized]");
    }
    line
}

fn download_notice(download: &DownloadState) -> Option<Notice> {
    match download {
        DownloadState::NotRequested => None,
        DownloadState::InFlight => Some(Notice {
            severity: NoticeSeverity::Info,
            text: crate::update::download_ack().to_string(),
        }),
        DownloadState::Saved(path) => Some(Notice {
            severity: NoticeSeverity::Success,
            text: format!("Saved archive to {path}"),
        }),
        DownloadState::Failed(message) => Some(Notice {
            severity: NoticeSeverity::Error,
            text: format!("Download failed: {message}"),
        }),
    }
}

/// Elapsed seconds as `mm:ss`.
pub fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Rough time left, assuming every file takes as long as the average so far.
pub fn estimate_remaining(current_index: u32, total_files: u32, elapsed_seconds: f64) -> String {
    if current_index == 0 || total_files == 0 || elapsed_seconds <= 0.0 {
        return "Calculating...".to_string();
    }
    let files_remaining = f64::from(total_files) - f64::from(current_index);
    let per_file = elapsed_seconds / f64::from(current_index);
    let remaining = files_remaining * per_file;

    if remaining < 60.0 {
        "Less than a minute".to_string()
    } else if remaining < 3600.0 {
        let minutes = (remaining / 60.0).round() as u64;
        format!("About {minutes} {}", plural(minutes, "minute"))
    } else {
        let hours = (remaining / 3600.0).floor() as u64;
        let minutes = ((remaining % 3600.0) / 60.0).round() as u64;
        let mut text = format!("About {hours} {}", plural(hours, "hour"));
        if minutes > 0 {
            text.push_str(&format!(" and {minutes} {}", plural(minutes, "minute")));
        }
        text
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}
