use ocrdrop_core::{
    AppViewModel, LogLevel, LogLine, Notice, NoticeSeverity, PhaseKind, ProgressView, ResultView,
    Step,
};

use super::constants::*;

/// Prints only what changed since the previous view.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last: Option<AppViewModel>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `view` as already on screen.
    pub fn prime(&mut self, view: &AppViewModel) {
        self.last = Some(view.clone());
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut out = Vec::new();
        let last = self.last.take();
        let prev = last.as_ref();

        if prev.map(|p| p.phase) != Some(view.phase) {
            out.push(step_header(view.step, view.phase));
            if view.phase == PhaseKind::Processing {
                if let Some(id) = &view.process_id {
                    out.push(format!("  Job {id} accepted. {CANCEL_HINT}"));
                }
            }
        }

        if prev.map(|p| &p.files) != Some(&view.files) && !view.files.is_empty() {
            out.push("  Files:".to_string());
            for file in &view.files {
                out.push(format!("    {}. {} ({})", file.index + 1, file.name, file.size_text));
            }
            if let Some(total) = &view.total_size_text {
                out.push(format!("    Total: {total}"));
            }
        }

        if let Some(progress) = &view.progress {
            if progress_moved(prev.and_then(|p| p.progress.as_ref()), progress) {
                out.push(progress_line(progress));
            }
        }

        if view.hang_warning && !prev.is_some_and(|p| p.hang_warning) {
            out.push(format!("  WARNING: {HANG_WARNING}"));
        }

        if prev.map(|p| &p.errors) != Some(&view.errors) {
            if view.errors.is_empty() && prev.is_some_and(|p| !p.errors.is_empty()) {
                out.push(format!("  {ERRORS_DISMISSED}"));
            }
            out.extend(view.errors.iter().map(|err| format!("  ! {err}")));
        }

        if view.result.is_some() && prev.and_then(|p| p.result.as_ref()) != view.result.as_ref() {
            if let Some(result) = &view.result {
                out.extend(result_lines(result));
            }
        }

        for (current, before) in [
            (&view.cache_notice, prev.and_then(|p| p.cache_notice.as_ref())),
            (&view.download_notice, prev.and_then(|p| p.download_notice.as_ref())),
        ] {
            if let Some(notice) = current {
                if Some(notice) != before {
                    out.push(notice_line(notice));
                }
            }
        }

        self.last = Some(view.clone());
        out
    }
}

fn step_header(step: Step, phase: PhaseKind) -> String {
    let title = match phase {
        PhaseKind::Idle => "Select PDF files",
        PhaseKind::FilesSelected => "Review files",
        PhaseKind::Submitting => "Uploading files...",
        PhaseKind::Processing => "Processing",
        PhaseKind::Canceling => "Canceling...",
        PhaseKind::Done => "Processing complete",
        PhaseKind::Error => "Processing failed",
    };
    format!("[{}/{}] {}", step as u8, STEP_COUNT, title)
}

/// Elapsed ticks alone are not worth a new line.
fn progress_moved(before: Option<&ProgressView>, now: &ProgressView) -> bool {
    match before {
        None => true,
        Some(before) => {
            before.current_file_index != now.current_file_index
                || before.total_files != now.total_files
                || before.current_file_name != now.current_file_name
                || before.remaining_text != now.remaining_text
        }
    }
}

fn progress_line(progress: &ProgressView) -> String {
    let mut line = format!(
        "  Processing file {} of {} ({:.0}%)",
        progress.current_file_index, progress.total_files, progress.percent
    );
    if !progress.current_file_name.is_empty() {
        line.push_str(&format!(": {}", progress.current_file_name));
    }
    if let Some(elapsed) = &progress.elapsed_text {
        line.push_str(&format!(" | elapsed {elapsed}"));
    }
    if let Some(remaining) = &progress.remaining_text {
        line.push_str(&format!(" | remaining: {remaining}"));
    }
    line
}

fn result_lines(result: &ResultView) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(pages) = result.total_pages {
        lines.push(format!("  Total pages: {pages}"));
    }
    if let Some(stats) = &result.stats {
        lines.push(format!(
            "  From cache: {} | Optimized: {} | Workers: {}",
            stats.cached, stats.optimized, stats.workers
        ));
    }
    lines.extend(result.file_lines.iter().map(|line| format!("    {line}")));
    if let Some(url) = &result.download_url {
        lines.push(format!("  Download: {url}"));
    }
    lines
}

fn notice_line(notice: &Notice) -> String {
    let tag = match notice.severity {
        NoticeSeverity::Info => "info",
        NoticeSeverity::Success => "ok",
        NoticeSeverity::Error => "error",
    };
    format!("  [{tag}] {}", notice.text)
}

/// Server lines keep their own timestamp; local ones get `local_time`.
pub fn format_log_line(line: &LogLine, local_time: &str) -> String {
    let timestamp = line.timestamp.as_deref().unwrap_or(local_time);
    let level = match line.level {
        LogLevel::Info => "",
        LogLevel::Warning => "WARNING ",
        LogLevel::Error => "ERROR ",
    };
    format!("  [{timestamp}] {level}{}", line.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrdrop_core::{update, AppState, JobHandle, JobStatus, Msg, PendingFile};

    fn pdf(name: &str, size: u64) -> PendingFile {
        PendingFile::new(name, size, "application/pdf", format!("/tmp/{name}"))
    }

    fn step(state: AppState, msg: Msg) -> AppState {
        update(state, msg).0
    }

    #[test]
    fn first_render_shows_header_and_files() {
        let state = step(
            AppState::new(),
            Msg::FilesAdded {
                files: vec![pdf("a.pdf", 2048)],
                unreadable: Vec::new(),
            },
        );
        let mut renderer = TerminalRenderer::new();
        let lines = renderer.render(&state.view());
        assert_eq!(lines[0], "[2/4] Review files");
        assert!(lines.contains(&"    1. a.pdf (2.0 KB)".to_string()));
        assert!(lines.contains(&"    Total: 2.0 KB".to_string()));

        assert!(renderer.render(&state.view()).is_empty());
    }

    #[test]
    fn progress_prints_on_file_change_only() {
        let mut state = step(
            AppState::new(),
            Msg::FilesAdded {
                files: vec![pdf("a.pdf", 10), pdf("b.pdf", 10)],
                unreadable: Vec::new(),
            },
        );
        state = step(state, Msg::SubmitClicked);
        let epoch = state.epoch();
        state = step(
            state,
            Msg::SubmitAccepted {
                epoch,
                job: JobHandle::new("abc"),
            },
        );
        let mut renderer = TerminalRenderer::new();
        let lines = renderer.render(&state.view());
        assert_eq!(lines[0], "[3/4] Processing");
        assert!(lines[1].starts_with("  Job abc accepted."));

        let status = |index: u32, elapsed: f64| Msg::StatusPolled {
            epoch,
            status: JobStatus {
                is_processing: true,
                current_file_index: index,
                total_files: 2,
                current_file_name: Some(format!("file{index}.pdf")),
                elapsed_seconds: Some(elapsed),
                possible_hang: false,
            },
        };
        state = step(state, status(1, 5.0));
        let lines = renderer.render(&state.view());
        assert_eq!(
            lines,
            vec![
                "  Processing file 1 of 2 (50%): file1.pdf | elapsed 00:05 | remaining: Less than a minute"
                    .to_string()
            ]
        );

        state = step(state, status(1, 6.0));
        assert!(renderer.render(&state.view()).is_empty());

        state = step(state, status(2, 200.0));
        let lines = renderer.render(&state.view());
        assert!(lines[0].starts_with("  Processing file 2 of 2 (100%): file2.pdf"));
        assert!(lines.iter().any(|line| line.contains("WARNING")));
    }

    #[test]
    fn log_lines_use_server_or_local_time() {
        let local = LogLine::local("Starting process...");
        assert_eq!(
            format_log_line(&local, "2026-01-01 09:00:00"),
            "  [2026-01-01 09:00:00] Starting process..."
        );
        let server = LogLine {
            timestamp: Some("12".to_string()),
            level: LogLevel::Error,
            message: "boom".to_string(),
        };
        assert_eq!(format_log_line(&server, "ignored"), "  [12] ERROR boom");
    }

    #[test]
    fn errors_render_once() {
        let state = step(
            AppState::new(),
            Msg::FilesAdded {
                files: vec![PendingFile::new("x.txt", 1, "text/plain", "/tmp/x.txt")],
                unreadable: Vec::new(),
            },
        );
        let mut renderer = TerminalRenderer::new();
        let lines = renderer.render(&state.view());
        assert!(lines
            .iter()
            .any(|line| line == "  ! Some files were skipped because they are not PDFs."));
        assert!(renderer.render(&state.view()).is_empty());
    }

    #[test]
    fn dismissing_errors_is_acknowledged() {
        let state = step(
            AppState::new(),
            Msg::FilesAdded {
                files: vec![PendingFile::new("x.txt", 1, "text/plain", "/tmp/x.txt")],
                unreadable: Vec::new(),
            },
        );
        let mut renderer = TerminalRenderer::new();
        renderer.render(&state.view());

        let state = step(state, Msg::DismissErrorsClicked);
        assert_eq!(renderer.render(&state.view()), vec!["  Messages dismissed.".to_string()]);
    }

    #[test]
    fn primed_view_prints_only_the_cache_notice() {
        let state = AppState::new();
        let mut renderer = TerminalRenderer::new();
        renderer.prime(&state.view());

        let (state, _) = update(state, Msg::ClearCacheClicked);
        assert!(renderer.render(&state.view()).is_empty());

        let state = step(
            state,
            Msg::CacheCleared {
                success: true,
                message: "Cache cleared: 3 files removed".to_string(),
            },
        );
        assert_eq!(
            renderer.render(&state.view()),
            vec!["  [ok] Cache cleared: 3 files removed".to_string()]
        );
    }
}
