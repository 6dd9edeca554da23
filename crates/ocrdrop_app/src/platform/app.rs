use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use engine_logging::{engine_debug, engine_info};
use ocrdrop_core::{update, AppState, DownloadState, Msg, NoticeSeverity, Phase};
use ocrdrop_engine::{DemoBackend, EngineHandle, HttpBackend, OcrBackend, PollSettings};

use super::config::{ClearCacheArgs, Cli, Command, ProcessArgs};
use super::effects::EffectRunner;
use super::logging::{self, LogDestination};
use super::scan::scan_paths;
use super::ui::constants::{CANCEL_PROMPT, CLEAR_CACHE_PROMPT, LOCAL_TIME_FORMAT};
use super::ui::render::{format_log_line, TerminalRenderer};

const TICK_INTERVAL: Duration = Duration::from_millis(250);
const CLEAR_CACHE_TIMEOUT: Duration = Duration::from_secs(30);

pub fn run_app() -> Result<ExitCode> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::initialize(LogDestination::for_verbosity(cli.verbose), cli.level()?);
    if let Ok(path) = dotenv {
        engine_info!("Loaded environment from {}", path.display());
    }

    let backend: Arc<dyn OcrBackend> = if cli.demo {
        engine_info!("Using the simulated demo server");
        Arc::new(DemoBackend::new())
    } else {
        engine_info!("Using server {}", cli.server);
        Arc::new(HttpBackend::new(cli.server_settings()).context("invalid --server URL")?)
    };

    match cli.command {
        Command::Process(args) => run_process(backend, args),
        Command::ClearCache(args) => run_clear_cache(backend, args),
    }
}

fn run_clear_cache(backend: Arc<dyn OcrBackend>, args: ClearCacheArgs) -> Result<ExitCode> {
    let confirmed = args.yes || {
        let stdin = io::stdin();
        let answer = stdin.lock().lines().next();
        confirm(CLEAR_CACHE_PROMPT, answer)
    };
    if !confirmed {
        engine_info!("Cache clear declined");
        return Ok(ExitCode::SUCCESS);
    }

    let engine = EngineHandle::new(backend, PollSettings::default())
        .context("failed to start the engine")?;
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut app = App::new(AppState::new(), EffectRunner::new(engine, None, msg_tx));
    clear_cache(&mut app, &msg_rx, CLEAR_CACHE_TIMEOUT)
}

/// Drives `ClearCacheClicked` until the controller holds a cache notice.
fn clear_cache(app: &mut App, msg_rx: &mpsc::Receiver<Msg>, timeout: Duration) -> Result<ExitCode> {
    app.renderer.prime(&app.state.view());
    app.dispatch(Msg::ClearCacheClicked);

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(notice) = app.state.cache_notice() {
            return Ok(if notice.severity == NoticeSeverity::Success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        let wait = deadline.saturating_duration_since(Instant::now());
        match msg_rx.recv_timeout(wait) {
            Ok(msg) => app.dispatch(msg),
            Err(RecvTimeoutError::Timeout) => {
                return Err(anyhow!("the server did not answer the clear-cache request"))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("the engine stopped before the cache was cleared"))
            }
        }
    }
}

/// Prints `prompt`; only an explicit `y` counts as yes.
fn confirm(prompt: &str, answer: Option<io::Result<String>>) -> bool {
    println!("{prompt}");
    let _ = io::stdout().flush();
    matches!(answer, Some(Ok(line)) if line.trim().eq_ignore_ascii_case("y"))
}

fn run_process(backend: Arc<dyn OcrBackend>, args: ProcessArgs) -> Result<ExitCode> {
    let engine = EngineHandle::new(backend, args.poll_settings())
        .context("failed to start the engine")?;
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(engine, args.download_dir.clone(), msg_tx.clone());
    let mut app = App::new(
        AppState::with_settings(args.controller_settings()),
        runner,
    );

    let scanned = scan_paths(&args.paths);
    app.dispatch(Msg::FilesAdded {
        files: scanned.files,
        unreadable: scanned.unreadable,
    });
    app.dispatch(Msg::SubmitClicked);
    if !app.state.phase().is_job_active() {
        return Ok(ExitCode::FAILURE);
    }

    spawn_input_listener(msg_tx.clone(), args.yes);
    thread::spawn(move || {
        while msg_tx.send(Msg::Tick).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });

    while let Ok(msg) = msg_rx.recv() {
        app.dispatch(msg);
        if let Some(code) = app.finished() {
            return Ok(code);
        }
    }
    Ok(ExitCode::FAILURE)
}

/// `c` + Enter asks to cancel; the next line must be `y` unless `--yes`.
/// `d` + Enter dismisses the current error messages.
fn spawn_input_listener(msg_tx: mpsc::Sender<Msg>, assume_yes: bool) {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        while let Some(Ok(line)) = lines.next() {
            let msg = match line.trim().to_ascii_lowercase().as_str() {
                "c" if assume_yes || confirm(CANCEL_PROMPT, lines.next()) => Msg::CancelConfirmed,
                "d" => Msg::DismissErrorsClicked,
                _ => continue,
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

struct App {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer,
}

impl App {
    fn new(state: AppState, runner: EffectRunner) -> Self {
        Self {
            state,
            runner,
            renderer: TerminalRenderer::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.enqueue(effects);

        let local_time = Local::now().format(LOCAL_TIME_FORMAT).to_string();
        for line in state.take_new_log_lines() {
            println!("{}", format_log_line(&line, &local_time));
        }
        if state.consume_dirty() {
            for line in self.renderer.render(&state.view()) {
                println!("{line}");
            }
        }
        self.state = state;
    }

    /// Exit code once nothing more will happen for this run.
    fn finished(&mut self) -> Option<ExitCode> {
        let phase = self.state.phase();
        if phase.is_job_active() {
            return None;
        }
        if *phase != Phase::Done {
            return Some(ExitCode::FAILURE);
        }

        let has_url = self
            .state
            .result()
            .is_some_and(|result| result.download_url.is_some());
        let download = self.state.download().clone();
        match download {
            DownloadState::NotRequested if has_url && self.runner.can_download() => {
                engine_debug!("Requesting archive download");
                self.dispatch(Msg::DownloadClicked);
                None
            }
            DownloadState::InFlight => None,
            _ => Some(ExitCode::SUCCESS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrdrop_core::Notice;
    use ocrdrop_engine::ServerSettings;

    fn app_with(backend: Arc<dyn OcrBackend>) -> (App, mpsc::Receiver<Msg>) {
        let engine = EngineHandle::new(backend, PollSettings::default()).unwrap();
        let (msg_tx, msg_rx) = mpsc::channel();
        let app = App::new(AppState::new(), EffectRunner::new(engine, None, msg_tx));
        (app, msg_rx)
    }

    #[test]
    fn clear_cache_goes_through_the_controller() {
        let (mut app, msg_rx) = app_with(Arc::new(DemoBackend::with_step(Duration::ZERO)));
        let code = clear_cache(&mut app, &msg_rx, Duration::from_secs(5)).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(
            app.state.cache_notice(),
            Some(&Notice {
                severity: NoticeSeverity::Success,
                text: "Demo mode: there is no cache to clear.".to_string(),
            })
        );
    }

    #[test]
    fn unreachable_server_exits_with_failure() {
        let backend = HttpBackend::new(ServerSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            ..ServerSettings::default()
        })
        .unwrap();
        let (mut app, msg_rx) = app_with(Arc::new(backend));
        let code = clear_cache(&mut app, &msg_rx, Duration::from_secs(10)).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert_eq!(
            app.state.cache_notice().map(|notice| notice.severity),
            Some(NoticeSeverity::Error)
        );
    }

    fn answer(text: &str) -> Option<io::Result<String>> {
        Some(Ok(text.to_string()))
    }

    #[test]
    fn only_y_confirms() {
        assert!(confirm(CLEAR_CACHE_PROMPT, answer("y")));
        assert!(confirm(CLEAR_CACHE_PROMPT, answer(" Y ")));
        assert!(!confirm(CLEAR_CACHE_PROMPT, answer("")));
        assert!(!confirm(CLEAR_CACHE_PROMPT, answer("yes please")));
        assert!(!confirm(CANCEL_PROMPT, None));
    }
}
