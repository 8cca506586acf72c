use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::Parser;
use indicatif::ProgressBar;
use ratatui::crossterm::event;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scriptsense_core::upload::UploadForm;
use scriptsense_core::{Access, ApiClient, Config, JobId, JobPoller, SessionGuard, SessionStore};
use scriptsense_export::FontLibrary;

mod action;
mod app;
mod backend;
mod input;
mod theme;
mod tui_event;
mod view;

use app::App;

/// ScriptSense TUI - follow a digitization job and work with its result.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Existing job to follow
    job_id: Option<String>,

    /// Document to upload instead of following an existing job
    #[arg(long, conflicts_with = "job_id")]
    file: Option<PathBuf>,

    /// Source language code
    #[arg(long = "from")]
    source_lang: Option<String>,

    /// Target language code
    #[arg(long = "to")]
    target_lang: Option<String>,

    /// Detect the source language before uploading
    #[arg(long)]
    detect: bool,

    /// Backend base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Path to a config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the session file
    #[arg(long)]
    session: Option<PathBuf>,

    /// Directory holding the Noto Sans script fonts for PDF export
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Where exported files are written
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Resolve config from CLI flags > env vars > config file > defaults
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(path) = args.session {
        config.session_path = path;
    }
    if let Some(dir) = args.font_dir {
        config.font_dir = Some(dir);
    }
    if !args.export_dir.is_dir() {
        bail!("export directory not found: {}", args.export_dir.display());
    }

    // Verify the session before touching the terminal
    let mut guard = SessionGuard::new(
        SessionStore::new(&config.session_path),
        ApiClient::new(&config)?,
    );
    let session = match guard.activate().await {
        Access::Granted(session) => session.clone(),
        _ => bail!("not logged in or session expired; run `scriptsense login <email>` first"),
    };
    let api = ApiClient::for_session(&config, Some(&session))?;

    let target_hint = args.target_lang.clone().unwrap_or_else(|| "en".to_string());
    let job_id = match (args.job_id, args.file) {
        (Some(id), _) => JobId::new(id).context("job id must not be empty")?,
        (None, Some(file)) => {
            let mut form = UploadForm {
                file: Some(file),
                source_lang: args.source_lang,
                target_lang: args.target_lang,
            };
            if args.detect {
                form.auto_detect(&api).await?;
            }
            form.validate()?;

            let spinner = ProgressBar::new_spinner();
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_message("Uploading...");
            let created = form.submit(&api, &session.email).await;
            spinner.finish_and_clear();
            created?
        }
        (None, None) => bail!("give a job id to follow, or --file to upload a document"),
    };

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let mut app = App::new(job_id.clone(), target_hint);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let poller = JobPoller::new(Arc::new(api.clone()), config.poll_config());
    let handle = backend::start_job(&poller, job_id, tx.clone(), cancel.clone());
    let backend = backend::Backend {
        api,
        canceller: handle.canceller(),
        fonts: FontLibrary::new(config.font_dir.clone()),
        export_dir: args.export_dir,
        tx,
    };

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| app.view(f))?;

        tokio::select! {
            // Backend events (non-blocking drain)
            Some(backend_event) = rx.recv() => {
                app.handle_backend_event(backend_event);
                while let Ok(evt) = rx.try_recv() {
                    app.handle_backend_event(evt);
                }
            }
            // Terminal input events
            _ = async {
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        let action = input::map_event(&evt, app.is_editing());
                        app.update(action);
                    }
                }
            } => {}
        }

        for request in app.take_requests() {
            backend.dispatch(request);
        }

        app.update(action::Action::Tick);

        if app.should_quit || cancel.is_cancelled() {
            break;
        }
    }

    // Leaving the view stops polling; it does not cancel the job.
    cancel.cancel();
    handle.stop().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
