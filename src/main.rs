//! storefront-tui — an infinite-scroll product catalog for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ WorkerMsg  ┌──────────┐  draw()  ┌──────────┐
//! │ worker.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (threads) │ (channel)  │ (state)  │          │ (render) │
//! └───────────┘            └──────────┘          └──────────┘
//!       ▲  FetchTicket          │ ▲
//!       └───────────────────────┘ │ handle_key_event()
//!                            ┌──────────┐
//!                            │ input.rs │
//!                            └──────────┘
//! ```
//!
//! * **`source/`** — the `FeedSource` trait and its REST and document-store
//!   implementations.
//! * **`store`** — the document store behind the cursor-paginated source.
//! * **`feed`** — the pagination state machine (`FeedController`).
//! * **`worker`** — runs fetches, seeding and sign-in on background threads.
//! * **`auth`** — email/password and Google sign-in.
//! * **`app`** — owns all application state (feed, screens, theme, banner).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations.
//! * **`config`**, **`cli`**, **`logging`** — the ambient plumbing.
//! * **`main`** — wires everything together: load config, build the
//!   source, set up the terminal, and run the event loop.

mod app;
mod auth;
mod banner;
mod cli;
mod config;
mod feed;
mod input;
mod logging;
mod source;
mod store;
mod theme;
mod ui;
mod worker;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use app::{App, AppOptions};
use auth::{Authenticator, IdentityToolkit};
use cli::Cli;
use crate::config::{Config, SourceKind, MEMORY_STORE};
use source::{DocumentSource, FeedSource, RestSource};
use store::LocalStore;
use worker::Worker;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        tracing::error!(%info, "panic");
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn build_source(config: &Config) -> Result<Arc<dyn FeedSource>> {
    let source: Arc<dyn FeedSource> = match config.source.kind {
        SourceKind::Rest => Arc::new(
            RestSource::new(
                &config.source.base_url,
                "Catalog",
                config.timeout(),
                &config.source.user_agent,
            )
            .context("configuring REST source")?,
        ),
        SourceKind::Document => {
            let path = config.store_path();
            let store = if path.as_os_str() == MEMORY_STORE {
                info!("using in-memory document store");
                LocalStore::in_memory()
            } else {
                info!(path = %path.display(), "opening document store");
                LocalStore::open(&path)
            };
            Arc::new(DocumentSource::new(Arc::new(store), "Local store"))
        }
    };
    Ok(source)
}

fn build_authenticator(config: &Config) -> Result<Option<Arc<dyn Authenticator>>> {
    let Some(api_key) = config.auth.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let toolkit = IdentityToolkit::new(&config.auth.endpoint, api_key, config.timeout())
        .context("configuring sign-in")?;
    Ok(Some(Arc::new(toolkit)))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // -- parse arguments and configuration -----------------------------------
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_cli(&cli);

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let log_path = logging::initialize_logging()?;
    install_panic_hook();
    info!(log = %log_path.display(), source = ?config.source.kind, "starting");

    // -- configure data source and background worker --------------------------
    let source = build_source(&config)?;
    let authenticator = build_authenticator(&config)?;
    let (worker, rx) = Worker::new(source);
    let mut app = App::new(worker, AppOptions::from_config(&config, authenticator));

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    app.start();

    // -- main event loop -----------------------------------------------------
    // Each iteration:
    //   1. Drain any messages from worker threads.
    //   2. Expire the banner.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(config.ui.tick_ms.max(1));

    loop {
        while let Ok(msg) = rx.try_recv() {
            app.handle_msg(msg);
        }

        app.tick(Instant::now());

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    info!("exiting");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
