//! Ontime application binary - composition root.
//!
//! 1. Load configuration from TOML, then env and CLI overrides
//! 2. Open the SQLite chat history
//! 3. Build the Frappe client, chat controller, and document workflow
//! 4. Run the requested command (interactive chat by default)

mod cli;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

use ontime_chat::{
    ChatController, EventOutcome, EventRouter, QueryClassifier, Transcript, WidgetVisibility,
};
use ontime_core::config::OntimeConfig;
use ontime_docs::{DocumentWorkflow, FilesSelectedHandler, PollPolicy, UploadOutcome, UploadTracker};
use ontime_storage::{HistoryStore, SqliteHistoryStore};
use ontime_transport::FrappeClient;

use cli::{CliArgs, Command};
use terminal::{format_message, parse_input, Input, TerminalView, HELP};

/// Everything a command needs, wired together.
struct App {
    transcript: Arc<Transcript>,
    controller: Arc<ChatController>,
    workflow: Arc<DocumentWorkflow>,
    uploads: Arc<FilesSelectedHandler>,
    router: EventRouter,
}

impl App {
    fn build(
        config: &OntimeConfig,
        store: Arc<dyn HistoryStore>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = Arc::new(FrappeClient::new(
            config.server.clone(),
            config.routes.clone(),
        )?);
        tracing::info!(base_url = %config.server.base_url, "Frappe client ready");

        let view = Arc::new(TerminalView::new(Arc::clone(&client)));
        let transcript = Arc::new(Transcript::new(store, view));
        let controller = Arc::new(ChatController::new(client.clone(), Arc::clone(&transcript)));

        let workflow = Arc::new(
            DocumentWorkflow::new(
                client,
                Arc::clone(&transcript),
                Arc::new(UploadTracker::new()),
                PollPolicy::from(&config.upload),
            )
            .with_private_files(config.upload.private_files),
        );

        let mut router = EventRouter::with_chat_handlers(
            Arc::clone(&controller),
            Arc::new(WidgetVisibility::new(true)),
        );
        let uploads = Arc::new(FilesSelectedHandler::new(Arc::clone(&workflow)));
        router.register(uploads.clone());

        Ok(Self {
            transcript,
            controller,
            workflow,
            uploads,
            router,
        })
    }
}

/// Interactive loop over stdin lines.
async fn chat_loop(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let restored = app.transcript.restore();
    if restored == 0 {
        println!("{}", HELP);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let event = match parse_input(&line) {
            Input::Event(event) => event,
            Input::Empty => continue,
            Input::Help => {
                println!("{}", HELP);
                continue;
            }
            Input::Invalid(hint) => {
                println!("{}", hint);
                continue;
            }
            Input::Quit => break,
        };

        match app.router.dispatch(event).await {
            Ok(EventOutcome::Visibility(open)) => {
                println!("Chat widget {}", if open { "opened" } else { "closed" });
            }
            Ok(EventOutcome::UploadsStarted(count)) => {
                tracing::debug!(count, "Uploads running in the background");
            }
            Ok(EventOutcome::Query(outcome)) => {
                tracing::debug!(state = ?outcome.state(), "Query settled");
            }
            Err(e) => tracing::warn!(error = %e, "Event not handled"),
        }
    }

    // Shutting the runtime down would cancel running uploads.
    let running = app.uploads.running();
    if running > 0 {
        println!("Waiting for {} upload(s) to finish...", running);
        tracing::info!(running, "Waiting for uploads before exit");
    }
    let outcomes = app.uploads.wait_all().await;
    tracing::debug!(settled = outcomes.len(), "Uploads settled");
    Ok(())
}

/// Upload every path and wait until each workflow settles.
async fn upload_all(app: &App, paths: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let handles = app.workflow.handle_paths(paths);
    let mut failed = 0usize;
    for handle in handles {
        match handle.await? {
            UploadOutcome::Completed(_) => {}
            UploadOutcome::Failed(_) | UploadOutcome::TimedOut { .. } => failed += 1,
        }
    }
    if failed > 0 {
        return Err(format!("{} upload(s) did not complete", failed).into());
    }
    Ok(())
}

fn print_history(store: &dyn HistoryStore) -> Result<(), Box<dyn std::error::Error>> {
    let messages = store.load_history()?;
    if messages.is_empty() {
        println!("No chat history.");
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

/// Install the stderr subscriber before anything else logs.
///
/// `RUST_LOG` wins; otherwise the --log-level flag or "info" is used until
/// the config file is read.
fn init_tracing(args: &CliArgs) -> reload::Handle<EnvFilter, Registry> {
    let initial = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(args.log_level.clone().unwrap_or_else(|| "info".to_string()))
    });
    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// The config file's level, unless RUST_LOG or --log-level already chose one.
fn configured_log_level(args: &CliArgs, config: &OntimeConfig, env_set: bool) -> Option<String> {
    if env_set || args.log_level.is_some() {
        return None;
    }
    Some(args.resolve_log_level(&config.logging.level))
}

fn apply_config_log_level(
    handle: &reload::Handle<EnvFilter, Registry>,
    args: &CliArgs,
    config: &OntimeConfig,
) {
    let env_set = std::env::var(EnvFilter::DEFAULT_ENV).is_ok();
    let Some(level) = configured_log_level(args, config, env_set) else {
        return;
    };
    if let Err(e) = handle.reload(EnvFilter::new(&level)) {
        tracing::warn!(error = %e, level = %level, "Failed to apply configured log level");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. Stdout belongs to the chat; logs go to stderr.
    let log_handle = init_tracing(&args);

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = OntimeConfig::load_or_default(&config_file);
    config.apply_env_overrides();
    config.server.base_url = args.resolve_base_url(&config.server.base_url);
    config.routes = args.resolve_routes(config.routes);
    apply_config_log_level(&log_handle, &args, &config);

    tracing::info!("Starting Ontime v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_file.display(), "Configuration resolved");

    let command = args.command();

    // Classification needs no storage or network.
    if let Command::Classify { query } = &command {
        println!("{}", QueryClassifier::new().classify(&query.join(" ")));
        return Ok(());
    }

    // Storage.
    let db_path = cli::expand_home(&config.history.db_path);
    let store: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::open(
        &db_path,
        config.history.storage_key.clone(),
    )?);
    tracing::info!(path = %db_path.display(), "Chat history opened");

    if command == Command::History {
        return print_history(store.as_ref());
    }

    let app = App::build(&config, store)?;

    match command {
        Command::Chat => chat_loop(&app).await?,
        Command::Ask { query } => {
            app.transcript.resume();
            let outcome = app.controller.submit(&query.join(" ")).await;
            tracing::debug!(state = ?outcome.state(), "Query settled");
        }
        Command::Upload { paths } => {
            app.transcript.resume();
            upload_all(&app, paths).await?;
        }
        Command::Classify { .. } | Command::History => {}
    }

    Ok(())
}
