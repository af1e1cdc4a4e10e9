//! Analyst application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Install logging
//! 3. Open the session database
//! 4. Initialize the controller and the HTTP analysis client
//! 5. Run the interactive prompt on stdin

mod cli;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use analyst_chat::{AnalystController, ChatError, HttpAnalysisClient};
use analyst_core::config::{expand_home, AnalystConfig};
use analyst_report::{ExportDialog, ExportFormat, ExportResult, ReportError};
use analyst_storage::{Database, KeyValueStore, MemoryStore};

use cli::CliArgs;
use repl::{format_message, format_sessions, parse_command, quick_reply_hint, Command, HELP_TEXT};

/// Everything the prompt loop needs.
struct App {
    controller: AnalystController,
    export_dir: PathBuf,
    dialog: ExportDialog,
}

impl App {
    fn active(&self) -> Result<String, ChatError> {
        self.controller
            .active_session_id()?
            .ok_or_else(|| ChatError::SessionNotFound("<none active>".to_string()))
    }

    fn print_reply(&self, message: &analyst_core::types::Message) {
        println!("{}", format_message(message));
        if let Some(hint) = quick_reply_hint(message) {
            println!("{}", hint);
        }
    }

    fn print_history(&self) -> Result<(), ChatError> {
        let sid = self.active()?;
        for message in self.controller.history(&sid)? {
            self.print_reply(&message);
        }
        Ok(())
    }

    fn lookup(&self, target: &str) -> Result<Option<String>, ChatError> {
        let sessions = self.controller.sessions()?;
        Ok(repl::resolve_session(&sessions, target).map(|s| s.id.clone()))
    }

    /// Run one command. Returns `false` when the loop should end.
    async fn handle(&mut self, command: Command) -> Result<bool, ChatError> {
        match command {
            Command::Empty => {}
            Command::Quit => return Ok(false),
            Command::Help => println!("{}", HELP_TEXT),
            Command::Invalid(reason) => println!("{}", reason),
            Command::Send(text) => {
                let reply = self.controller.send_active(&text).await?;
                self.print_reply(&reply);
            }
            Command::Quick(reply) => {
                let sid = self.active()?;
                let message = self.controller.quick_reply(&sid, reply).await?;
                self.print_reply(&message);
            }
            Command::Sessions => {
                let sessions = self.controller.sessions()?;
                let active = self.controller.active_session_id()?;
                println!("{}", format_sessions(&sessions, active.as_deref()));
            }
            Command::New => {
                let id = self.controller.create_session()?;
                println!("Started session {}", id);
                self.print_history()?;
            }
            Command::Switch(target) => match self.lookup(&target)? {
                Some(id) => {
                    self.controller.select_session(&id)?;
                    self.print_history()?;
                }
                None => println!("No session matches '{}'", target),
            },
            Command::Rename(target, name) => match self.lookup(&target)? {
                Some(id) => {
                    self.controller.rename_session(&id, &name)?;
                    println!("Renamed to '{}'", name);
                }
                None => println!("No session matches '{}'", target),
            },
            Command::Delete(target) => match self.lookup(&target)? {
                Some(id) => {
                    self.controller.delete_session(&id)?;
                    println!("Deleted session {}", id);
                }
                None => println!("No session matches '{}'", target),
            },
            Command::History => self.print_history()?,
            Command::Export(format) => self.export(format).await?,
        }
        Ok(true)
    }

    /// Drive the export dialog. Without a format it only lists the choices.
    async fn export(&mut self, format: Option<String>) -> Result<(), ChatError> {
        let sid = self.active()?;
        self.dialog.open(self.controller.has_report(&sid))?;
        if !self.dialog.has_report() {
            println!("⚠️ No report available yet. Complete an analysis first.");
            self.dialog.dismiss();
            return Ok(());
        }

        let Some(format) = format else {
            let choices: Vec<&str> = ExportFormat::ALL.iter().map(|f| f.extension()).collect();
            println!("Export as: /export <{}>", choices.join("|"));
            return Ok(());
        };
        let format = match format.parse::<ExportFormat>() {
            Ok(f) => f,
            Err(e) => {
                println!("{}", e);
                return Ok(());
            }
        };

        self.dialog.begin(format)?;
        println!("Exporting {}...", format.file_name());
        let result = match self.controller.export_to(&sid, format, &self.export_dir).await {
            Ok(path) => ExportResult::Success(path.display().to_string()),
            Err(e) => {
                tracing::error!(error = %e, format = %format, "Export failed");
                ExportResult::Error(e.to_string())
            }
        };
        match &result {
            ExportResult::Success(path) => println!("✅ Saved {}", path),
            ExportResult::Error(message) => println!("❌ Export failed: {}", message),
        }
        self.dialog.finish(result)?;
        self.dialog.dismiss();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = AnalystConfig::load_or_default(&config_file);
    // Written before CLI overrides so flags stay one-shot.
    let first_run_defaults = (!config_file.exists() && !args.ephemeral).then(|| config.clone());
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    config.service.endpoint_url = args.resolve_endpoint(&config.service.endpoint_url);

    // Tracing. Logs go to stderr so they stay out of the conversation.
    let filter = args.resolve_log_filter(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting analyst v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");
    if let Some(defaults) = first_run_defaults {
        if let Err(e) = defaults.save(&config_file) {
            tracing::warn!(
                error = %e,
                path = %config_file.display(),
                "Could not write default config"
            );
        }
    }

    // Storage.
    let store: Arc<dyn KeyValueStore> = if args.ephemeral {
        tracing::info!("Ephemeral mode, sessions are kept in memory");
        Arc::new(MemoryStore::new())
    } else {
        let data_dir = expand_home(&config.general.data_dir);
        let db_path = data_dir.join("analyst.db");
        let db = Database::new(&db_path)?;
        tracing::info!(path = %db_path.display(), "SQLite database opened");
        Arc::new(db)
    };

    // Controller.
    let client = HttpAnalysisClient::new(&config.service)?;
    tracing::info!(
        endpoint = %client.endpoint_url(),
        timeout_secs = config.service.timeout_secs,
        "Analysis client ready"
    );
    let controller = AnalystController::new(store, Arc::new(client));
    controller.initialize()?;

    let mut app = App {
        controller,
        export_dir: expand_home(&config.export.output_dir),
        dialog: ExportDialog::new(),
    };

    println!("System Impact Analyst. Type /help for commands.");
    app.print_history()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match app.handle(parse_command(&line)).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(ChatError::Report(ReportError::NoReportData)) => {
                println!("⚠️ No report available yet.");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Command failed");
                println!("error: {}", e);
            }
        }
    }

    tracing::info!("Analyst shutting down");
    Ok(())
}
