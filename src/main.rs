use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use glance::{
    AskOutcome, BearerToken, Config, DocumentRef, HttpBackendClientBuilder, QuerySession,
    SessionError, SqliteTrialStore, StaticIdentity, TrialGate, ValidationError,
};

/// glance - ask questions about a document from the command line
#[derive(Parser)]
#[command(name = "glance")]
#[command(about = "Submit a document and get answers to your questions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Ingest a document and ask questions about it
    Ask(AskCommand),
    /// Show whether the free anonymous trial has been used
    Trial,
}

/// Ask questions about a document
#[derive(Parser)]
struct AskCommand {
    /// Path of a document to upload (PDF, TXT, DOC, DOCX)
    #[arg(long, value_name = "PATH", conflicts_with = "url")]
    file: Option<PathBuf>,

    /// URL of a remote document to ingest
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// A question to ask; repeat for up to five questions
    #[arg(short, long = "question", value_name = "TEXT")]
    questions: Vec<String>,

    /// Bearer token for an authenticated caller
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Ask(cmd) => handle_ask(cmd).await,
        Commands::Trial => handle_trial(),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include validation failures like an oversized file or an
/// over-long question. Internal errors include backend and storage
/// failures.
fn is_user_error(error: &anyhow::Error) -> bool {
    if let Some(err) = error.downcast_ref::<SessionError>() {
        return err.is_user_error();
    }
    error.downcast_ref::<ValidationError>().is_some()
}

/// Handles the ask command: wire up a session, run one cycle, print the
/// question/answer pairs.
async fn handle_ask(cmd: &AskCommand) -> Result<()> {
    let config = Config::from_env();

    let document = match (&cmd.file, &cmd.url) {
        (Some(path), None) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document")
                .to_string();
            DocumentRef::upload(name, mime_for(path), bytes)?
        }
        (None, Some(url)) => DocumentRef::from_url(url)?,
        _ => anyhow::bail!("Provide exactly one of --file or --url"),
    };

    if cmd.questions.is_empty() {
        anyhow::bail!("Provide at least one --question");
    }
    if cmd.questions.len() > 5 {
        anyhow::bail!("At most five questions are supported");
    }

    let client = HttpBackendClientBuilder::new()
        .base_url(&config.backend_url)
        .timeout(config.request_timeout)
        .build()
        .context("Failed to create backend client")?;
    let store = open_store(&config)?;
    let identity = match &cmd.token {
        Some(token) => StaticIdentity::with_token(BearerToken::new(token)),
        None => StaticIdentity::anonymous(),
    };

    let session = QuerySession::builder()
        .client(Arc::new(client))
        .trial_store(Arc::new(store))
        .identity(Arc::new(identity))
        .build();

    session.select_document(document);
    for (index, question) in cmd.questions.iter().enumerate() {
        if index > 0 {
            session.add_question();
        }
        session.update_question(index, question)?;
    }

    match session.ask().await? {
        AskOutcome::Answered(answers) => {
            for (question, answer) in answers.iter() {
                println!("Q: {question}");
                if answer.is_empty() {
                    println!("  A: (no answer returned)");
                } else {
                    println!("  A: {answer}");
                }
                println!();
            }
            Ok(())
        }
        AskOutcome::Denied => {
            anyhow::bail!(
                "The free trial has already been used on this machine; pass --token to continue"
            )
        }
        AskOutcome::Busy | AskOutcome::Superseded => {
            anyhow::bail!("The session is already processing a request")
        }
    }
}

/// Handles the trial command by reporting the durable flag.
fn handle_trial() -> Result<()> {
    let config = Config::from_env();
    let store = open_store(&config)?;
    let gate = TrialGate::new(Arc::new(store));

    if gate.consumed().context("Failed to read trial state")? {
        println!("Anonymous trial: used");
    } else {
        println!("Anonymous trial: available");
    }
    Ok(())
}

/// Opens the trial store at the configured or default location.
fn open_store(config: &Config) -> Result<SqliteTrialStore> {
    match &config.trial_store_path {
        Some(path) => SqliteTrialStore::open(path),
        None => SqliteTrialStore::open_default(),
    }
    .context("Failed to open trial store")
}

/// Maps a file extension to the MIME type the backend expects.
///
/// Unknown extensions map to a type the upload validator rejects, which
/// turns into a user-facing validation error.
fn mime_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("doc") => "application/msword",
        _ => "application/octet-stream",
    }
    .to_string()
}
