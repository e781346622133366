mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quiz_core::model::{DatasetId, Subject};
use services::{
    Clock, CredentialOutcome, CredentialService, DataSetSelector, HttpCollaborators, HttpConfig,
    QuestionSetShuffler, SessionController,
};
use storage::repository::Storage;

use terminal::{Console, TerminalPrompt};

#[derive(Parser)]
#[command(name = "quiz", version, about = "Terminal client for the quiz backend")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// SQLite database holding client state (the selected question set)
    #[arg(
        long,
        global = true,
        env = "QUIZ_DB_URL",
        default_value = "sqlite://quiz-client.sqlite3"
    )]
    db: String,

    /// Backend base URL (overrides QUIZ_API_BASE_URL)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Per-request timeout in seconds (overrides QUIZ_API_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the question sets offered by the backend
    Sets,
    /// Select the question set used by later commands
    Select { name: String },
    /// Show the selected set and AI grading status
    Status,
    /// Configure the AI grading key
    Key {
        /// Remove the stored key instead of setting one
        #[arg(long)]
        clear: bool,
    },
    /// Take a quiz from the selected set
    Take {
        /// Subject to draw questions from; `all` for every subject
        #[arg(long, default_value = "all")]
        subject: String,
        /// Fixed shuffle seed, for reproducible question order
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| format!("invalid --db value: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(format!("invalid --db value: {db_url}").into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr; stdout belongs to the quiz.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut draft = HttpConfig::from_env();
    if args.api_base.is_some() {
        draft.base_url = args.api_base;
    }
    if args.timeout_secs.is_some() {
        draft.call_timeout_secs = args.timeout_secs;
    }
    let settings = draft.validate().map_err(quiz_core::Error::from)?;
    let call_timeout = settings.call_timeout();
    let http = Arc::new(HttpCollaborators::new(settings)?);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = normalize_sqlite_url(args.db);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;

    let clock = Clock::default();
    let selector = Arc::new(
        DataSetSelector::new(http.clone(), storage.client_state.clone(), clock)
            .with_call_timeout(call_timeout),
    );
    selector.restore().await?;

    let console = Console::shared();
    let prompt = Arc::new(TerminalPrompt::new(console.clone()));
    let credentials = CredentialService::new(http.clone(), prompt);

    match args.command {
        Command::Sets => {
            let active = selector.active();
            for set in selector.list().await? {
                let marker = if active.as_ref() == Some(&set) { '*' } else { ' ' };
                println!("{marker} {set}  ({})", set.display_name());
            }
        }
        Command::Select { name } => {
            let id = DatasetId::parse(name).map_err(quiz_core::Error::from)?;
            selector.select(id.clone()).await?;
            println!("Selected {} ({}).", id, id.display_name());
        }
        Command::Status => {
            match selector.active() {
                Some(id) => println!("Question set: {} ({})", id, id.display_name()),
                None => println!("Question set: none selected"),
            }
            match credentials.status().await {
                Ok(status) if status.ai_grading_enabled => println!("AI grading: enabled"),
                Ok(_) => println!("AI grading: disabled"),
                Err(err) => println!("AI grading: unknown ({err})"),
            }
        }
        Command::Key { clear: true } => {
            credentials.clear().await?;
            println!("AI grading key cleared.");
        }
        Command::Key { clear: false } => {
            if let Some(key) = console.lock().await.read_secret().await? {
                credentials.set_key(&key).await?;
                println!("AI grading key saved.");
            } else {
                println!("No key entered.");
            }
        }
        Command::Take { subject, seed } => {
            if credentials.ensure_configured().await? == CredentialOutcome::Skipped {
                println!("Continuing without AI grading.");
            }
            let shuffler =
                seed.map_or_else(QuestionSetShuffler::from_entropy, QuestionSetShuffler::seeded);
            let controller = SessionController::new(selector, http.clone(), http.clone(), http)
                .with_clock(clock)
                .with_shuffler(shuffler)
                .with_call_timeout(call_timeout);
            terminal::take_quiz(controller, Subject::new(subject), console).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(args).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
