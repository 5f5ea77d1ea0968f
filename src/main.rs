use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use mentora_core::ids::UserId;
use mentora_engine::{extract_sections, Collaborators, SystemClock};
use mentora_llm::{GeminiClient, GoogleSpeech, ReliableScorer};
use mentora_server::{start, AppState, JwtVerifier, LiveSessions, ServerConfig};
use mentora_settings::{load_settings, load_settings_from_path, MentoraSettings};
use mentora_store::{Database, ExamSessionRepo};
use mentora_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "mentora", version, about = "Thesis proposal exam simulator")]
struct Cli {
    /// Settings file (defaults to ~/.mentora/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP and WebSocket server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the sections found in a proposal's extracted text as JSON.
    Extract { file: PathBuf },
    /// Mint a bearer token for local testing.
    Token {
        #[arg(long)]
        user: String,
        /// Lifetime in minutes.
        #[arg(long, default_value_t = 60)]
        ttl: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("loading settings")?;

    match cli.command {
        Command::Serve { port } => serve(settings, port).await,
        Command::Extract { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&extract_sections(&text))?);
            Ok(())
        }
        Command::Token { user, ttl } => {
            if settings.auth.jwt_secret.as_deref().filter(|s| !s.is_empty()).is_none() {
                bail!("auth.jwt_secret is not configured; a token would not verify against the server");
            }
            let verifier = JwtVerifier::from_settings(&settings.auth);
            let token = verifier.issue(&UserId::from_raw(user), Duration::from_secs(ttl * 60))?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(mut settings: MentoraSettings, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }
    let _telemetry = init_telemetry(TelemetryConfig::from(&settings.logging));

    tracing::info!("Starting Mentora server");

    let db = Database::open(&settings.storage.database_path).context("opening database")?;
    let repo = ExamSessionRepo::new(db);

    let replies = GeminiClient::new(&settings.llm).context("configuring reply model")?;
    let scorer = GeminiClient::new(&settings.llm).context("configuring scoring model")?;
    let speech = GoogleSpeech::new(&settings.speech).context("configuring speech synthesis")?;

    let state = AppState {
        verifier: Arc::new(JwtVerifier::from_settings(&settings.auth)),
        repo,
        collaborators: Collaborators {
            replies: Arc::new(replies),
            speech: Arc::new(speech),
        },
        scorer: Arc::new(ReliableScorer::with_defaults(scorer)),
        clock: Arc::new(SystemClock),
        live: Arc::new(LiveSessions::new()),
        settings: Arc::new(settings),
    };

    let config = ServerConfig::from(&state.settings.server);
    let handle = start(config, state).await.context("starting server")?;

    tracing::info!(port = handle.port, "Mentora server ready");

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl+c")?;

    handle.shutdown().await;
    Ok(())
}
