//! Tutor CLI - run and inspect the tutor orchestrator.
//!
//! # Usage
//!
//! ```bash
//! # Run the full pipeline for a conversation context
//! tutor orchestrate --context context.json
//!
//! # Chat as a student; each stdin line is one turn
//! tutor chat --user student.json < messages.txt
//!
//! # Classify a single message
//! tutor classify "Explain photosynthesis to me"
//!
//! # Validate a parameter set against a tool schema
//! tutor validate --tool flashcard_generator --params params.json
//!
//! # List registered tools and show one schema
//! tutor tools
//! tutor schema note_maker
//! ```
//!
//! # Environment
//!
//! Configuration is read from the environment (and `.env`); see
//! `OrchestratorConfig::from_env`. `RUST_LOG` controls verbosity,
//! `LOG_FORMAT=json` switches to JSON logs, and `SENTRY_DSN` enables error
//! reporting.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "tutor")]
#[command(author, version, about = "Tutor orchestrator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a conversation context and print the outcome
    Orchestrate {
        /// Path to a JSON conversation context
        #[arg(short, long)]
        context: PathBuf,
    },
    /// Chat as a student, one message per stdin line
    Chat {
        /// Path to a JSON student profile (`user_info`)
        #[arg(short, long)]
        user: PathBuf,
    },
    /// Classify a message into an intent category
    Classify {
        /// The student's message
        message: String,
    },
    /// Sanitize and validate a parameter set for a tool
    Validate {
        /// Tool name (e.g. `note_maker`)
        #[arg(short, long)]
        tool: String,

        /// Path to a JSON object of parameters
        #[arg(short, long)]
        params: PathBuf,
    },
    /// List registered tools and their endpoints
    Tools,
    /// Print a tool's schema description
    Schema {
        /// Tool name
        tool: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|s| !s.trim().is_empty())?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tutor_orchestrator=info,tutor_cli=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // Logs on stderr, command output on stdout.
    let (json_layer, text_layer) = if json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Orchestrate { context } => commands::orchestrate::run(&context).await?,
        Commands::Chat { user } => commands::chat::run(&user).await?,
        Commands::Classify { message } => commands::classify::run(&message).await?,
        Commands::Validate { tool, params } => commands::validate::run(&tool, &params).await?,
        Commands::Tools => commands::tools::list()?,
        Commands::Schema { tool } => commands::tools::schema(&tool)?,
    }
    Ok(())
}
