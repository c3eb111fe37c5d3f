//! IONOS ACME webhook CLI
//!
//! Runs single challenge operations against the live IONOS API, or the
//! conformance DNS responder over a seeded in-memory provider.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ChallengeCommand, ServeDnsCommand};
use ionos_solver::ChallengeAction;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "IONOS_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "IONOS_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    /// API group the solver is registered under
    #[arg(long, env = "GROUP_NAME", global = true)]
    group_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the TXT record for a challenge request
    Present(ChallengeCommand),
    /// Remove the TXT record for a challenge request
    Cleanup(ChallengeCommand),
    /// Serve the conformance DNS responder over an in-memory provider
    ServeDns(ServeDnsCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.clone();

    // If RUST_LOG is set, use it directly; otherwise scope our level to the
    // solver crates and keep HTTP internals at warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "ionos_webhook={level},\
             ionos_solver={level},\
             hyper=warn,\
             hyper_util=warn,\
             reqwest=warn,\
             rustls=warn",
            level = log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    let group_name = match cli.group_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => anyhow::bail!("GROUP_NAME must be specified"),
    };
    info!("Starting solver under API group {}", group_name);

    match cli.command {
        Commands::Present(cmd) => cmd.execute(ChallengeAction::Present),
        Commands::Cleanup(cmd) => cmd.execute(ChallengeAction::CleanUp),
        Commands::ServeDns(cmd) => cmd.execute(),
    }
}
