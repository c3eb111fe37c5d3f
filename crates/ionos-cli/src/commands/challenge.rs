use anyhow::Context;
use clap::Args;
use colored::Colorize;
use ionos_solver::{ChallengeAction, ChallengeRequest, FileSecretStore, IonosSolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Args)]
pub struct ChallengeCommand {
    /// Path to the challenge request JSON
    #[arg(long)]
    pub request: PathBuf,

    /// Directory holding secrets as <namespace>/<name>/<key>
    #[arg(long, env = "IONOS_SECRETS_DIR", default_value = "/var/run/secrets/ionos")]
    pub secrets_dir: PathBuf,
}

/// Read a challenge request from disk
pub fn read_request(path: &Path) -> anyhow::Result<ChallengeRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read challenge request {}", path.display()))?;
    let request: ChallengeRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid challenge request in {}", path.display()))?;
    Ok(request)
}

impl ChallengeCommand {
    pub fn execute(self, action: ChallengeAction) -> anyhow::Result<()> {
        let request = read_request(&self.request)?;
        if let Some(requested) = request.action {
            if requested != action {
                warn!(
                    "Request file asks for {:?} but {:?} was invoked; running {:?}",
                    requested, action, action
                );
            }
        }

        debug!("Loading secrets from {}", self.secrets_dir.display());
        let secrets = Arc::new(FileSecretStore::new(&self.secrets_dir));
        let solver = IonosSolver::ionos(secrets).context("Failed to build IONOS client")?;

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, cancelling challenge operation");
                    on_signal.cancel();
                }
            });

            match action {
                ChallengeAction::Present => solver
                    .present(&request, &cancel)
                    .await
                    .with_context(|| format!("Present failed for {}", request.resolved_fqdn)),
                ChallengeAction::CleanUp => solver
                    .cleanup(&request, &cancel)
                    .await
                    .with_context(|| format!("CleanUp failed for {}", request.resolved_fqdn)),
            }
        })?;

        let verb = match action {
            ChallengeAction::Present => "Presented",
            ChallengeAction::CleanUp => "Cleaned up",
        };
        println!(
            "{} {} {}",
            "✅".bright_green(),
            verb.bright_white().bold(),
            request.record_name().bright_cyan()
        );

        Ok(())
    }
}
