use clap::Args;

use hoard_daemon::files::FileError;
use hoard_daemon::service_state::StateSetupError;
use hoard_daemon::state::{AppState, StateError};
use hoard_daemon::{ServiceConfig, ServiceState};

/// Remove expired files once and exit.
#[derive(Args, Debug, Clone)]
pub struct Reap;

#[derive(Debug, thiserror::Error)]
pub enum ReapError {
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("setup failed: {0}")]
    Setup(#[from] StateSetupError),

    #[error("sweep failed: {0}")]
    Sweep(#[from] FileError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Reap {
    type Error = ReapError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let config =
            ServiceConfig::from_app_config(&state.config, state.db_path.clone(), state.blobs_path);

        let service = ServiceState::from_config(&config).await?;
        let removed = service.access().reap_expired().await?;

        Ok(format!("removed {} expired file(s)", removed))
    }
}
