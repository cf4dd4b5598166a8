use std::path::PathBuf;

use clap::Args;

use hoard_daemon::state::{AppConfig, AppState, StateError};
use hoard_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override HTTP server port (default from config)
    #[arg(long, env = "HOARD_PORT")]
    pub port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long, env = "HOARD_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Default log level, `RUST_LOG` takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Keep everything in memory; no hoard directory required
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = if self.ephemeral {
            ServiceConfig::ephemeral(&AppConfig::default())
        } else {
            let state = AppState::load(ctx.config_path.clone())?;
            ServiceConfig::from_app_config(&state.config, state.db_path.clone(), state.blobs_path)
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        config.log_level = self.log_level;
        config.log_dir = self.log_dir.clone();

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
