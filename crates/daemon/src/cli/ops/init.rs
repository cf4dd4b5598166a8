use clap::Args;

use hoard_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Largest accepted upload in bytes (default 256 MiB)
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Retention in hours for files at the size limit
    #[arg(long)]
    pub min_expiration_hours: Option<u64>,

    /// Retention in hours for the smallest files
    #[arg(long)]
    pub max_expiration_hours: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            port: self.port,
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            min_expiration_hours: self
                .min_expiration_hours
                .unwrap_or(defaults.min_expiration_hours),
            max_expiration_hours: self
                .max_expiration_hours
                .unwrap_or(defaults.max_expiration_hours),
            ..defaults
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized hoard directory at: {}\n\
             - Database: {}\n\
             - Blobs: {}\n\
             - Config: {}\n\
             - Port: {}\n\
             - Max file size: {} bytes\n\
             - Retention: {}h to {}h",
            state.hoard_dir.display(),
            state.db_path.display(),
            state.blobs_path.display(),
            state.config_path.display(),
            state.config.port,
            state.config.max_file_size,
            state.config.min_expiration_hours,
            state.config.max_expiration_hours,
        );

        Ok(output)
    }
}
