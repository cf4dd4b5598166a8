use std::time::Duration;

use clap::Args;

use hoard_daemon::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("invalid daemon URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:     {}", state.hoard_dir.display()));
                lines.push("  config.toml:   OK".to_string());
                lines.push("  db.sqlite:     OK".to_string());
                lines.push(format!("  port:          {}", state.config.port));
                lines.push(format!("  max_file_size: {}", state.config.max_file_size));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Probe the daemon's status routes
        let base = ctx.remote()?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for endpoint in ["livez", "readyz"] {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), endpoint);
            let line = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => format!("  {endpoint}: OK"),
                Ok(resp) => format!("  {endpoint}: UNHEALTHY ({})", resp.status()),
                Err(_) => format!("  {endpoint}: NOT REACHABLE"),
            };
            lines.push(line);
        }

        Ok(lines.join("\n"))
    }
}
