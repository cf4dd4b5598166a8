use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
    // Largest accepted file; the request body limit is derived from it
    pub max_file_size: u64,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, max_file_size: u64) -> Self {
        tracing::info!(
            %listen_addr,
            max_file_size,
            "creating HTTP server config"
        );
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
            max_file_size,
        }
    }

    /// Request body limit: the file limit plus room for multipart framing
    /// and the small form fields.
    pub fn body_limit(&self) -> usize {
        const MULTIPART_OVERHEAD: u64 = 64 * 1024;
        let limit = self.max_file_size.saturating_add(MULTIPART_OVERHEAD);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}
