pub mod daemon;
pub mod health;
pub mod init;
pub mod reap;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use reap::Reap;
pub use version::Version;
