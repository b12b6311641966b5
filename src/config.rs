use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Playlist service for a signage device.
///
/// Every option can also come from the environment, or from a `.env` file in the working
/// directory.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Address the HTTP API listens on.
    #[arg(long, env = "SIGNAGE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// SQLite database file holding the assets.
    #[arg(long, env = "SIGNAGE_DATABASE", default_value = "signage.db")]
    pub database: PathBuf,

    /// Directory of locally stored asset files. Files under it are removed together
    /// with their asset.
    #[arg(long, env = "SIGNAGE_ASSET_DIR", default_value = "assets")]
    pub asset_dir: PathBuf,

    /// Upper bound for the reachability check of an asset uri.
    #[arg(long, env = "SIGNAGE_CHECK_TIMEOUT_SECS", default_value_t = 10)]
    pub check_timeout_secs: u64,

    /// Emit logs as JSON lines.
    #[arg(long, env = "SIGNAGE_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}
