//! # Stamp Scanner Kiosk Entry Point
//!
//! ```text
//! stampscan-kiosk [CONFIG]
//!
//!   CONFIG   path to scanner.toml (default: platform config directory)
//! ```
//!
//! Exits non-zero when the configuration is incomplete or invalid.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    stampscan_kiosk::init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);

    match stampscan_kiosk::run(config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, config = e.is_config_error(), "Kiosk stopped");
            eprintln!("stampscan-kiosk: {e}");
            ExitCode::FAILURE
        }
    }
}
