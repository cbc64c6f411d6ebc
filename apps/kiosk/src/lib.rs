//! # Stamp Scanner Kiosk
//!
//! Runs the scan engine against a simulated camera, with stdin standing in
//! for the decoder.
//!
//! ## Input
//! - a non-empty line is a frame in which the decoder read that text
//! - an empty line is a frame with no code in it
//!
//! After each navigation the kiosk starts a fresh scan session.

pub mod error;
pub mod navigator;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use stampscan_session::config::ResolverMode;
use stampscan_session::simulator::{ScriptedDecoder, SimulatedPlatform};
use stampscan_session::{
    DevicePreference, FixtureResolver, KeyValueStore, MemoryStore, OutcomeRouter, ScanConfig,
    ScanController, ScanControllerBuilder, SessionError, StartError, TomlFileStore, VideoSink,
};

pub use error::{KioskError, KioskResult};
use navigator::LoggingNavigator;

/// Cameras the simulated platform reports.
const KIOSK_CAMERAS: &[(&str, &str)] = &[
    ("kiosk-front", "Front Camera"),
    ("kiosk-back", "Back Camera (environment)"),
];

/// How long to wait for a decoded frame to reach navigation.
const ROUTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the kiosk until stdin closes.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Kiosk Startup                                     │
/// │                                                                         │
/// │  1. Load Configuration ───────────────────────────────────────────────► │
/// │     • scanner.toml + STAMPSCAN_* overrides, validated                   │
/// │     • Missing required entries stop the process                         │
/// │                                                                         │
/// │  2. Build Collaborators ──────────────────────────────────────────────► │
/// │     • FixtureResolver from resolver.fixture_path                        │
/// │     • Preference file (configured path or platform data dir)            │
/// │     • Simulated camera + stdin-driven decoder                           │
/// │                                                                         │
/// │  3. Scan Loop ────────────────────────────────────────────────────────► │
/// │     • One stdin line = one frame                                        │
/// │     • Restart scanning after every navigation                           │
/// │                                                                         │
/// │  4. Dispose ──────────────────────────────────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(config_path: Option<PathBuf>) -> KioskResult<()> {
    let config = ScanConfig::load(config_path)?;
    info!(
        prefix = %config.required_prefix,
        success = %config.success_route,
        failure = %config.failure_route,
        mock = config.mock_mode(),
        "Configuration loaded"
    );

    let resolver = match &config.resolver {
        ResolverMode::Mock { fixture_path } => FixtureResolver::from_path(fixture_path)?,
        ResolverMode::Remote { base_address } => {
            return Err(KioskError::RemoteResolverUnavailable(base_address.to_string()))
        }
    };

    let preference = DevicePreference::new(open_store(&config)?, config.preference_key.clone());

    let platform = Arc::new(SimulatedPlatform::with_cameras(KIOSK_CAMERAS));
    let decoder = Arc::new(ScriptedDecoder::new());
    let navigator = Arc::new(LoggingNavigator::new());

    let router = Arc::new(OutcomeRouter::from_config(
        &config,
        Arc::new(resolver),
        navigator.clone(),
    ));

    let controller = ScanControllerBuilder::new(platform, decoder.clone(), router)
        .with_preference(preference)
        .with_settle_delay(config.settle_delay)
        .build();

    let result = scan_loop(&controller, &decoder, &navigator).await;

    controller.dispose().await;
    result
}

/// Opens the preference store the config points at.
fn open_store(config: &ScanConfig) -> KioskResult<Arc<dyn KeyValueStore>> {
    if let Some(path) = &config.preferences_path {
        return Ok(Arc::new(TomlFileStore::new(path)));
    }

    match TomlFileStore::in_data_dir() {
        Ok(store) => {
            debug!(path = ?store.path(), "Using preference file");
            Ok(Arc::new(store))
        }
        Err(SessionError::NoDataDir) => {
            warn!("No data directory; camera preference will not survive restarts");
            Ok(Arc::new(MemoryStore::new()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn scan_loop(
    controller: &ScanController,
    decoder: &ScriptedDecoder,
    navigator: &LoggingNavigator,
) -> KioskResult<()> {
    let sink = VideoSink::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    begin_scan(controller, &sink).await?;

    while let Some(line) = lines.next_line().await? {
        if !controller.snapshot().status.is_live() && !begin_scan(controller, &sink).await? {
            continue;
        }

        let Some(feed) = decoder.latest() else {
            continue;
        };

        let text = line.trim();
        if text.is_empty() {
            feed.no_result();
            continue;
        }

        feed.decoded(text);
        if tokio::time::timeout(ROUTE_TIMEOUT, navigator.navigated())
            .await
            .is_err()
        {
            warn!(payload = %text, "Scan did not reach navigation in time");
        }
    }

    info!("Input closed");
    Ok(())
}

/// Starts a session. Returns false if the camera could not be opened.
async fn begin_scan(controller: &ScanController, sink: &VideoSink) -> KioskResult<bool> {
    match controller.start(sink.clone()).await {
        Ok(generation) => {
            info!(generation, "Ready to scan");
            Ok(true)
        }
        Err(StartError::Acquisition(e)) => {
            warn!(kind = %e.kind, retryable = e.is_retryable(), "{}", e.message);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stampscan_session=trace` - Include per-frame no-result traces
/// - Default: `info,stampscan=debug`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stampscan=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
