//! # Scanner Configuration
//!
//! Configuration for the scan engine, validated once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STAMPSCAN_QR_PREFIX=QR-                                            │
//! │     STAMPSCAN_USE_MOCK_DATA=true                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stampscan/scanner.toml (Linux)                           │
//! │     ~/Library/Application Support/org.stamprally.stampscan/... (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Only for optional entries. Prefix and routes have NO default:      │
//! │     a missing entry stops the process at startup.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [scan]
//! required_prefix = "QR-"
//! settle_delay_ms = 100
//!
//! [routes]
//! success = "/quiz"
//! failure = "/scan/fail"
//!
//! [resolver]
//! mock_mode = true
//! fixture_path = "data/stamps.json"
//! # base_address = "https://api.example.org"   # required unless mock_mode
//!
//! [preferences]
//! key = "preferredBackCameraId"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use stampscan_core::validation::{validate_prefix, validate_route};
use stampscan_core::{DEFAULT_SETTLE_DELAY_MS, PREFERRED_CAMERA_KEY};

use crate::error::{SessionError, SessionResult};

/// Fixture file used in mock mode when none is configured.
pub const DEFAULT_FIXTURE_PATH: &str = "data/stamps.json";

/// Upper bound for the settling delay. Anything longer is a typo.
const MAX_SETTLE_DELAY_MS: u64 = 5_000;

// =============================================================================
// File Sections
// =============================================================================

/// `[scan]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    /// Decoded payloads must start with this.
    #[serde(default)]
    pub required_prefix: Option<String>,

    /// Pause after releasing the camera before reopening it.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

fn default_settle_delay() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

impl Default for ScanSection {
    fn default() -> Self {
        ScanSection {
            required_prefix: None,
            settle_delay_ms: default_settle_delay(),
        }
    }
}

/// `[routes]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteSection {
    /// Where a resolved stamp goes.
    #[serde(default)]
    pub success: Option<String>,

    /// Where everything else goes.
    #[serde(default)]
    pub failure: Option<String>,
}

/// `[resolver]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverSection {
    /// Serve stamps from fixture data instead of the backend.
    #[serde(default)]
    pub mock_mode: bool,

    /// Backend base address. Required unless `mock_mode`.
    #[serde(default)]
    pub base_address: Option<String>,

    /// Fixture file for mock mode.
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

/// `[preferences]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceSection {
    /// Preference file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Key the preferred camera id is stored under.
    #[serde(default = "default_preference_key")]
    pub key: String,
}

fn default_preference_key() -> String {
    PREFERRED_CAMERA_KEY.to_string()
}

impl Default for PreferenceSection {
    fn default() -> Self {
        PreferenceSection {
            path: None,
            key: default_preference_key(),
        }
    }
}

/// The config file as written on disk. Every required entry is optional
/// here so environment variables can supply it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: ScanSection,

    #[serde(default)]
    pub routes: RouteSection,

    #[serde(default)]
    pub resolver: ResolverSection,

    #[serde(default)]
    pub preferences: PreferenceSection,
}

impl ConfigFile {
    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(prefix) = std::env::var("STAMPSCAN_QR_PREFIX") {
            debug!(prefix = %prefix, "Overriding payload prefix from environment");
            self.scan.required_prefix = Some(prefix);
        }

        if let Ok(route) = std::env::var("STAMPSCAN_SUCCESS_ROUTE") {
            self.routes.success = Some(route);
        }

        if let Ok(route) = std::env::var("STAMPSCAN_FAILURE_ROUTE") {
            self.routes.failure = Some(route);
        }

        if let Ok(flag) = std::env::var("STAMPSCAN_USE_MOCK_DATA") {
            match flag.to_lowercase().parse::<bool>() {
                Ok(mock) => self.resolver.mock_mode = mock,
                Err(_) => warn!(value = %flag, "Ignoring non-boolean STAMPSCAN_USE_MOCK_DATA"),
            }
        }

        if let Ok(url) = std::env::var("STAMPSCAN_API_BASE_URL") {
            debug!(url = %url, "Overriding resolver base address from environment");
            self.resolver.base_address = Some(url);
        }

        if let Ok(path) = std::env::var("STAMPSCAN_FIXTURE_PATH") {
            self.resolver.fixture_path = Some(PathBuf::from(path));
        }

        if let Ok(delay) = std::env::var("STAMPSCAN_SETTLE_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(ms) => self.scan.settle_delay_ms = ms,
                Err(_) => warn!(value = %delay, "Ignoring non-numeric STAMPSCAN_SETTLE_DELAY_MS"),
            }
        }

        if let Ok(path) = std::env::var("STAMPSCAN_PREFERENCES_PATH") {
            self.preferences.path = Some(PathBuf::from(path));
        }
    }
}

// =============================================================================
// Resolver Mode
// =============================================================================

/// Where decoded payloads are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverMode {
    /// Static fixture data.
    Mock { fixture_path: PathBuf },
    /// The stamp backend at this address.
    Remote { base_address: Url },
}

// =============================================================================
// Validated Configuration
// =============================================================================

/// Complete, validated scanner configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Decoded payloads must start with this.
    pub required_prefix: String,

    /// Pause between camera release and re-acquisition.
    pub settle_delay: Duration,

    /// Route for a resolved stamp.
    pub success_route: String,

    /// Route for rejected, unknown, or unreachable payloads.
    pub failure_route: String,

    /// Resolver backing.
    pub resolver: ResolverMode,

    /// Preference file override.
    pub preferences_path: Option<PathBuf>,

    /// Preference key.
    pub preference_key: String,
}

impl ScanConfig {
    /// Builds a mock-mode config, mostly for tests and the kiosk harness.
    pub fn mock(
        required_prefix: impl Into<String>,
        success_route: impl Into<String>,
        failure_route: impl Into<String>,
    ) -> Self {
        ScanConfig {
            required_prefix: required_prefix.into(),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            success_route: success_route.into(),
            failure_route: failure_route.into(),
            resolver: ResolverMode::Mock {
                fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            },
            preferences_path: None,
            preference_key: PREFERRED_CAMERA_KEY.to_string(),
        }
    }

    /// Loads configuration from file and environment, then validates it.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut file = ConfigFile::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                file = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using environment only");
            }
        }

        file.apply_env_overrides();

        Self::from_file(file)
    }

    /// Parses a config from TOML text without consulting the environment.
    pub fn from_toml(contents: &str) -> SessionResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Self::from_file(file)
    }

    /// Validates raw file contents into a config.
    pub fn from_file(file: ConfigFile) -> SessionResult<Self> {
        let required_prefix = file
            .scan
            .required_prefix
            .ok_or(SessionError::MissingEntry("scan.required_prefix"))?;
        let success_route = file
            .routes
            .success
            .ok_or(SessionError::MissingEntry("routes.success"))?;
        let failure_route = file
            .routes
            .failure
            .ok_or(SessionError::MissingEntry("routes.failure"))?;

        let resolver = if file.resolver.mock_mode {
            ResolverMode::Mock {
                fixture_path: file
                    .resolver
                    .fixture_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_PATH)),
            }
        } else {
            let raw = file
                .resolver
                .base_address
                .filter(|s| !s.trim().is_empty())
                .ok_or(SessionError::MissingEntry("resolver.base_address"))?;
            ResolverMode::Remote {
                base_address: Url::parse(&raw)?,
            }
        };

        let config = ScanConfig {
            required_prefix,
            settle_delay: Duration::from_millis(file.scan.settle_delay_ms),
            success_route,
            failure_route,
            resolver,
            preferences_path: file.preferences.path,
            preference_key: file.preferences.key,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        validate_prefix(&self.required_prefix)?;
        validate_route("routes.success", &self.success_route)?;
        validate_route("routes.failure", &self.failure_route)?;

        if self.settle_delay > Duration::from_millis(MAX_SETTLE_DELAY_MS) {
            return Err(SessionError::InvalidConfig(format!(
                "settle_delay_ms must be at most {}",
                MAX_SETTLE_DELAY_MS
            )));
        }

        if let ResolverMode::Remote { base_address } = &self.resolver {
            if !matches!(base_address.scheme(), "http" | "https") {
                return Err(SessionError::InvalidUrl(format!(
                    "Resolver base address must be http:// or https://, got: {}",
                    base_address
                )));
            }
        }

        if self.preference_key.trim().is_empty() {
            return Err(SessionError::InvalidConfig(
                "preferences.key must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "stamprally", "stampscan")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns true if stamps come from fixture data.
    pub fn mock_mode(&self) -> bool {
        matches!(self.resolver, ResolverMode::Mock { .. })
    }

    /// Returns the backend address when not in mock mode.
    pub fn base_address(&self) -> Option<&Url> {
        match &self.resolver {
            ResolverMode::Remote { base_address } => Some(base_address),
            ResolverMode::Mock { .. } => None,
        }
    }
}
