//! # stampscan-session: Scan Session Engine
//!
//! Drives the camera from "scanner screen opened" to "navigated to a quiz".
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scan Session Engine                                │
//! │                                                                         │
//! │   Host UI ──start(sink)──► ScanController ──snapshots (watch)──► Host  │
//! │                                │                                        │
//! │             ┌──────────────────┼──────────────────┐                    │
//! │             ▼                  ▼                  ▼                    │
//! │      DeviceEnumerator    DevicePreference   MediaPlatform              │
//! │      (video inputs)      (KeyValueStore)    open_stream / tracks       │
//! │                                                   │                    │
//! │                                                   ▼                    │
//! │                                 FrameDecoder ──► DecodeDispatcher      │
//! │                                                   │ first text         │
//! │                                                   ▼                    │
//! │                                            OutcomeRouter               │
//! │                                  prefix gate → PayloadResolver         │
//! │                                                   │                    │
//! │                                                   ▼                    │
//! │                                            NavigationSink              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Scanner configuration (TOML + environment)
//! - [`preference`] - Persisted camera preference
//! - [`platform`] - Camera, stream, decoder and sink seams
//! - [`enumerator`] - Video input listing
//! - [`session`] - The scan session controller
//! - [`dispatcher`] - Per-generation decode loop
//! - [`router`] - Payload gating and navigation
//! - [`resolver`] - Payload resolvers (fixture-backed)
//! - [`simulator`] - Scriptable platform for tests and the kiosk

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod dispatcher;
pub mod enumerator;
pub mod error;
pub mod platform;
pub mod preference;
pub mod resolver;
pub mod router;
pub mod session;
pub mod simulator;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ResolverMode, ScanConfig};
pub use error::{SessionError, SessionResult, StartError};
pub use platform::{FrameDecoder, MediaPlatform, MediaStream, VideoSink};
pub use preference::{DevicePreference, KeyValueStore, MemoryStore, TomlFileStore};
pub use resolver::{FixtureResolver, PayloadResolver};
pub use router::{NavigationSink, OutcomeRouter, RouteOutcome};
pub use session::{ScanController, ScanControllerBuilder};
