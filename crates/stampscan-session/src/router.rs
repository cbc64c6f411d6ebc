//! # Outcome Router
//!
//! Takes the one decoded text of a session to its terminal destination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Routing                                            │
//! │                                                                         │
//! │   text ──► prefix check ──✗──────────────────────► fail(failure_route) │
//! │                 │                                                       │
//! │                 ✓                                                       │
//! │                 ▼                                                       │
//! │            resolver.resolve(text)                                       │
//! │                 │                                                       │
//! │                 ├── found ───────────────► proceed(success_route, rec) │
//! │                 ├── not found ───────────► fail(failure_route)         │
//! │                 └── transport error ─────► fail(failure_route)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries. Every call ends in exactly one navigation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use stampscan_core::validation::validate_payload;
use stampscan_core::{ResolutionFailure, StampRecord};

use crate::config::ScanConfig;
use crate::resolver::PayloadResolver;

// =============================================================================
// Navigation Sink
// =============================================================================

/// Host navigation. Receives one call per scan.
#[async_trait]
pub trait NavigationSink: Send + Sync {
    /// Go to the quiz for `record`.
    async fn proceed(&self, route: &str, record: &StampRecord);

    /// Go to the "code not recognized" page.
    async fn fail(&self, route: &str);
}

/// Terminal result of one routed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Proceeded { route: String, record: StampRecord },
    Failed { route: String, reason: ResolutionFailure },
}

impl RouteOutcome {
    /// Returns true if the scan led to a stamp.
    pub fn is_success(&self) -> bool {
        matches!(self, RouteOutcome::Proceeded { .. })
    }

    /// The route navigated to.
    pub fn route(&self) -> &str {
        match self {
            RouteOutcome::Proceeded { route, .. } | RouteOutcome::Failed { route, .. } => route,
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Prefix gate, resolver call and navigation.
pub struct OutcomeRouter {
    prefix: String,
    success_route: String,
    failure_route: String,
    resolver: Arc<dyn PayloadResolver>,
    navigator: Arc<dyn NavigationSink>,
}

impl OutcomeRouter {
    pub fn new(
        prefix: impl Into<String>,
        success_route: impl Into<String>,
        failure_route: impl Into<String>,
        resolver: Arc<dyn PayloadResolver>,
        navigator: Arc<dyn NavigationSink>,
    ) -> Self {
        OutcomeRouter {
            prefix: prefix.into(),
            success_route: success_route.into(),
            failure_route: failure_route.into(),
            resolver,
            navigator,
        }
    }

    /// Builds a router from validated configuration.
    pub fn from_config(
        config: &ScanConfig,
        resolver: Arc<dyn PayloadResolver>,
        navigator: Arc<dyn NavigationSink>,
    ) -> Self {
        Self::new(
            config.required_prefix.clone(),
            config.success_route.clone(),
            config.failure_route.clone(),
            resolver,
            navigator,
        )
    }

    /// Routes one decoded text.
    pub async fn route(&self, text: &str) -> RouteOutcome {
        let payload = match validate_payload(text, &self.prefix) {
            Ok(payload) => payload,
            Err(reason) => {
                warn!(payload = %text, prefix = %self.prefix, "Payload rejected");
                return self.fail(reason).await;
            }
        };

        match self.resolver.resolve(payload).await {
            Ok(record) => {
                info!(stamp_no = %record.stamp_no, route = %self.success_route, "Stamp resolved");
                self.navigator.proceed(&self.success_route, &record).await;
                RouteOutcome::Proceeded {
                    route: self.success_route.clone(),
                    record,
                }
            }
            Err(reason) => {
                warn!(payload = %payload, error = %reason, "Resolution failed");
                self.fail(reason).await
            }
        }
    }

    async fn fail(&self, reason: ResolutionFailure) -> RouteOutcome {
        self.navigator.fail(&self.failure_route).await;
        RouteOutcome::Failed {
            route: self.failure_route.clone(),
            reason,
        }
    }
}

impl std::fmt::Debug for OutcomeRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeRouter")
            .field("prefix", &self.prefix)
            .field("success_route", &self.success_route)
            .field("failure_route", &self.failure_route)
            .finish()
    }
}
