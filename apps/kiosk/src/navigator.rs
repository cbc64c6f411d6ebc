//! # Logging Navigator
//!
//! Navigation sink for the kiosk: logs each outcome and writes it to stdout
//! as one JSON line.
//!
//! ```json
//! {"outcome":"proceed","route":"/quiz","stampNo":"QR-ABC-001","quiz":{...}}
//! {"outcome":"fail","route":"/scan/fail"}
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::{info, warn};

use stampscan_core::{QuizCard, StampRecord};
use stampscan_session::NavigationSink;

/// One navigation as written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationEvent {
    #[serde(rename_all = "camelCase")]
    Proceed {
        route: String,
        stamp_no: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        quiz: Option<QuizCard>,
    },
    Fail {
        route: String,
    },
}

/// Prints navigations and wakes whoever waits for the scan to finish.
#[derive(Default)]
pub struct LoggingNavigator {
    history: Mutex<Vec<NavigationEvent>>,
    navigated: Notify,
}

impl LoggingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the next navigation.
    pub async fn navigated(&self) {
        self.navigated.notified().await;
    }

    /// Every navigation so far.
    pub fn history(&self) -> Vec<NavigationEvent> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn emit(&self, event: NavigationEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to serialize navigation"),
        }

        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
        self.navigated.notify_one();
    }
}

#[async_trait]
impl NavigationSink for LoggingNavigator {
    async fn proceed(&self, route: &str, record: &StampRecord) {
        let quiz = QuizCard::from_record(record);
        info!(
            route,
            stamp_no = %record.stamp_no,
            has_quiz = quiz.is_some(),
            "Navigating to stamp"
        );

        self.emit(NavigationEvent::Proceed {
            route: route.to_string(),
            stamp_no: record.stamp_no.clone(),
            quiz,
        });
    }

    async fn fail(&self, route: &str) {
        info!(route, "Navigating to failure page");
        self.emit(NavigationEvent::Fail {
            route: route.to_string(),
        });
    }
}
