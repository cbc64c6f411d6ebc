//! # Payload Resolvers
//!
//! Turns a validated payload into a stamp record.
//!
//! Only the fixture-backed resolver used in mock mode lives here. The
//! network resolver is supplied by the host application through the same
//! trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use stampscan_core::{ResolutionFailure, StampRecord};

use crate::error::{SessionError, SessionResult};

/// Resolves a decoded payload to a stamp record.
#[async_trait]
pub trait PayloadResolver: Send + Sync {
    /// Looks up `payload`.
    ///
    /// Returns `ResolverNotFound` for unknown payloads and
    /// `ResolverTransportError` when the lookup itself failed.
    async fn resolve(&self, payload: &str) -> Result<StampRecord, ResolutionFailure>;
}

/// Resolver backed by a static list of records, keyed by `stampNo`.
#[derive(Debug, Clone, Default)]
pub struct FixtureResolver {
    records: HashMap<String, StampRecord>,
}

impl FixtureResolver {
    /// Builds a resolver from records already in memory.
    ///
    /// A later record with the same `stampNo` replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = StampRecord>) -> Self {
        FixtureResolver {
            records: records
                .into_iter()
                .map(|r| (r.stamp_no.clone(), r))
                .collect(),
        }
    }

    /// Loads a JSON array of records.
    pub fn from_json(json: &str) -> SessionResult<Self> {
        let records: Vec<StampRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Loads a JSON fixture file.
    pub fn from_path(path: &Path) -> SessionResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SessionError::FixtureLoadFailed(format!("{}: {}", path.display(), e))
        })?;
        let resolver = Self::from_json(&json)?;

        info!(path = %path.display(), records = resolver.len(), "Loaded stamp fixtures");
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PayloadResolver for FixtureResolver {
    async fn resolve(&self, payload: &str) -> Result<StampRecord, ResolutionFailure> {
        match self.records.get(payload) {
            Some(record) => {
                debug!(payload, "Fixture hit");
                Ok(record.clone())
            }
            None => Err(ResolutionFailure::ResolverNotFound(payload.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {
            "stampNo": "QR-ABC-001",
            "area": "north gate",
            "quizDto": {
                "quizNo": 1,
                "quizText": "Which gate is this?",
                "option1": "North",
                "option2": "South",
                "option3": "East",
                "option4": "West",
                "answerNo": 1,
                "explanation": "You are at the north gate."
            }
        },
        { "stampNo": "QR-ABC-002" }
    ]"#;

    #[tokio::test]
    async fn test_resolves_by_exact_stamp_no() {
        let resolver = FixtureResolver::from_json(FIXTURE).unwrap();
        assert_eq!(resolver.len(), 2);

        let record = resolver.resolve("QR-ABC-001").await.unwrap();
        assert_eq!(record.stamp_no, "QR-ABC-001");
        assert!(record.quiz_dto.is_some());
        assert_eq!(record.extra["area"], "north gate");

        let err = resolver.resolve("qr-abc-001").await.unwrap_err();
        assert_eq!(err, ResolutionFailure::ResolverNotFound("qr-abc-001".into()));
    }

    #[test]
    fn test_malformed_fixture_is_config_error() {
        let err = FixtureResolver::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SessionError::FixtureLoadFailed(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_missing_fixture_file_fails_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = FixtureResolver::from_path(&dir.path().join("none.json")).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("none.json"));
    }

    #[test]
    fn test_fixture_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stamps.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let resolver = FixtureResolver::from_path(&path).unwrap();
        assert!(!resolver.is_empty());
    }
}
