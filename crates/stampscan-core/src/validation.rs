//! # Validation Module
//!
//! Input checks shared by the session engine and its configuration.
//!
//! ## Where Each Check Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Points                                  │
//! │                                                                         │
//! │  Startup (config load)                                                 │
//! │  ├── validate_prefix()      - prefix must be non-empty                 │
//! │  └── validate_route()       - routes must be non-empty                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Per decode (outcome router)                                           │
//! │  └── validate_payload()     - decoded text must carry the prefix       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Per answer (quiz gate)                                                │
//! │  └── validate_choice()      - 1-based option index                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ResolutionFailure, ValidationError, ValidationResult};

/// Number of answer options on every quiz card.
pub const OPTION_COUNT: usize = 4;

/// Checks that a decoded payload belongs to this rally.
///
/// Returns the payload unchanged so it can be used as the resolver key.
///
/// ## Example
/// ```rust
/// use stampscan_core::validation::validate_payload;
///
/// assert_eq!(validate_payload("QR-ABC-001", "QR-").unwrap(), "QR-ABC-001");
/// assert!(validate_payload("JUNK", "QR-").is_err());
/// ```
pub fn validate_payload<'a>(payload: &'a str, prefix: &str) -> Result<&'a str, ResolutionFailure> {
    if payload.starts_with(prefix) {
        Ok(payload)
    } else {
        Err(ResolutionFailure::PayloadRejected {
            payload: payload.to_string(),
            prefix: prefix.to_string(),
        })
    }
}

/// Validates the configured payload prefix.
pub fn validate_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "required_prefix".to_string(),
        });
    }

    if prefix.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "required_prefix".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a navigation route identifier.
pub fn validate_route(field: &str, route: &str) -> ValidationResult<()> {
    if route.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a 1-based quiz option index.
pub fn validate_choice(choice: usize) -> ValidationResult<usize> {
    if choice == 0 || choice > OPTION_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "choice".to_string(),
            min: 1,
            max: OPTION_COUNT as i64,
        });
    }
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_prefix_gate() {
        assert!(validate_payload("QR-ABC-001", "QR-").is_ok());
        assert!(matches!(
            validate_payload("JUNK", "QR-"),
            Err(ResolutionFailure::PayloadRejected { .. })
        ));
        // Prefix match is case-sensitive
        assert!(validate_payload("qr-abc", "QR-").is_err());
    }

    #[test]
    fn test_prefix_validation() {
        assert!(validate_prefix("QR-").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("   ").is_err());
        assert!(validate_prefix("QR\n").is_err());
    }

    #[test]
    fn test_route_validation() {
        assert!(validate_route("success_route", "/quiz").is_ok());
        let err = validate_route("failure_route", "").unwrap_err();
        assert_eq!(err.to_string(), "failure_route is required");
    }

    #[test]
    fn test_choice_range() {
        assert_eq!(validate_choice(1).unwrap(), 1);
        assert_eq!(validate_choice(4).unwrap(), 4);
        assert!(validate_choice(0).is_err());
        assert!(validate_choice(5).is_err());
    }
}
