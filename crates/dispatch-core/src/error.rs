// ── Core error types ──
//
// User-facing errors from dispatch-core. Consumers never see backend
// specifics directly; the `From<PersistenceError>` impl translates them
// into a single retryable variant tagged with the failed operation.

use thiserror::Error;

use crate::persistence::PersistenceError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Persistence errors ───────────────────────────────────────────
    #[error("Persistence failure during {operation}: {message}")]
    Persistence {
        operation: &'static str,
        message: String,
    },

    #[error("Change feed unavailable: {reason}")]
    FeedUnavailable { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unknown assignment slot: {slot}")]
    UnknownSlot { slot: String },

    #[error("Unknown officer: {officer}")]
    UnknownOfficer { officer: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn persistence(operation: &'static str, err: &PersistenceError) -> Self {
        Self::Persistence {
            operation,
            message: err.to_string(),
        }
    }

    /// The change feed could not be opened or stopped delivering.
    pub(crate) fn feed_unavailable(err: &PersistenceError) -> Self {
        Self::FeedUnavailable {
            reason: err.to_string(),
        }
    }

    /// Whether the failed operation may succeed if simply retried.
    ///
    /// Failed writes leave the snapshot rolled back, so every persistence
    /// failure is safe to retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence { .. } | Self::FeedUnavailable { .. } => true,
            Self::UnknownSlot { .. }
            | Self::UnknownOfficer { .. }
            | Self::Config { .. } => false,
        }
    }
}

impl From<PersistenceError> for CoreError {
    fn from(err: PersistenceError) -> Self {
        Self::persistence("backend call", &err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_errors_keep_operation_and_are_retryable() {
        let err = CoreError::persistence("assign", &PersistenceError::Unavailable);
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Persistence failure during assign: backend unavailable"
        );

        let rejected = CoreError::from(PersistenceError::Rejected {
            message: "row locked".into(),
        });
        assert!(rejected.is_retryable());
        assert!(rejected.to_string().ends_with("row locked"));
    }

    #[test]
    fn feed_unavailable_carries_the_backend_reason() {
        let err = CoreError::feed_unavailable(&PersistenceError::Unavailable);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Change feed unavailable: backend unavailable");
    }

    #[test]
    fn unknown_slot_is_not_retryable() {
        let err = CoreError::UnknownSlot {
            slot: "Nowhere".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Unknown assignment slot: Nowhere");
    }
}
