//! Error types for waypost-core.
//!
//! Every failure is caught at the boundary of the operation that produced it
//! and turned into a user-visible status string with [`Error::user_message`].
//! None of them terminate the process or leave the tracking state machine in
//! an undefined state.
//!
//! # Recovery
//!
//! | Error | Fatal to | Recovery |
//! |-------|----------|----------|
//! | [`Error::NotAuthorized`] | the `start` call | operator signs in |
//! | [`Error::CapabilityUnavailable`] | the `start` call | none on this platform |
//! | [`Error::AlreadyActive`] | the `start` call | `stop` first |
//! | [`Error::PermissionDenied`] | the session (back to Idle) | grant permission, start again |
//! | [`Error::TransientAcquisitionFailure`] | nothing | next tick |
//! | [`Error::StoreWriteFailure`] | nothing, the sample is lost | next tick |
//! | [`Error::StoreSubscriptionFailure`] | the subscription | resubscribe (store policy) |

use thiserror::Error;

/// Why a positioning request was refused or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DenialReason {
    /// The environment disables positioning through a permissions policy.
    PolicyDisabled,
    /// Any other failure (denied by the user, timeout, unavailable fix).
    Other,
}

impl DenialReason {
    /// Classify a positioning error by its message.
    pub fn classify(err: &waypost_types::PositionError) -> Self {
        if err.is_policy_denial() {
            Self::PolicyDisabled
        } else {
            Self::Other
        }
    }
}

/// Errors produced by the tracking core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
    /// No operator identity is present.
    #[error("Not authorized: no operator is signed in")]
    NotAuthorized,

    /// No positioning capability exists on this platform.
    #[error("Positioning capability unavailable")]
    CapabilityUnavailable,

    /// A tracking session is already requesting permission or tracking.
    #[error("Tracking is already active")]
    AlreadyActive,

    /// The initial positioning request was refused or failed.
    #[error("Positioning permission denied: {message}")]
    PermissionDenied {
        reason: DenialReason,
        message: String,
    },

    /// A single repeating acquisition failed; tracking continues.
    #[error("Positioning failed: {message}")]
    TransientAcquisitionFailure {
        reason: DenialReason,
        message: String,
    },

    /// Appending a record failed; the sample is dropped.
    #[error("Failed to save location: {0}")]
    StoreWriteFailure(String),

    /// The history subscription reported an error.
    #[error("History subscription failed: {0}")]
    StoreSubscriptionFailure(String),

    /// The positioning source returned an unusable sample.
    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] waypost_types::ParseError),

    /// The operation was interrupted by `stop`.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

const POLICY_MESSAGE: &str = "Positioning is disabled in this environment due to a permissions \
     policy. Real-time tracking is not possible here.";

impl Error {
    /// Build the error for a failed initial request.
    pub fn permission_denied(err: &waypost_types::PositionError) -> Self {
        Self::PermissionDenied {
            reason: DenialReason::classify(err),
            message: err.message.clone(),
        }
    }

    /// Build the error for a failed repeating request.
    pub fn transient(err: &waypost_types::PositionError) -> Self {
        Self::TransientAcquisitionFailure {
            reason: DenialReason::classify(err),
            message: err.message.clone(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the failure came from an environment permissions policy.
    pub fn is_policy_denial(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied {
                reason: DenialReason::PolicyDisabled,
                ..
            } | Self::TransientAcquisitionFailure {
                reason: DenialReason::PolicyDisabled,
                ..
            }
        )
    }

    /// The text shown to the operator for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthorized => "Please log in to start tracking.".to_string(),
            Self::CapabilityUnavailable => {
                "Positioning is not supported on this platform.".to_string()
            }
            Self::AlreadyActive => "Tracking is already running.".to_string(),
            Self::PermissionDenied {
                reason: DenialReason::PolicyDisabled,
                ..
            }
            | Self::TransientAcquisitionFailure {
                reason: DenialReason::PolicyDisabled,
                ..
            } => POLICY_MESSAGE.to_string(),
            Self::PermissionDenied { message, .. } => {
                format!("Positioning error: {message}. Please enable location services.")
            }
            Self::TransientAcquisitionFailure { message, .. } => {
                format!("Positioning error: {message}")
            }
            Self::StoreWriteFailure(_) => "Failed to save location data.".to_string(),
            Self::StoreSubscriptionFailure(_) => "Failed to load location history.".to_string(),
            Self::InvalidSample(e) => format!("Positioning error: {e}"),
            Self::Cancelled => "Tracking was stopped.".to_string(),
            Self::InvalidConfig(msg) => format!("Invalid configuration: {msg}"),
        }
    }
}

/// Errors reported by a store capability.
///
/// `Clone` so that subscription errors can travel through watch channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// An append could not be persisted.
    #[error("write failed: {0}")]
    Write(String),

    /// The ordered subscription failed.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// The store was shut down.
    #[error("store closed")]
    Closed,
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Write(msg) => Error::StoreWriteFailure(msg),
            other => Error::StoreSubscriptionFailure(other.to_string()),
        }
    }
}

/// Result type alias using waypost-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use waypost_types::PositionError;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::NotAuthorized.to_string(),
            "Not authorized: no operator is signed in"
        );
        let err = Error::StoreWriteFailure("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
        let err = Error::invalid_config("period must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: period must be > 0"
        );
    }

    #[test]
    fn test_policy_denial_messages_match() {
        let policy = PositionError::new("disabled by permissions policy");
        let initial = Error::permission_denied(&policy);
        let repeating = Error::transient(&policy);
        assert!(initial.is_policy_denial());
        assert!(repeating.is_policy_denial());
        assert_eq!(initial.user_message(), repeating.user_message());
        assert!(initial.user_message().contains("permissions policy"));
    }

    #[test]
    fn test_generic_denial_messages() {
        let generic = PositionError::new("User denied Geolocation");
        let initial = Error::permission_denied(&generic);
        assert!(!initial.is_policy_denial());
        assert_eq!(
            initial.user_message(),
            "Positioning error: User denied Geolocation. Please enable location services."
        );
        let repeating = Error::transient(&generic);
        assert_eq!(
            repeating.user_message(),
            "Positioning error: User denied Geolocation"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: Error = StoreError::Write("locked".to_string()).into();
        assert!(matches!(err, Error::StoreWriteFailure(ref m) if m == "locked"));
        assert_eq!(err.user_message(), "Failed to save location data.");

        let err: Error = StoreError::Subscription("gone".to_string()).into();
        assert!(matches!(err, Error::StoreSubscriptionFailure(_)));
        let err: Error = StoreError::Closed.into();
        assert!(matches!(err, Error::StoreSubscriptionFailure(_)));
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = waypost_types::ParseError::InvalidValue("bad".to_string());
        let err: Error = parse.into();
        assert!(matches!(err, Error::InvalidSample(_)));
    }
}
