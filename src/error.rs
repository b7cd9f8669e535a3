//! Error handling for Stemmix
//!
//! Decode failures are per-track and non-fatal: the track is recorded as
//! unavailable and downstream consumers treat it as absent. Context failures
//! abort the operation in progress and are surfaced for an explicit retry.

use thiserror::Error;

/// Result type alias for Stemmix operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for Stemmix operations
#[derive(Error, Debug)]
pub enum EngineError {
    // Ingest Errors
    #[error("Decode failure: {reason}")]
    DecodeFailure { reason: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio { reason: String },

    // Context / Resource Errors
    #[error("Audio context failure: {reason}")]
    ContextFailure { reason: String },

    #[error("Context resume rejected (autoplay gate)")]
    ResumeFailure,

    // Render Errors
    #[error("No tracks selected for render")]
    NoTracksSelected,

    // Parameter Errors
    #[error("Invalid parameter {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Track not found: {id}")]
    TrackNotFound { id: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::DecodeFailure { .. } => "DECODE_FAILURE",
            EngineError::InvalidAudio { .. } => "INVALID_AUDIO",
            EngineError::ContextFailure { .. } => "CONTEXT_FAILURE",
            EngineError::ResumeFailure => "RESUME_FAILURE",
            EngineError::NoTracksSelected => "NO_TRACKS_SELECTED",
            EngineError::InvalidParameter { .. } => "INVALID_PARAMETER",
            EngineError::TrackNotFound { .. } => "TRACK_NOT_FOUND",
            EngineError::Io(_) => "IO_ERROR",
            EngineError::Wav(_) => "WAV_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable without user intervention
    ///
    /// Decode failures leave the track present-but-silent; resume failures
    /// are retried transparently on the next user interaction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::DecodeFailure { .. }
                | EngineError::ResumeFailure
                | EngineError::NoTracksSelected
        )
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            EngineError::DecodeFailure { reason } => {
                format!(
                    "This stem couldn't be decoded ({}). It will stay in the mixer but won't play.",
                    reason
                )
            }
            EngineError::ContextFailure { reason } => {
                format!(
                    "The audio engine ran out of resources: {}. Try a shorter mix or fewer tracks, then retry.",
                    reason
                )
            }
            EngineError::NoTracksSelected => {
                "Nothing to export: every selected track is empty or still loading.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EngineError::DecodeFailure {
            reason: "truncated payload".to_string(),
        };
        assert_eq!(err.error_code(), "DECODE_FAILURE");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_context_failure_not_recoverable() {
        let err = EngineError::ContextFailure {
            reason: "render too long".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.friendly_message().contains("retry"));
    }
}
