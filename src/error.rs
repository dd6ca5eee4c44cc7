//! Error handling for dtln
//!
//! Every error carries a stable code and recovery suggestions so callers
//! (and the CLI) can tell a missing engine apart from a misused adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for dtln operations
pub type Result<T> = std::result::Result<T, DtlnError>;

/// Why no native engine could be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionFailureKind {
    /// The artifact was found but references symbols its host cannot provide
    SymbolMismatch,
    /// Missing file, permission error, wrong binary format, or anything else
    NotFound,
}

impl fmt::Display for ResolutionFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SymbolMismatch => f.write_str("SymbolMismatch"),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Main error type for dtln operations
#[derive(Error, Debug)]
pub enum DtlnError {
    // Resolution Errors
    #[error("Denoise engine unavailable ({kind}): {detail}")]
    ResolutionFailure {
        kind: ResolutionFailureKind,
        detail: String,
    },

    // Engine Errors
    #[error("Engine {operation} failed: {reason}")]
    EngineInvocation {
        operation: &'static str,
        reason: String,
    },

    #[error("Frame size mismatch: engine expects {expected} samples, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    // Adapter Errors
    #[error("Denoiser used after destroy()")]
    UseAfterDestroy,

    #[error("Unsupported frame size {requested} (engine supports {supported})")]
    UnsupportedFrameSize { requested: usize, supported: usize },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DtlnError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DtlnError::ResolutionFailure {
                kind: ResolutionFailureKind::SymbolMismatch,
                ..
            } => "ENGINE_SYMBOL_MISMATCH",
            DtlnError::ResolutionFailure {
                kind: ResolutionFailureKind::NotFound,
                ..
            } => "ENGINE_NOT_FOUND",
            DtlnError::EngineInvocation { .. } => "ENGINE_INVOCATION",
            DtlnError::FrameSizeMismatch { .. } => "FRAME_SIZE_MISMATCH",
            DtlnError::UseAfterDestroy => "USE_AFTER_DESTROY",
            DtlnError::UnsupportedFrameSize { .. } => "UNSUPPORTED_FRAME_SIZE",
            DtlnError::FileNotFound { .. } => "FILE_NOT_FOUND",
            DtlnError::InvalidAudio { .. } => "INVALID_AUDIO",
            DtlnError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            DtlnError::Io(_) => "IO_ERROR",
            DtlnError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable without restarting the process
    ///
    /// Engine failures leave the session's recurrent state undefined, so the
    /// only recovery is a fresh denoiser; they are not counted as recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DtlnError::UseAfterDestroy
                | DtlnError::UnsupportedFrameSize { .. }
                | DtlnError::FileNotFound { .. }
                | DtlnError::InvalidAudio { .. }
                | DtlnError::UnsupportedFormat { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DtlnError::ResolutionFailure {
                kind: ResolutionFailureKind::SymbolMismatch,
                ..
            } => vec![
                "The engine library was found but is not ABI compatible",
                "Rebuild the engine, linking its native dependencies statically",
                "Check that the prebuilt artifact matches this platform",
            ],
            DtlnError::ResolutionFailure {
                kind: ResolutionFailureKind::NotFound,
                ..
            } => vec![
                "Install the prebuilt engine for this platform",
                "Set DTLN_ENGINE_DIR to the directory containing the engine",
                "Build the engine locally and place it in the engine root",
            ],
            DtlnError::EngineInvocation { .. } => vec![
                "Destroy this denoiser and create a new one",
                "Engine state is undefined after a failed frame",
            ],
            DtlnError::UseAfterDestroy => vec!["Create a new denoiser for further processing"],
            DtlnError::UnsupportedFrameSize { .. } => {
                vec!["Use the default frame size of 512 samples"]
            }
            DtlnError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            DtlnError::UnsupportedFormat { .. } => vec![
                "Convert the file to 16 kHz mono WAV first",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DtlnError::ResolutionFailure {
            kind: ResolutionFailureKind::SymbolMismatch,
            detail: "undefined symbol: TfLiteModelCreate".to_string(),
        };
        assert_eq!(err.error_code(), "ENGINE_SYMBOL_MISMATCH");
        assert_eq!(DtlnError::UseAfterDestroy.error_code(), "USE_AFTER_DESTROY");
    }

    #[test]
    fn test_resolution_message_names_kind() {
        let err = DtlnError::ResolutionFailure {
            kind: ResolutionFailureKind::NotFound,
            detail: "no artifact".to_string(),
        };
        assert!(err.to_string().contains("NotFound"));
        assert!(!err.is_recoverable());
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = DtlnError::UnsupportedFrameSize {
            requested: 256,
            supported: 512,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.recovery_suggestions().len(), 1);
    }
}
