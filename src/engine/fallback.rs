//! Stand-in engine used when no native library could be loaded.
//!
//! Resolution never fails loudly; the failure is carried here and reported
//! the first time anyone tries to use the engine.

use super::{EngineBinding, EngineHandle};
use crate::error::{DtlnError, ResolutionFailureKind, Result};

/// Engine binding whose every operation fails with the resolution diagnosis
#[derive(Debug, Clone)]
pub struct FallbackEngine {
    kind: ResolutionFailureKind,
    detail: String,
}

impl FallbackEngine {
    pub fn new(kind: ResolutionFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ResolutionFailureKind {
        self.kind
    }

    fn error(&self) -> DtlnError {
        DtlnError::ResolutionFailure {
            kind: self.kind,
            detail: self.detail.clone(),
        }
    }
}

impl EngineBinding for FallbackEngine {
    fn create(&self) -> Result<EngineHandle> {
        Err(self.error())
    }

    fn process(
        &self,
        _handle: &mut EngineHandle,
        _input: &[f32],
        _output: &mut [f32],
    ) -> Result<bool> {
        Err(self.error())
    }

    fn stop(&self, _handle: EngineHandle) -> Result<()> {
        Err(self.error())
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
