//! Mock engine for testing
//!
//! Doesn't denoise anything. It halves every sample and adds a small
//! per-session offset that grows with each frame, so outputs depend on the
//! session's history the way a recurrent model's would. Every call is
//! recorded for inspection.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{EngineBinding, EngineHandle, FRAME_SIZE};
use crate::error::{DtlnError, Result};

/// Offset added per frame already seen by a session
pub const MOCK_STATE_STEP: f32 = 0.001;

/// One recorded `process` call
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCall {
    pub handle: usize,
    pub input: Vec<f32>,
    pub starved: bool,
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: usize,
    /// Frames seen per live session
    sessions: HashMap<usize, usize>,
    calls: Vec<FrameCall>,
    stopped: Vec<usize>,
}

/// Deterministic in-memory engine
#[derive(Debug)]
pub struct MockEngine {
    frame_size: usize,
    starve_every: Option<usize>,
    fail_on_call: Option<usize>,
    state: Mutex<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_frame_size(FRAME_SIZE)
    }

    /// A mock trained for a non-default frame size
    pub fn with_frame_size(frame_size: usize) -> Self {
        Self {
            frame_size,
            starve_every: None,
            fail_on_call: None,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Report starvation on every `n`th frame of each session
    pub fn starve_every(mut self, n: usize) -> Self {
        self.starve_every = Some(n);
        self
    }

    /// Fail the `n`th `process` call (1-based, counted across sessions)
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All recorded `process` calls, in order
    pub fn calls(&self) -> Vec<FrameCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of sessions created so far
    pub fn created(&self) -> usize {
        self.state().next_handle
    }

    /// Raw handles passed to `stop`, in order
    pub fn stopped(&self) -> Vec<usize> {
        self.state().stopped.clone()
    }

    pub fn live_sessions(&self) -> usize {
        self.state().sessions.len()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBinding for MockEngine {
    fn create(&self) -> Result<EngineHandle> {
        let mut state = self.state();
        state.next_handle += 1;
        let raw = state.next_handle;
        state.sessions.insert(raw, 0);

        NonZeroUsize::new(raw)
            .map(EngineHandle::from_raw)
            .ok_or_else(|| DtlnError::EngineInvocation {
                operation: "create",
                reason: "mock handle counter wrapped".to_string(),
            })
    }

    fn process(
        &self,
        handle: &mut EngineHandle,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<bool> {
        for len in [input.len(), output.len()] {
            if len != self.frame_size {
                return Err(DtlnError::FrameSizeMismatch {
                    expected: self.frame_size,
                    actual: len,
                });
            }
        }

        let mut state = self.state();
        let call_number = state.calls.len() + 1;
        if self.fail_on_call == Some(call_number) {
            return Err(DtlnError::EngineInvocation {
                operation: "process",
                reason: format!("mock failure on call {}", call_number),
            });
        }

        let raw = handle.as_raw();
        let seen = state
            .sessions
            .get_mut(&raw)
            .ok_or_else(|| DtlnError::EngineInvocation {
                operation: "process",
                reason: format!("unknown session {}", raw),
            })?;
        let offset = *seen as f32 * MOCK_STATE_STEP;
        *seen += 1;
        let starved = self.starve_every.is_some_and(|n| n > 0 && *seen % n == 0);

        for (out, &sample) in output.iter_mut().zip(input) {
            *out = sample * 0.5 + offset;
        }

        state.calls.push(FrameCall {
            handle: raw,
            input: input.to_vec(),
            starved,
        });
        Ok(starved)
    }

    fn stop(&self, handle: EngineHandle) -> Result<()> {
        let mut state = self.state();
        let raw = handle.as_raw();
        if state.sessions.remove(&raw).is_none() {
            return Err(DtlnError::EngineInvocation {
                operation: "stop",
                reason: format!("unknown session {}", raw),
            });
        }
        state.stopped.push(raw);
        Ok(())
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn name(&self) -> &str {
        "mock"
    }
}
