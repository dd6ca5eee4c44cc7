//! Streaming denoiser
//!
//! Lets callers push audio of any length through the fixed-frame engine.
//! Input is cut into frames in order, a short final frame is zero-padded,
//! and each output frame is trimmed back so the result is exactly as long
//! as the input.

use std::sync::Arc;

use crate::engine::{EngineBinding, EngineHandle, FRAME_SIZE};
use crate::error::{DtlnError, Result};
use crate::resolver;

/// Output of one [`StreamingDenoiser::process`] call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenoiseResult {
    /// Denoised audio, same length as the input
    pub samples: Vec<f32>,
    /// Frames the engine processed for this call
    pub frames: usize,
    /// Frames the engine flagged as slower than real time
    pub starved_frames: usize,
}

impl DenoiseResult {
    /// Whether any frame in this call starved
    pub fn processor_starved(&self) -> bool {
        self.starved_frames > 0
    }
}

/// An engine session that accepts audio of any length.
///
/// Owns exactly one engine handle. All processing goes through `&mut self`,
/// so frames reach the engine strictly in order.
pub struct StreamingDenoiser {
    binding: Arc<dyn EngineBinding>,
    /// `None` once destroyed
    handle: Option<EngineHandle>,
    frame_size: usize,
    input_frame: Vec<f32>,
    output_frame: Vec<f32>,
    frames_processed: u64,
    starved_frames: u64,
}

impl StreamingDenoiser {
    /// Denoiser on the process-wide engine with the default frame size
    pub fn new() -> Result<Self> {
        Self::with_frame_size(FRAME_SIZE)
    }

    /// Denoiser on the process-wide engine with a custom frame size
    pub fn with_frame_size(frame_size: usize) -> Result<Self> {
        Self::with_binding(resolver::engine_binding(), frame_size)
    }

    /// Denoiser on an explicit engine binding.
    ///
    /// The frame size must be one the engine advertises; the model is
    /// trained for a single size and anything else is rejected.
    pub fn with_binding(binding: Arc<dyn EngineBinding>, frame_size: usize) -> Result<Self> {
        if frame_size == 0 || !binding.supports_frame_size(frame_size) {
            return Err(DtlnError::UnsupportedFrameSize {
                requested: frame_size,
                supported: binding.frame_size(),
            });
        }

        let handle = binding.create()?;
        tracing::debug!(
            engine = binding.name(),
            handle = handle.as_raw(),
            frame_size,
            "Created denoiser"
        );

        Ok(Self {
            binding,
            handle: Some(handle),
            frame_size,
            input_frame: vec![0.0; frame_size],
            output_frame: vec![0.0; frame_size],
            frames_processed: 0,
            starved_frames: 0,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }

    /// Frames processed over the denoiser's lifetime
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Starved frames over the denoiser's lifetime
    pub fn starved_frames(&self) -> u64 {
        self.starved_frames
    }

    /// Denoise `input`, returning exactly `input.len()` samples.
    ///
    /// Engine errors are returned as-is. After one, the session's recurrent
    /// state is unknown and the denoiser should be replaced.
    pub fn process(&mut self, input: &[f32]) -> Result<DenoiseResult> {
        let handle = self.handle.as_mut().ok_or(DtlnError::UseAfterDestroy)?;

        let mut result = DenoiseResult {
            samples: Vec::with_capacity(input.len()),
            ..Default::default()
        };

        for chunk in input.chunks(self.frame_size) {
            self.input_frame[..chunk.len()].copy_from_slice(chunk);
            self.input_frame[chunk.len()..].fill(0.0);

            let starved = self
                .binding
                .process(handle, &self.input_frame, &mut self.output_frame)?;

            result
                .samples
                .extend_from_slice(&self.output_frame[..chunk.len()]);
            result.frames += 1;
            if starved {
                result.starved_frames += 1;
            }
        }

        self.frames_processed += result.frames as u64;
        self.starved_frames += result.starved_frames as u64;

        if result.processor_starved() {
            tracing::debug!(
                frames = result.frames,
                starved = result.starved_frames,
                "Engine fell behind real time"
            );
        }

        Ok(result)
    }

    /// Stop the engine session. Later calls fail with `UseAfterDestroy`.
    pub fn destroy(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(DtlnError::UseAfterDestroy)?;
        tracing::debug!(
            handle = handle.as_raw(),
            frames = self.frames_processed,
            starved = self.starved_frames,
            "Destroying denoiser"
        );
        self.binding.stop(handle)
    }
}

impl std::fmt::Debug for StreamingDenoiser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingDenoiser")
            .field("engine", &self.binding.name())
            .field("frame_size", &self.frame_size)
            .field("destroyed", &self.is_destroyed())
            .field("frames_processed", &self.frames_processed)
            .field("starved_frames", &self.starved_frames)
            .finish()
    }
}

impl Drop for StreamingDenoiser {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.binding.stop(handle) {
                tracing::warn!("Failed to stop engine session on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;

    fn mock_denoiser() -> (Arc<MockEngine>, StreamingDenoiser) {
        let engine = Arc::new(MockEngine::new());
        let denoiser = StreamingDenoiser::with_binding(engine.clone(), FRAME_SIZE).unwrap();
        (engine, denoiser)
    }

    #[test]
    fn test_empty_input_skips_engine() {
        let (engine, mut denoiser) = mock_denoiser();

        let result = denoiser.process(&[]).unwrap();

        assert!(result.samples.is_empty());
        assert_eq!(result.frames, 0);
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn test_short_input_is_padded_and_trimmed() {
        let (engine, mut denoiser) = mock_denoiser();
        let input = vec![0.4f32; 10];

        let result = denoiser.process(&input).unwrap();

        assert_eq!(result.samples.len(), 10);
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input.len(), FRAME_SIZE);
        assert!(calls[0].input[10..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_padding_does_not_leak_between_calls() {
        let (engine, mut denoiser) = mock_denoiser();

        denoiser.process(&vec![0.9f32; FRAME_SIZE]).unwrap();
        denoiser.process(&[0.1f32; 3]).unwrap();

        let calls = engine.calls();
        assert_eq!(&calls[1].input[..3], &[0.1f32; 3]);
        assert!(calls[1].input[3..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_destroy_then_process_fails() {
        let (engine, mut denoiser) = mock_denoiser();

        denoiser.destroy().unwrap();
        let err = denoiser.process(&[0.0; 4]).unwrap_err();

        assert!(matches!(err, DtlnError::UseAfterDestroy));
        assert_eq!(engine.call_count(), 0);
        assert_eq!(engine.stopped().len(), 1);
    }

    #[test]
    fn test_double_destroy_stops_once() {
        let (engine, mut denoiser) = mock_denoiser();

        denoiser.destroy().unwrap();
        assert!(matches!(denoiser.destroy(), Err(DtlnError::UseAfterDestroy)));
        drop(denoiser);

        assert_eq!(engine.stopped().len(), 1);
    }

    #[test]
    fn test_drop_stops_session() {
        let (engine, denoiser) = mock_denoiser();
        drop(denoiser);

        assert_eq!(engine.stopped(), vec![1]);
        assert_eq!(engine.live_sessions(), 0);
    }

    #[test]
    fn test_zero_frame_size_rejected() {
        let engine = Arc::new(MockEngine::new());
        let err = StreamingDenoiser::with_binding(engine.clone(), 0).unwrap_err();

        assert!(matches!(err, DtlnError::UnsupportedFrameSize { requested: 0, .. }));
        assert_eq!(engine.created(), 0);
    }
}
