//! Engine binding interface
//!
//! The noise suppression engine is an opaque native component. Everything
//! that can stand in for it (the loaded library, the fallback stub, the
//! test mock) implements [`EngineBinding`].

mod fallback;
mod mock;
mod native;

pub use fallback::FallbackEngine;
pub use mock::{FrameCall, MockEngine, MOCK_STATE_STEP};
pub use native::NativeEngine;

use std::num::NonZeroUsize;

use crate::error::Result;

/// Samples per engine frame (32 ms at 16 kHz)
pub const FRAME_SIZE: usize = 512;

/// Sample rate the engine's model was trained for
pub const SAMPLE_RATE: u32 = 16000;

/// Opaque reference to one engine session.
///
/// Deliberately neither `Clone` nor `Copy`: [`EngineBinding::stop`] consumes
/// the handle and [`EngineBinding::process`] borrows it mutably, so a
/// stopped session can't be reached again and one session can't be driven
/// from two places at once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EngineHandle(NonZeroUsize);

impl EngineHandle {
    /// Wrap a raw session token issued by a binding
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    /// The raw session token
    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

/// A fixed-frame, stateful denoising primitive
pub trait EngineBinding: Send + Sync {
    /// Start a new independent session
    fn create(&self) -> Result<EngineHandle>;

    /// Denoise one frame. `input` and `output` must both hold exactly
    /// [`frame_size`](Self::frame_size) samples. Returns `true` when the
    /// engine could not keep up with real time for this frame.
    fn process(&self, handle: &mut EngineHandle, input: &[f32], output: &mut [f32])
        -> Result<bool>;

    /// End a session and release its resources
    fn stop(&self, handle: EngineHandle) -> Result<()>;

    /// Frame size the engine was built for
    fn frame_size(&self) -> usize {
        FRAME_SIZE
    }

    /// Whether the engine accepts frames of `frame_size` samples
    fn supports_frame_size(&self, frame_size: usize) -> bool {
        frame_size == self.frame_size()
    }

    /// Short label for logs
    fn name(&self) -> &str;
}
