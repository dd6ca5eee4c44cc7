//! dtln - Streaming front end for the DTLN noise suppression engine
//!
//! The engine denoises fixed 512-sample frames of 16 kHz mono audio and
//! keeps recurrent state between frames. This crate provides:
//! - `StreamingDenoiser`: accepts audio of any length and handles framing,
//!   zero-padding and trimming around the engine
//! - `resolver`: finds and loads the native engine for the current platform,
//!   degrading to a diagnostic stub when it can't
//! - `wav`: 16 kHz mono WAV helpers for the command-line tool

pub mod adapter;
pub mod cli;
pub mod engine;
pub mod error;
pub mod platform;
pub mod resolver;
pub mod wav;

pub use adapter::{DenoiseResult, StreamingDenoiser};
pub use engine::{EngineBinding, EngineHandle, FRAME_SIZE, SAMPLE_RATE};
pub use error::{DtlnError, ResolutionFailureKind, Result};
pub use platform::PlatformKey;
pub use resolver::{engine_binding, resolution, Resolution, ResolutionOutcome, Resolver};
