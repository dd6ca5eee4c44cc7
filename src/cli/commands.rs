//! CLI Command Implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};

use crate::adapter::StreamingDenoiser;
use crate::engine::{EngineBinding, FRAME_SIZE, SAMPLE_RATE};
use crate::platform::PlatformKey;
use crate::resolver::{self, Resolution, ResolutionOutcome, Resolver};
use crate::wav;

/// Samples per `process` call when replaying a file as a stream
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Denoise a WAV file by streaming it through one denoiser in blocks.
pub fn denoise(
    input: &Path,
    output: &Path,
    block_size: usize,
    strict: bool,
    engine_dir: Option<&Path>,
) -> anyhow::Result<()> {
    check_is_wav(input, true)?;
    check_is_wav(output, false)?;
    if block_size == 0 {
        bail!("Block size must be at least 1 sample");
    }

    info!("Denoising {} -> {}", input.display(), output.display());

    let samples = wav::read_wav(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut denoiser = StreamingDenoiser::with_binding(select_binding(engine_dir), FRAME_SIZE)
        .context("Failed to start the denoise engine")?;

    let mut denoised = Vec::with_capacity(samples.len());
    let mut starved_blocks = 0usize;
    for (index, block) in samples.chunks(block_size).enumerate() {
        let result = denoiser.process(block)?;
        if result.processor_starved() {
            starved_blocks += 1;
            warn!(
                block = index,
                starved_frames = result.starved_frames,
                "Engine fell behind real time"
            );
            if strict {
                denoiser.destroy()?;
                bail!("Processor starved at block {}", index);
            }
        }
        denoised.extend_from_slice(&result.samples);
    }

    let frames = denoiser.frames_processed();
    denoiser.destroy()?;

    wav::write_wav(output, &denoised)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Denoised {:.2}s of audio ({} frames, {} starved blocks): {}",
        denoised.len() as f64 / SAMPLE_RATE as f64,
        frames,
        starved_blocks,
        output.display()
    );

    Ok(())
}

/// Print how the engine library is (or isn't) found on this machine.
pub fn platform(json: bool, engine_dir: Option<&Path>) -> anyhow::Result<()> {
    match engine_dir {
        Some(dir) => print_resolution(&Resolver::new(dir, PlatformKey::current()).resolve(), json),
        None => print_resolution(resolver::resolution(), json),
    }
}

fn print_resolution(resolution: &Resolution, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&resolution.report())?);
        return Ok(());
    }

    let platform = resolution.platform;
    println!("Platform: {}", platform);
    match platform.prebuilt_dir() {
        Some(dir) => println!("Prebuilt directory: {}", dir),
        None => println!("Prebuilt directory: none (unrecognized platform)"),
    }
    for attempt in &resolution.attempts {
        println!(
            "  [{}] {}: {}",
            attempt.kind,
            attempt.path.display(),
            attempt.error
        );
    }
    match &resolution.outcome {
        ResolutionOutcome::Loaded { path, source, .. } => {
            println!("Engine: loaded from {} ({:?})", path.display(), source)
        }
        ResolutionOutcome::Unavailable { kind, .. } => {
            println!("Engine: unavailable ({})", kind)
        }
    }

    Ok(())
}

fn select_binding(engine_dir: Option<&Path>) -> Arc<dyn EngineBinding> {
    match engine_dir {
        Some(dir) => Resolver::new(dir, PlatformKey::current()).resolve().binding(),
        None => resolver::engine_binding(),
    }
}

fn check_is_wav(path: &Path, must_exist: bool) -> anyhow::Result<()> {
    if must_exist && !path.is_file() {
        bail!("File {} does not exist or is not a file", path.display());
    }
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("wav") => Ok(()),
        _ => bail!("File {} is not a wav file", path.display()),
    }
}
