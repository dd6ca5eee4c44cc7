//! Native Engine Tests
//!
//! Builds small C engine libraries with the system compiler and resolves
//! them through the real dynamic loader. Skipped when no compiler is found.
#![cfg(target_os = "linux")]

use std::path::{Path, PathBuf};
use std::process::Command;

use approx::assert_relative_eq;
use tempfile::TempDir;

use dtln::platform::{Arch, OsFamily};
use dtln::resolver::{library_file_name, ArtifactSource};
use dtln::{
    PlatformKey, ResolutionFailureKind, ResolutionOutcome, Resolver, StreamingDenoiser, FRAME_SIZE,
};

/// Halves every sample; every second frame reports starvation.
const WORKING_ENGINE: &str = r#"
#include <stdbool.h>
#include <stdlib.h>

typedef struct { int frames; } engine_t;

void *dtln_create(void) { return calloc(1, sizeof(engine_t)); }

bool dtln_denoise(void *handle, const float *input, float *output) {
    engine_t *engine = handle;
    for (int i = 0; i < 512; i++) output[i] = input[i] * 0.5f;
    engine->frames++;
    return engine->frames % 2 == 0;
}

void dtln_stop(void *handle) { free(handle); }
"#;

/// Exports no `dtln_denoise`.
const MISSING_ENTRY_POINT: &str = r#"
#include <stdlib.h>

void *dtln_create(void) { return malloc(1); }
void dtln_stop(void *handle) { free(handle); }
"#;

/// Complete ABI, but calls into a dependency that isn't there.
const UNRESOLVED_DEPENDENCY: &str = r#"
#include <stdbool.h>

extern void *TfLiteInterpreterCreate(void);
extern void TfLiteInterpreterDelete(void *);

void *dtln_create(void) { return TfLiteInterpreterCreate(); }
bool dtln_denoise(void *handle, const float *input, float *output) {
    (void)handle; (void)input; (void)output;
    return false;
}
void dtln_stop(void *handle) { TfLiteInterpreterDelete(handle); }
"#;

/// Compile `source` into `<root>/<prebuilt-dir>/<lib>` with lazy binding.
/// Returns `None` when no C compiler is available.
fn build_engine(source: &str) -> Option<(TempDir, PathBuf)> {
    let root = tempfile::tempdir().unwrap();
    let dir = match PlatformKey::current().prebuilt_dir() {
        Some(dir) => root.path().join(dir),
        None => root.path().to_path_buf(),
    };
    std::fs::create_dir_all(&dir).unwrap();
    let c_file = root.path().join("engine.c");
    std::fs::write(&c_file, source).unwrap();
    let library = dir.join(library_file_name());

    let compiler = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());
    let status = Command::new(&compiler)
        .args(["-shared", "-fPIC", "-Wl,-z,lazy", "-o"])
        .arg(&library)
        .arg(&c_file)
        .status();

    match status {
        Ok(status) if status.success() => Some((root, library)),
        Ok(status) => panic!("{} failed to build fixture: {}", compiler, status),
        Err(e) => {
            eprintln!("skipping: no C compiler ({}: {})", compiler, e);
            None
        }
    }
}

fn resolve(root: &Path) -> dtln::Resolution {
    Resolver::new(root, PlatformKey::current()).resolve()
}

#[test]
fn test_working_engine_round_trip() {
    let Some((root, library)) = build_engine(WORKING_ENGINE) else {
        return;
    };

    let resolution = resolve(root.path());

    match &resolution.outcome {
        ResolutionOutcome::Loaded { path, .. } => assert_eq!(*path, library),
        other => panic!("expected Loaded, got {:?}", other),
    }

    let mut denoiser = StreamingDenoiser::with_binding(resolution.binding(), FRAME_SIZE).unwrap();
    let input: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
    let result = denoiser.process(&input).unwrap();

    assert_eq!(result.samples.len(), 1000);
    assert_eq!(result.frames, 2);
    assert_eq!(result.starved_frames, 1);
    for (got, sample) in result.samples.iter().zip(&input) {
        assert_relative_eq!(*got, sample * 0.5);
    }
    denoiser.destroy().unwrap();
}

#[test]
fn test_missing_entry_point_is_symbol_mismatch() {
    let Some((root, _)) = build_engine(MISSING_ENTRY_POINT) else {
        return;
    };

    let resolution = resolve(root.path());

    assert_eq!(
        resolution.failure_kind(),
        Some(ResolutionFailureKind::SymbolMismatch)
    );
    let attempt = &resolution.attempts[0];
    assert_eq!(attempt.kind, ResolutionFailureKind::SymbolMismatch);
    assert!(attempt.error.contains("dtln_denoise"), "{}", attempt.error);
}

#[test]
fn test_lazily_linked_dependency_is_symbol_mismatch() {
    let Some((root, _)) = build_engine(UNRESOLVED_DEPENDENCY) else {
        return;
    };

    let resolution = resolve(root.path());

    assert_eq!(
        resolution.failure_kind(),
        Some(ResolutionFailureKind::SymbolMismatch)
    );
    assert!(resolution.attempts[0].error.contains("TfLiteInterpreterCreate"));

    // Fails through the stub instead of reaching the missing symbol
    let err = StreamingDenoiser::with_binding(resolution.binding(), FRAME_SIZE).unwrap_err();
    assert!(err.to_string().contains("SymbolMismatch"), "{}", err);
}

#[test]
fn test_unrecognized_platform_loads_root_build() {
    let Some((root, library)) = build_engine(WORKING_ENGINE) else {
        return;
    };
    let root_library = root.path().join(library_file_name());
    std::fs::copy(&library, &root_library).unwrap();

    let platform = PlatformKey::new(OsFamily::Linux, Arch::Other);
    let resolution = Resolver::new(root.path(), platform).resolve();

    match &resolution.outcome {
        ResolutionOutcome::Loaded { source, path, .. } => {
            assert_eq!(*source, ArtifactSource::Root);
            assert_eq!(*path, root_library);
        }
        other => panic!("expected Loaded, got {:?}", other),
    }
}
