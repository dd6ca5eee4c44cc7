//! Runtime resolution of the native engine
//!
//! Looks for the engine library in a fixed order and settles on the first
//! one that loads:
//!
//! 1. `<root>/<platform-dir>/<lib>`: the prebuilt artifact for this
//!    platform, skipped when the platform has none
//! 2. `<root>/<lib>`: an artifact built locally for this machine
//!
//! When neither loads, the outcome is a [`FallbackEngine`] that fails on
//! first use. Resolving never fails by itself.
//!
//! The process-wide outcome is computed once behind a [`OnceLock`] and read
//! through [`resolution`] and [`engine_binding`].

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::engine::{EngineBinding, FallbackEngine, NativeEngine};
use crate::error::ResolutionFailureKind;
use crate::platform::PlatformKey;

/// Environment variable overriding the artifact root
pub const ENGINE_DIR_ENV: &str = "DTLN_ENGINE_DIR";

/// Base name of the engine library (`libdtln.so`, `dtln.dll`, ...)
pub const LIBRARY_NAME: &str = "dtln";

/// Loader error fragments that mean "found, but links against something
/// missing" rather than "not there / not loadable".
const SYMBOL_MISMATCH_MARKERS: &[&str] = &[
    "undefined symbol",
    "symbol not found",
    "could not find symbol",
    "specified procedure could not be found",
    "os error 127",
];

/// Platform-specific file name of the engine library
pub fn library_file_name() -> OsString {
    libloading::library_filename(LIBRARY_NAME)
}

/// Artifact root: `$DTLN_ENGINE_DIR`, else the running executable's directory
pub fn default_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(ENGINE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Classify a loader error message
pub fn classify_load_error(message: &str) -> ResolutionFailureKind {
    let lower = message.to_lowercase();
    if SYMBOL_MISMATCH_MARKERS.iter().any(|m| lower.contains(m)) {
        ResolutionFailureKind::SymbolMismatch
    } else {
        ResolutionFailureKind::NotFound
    }
}

/// Flatten an error and its sources into one message
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {}", cause);
        source = cause.source();
    }
    message
}

/// Loads an engine artifact from a path
pub trait ArtifactLoader: Send + Sync {
    /// Load the artifact, or describe why it couldn't be loaded
    fn load(&self, path: &Path) -> std::result::Result<Arc<dyn EngineBinding>, String>;
}

/// Loads shared libraries through `libloading`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ArtifactLoader for NativeLoader {
    fn load(&self, path: &Path) -> std::result::Result<Arc<dyn EngineBinding>, String> {
        NativeEngine::load(path)
            .map(|engine| Arc::new(engine) as Arc<dyn EngineBinding>)
            .map_err(|e| error_chain(&e))
    }
}

/// Where a candidate artifact lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Per-platform prebuilt directory
    Prebuilt,
    /// Root directory (local build)
    Root,
}

/// A failed attempt to load one candidate
#[derive(Debug, Clone, Serialize)]
pub struct LoadAttempt {
    pub source: ArtifactSource,
    pub path: PathBuf,
    pub error: String,
    pub kind: ResolutionFailureKind,
}

/// Final state of a resolution
pub enum ResolutionOutcome {
    Loaded {
        binding: Arc<dyn EngineBinding>,
        source: ArtifactSource,
        path: PathBuf,
    },
    Unavailable {
        kind: ResolutionFailureKind,
        stub: Arc<FallbackEngine>,
    },
}

impl std::fmt::Debug for ResolutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded { source, path, .. } => f
                .debug_struct("Loaded")
                .field("source", source)
                .field("path", path)
                .finish_non_exhaustive(),
            Self::Unavailable { kind, .. } => f
                .debug_struct("Unavailable")
                .field("kind", kind)
                .finish_non_exhaustive(),
        }
    }
}

/// Result of resolving the engine for one platform
#[derive(Debug)]
pub struct Resolution {
    pub platform: PlatformKey,
    /// Failed attempts, in the order they were made
    pub attempts: Vec<LoadAttempt>,
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    /// The engine to use: the loaded one, or the fallback stub
    pub fn binding(&self) -> Arc<dyn EngineBinding> {
        match &self.outcome {
            ResolutionOutcome::Loaded { binding, .. } => Arc::clone(binding),
            ResolutionOutcome::Unavailable { stub, .. } => {
                Arc::clone(stub) as Arc<dyn EngineBinding>
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Loaded { .. })
    }

    /// Classification of the failure, when nothing loaded
    pub fn failure_kind(&self) -> Option<ResolutionFailureKind> {
        match &self.outcome {
            ResolutionOutcome::Loaded { .. } => None,
            ResolutionOutcome::Unavailable { kind, .. } => Some(*kind),
        }
    }

    /// Serializable summary for diagnostics
    pub fn report(&self) -> ResolutionReport {
        let (loaded_from, failure_kind) = match &self.outcome {
            ResolutionOutcome::Loaded { path, .. } => (Some(path.clone()), None),
            ResolutionOutcome::Unavailable { kind, .. } => (None, Some(*kind)),
        };
        ResolutionReport {
            platform: self.platform,
            prebuilt_dir: self.platform.prebuilt_dir(),
            loaded: self.is_loaded(),
            loaded_from,
            failure_kind,
            attempts: self.attempts.clone(),
        }
    }
}

/// Diagnostic summary of a [`Resolution`]
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub platform: PlatformKey,
    pub prebuilt_dir: Option<&'static str>,
    pub loaded: bool,
    pub loaded_from: Option<PathBuf>,
    pub failure_kind: Option<ResolutionFailureKind>,
    pub attempts: Vec<LoadAttempt>,
}

/// Locates and loads the engine for a platform
pub struct Resolver {
    root: PathBuf,
    platform: PlatformKey,
    loader: Box<dyn ArtifactLoader>,
}

impl Resolver {
    /// Resolver loading native libraries under `root`
    pub fn new(root: impl Into<PathBuf>, platform: PlatformKey) -> Self {
        Self::with_loader(root, platform, NativeLoader)
    }

    /// Resolver with a custom artifact loader
    pub fn with_loader(
        root: impl Into<PathBuf>,
        platform: PlatformKey,
        loader: impl ArtifactLoader + 'static,
    ) -> Self {
        Self {
            root: root.into(),
            platform,
            loader: Box::new(loader),
        }
    }

    /// Resolver for the current platform and the default root
    pub fn from_env() -> Self {
        Self::new(default_root(), PlatformKey::current())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> PlatformKey {
        self.platform
    }

    /// Candidate artifacts, in the order they are tried
    pub fn candidates(&self) -> Vec<(ArtifactSource, PathBuf)> {
        let file_name = library_file_name();
        let mut candidates = Vec::with_capacity(2);
        if let Some(dir) = self.platform.prebuilt_dir() {
            candidates.push((ArtifactSource::Prebuilt, self.root.join(dir).join(&file_name)));
        }
        candidates.push((ArtifactSource::Root, self.root.join(&file_name)));
        candidates
    }

    /// Try every candidate; first success wins
    pub fn resolve(&self) -> Resolution {
        if !self.platform.is_recognized() {
            tracing::debug!(
                platform = %self.platform,
                "No prebuilt engine for this platform, trying root artifact only"
            );
        }

        let mut attempts = Vec::new();
        for (source, path) in self.candidates() {
            match self.loader.load(&path) {
                Ok(binding) => {
                    tracing::info!(
                        platform = %self.platform,
                        path = %path.display(),
                        engine = binding.name(),
                        "Loaded denoise engine"
                    );
                    return Resolution {
                        platform: self.platform,
                        attempts,
                        outcome: ResolutionOutcome::Loaded {
                            binding,
                            source,
                            path,
                        },
                    };
                }
                Err(error) => {
                    let kind = classify_load_error(&error);
                    tracing::debug!(
                        path = %path.display(),
                        %kind,
                        "Failed to load denoise engine candidate: {}",
                        error
                    );
                    attempts.push(LoadAttempt {
                        source,
                        path,
                        error,
                        kind,
                    });
                }
            }
        }

        let kind = if attempts
            .iter()
            .any(|a| a.kind == ResolutionFailureKind::SymbolMismatch)
        {
            ResolutionFailureKind::SymbolMismatch
        } else {
            ResolutionFailureKind::NotFound
        };
        let detail = self.describe_failure(kind, &attempts);
        tracing::warn!(%kind, "Denoise engine unavailable, using fallback: {}", detail);

        Resolution {
            platform: self.platform,
            attempts,
            outcome: ResolutionOutcome::Unavailable {
                kind,
                stub: Arc::new(FallbackEngine::new(kind, detail)),
            },
        }
    }

    fn describe_failure(&self, kind: ResolutionFailureKind, attempts: &[LoadAttempt]) -> String {
        let mut detail = match kind {
            ResolutionFailureKind::SymbolMismatch => format!(
                "engine artifact for {} is present but has unresolved symbols; rebuild it with its native dependencies linked",
                self.platform
            ),
            ResolutionFailureKind::NotFound => format!(
                "no loadable engine artifact for {} under {}",
                self.platform,
                self.root.display()
            ),
        };
        for attempt in attempts {
            let _ = write!(detail, "; {}: {}", attempt.path.display(), attempt.error);
        }
        detail
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::from_env()
    }
}

static RESOLUTION: OnceLock<Resolution> = OnceLock::new();

/// The process-wide resolution, computed on first call
pub fn resolution() -> &'static Resolution {
    RESOLUTION.get_or_init(|| Resolver::from_env().resolve())
}

/// The process-wide engine binding (real or fallback)
pub fn engine_binding() -> Arc<dyn EngineBinding> {
    resolution().binding()
}
