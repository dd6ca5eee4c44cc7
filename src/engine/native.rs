//! Engine binding backed by the native DTLN shared library.
//!
//! The library exports a three-function C ABI:
//!
//! ```c
//! void *dtln_create(void);
//! bool  dtln_denoise(void *engine, const float *input, float *output);
//! void  dtln_stop(void *engine);
//! ```
//!
//! `input` and `output` always point at [`FRAME_SIZE`] floats. The return
//! value of `dtln_denoise` is the starvation flag.

use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use libloading::Library;

use super::{EngineBinding, EngineHandle, FRAME_SIZE};
use crate::error::{DtlnError, Result};

type CreateFn = unsafe extern "C" fn() -> *mut c_void;
type DenoiseFn = unsafe extern "C" fn(*mut c_void, *const f32, *mut f32) -> bool;
type StopFn = unsafe extern "C" fn(*mut c_void);

const CREATE_SYMBOL: &[u8] = b"dtln_create\0";
const DENOISE_SYMBOL: &[u8] = b"dtln_denoise\0";
const STOP_SYMBOL: &[u8] = b"dtln_stop\0";

/// A loaded engine library
pub struct NativeEngine {
    path: PathBuf,
    create_fn: CreateFn,
    denoise_fn: DenoiseFn,
    stop_fn: StopFn,
    // Declared last so the function pointers above never outlive it.
    _library: Library,
}

impl NativeEngine {
    /// Load the library at `path` and bind all three entry points.
    ///
    /// A library that loads but lacks one of the entry points fails here,
    /// with the loader's "undefined symbol" style message. On unix every
    /// symbol is bound at load time, so a library whose own dependencies are
    /// missing fails here too instead of on its first call.
    pub fn load(path: &Path) -> std::result::Result<Self, libloading::Error> {
        let library = open_library(path)?;

        // SAFETY: the signatures match the engine's exported C ABI.
        let (create_fn, denoise_fn, stop_fn) = unsafe {
            let create_fn = *library.get::<CreateFn>(CREATE_SYMBOL)?;
            let denoise_fn = *library.get::<DenoiseFn>(DENOISE_SYMBOL)?;
            let stop_fn = *library.get::<StopFn>(STOP_SYMBOL)?;
            (create_fn, denoise_fn, stop_fn)
        };

        Ok(Self {
            path: path.to_path_buf(),
            create_fn,
            denoise_fn,
            stop_fn,
            _library: library,
        })
    }

    /// Where the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn open_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    // SAFETY: loading runs the library's initializers. The engine
    // artifact is a trusted deployment component.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

// LoadLibrary resolves imports up front.
#[cfg(not(unix))]
fn open_library(path: &Path) -> std::result::Result<Library, libloading::Error> {
    // SAFETY: see the unix variant.
    unsafe { Library::new(path) }
}

impl std::fmt::Debug for NativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEngine")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EngineBinding for NativeEngine {
    fn create(&self) -> Result<EngineHandle> {
        // SAFETY: dtln_create takes no arguments and returns an owned pointer.
        let raw = unsafe { (self.create_fn)() };
        NonZeroUsize::new(raw as usize)
            .map(EngineHandle::from_raw)
            .ok_or_else(|| DtlnError::EngineInvocation {
                operation: "create",
                reason: format!("dtln_create returned null ({})", self.path.display()),
            })
    }

    fn process(
        &self,
        handle: &mut EngineHandle,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<bool> {
        // The engine reads and writes FRAME_SIZE floats unconditionally.
        for len in [input.len(), output.len()] {
            if len != FRAME_SIZE {
                return Err(DtlnError::FrameSizeMismatch {
                    expected: FRAME_SIZE,
                    actual: len,
                });
            }
        }

        // SAFETY: the handle came from dtln_create on this library and has
        // not been stopped (stop consumes it); both buffers are FRAME_SIZE.
        let starved = unsafe {
            (self.denoise_fn)(
                handle.as_raw() as *mut c_void,
                input.as_ptr(),
                output.as_mut_ptr(),
            )
        };
        Ok(starved)
    }

    fn stop(&self, handle: EngineHandle) -> Result<()> {
        // SAFETY: consuming the handle guarantees this runs once per session.
        unsafe { (self.stop_fn)(handle.as_raw() as *mut c_void) };
        Ok(())
    }

    fn name(&self) -> &str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(libloading::library_filename("dtln"));

        assert!(NativeEngine::load(&path).is_err());
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(libloading::library_filename("dtln"));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"definitely not a shared library").unwrap();

        assert!(NativeEngine::load(&path).is_err());
    }
}
