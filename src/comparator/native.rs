#![allow(unsafe_code)]
//! Comparators exported from shared libraries.

use std::ffi::{c_void, CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{SymbolResolver, ValueComparator};
use crate::types::{BridgeError, Result};

/// Signature of an exported comparator: returns whether `*a < *b`.
pub type RawLessFn = unsafe extern "C" fn(*const c_void, *const c_void) -> bool;

struct Handle(*mut c_void);

// SAFETY: dlopen handles may be used and closed from any thread.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.0);
        }
    }
}

fn last_dl_error() -> String {
    let message = unsafe { libc::dlerror() };
    if message.is_null() {
        return "unknown dynamic loader error".to_owned();
    }
    unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned()
}

/// A shared library whose exported symbols are value comparators.
pub struct NativeLibrary {
    handle: Arc<Handle>,
    path: PathBuf,
}

impl NativeLibrary {
    /// Loads the library at `path`.
    ///
    /// # Safety
    ///
    /// Loading runs the library's initialisers. Every symbol later resolved
    /// through it must have the [`RawLessFn`] signature and read no more than
    /// the bytes of the value spans it is given.
    pub unsafe fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| BridgeError::Invalid("library path contains NUL"))?;
        let handle = libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL);
        if handle.is_null() {
            return Err(BridgeError::ComparatorNotFound(format!(
                "{}: {}",
                path.display(),
                last_dl_error()
            )));
        }
        debug!(path = %path.display(), "comparator.native.open");
        Ok(Self {
            handle: Arc::new(Handle(handle)),
            path: path.to_path_buf(),
        })
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up the comparator exported as `name`.
    pub fn comparator(&self, name: &str) -> Result<NativeComparator> {
        let c_name = CString::new(name)
            .map_err(|_| BridgeError::ComparatorNotFound(name.to_owned()))?;
        let symbol = unsafe { libc::dlsym(self.handle.0, c_name.as_ptr()) };
        if symbol.is_null() {
            return Err(BridgeError::ComparatorNotFound(format!(
                "{name} in {}",
                self.path.display()
            )));
        }
        // Symbol signatures are part of the `open` contract.
        let func = unsafe { std::mem::transmute::<*mut c_void, RawLessFn>(symbol) };
        Ok(NativeComparator {
            func,
            _library: Arc::clone(&self.handle),
        })
    }
}

impl SymbolResolver for NativeLibrary {
    fn resolve_symbol(&self, name: &str) -> Option<Arc<dyn ValueComparator>> {
        self.comparator(name)
            .ok()
            .map(|c| Arc::new(c) as Arc<dyn ValueComparator>)
    }

    fn describe(&self) -> String {
        format!("native:{}", self.path.display())
    }
}

/// A resolved native comparator. Keeps its library loaded.
pub struct NativeComparator {
    func: RawLessFn,
    _library: Arc<Handle>,
}

impl ValueComparator for NativeComparator {
    fn less(&self, a: &[u8], b: &[u8]) -> Result<bool> {
        Ok(unsafe { (self.func)(a.as_ptr().cast(), b.as_ptr().cast()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_not_found() {
        let err = unsafe { NativeLibrary::open("/nonexistent/libcomparators.so") }
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::ComparatorNotFound(_)));
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn missing_symbol_is_not_found() {
        let libc = unsafe { NativeLibrary::open("libc.so.6") }.unwrap();
        assert!(matches!(
            libc.comparator("lt_no_such_comparator"),
            Err(BridgeError::ComparatorNotFound(_))
        ));
        assert!(libc.resolve_symbol("lt_no_such_comparator").is_none());
    }
}
