//! Boundary library loading
//!
//! Opens the shared library that implements the C boundary (`.so`, `.dylib`,
//! `.dll`) and resolves its exported entry points.

use std::ffi::{c_void, CString};
use std::fmt;
use std::mem::size_of;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or binding a boundary library
#[derive(Debug, Error)]
pub enum LoadError {
    /// Library file not found or could not be loaded
    #[error("Library not found: {path}")]
    NotFound {
        /// Path that was attempted, with the platform's reason
        path: String,
    },

    /// Symbol not found in library
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name that was not found
        symbol: String,
        /// Library path
        library: String,
    },

    /// Platform-specific error
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// Invalid path encoding
    #[error("Invalid UTF-8 in path: {0}")]
    InvalidPath(String),
}

/// Handle to a loaded shared library; unloaded on drop
pub struct Library {
    raw: sys::RawLibrary,
    path: String,
}

// The handle is an opaque token owned by this value; the platform loaders
// are thread-safe.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Load a shared library.
    ///
    /// - **Linux / macOS**: `dlopen(RTLD_NOW | RTLD_LOCAL)`, so every
    ///   unresolved symbol is reported here rather than at first call
    /// - **Windows**: `LoadLibraryW`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let path = path_ref
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path_ref)))?
            .to_string();

        let raw = sys::open(&path).map_err(|reason| LoadError::NotFound {
            path: format!("{}: {}", path, reason),
        })?;
        tracing::debug!(path = %path, "loaded boundary library");
        Ok(Library { raw, path })
    }

    /// Resolve an exported function.
    ///
    /// # Safety
    ///
    /// `T` must be a function pointer type matching the symbol's real
    /// signature, and the returned pointer must not outlive this `Library`.
    pub unsafe fn get<T: Copy>(&self, symbol: &str) -> Result<T, LoadError> {
        debug_assert_eq!(size_of::<T>(), size_of::<*mut c_void>());
        let name = CString::new(symbol)
            .map_err(|e| LoadError::PlatformError(format!("Invalid symbol name: {}", e)))?;
        let not_found = |detail: Option<String>| LoadError::SymbolNotFound {
            symbol: symbol.to_string(),
            library: match detail {
                Some(detail) => format!("{}: {}", self.path, detail),
                None => self.path.clone(),
            },
        };

        let address = sys::lookup(self.raw, &name).map_err(not_found)?;
        if address.is_null() {
            return Err(not_found(None));
        }
        Ok(std::mem::transmute_copy(&address))
    }

    /// Get the path this library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        tracing::trace!(path = %self.path, "unloading boundary library");
        unsafe { sys::close(self.raw) };
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::{c_void, CStr};

    pub type RawLibrary = *mut c_void;

    fn last_error() -> Option<String> {
        let message = unsafe { libc::dlerror() };
        if message.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned())
    }

    pub fn open(path: &str) -> Result<RawLibrary, String> {
        let c_path = std::ffi::CString::new(path).map_err(|e| format!("Invalid path: {}", e))?;
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(last_error().unwrap_or_else(|| "Unknown error".to_string()));
        }
        Ok(handle)
    }

    /// `Err(Some(..))` carries the loader's message
    pub unsafe fn lookup(handle: RawLibrary, name: &CStr) -> Result<*mut c_void, Option<String>> {
        // Clear any stale error before the lookup
        libc::dlerror();
        let symbol = libc::dlsym(handle, name.as_ptr());
        match last_error() {
            Some(reason) => Err(Some(reason)),
            None => Ok(symbol),
        }
    }

    pub unsafe fn close(handle: RawLibrary) {
        libc::dlclose(handle);
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::{c_void, CStr, OsStr};
    use std::os::windows::ffi::OsStrExt;

    pub type RawLibrary = *mut c_void;

    extern "system" {
        fn LoadLibraryW(filename: *const u16) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, procname: *const i8) -> *mut c_void;
        fn FreeLibrary(module: *mut c_void) -> i32;
        fn GetLastError() -> u32;
    }

    pub fn open(path: &str) -> Result<RawLibrary, String> {
        let wide: Vec<u16> = OsStr::new(path).encode_wide().chain(Some(0)).collect();
        let handle = unsafe { LoadLibraryW(wide.as_ptr()) };
        if handle.is_null() {
            return Err(format!("error code {}", unsafe { GetLastError() }));
        }
        Ok(handle)
    }

    pub unsafe fn lookup(handle: RawLibrary, name: &CStr) -> Result<*mut c_void, Option<String>> {
        let symbol = GetProcAddress(handle, name.as_ptr());
        if symbol.is_null() {
            return Err(Some(format!("error code {}", GetLastError())));
        }
        Ok(symbol)
    }

    pub unsafe fn close(handle: RawLibrary) {
        FreeLibrary(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_not_found() {
        match Library::open("/nonexistent/libboundary.so") {
            Err(LoadError::NotFound { path }) => {
                assert!(path.starts_with("/nonexistent/libboundary.so"));
            }
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_interior_nul_path() {
        match Library::open("bad\0path.so") {
            Err(LoadError::NotFound { path }) => assert!(path.contains("Invalid path")),
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }
}
