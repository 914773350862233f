//! Foreign object handles
//!
//! An `ObjectHandle` is the only local owner of a boundary-pinned reference
//! to a foreign object. It is released through the boundary exactly once:
//! either by an explicit `release()` or when the handle goes out of scope.
//! Releasing twice is a no-op at the API level; the atomic flag guarantees
//! the boundary sees at most one release even if two threads race.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::boundary::Boundary;
use crate::error::{BridgeError, BridgeResult};

/// Creates handles for one boundary and counts the live ones
#[derive(Clone)]
pub struct HandleManager {
    boundary: Arc<dyn Boundary>,
    live: Arc<AtomicUsize>,
}

impl HandleManager {
    /// Create a manager releasing through `boundary`
    pub fn new(boundary: Arc<dyn Boundary>) -> Self {
        Self {
            boundary,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Take ownership of a raw handle returned by the boundary.
    ///
    /// The returned `ObjectHandle` will release `raw` exactly once.
    pub fn wrap(&self, raw: NonNull<c_void>) -> ObjectHandle {
        self.live.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(handle = ?raw, "wrapped foreign object handle");
        ObjectHandle {
            raw,
            released: AtomicBool::new(false),
            manager: self.clone(),
        }
    }

    /// Number of handles wrapped by this manager and not yet released
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

impl fmt::Debug for HandleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleManager")
            .field("live", &self.live())
            .finish_non_exhaustive()
    }
}

/// Owned reference to a foreign object
pub struct ObjectHandle {
    raw: NonNull<c_void>,
    released: AtomicBool,
    manager: HandleManager,
}

// The raw token is only ever passed back to the boundary; the release flag
// is atomic.
unsafe impl Send for ObjectHandle {}
unsafe impl Sync for ObjectHandle {}

impl ObjectHandle {
    /// Release the foreign reference.
    ///
    /// Returns `true` if this call issued the boundary release, `false` if the
    /// handle had already been released.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            tracing::trace!(handle = ?self.raw, "ignoring repeated release");
            return false;
        }
        unsafe {
            self.manager
                .boundary
                .release_object_handle(self.raw.as_ptr());
        }
        self.manager.live.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(handle = ?self.raw, "released foreign object handle");
        true
    }

    /// Whether the handle has been released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Borrow the raw token for one call without transferring ownership
    pub fn as_raw_for_call(&self) -> BridgeResult<*mut c_void> {
        if self.is_released() {
            return Err(BridgeError::HandleReleased);
        }
        Ok(self.raw.as_ptr())
    }

    /// Give up ownership without releasing.
    ///
    /// The caller becomes responsible for passing the token to
    /// `release_object_handle` exactly once.
    pub fn into_raw(self) -> BridgeResult<*mut c_void> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(BridgeError::HandleReleased);
        }
        self.manager.live.fetch_sub(1, Ordering::AcqRel);
        Ok(self.raw.as_ptr())
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("raw", &self.raw)
            .field("released", &self.is_released())
            .finish()
    }
}
