//! The C boundary as an injectable dependency
//!
//! `Boundary` is the seam between the bridge and whatever performs the
//! foreign calls. A loaded shared library (`NativeBoundary`), a bare
//! entry-point table linked into the process (`EntryPoints`) and test doubles
//! all implement it, and the bridge only ever talks to `Arc<dyn Boundary>`.

use std::ffi::{c_void, CStr};
use std::fmt;
use std::os::raw::c_char;
use std::path::Path;

use jbridge_sdk::abi::{
    SYMBOL_CONSTRUCT, SYMBOL_INVOKE_INSTANCE, SYMBOL_INVOKE_STATIC, SYMBOL_RELEASE_INT32_ARRAY,
    SYMBOL_RELEASE_OBJECT_HANDLE, SYMBOL_RELEASE_STRING, SYMBOL_RELEASE_STRING_ARRAY,
};
use jbridge_sdk::{EntryPoints, ReturnEnvelope, WireValue};

use crate::loader::{Library, LoadError};

/// The seven operations of the C boundary.
///
/// # Safety
///
/// Every method forwards raw pointers across the C ABI. Callers must pass
/// `argv` valid for `argc` records, receivers and buffers that this boundary
/// produced and has not yet released, and must release each buffer at most
/// once.
pub trait Boundary: Send + Sync {
    /// Call a static method on `owner` (internal `a/b/C` form)
    unsafe fn invoke_static(
        &self,
        owner: &CStr,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope;

    /// Call a method on a live receiver
    unsafe fn invoke_instance(
        &self,
        receiver: *mut c_void,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope;

    /// Construct an instance of `owner`
    unsafe fn construct(
        &self,
        owner: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope;

    /// Drop the boundary's pin on a foreign object
    unsafe fn release_object_handle(&self, handle: *mut c_void);

    /// Free a returned string or exception message
    unsafe fn release_string(&self, ptr: *mut c_char);

    /// Free a returned int32 array
    unsafe fn release_int32_array(&self, ptr: *mut i32);

    /// Free the outer pointer table of a returned string array
    unsafe fn release_string_array(&self, ptr: *mut *mut c_char);
}

impl Boundary for EntryPoints {
    unsafe fn invoke_static(
        &self,
        owner: &CStr,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        (self.invoke_static)(owner.as_ptr(), member.as_ptr(), signature.as_ptr(), argv, argc)
    }

    unsafe fn invoke_instance(
        &self,
        receiver: *mut c_void,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        (self.invoke_instance)(receiver, member.as_ptr(), signature.as_ptr(), argv, argc)
    }

    unsafe fn construct(
        &self,
        owner: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        (self.construct)(owner.as_ptr(), signature.as_ptr(), argv, argc)
    }

    unsafe fn release_object_handle(&self, handle: *mut c_void) {
        (self.release_object_handle)(handle)
    }

    unsafe fn release_string(&self, ptr: *mut c_char) {
        (self.release_string)(ptr)
    }

    unsafe fn release_int32_array(&self, ptr: *mut i32) {
        (self.release_int32_array)(ptr)
    }

    unsafe fn release_string_array(&self, ptr: *mut *mut c_char) {
        (self.release_string_array)(ptr)
    }
}

/// Boundary backed by a loaded shared library.
///
/// All seven entry points are resolved in `open`; a library missing any of
/// them is rejected before a single call can be made.
pub struct NativeBoundary {
    entries: EntryPoints,
    // Keeps the code behind `entries` mapped.
    library: Library,
}

impl NativeBoundary {
    /// Load `path` and bind every entry point, each looked up as
    /// `symbol_prefix` + the standard symbol name
    pub fn open<P: AsRef<Path>>(path: P, symbol_prefix: &str) -> Result<Self, LoadError> {
        let library = Library::open(path)?;
        let entries = unsafe { bind(&library, symbol_prefix)? };
        tracing::info!(
            library = library.path(),
            prefix = symbol_prefix,
            "bound boundary entry points"
        );
        Ok(Self { entries, library })
    }

    /// Path of the loaded library
    pub fn path(&self) -> &str {
        self.library.path()
    }

    /// The bound entry-point table
    pub fn entry_points(&self) -> &EntryPoints {
        &self.entries
    }
}

unsafe fn bind(library: &Library, prefix: &str) -> Result<EntryPoints, LoadError> {
    let name = |symbol: &str| format!("{}{}", prefix, symbol);
    Ok(EntryPoints {
        invoke_static: library.get(&name(SYMBOL_INVOKE_STATIC))?,
        invoke_instance: library.get(&name(SYMBOL_INVOKE_INSTANCE))?,
        construct: library.get(&name(SYMBOL_CONSTRUCT))?,
        release_object_handle: library.get(&name(SYMBOL_RELEASE_OBJECT_HANDLE))?,
        release_string: library.get(&name(SYMBOL_RELEASE_STRING))?,
        release_int32_array: library.get(&name(SYMBOL_RELEASE_INT32_ARRAY))?,
        release_string_array: library.get(&name(SYMBOL_RELEASE_STRING_ARRAY))?,
    })
}

impl Boundary for NativeBoundary {
    unsafe fn invoke_static(
        &self,
        owner: &CStr,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        self.entries
            .invoke_static(owner, member, signature, argv, argc)
    }

    unsafe fn invoke_instance(
        &self,
        receiver: *mut c_void,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        self.entries
            .invoke_instance(receiver, member, signature, argv, argc)
    }

    unsafe fn construct(
        &self,
        owner: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        self.entries.construct(owner, signature, argv, argc)
    }

    unsafe fn release_object_handle(&self, handle: *mut c_void) {
        self.entries.release_object_handle(handle)
    }

    unsafe fn release_string(&self, ptr: *mut c_char) {
        self.entries.release_string(ptr)
    }

    unsafe fn release_int32_array(&self, ptr: *mut i32) {
        self.entries.release_int32_array(ptr)
    }

    unsafe fn release_string_array(&self, ptr: *mut *mut c_char) {
        self.entries.release_string_array(ptr)
    }
}

impl fmt::Debug for NativeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBoundary")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}
