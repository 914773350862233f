//! Buffers handed to the caller
//!
//! Every pointer returned inside an envelope is registered here and
//! unregistered on release. A release of an unregistered pointer is counted
//! as bogus and otherwise ignored, so a caller's double free shows up in the
//! stats instead of corrupting the heap.

use std::collections::HashSet;
use std::ffi::CString;
use std::mem::size_of;
use std::os::raw::c_char;
use std::ptr;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::stats::record;

static STRINGS: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));
static INT_ARRAYS: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));
static STRING_TABLES: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Copy `text` into a caller-owned C string (interior NULs are dropped)
pub(crate) fn alloc_string(text: &str) -> *mut c_char {
    let owned = CString::new(text.replace('\0', "")).unwrap_or_default();
    let raw = owned.into_raw();
    STRINGS.lock().insert(raw as usize);
    record(|s| s.strings_allocated += 1);
    raw
}

/// Copy `data` into a `malloc`ed array; null on allocation failure
pub(crate) fn alloc_int_array(data: &[i32]) -> *mut i32 {
    let raw = unsafe { libc::malloc(data.len().max(1) * size_of::<i32>()) as *mut i32 };
    if raw.is_null() {
        return raw;
    }
    unsafe { ptr::copy_nonoverlapping(data.as_ptr(), raw, data.len()) };
    INT_ARRAYS.lock().insert(raw as usize);
    record(|s| s.int_arrays_allocated += 1);
    raw
}

/// Build a `malloc`ed table of caller-owned strings; null on allocation failure
pub(crate) fn alloc_string_table(items: &[String]) -> *mut *mut c_char {
    let raw = unsafe {
        libc::malloc(items.len().max(1) * size_of::<*mut c_char>()) as *mut *mut c_char
    };
    if raw.is_null() {
        return raw;
    }
    for (i, item) in items.iter().enumerate() {
        unsafe { raw.add(i).write(alloc_string(item)) };
    }
    STRING_TABLES.lock().insert(raw as usize);
    record(|s| s.string_tables_allocated += 1);
    raw
}

pub(crate) unsafe fn free_string(raw: *mut c_char) {
    if STRINGS.lock().remove(&(raw as usize)) {
        drop(CString::from_raw(raw));
        record(|s| s.strings_released += 1);
    } else {
        tracing::warn!(ptr = ?raw, "release_string on a pointer not owned by the caller");
        record(|s| s.bogus_releases += 1);
    }
}

pub(crate) unsafe fn free_int_array(raw: *mut i32) {
    if INT_ARRAYS.lock().remove(&(raw as usize)) {
        libc::free(raw as *mut libc::c_void);
        record(|s| s.int_arrays_released += 1);
    } else {
        tracing::warn!(ptr = ?raw, "release_int32_array on a pointer not owned by the caller");
        record(|s| s.bogus_releases += 1);
    }
}

/// Frees the table only; its entries are released one by one
pub(crate) unsafe fn free_string_table(raw: *mut *mut c_char) {
    if STRING_TABLES.lock().remove(&(raw as usize)) {
        libc::free(raw as *mut libc::c_void);
        record(|s| s.string_tables_released += 1);
    } else {
        tracing::warn!(ptr = ?raw, "release_string_array on a pointer not owned by the caller");
        record(|s| s.bogus_releases += 1);
    }
}
