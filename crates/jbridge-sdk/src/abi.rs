//! Entry points exported by a boundary library
//!
//! A boundary exports exactly these seven C functions. Owner paths use the
//! foreign runtime's internal separator (`com/example/Calc`); every string is
//! NUL-terminated UTF-8; `argv` points at `argc` contiguous `WireValue`s.

use std::ffi::c_void;
use std::os::raw::c_char;

use crate::wire::{ReturnEnvelope, WireValue};

/// `invoke_static(owner, member, signature, argv, argc)`
pub type InvokeStaticFn = unsafe extern "C" fn(
    owner: *const c_char,
    member: *const c_char,
    signature: *const c_char,
    argv: *const WireValue,
    argc: i32,
) -> ReturnEnvelope;

/// `invoke_instance(receiver, member, signature, argv, argc)`
pub type InvokeInstanceFn = unsafe extern "C" fn(
    receiver: *mut c_void,
    member: *const c_char,
    signature: *const c_char,
    argv: *const WireValue,
    argc: i32,
) -> ReturnEnvelope;

/// `construct(owner, signature, argv, argc)`
pub type ConstructFn = unsafe extern "C" fn(
    owner: *const c_char,
    signature: *const c_char,
    argv: *const WireValue,
    argc: i32,
) -> ReturnEnvelope;

/// `release_object_handle(handle)`
pub type ReleaseObjectHandleFn = unsafe extern "C" fn(handle: *mut c_void);

/// `release_string(ptr)`
pub type ReleaseStringFn = unsafe extern "C" fn(ptr: *mut c_char);

/// `release_int32_array(ptr)`
pub type ReleaseInt32ArrayFn = unsafe extern "C" fn(ptr: *mut i32);

/// `release_string_array(ptr)` - releases the outer pointer table only
pub type ReleaseStringArrayFn = unsafe extern "C" fn(ptr: *mut *mut c_char);

/// Symbol name of `invoke_static`
pub const SYMBOL_INVOKE_STATIC: &str = "invoke_static";
/// Symbol name of `invoke_instance`
pub const SYMBOL_INVOKE_INSTANCE: &str = "invoke_instance";
/// Symbol name of `construct`
pub const SYMBOL_CONSTRUCT: &str = "construct";
/// Symbol name of `release_object_handle`
pub const SYMBOL_RELEASE_OBJECT_HANDLE: &str = "release_object_handle";
/// Symbol name of `release_string`
pub const SYMBOL_RELEASE_STRING: &str = "release_string";
/// Symbol name of `release_int32_array`
pub const SYMBOL_RELEASE_INT32_ARRAY: &str = "release_int32_array";
/// Symbol name of `release_string_array`
pub const SYMBOL_RELEASE_STRING_ARRAY: &str = "release_string_array";

/// All symbols a boundary must export, in binding order
pub const SYMBOL_NAMES: [&str; 7] = [
    SYMBOL_INVOKE_STATIC,
    SYMBOL_INVOKE_INSTANCE,
    SYMBOL_CONSTRUCT,
    SYMBOL_RELEASE_OBJECT_HANDLE,
    SYMBOL_RELEASE_STRING,
    SYMBOL_RELEASE_INT32_ARRAY,
    SYMBOL_RELEASE_STRING_ARRAY,
];

/// Fully bound entry-point table.
///
/// Constructing one requires all seven functions, so a partially bound table
/// cannot exist.
#[derive(Clone, Copy, Debug)]
pub struct EntryPoints {
    /// `invoke_static`
    pub invoke_static: InvokeStaticFn,
    /// `invoke_instance`
    pub invoke_instance: InvokeInstanceFn,
    /// `construct`
    pub construct: ConstructFn,
    /// `release_object_handle`
    pub release_object_handle: ReleaseObjectHandleFn,
    /// `release_string`
    pub release_string: ReleaseStringFn,
    /// `release_int32_array`
    pub release_int32_array: ReleaseInt32ArrayFn,
    /// `release_string_array`
    pub release_string_array: ReleaseStringArrayFn,
}
