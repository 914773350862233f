//! jbridge loopback - an in-process boundary library
//!
//! Implements the seven C entry points against a small object runtime
//! written in Rust. Built as a `cdylib` it can be loaded like any other
//! boundary library; linked as an `rlib`, `entry_points()` hands the table to
//! the bridge directly.
//!
//! Classes:
//!
//! - `com.example.Calc`: `add (II)I`, `add (JJ)J`, `divide (II)I` (throws on
//!   zero), `half (F)F`, `isEven (I)Z`, `not (Z)Z`, `widen (I)J`, `sum ([I)I`,
//!   `sum ([Ljava/lang/Object;)I`, `range (I)[I`
//! - `com.example.Texts`: `upper`, `split`, `lengths`, `join`, `nothing`
//!   (returns null), `log`
//! - `com.example.Objects`: `identity`, `describe`, `nothing`
//! - `java.lang.StringBuilder`: constructors `()` and `(String)`; `append`,
//!   `toString`, `length`
//! - `com.example.Counter`: constructors `()` and `(I)`; `increment`, `get`
//!
//! Every buffer and reference handed out is accounted in per-thread
//! [`Stats`], so callers can verify that each one came back exactly once.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use jbridge_sdk::{EntryPoints, ReturnEnvelope, ValueTag, WireValue};

mod alloc;
mod runtime;
mod stats;

pub use runtime::live_objects;
pub use stats::{reset_stats, stats, Stats};

use runtime::{Arg, Outcome, Ret};

/// The entry-point table of this library, for in-process use
pub fn entry_points() -> EntryPoints {
    EntryPoints {
        invoke_static,
        invoke_instance,
        construct,
        release_object_handle,
        release_string,
        release_int32_array,
        release_string_array,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn illegal_argument(detail: String) -> String {
    format!("java.lang.IllegalArgumentException: {}", detail)
}

unsafe fn read_name(ptr: *const c_char, what: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(illegal_argument(format!("null {}", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(str::to_string)
        .map_err(|_| illegal_argument(format!("{} is not UTF-8", what)))
}

unsafe fn read_string(value: &WireValue, index: usize) -> Result<String, String> {
    value
        .as_cstr()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| illegal_argument(format!("null string at argument {}", index)))
}

unsafe fn read_args(argv: *const WireValue, argc: i32) -> Result<Vec<Arg>, String> {
    let len = usize::try_from(argc).map_err(|_| illegal_argument(format!("argc {}", argc)))?;
    if len == 0 {
        return Ok(Vec::new());
    }
    if argv.is_null() {
        return Err(illegal_argument("null argv".to_string()));
    }

    let mut args = Vec::with_capacity(len);
    for (index, value) in std::slice::from_raw_parts(argv, len).iter().enumerate() {
        let tag = value
            .tag()
            .map_err(|e| illegal_argument(format!("{} at argument {}", e, index)))?;
        let arg = match tag {
            ValueTag::Int32 => value.as_int32().map(Arg::Int),
            ValueTag::Int64 => value.as_int64().map(Arg::Long),
            ValueTag::Float32 => value.as_float32().map(Arg::Float),
            ValueTag::Boolean => value.as_boolean().map(Arg::Bool),
            ValueTag::Utf8String => Some(Arg::Str(read_string(value, index)?)),
            ValueTag::Int32Array => value.as_int32_slice().map(|s| Arg::IntArray(s.to_vec())),
            ValueTag::Utf8StringArray => match value.as_string_ptr_slice() {
                Some(table) => {
                    let mut items = Vec::with_capacity(table.len());
                    for ptr in table {
                        if ptr.is_null() {
                            return Err(illegal_argument(format!(
                                "null entry in string array at argument {}",
                                index
                            )));
                        }
                        items.push(CStr::from_ptr(*ptr).to_string_lossy().into_owned());
                    }
                    Some(Arg::StrArray(items))
                }
                None => None,
            },
            ValueTag::ObjectRef => value.as_object().map(|p| Arg::Object(p as usize)),
            ValueTag::ObjectArray => Some(Arg::EmptyArray),
            ValueTag::Void | ValueTag::Exception => None,
        };
        args.push(arg.ok_or_else(|| {
            illegal_argument(format!("{} is not a valid argument at {}", tag, index))
        })?);
    }
    Ok(args)
}

fn to_envelope(outcome: Outcome) -> ReturnEnvelope {
    let ret = match outcome {
        Ok(ret) => ret,
        Err(message) => {
            tracing::debug!(%message, "throwing");
            return ReturnEnvelope::exception(alloc::alloc_string(&message));
        }
    };
    let value = match ret {
        Ret::Void => return ReturnEnvelope::void(),
        Ret::Int(v) => WireValue::int32(v),
        Ret::Long(v) => WireValue::int64(v),
        Ret::Float(v) => WireValue::float32(v),
        Ret::Bool(v) => WireValue::boolean(v),
        Ret::Str(Some(s)) => WireValue::string(alloc::alloc_string(&s)),
        Ret::Str(None) => WireValue::string(std::ptr::null_mut()),
        Ret::IntArray(data) => {
            let raw = alloc::alloc_int_array(&data);
            if raw.is_null() {
                return out_of_memory();
            }
            WireValue::int32_array(raw, count(data.len()))
        }
        Ret::StrArray(items) => {
            let raw = alloc::alloc_string_table(&items);
            if raw.is_null() {
                return out_of_memory();
            }
            WireValue::string_array(raw, count(items.len()))
        }
        Ret::Object(token) => WireValue::object(token as *mut c_void),
    };
    ReturnEnvelope::value(value)
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn out_of_memory() -> ReturnEnvelope {
    ReturnEnvelope::exception(alloc::alloc_string("java.lang.OutOfMemoryError"))
}

/// Run one call, turning a panic into a foreign exception
fn guarded(call: impl FnOnce() -> Outcome) -> ReturnEnvelope {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(outcome) => to_envelope(outcome),
        Err(_) => to_envelope(Err("java.lang.Error: loopback runtime panicked".to_string())),
    }
}

// ============================================================================
// Exported Entry Points
// ============================================================================

/// Call a static method
///
/// # Safety
/// `owner`, `member` and `signature` must be NUL-terminated; `argv` must be
/// valid for `argc` records.
#[no_mangle]
pub unsafe extern "C" fn invoke_static(
    owner: *const c_char,
    member: *const c_char,
    signature: *const c_char,
    argv: *const WireValue,
    argc: i32,
) -> ReturnEnvelope {
    guarded(|| {
        let owner = read_name(owner, "owner")?;
        let member = read_name(member, "member")?;
        let signature = read_name(signature, "signature")?;
        let args = read_args(argv, argc)?;
        runtime::check_arguments(&signature, &args)?;
        tracing::trace!(%owner, %member, %signature, "invoke_static");
        runtime::call_static(&owner, &member, &signature, &args)
    })
}

/// Call a method on a live reference
///
/// # Safety
/// Same as [`invoke_static`]; `receiver` must be a reference token issued by
/// this library.
#[no_mangle]
pub unsafe extern "C" fn invoke_instance(
    receiver: *mut c_void,
    member: *const c_char,
    signature: *const c_char,
    argv: *const WireValue,
    argc: i32,
) -> ReturnEnvelope {
    guarded(|| {
        if receiver.is_null() {
            return Err("java.lang.NullPointerException: null receiver".to_string());
        }
        let member = read_name(member, "member")?;
        let signature = read_name(signature, "signature")?;
        let args = read_args(argv, argc)?;
        runtime::check_arguments(&signature, &args)?;
        tracing::trace!(receiver = ?receiver, %member, %signature, "invoke_instance");
        runtime::call_instance(receiver as usize, &member, &signature, &args)
    })
}

/// Construct an object
///
/// # Safety
/// Same as [`invoke_static`].
#[no_mangle]
pub unsafe extern "C" fn construct(
    owner: *const c_char,
    signature: *const c_char,
    argv: *const WireValue,
    argc: i32,
) -> ReturnEnvelope {
    guarded(|| {
        let owner = read_name(owner, "owner")?;
        let signature = read_name(signature, "signature")?;
        let args = read_args(argv, argc)?;
        runtime::check_arguments(&signature, &args)?;
        tracing::trace!(%owner, %signature, "construct");
        runtime::construct(&owner, &signature, &args)
    })
}

/// Release one object reference
///
/// # Safety
/// `handle` should be a token issued by this library; anything else is
/// counted as a bogus release.
#[no_mangle]
pub unsafe extern "C" fn release_object_handle(handle: *mut c_void) {
    if !runtime::release(handle as usize) {
        tracing::warn!(handle = ?handle, "release of an unknown object reference");
        stats::record(|s| s.bogus_releases += 1);
    }
}

/// Release a returned string or exception message
///
/// # Safety
/// `ptr` should be a string returned by this library.
#[no_mangle]
pub unsafe extern "C" fn release_string(ptr: *mut c_char) {
    alloc::free_string(ptr)
}

/// Release a returned int32 array
///
/// # Safety
/// `ptr` should be an array returned by this library.
#[no_mangle]
pub unsafe extern "C" fn release_int32_array(ptr: *mut i32) {
    alloc::free_int_array(ptr)
}

/// Release the outer table of a returned string array
///
/// # Safety
/// `ptr` should be a table returned by this library; its entries are
/// released separately through [`release_string`].
#[no_mangle]
pub unsafe extern "C" fn release_string_array(ptr: *mut *mut c_char) {
    alloc::free_string_table(ptr)
}
