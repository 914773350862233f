//! Return and exception decoding
//!
//! Buffers inside a `ReturnEnvelope` belong to the boundary until the bridge
//! asks for their release. Each received buffer is wrapped in a guard the
//! moment it is recognised, so it is released exactly once on every exit
//! path: success, decode error, or unwinding panic.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr::NonNull;

use jbridge_sdk::{ReturnEnvelope, UnknownTag, ValueTag, WireValue};

use crate::boundary::Boundary;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::HandleManager;
use crate::value::ReturnValue;

/// Message used when a foreign exception arrives without text
pub const MISSING_EXCEPTION_MESSAGE: &str = "foreign exception without message";

/// Boundary-owned string, released on drop
struct OwnedString<'b> {
    boundary: &'b dyn Boundary,
    ptr: NonNull<c_char>,
}

impl<'b> OwnedString<'b> {
    fn adopt(boundary: &'b dyn Boundary, ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { boundary, ptr })
    }

    fn to_string_lossy(&self) -> String {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for OwnedString<'_> {
    fn drop(&mut self) {
        unsafe { self.boundary.release_string(self.ptr.as_ptr()) }
    }
}

/// Boundary-owned int32 array, released on drop
struct OwnedIntArray<'b> {
    boundary: &'b dyn Boundary,
    ptr: NonNull<i32>,
}

impl Drop for OwnedIntArray<'_> {
    fn drop(&mut self) {
        unsafe { self.boundary.release_int32_array(self.ptr.as_ptr()) }
    }
}

/// Boundary-owned pointer table of a string array, released on drop.
///
/// Only the table itself; the entries are adopted separately.
struct OwnedStringTable<'b> {
    boundary: &'b dyn Boundary,
    ptr: NonNull<*mut c_char>,
}

impl Drop for OwnedStringTable<'_> {
    fn drop(&mut self) {
        unsafe { self.boundary.release_string_array(self.ptr.as_ptr()) }
    }
}

fn element_count(count: i32, what: &str) -> BridgeResult<usize> {
    usize::try_from(count)
        .map_err(|_| BridgeError::MalformedEnvelope(format!("negative {} count {}", what, count)))
}

/// Decode a returned envelope into a local value or error.
///
/// # Safety
///
/// `envelope` must come straight from `boundary` and must not have been
/// decoded before: every buffer it references is released here.
pub unsafe fn decode(
    envelope: ReturnEnvelope,
    boundary: &dyn Boundary,
    handles: &HandleManager,
) -> BridgeResult<ReturnValue> {
    let value = envelope.value;
    let tag = match value.tag() {
        Ok(tag) => tag,
        Err(UnknownTag(tag)) => {
            tracing::error!(tag, "boundary returned an unknown tag");
            return Err(BridgeError::UnknownReturnKind { tag });
        }
    };

    if tag == ValueTag::Exception {
        let message = OwnedString::adopt(boundary, envelope.error_message)
            .map(|owned| owned.to_string_lossy())
            .unwrap_or_else(|| MISSING_EXCEPTION_MESSAGE.to_string());
        tracing::debug!(%message, "foreign exception");
        return Err(BridgeError::ForeignInvocation { message });
    }

    // A stray message is still a buffer we received; it goes back unread.
    if let Some(stray) = OwnedString::adopt(boundary, envelope.error_message) {
        tracing::warn!(%tag, "error message set on a non-exception envelope; ignored");
        drop(stray);
    }

    match tag {
        ValueTag::Void => Ok(ReturnValue::Void),
        ValueTag::Int32 => Ok(ReturnValue::Int32(value.as_int32().unwrap_or_default())),
        ValueTag::Int64 => Ok(ReturnValue::Int64(value.as_int64().unwrap_or_default())),
        ValueTag::Float32 => Ok(ReturnValue::Float32(value.as_float32().unwrap_or_default())),
        ValueTag::Boolean => Ok(ReturnValue::Boolean(value.as_boolean().unwrap_or_default())),
        ValueTag::Utf8String => Ok(decode_string(&value, boundary)),
        ValueTag::Int32Array => decode_int_array(&value, boundary),
        ValueTag::Utf8StringArray => decode_string_array(&value, boundary),
        ValueTag::ObjectRef => Ok(value
            .as_object()
            .and_then(NonNull::new)
            .map_or(ReturnValue::Null, |raw| ReturnValue::Object(handles.wrap(raw)))),
        ValueTag::Exception | ValueTag::ObjectArray => {
            tracing::error!(%tag, "boundary returned an argument-only tag");
            Err(BridgeError::UnknownReturnKind { tag: tag.raw() })
        }
    }
}

unsafe fn decode_string(value: &WireValue, boundary: &dyn Boundary) -> ReturnValue {
    match value
        .as_string_ptr()
        .and_then(|ptr| OwnedString::adopt(boundary, ptr))
    {
        Some(owned) => ReturnValue::Str(owned.to_string_lossy()),
        None => ReturnValue::Null,
    }
}

unsafe fn decode_int_array(value: &WireValue, boundary: &dyn Boundary) -> BridgeResult<ReturnValue> {
    let Some((ptr, count)) = value.as_int32_array_ptr() else {
        return Ok(ReturnValue::Null);
    };
    let Some(ptr) = NonNull::new(ptr) else {
        return if count == 0 {
            Ok(ReturnValue::Null)
        } else {
            Err(BridgeError::MalformedEnvelope(format!(
                "null int32 array with count {}",
                count
            )))
        };
    };

    let owned = OwnedIntArray { boundary, ptr };
    let len = element_count(count, "int32 array")?;
    let data = std::slice::from_raw_parts(owned.ptr.as_ptr(), len).to_vec();
    drop(owned);
    Ok(ReturnValue::Int32Array(data))
}

unsafe fn decode_string_array(
    value: &WireValue,
    boundary: &dyn Boundary,
) -> BridgeResult<ReturnValue> {
    let Some((ptr, count)) = value.as_string_array_ptr() else {
        return Ok(ReturnValue::Null);
    };
    let Some(ptr) = NonNull::new(ptr) else {
        return if count == 0 {
            Ok(ReturnValue::Null)
        } else {
            Err(BridgeError::MalformedEnvelope(format!(
                "null string array with count {}",
                count
            )))
        };
    };

    // Declared first so it drops last: entries go back before the table.
    let table = OwnedStringTable { boundary, ptr };
    let len = element_count(count, "string array")?;
    let entries: Vec<Option<OwnedString<'_>>> =
        std::slice::from_raw_parts(table.ptr.as_ptr() as *const *mut c_char, len)
            .iter()
            .map(|entry| OwnedString::adopt(boundary, *entry))
            .collect();

    let mut strings = Vec::with_capacity(len);
    for (index, entry) in entries.iter().enumerate() {
        match entry {
            Some(owned) => strings.push(owned.to_string_lossy()),
            None => {
                return Err(BridgeError::MalformedEnvelope(format!(
                    "null entry {} in string array",
                    index
                )))
            }
        }
    }

    drop(entries);
    drop(table);
    Ok(ReturnValue::StringArray(strings))
}
