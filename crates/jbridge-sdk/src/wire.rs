//! Fixed-layout wire records
//!
//! `WireValue` is the tagged union that crosses the C boundary in both
//! directions; `ReturnEnvelope` adds the exception message slot used for
//! results.
//!
//! ```c
//! typedef struct {
//!     int32_t tag;
//!     int32_t count;          /* element count for array tags */
//!     union {
//!         int32_t i32; int64_t i64; float f32; uint8_t boolean;
//!         char* string; int32_t* int32_array; char** string_array; void* object;
//!     } payload;
//! } WireValue;
//!
//! typedef struct { WireValue value; char* error_message; } ReturnEnvelope;
//! ```
//!
//! Payload reads go through accessors that check the tag first; the union
//! itself is only read here.

use std::ffi::{c_void, CStr};
use std::fmt;
use std::os::raw::c_char;
use std::ptr;

use crate::tag::{UnknownTag, ValueTag};

/// Payload storage for `WireValue`
#[repr(C)]
#[derive(Clone, Copy)]
pub union WirePayload {
    /// `INT32`
    pub int32: i32,
    /// `INT64`
    pub int64: i64,
    /// `FLOAT32`
    pub float32: f32,
    /// `BOOLEAN` (0 or 1)
    pub boolean: u8,
    /// `UTF8_STRING`
    pub string: *mut c_char,
    /// `INT32_ARRAY`
    pub int32_array: *mut i32,
    /// `UTF8_STRING_ARRAY`
    pub string_array: *mut *mut c_char,
    /// `OBJECT_REF` and `OBJECT_ARRAY`
    pub object: *mut c_void,
}

impl WirePayload {
    const fn empty() -> Self {
        WirePayload { int64: 0 }
    }
}

/// Tagged value crossing the boundary
#[repr(C)]
#[derive(Clone, Copy)]
pub struct WireValue {
    tag: i32,
    count: i32,
    payload: WirePayload,
}

unsafe impl Send for WireValue {}
unsafe impl Sync for WireValue {}

impl WireValue {
    /// Assemble a value from raw parts.
    ///
    /// # Safety
    /// `tag`, `count` and the populated payload field must agree. The
    /// constructors below are the safe way to build values; this exists for
    /// boundary implementations and protocol tests that need arbitrary tags.
    #[inline]
    pub const unsafe fn from_raw_parts(tag: i32, count: i32, payload: WirePayload) -> Self {
        Self {
            tag,
            count,
            payload,
        }
    }

    /// Create a void value
    #[inline]
    pub const fn void() -> Self {
        Self {
            tag: ValueTag::Void.raw(),
            count: 0,
            payload: WirePayload::empty(),
        }
    }

    /// Create an int32 value
    #[inline]
    pub const fn int32(v: i32) -> Self {
        Self {
            tag: ValueTag::Int32.raw(),
            count: 0,
            payload: WirePayload { int32: v },
        }
    }

    /// Create an int64 value
    #[inline]
    pub const fn int64(v: i64) -> Self {
        Self {
            tag: ValueTag::Int64.raw(),
            count: 0,
            payload: WirePayload { int64: v },
        }
    }

    /// Create a float32 value
    #[inline]
    pub const fn float32(v: f32) -> Self {
        Self {
            tag: ValueTag::Float32.raw(),
            count: 0,
            payload: WirePayload { float32: v },
        }
    }

    /// Create a boolean value
    #[inline]
    pub const fn boolean(v: bool) -> Self {
        Self {
            tag: ValueTag::Boolean.raw(),
            count: 0,
            payload: WirePayload { boolean: v as u8 },
        }
    }

    /// Create a string value pointing at a NUL-terminated buffer
    #[inline]
    pub const fn string(ptr: *mut c_char) -> Self {
        Self {
            tag: ValueTag::Utf8String.raw(),
            count: 0,
            payload: WirePayload { string: ptr },
        }
    }

    /// Create an int32 array value of `count` elements
    #[inline]
    pub const fn int32_array(ptr: *mut i32, count: i32) -> Self {
        Self {
            tag: ValueTag::Int32Array.raw(),
            count,
            payload: WirePayload { int32_array: ptr },
        }
    }

    /// Create a string array value of `count` entries
    #[inline]
    pub const fn string_array(ptr: *mut *mut c_char, count: i32) -> Self {
        Self {
            tag: ValueTag::Utf8StringArray.raw(),
            count,
            payload: WirePayload { string_array: ptr },
        }
    }

    /// Create an object reference value
    #[inline]
    pub const fn object(handle: *mut c_void) -> Self {
        Self {
            tag: ValueTag::ObjectRef.raw(),
            count: 0,
            payload: WirePayload { object: handle },
        }
    }

    /// Create the empty generic-object-array placeholder
    #[inline]
    pub const fn empty_object_array() -> Self {
        Self {
            tag: ValueTag::ObjectArray.raw(),
            count: 0,
            payload: WirePayload {
                object: ptr::null_mut(),
            },
        }
    }

    /// Raw tag as written on the wire
    #[inline]
    pub const fn raw_tag(&self) -> i32 {
        self.tag
    }

    /// Checked tag
    #[inline]
    pub fn tag(&self) -> Result<ValueTag, UnknownTag> {
        ValueTag::try_from(self.tag)
    }

    /// Element count (meaningful for array tags only)
    #[inline]
    pub const fn count(&self) -> i32 {
        self.count
    }

    #[inline]
    fn is(&self, tag: ValueTag) -> bool {
        self.tag == tag.raw()
    }

    /// Extract int32
    #[inline]
    pub fn as_int32(&self) -> Option<i32> {
        self.is(ValueTag::Int32)
            .then(|| unsafe { self.payload.int32 })
    }

    /// Extract int64
    #[inline]
    pub fn as_int64(&self) -> Option<i64> {
        self.is(ValueTag::Int64)
            .then(|| unsafe { self.payload.int64 })
    }

    /// Extract float32
    #[inline]
    pub fn as_float32(&self) -> Option<f32> {
        self.is(ValueTag::Float32)
            .then(|| unsafe { self.payload.float32 })
    }

    /// Extract boolean (any non-zero byte is true)
    #[inline]
    pub fn as_boolean(&self) -> Option<bool> {
        self.is(ValueTag::Boolean)
            .then(|| unsafe { self.payload.boolean != 0 })
    }

    /// Extract the string pointer
    #[inline]
    pub fn as_string_ptr(&self) -> Option<*mut c_char> {
        self.is(ValueTag::Utf8String)
            .then(|| unsafe { self.payload.string })
    }

    /// Extract the int32 array pointer and count
    #[inline]
    pub fn as_int32_array_ptr(&self) -> Option<(*mut i32, i32)> {
        self.is(ValueTag::Int32Array)
            .then(|| (unsafe { self.payload.int32_array }, self.count))
    }

    /// Extract the string array pointer and count
    #[inline]
    pub fn as_string_array_ptr(&self) -> Option<(*mut *mut c_char, i32)> {
        self.is(ValueTag::Utf8StringArray)
            .then(|| (unsafe { self.payload.string_array }, self.count))
    }

    /// Extract the object handle
    #[inline]
    pub fn as_object(&self) -> Option<*mut c_void> {
        self.is(ValueTag::ObjectRef)
            .then(|| unsafe { self.payload.object })
    }

    /// Borrow the string payload.
    ///
    /// # Safety
    /// The pointer must be null or point at a NUL-terminated buffer that
    /// outlives `'a`.
    pub unsafe fn as_cstr<'a>(&self) -> Option<&'a CStr> {
        let ptr = self.as_string_ptr()?;
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr))
        }
    }

    /// Borrow the int32 array payload.
    ///
    /// # Safety
    /// The pointer must be null or valid for `count` elements for `'a`.
    pub unsafe fn as_int32_slice<'a>(&self) -> Option<&'a [i32]> {
        let (ptr, count) = self.as_int32_array_ptr()?;
        let len = usize::try_from(count).ok()?;
        if len == 0 {
            Some(&[])
        } else if ptr.is_null() {
            None
        } else {
            Some(std::slice::from_raw_parts(ptr, len))
        }
    }

    /// Borrow the string array's pointer table.
    ///
    /// # Safety
    /// The pointer must be null or valid for `count` entries for `'a`.
    pub unsafe fn as_string_ptr_slice<'a>(&self) -> Option<&'a [*mut c_char]> {
        let (ptr, count) = self.as_string_array_ptr()?;
        let len = usize::try_from(count).ok()?;
        if len == 0 {
            Some(&[])
        } else if ptr.is_null() {
            None
        } else {
            Some(std::slice::from_raw_parts(ptr as *const *mut c_char, len))
        }
    }
}

impl Default for WireValue {
    fn default() -> Self {
        Self::void()
    }
}

impl fmt::Debug for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Ok(ValueTag::Void) => write!(f, "WireValue::Void"),
            Ok(ValueTag::Int32) => write!(f, "WireValue::Int32({})", unsafe { self.payload.int32 }),
            Ok(ValueTag::Int64) => write!(f, "WireValue::Int64({})", unsafe { self.payload.int64 }),
            Ok(ValueTag::Float32) => {
                write!(f, "WireValue::Float32({})", unsafe { self.payload.float32 })
            }
            Ok(ValueTag::Boolean) => {
                write!(f, "WireValue::Boolean({})", unsafe { self.payload.boolean != 0 })
            }
            Ok(ValueTag::Utf8String) => {
                write!(f, "WireValue::String({:p})", unsafe { self.payload.string })
            }
            Ok(ValueTag::Int32Array) => write!(
                f,
                "WireValue::Int32Array({:p}, count={})",
                unsafe { self.payload.int32_array },
                self.count
            ),
            Ok(ValueTag::Utf8StringArray) => write!(
                f,
                "WireValue::StringArray({:p}, count={})",
                unsafe { self.payload.string_array },
                self.count
            ),
            Ok(ValueTag::ObjectRef) => {
                write!(f, "WireValue::Object({:p})", unsafe { self.payload.object })
            }
            Ok(ValueTag::Exception) => write!(f, "WireValue::Exception"),
            Ok(ValueTag::ObjectArray) => write!(f, "WireValue::ObjectArray(count={})", self.count),
            Err(UnknownTag(raw)) => write!(f, "WireValue::Unknown(tag={})", raw),
        }
    }
}

/// Result record returned by every invoke entry point
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ReturnEnvelope {
    /// Returned value; its tag is `EXCEPTION` when the call threw
    pub value: WireValue,
    /// Exception message, owned by the boundary; only set for `EXCEPTION`
    pub error_message: *mut c_char,
}

unsafe impl Send for ReturnEnvelope {}
unsafe impl Sync for ReturnEnvelope {}

impl ReturnEnvelope {
    /// Wrap a returned value
    #[inline]
    pub const fn value(value: WireValue) -> Self {
        Self {
            value,
            error_message: ptr::null_mut(),
        }
    }

    /// A void result
    #[inline]
    pub const fn void() -> Self {
        Self::value(WireValue::void())
    }

    /// A foreign exception carrying `message` (may be null)
    #[inline]
    pub const fn exception(message: *mut c_char) -> Self {
        Self {
            value: WireValue {
                tag: ValueTag::Exception.raw(),
                count: 0,
                payload: WirePayload::empty(),
            },
            error_message: message,
        }
    }

    /// Whether the envelope signals a foreign exception
    #[inline]
    pub fn is_exception(&self) -> bool {
        self.value.is(ValueTag::Exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_layout() {
        assert_eq!(size_of::<WirePayload>(), 8);
        assert_eq!(size_of::<WireValue>(), 16);
        assert_eq!(align_of::<WireValue>(), 8);
        assert_eq!(size_of::<ReturnEnvelope>(), 16 + size_of::<*mut c_char>());
    }

    #[test]
    fn test_accessors_check_tag() {
        let v = WireValue::int32(42);
        assert_eq!(v.as_int32(), Some(42));
        assert_eq!(v.as_int64(), None);
        assert_eq!(v.as_float32(), None);
        assert!(v.as_string_ptr().is_none());

        let v = WireValue::int64(1 << 40);
        assert_eq!(v.as_int64(), Some(1 << 40));
        assert_eq!(v.as_int32(), None);

        let v = WireValue::boolean(true);
        assert_eq!(v.as_boolean(), Some(true));
        assert_eq!(v.as_int32(), None);
    }

    #[test]
    fn test_string_borrow() {
        let owned = CString::new("héllo").unwrap();
        let v = WireValue::string(owned.as_ptr().cast_mut());
        let borrowed = unsafe { v.as_cstr() }.unwrap();
        assert_eq!(borrowed.to_str().unwrap(), "héllo");
    }

    #[test]
    fn test_int32_slice() {
        let mut data = vec![1, 2, 3];
        let v = WireValue::int32_array(data.as_mut_ptr(), 3);
        assert_eq!(unsafe { v.as_int32_slice() }, Some(&[1, 2, 3][..]));

        let empty = WireValue::int32_array(ptr::null_mut(), 0);
        assert_eq!(unsafe { empty.as_int32_slice() }, Some(&[][..]));

        let negative = WireValue::int32_array(data.as_mut_ptr(), -1);
        assert_eq!(unsafe { negative.as_int32_slice() }, None);
    }

    #[test]
    fn test_unknown_tag() {
        let v = unsafe { WireValue::from_raw_parts(42, 0, WirePayload { int32: 7 }) };
        assert_eq!(v.tag(), Err(UnknownTag(42)));
        assert_eq!(v.as_int32(), None);
        assert!(format!("{:?}", v).contains("42"));
    }

    #[test]
    fn test_envelope() {
        let ok = ReturnEnvelope::value(WireValue::int32(5));
        assert!(!ok.is_exception());
        assert!(ok.error_message.is_null());

        let err = ReturnEnvelope::exception(ptr::null_mut());
        assert!(err.is_exception());
        assert_eq!(err.value.tag(), Ok(ValueTag::Exception));
    }
}
