//! Wire tags for `WireValue`
//!
//! The tag travels as a raw `i32` so that a value written by a newer (or
//! broken) boundary can still be inspected safely. `ValueTag` is the checked
//! view of that integer.
//!
//! ```text
//! VOID=0  INT32=1  INT64=2  FLOAT32=3  BOOLEAN=4  UTF8_STRING=5
//! INT32_ARRAY=6  UTF8_STRING_ARRAY=7  OBJECT_REF=8  EXCEPTION=9
//! OBJECT_ARRAY=10 (argument-only, empty-array placeholder)
//! ```

use std::fmt;

/// Raw tag value rejected by `ValueTag::try_from`
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown value tag {0}")]
pub struct UnknownTag(pub i32);

/// Checked wire tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ValueTag {
    /// No value
    Void = 0,
    /// 32-bit signed integer
    Int32 = 1,
    /// 64-bit signed integer
    Int64 = 2,
    /// IEEE single-precision float
    Float32 = 3,
    /// Boolean stored as one byte
    Boolean = 4,
    /// NUL-terminated UTF-8 string
    Utf8String = 5,
    /// `count` contiguous 32-bit integers
    Int32Array = 6,
    /// `count` pointers to NUL-terminated UTF-8 strings
    Utf8StringArray = 7,
    /// Opaque foreign object handle
    ObjectRef = 8,
    /// Foreign exception; the message lives in the envelope
    Exception = 9,
    /// Generic object array placeholder, used for empty arrays
    ObjectArray = 10,
}

impl ValueTag {
    /// Every tag, in discriminant order
    pub const ALL: [ValueTag; 11] = [
        ValueTag::Void,
        ValueTag::Int32,
        ValueTag::Int64,
        ValueTag::Float32,
        ValueTag::Boolean,
        ValueTag::Utf8String,
        ValueTag::Int32Array,
        ValueTag::Utf8StringArray,
        ValueTag::ObjectRef,
        ValueTag::Exception,
        ValueTag::ObjectArray,
    ];

    /// Raw integer written on the wire
    #[inline]
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Short lowercase name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ValueTag::Void => "void",
            ValueTag::Int32 => "int32",
            ValueTag::Int64 => "int64",
            ValueTag::Float32 => "float32",
            ValueTag::Boolean => "boolean",
            ValueTag::Utf8String => "string",
            ValueTag::Int32Array => "int32[]",
            ValueTag::Utf8StringArray => "string[]",
            ValueTag::ObjectRef => "object",
            ValueTag::Exception => "exception",
            ValueTag::ObjectArray => "object[]",
        }
    }

    /// Whether this tag carries `count` elements
    #[inline]
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            ValueTag::Int32Array | ValueTag::Utf8StringArray | ValueTag::ObjectArray
        )
    }
}

impl TryFrom<i32> for ValueTag {
    type Error = UnknownTag;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        ValueTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.raw() == raw)
            .ok_or(UnknownTag(raw))
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
