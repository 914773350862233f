//! Local value model
//!
//! `Value` is what a call site hands to the bridge: a dynamically-typed value
//! that the encoder narrows to a wire tag. `ReturnValue` is what comes back
//! after decoding. Object references borrow an `ObjectHandle` for the duration
//! of the call; returned objects arrive as owned handles.

use crate::error::{BridgeError, BridgeResult};
use crate::handle::ObjectHandle;

/// Dynamically-typed call-site value.
///
/// Not every variant can cross the boundary: `Null`, `Double` and nested
/// lists are accepted here so that encoding can reject them with a precise
/// `UnsupportedArgumentType` instead of failing at conversion time.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// Absent value
    Null,
    /// Signed integer; narrowed to int32 or int64 by magnitude
    Int(i64),
    /// Single-precision float
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 text
    Str(String),
    /// Homogeneous array; the first element decides the element kind
    List(Vec<Value<'a>>),
    /// Borrowed foreign object
    Object(&'a ObjectHandle),
}

impl Value<'_> {
    /// Kind name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value<'_> {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value<'_> {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<'a> From<&'a ObjectHandle> for Value<'a> {
    fn from(v: &'a ObjectHandle) -> Self {
        Value::Object(v)
    }
}

impl<'a, T: Into<Value<'a>>> From<Vec<T>> for Value<'a> {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Explicit return-kind token for a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// `V`
    Void,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `F`
    Float,
    /// `Z`
    Boolean,
    /// `Ljava/lang/String;`
    String,
    /// `[I`
    IntArray,
    /// `[Ljava/lang/String;`
    StringArray,
    /// `Ljava/lang/Object;`
    Object,
}

impl ReturnKind {
    /// Kind name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ReturnKind::Void => "void",
            ReturnKind::Int => "int32",
            ReturnKind::Long => "int64",
            ReturnKind::Float => "float32",
            ReturnKind::Boolean => "boolean",
            ReturnKind::String => "string",
            ReturnKind::IntArray => "int32[]",
            ReturnKind::StringArray => "string[]",
            ReturnKind::Object => "object",
        }
    }

    /// Whether a decoded value satisfies this kind; null satisfies any
    /// reference kind
    pub fn accepts(self, value: &ReturnValue) -> bool {
        match (self, value) {
            (ReturnKind::Void, ReturnValue::Void) => true,
            (ReturnKind::Int, ReturnValue::Int32(_)) => true,
            (ReturnKind::Long, ReturnValue::Int64(_)) => true,
            (ReturnKind::Float, ReturnValue::Float32(_)) => true,
            (ReturnKind::Boolean, ReturnValue::Boolean(_)) => true,
            (ReturnKind::String, ReturnValue::Str(_)) => true,
            (ReturnKind::IntArray, ReturnValue::Int32Array(_)) => true,
            (ReturnKind::StringArray, ReturnValue::StringArray(_)) => true,
            (ReturnKind::Object, ReturnValue::Object(_)) => true,
            (
                ReturnKind::String
                | ReturnKind::IntArray
                | ReturnKind::StringArray
                | ReturnKind::Object,
                ReturnValue::Null,
            ) => true,
            _ => false,
        }
    }

    /// Parse a kind name as written in config files and on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "void" => Some(ReturnKind::Void),
            "int" | "int32" => Some(ReturnKind::Int),
            "long" | "int64" => Some(ReturnKind::Long),
            "float" | "float32" => Some(ReturnKind::Float),
            "bool" | "boolean" => Some(ReturnKind::Boolean),
            "string" => Some(ReturnKind::String),
            "int[]" | "int32[]" => Some(ReturnKind::IntArray),
            "string[]" => Some(ReturnKind::StringArray),
            "object" => Some(ReturnKind::Object),
            _ => None,
        }
    }
}

/// Decoded result of a call
#[derive(Debug)]
pub enum ReturnValue {
    /// The method returned nothing
    Void,
    /// A null reference for a string, array or object result
    Null,
    /// int32
    Int32(i32),
    /// int64
    Int64(i64),
    /// float32
    Float32(f32),
    /// boolean
    Boolean(bool),
    /// Copied string
    Str(String),
    /// Copied int32 array
    Int32Array(Vec<i32>),
    /// Copied string array
    StringArray(Vec<String>),
    /// Owned foreign object
    Object(ObjectHandle),
}

impl ReturnValue {
    /// Kind name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            ReturnValue::Void => "void",
            ReturnValue::Null => "null",
            ReturnValue::Int32(_) => "int32",
            ReturnValue::Int64(_) => "int64",
            ReturnValue::Float32(_) => "float32",
            ReturnValue::Boolean(_) => "boolean",
            ReturnValue::Str(_) => "string",
            ReturnValue::Int32Array(_) => "int32[]",
            ReturnValue::StringArray(_) => "string[]",
            ReturnValue::Object(_) => "object",
        }
    }

    /// Check if this is void
    pub fn is_void(&self) -> bool {
        matches!(self, ReturnValue::Void)
    }

    /// Get as i32 if this is an int32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ReturnValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as i64 if this is an int64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ReturnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as f32 if this is a float32
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ReturnValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ReturnValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as str if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReturnValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Take the object handle if this is an object
    pub fn into_object(self) -> Option<ObjectHandle> {
        match self {
            ReturnValue::Object(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Convert a decoded result into a Rust type.
///
/// `KIND` is the return kind written into the derived signature when the call
/// site asks for this type.
pub trait FromReturn: Sized {
    /// Return kind requested from the foreign method
    const KIND: ReturnKind;

    /// Convert, failing with `UnexpectedReturn` on a kind mismatch
    fn from_return(value: ReturnValue) -> BridgeResult<Self>;
}

fn mismatch<T>(expected: ReturnKind, value: &ReturnValue) -> BridgeResult<T> {
    Err(BridgeError::UnexpectedReturn {
        expected: expected.name(),
        found: value.kind_name(),
    })
}

macro_rules! impl_from_return {
    ($t:ty, $kind:expr, $variant:ident) => {
        impl FromReturn for $t {
            const KIND: ReturnKind = $kind;

            fn from_return(value: ReturnValue) -> BridgeResult<Self> {
                match value {
                    ReturnValue::$variant(v) => Ok(v),
                    other => mismatch(Self::KIND, &other),
                }
            }
        }
    };
}

impl_from_return!(i32, ReturnKind::Int, Int32);
impl_from_return!(i64, ReturnKind::Long, Int64);
impl_from_return!(f32, ReturnKind::Float, Float32);
impl_from_return!(bool, ReturnKind::Boolean, Boolean);
impl_from_return!(String, ReturnKind::String, Str);
impl_from_return!(Vec<i32>, ReturnKind::IntArray, Int32Array);
impl_from_return!(Vec<String>, ReturnKind::StringArray, StringArray);
impl_from_return!(ObjectHandle, ReturnKind::Object, Object);

impl FromReturn for () {
    const KIND: ReturnKind = ReturnKind::Void;

    fn from_return(value: ReturnValue) -> BridgeResult<Self> {
        match value {
            ReturnValue::Void => Ok(()),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl<T: FromReturn> FromReturn for Option<T> {
    const KIND: ReturnKind = T::KIND;

    fn from_return(value: ReturnValue) -> BridgeResult<Self> {
        match value {
            ReturnValue::Null => Ok(None),
            other => T::from_return(other).map(Some),
        }
    }
}
