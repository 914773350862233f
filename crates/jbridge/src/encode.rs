//! Argument encoding
//!
//! Converts call-site values into the contiguous `WireValue` array passed as
//! `argv`. Every buffer the wire records point into (C strings, int arrays,
//! string pointer tables) is owned by the `EncodedArgs` itself, so the
//! pointers stay valid for exactly as long as the call needs them and never
//! alias call-site storage.

use std::ffi::CString;
use std::os::raw::c_char;

use jbridge_sdk::WireValue;

use crate::error::{BridgeError, BridgeResult};
use crate::signature::{classify, ArgKind};
use crate::value::Value;

/// Encoded argument list for one call
#[derive(Debug, Default)]
pub struct EncodedArgs {
    wire: Vec<WireValue>,
    strings: Vec<CString>,
    int_arrays: Vec<Vec<i32>>,
    string_tables: Vec<Vec<*mut c_char>>,
}

impl EncodedArgs {
    /// Encode `args` in order.
    ///
    /// Fails before producing anything if any argument is unsupported, so a
    /// partially encoded list never reaches the boundary.
    pub fn encode(args: &[Value<'_>]) -> BridgeResult<Self> {
        let mut encoded = EncodedArgs {
            wire: Vec::with_capacity(args.len()),
            ..Default::default()
        };
        for (position, value) in args.iter().enumerate() {
            let kind = classify(position, value)?;
            let wire = encoded.encode_one(position, kind, value)?;
            encoded.wire.push(wire);
        }
        Ok(encoded)
    }

    fn encode_one(
        &mut self,
        position: usize,
        kind: ArgKind,
        value: &Value<'_>,
    ) -> BridgeResult<WireValue> {
        let wire = match (kind, value) {
            (ArgKind::Int, Value::Int(v)) => WireValue::int32(narrow(position, *v)?),
            (ArgKind::Long, Value::Int(v)) => WireValue::int64(*v),
            (ArgKind::Float, Value::Float(v)) => WireValue::float32(*v),
            (ArgKind::Boolean, Value::Bool(v)) => WireValue::boolean(*v),
            (ArgKind::String, Value::Str(s)) => WireValue::string(self.own_string(position, s)?),
            (ArgKind::Object, Value::Object(handle)) => WireValue::object(handle.as_raw_for_call()?),
            (ArgKind::EmptyArray, _) => WireValue::empty_object_array(),
            (ArgKind::IntArray, Value::List(items)) => {
                let mut data = items
                    .iter()
                    .map(|item| match item {
                        Value::Int(v) => narrow(position, *v),
                        other => Err(unsupported(position, other.kind_name())),
                    })
                    .collect::<BridgeResult<Vec<i32>>>()?;
                let count = wire_count(data.len())?;
                let ptr = data.as_mut_ptr();
                self.int_arrays.push(data);
                WireValue::int32_array(ptr, count)
            }
            (ArgKind::StringArray, Value::List(items)) => {
                let mut table = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Str(s) => table.push(self.own_string(position, s)?),
                        other => return Err(unsupported(position, other.kind_name())),
                    }
                }
                let count = wire_count(table.len())?;
                let ptr = table.as_mut_ptr();
                self.string_tables.push(table);
                WireValue::string_array(ptr, count)
            }
            (_, other) => return Err(unsupported(position, other.kind_name())),
        };
        Ok(wire)
    }

    fn own_string(&mut self, position: usize, s: &str) -> BridgeResult<*mut c_char> {
        let owned =
            CString::new(s).map_err(|_| unsupported(position, "text with interior NUL"))?;
        let ptr = owned.as_ptr().cast_mut();
        self.strings.push(owned);
        Ok(ptr)
    }

    /// The wire records, in argument order
    pub fn values(&self) -> &[WireValue] {
        &self.wire
    }

    /// Pointer passed as `argv`
    pub fn as_ptr(&self) -> *const WireValue {
        self.wire.as_ptr()
    }

    /// Count passed as `argc`
    pub fn argc(&self) -> BridgeResult<i32> {
        i32::try_from(self.wire.len()).map_err(|_| BridgeError::TooManyArguments(self.wire.len()))
    }

    /// Number of encoded arguments
    pub fn len(&self) -> usize {
        self.wire.len()
    }

    /// Whether there are no arguments
    pub fn is_empty(&self) -> bool {
        self.wire.is_empty()
    }
}

fn unsupported(position: usize, kind: &str) -> BridgeError {
    BridgeError::UnsupportedArgumentType {
        position,
        kind: kind.to_string(),
    }
}

fn narrow(position: usize, v: i64) -> BridgeResult<i32> {
    i32::try_from(v).map_err(|_| unsupported(position, "wide integer in int array"))
}

fn wire_count(len: usize) -> BridgeResult<i32> {
    i32::try_from(len).map_err(|_| BridgeError::TooManyArguments(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbridge_sdk::ValueTag;

    #[test]
    fn test_encode_scalars() {
        let args = vec![
            Value::from(5),
            Value::from(5_000_000_000i64),
            Value::from(2.5f32),
            Value::from(true),
        ];
        let encoded = EncodedArgs::encode(&args).unwrap();
        let wire = encoded.values();
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[0].as_int32(), Some(5));
        assert_eq!(wire[1].as_int64(), Some(5_000_000_000));
        assert_eq!(wire[2].as_float32(), Some(2.5));
        assert_eq!(wire[3].as_boolean(), Some(true));
        assert_eq!(encoded.argc().unwrap(), 4);
    }

    #[test]
    fn test_encode_string_owns_buffer() {
        let encoded = {
            let text = String::from("grüße, 世界");
            let args = vec![Value::Str(text.clone())];
            EncodedArgs::encode(&args).unwrap()
        };
        // Call-site storage is gone; the encoded copy is still readable.
        let s = unsafe { encoded.values()[0].as_cstr() }.unwrap();
        assert_eq!(s.to_str().unwrap(), "grüße, 世界");
    }

    #[test]
    fn test_encode_arrays() {
        let args = vec![Value::from(vec![1, 2, 3]), Value::from(vec!["a", "bc"])];
        let encoded = EncodedArgs::encode(&args).unwrap();

        let ints = unsafe { encoded.values()[0].as_int32_slice() }.unwrap();
        assert_eq!(ints, &[1, 2, 3]);

        let table = unsafe { encoded.values()[1].as_string_ptr_slice() }.unwrap();
        let strings: Vec<String> = table
            .iter()
            .map(|p| unsafe { std::ffi::CStr::from_ptr(*p) }.to_string_lossy().into_owned())
            .collect();
        assert_eq!(strings, vec!["a", "bc"]);
    }

    #[test]
    fn test_encode_empty_array_placeholder() {
        let encoded = EncodedArgs::encode(&[Value::List(vec![])]).unwrap();
        let wire = encoded.values()[0];
        assert_eq!(wire.tag(), Ok(ValueTag::ObjectArray));
        assert_eq!(wire.count(), 0);
    }

    #[test]
    fn test_encode_interior_nul_rejected() {
        let err = EncodedArgs::encode(&[Value::from(1), Value::from("a\0b")]).unwrap_err();
        match err {
            BridgeError::UnsupportedArgumentType { position, kind } => {
                assert_eq!(position, 1);
                assert_eq!(kind, "text with interior NUL");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_encode_rejects_before_output() {
        let err = EncodedArgs::encode(&[Value::from("ok"), Value::Double(1.0)]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnsupportedArgumentType { position: 1, .. }
        ));
    }

    #[test]
    fn test_encode_no_arguments() {
        let encoded = EncodedArgs::encode(&[]).unwrap();
        assert!(encoded.is_empty());
        assert_eq!(encoded.argc().unwrap(), 0);
    }
}
