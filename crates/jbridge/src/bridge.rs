//! Invocation bridge
//!
//! Every call runs the same pipeline: encode the arguments, derive the
//! descriptor, cross the boundary, decode the envelope. The three call shapes
//! differ only in what identifies the target.

use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use crate::boundary::{Boundary, NativeBoundary};
use crate::config::BoundaryConfig;
use crate::decode::decode;
use crate::encode::EncodedArgs;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{HandleManager, ObjectHandle};
use crate::signature::MethodDescriptor;
use crate::value::{FromReturn, ReturnKind, ReturnValue, Value};

/// A bound boundary plus the handle manager for objects it returns.
///
/// Cheap to share by reference; all methods take `&self`. Handles returned
/// by a bridge keep the boundary alive on their own, so they may outlive it.
pub struct Bridge {
    boundary: Arc<dyn Boundary>,
    handles: HandleManager,
    library: Option<String>,
}

impl Bridge {
    /// Create a bridge over an already bound boundary
    pub fn new(boundary: Arc<dyn Boundary>) -> Self {
        Self {
            handles: HandleManager::new(Arc::clone(&boundary)),
            boundary,
            library: None,
        }
    }

    /// Load the configured boundary library and bind its entry points
    pub fn open(config: &BoundaryConfig) -> BridgeResult<Self> {
        let native = NativeBoundary::open(&config.library, &config.symbol_prefix)?;
        let library = native.path().to_string();
        let mut bridge = Self::new(Arc::new(native));
        bridge.library = Some(library);
        Ok(bridge)
    }

    /// Path of the loaded library, if this bridge was opened from one
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }

    /// Number of object handles from this bridge that are still live
    pub fn live_handles(&self) -> usize {
        self.handles.live()
    }

    /// Call a static method; the decoded value is returned as is
    pub fn call_static(
        &self,
        owner: &str,
        member: &str,
        args: &[Value<'_>],
    ) -> BridgeResult<ReturnValue> {
        self.call_static_as(owner, member, args, None)
    }

    /// Call a static method with an optional explicit return kind
    pub fn call_static_as(
        &self,
        owner: &str,
        member: &str,
        args: &[Value<'_>],
        ret: Option<ReturnKind>,
    ) -> BridgeResult<ReturnValue> {
        let encoded = EncodedArgs::encode(args)?;
        let descriptor = MethodDescriptor::for_static(owner, member, args, ret)?;
        let value = self.cross(&descriptor, None, &encoded)?;
        expect_kind(ret, value)
    }

    /// Call a static method and convert the result
    pub fn call_static_typed<T: FromReturn>(
        &self,
        owner: &str,
        member: &str,
        args: &[Value<'_>],
    ) -> BridgeResult<T> {
        T::from_return(self.call_static_as(owner, member, args, Some(T::KIND))?)
    }

    /// Call a method on a live receiver; the decoded value is returned as is
    pub fn call_method(
        &self,
        receiver: &ObjectHandle,
        member: &str,
        args: &[Value<'_>],
    ) -> BridgeResult<ReturnValue> {
        self.call_method_as(receiver, member, args, None)
    }

    /// Call a method on a live receiver with an optional explicit return kind
    pub fn call_method_as(
        &self,
        receiver: &ObjectHandle,
        member: &str,
        args: &[Value<'_>],
        ret: Option<ReturnKind>,
    ) -> BridgeResult<ReturnValue> {
        let encoded = EncodedArgs::encode(args)?;
        let descriptor = MethodDescriptor::for_instance(member, args, ret)?;
        let value = self.cross(&descriptor, Some(receiver), &encoded)?;
        expect_kind(ret, value)
    }

    /// Call a method on a live receiver and convert the result
    pub fn call_method_typed<T: FromReturn>(
        &self,
        receiver: &ObjectHandle,
        member: &str,
        args: &[Value<'_>],
    ) -> BridgeResult<T> {
        T::from_return(self.call_method_as(receiver, member, args, Some(T::KIND))?)
    }

    /// Construct an instance of `owner`.
    ///
    /// Succeeds only with a fresh handle; any other decoded result is
    /// released and reported as `UnexpectedReturn`.
    pub fn construct(&self, owner: &str, args: &[Value<'_>]) -> BridgeResult<ObjectHandle> {
        let encoded = EncodedArgs::encode(args)?;
        let descriptor = MethodDescriptor::for_constructor(owner, args)?;
        match self.cross(&descriptor, None, &encoded)? {
            ReturnValue::Object(handle) => Ok(handle),
            other => {
                tracing::warn!(
                    method = %descriptor,
                    found = other.kind_name(),
                    "constructor did not return an object"
                );
                Err(BridgeError::UnexpectedReturn {
                    expected: ReturnKind::Object.name(),
                    found: other.kind_name(),
                })
            }
        }
    }

    fn cross(
        &self,
        descriptor: &MethodDescriptor,
        receiver: Option<&ObjectHandle>,
        encoded: &EncodedArgs,
    ) -> BridgeResult<ReturnValue> {
        let argc = encoded.argc()?;
        let signature = c_name(&descriptor.signature)?;
        tracing::debug!(method = %descriptor, argc, "invoking foreign method");

        let envelope = if descriptor.is_constructor {
            let owner = c_name(&descriptor.internal_owner().unwrap_or_default())?;
            unsafe {
                self.boundary
                    .construct(&owner, &signature, encoded.as_ptr(), argc)
            }
        } else if let Some(receiver) = receiver {
            let member = c_name(&descriptor.member_name)?;
            let raw = receiver.as_raw_for_call()?;
            unsafe {
                self.boundary
                    .invoke_instance(raw, &member, &signature, encoded.as_ptr(), argc)
            }
        } else {
            let owner = c_name(&descriptor.internal_owner().unwrap_or_default())?;
            let member = c_name(&descriptor.member_name)?;
            unsafe {
                self.boundary
                    .invoke_static(&owner, &member, &signature, encoded.as_ptr(), argc)
            }
        };
        tracing::trace!(tag = envelope.value.raw_tag(), "boundary returned");

        let value = unsafe { decode(envelope, self.boundary.as_ref(), &self.handles) }?;
        tracing::trace!(kind = value.kind_name(), "decoded return value");
        Ok(value)
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("library", &self.library)
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

fn c_name(name: &str) -> BridgeResult<CString> {
    CString::new(name).map_err(|_| BridgeError::InvalidPath(format!("{:?} contains NUL", name)))
}

fn expect_kind(ret: Option<ReturnKind>, value: ReturnValue) -> BridgeResult<ReturnValue> {
    match ret {
        Some(kind) if !kind.accepts(&value) => Err(BridgeError::UnexpectedReturn {
            expected: kind.name(),
            found: value.kind_name(),
        }),
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CallShape, MockBoundary, Reply, SeenArg};

    fn bridge() -> (Arc<MockBoundary>, Bridge) {
        let mock = Arc::new(MockBoundary::new());
        (mock.clone(), Bridge::new(mock))
    }

    #[test]
    fn test_static_call_end_to_end() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Int32(5));

        let result = bridge
            .call_static("com.example.Calc", "add", &[Value::from(2), Value::from(3)])
            .unwrap();
        assert_eq!(result.as_i32(), Some(5));

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].shape,
            CallShape::Static {
                owner: "com/example/Calc".to_string()
            }
        );
        assert_eq!(calls[0].member.as_deref(), Some("add"));
        assert_eq!(calls[0].signature, "(II)V");
        assert_eq!(calls[0].args, vec![SeenArg::Int32(2), SeenArg::Int32(3)]);
    }

    #[test]
    fn test_explicit_return_kind_in_signature() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Str("HI".into()));

        let s: String = bridge
            .call_static_typed("com.example.Texts", "upper", &[Value::from("hi")])
            .unwrap();
        assert_eq!(s, "HI");
        assert_eq!(
            mock.calls()[0].signature,
            "(Ljava/lang/String;)Ljava/lang/String;"
        );
        assert_eq!(mock.outstanding(), 0);
    }

    #[test]
    fn test_unexpected_return_releases_value() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Str("not an int".into()));

        let err = bridge
            .call_static_as("a.B", "m", &[], Some(ReturnKind::Int))
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnexpectedReturn {
                expected: "int32",
                found: "string"
            }
        ));
        assert_eq!(mock.released_strings(), 1);
        assert_eq!(mock.outstanding(), 0);
    }

    #[test]
    fn test_constructor_and_double_release() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Object(0x100));

        let handle = bridge
            .construct("java.lang.StringBuilder", &[Value::from("seed")])
            .unwrap();
        let call = &mock.calls()[0];
        assert_eq!(
            call.shape,
            CallShape::Construct {
                owner: "java/lang/StringBuilder".to_string()
            }
        );
        assert_eq!(call.member, None);
        assert_eq!(call.signature, "(Ljava/lang/String;)Ljava/lang/Object;");
        assert_eq!(bridge.live_handles(), 1);

        assert!(handle.release());
        assert!(!handle.release());
        assert_eq!(mock.object_releases(), vec![0x100]);
        assert_eq!(bridge.live_handles(), 0);
    }

    #[test]
    fn test_constructor_rejects_primitive() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Int32(1));
        let err = bridge.construct("a.B", &[]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnexpectedReturn {
                expected: "object",
                found: "int32"
            }
        ));
    }

    #[test]
    fn test_instance_call_passes_receiver() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Object(0x200));
        mock.reply(Reply::Object(0x200));
        mock.reply(Reply::Str("ab".into()));

        let sb = bridge.construct("java.lang.StringBuilder", &[]).unwrap();
        let same = bridge
            .call_method(&sb, "append", &[Value::from("ab")])
            .unwrap()
            .into_object()
            .unwrap();
        let text: String = bridge.call_method_typed(&sb, "toString", &[]).unwrap();
        assert_eq!(text, "ab");

        let calls = mock.calls();
        assert_eq!(calls[1].shape, CallShape::Instance { receiver: 0x200 });
        assert_eq!(calls[1].signature, "(Ljava/lang/String;)V");
        assert_eq!(calls[2].signature, "()Ljava/lang/String;");

        drop(same);
        drop(sb);
        assert_eq!(mock.object_releases(), vec![0x200, 0x200]);
    }

    #[test]
    fn test_object_argument() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Object(0x300));
        mock.reply(Reply::Void);

        let obj = bridge.construct("a.B", &[]).unwrap();
        bridge
            .call_static("a.C", "take", &[Value::from(&obj)])
            .unwrap();
        let call = &mock.calls()[1];
        assert_eq!(call.signature, "(Ljava/lang/Object;)V");
        assert_eq!(call.args, vec![SeenArg::Object(0x300)]);
    }

    #[test]
    fn test_released_receiver_never_crosses() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Object(0x400));
        let obj = bridge.construct("a.B", &[]).unwrap();
        obj.release();

        let err = bridge.call_method(&obj, "m", &[]).unwrap_err();
        assert!(matches!(err, BridgeError::HandleReleased));
        let err = bridge
            .call_static("a.C", "take", &[Value::from(&obj)])
            .unwrap_err();
        assert!(matches!(err, BridgeError::HandleReleased));
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_foreign_exception_propagates() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Exception(Some(
            "java.lang.ArithmeticException: / by zero".into(),
        )));

        let err = bridge
            .call_static("com.example.Calc", "divide", &[Value::from(1), Value::from(0)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ForeignInvocationError: java.lang.ArithmeticException: / by zero"
        );
        assert_eq!(mock.released_strings(), 1);
    }

    #[test]
    fn test_encoding_error_never_crosses() {
        let (mock, bridge) = bridge();
        let err = bridge
            .call_static("a.B", "m", &[Value::from(vec![Value::from(1), Value::from("a")])])
            .unwrap_err();
        assert!(matches!(err, BridgeError::HeterogeneousArray { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_arrays_round_trip_through_mock() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::StringArray(vec!["x".into(), "yz".into()]));
        mock.reply(Reply::Int32Array(vec![1, 2]));

        let parts: Vec<String> = bridge
            .call_static_typed("a.B", "split", &[Value::from("x yz")])
            .unwrap();
        assert_eq!(parts, vec!["x", "yz"]);
        let lens: Vec<i32> = bridge
            .call_static_typed("a.B", "lengths", &[Value::from(vec!["x", "yz"])])
            .unwrap();
        assert_eq!(lens, vec![1, 2]);

        assert_eq!(mock.released_strings(), 2);
        assert_eq!(mock.released_string_tables(), 1);
        assert_eq!(mock.released_int_arrays(), 1);
        assert_eq!(mock.outstanding(), 0);
        assert_eq!(mock.bogus_releases(), 0);
        assert_eq!(
            mock.calls()[1].args,
            vec![SeenArg::StringArray(vec!["x".into(), "yz".into()])]
        );
    }

    #[test]
    fn test_unknown_tag_is_protocol_mismatch() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::RawTag(42));
        let err = bridge.call_static("a.B", "m", &[]).unwrap_err();
        assert!(err.is_protocol_mismatch());
    }

    #[test]
    fn test_null_string_return() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::NullStr);
        let value: Option<String> = bridge.call_static_typed("a.B", "m", &[]).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_scalar_returns() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Int64(1 << 40));
        mock.reply(Reply::Float32(0.5));
        mock.reply(Reply::Boolean(true));
        assert_eq!(
            bridge.call_static_typed::<i64>("a.B", "l", &[]).unwrap(),
            1 << 40
        );
        assert_eq!(bridge.call_static_typed::<f32>("a.B", "f", &[]).unwrap(), 0.5);
        assert!(bridge.call_static_typed::<bool>("a.B", "z", &[]).unwrap());
        let sigs: Vec<String> = mock.calls().into_iter().map(|c| c.signature).collect();
        assert_eq!(sigs, vec!["()J", "()F", "()Z"]);
    }
}
