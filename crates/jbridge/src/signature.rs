//! Signature derivation
//!
//! Turns the runtime kinds of call-site arguments into the foreign runtime's
//! method descriptor, e.g. `(ILjava/lang/String;)V`. Derivation looks only at
//! kinds, never at values beyond the int32/int64 magnitude split, so the same
//! kind sequence always yields the same descriptor.

use std::fmt;

use crate::error::{BridgeError, BridgeResult};
use crate::value::{ReturnKind, Value};

/// Descriptor code for `java.lang.String`
pub const STRING_CODE: &str = "Ljava/lang/String;";
/// Descriptor code for a generic object
pub const OBJECT_CODE: &str = "Ljava/lang/Object;";
/// Descriptor code for an int array
pub const INT_ARRAY_CODE: &str = "[I";
/// Descriptor code for a string array
pub const STRING_ARRAY_CODE: &str = "[Ljava/lang/String;";
/// Descriptor code for the generic object array used for empty arrays
pub const OBJECT_ARRAY_CODE: &str = "[Ljava/lang/Object;";

/// Member name the foreign runtime uses for constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Wire kind of one argument, decided before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// UTF-8 text
    String,
    /// Integer within the 32-bit signed range
    Int,
    /// Integer outside the 32-bit signed range
    Long,
    /// Single-precision float
    Float,
    /// Boolean
    Boolean,
    /// Non-empty array of 32-bit integers
    IntArray,
    /// Non-empty array of text
    StringArray,
    /// Foreign object reference
    Object,
    /// Empty array of unknown element kind
    EmptyArray,
}

impl ArgKind {
    /// Descriptor code for this kind
    pub const fn code(self) -> &'static str {
        match self {
            ArgKind::String => STRING_CODE,
            ArgKind::Int => "I",
            ArgKind::Long => "J",
            ArgKind::Float => "F",
            ArgKind::Boolean => "Z",
            ArgKind::IntArray => INT_ARRAY_CODE,
            ArgKind::StringArray => STRING_ARRAY_CODE,
            ArgKind::Object => OBJECT_CODE,
            ArgKind::EmptyArray => OBJECT_ARRAY_CODE,
        }
    }
}

/// Descriptor code for a return kind
pub const fn return_code(kind: ReturnKind) -> &'static str {
    match kind {
        ReturnKind::Void => "V",
        ReturnKind::Int => "I",
        ReturnKind::Long => "J",
        ReturnKind::Float => "F",
        ReturnKind::Boolean => "Z",
        ReturnKind::String => STRING_CODE,
        ReturnKind::IntArray => INT_ARRAY_CODE,
        ReturnKind::StringArray => STRING_ARRAY_CODE,
        ReturnKind::Object => OBJECT_CODE,
    }
}

fn unsupported(position: usize, kind: impl Into<String>) -> BridgeError {
    BridgeError::UnsupportedArgumentType {
        position,
        kind: kind.into(),
    }
}

/// Classify one argument.
///
/// Arrays are typed by their first element; every later element must share
/// that kind or the array is rejected as heterogeneous.
pub fn classify(position: usize, value: &Value<'_>) -> BridgeResult<ArgKind> {
    match value {
        Value::Int(v) => Ok(if i32::try_from(*v).is_ok() {
            ArgKind::Int
        } else {
            ArgKind::Long
        }),
        Value::Float(_) => Ok(ArgKind::Float),
        Value::Bool(_) => Ok(ArgKind::Boolean),
        Value::Str(_) => Ok(ArgKind::String),
        Value::Object(_) => Ok(ArgKind::Object),
        Value::List(items) => classify_list(position, items),
        Value::Null | Value::Double(_) => Err(unsupported(position, value.kind_name())),
    }
}

fn classify_list(position: usize, items: &[Value<'_>]) -> BridgeResult<ArgKind> {
    let Some(first) = items.first() else {
        return Ok(ArgKind::EmptyArray);
    };

    let kind = match first {
        Value::Int(_) => ArgKind::IntArray,
        Value::Str(_) => ArgKind::StringArray,
        other => return Err(unsupported(position, format!("list of {}", other.kind_name()))),
    };

    let expected = first.kind_name();
    for (index, item) in items.iter().enumerate().skip(1) {
        if std::mem::discriminant(item) != std::mem::discriminant(first) {
            return Err(BridgeError::HeterogeneousArray {
                position,
                index,
                expected,
                found: item.kind_name(),
            });
        }
    }

    if kind == ArgKind::IntArray {
        let wide = items
            .iter()
            .any(|item| matches!(item, Value::Int(v) if i32::try_from(*v).is_err()));
        if wide {
            return Err(unsupported(position, "wide integer in int array"));
        }
    }

    Ok(kind)
}

/// Classify every argument in order
pub fn classify_all(args: &[Value<'_>]) -> BridgeResult<Vec<ArgKind>> {
    args.iter()
        .enumerate()
        .map(|(position, value)| classify(position, value))
        .collect()
}

fn assemble(kinds: &[ArgKind], ret: &str) -> String {
    let mut signature = String::with_capacity(2 + kinds.len() * 2 + ret.len());
    signature.push('(');
    for kind in kinds {
        signature.push_str(kind.code());
    }
    signature.push(')');
    signature.push_str(ret);
    signature
}

/// Derive a method descriptor; the return code defaults to `V`
pub fn derive(args: &[Value<'_>], ret: Option<ReturnKind>) -> BridgeResult<String> {
    let kinds = classify_all(args)?;
    Ok(assemble(&kinds, return_code(ret.unwrap_or(ReturnKind::Void))))
}

/// Derive a constructor descriptor; the return code is always the object code
pub fn derive_constructor(args: &[Value<'_>]) -> BridgeResult<String> {
    let kinds = classify_all(args)?;
    Ok(assemble(&kinds, OBJECT_CODE))
}

/// Translate a dotted owner path to the foreign runtime's internal form
pub fn internal_name(owner_path: &str) -> String {
    owner_path.replace('.', "/")
}

/// Fully resolved call target, built fresh for every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Dotted class name; absent for instance calls
    pub owner_path: Option<String>,
    /// Method name, or `<init>` for constructors
    pub member_name: String,
    /// Derived descriptor string
    pub signature: String,
    /// Static call
    pub is_static: bool,
    /// Constructor call
    pub is_constructor: bool,
}

impl MethodDescriptor {
    /// Descriptor for a static method call
    pub fn for_static(
        owner_path: &str,
        member_name: &str,
        args: &[Value<'_>],
        ret: Option<ReturnKind>,
    ) -> BridgeResult<Self> {
        Ok(Self {
            owner_path: Some(owner_path.to_string()),
            member_name: member_name.to_string(),
            signature: derive(args, ret)?,
            is_static: true,
            is_constructor: false,
        })
    }

    /// Descriptor for an instance method call
    pub fn for_instance(
        member_name: &str,
        args: &[Value<'_>],
        ret: Option<ReturnKind>,
    ) -> BridgeResult<Self> {
        Ok(Self {
            owner_path: None,
            member_name: member_name.to_string(),
            signature: derive(args, ret)?,
            is_static: false,
            is_constructor: false,
        })
    }

    /// Descriptor for a constructor call
    pub fn for_constructor(owner_path: &str, args: &[Value<'_>]) -> BridgeResult<Self> {
        Ok(Self {
            owner_path: Some(owner_path.to_string()),
            member_name: CONSTRUCTOR_NAME.to_string(),
            signature: derive_constructor(args)?,
            is_static: false,
            is_constructor: true,
        })
    }

    /// Owner path with the foreign runtime's separator
    pub fn internal_owner(&self) -> Option<String> {
        self.owner_path.as_deref().map(internal_name)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner_path {
            Some(owner) => write!(f, "{}.{}{}", owner, self.member_name, self.signature),
            None => write!(f, "<receiver>.{}{}", self.member_name, self.signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(args: Vec<Value<'static>>) -> String {
        derive(&args, None).unwrap()
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(sig(vec![Value::Int(2_147_483_647)]), "(I)V");
        assert_eq!(sig(vec![Value::Int(-2_147_483_648)]), "(I)V");
        assert_eq!(sig(vec![Value::Int(2_147_483_648)]), "(J)V");
        assert_eq!(sig(vec![Value::Int(-2_147_483_649)]), "(J)V");
    }

    #[test]
    fn test_scalar_codes() {
        let args = vec![
            Value::from("text"),
            Value::from(1),
            Value::from(1.5f32),
            Value::from(false),
        ];
        assert_eq!(sig(args), "(Ljava/lang/String;IFZ)V");
        assert_eq!(sig(vec![]), "()V");
    }

    #[test]
    fn test_array_inference() {
        assert_eq!(sig(vec![Value::from(vec![1, 2, 3])]), "([I)V");
        assert_eq!(sig(vec![Value::from(vec!["a", "b"])]), "([Ljava/lang/String;)V");
        assert_eq!(sig(vec![Value::List(vec![])]), "([Ljava/lang/Object;)V");
    }

    #[test]
    fn test_heterogeneous_array() {
        let args = vec![Value::from(0), Value::List(vec![Value::from(1), Value::from("a")])];
        let err = derive(&args, None).unwrap_err();
        match err {
            BridgeError::HeterogeneousArray {
                position,
                index,
                expected,
                found,
            } => {
                assert_eq!(position, 1);
                assert_eq!(index, 1);
                assert_eq!(expected, "int");
                assert_eq!(found, "string");
            }
            other => panic!("expected HeterogeneousArray, got {:?}", other),
        }
    }

    #[test]
    fn test_wide_int_array_rejected() {
        let args = vec![Value::from(vec![1i64, 5_000_000_000])];
        assert!(matches!(
            derive(&args, None),
            Err(BridgeError::UnsupportedArgumentType { position: 0, .. })
        ));
    }

    #[test]
    fn test_unsupported_kinds() {
        for (value, kind) in [
            (Value::Null, "null"),
            (Value::Double(1.0), "double"),
            (Value::from(vec![true]), "list of bool"),
            (Value::List(vec![Value::List(vec![])]), "list of list"),
        ] {
            match derive(&[Value::from(1), value], None) {
                Err(BridgeError::UnsupportedArgumentType { position, kind: k }) => {
                    assert_eq!(position, 1);
                    assert_eq!(k, kind);
                }
                other => panic!("expected UnsupportedArgumentType, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_deterministic_and_value_independent() {
        let a = sig(vec![Value::from(1), Value::from("x"), Value::from(vec![9])]);
        let b = sig(vec![Value::from(-7), Value::from("other"), Value::from(vec![0, 1])]);
        assert_eq!(a, b);
        assert_eq!(a, "(ILjava/lang/String;[I)V");
    }

    #[test]
    fn test_explicit_return_kind() {
        let args = vec![Value::from(2), Value::from(3)];
        assert_eq!(derive(&args, Some(ReturnKind::Int)).unwrap(), "(II)I");
        assert_eq!(
            derive(&args, Some(ReturnKind::StringArray)).unwrap(),
            "(II)[Ljava/lang/String;"
        );
    }

    #[test]
    fn test_constructor_descriptor() {
        let d = MethodDescriptor::for_constructor("java.lang.StringBuilder", &[Value::from("a")])
            .unwrap();
        assert_eq!(d.signature, "(Ljava/lang/String;)Ljava/lang/Object;");
        assert_eq!(d.member_name, CONSTRUCTOR_NAME);
        assert!(d.is_constructor);
        assert!(!d.is_static);
        assert_eq!(d.internal_owner().as_deref(), Some("java/lang/StringBuilder"));
    }

    #[test]
    fn test_static_descriptor() {
        let d = MethodDescriptor::for_static(
            "com.example.Calc",
            "add",
            &[Value::from(2), Value::from(3)],
            None,
        )
        .unwrap();
        assert_eq!(d.signature, "(II)V");
        assert!(d.is_static);
        assert_eq!(d.internal_owner().as_deref(), Some("com/example/Calc"));
        assert_eq!(d.to_string(), "com.example.Calc.add(II)V");
    }

    #[test]
    fn test_instance_descriptor_has_no_owner() {
        let d = MethodDescriptor::for_instance("toString", &[], Some(ReturnKind::String)).unwrap();
        assert_eq!(d.owner_path, None);
        assert_eq!(d.internal_owner(), None);
        assert_eq!(d.signature, "()Ljava/lang/String;");
    }
}
