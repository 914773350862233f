//! Name-based addressing of foreign classes
//!
//! A dotted path is resolved one segment at a time:
//!
//! - before the first class, lowercase segments are package components
//! - any segment not starting with a lowercase letter is a class; after a
//!   class, such segments are nested classes (joined with `$`)
//! - after a class, a lowercase segment is a method
//! - after a class, `new` is the constructor
//!
//! ```ignore
//! let add = Resolver::new(&bridge).resolve_path("com.example.Calc.add")?.into_method()?;
//! let sum: i32 = add.call_typed(&[2.into(), 3.into()])?;
//! ```

use std::fmt;

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::global;
use crate::handle::ObjectHandle;
use crate::value::{FromReturn, ReturnKind, ReturnValue, Value};

/// Segment that resolves to the constructor
pub const CONSTRUCTOR_TOKEN: &str = "new";

/// Which bridge a proxy calls through
#[derive(Debug, Clone, Copy)]
pub enum BridgeRef<'b> {
    /// An explicit bridge
    Bound(&'b Bridge),
    /// The process-wide bridge, looked up at call time
    Global,
}

impl<'b> BridgeRef<'b> {
    fn get(self) -> BridgeResult<&'b Bridge> {
        match self {
            BridgeRef::Bound(bridge) => Ok(bridge),
            BridgeRef::Global => global::bridge(),
        }
    }
}

/// Outcome of resolving one segment
#[derive(Debug, Clone)]
pub enum Resolved<'b> {
    /// Only package components so far
    Package(PackageRef<'b>),
    /// A class (possibly nested)
    Class(ClassRef<'b>),
    /// A static method on a class
    Method(MethodRef<'b>),
    /// A class constructor
    Constructor(ConstructorRef<'b>),
}

impl<'b> Resolved<'b> {
    /// Resolve one more segment
    pub fn attr(&self, name: &str) -> BridgeResult<Resolved<'b>> {
        match self {
            Resolved::Package(package) => package.attr(name),
            Resolved::Class(class) => class.attr(name),
            Resolved::Method(method) => Err(BridgeError::InvalidPath(format!(
                "cannot look up {:?} on method {}",
                name, method
            ))),
            Resolved::Constructor(ctor) => Err(BridgeError::InvalidPath(format!(
                "cannot look up {:?} on constructor of {}",
                name, ctor.owner
            ))),
        }
    }

    /// The class, or `InvalidPath`
    pub fn into_class(self) -> BridgeResult<ClassRef<'b>> {
        match self {
            Resolved::Class(class) => Ok(class),
            other => Err(other.not_a("class")),
        }
    }

    /// The method, or `InvalidPath`
    pub fn into_method(self) -> BridgeResult<MethodRef<'b>> {
        match self {
            Resolved::Method(method) => Ok(method),
            other => Err(other.not_a("method")),
        }
    }

    /// The constructor, or `InvalidPath`
    pub fn into_constructor(self) -> BridgeResult<ConstructorRef<'b>> {
        match self {
            Resolved::Constructor(ctor) => Ok(ctor),
            other => Err(other.not_a("constructor")),
        }
    }

    fn not_a(&self, wanted: &str) -> BridgeError {
        let (kind, path) = match self {
            Resolved::Package(p) => ("package", p.path()),
            Resolved::Class(c) => ("class", c.path.clone()),
            Resolved::Method(m) => ("method", m.to_string()),
            Resolved::Constructor(c) => ("constructor", format!("{}.{}", c.owner, CONSTRUCTOR_TOKEN)),
        };
        BridgeError::InvalidPath(format!("{} is a {}, not a {}", path, kind, wanted))
    }
}

/// Entry point for path resolution
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'b> {
    bridge: BridgeRef<'b>,
}

impl<'b> Resolver<'b> {
    /// Resolve against an explicit bridge
    pub fn new(bridge: &'b Bridge) -> Self {
        Self {
            bridge: BridgeRef::Bound(bridge),
        }
    }

    /// Resolve the first segment of a path
    pub fn attr(&self, name: &str) -> BridgeResult<Resolved<'b>> {
        PackageRef {
            bridge: self.bridge,
            segments: Vec::new(),
        }
        .attr(name)
    }

    /// Resolve a whole dotted path
    pub fn resolve_path(&self, path: &str) -> BridgeResult<Resolved<'b>> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut resolved = self.attr(first)?;
        for segment in segments {
            resolved = resolved.attr(segment)?;
        }
        Ok(resolved)
    }
}

impl Resolver<'static> {
    /// Resolve against the process-wide bridge
    pub fn global() -> Self {
        Self {
            bridge: BridgeRef::Global,
        }
    }
}

/// Whether `name` names a class rather than a package or method
fn check_segment(name: &str) -> BridgeResult<bool> {
    let first = name
        .chars()
        .next()
        .ok_or_else(|| BridgeError::InvalidPath("empty path segment".to_string()))?;
    if name.contains('\0') {
        return Err(BridgeError::InvalidPath(format!("{:?} contains NUL", name)));
    }
    Ok(!first.is_lowercase())
}

/// Package components preceding the first class
#[derive(Debug, Clone)]
pub struct PackageRef<'b> {
    bridge: BridgeRef<'b>,
    segments: Vec<String>,
}

impl<'b> PackageRef<'b> {
    /// Dotted package path
    pub fn path(&self) -> String {
        self.segments.join(".")
    }

    fn attr(&self, name: &str) -> BridgeResult<Resolved<'b>> {
        let is_class = check_segment(name)?;
        if name == CONSTRUCTOR_TOKEN {
            return Err(BridgeError::InvalidPath(format!(
                "constructor requested on package {:?}",
                self.path()
            )));
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        if is_class {
            Ok(Resolved::Class(ClassRef {
                bridge: self.bridge,
                path: segments.join("."),
            }))
        } else {
            Ok(Resolved::Package(PackageRef {
                bridge: self.bridge,
                segments,
            }))
        }
    }
}

/// A class addressed by its dotted binary name (`a.b.Outer$Inner`)
#[derive(Debug, Clone)]
pub struct ClassRef<'b> {
    bridge: BridgeRef<'b>,
    path: String,
}

impl<'b> ClassRef<'b> {
    /// Dotted binary name
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Static method reference
    pub fn method(&self, name: &str) -> BridgeResult<MethodRef<'b>> {
        self.attr(name)?.into_method()
    }

    /// Constructor reference
    pub fn constructor(&self) -> ConstructorRef<'b> {
        ConstructorRef {
            bridge: self.bridge,
            owner: self.path.clone(),
        }
    }

    /// Nested class reference
    pub fn nested(&self, name: &str) -> BridgeResult<ClassRef<'b>> {
        self.attr(name)?.into_class()
    }

    fn attr(&self, name: &str) -> BridgeResult<Resolved<'b>> {
        let is_class = check_segment(name)?;
        if name == CONSTRUCTOR_TOKEN {
            Ok(Resolved::Constructor(self.constructor()))
        } else if is_class {
            Ok(Resolved::Class(ClassRef {
                bridge: self.bridge,
                path: format!("{}${}", self.path, name),
            }))
        } else {
            Ok(Resolved::Method(MethodRef {
                bridge: self.bridge,
                owner: self.path.clone(),
                member: name.to_string(),
            }))
        }
    }
}

/// A static method bound to its class
#[derive(Debug, Clone)]
pub struct MethodRef<'b> {
    bridge: BridgeRef<'b>,
    owner: String,
    member: String,
}

impl MethodRef<'_> {
    /// Dotted owner class
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Method name
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Invoke; the decoded value is returned as is
    pub fn call(&self, args: &[Value<'_>]) -> BridgeResult<ReturnValue> {
        self.call_as(args, None)
    }

    /// Invoke with an optional explicit return kind
    pub fn call_as(&self, args: &[Value<'_>], ret: Option<ReturnKind>) -> BridgeResult<ReturnValue> {
        self.bridge
            .get()?
            .call_static_as(&self.owner, &self.member, args, ret)
    }

    /// Invoke and convert the result
    pub fn call_typed<T: FromReturn>(&self, args: &[Value<'_>]) -> BridgeResult<T> {
        self.bridge
            .get()?
            .call_static_typed(&self.owner, &self.member, args)
    }
}

impl fmt::Display for MethodRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.member)
    }
}

/// A class constructor
#[derive(Debug, Clone)]
pub struct ConstructorRef<'b> {
    bridge: BridgeRef<'b>,
    owner: String,
}

impl ConstructorRef<'_> {
    /// Dotted class being constructed
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Construct a new instance
    pub fn call(&self, args: &[Value<'_>]) -> BridgeResult<ObjectHandle> {
        self.bridge.get()?.construct(&self.owner, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{CallShape, MockBoundary, Reply};
    use std::sync::Arc;

    fn bridge() -> (Arc<MockBoundary>, Bridge) {
        let mock = Arc::new(MockBoundary::new());
        (mock.clone(), Bridge::new(mock))
    }

    #[test]
    fn test_packages_then_class_then_method() {
        let (_, bridge) = bridge();
        let resolver = Resolver::new(&bridge);

        let com = resolver.attr("com").unwrap();
        assert!(matches!(com, Resolved::Package(_)));
        let calc = com.attr("example").unwrap().attr("Calc").unwrap();
        match &calc {
            Resolved::Class(class) => assert_eq!(class.path(), "com.example.Calc"),
            other => panic!("expected class, got {:?}", other),
        }
        let add = calc.attr("add").unwrap().into_method().unwrap();
        assert_eq!(add.owner(), "com.example.Calc");
        assert_eq!(add.member(), "add");
    }

    #[test]
    fn test_nested_class() {
        let (_, bridge) = bridge();
        let class = Resolver::new(&bridge)
            .resolve_path("android.widget.Toast.Builder")
            .unwrap()
            .into_class()
            .unwrap();
        assert_eq!(class.path(), "android.widget.Toast$Builder");
        assert_eq!(class.nested("Inner").unwrap().path(), "android.widget.Toast$Builder$Inner");
    }

    #[test]
    fn test_non_lowercase_segments_are_classes() {
        let (_, bridge) = bridge();
        let resolver = Resolver::new(&bridge);

        let inner = resolver.resolve_path("a.Outer._Inner").unwrap();
        match inner {
            Resolved::Class(class) => assert_eq!(class.path(), "a.Outer$_Inner"),
            other => panic!("expected class, got {:?}", other),
        }
        let anonymous = resolver.resolve_path("a.Outer.$1").unwrap().into_class().unwrap();
        assert_eq!(anonymous.path(), "a.Outer$$1");

        let method = resolver.resolve_path("a.Outer._Inner.run").unwrap().into_method().unwrap();
        assert_eq!(method.owner(), "a.Outer$_Inner");
    }

    #[test]
    fn test_constructor_token() {
        let (_, bridge) = bridge();
        let ctor = Resolver::new(&bridge)
            .resolve_path("java.lang.StringBuilder.new")
            .unwrap()
            .into_constructor()
            .unwrap();
        assert_eq!(ctor.owner(), "java.lang.StringBuilder");
    }

    #[test]
    fn test_default_package_class() {
        let (_, bridge) = bridge();
        let method = Resolver::new(&bridge)
            .resolve_path("Main.run")
            .unwrap()
            .into_method()
            .unwrap();
        assert_eq!(method.to_string(), "Main.run");
    }

    #[test]
    fn test_invalid_paths() {
        let (_, bridge) = bridge();
        let resolver = Resolver::new(&bridge);

        for path in ["com.example.new", "com..Calc", "", "com.example.Calc.add.more"] {
            let err = resolver.resolve_path(path).unwrap_err();
            assert!(
                matches!(err, BridgeError::InvalidPath(_)),
                "{:?} gave {:?}",
                path,
                err
            );
        }

        let err = resolver
            .resolve_path("com.example")
            .unwrap()
            .into_method()
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPath(ref m) if m.contains("package")));
    }

    #[test]
    fn test_method_call_through_proxy() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Int32(5));

        let add = Resolver::new(&bridge)
            .resolve_path("com.example.Calc.add")
            .unwrap()
            .into_method()
            .unwrap();
        let sum: i32 = add.call_typed(&[Value::from(2), Value::from(3)]).unwrap();
        assert_eq!(sum, 5);

        let call = &mock.calls()[0];
        assert_eq!(
            call.shape,
            CallShape::Static {
                owner: "com/example/Calc".to_string()
            }
        );
        assert_eq!(call.signature, "(II)I");
    }

    #[test]
    fn test_nested_owner_uses_binary_name() {
        let (mock, bridge) = bridge();
        mock.reply(Reply::Object(0x9));

        let obj = Resolver::new(&bridge)
            .resolve_path("a.Outer.Inner.new")
            .unwrap()
            .into_constructor()
            .unwrap()
            .call(&[])
            .unwrap();
        assert_eq!(
            mock.calls()[0].shape,
            CallShape::Construct {
                owner: "a/Outer$Inner".to_string()
            }
        );
        drop(obj);
        assert_eq!(mock.object_releases(), vec![0x9]);
    }
}
