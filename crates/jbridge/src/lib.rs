//! jbridge - dynamically-typed invocation bridge into a foreign object runtime
//!
//! Call sites hand the bridge plain values; the bridge encodes them into the
//! fixed wire layout, derives the method descriptor from their kinds, crosses
//! the C boundary, and decodes the tagged result back into a local value, an
//! owned object handle, or an error.
//!
//! # Example
//!
//! ```ignore
//! use jbridge::{Bridge, BoundaryConfig, Value};
//!
//! let bridge = Bridge::open(&BoundaryConfig::for_library("./libjbridge_loopback.so"))?;
//! let sum: i32 = bridge.call_static_typed("com.example.Calc", "add", &[2.into(), 3.into()])?;
//!
//! let sb = bridge.construct("java.lang.StringBuilder", &[Value::from("a")])?;
//! bridge.call_method(&sb, "append", &["b".into()])?;
//! let text: String = bridge.call_method_typed(&sb, "toString", &[])?;
//! ```

pub mod boundary;
pub mod bridge;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod global;
pub mod handle;
pub mod loader;
pub mod logging;
pub mod proxy;
pub mod signature;
pub mod value;

#[cfg(test)]
mod mock;

pub use boundary::{Boundary, NativeBoundary};
pub use bridge::Bridge;
pub use config::{BoundaryConfig, BridgeConfig, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use global::{bridge, init, init_with, is_initialized};
pub use handle::{HandleManager, ObjectHandle};
pub use loader::{Library, LoadError};
pub use logging::{init_logging, LogConfig};
pub use proxy::{BridgeRef, ClassRef, ConstructorRef, MethodRef, PackageRef, Resolved, Resolver};
pub use signature::{derive, derive_constructor, MethodDescriptor};
pub use value::{FromReturn, ReturnKind, ReturnValue, Value};

pub use jbridge_sdk as sdk;
