//! jbridge SDK - the ABI contract between the bridge and a boundary library
//!
//! This crate holds only the types both sides of the C boundary must agree on:
//! the `#[repr(C)]` wire records, the tag constants, the entry-point function
//! pointer types and the exported symbol names. A boundary implementation
//! compiles against this crate alone, without depending on the bridge.
//!
//! # Example
//!
//! ```ignore
//! use jbridge_sdk::{ReturnEnvelope, WireValue};
//! use std::os::raw::c_char;
//!
//! #[no_mangle]
//! pub unsafe extern "C" fn invoke_static(
//!     owner: *const c_char,
//!     member: *const c_char,
//!     signature: *const c_char,
//!     argv: *const WireValue,
//!     argc: i32,
//! ) -> ReturnEnvelope {
//!     ReturnEnvelope::value(WireValue::int32(5))
//! }
//! ```

#![warn(missing_docs)]

pub mod abi;
pub mod tag;
pub mod wire;

pub use abi::{
    ConstructFn, EntryPoints, InvokeInstanceFn, InvokeStaticFn, ReleaseInt32ArrayFn,
    ReleaseObjectHandleFn, ReleaseStringArrayFn, ReleaseStringFn, SYMBOL_CONSTRUCT,
    SYMBOL_INVOKE_INSTANCE, SYMBOL_INVOKE_STATIC, SYMBOL_NAMES, SYMBOL_RELEASE_INT32_ARRAY,
    SYMBOL_RELEASE_OBJECT_HANDLE, SYMBOL_RELEASE_STRING, SYMBOL_RELEASE_STRING_ARRAY,
};
pub use tag::{UnknownTag, ValueTag};
pub use wire::{ReturnEnvelope, WirePayload, WireValue};
