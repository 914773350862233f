//! Scripted boundary for unit tests
//!
//! Replies to invocations from a queue of canned responses, records every
//! call with its decoded arguments, and tracks every buffer it hands out so
//! tests can assert that each one is released exactly once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use jbridge_sdk::{ReturnEnvelope, ValueTag, WireValue};
use parking_lot::Mutex;

use crate::boundary::Boundary;

/// Canned reply for the next invocation
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Void,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Boolean(bool),
    Str(String),
    NullStr,
    Int32Array(Vec<i32>),
    StringArray(Vec<String>),
    Object(usize),
    Exception(Option<String>),
    RawTag(i32),
}

/// Argument as the mock saw it on the wire
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SeenArg {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Boolean(bool),
    Str(String),
    Int32Array(Vec<i32>),
    StringArray(Vec<String>),
    Object(usize),
    EmptyArray,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CallShape {
    Static { owner: String },
    Instance { receiver: usize },
    Construct { owner: String },
}

#[derive(Debug, Clone)]
pub(crate) struct SeenCall {
    pub shape: CallShape,
    pub member: Option<String>,
    pub signature: String,
    pub args: Vec<SeenArg>,
}

#[derive(Default)]
struct State {
    replies: VecDeque<Reply>,
    calls: Vec<SeenCall>,
    strings: HashSet<usize>,
    int_arrays: HashMap<usize, usize>,
    string_tables: HashMap<usize, usize>,
    released_strings: usize,
    released_int_arrays: usize,
    released_string_tables: usize,
    object_releases: Vec<usize>,
    bogus_releases: usize,
}

#[derive(Default)]
pub(crate) struct MockBoundary {
    state: Mutex<State>,
}

impl MockBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: Reply) {
        self.state.lock().replies.push_back(reply);
    }

    pub fn calls(&self) -> Vec<SeenCall> {
        self.state.lock().calls.clone()
    }

    pub fn object_releases(&self) -> Vec<usize> {
        self.state.lock().object_releases.clone()
    }

    pub fn released_strings(&self) -> usize {
        self.state.lock().released_strings
    }

    pub fn released_int_arrays(&self) -> usize {
        self.state.lock().released_int_arrays
    }

    pub fn released_string_tables(&self) -> usize {
        self.state.lock().released_string_tables
    }

    /// Buffers handed out and not yet released
    pub fn outstanding(&self) -> usize {
        let state = self.state.lock();
        state.strings.len() + state.int_arrays.len() + state.string_tables.len()
    }

    /// Releases of pointers the mock never handed out (or already freed)
    pub fn bogus_releases(&self) -> usize {
        self.state.lock().bogus_releases
    }

    /// Allocate a boundary-owned string, as a real boundary would
    pub fn alloc_string(&self, s: &str) -> *mut c_char {
        let ptr = CString::new(s).expect("test string").into_raw();
        self.state.lock().strings.insert(ptr as usize);
        ptr
    }

    fn alloc_int_array(&self, data: &[i32]) -> *mut i32 {
        let boxed: Box<[i32]> = data.into();
        let len = boxed.len();
        let ptr = Box::into_raw(boxed) as *mut i32;
        self.state.lock().int_arrays.insert(ptr as usize, len);
        ptr
    }

    fn alloc_string_table(&self, items: &[String]) -> *mut *mut c_char {
        let table: Box<[*mut c_char]> = items.iter().map(|s| self.alloc_string(s)).collect();
        let len = table.len();
        let ptr = Box::into_raw(table) as *mut *mut c_char;
        self.state.lock().string_tables.insert(ptr as usize, len);
        ptr
    }

    fn answer(&self, shape: CallShape, member: Option<&CStr>, signature: &CStr, argv: *const WireValue, argc: i32) -> ReturnEnvelope {
        let args = unsafe { read_args(argv, argc) };
        let reply = {
            let mut state = self.state.lock();
            state.calls.push(SeenCall {
                shape,
                member: member.map(|m| m.to_string_lossy().into_owned()),
                signature: signature.to_string_lossy().into_owned(),
                args,
            });
            state.replies.pop_front().unwrap_or(Reply::Void)
        };

        match reply {
            Reply::Void => ReturnEnvelope::void(),
            Reply::Int32(v) => ReturnEnvelope::value(WireValue::int32(v)),
            Reply::Int64(v) => ReturnEnvelope::value(WireValue::int64(v)),
            Reply::Float32(v) => ReturnEnvelope::value(WireValue::float32(v)),
            Reply::Boolean(v) => ReturnEnvelope::value(WireValue::boolean(v)),
            Reply::Str(s) => ReturnEnvelope::value(WireValue::string(self.alloc_string(&s))),
            Reply::NullStr => ReturnEnvelope::value(WireValue::string(std::ptr::null_mut())),
            Reply::Int32Array(data) => {
                let count = data.len() as i32;
                ReturnEnvelope::value(WireValue::int32_array(self.alloc_int_array(&data), count))
            }
            Reply::StringArray(items) => {
                let count = items.len() as i32;
                ReturnEnvelope::value(WireValue::string_array(
                    self.alloc_string_table(&items),
                    count,
                ))
            }
            Reply::Object(addr) => ReturnEnvelope::value(WireValue::object(addr as *mut c_void)),
            Reply::Exception(message) => ReturnEnvelope::exception(
                message.map_or(std::ptr::null_mut(), |m| self.alloc_string(&m)),
            ),
            Reply::RawTag(tag) => ReturnEnvelope::value(unsafe {
                WireValue::from_raw_parts(tag, 0, jbridge_sdk::WirePayload { int32: 0 })
            }),
        }
    }
}

unsafe fn read_args(argv: *const WireValue, argc: i32) -> Vec<SeenArg> {
    if argc == 0 {
        return Vec::new();
    }
    let wire = std::slice::from_raw_parts(argv, argc as usize);
    wire.iter()
        .map(|v| match v.tag().expect("valid tag") {
            ValueTag::Int32 => SeenArg::Int32(v.as_int32().unwrap()),
            ValueTag::Int64 => SeenArg::Int64(v.as_int64().unwrap()),
            ValueTag::Float32 => SeenArg::Float32(v.as_float32().unwrap()),
            ValueTag::Boolean => SeenArg::Boolean(v.as_boolean().unwrap()),
            ValueTag::Utf8String => {
                SeenArg::Str(v.as_cstr().unwrap().to_string_lossy().into_owned())
            }
            ValueTag::Int32Array => SeenArg::Int32Array(v.as_int32_slice().unwrap().to_vec()),
            ValueTag::Utf8StringArray => SeenArg::StringArray(
                v.as_string_ptr_slice()
                    .unwrap()
                    .iter()
                    .map(|p| CStr::from_ptr(*p).to_string_lossy().into_owned())
                    .collect(),
            ),
            ValueTag::ObjectRef => SeenArg::Object(v.as_object().unwrap() as usize),
            ValueTag::ObjectArray => SeenArg::EmptyArray,
            other => panic!("unexpected argument tag {}", other),
        })
        .collect()
}

impl Boundary for MockBoundary {
    unsafe fn invoke_static(
        &self,
        owner: &CStr,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        let shape = CallShape::Static {
            owner: owner.to_string_lossy().into_owned(),
        };
        self.answer(shape, Some(member), signature, argv, argc)
    }

    unsafe fn invoke_instance(
        &self,
        receiver: *mut c_void,
        member: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        let shape = CallShape::Instance {
            receiver: receiver as usize,
        };
        self.answer(shape, Some(member), signature, argv, argc)
    }

    unsafe fn construct(
        &self,
        owner: &CStr,
        signature: &CStr,
        argv: *const WireValue,
        argc: i32,
    ) -> ReturnEnvelope {
        let shape = CallShape::Construct {
            owner: owner.to_string_lossy().into_owned(),
        };
        self.answer(shape, None, signature, argv, argc)
    }

    unsafe fn release_object_handle(&self, handle: *mut c_void) {
        self.state.lock().object_releases.push(handle as usize);
    }

    unsafe fn release_string(&self, ptr: *mut c_char) {
        let mut state = self.state.lock();
        if state.strings.remove(&(ptr as usize)) {
            state.released_strings += 1;
            drop(CString::from_raw(ptr));
        } else {
            state.bogus_releases += 1;
        }
    }

    unsafe fn release_int32_array(&self, ptr: *mut i32) {
        let mut state = self.state.lock();
        match state.int_arrays.remove(&(ptr as usize)) {
            Some(len) => {
                state.released_int_arrays += 1;
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
            }
            None => state.bogus_releases += 1,
        }
    }

    unsafe fn release_string_array(&self, ptr: *mut *mut c_char) {
        let mut state = self.state.lock();
        match state.string_tables.remove(&(ptr as usize)) {
            Some(len) => {
                state.released_string_tables += 1;
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
            }
            None => state.bogus_releases += 1,
        }
    }
}
