//! The toy object runtime behind the loopback boundary
//!
//! A handful of classes with fixed method tables, dispatched on the exact
//! `(owner, member, descriptor)` triple the way the real runtime resolves
//! methods. Objects live on a shared heap; callers hold reference tokens,
//! one per returned reference, and an object is dropped when its last
//! token is released.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::stats::record;

/// Decoded argument
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Arg {
    Int(i32),
    Long(i64),
    Float(f32),
    Bool(bool),
    Str(String),
    IntArray(Vec<i32>),
    StrArray(Vec<String>),
    Object(usize),
    EmptyArray,
}

impl Arg {
    /// Whether this argument may fill a parameter declared as `code`
    fn fits(&self, code: &str) -> bool {
        match self {
            Arg::Int(_) => code == "I",
            Arg::Long(_) => code == "J",
            Arg::Float(_) => code == "F",
            Arg::Bool(_) => code == "Z",
            Arg::Str(_) => code == "Ljava/lang/String;" || code == "Ljava/lang/Object;",
            Arg::IntArray(_) => code == "[I",
            Arg::StrArray(_) => code == "[Ljava/lang/String;",
            Arg::Object(_) => code.starts_with('L'),
            Arg::EmptyArray => code.starts_with('['),
        }
    }
}

/// Result of a method, before it is put on the wire
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ret {
    Void,
    Int(i32),
    Long(i64),
    Float(f32),
    Bool(bool),
    Str(Option<String>),
    IntArray(Vec<i32>),
    StrArray(Vec<String>),
    /// A freshly pinned reference token, or `NULL_TOKEN`
    Object(usize),
}

/// Token written as a null object reference; never issued by the heap
pub(crate) const NULL_TOKEN: usize = 0;

/// `Err` carries the exception text, `"java.lang.Foo: detail"`
pub(crate) type Outcome = Result<Ret, String>;

#[derive(Debug)]
enum Instance {
    StringBuilder(String),
    Counter(i32),
}

impl Instance {
    fn class_name(&self) -> &'static str {
        match self {
            Instance::StringBuilder(_) => "java/lang/StringBuilder",
            Instance::Counter(_) => "com/example/Counter",
        }
    }
}

struct Slot {
    object: Instance,
    pins: usize,
}

#[derive(Default)]
struct Heap {
    next_id: u64,
    next_token: usize,
    objects: HashMap<u64, Slot>,
    refs: HashMap<usize, u64>,
}

impl Heap {
    fn allocate(&mut self, object: Instance) -> usize {
        self.next_id += 1;
        let id = self.next_id;
        self.objects.insert(id, Slot { object, pins: 0 });
        self.pin(id)
    }

    fn pin(&mut self, id: u64) -> usize {
        self.next_token += 1;
        let token = self.next_token;
        self.refs.insert(token, id);
        if let Some(slot) = self.objects.get_mut(&id) {
            slot.pins += 1;
        }
        record(|s| s.handles_issued += 1);
        token
    }

    fn resolve(&self, token: usize) -> Result<u64, String> {
        self.refs
            .get(&token)
            .copied()
            .ok_or_else(|| format!("java.lang.NullPointerException: stale reference {:#x}", token))
    }

    fn release(&mut self, token: usize) -> bool {
        let Some(id) = self.refs.remove(&token) else {
            return false;
        };
        if let Some(slot) = self.objects.get_mut(&id) {
            slot.pins -= 1;
            if slot.pins == 0 {
                self.objects.remove(&id);
            }
        }
        record(|s| s.handles_released += 1);
        true
    }
}

static HEAP: Lazy<Mutex<Heap>> = Lazy::new(|| Mutex::new(Heap::default()));

const KNOWN_CLASSES: [&str; 5] = [
    "com/example/Calc",
    "com/example/Texts",
    "com/example/Objects",
    "com/example/Counter",
    "java/lang/StringBuilder",
];

/// Split a descriptor into parameter codes and return code
pub(crate) fn parse_descriptor(descriptor: &str) -> Option<(Vec<&str>, &str)> {
    let rest = descriptor.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (mut params, ret) = (&rest[..close], &rest[close + 1..]);
    let mut codes = Vec::new();
    while !params.is_empty() {
        let dims = params.len() - params.trim_start_matches('[').len();
        let len = match params[dims..].chars().next()? {
            'L' => dims + params[dims..].find(';')? + 1,
            'I' | 'J' | 'F' | 'Z' | 'B' | 'C' | 'S' | 'D' => dims + 1,
            _ => return None,
        };
        codes.push(&params[..len]);
        params = &params[len..];
    }
    if ret.is_empty() {
        return None;
    }
    Some((codes, ret))
}

/// Reject arguments whose wire kinds do not fit the descriptor
pub(crate) fn check_arguments(descriptor: &str, args: &[Arg]) -> Result<(), String> {
    let (params, _) = parse_descriptor(descriptor).ok_or_else(|| {
        format!("java.lang.ClassFormatError: malformed descriptor {}", descriptor)
    })?;
    if params.len() != args.len() {
        return Err(format!(
            "java.lang.IllegalArgumentException: descriptor {} takes {} arguments, got {}",
            descriptor,
            params.len(),
            args.len()
        ));
    }
    for (index, (arg, code)) in args.iter().zip(&params).enumerate() {
        if !arg.fits(code) {
            return Err(format!(
                "java.lang.IllegalArgumentException: argument {} does not match {}",
                index, code
            ));
        }
    }
    Ok(())
}

fn no_such_method(owner: &str, member: &str, descriptor: &str) -> String {
    if KNOWN_CLASSES.contains(&owner) {
        format!("java.lang.NoSuchMethodError: {}.{}{}", owner, member, descriptor)
    } else {
        format!("java.lang.NoClassDefFoundError: {}", owner)
    }
}

pub(crate) fn call_static(owner: &str, member: &str, descriptor: &str, args: &[Arg]) -> Outcome {
    use Arg::*;

    match (owner, member, descriptor, args) {
        ("com/example/Calc", "add", "(II)I", [Int(a), Int(b)]) => Ok(Ret::Int(a.wrapping_add(*b))),
        ("com/example/Calc", "add", "(JJ)J", [Long(a), Long(b)]) => {
            Ok(Ret::Long(a.wrapping_add(*b)))
        }
        ("com/example/Calc", "divide", "(II)I", [Int(a), Int(b)]) => {
            if *b == 0 {
                Err("java.lang.ArithmeticException: / by zero".to_string())
            } else {
                Ok(Ret::Int(a.wrapping_div(*b)))
            }
        }
        ("com/example/Calc", "half", "(F)F", [Float(v)]) => Ok(Ret::Float(v / 2.0)),
        ("com/example/Calc", "isEven", "(I)Z", [Int(v)]) => Ok(Ret::Bool(v % 2 == 0)),
        ("com/example/Calc", "not", "(Z)Z", [Bool(v)]) => Ok(Ret::Bool(!v)),
        ("com/example/Calc", "widen", "(I)J", [Int(v)]) => Ok(Ret::Long(i64::from(*v) << 32)),
        ("com/example/Calc", "sum", "([I)I", [IntArray(values)]) => {
            Ok(Ret::Int(values.iter().fold(0i32, |acc, v| acc.wrapping_add(*v))))
        }
        ("com/example/Calc", "sum", "([Ljava/lang/Object;)I", [EmptyArray]) => Ok(Ret::Int(0)),
        ("com/example/Calc", "range", "(I)[I", [Int(n)]) => {
            if *n < 0 {
                Err(format!("java.lang.NegativeArraySizeException: {}", n))
            } else {
                Ok(Ret::IntArray((0..*n).collect()))
            }
        }
        ("com/example/Texts", "upper", "(Ljava/lang/String;)Ljava/lang/String;", [Str(s)]) => {
            Ok(Ret::Str(Some(s.to_uppercase())))
        }
        ("com/example/Texts", "split", "(Ljava/lang/String;)[Ljava/lang/String;", [Str(s)]) => {
            Ok(Ret::StrArray(s.split_whitespace().map(str::to_string).collect()))
        }
        ("com/example/Texts", "lengths", "([Ljava/lang/String;)[I", [StrArray(items)]) => {
            Ok(Ret::IntArray(
                items
                    .iter()
                    .map(|s| i32::try_from(s.chars().count()).unwrap_or(i32::MAX))
                    .collect(),
            ))
        }
        (
            "com/example/Texts",
            "join",
            "([Ljava/lang/String;Ljava/lang/String;)Ljava/lang/String;",
            [StrArray(items), Str(sep)],
        ) => Ok(Ret::Str(Some(items.join(sep)))),
        ("com/example/Texts", "nothing", "()Ljava/lang/String;", []) => Ok(Ret::Str(None)),
        ("com/example/Texts", "log", "(Ljava/lang/String;)V", [Str(s)]) => {
            tracing::info!(message = %s, "Texts.log");
            Ok(Ret::Void)
        }
        ("com/example/Objects", "identity", "(Ljava/lang/Object;)Ljava/lang/Object;", [Object(t)]) => {
            let mut heap = HEAP.lock();
            let id = heap.resolve(*t)?;
            Ok(Ret::Object(heap.pin(id)))
        }
        ("com/example/Objects", "describe", "(Ljava/lang/Object;)Ljava/lang/String;", [Object(t)]) => {
            let heap = HEAP.lock();
            let id = heap.resolve(*t)?;
            let class = heap
                .objects
                .get(&id)
                .map_or("java/lang/Object", |slot| slot.object.class_name());
            Ok(Ret::Str(Some(format!("{}@{}", class.replace('/', "."), id))))
        }
        ("com/example/Objects", "nothing", "()Ljava/lang/Object;", []) => Ok(Ret::Object(NULL_TOKEN)),
        _ => Err(no_such_method(owner, member, descriptor)),
    }
}

pub(crate) fn call_instance(token: usize, member: &str, descriptor: &str, args: &[Arg]) -> Outcome {
    let mut heap = HEAP.lock();
    let id = heap.resolve(token)?;
    let slot = heap
        .objects
        .get_mut(&id)
        .ok_or_else(|| format!("java.lang.NullPointerException: collected object {}", id))?;

    let ret = match (&mut slot.object, member, descriptor, args) {
        (Instance::StringBuilder(buf), "append", "(Ljava/lang/String;)Ljava/lang/Object;", [Arg::Str(s)]) => {
            buf.push_str(s);
            None
        }
        (Instance::StringBuilder(buf), "append", "(I)Ljava/lang/Object;", [Arg::Int(v)]) => {
            buf.push_str(&v.to_string());
            None
        }
        (Instance::StringBuilder(buf), "append", "(Ljava/lang/String;)V", [Arg::Str(s)]) => {
            buf.push_str(s);
            Some(Ret::Void)
        }
        (Instance::StringBuilder(buf), "toString", "()Ljava/lang/String;", []) => {
            Some(Ret::Str(Some(buf.clone())))
        }
        (Instance::StringBuilder(buf), "length", "()I", []) => {
            Some(Ret::Int(i32::try_from(buf.chars().count()).unwrap_or(i32::MAX)))
        }
        (Instance::Counter(n), "increment", "()I", []) => {
            *n = n.wrapping_add(1);
            Some(Ret::Int(*n))
        }
        (Instance::Counter(n), "get", "()I", []) => Some(Ret::Int(*n)),
        (object, _, _, _) => return Err(no_such_method(object.class_name(), member, descriptor)),
    };

    // `None` means "return this", which hands out a fresh reference.
    Ok(ret.unwrap_or_else(|| Ret::Object(heap.pin(id))))
}

pub(crate) fn construct(owner: &str, descriptor: &str, args: &[Arg]) -> Outcome {
    let object = match (owner, descriptor, args) {
        ("java/lang/StringBuilder", "()Ljava/lang/Object;", []) => Instance::StringBuilder(String::new()),
        ("java/lang/StringBuilder", "(Ljava/lang/String;)Ljava/lang/Object;", [Arg::Str(s)]) => {
            Instance::StringBuilder(s.clone())
        }
        ("com/example/Counter", "()Ljava/lang/Object;", []) => Instance::Counter(0),
        ("com/example/Counter", "(I)Ljava/lang/Object;", [Arg::Int(start)]) => Instance::Counter(*start),
        _ => return Err(no_such_method(owner, "<init>", descriptor)),
    };
    tracing::debug!(class = object.class_name(), "constructed");
    Ok(Ret::Object(HEAP.lock().allocate(object)))
}

/// Drop one reference token; `false` if it was not live
pub(crate) fn release(token: usize) -> bool {
    HEAP.lock().release(token)
}

/// Objects currently alive on the shared heap (all threads)
pub fn live_objects() -> usize {
    HEAP.lock().objects.len()
}
