//! Literal arguments and rendered results.
//!
//! Arguments are read as JSON literals (`42`, `1.5`, `true`, `"text"`,
//! `[1, 2]`, `null`); anything that is not valid JSON is taken as a bare
//! string, so `jbridge call Texts.upper hello` works without quoting.

use anyhow::{bail, Context};
use jbridge::{ReturnKind, ReturnValue, Value};
use serde_json::Value as Json;

/// Parse one command-line literal into a call-site value
pub fn parse_arg(text: &str) -> anyhow::Result<Value<'static>> {
    match serde_json::from_str::<Json>(text) {
        Ok(json) => from_json(&json).with_context(|| format!("argument `{}`", text)),
        Err(_) => Ok(Value::Str(text.to_string())),
    }
}

/// Parse every literal, in order
pub fn parse_args(texts: &[String]) -> anyhow::Result<Vec<Value<'static>>> {
    texts.iter().map(|text| parse_arg(text)).collect()
}

fn from_json(json: &Json) -> anyhow::Result<Value<'static>> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if n.is_u64() {
                bail!("integer {} does not fit in 64 bits", n);
            } else {
                Value::Float(n.as_f64().unwrap_or_default() as f32)
            }
        }
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(from_json).collect::<Result<_, _>>()?),
        Json::Object(_) => bail!("maps cannot be passed to foreign methods"),
    })
}

/// Parse a `--returns` kind name
pub fn parse_return_kind(name: Option<&str>) -> anyhow::Result<Option<ReturnKind>> {
    match name {
        None => Ok(None),
        Some(name) => match ReturnKind::parse(name) {
            Some(kind) => Ok(Some(kind)),
            None => bail!(
                "unknown return kind `{}` (expected void, int, long, float, boolean, string, int[], string[] or object)",
                name
            ),
        },
    }
}

/// Render a decoded value as a JSON-like literal
pub fn render(value: &ReturnValue) -> String {
    match value {
        ReturnValue::Void => "void".to_string(),
        ReturnValue::Null => "null".to_string(),
        ReturnValue::Int32(v) => v.to_string(),
        ReturnValue::Int64(v) => v.to_string(),
        ReturnValue::Float32(v) => Json::from(*v).to_string(),
        ReturnValue::Boolean(v) => v.to_string(),
        ReturnValue::Str(s) => Json::from(s.as_str()).to_string(),
        ReturnValue::Int32Array(items) => Json::from(items.clone()).to_string(),
        ReturnValue::StringArray(items) => Json::from(items.clone()).to_string(),
        ReturnValue::Object(_) => "<object>".to_string(),
    }
}
