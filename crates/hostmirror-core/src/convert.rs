// ── Response-to-state value conversions ──
//
// Pure helpers that turn raw response values into state values. Every
// function here is total: bad input yields `None`, never a panic, NaN or
// infinity. `Transform` functions wrap them for use in declarative mappings.

use serde_json::{Number, Value};

/// A pure value transform attached to a state mapping.
pub type Transform = fn(&Value) -> Option<Value>;

const BYTES_PER_GB: f64 = 1_073_741_824.0;
const KILOBYTES_PER_GB: f64 = 1_048_576.0;

// ── Numeric primitives ─────────────────────────────────────────────

/// Coerce a number or numeric string to `f64`.
///
/// Large counters arrive either as JSON numbers or as decimal strings.
/// Values above 2^53 lose integer precision in the conversion.
pub fn to_f64_lossy(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Round to two decimal places.
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// `used / total` as a percentage, or `None` when total is zero or an
/// input is missing.
pub fn usage_percent(used: Option<f64>, total: Option<f64>) -> Option<f64> {
    let (used, total) = (used?, total?);
    if total == 0.0 {
        return None;
    }
    let pct = used / total * 100.0;
    pct.is_finite().then(|| round2(pct))
}

pub fn bytes_to_gb(bytes: Option<f64>) -> Option<f64> {
    let bytes = bytes.filter(|b| b.is_finite())?;
    Some(round2(bytes / BYTES_PER_GB))
}

pub fn kilobytes_to_gb(kilobytes: Option<f64>) -> Option<f64> {
    let kilobytes = kilobytes.filter(|k| k.is_finite())?;
    Some(round2(kilobytes / KILOBYTES_PER_GB))
}

/// Wrap a finite `f64` as a JSON number.
pub fn number(n: f64) -> Option<Value> {
    Number::from_f64(n).map(Value::Number)
}

fn field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(to_f64_lossy)
}

// ── Transforms ─────────────────────────────────────────────────────

pub fn round2_value(value: &Value) -> Option<Value> {
    to_f64_lossy(value).map(round2).and_then(number)
}

pub fn bytes_to_gb_value(value: &Value) -> Option<Value> {
    bytes_to_gb(to_f64_lossy(value)).and_then(number)
}

pub fn kilobytes_to_gb_value(value: &Value) -> Option<Value> {
    kilobytes_to_gb(to_f64_lossy(value)).and_then(number)
}

/// Percentage from an object carrying `used` and `total`.
pub fn used_total_percent(value: &Value) -> Option<Value> {
    usage_percent(field(value, "used"), field(value, "total")).and_then(number)
}

/// Percentage from a disk entry's `fsUsed` / `fsSize`.
pub fn fs_used_percent(value: &Value) -> Option<Value> {
    usage_percent(field(value, "fsUsed"), field(value, "fsSize")).and_then(number)
}

/// Percentage from a share's `used` / (`used` + `free`).
pub fn share_used_percent(value: &Value) -> Option<Value> {
    let used = field(value, "used");
    let total = used.zip(field(value, "free")).map(|(u, f)| u + f);
    usage_percent(used, total).and_then(number)
}

/// `true` when a state string reads "running" (any case).
pub fn is_running(value: &Value) -> Option<Value> {
    value
        .as_str()
        .map(|s| Value::Bool(s.eq_ignore_ascii_case("running")))
}

/// First string of a string-or-array value, without leading slashes.
pub fn first_name(value: &Value) -> Option<Value> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.iter().find_map(Value::as_str)?,
        _ => return None,
    };
    let name = raw.trim_start_matches('/');
    (!name.is_empty()).then(|| Value::String(name.to_owned()))
}

/// Stringify scalars, pass strings through.
pub fn as_text(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}
