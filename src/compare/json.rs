//! Structural JSON equality.

use serde_json::{Number, Value};

use crate::compare::mask::SkipPathSet;
use crate::compare::CompareError;

/// Parse one side of a comparison.
pub fn parse(side: &'static str, bytes: &[u8]) -> Result<Value, CompareError> {
    serde_json::from_slice(bytes).map_err(|source| CompareError::Parse { side, source })
}

/// Compare two JSON documents, masking `skip` paths on a first mismatch.
///
/// Masking works on parsed copies; the raw bytes are untouched.
pub fn json_bytes_equal(primary: &[u8], secondary: &[u8], skip: &SkipPathSet) -> Result<bool, CompareError> {
    let mut primary = parse("primary", primary)?;
    let mut secondary = parse("secondary", secondary)?;

    if values_equal(&primary, &secondary) {
        return Ok(true);
    }
    if skip.is_empty() {
        return Ok(false);
    }

    skip.mask(&mut primary);
    skip.mask(&mut secondary);
    Ok(values_equal(&primary, &secondary))
}

/// Objects ignore key order, arrays are compared index-wise, numbers by value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| values_equal(value, other)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
