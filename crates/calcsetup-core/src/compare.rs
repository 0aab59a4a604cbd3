//! Loose, type-coercing comparison of property values.
//!
//! Rule conditions, change detection and form submissions all compare values
//! that may arrive as strings (`"2"`), numbers (`2`) or be missing entirely.
//! Comparison here is intentionally loose: numeric strings compare by value,
//! `null` equals `""`, `0` and `false`, and booleans compare by truthiness.
//! Upgrading any caller to strict equality is a behaviour change.

use serde_json::Value;

/// Returns `true` if `s` is a decimal number with optional sign, fraction and
/// exponent. Surrounding whitespace is allowed; an empty string is not numeric.
pub fn is_numeric(s: &str) -> bool {
    let s = s.trim();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    if i < len && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < len && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < len && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < len && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < len && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == len
}

/// Returns `true` if the value is a number or a numeric string.
pub fn is_numeric_value(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => is_numeric(s),
        _ => false,
    }
}

/// Interprets a value as a number, if it is one.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if is_numeric(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Truthiness: `null`, `false`, `0`, `""`, `"0"` and `[]` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// Loose equality between two property values.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => *x == truthy(other),
        (Value::Null, other) | (other, Value::Null) => !truthy_for_null(other),
        (Value::Number(_), Value::Number(_)) => as_number(a) == as_number(b),
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            if is_numeric(s) {
                as_number(a) == as_number(b)
            } else {
                value_to_string(a) == value_to_string(b)
            }
        }
        (Value::String(x), Value::String(y)) => {
            if is_numeric(x) && is_numeric(y) {
                as_number(a) == as_number(b)
            } else {
                x == y
            }
        }
        _ => a == b,
    }
}

/// `null` compares equal to the "empty" value of the other side's type.
fn truthy_for_null(other: &Value) -> bool {
    match other {
        Value::String(s) => !s.is_empty(),
        other => truthy(other),
    }
}

/// Renders a scalar the way it appears in forms and formulas.
///
/// Integral floats drop their fraction (`100.0` → `"100"`), `true` is `"1"`,
/// `false` and `null` are empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                format_number(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Formats a float, dropping the fraction when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
