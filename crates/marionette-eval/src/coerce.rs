//! Numeric coercion shared by every arithmetic operator

use crate::Value;

/// A value after successful numeric coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(x) => x,
        }
    }

    /// Additive inverse; `None` when negating `i64::MIN`.
    pub fn checked_neg(self) -> Option<Number> {
        match self {
            Number::Integer(i) => i.checked_neg().map(Number::Integer),
            Number::Float(x) => Some(Number::Float(-x)),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(i) => Value::Integer(i),
            Number::Float(x) => Value::Float(x),
        }
    }
}

/// Coerce a value to a number.
///
/// Numbers pass through; strings coerce when they are a whole numeric
/// literal. Booleans, collections and `undef` never coerce.
pub fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Integer(i) => Some(Number::Integer(*i)),
        Value::Float(x) => Some(Number::Float(*x)),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parse `[+-]?digits(.digits)?([eE][+-]?digits)?`.
///
/// Integers too large for `i64` come back as floats.
pub fn parse_number(s: &str) -> Option<Number> {
    let bytes = s.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }
    if skip_digits(bytes, &mut pos) == 0 {
        return None;
    }

    let mut is_float = false;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        if skip_digits(bytes, &mut pos) == 0 {
            return None;
        }
        is_float = true;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        if skip_digits(bytes, &mut pos) == 0 {
            return None;
        }
        is_float = true;
    }

    if pos != bytes.len() {
        return None;
    }

    if !is_float && let Ok(i) = s.parse::<i64>() {
        return Some(Number::Integer(i));
    }
    s.parse::<f64>().ok().map(Number::Float)
}

fn skip_digits(bytes: &[u8], pos: &mut usize) -> usize {
    let start = *pos;
    while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
        *pos += 1;
    }
    *pos - start
}
