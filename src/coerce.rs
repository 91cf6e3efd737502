//! Loose integer coercion for client-supplied filter values.
//!
//! Client filters arrive as strings, numbers or lists of either. Every
//! coercion here defaults instead of failing: anything that does not start
//! with an integer becomes `0`, and callers decide whether `0` means "drop".

use serde_json::Value;

/// Parses the leading integer of `text`.
///
/// Leading whitespace and one sign are accepted; parsing stops at the first
/// non-digit. Text without leading digits yields `0` and values beyond the
/// `i64` range saturate.
///
/// ```
/// use content_gate::coerce::leading_integer;
///
/// assert_eq!(leading_integer(" 42"), 42);
/// assert_eq!(leading_integer("12abc"), 12);
/// assert_eq!(leading_integer("-7"), -7);
/// assert_eq!(leading_integer("abc"), 0);
/// assert_eq!(leading_integer("99999999999999999999"), i64::MAX);
/// ```
pub fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(byte - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}

/// Coerces a scalar JSON value to an integer.
///
/// Numbers truncate toward zero (saturating), booleans map to `0`/`1`,
/// strings use [`leading_integer`], and `null`, arrays and objects yield `0`.
pub fn coerce_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => leading_integer(s),
        Value::Bool(b) => i64::from(*b),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    }
}

/// Coerces every element of a sequence, dropping elements that come out as `0`.
///
/// Relative order of the surviving elements is preserved. Objects are
/// treated as sequences of their values.
///
/// ```
/// use content_gate::coerce::coerce_integer_list;
/// use serde_json::json;
///
/// assert_eq!(coerce_integer_list(&json!(["3", "0", "abc", 7])), vec![3, 7]);
/// ```
pub fn coerce_integer_list(value: &Value) -> Vec<i64> {
    let items: Box<dyn Iterator<Item = &Value> + '_> = match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(map) => Box::new(map.values()),
        other => Box::new(std::iter::once(other)),
    };
    items.map(coerce_integer).filter(|n| *n != 0).collect()
}

/// Returns the value as an integer if it is a scalar that coerces to `>= 1`.
pub fn positive_integer(value: &Value) -> Option<i64> {
    if value.is_array() || value.is_object() {
        return None;
    }
    Some(coerce_integer(value)).filter(|n| *n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leading_integer_handles_signs_and_noise() {
        assert_eq!(leading_integer("+5"), 5);
        assert_eq!(leading_integer("  -12px"), -12);
        assert_eq!(leading_integer("5.9"), 5);
        assert_eq!(leading_integer(""), 0);
        assert_eq!(leading_integer("-"), 0);
        assert_eq!(leading_integer("--3"), 0);
        assert_eq!(leading_integer("-99999999999999999999"), i64::MIN);
    }

    #[test]
    fn coerce_integer_by_json_type() {
        assert_eq!(coerce_integer(&json!(17)), 17);
        assert_eq!(coerce_integer(&json!(3.99)), 3);
        assert_eq!(coerce_integer(&json!(-3.99)), -3);
        assert_eq!(coerce_integer(&json!(u64::MAX)), i64::MAX);
        assert_eq!(coerce_integer(&json!("8")), 8);
        assert_eq!(coerce_integer(&json!(true)), 1);
        assert_eq!(coerce_integer(&json!(false)), 0);
        assert_eq!(coerce_integer(&Value::Null), 0);
        assert_eq!(coerce_integer(&json!([1, 2])), 0);
        assert_eq!(coerce_integer(&json!({ "a": 1 })), 0);
    }

    #[test]
    fn list_coercion_drops_zero_and_invalid() {
        assert_eq!(coerce_integer_list(&json!([])), Vec::<i64>::new());
        assert_eq!(coerce_integer_list(&json!(["0", "x", null])), Vec::<i64>::new());
        assert_eq!(coerce_integer_list(&json!(["-4", "4"])), vec![-4, 4]);
        assert_eq!(coerce_integer_list(&json!([[1], "2"])), vec![2]);
    }

    #[test]
    fn list_coercion_reads_object_values() {
        assert_eq!(coerce_integer_list(&json!({ "a": "5", "b": "0" })), vec![5]);
    }

    #[test]
    fn positive_integer_ignores_non_positive_and_non_scalar() {
        assert_eq!(positive_integer(&json!("5")), Some(5));
        assert_eq!(positive_integer(&json!(1)), Some(1));
        assert_eq!(positive_integer(&json!("0")), None);
        assert_eq!(positive_integer(&json!("-3")), None);
        assert_eq!(positive_integer(&json!("abc")), None);
        assert_eq!(positive_integer(&json!(["5"])), None);
    }
}
