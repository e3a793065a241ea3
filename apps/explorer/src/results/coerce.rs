use serde_json::{Map, Value};

/// Returns the first candidate field that is present and not `null`.
pub fn first_present<'a>(row: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .find_map(|key| row.get(*key).filter(|v| !v.is_null()))
}

/// Lenient numeric coercion: JSON numbers and numeric strings.
///
/// A blank string reads as 0. Booleans, containers and non-finite results
/// yield `None`.
pub fn to_finite(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(0.0);
            }
            s.parse::<f64>().ok()?
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => return None,
    };

    n.is_finite().then_some(n)
}

/// Like [`to_finite`] but only accepts whole numbers that fit in an `i64`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn to_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let n = to_finite(value)?;
    if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_present_skips_null() {
        let row = json!({"cell_id": null, "id": 4});
        let map = row.as_object().cloned().unwrap_or_default();
        assert_eq!(first_present(&map, &["cell_id", "id"]), Some(&json!(4)));
        assert_eq!(first_present(&map, &["missing"]), None);
    }

    #[test]
    fn test_to_finite() {
        assert_eq!(to_finite(&json!(2.5)), Some(2.5));
        assert_eq!(to_finite(&json!(" 12 ")), Some(12.0));
        assert_eq!(to_finite(&json!("1e2")), Some(100.0));
        assert_eq!(to_finite(&json!("x")), None);
        assert_eq!(to_finite(&json!("")), Some(0.0));
        assert_eq!(to_finite(&json!("   ")), Some(0.0));
        assert_eq!(to_finite(&json!("NaN")), None);
        assert_eq!(to_finite(&json!("inf")), None);
        assert_eq!(to_finite(&json!(true)), None);
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer(&json!(7)), Some(7));
        assert_eq!(to_integer(&json!("10")), Some(10));
        assert_eq!(to_integer(&json!(3.0)), Some(3));
        assert_eq!(to_integer(&json!(3.5)), None);
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert!((round2(2.345_000_1) - 2.35).abs() < f64::EPSILON);
        assert!((round2(-1.005_01) - -1.01).abs() < f64::EPSILON);
        assert!((round2(10.0) - 10.0).abs() < f64::EPSILON);
        assert!((round2(0.125) - 0.13).abs() < f64::EPSILON);
    }
}
