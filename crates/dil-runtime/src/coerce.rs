//! `as T` conversions

use crate::error::{EvalError, EvalResult};
use crate::value::{format_float, TypeTag, Value};

/// Convert `value` to the variant named by `target`.
///
/// Composites only convert to their own tag, which is a no-op that keeps the
/// same body.
pub fn coerce(value: Value, target: TypeTag) -> EvalResult<Value> {
    if value.type_tag() == target {
        return Ok(value);
    }

    let converted = match (&value, target) {
        (Value::Int(i), TypeTag::Float) => Some(Value::Float(*i as f64)),
        (Value::Int(i), TypeTag::Str) => Some(Value::string(i.to_string())),

        (Value::Float(f), TypeTag::Int) => float_to_int(*f).map(Value::Int),
        (Value::Float(f), TypeTag::Str) => Some(Value::string(format_float(*f))),

        (Value::Str(s), TypeTag::Int) => s.trim().parse::<i64>().ok().map(Value::Int),
        (Value::Str(s), TypeTag::Float) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float),
        (Value::Str(s), TypeTag::Bool) => match s.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (Value::Bool(b), TypeTag::Str) => Some(Value::string(b.to_string())),

        _ => None,
    };

    converted.ok_or_else(|| EvalError::invalid_cast(describe(&value), target))
}

/// Interpret a value as an array or string index, using the `as int` rules
pub fn to_index(value: Value) -> EvalResult<i64> {
    let converted = coerce(value, TypeTag::Int)?;
    converted
        .as_int()
        .ok_or_else(|| EvalError::invalid_cast(describe(&converted), TypeTag::Int))
}

fn float_to_int(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

/// Type name, with the scalar payload where it helps explain a failed cast
fn describe(value: &Value) -> String {
    match value {
        Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Bool(_) => {
            format!("{} {}", value.type_name(), value)
        }
        _ => value.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{ArrayId, MapId};

    #[test]
    fn test_string_to_int() {
        assert_eq!(
            coerce(Value::from("1234567890"), TypeTag::Int).unwrap(),
            Value::Int(1234567890)
        );
        assert_eq!(coerce(Value::from(" 42 "), TypeTag::Int).unwrap(), Value::Int(42));
        assert_eq!(
            coerce(Value::from("abc"), TypeTag::Int).unwrap_err(),
            EvalError::invalid_cast("str \"abc\"", TypeTag::Int)
        );
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(coerce(Value::Int(1984), TypeTag::Str).unwrap(), Value::from("1984"));
        assert!(matches!(
            coerce(Value::Int(2), TypeTag::Float).unwrap(),
            Value::Float(f) if f == 2.0
        ));
        assert!(coerce(Value::Int(1), TypeTag::Bool).is_err());
    }

    #[test]
    fn test_float_to_int_requires_integral_value() {
        assert!(matches!(
            coerce(Value::Float(3.0), TypeTag::Int).unwrap(),
            Value::Int(3)
        ));
        assert!(matches!(
            coerce(Value::Float(2.5), TypeTag::Int).unwrap_err(),
            EvalError::InvalidCast { .. }
        ));
        assert!(coerce(Value::Float(1e19), TypeTag::Int).is_err());
        assert!(coerce(Value::Float(f64::NAN), TypeTag::Int).is_err());
    }

    #[test]
    fn test_string_to_float_must_be_finite() {
        assert!(matches!(
            coerce(Value::from("2.5e3"), TypeTag::Float).unwrap(),
            Value::Float(f) if f == 2500.0
        ));
        for text in ["1e400", "-1e400", "inf", "NaN"] {
            assert_eq!(
                coerce(Value::from(text), TypeTag::Float).unwrap_err(),
                EvalError::invalid_cast(format!("str \"{}\"", text), TypeTag::Float)
            );
        }
    }

    #[test]
    fn test_bool_and_string() {
        assert_eq!(coerce(Value::from("true"), TypeTag::Bool).unwrap(), Value::Bool(true));
        assert_eq!(coerce(Value::Bool(false), TypeTag::Str).unwrap(), Value::from("false"));
        assert!(coerce(Value::from("yes"), TypeTag::Bool).is_err());
    }

    #[test]
    fn test_composites_only_cast_to_themselves() {
        let map = Value::Map(MapId::new(0));
        assert_eq!(coerce(map.clone(), TypeTag::Map).unwrap(), map);
        assert_eq!(
            coerce(map, TypeTag::Array).unwrap_err(),
            EvalError::invalid_cast("map", TypeTag::Array)
        );
        assert!(coerce(Value::Array(ArrayId::new(0)), TypeTag::Str).is_err());
    }

    #[test]
    fn test_null_only_casts_to_null() {
        assert_eq!(coerce(Value::Null, TypeTag::Null).unwrap(), Value::Null);
        assert!(coerce(Value::Null, TypeTag::Str).is_err());
    }

    #[test]
    fn test_to_index() {
        assert_eq!(to_index(Value::Int(1)).unwrap(), 1);
        assert_eq!(to_index(Value::from("2")).unwrap(), 2);
        assert!(matches!(
            to_index(Value::Bool(true)),
            Err(EvalError::InvalidCast { .. })
        ));
    }
}
