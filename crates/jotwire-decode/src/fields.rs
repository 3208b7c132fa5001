//! Typed accessors for required fields of a JSON object.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{Result, ValidationError};

/// A decoded JSON object.
pub type Object = Map<String, Value>;

/// Require `value` to be a JSON object.
pub fn as_object(value: &Value) -> Result<&Object> {
    value.as_object().ok_or(ValidationError::NotAnObject)
}

/// Required-field accessors. Each failure names the key and the expected kind.
pub trait JsonObject {
    /// Any value, as long as the key is present.
    fn value(&self, key: &str) -> Result<&Value>;

    fn string(&self, key: &str) -> Result<String>;

    /// A string value, or `None` when absent or not a string.
    fn optional_string(&self, key: &str) -> Option<String>;

    fn int(&self, key: &str) -> Result<i64>;

    fn bool(&self, key: &str) -> Result<bool>;

    fn array(&self, key: &str) -> Result<&Vec<Value>>;

    fn object(&self, key: &str) -> Result<&Object>;

    /// A string value converted through `FromStr`, for enum-like fields.
    fn raw<T: FromStr>(&self, key: &str, expected: &'static str) -> Result<T>;
}

impl JsonObject for Object {
    fn value(&self, key: &str) -> Result<&Value> {
        self.get(key).ok_or_else(|| ValidationError::Missing {
            key: key.to_string(),
        })
    }

    fn string(&self, key: &str) -> Result<String> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ValidationError::wrong_type(key, "a String"))
    }

    fn optional_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn int(&self, key: &str) -> Result<i64> {
        self.get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| ValidationError::wrong_type(key, "an Int"))
    }

    fn bool(&self, key: &str) -> Result<bool> {
        self.get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| ValidationError::wrong_type(key, "a Bool"))
    }

    fn array(&self, key: &str) -> Result<&Vec<Value>> {
        self.get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::wrong_type(key, "an Array"))
    }

    fn object(&self, key: &str) -> Result<&Object> {
        self.get(key)
            .and_then(Value::as_object)
            .ok_or_else(|| ValidationError::wrong_type(key, "a dictionary"))
    }

    fn raw<T: FromStr>(&self, key: &str, expected: &'static str) -> Result<T> {
        self.get(key)
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| ValidationError::wrong_type(key, expected))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Object {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn typed_accessors_read_matching_values() {
        let obj = object(json!({
            "title": "Hi",
            "width": 200,
            "editable": true,
            "items": [1],
            "root": {"type": "label"}
        }));
        assert_eq!(obj.string("title").unwrap(), "Hi");
        assert_eq!(obj.int("width").unwrap(), 200);
        assert!(obj.bool("editable").unwrap());
        assert_eq!(obj.array("items").unwrap().len(), 1);
        assert!(obj.object("root").unwrap().contains_key("type"));
    }

    #[test]
    fn wrong_type_names_key_and_kind() {
        let obj = object(json!({"width": "wide"}));
        let err = obj.int("width").unwrap_err();
        assert_eq!(err.to_string(), "expected width to be an Int");
    }

    #[test]
    fn missing_typed_key_reads_as_wrong_type() {
        let obj = object(json!({}));
        assert_eq!(
            obj.string("title").unwrap_err(),
            ValidationError::WrongType {
                key: "title".to_string(),
                expected: "a String"
            }
        );
    }

    #[test]
    fn fractional_numbers_are_not_ints() {
        let obj = object(json!({"height": 12.5}));
        assert!(obj.int("height").is_err());
    }

    #[test]
    fn value_accepts_anything_present() {
        let obj = object(json!({"value": null}));
        assert_eq!(obj.value("value").unwrap(), &Value::Null);
        assert_eq!(
            obj.value("other").unwrap_err().to_string(),
            "no other".to_string()
        );
    }

    #[test]
    fn raw_parses_through_from_str() {
        let obj = object(json!({"port": "2016", "bad": "x"}));
        assert_eq!(obj.raw::<u16>("port", "a port").unwrap(), 2016);
        assert_eq!(
            obj.raw::<u16>("bad", "a port").unwrap_err().to_string(),
            "expected bad to be a port"
        );
    }

    #[test]
    fn optional_string_ignores_other_kinds() {
        let obj = object(json!({"id": 5, "name": "n"}));
        assert_eq!(obj.optional_string("id"), None);
        assert_eq!(obj.optional_string("name").as_deref(), Some("n"));
    }

    #[test]
    fn as_object_rejects_arrays() {
        assert_eq!(as_object(&json!([])).unwrap_err(), ValidationError::NotAnObject);
    }
}
