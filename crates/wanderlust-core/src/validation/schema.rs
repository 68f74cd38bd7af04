//! Declarative field constraints for JSON request bodies.
//!
//! A schema is a tree of `Rule`s. Validation walks the body against it,
//! converting form-style values on the way (numeric strings to numbers,
//! `"true"`/`"false"` to booleans) and stops at the first violation.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// First constraint a body violated. `path` is the dotted location of the
/// offending value, e.g. `review.categoryRatings.value` or
/// `geometry.coordinates[1]`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("\"{path}\" is required")]
    Required { path: String },

    #[error("\"{path}\" is not allowed")]
    UnknownField { path: String },

    #[error("\"{path}\" must be a string")]
    NotString { path: String },

    #[error("\"{path}\" is not allowed to be empty")]
    Empty { path: String },

    #[error("\"{path}\" length must be less than or equal to {max} characters long")]
    TooLong { path: String, max: usize },

    #[error("\"{path}\" must be one of [{allowed}]")]
    NotAllowed { path: String, allowed: String },

    #[error("\"{path}\" must be a number")]
    NotNumber { path: String },

    #[error("\"{path}\" must be greater than or equal to {min}")]
    TooSmall { path: String, min: f64 },

    #[error("\"{path}\" must be less than or equal to {max}")]
    TooLarge { path: String, max: f64 },

    #[error("\"{path}\" must be a boolean")]
    NotBoolean { path: String },

    #[error("\"{path}\" must be an array")]
    NotArray { path: String },

    #[error("\"{path}\" must contain {len} items")]
    WrongLength { path: String, len: usize },

    #[error("\"{path}\" must be of type object")]
    NotObject { path: String },
}

impl ValidationError {
    pub fn path(&self) -> &str {
        match self {
            ValidationError::Required { path }
            | ValidationError::UnknownField { path }
            | ValidationError::NotString { path }
            | ValidationError::Empty { path }
            | ValidationError::TooLong { path, .. }
            | ValidationError::NotAllowed { path, .. }
            | ValidationError::NotNumber { path }
            | ValidationError::TooSmall { path, .. }
            | ValidationError::TooLarge { path, .. }
            | ValidationError::NotBoolean { path }
            | ValidationError::NotArray { path }
            | ValidationError::WrongLength { path, .. }
            | ValidationError::NotObject { path } => path,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    String {
        allow_empty: bool,
        max_len: Option<usize>,
        allowed: &'static [&'static str],
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    Array {
        items: Box<Rule>,
        len: Option<usize>,
    },
    Object {
        fields: Vec<Field>,
        allow_unknown: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub rule: Rule,
    pub required: bool,
}

impl Field {
    pub fn optional(name: &'static str, rule: Rule) -> Self {
        Self {
            name,
            rule,
            required: false,
        }
    }

    pub fn required(name: &'static str, rule: Rule) -> Self {
        Self {
            name,
            rule,
            required: true,
        }
    }
}

impl Rule {
    /// Non-empty string
    pub fn string() -> Self {
        Rule::String {
            allow_empty: false,
            max_len: None,
            allowed: &[],
        }
    }

    /// String that may be empty
    pub fn text() -> Self {
        Rule::String {
            allow_empty: true,
            max_len: None,
            allowed: &[],
        }
    }

    pub fn string_max(max_len: usize) -> Self {
        Rule::String {
            allow_empty: false,
            max_len: Some(max_len),
            allowed: &[],
        }
    }

    pub fn one_of(allowed: &'static [&'static str]) -> Self {
        Rule::String {
            allow_empty: false,
            max_len: None,
            allowed,
        }
    }

    pub fn number() -> Self {
        Rule::Number {
            min: None,
            max: None,
        }
    }

    pub fn min(min: f64) -> Self {
        Rule::Number {
            min: Some(min),
            max: None,
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Rule::Number {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn boolean() -> Self {
        Rule::Boolean
    }

    pub fn array_of(items: Rule) -> Self {
        Rule::Array {
            items: Box::new(items),
            len: None,
        }
    }

    pub fn exactly(items: Rule, len: usize) -> Self {
        Rule::Array {
            items: Box::new(items),
            len: Some(len),
        }
    }

    /// Object that rejects keys it does not list
    pub fn object(fields: Vec<Field>) -> Self {
        Rule::Object {
            fields,
            allow_unknown: false,
        }
    }

    /// Object that passes unlisted keys through untouched
    pub fn open_object(fields: Vec<Field>) -> Self {
        Rule::Object {
            fields,
            allow_unknown: true,
        }
    }

    /// Validate `value` and return it with conversions applied
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.check(value, "")
    }

    fn check(&self, value: &Value, path: &str) -> Result<Value, ValidationError> {
        match self {
            Rule::String {
                allow_empty,
                max_len,
                allowed,
            } => check_string(value, path, *allow_empty, *max_len, allowed),
            Rule::Number { min, max } => check_number(value, path, *min, *max),
            Rule::Boolean => check_boolean(value, path),
            Rule::Array { items, len } => {
                let Value::Array(values) = value else {
                    return Err(ValidationError::NotArray { path: label(path) });
                };
                if let Some(len) = len {
                    if values.len() != *len {
                        return Err(ValidationError::WrongLength {
                            path: label(path),
                            len: *len,
                        });
                    }
                }
                values
                    .iter()
                    .enumerate()
                    .map(|(i, item)| items.check(item, &format!("{}[{}]", label(path), i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Rule::Object {
                fields,
                allow_unknown,
            } => check_object(value, path, fields, *allow_unknown),
        }
    }
}

/// Path as shown in messages; the unnamed root is called `value`
fn label(path: &str) -> String {
    if path.is_empty() {
        "value".to_string()
    } else {
        path.to_string()
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn check_object(
    value: &Value,
    path: &str,
    fields: &[Field],
    allow_unknown: bool,
) -> Result<Value, ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::NotObject { path: label(path) });
    };

    let mut out = Map::new();
    for field in fields {
        let field_path = child_path(path, field.name);
        match map.get(field.name) {
            Some(v) => {
                out.insert(field.name.to_string(), field.rule.check(v, &field_path)?);
            }
            None if field.required => {
                return Err(ValidationError::Required { path: field_path });
            }
            None => {}
        }
    }

    for (key, v) in map {
        if fields.iter().any(|f| f.name == key.as_str()) {
            continue;
        }
        if !allow_unknown {
            return Err(ValidationError::UnknownField {
                path: child_path(path, key),
            });
        }
        out.insert(key.clone(), v.clone());
    }
    Ok(Value::Object(out))
}

fn check_string(
    value: &Value,
    path: &str,
    allow_empty: bool,
    max_len: Option<usize>,
    allowed: &[&str],
) -> Result<Value, ValidationError> {
    let Value::String(s) = value else {
        return Err(ValidationError::NotString { path: label(path) });
    };
    if s.is_empty() && !allow_empty {
        return Err(ValidationError::Empty { path: label(path) });
    }
    if let Some(max) = max_len {
        if s.chars().count() > max {
            return Err(ValidationError::TooLong {
                path: label(path),
                max,
            });
        }
    }
    if !allowed.is_empty() && !allowed.contains(&s.as_str()) {
        return Err(ValidationError::NotAllowed {
            path: label(path),
            allowed: allowed.join(", "),
        });
    }
    Ok(value.clone())
}

fn check_number(
    value: &Value,
    path: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value, ValidationError> {
    let not_number = || ValidationError::NotNumber { path: label(path) };

    let (n, converted) = match value {
        Value::Number(n) => (n.as_f64().ok_or_else(not_number)?, value.clone()),
        Value::String(s) => {
            let parsed: f64 = s.trim().parse().map_err(|_| not_number())?;
            if !parsed.is_finite() || s.trim().is_empty() {
                return Err(not_number());
            }
            (parsed, number_value(parsed).ok_or_else(not_number)?)
        }
        _ => return Err(not_number()),
    };

    if let Some(min) = min {
        if n < min {
            return Err(ValidationError::TooSmall {
                path: label(path),
                min,
            });
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(ValidationError::TooLarge {
                path: label(path),
                max,
            });
        }
    }
    Ok(converted)
}

/// Integral values stay integers so they deserialize into integer fields
fn number_value(n: f64) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(Value::Number(Number::from(n as i64)))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}

fn check_boolean(value: &Value, path: &str) -> Result<Value, ValidationError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        _ => Err(ValidationError::NotBoolean { path: label(path) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_strings_are_converted() {
        let rule = Rule::min(0.0);
        assert_eq!(rule.validate(&json!("120")).unwrap(), json!(120));
        assert_eq!(rule.validate(&json!(" 1.5 ")).unwrap(), json!(1.5));
        assert_eq!(rule.validate(&json!(7)).unwrap(), json!(7));
    }

    #[test]
    fn test_non_numbers_rejected() {
        let rule = Rule::number();
        for bad in [json!("abc"), json!(""), json!(null), json!(true), json!("NaN"), json!([1])] {
            assert!(
                matches!(rule.validate(&bad), Err(ValidationError::NotNumber { .. })),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_number_bounds_messages() {
        let err = Rule::range(1.0, 5.0).validate(&json!(6)).unwrap_err();
        assert_eq!(err.to_string(), "\"value\" must be less than or equal to 5");
        let err = Rule::min(0.5).validate(&json!(0)).unwrap_err();
        assert_eq!(err.to_string(), "\"value\" must be greater than or equal to 0.5");
    }

    #[test]
    fn test_strings() {
        assert!(matches!(
            Rule::string().validate(&json!("")),
            Err(ValidationError::Empty { .. })
        ));
        assert_eq!(Rule::text().validate(&json!("")).unwrap(), json!(""));
        assert!(matches!(
            Rule::string().validate(&json!(12)),
            Err(ValidationError::NotString { .. })
        ));
        // Length counts characters, not bytes
        assert!(Rule::string_max(3).validate(&json!("äöü")).is_ok());
        assert!(Rule::string_max(3).validate(&json!("abcd")).is_err());
    }

    #[test]
    fn test_one_of() {
        let rule = Rule::one_of(&["Point"]);
        assert!(rule.validate(&json!("Point")).is_ok());
        let err = rule.validate(&json!("Polygon")).unwrap_err();
        assert_eq!(err.to_string(), "\"value\" must be one of [Point]");
    }

    #[test]
    fn test_boolean_conversion() {
        assert_eq!(Rule::boolean().validate(&json!("true")).unwrap(), json!(true));
        assert_eq!(Rule::boolean().validate(&json!("FALSE")).unwrap(), json!(false));
        assert!(Rule::boolean().validate(&json!("yes")).is_err());
        assert!(Rule::boolean().validate(&json!(1)).is_err());
    }

    #[test]
    fn test_array_paths_and_length() {
        let rule = Rule::object(vec![Field::optional(
            "coordinates",
            Rule::exactly(Rule::number(), 2),
        )]);
        let err = rule
            .validate(&json!({"coordinates": [1, "x"]}))
            .unwrap_err();
        assert_eq!(err.path(), "coordinates[1]");

        let err = rule.validate(&json!({"coordinates": [1]})).unwrap_err();
        assert_eq!(err.to_string(), "\"coordinates\" must contain 2 items");
    }

    #[test]
    fn test_unknown_keys() {
        let strict = Rule::object(vec![Field::optional("a", Rule::string())]);
        let err = strict.validate(&json!({"a": "x", "b": 1})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownField { path: "b".to_string() });

        let open = Rule::open_object(vec![Field::optional("a", Rule::string())]);
        assert_eq!(
            open.validate(&json!({"a": "x", "b": 1})).unwrap(),
            json!({"a": "x", "b": 1})
        );
    }

    #[test]
    fn test_nested_required_path() {
        let rule = Rule::object(vec![Field::required(
            "outer",
            Rule::object(vec![Field::required("inner", Rule::number())]),
        )]);
        let err = rule.validate(&json!({"outer": {}})).unwrap_err();
        assert_eq!(err.to_string(), "\"outer.inner\" is required");
    }
}
