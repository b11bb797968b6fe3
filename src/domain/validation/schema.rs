//! Declarative input schemas.
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s. Validation walks every
//! declared field, coerces the raw JSON value, checks its bounds and collects
//! all violations before returning, so a caller can fix a request in one pass.
//! Unknown keys are ignored and `null` counts as absent.

use crate::domain::errors::{FieldViolation, ValidationError};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Inclusive(f64),
    Exclusive(f64),
}

impl Bound {
    fn admits_as_lower(&self, value: f64) -> bool {
        match self {
            Bound::Inclusive(b) => value >= *b,
            Bound::Exclusive(b) => value > *b,
        }
    }

    fn admits_as_upper(&self, value: f64) -> bool {
        match self {
            Bound::Inclusive(b) => value <= *b,
            Bound::Exclusive(b) => value < *b,
        }
    }

    fn describe_lower(&self) -> String {
        match self {
            Bound::Inclusive(b) => format!("greater than or equal to {}", b),
            Bound::Exclusive(b) => format!("greater than {}", b),
        }
    }

    fn describe_upper(&self) -> String {
        match self {
            Bound::Inclusive(b) => format!("less than or equal to {}", b),
            Bound::Exclusive(b) => format!("less than {}", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Float {
        min: Option<Bound>,
        max: Option<Bound>,
    },
    /// Inclusive integer range
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Bool,
    Text {
        max_len: Option<usize>,
    },
    Email,
    Url,
    TextList {
        max_items: Option<usize>,
    },
    TextMap,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Float { .. } | FieldKind::Integer { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(FieldValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Required,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
        }
    }

    pub fn with_default(name: &'static str, kind: FieldKind, default: FieldValue) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Default(default),
        }
    }
}

/// A coerced field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
    TextMap(BTreeMap<String, String>),
    Null,
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Output of a successful validation, in declared field order
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFields {
    values: Vec<(&'static str, FieldValue)>,
}

impl ValidatedFields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

impl Serialize for ValidatedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { name, fields }
    }

    /// Raw inputs of the liquidity model
    pub fn liquidity() -> Self {
        let non_negative = || FieldKind::Float {
            min: Some(Bound::Inclusive(0.0)),
            max: None,
        };
        let unbounded = || FieldKind::Float {
            min: None,
            max: None,
        };

        Self::new(
            "liquidity",
            vec![
                FieldSpec::required("price", non_negative()),
                FieldSpec::required("volume_24h", non_negative()),
                FieldSpec::required("market_cap", non_negative()),
                FieldSpec::required("change_24h", unbounded()),
                FieldSpec::required("change_7d", unbounded()),
                FieldSpec::required(
                    "day_of_week",
                    FieldKind::Integer {
                        min: Some(0),
                        max: Some(6),
                    },
                ),
                FieldSpec::required(
                    "month",
                    FieldKind::Integer {
                        min: Some(1),
                        max: Some(12),
                    },
                ),
            ],
        )
    }

    /// Flower measurements in centimetres
    pub fn iris() -> Self {
        let positive = || FieldKind::Float {
            min: Some(Bound::Exclusive(0.0)),
            max: None,
        };

        Self::new(
            "iris",
            vec![
                FieldSpec::required("sepal_length", positive()),
                FieldSpec::required("sepal_width", positive()),
                FieldSpec::required("petal_length", positive()),
                FieldSpec::required("petal_width", positive()),
            ],
        )
    }

    pub fn patient_record() -> Self {
        Self::new(
            "patient_record",
            vec![
                FieldSpec::required("name", FieldKind::Text { max_len: Some(50) }),
                FieldSpec::required("email", FieldKind::Email),
                FieldSpec::required("linkedin_url", FieldKind::Url),
                FieldSpec::required(
                    "age",
                    FieldKind::Integer {
                        min: None,
                        max: None,
                    },
                ),
                FieldSpec::required(
                    "weight",
                    FieldKind::Float {
                        min: Some(Bound::Exclusive(0.0)),
                        max: Some(Bound::Exclusive(120.0)),
                    },
                ),
                FieldSpec::with_default("married", FieldKind::Bool, FieldValue::Bool(false)),
                FieldSpec::optional("allergies", FieldKind::TextList { max_items: Some(5) }),
                FieldSpec::required("contact_details", FieldKind::TextMap),
            ],
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field_def| field_def.name == name)
    }

    pub fn validate(&self, raw: &Map<String, Value>) -> Result<ValidatedFields, ValidationError> {
        let mut values = Vec::with_capacity(self.fields.len());
        let mut violations = Vec::new();

        for field_def in &self.fields {
            match raw.get(field_def.name).filter(|v| !v.is_null()) {
                Some(value) => match check_field(field_def, value) {
                    Ok(coerced) => values.push((field_def.name, coerced)),
                    Err(violation) => violations.push(violation),
                },
                None => match &field_def.presence {
                    Presence::Required => violations.push(FieldViolation::missing(field_def.name)),
                    Presence::Optional => values.push((field_def.name, FieldValue::Null)),
                    Presence::Default(default) => values.push((field_def.name, default.clone())),
                },
            }
        }

        if violations.is_empty() {
            Ok(ValidatedFields { values })
        } else {
            Err(ValidationError { violations })
        }
    }
}

fn check_field(field_def: &FieldSpec, value: &Value) -> Result<FieldValue, FieldViolation> {
    let name = field_def.name;
    match &field_def.kind {
        FieldKind::Float { min, max } => {
            let v = coerce_float(value)
                .ok_or_else(|| FieldViolation::type_mismatch(name, "expected a finite number"))?;
            let lower_ok = min.is_none_or(|b| b.admits_as_lower(v));
            let upper_ok = max.is_none_or(|b| b.admits_as_upper(v));
            if lower_ok && upper_ok {
                Ok(FieldValue::Float(v))
            } else {
                Err(FieldViolation::out_of_range(
                    name,
                    describe_float_range(min, max, v),
                ))
            }
        }
        FieldKind::Integer { min, max } => {
            let v = coerce_integer(value)
                .ok_or_else(|| FieldViolation::type_mismatch(name, "expected an integer"))?;
            if min.is_some_and(|m| v < m) || max.is_some_and(|m| v > m) {
                let message = match (min, max) {
                    (Some(lo), Some(hi)) => format!("must be between {} and {}, got {}", lo, hi, v),
                    (Some(lo), None) => format!("must be at least {}, got {}", lo, v),
                    (None, Some(hi)) => format!("must be at most {}, got {}", hi, v),
                    (None, None) => unreachable!("bounds checked above"),
                };
                Err(FieldViolation::out_of_range(name, message))
            } else {
                Ok(FieldValue::Integer(v))
            }
        }
        FieldKind::Bool => coerce_bool(value)
            .map(FieldValue::Bool)
            .ok_or_else(|| FieldViolation::type_mismatch(name, "expected a boolean")),
        FieldKind::Text { max_len } => {
            let text = value
                .as_str()
                .ok_or_else(|| FieldViolation::type_mismatch(name, "expected a string"))?;
            match max_len {
                Some(limit) if text.chars().count() > *limit => Err(FieldViolation::out_of_range(
                    name,
                    format!("must have at most {} characters", limit),
                )),
                _ => Ok(FieldValue::Text(text.to_string())),
            }
        }
        FieldKind::Email => match value.as_str() {
            Some(text) if looks_like_email(text) => Ok(FieldValue::Text(text.to_string())),
            _ => Err(FieldViolation::type_mismatch(
                name,
                "expected an email address",
            )),
        },
        FieldKind::Url => match value.as_str().map(url::Url::parse) {
            Some(Ok(parsed)) => Ok(FieldValue::Text(parsed.to_string())),
            Some(Err(e)) => Err(FieldViolation::type_mismatch(
                name,
                format!("expected a URL: {}", e),
            )),
            None => Err(FieldViolation::type_mismatch(name, "expected a URL")),
        },
        FieldKind::TextList { max_items } => {
            let items = value
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| FieldViolation::type_mismatch(name, "expected a list of strings"))?;
            match max_items {
                Some(limit) if items.len() > *limit => Err(FieldViolation::out_of_range(
                    name,
                    format!("must have at most {} items, got {}", limit, items.len()),
                )),
                _ => Ok(FieldValue::TextList(items)),
            }
        }
        FieldKind::TextMap => value
            .as_object()
            .and_then(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect::<Option<BTreeMap<_, _>>>()
            })
            .map(FieldValue::TextMap)
            .ok_or_else(|| {
                FieldViolation::type_mismatch(name, "expected a map of string to string")
            }),
    }
}

fn describe_float_range(min: &Option<Bound>, max: &Option<Bound>, got: f64) -> String {
    let parts: Vec<String> = [
        min.as_ref().map(Bound::describe_lower),
        max.as_ref().map(Bound::describe_upper),
    ]
    .into_iter()
    .flatten()
    .collect();
    format!("must be {}, got {}", parts.join(" and "), got)
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn looks_like_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
