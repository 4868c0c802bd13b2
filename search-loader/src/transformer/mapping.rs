//! Field mappings and value coercion.
//!
//! A mapping says where the value of one index field comes from in a source
//! document. The extracted BSON value is then coerced to the field's declared
//! type.

use bson::{Bson, Document};
use chrono::{DateTime, SecondsFormat, Utc};
use search_loader_shared::FieldType;
use serde_json::{Number, Value};

use crate::errors::TransformError;

/// Source of a single index field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMapping {
    /// Value at a dotted path through sub-documents, e.g. `owner.email`.
    Path(String),
    /// Number of elements of the array at a dotted path. A missing array
    /// counts as empty.
    ArrayLength(String),
    /// Mean of `field` over the sub-documents of the array at `array`.
    /// A missing or empty array averages to 0.0.
    ArrayAverage { array: String, field: String },
    /// The same value for every document.
    Constant(Bson),
}

impl FieldMapping {
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    pub fn array_length(array: impl Into<String>) -> Self {
        Self::ArrayLength(array.into())
    }

    pub fn array_average(array: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ArrayAverage {
            array: array.into(),
            field: field.into(),
        }
    }

    /// Extract the raw value for `target` from `document`.
    ///
    /// `Ok(None)` means the source has no value; nulls count as no value.
    pub fn extract(&self, document: &Document, target: &str) -> Result<Option<Bson>, TransformError> {
        match self {
            Self::Path(path) => Ok(lookup(document, path).cloned()),
            Self::ArrayLength(path) => {
                let len = array_at(document, path, target)?.map_or(0, |a| a.len());
                Ok(Some(Bson::Int64(len as i64)))
            }
            Self::ArrayAverage { array, field } => {
                let elements = array_at(document, array, target)?.unwrap_or_default();
                if elements.is_empty() {
                    return Ok(Some(Bson::Double(0.0)));
                }
                let mut total = 0.0;
                for element in elements {
                    let value = element
                        .as_document()
                        .and_then(|d| lookup(d, field))
                        .and_then(as_f64)
                        .ok_or_else(|| {
                            TransformError::invalid_field(
                                target,
                                format!("{}.{} is not numeric in every element", array, field),
                            )
                        })?;
                    total += value;
                }
                Ok(Some(Bson::Double(total / elements.len() as f64)))
            }
            Self::Constant(value) => match value {
                Bson::Null => Ok(None),
                other => Ok(Some(other.clone())),
            },
        }
    }
}

/// Follow a dotted path through nested documents. Nulls resolve to `None`.
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    match current {
        Bson::Null | Bson::Undefined => None,
        value => Some(value),
    }
}

fn array_at<'a>(
    document: &'a Document,
    path: &str,
    target: &str,
) -> Result<Option<&'a [Bson]>, TransformError> {
    match lookup(document, path) {
        None => Ok(None),
        Some(Bson::Array(items)) => Ok(Some(items.as_slice())),
        Some(other) => Err(TransformError::invalid_field(
            target,
            format!("{} is a {:?}, not an array", path, other.element_type()),
        )),
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Integral value of a BSON number, if it has one.
fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 && v.is_finite() && v.abs() < 9.0e15 => {
            Some(*v as i64)
        }
        _ => None,
    }
}

/// Render an instant the way the index expects: UTC with millisecond precision.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Convert an extracted value to the JSON representation of `field_type`.
pub fn coerce(value: &Bson, field_type: FieldType, target: &str) -> Result<Value, TransformError> {
    let invalid = |reason: String| TransformError::invalid_field(target, reason);

    match field_type {
        FieldType::String => match value {
            Bson::String(s) => Ok(Value::String(s.clone())),
            Bson::ObjectId(oid) => Ok(Value::String(oid.to_hex())),
            Bson::Int32(v) => Ok(Value::String(v.to_string())),
            Bson::Int64(v) => Ok(Value::String(v.to_string())),
            Bson::Double(v) => Ok(Value::String(v.to_string())),
            Bson::Boolean(v) => Ok(Value::String(v.to_string())),
            Bson::DateTime(dt) => Ok(Value::String(format_timestamp(dt.to_chrono()))),
            other => Err(invalid(format!("cannot convert {:?} to a string", other.element_type()))),
        },
        FieldType::Int32 => as_i64(value)
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::from)
            .ok_or_else(|| invalid(format!("{} is not a 32-bit integer", value))),
        FieldType::Int64 => as_i64(value)
            .map(Value::from)
            .ok_or_else(|| invalid(format!("{} is not a 64-bit integer", value))),
        FieldType::Double => as_f64(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid(format!("{} is not a finite number", value))),
        FieldType::Boolean => match value {
            Bson::Boolean(v) => Ok(Value::Bool(*v)),
            other => Err(invalid(format!("{} is not a boolean", other))),
        },
        FieldType::DateTimeOffset => match value {
            Bson::DateTime(dt) => Ok(Value::String(format_timestamp(dt.to_chrono()))),
            Bson::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::String(format_timestamp(dt.with_timezone(&Utc))))
                .map_err(|e| invalid(format!("{:?} is not an RFC 3339 timestamp: {}", s, e))),
            other => Err(invalid(format!("{} is not a timestamp", other))),
        },
        FieldType::Unsupported => Err(invalid("unsupported field type".to_string())),
    }
}
