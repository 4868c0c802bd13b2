//! Index schema types.
//!
//! This module defines the field schema of the target search index. The same
//! definition is used to create the index, to validate the index the service
//! reports back, and to drive the document transformer.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primitive field types supported by the search index.
///
/// Serialized with the Entity Data Model names used by the search service
/// REST API (e.g. `Edm.String`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "Edm.String")]
    String,
    #[serde(rename = "Edm.Int32")]
    Int32,
    #[serde(rename = "Edm.Int64")]
    Int64,
    #[serde(rename = "Edm.Double")]
    Double,
    #[serde(rename = "Edm.Boolean")]
    Boolean,
    #[serde(rename = "Edm.DateTimeOffset")]
    DateTimeOffset,
    /// Any type reported by the service that this loader does not produce
    /// (collections, complex types, vectors).
    #[serde(other)]
    Unsupported,
}

impl FieldType {
    /// The wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::Double => "Edm.Double",
            Self::Boolean => "Edm.Boolean",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Unsupported => "Unsupported",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field declaration in an index schema.
///
/// Attributes left as `None` are omitted from the wire payload, so the
/// service applies its own default. Both backends treat an unset attribute
/// as enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    /// Documents without a value for this field are rejected by the
    /// transformer. Local to the loader; never sent to the service.
    #[serde(skip)]
    pub required: bool,
}

impl FieldDef {
    /// Create a plain, non-key field of the given type with every attribute
    /// left to the service default.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            searchable: None,
            filterable: None,
            sortable: None,
            required: false,
        }
    }

    /// Create the key field. Keys are always strings and are not full-text
    /// searchable.
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            key: true,
            searchable: Some(false),
            ..Self::new(name, FieldType::String)
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = Some(true);
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = Some(true);
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = Some(true);
        self
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable.unwrap_or(true)
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable.unwrap_or(true)
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable.unwrap_or(true)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Errors raised when a schema violates its own invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Index name must not be empty")]
    EmptyIndexName,

    #[error("Schema has no key field")]
    NoKeyField,

    #[error("Schema has more than one key field: {0:?}")]
    MultipleKeyFields(Vec<String>),

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Field name must not be empty")]
    EmptyFieldName,

    #[error("Key field {name} must be Edm.String, found {found}")]
    KeyFieldType { name: String, found: FieldType },

    #[error("Field {0} has an unsupported type")]
    UnsupportedType(String),
}

/// A difference between a requested schema and the one the service reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// Declared locally, absent remotely.
    MissingField(String),
    /// Present remotely, not declared locally.
    UnexpectedField(String),
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: FieldType,
    },
    KeyMismatch {
        expected: String,
        actual: Option<String>,
    },
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "field {} missing from index", name),
            Self::UnexpectedField(name) => write!(f, "unexpected field {} in index", name),
            Self::TypeMismatch {
                field,
                expected,
                actual,
            } => write!(f, "field {} has type {}, expected {}", field, actual, expected),
            Self::KeyMismatch { expected, actual } => match actual {
                Some(actual) => write!(f, "key field is {}, expected {}", actual, expected),
                None => write!(f, "index has no key field, expected {}", expected),
            },
        }
    }
}

/// Schema of the target search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Check the schema invariants and return the key field.
    ///
    /// A valid schema has a non-empty name, unique non-empty field names,
    /// no unsupported types, and exactly one key field of type `Edm.String`.
    pub fn validate(&self) -> Result<&FieldDef, SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyIndexName);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if field.field_type == FieldType::Unsupported {
                return Err(SchemaError::UnsupportedType(field.name.clone()));
            }
        }

        let keys: Vec<&FieldDef> = self.fields.iter().filter(|f| f.key).collect();
        match keys.as_slice() {
            [] => Err(SchemaError::NoKeyField),
            [key] if key.field_type != FieldType::String => Err(SchemaError::KeyFieldType {
                name: key.name.clone(),
                found: key.field_type,
            }),
            [key] => Ok(key),
            many => Err(SchemaError::MultipleKeyFields(
                many.iter().map(|f| f.name.clone()).collect(),
            )),
        }
    }

    /// The key field, if exactly one field is marked as key.
    pub fn key_field(&self) -> Option<&FieldDef> {
        let mut keys = self.fields.iter().filter(|f| f.key);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Compare this schema against the schema reported by the service.
    ///
    /// Only field names, field types and the key field are compared; field
    /// attributes such as `searchable` are service-specific and ignored.
    /// Returns an empty vector when the two match.
    pub fn mismatches(&self, remote: &IndexSchema) -> Vec<SchemaMismatch> {
        let mut mismatches = Vec::new();
        let remote_fields: HashMap<&str, &FieldDef> = remote
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f))
            .collect();

        for field in &self.fields {
            match remote_fields.get(field.name.as_str()) {
                None => mismatches.push(SchemaMismatch::MissingField(field.name.clone())),
                Some(found) if found.field_type != field.field_type => {
                    mismatches.push(SchemaMismatch::TypeMismatch {
                        field: field.name.clone(),
                        expected: field.field_type,
                        actual: found.field_type,
                    })
                }
                Some(_) => {}
            }
        }

        for field in &remote.fields {
            if self.field(&field.name).is_none() {
                mismatches.push(SchemaMismatch::UnexpectedField(field.name.clone()));
            }
        }

        if let Some(expected) = self.key_field() {
            let actual = remote.key_field().map(|f| f.name.clone());
            if actual.as_deref() != Some(expected.name.as_str()) {
                mismatches.push(SchemaMismatch::KeyMismatch {
                    expected: expected.name.clone(),
                    actual,
                });
            }
        }

        mismatches
    }
}
