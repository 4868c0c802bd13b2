//! Index document types.
//!
//! This module defines the flat document that is pushed to the search index.

use serde_json::{Map, Value};

/// Document representation for the search index.
///
/// A document carries its key value separately from the rest of the fields.
/// The key is written under the schema's key field name when the document is
/// serialized for the search service; `fields` only ever contains
/// schema-declared, non-key fields with a non-null value.
///
/// # Fields
///
/// - `key`: Unique identifier of the document in the index
/// - `fields`: Schema-declared field values, already coerced to the field type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexDocument {
    pub key: String,
    pub fields: Map<String, Value>,
}

impl IndexDocument {
    /// Create a document with no fields.
    ///
    /// # Example
    ///
    /// ```
    /// use search_loader_shared::IndexDocument;
    ///
    /// let doc = IndexDocument::new("65f1c0ffee")
    ///     .with_field("cat", "Bowling")
    ///     .with_field("events_count", 3);
    ///
    /// assert_eq!(doc.key, "65f1c0ffee");
    /// assert_eq!(doc.get("events_count"), Some(&serde_json::json!(3)));
    /// ```
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field. Null values are dropped so that absent source values never
    /// reach the index as explicit nulls.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if !value.is_null() {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Render the document as the JSON object sent to the service, with the
    /// key stored under `key_field`.
    pub fn to_json(&self, key_field: &str) -> Value {
        let mut object = self.fields.clone();
        object.insert(key_field.to_string(), Value::String(self.key.clone()));
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_document_new() {
        let doc = IndexDocument::new("abc");

        assert_eq!(doc.key, "abc");
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn test_null_values_are_dropped() {
        let doc = IndexDocument::new("abc")
            .with_field("cat", Value::Null)
            .with_field("avg_weight", 15.0);

        assert!(doc.get("cat").is_none());
        assert_eq!(doc.get("avg_weight"), Some(&json!(15.0)));
    }

    #[test]
    fn test_to_json_places_key_under_key_field() {
        let doc = IndexDocument::new("abc").with_field("cat", "Chess");

        assert_eq!(doc.to_json("id"), json!({ "id": "abc", "cat": "Chess" }));
    }

    #[test]
    fn test_to_json_key_overrides_field_of_same_name() {
        let mut doc = IndexDocument::new("abc");
        doc.fields.insert("id".to_string(), json!("other"));

        assert_eq!(doc.to_json("id")["id"], "abc");
    }
}
