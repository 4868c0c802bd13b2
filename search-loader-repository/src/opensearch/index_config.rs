//! OpenSearch index configuration and mappings.
//!
//! This module converts an `IndexSchema` into OpenSearch index settings and
//! mappings, and converts a mapping reported by OpenSearch back into an
//! `IndexSchema` so it can be validated against the requested one.

use search_loader_shared::{FieldDef, FieldType, IndexSchema};
use serde_json::{json, Map, Value};

use crate::errors::SearchIndexError;

/// Name of the keyword sub-field added to text fields that must be filterable
/// or sortable.
pub const RAW_SUBFIELD: &str = "raw";

/// Mapping `_meta` entry recording the key field.
pub const KEY_FIELD_META: &str = "key_field";

/// Shard layout for created indexes.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl IndexConfig {
    pub fn new(number_of_shards: u32, number_of_replicas: u32) -> Self {
        Self {
            number_of_shards,
            number_of_replicas,
        }
    }
}

impl Default for IndexConfig {
    /// 1 primary shard, 1 replica for redundancy.
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// OpenSearch mapping for a single field.
///
/// - `Edm.String` maps to `text` when searchable, `keyword` otherwise. A
///   searchable string that is also filterable or sortable gets a `raw`
///   keyword sub-field. Unset attributes count as enabled, matching a
///   dynamically mapped OpenSearch string.
/// - Numbers, booleans and dates map to their native types, which are
///   filterable and sortable through doc values.
fn field_mapping(field: &FieldDef) -> Result<Value, SearchIndexError> {
    let mapping = match field.field_type {
        FieldType::String
            if field.is_searchable() && (field.is_filterable() || field.is_sortable()) =>
        {
            json!({
                "type": "text",
                "fields": { RAW_SUBFIELD: { "type": "keyword" } }
            })
        }
        FieldType::String if field.is_searchable() => json!({ "type": "text" }),
        FieldType::String => json!({ "type": "keyword" }),
        FieldType::Int32 => json!({ "type": "integer" }),
        FieldType::Int64 => json!({ "type": "long" }),
        FieldType::Double => json!({ "type": "double" }),
        FieldType::Boolean => json!({ "type": "boolean" }),
        FieldType::DateTimeOffset => json!({ "type": "date" }),
        FieldType::Unsupported => {
            return Err(SearchIndexError::validation(format!(
                "Field {} has a type OpenSearch cannot map",
                field.name
            )))
        }
    };
    Ok(mapping)
}

/// Get the index settings and mappings for a schema.
///
/// Mappings are `strict` so the field set of the index can only be the one
/// declared by the schema. The key field name is recorded in `_meta`.
pub fn get_index_settings(
    schema: &IndexSchema,
    config: &IndexConfig,
) -> Result<Value, SearchIndexError> {
    let key = schema.validate()?;

    let mut properties = Map::new();
    for field in &schema.fields {
        properties.insert(field.name.clone(), field_mapping(field)?);
    }

    Ok(json!({
        "settings": {
            "number_of_shards": config.number_of_shards,
            "number_of_replicas": config.number_of_replicas
        },
        "mappings": {
            "dynamic": "strict",
            "_meta": { KEY_FIELD_META: key.name },
            "properties": properties
        }
    }))
}

/// Rebuild an `IndexSchema` from the `mappings` object of an index.
pub fn schema_from_mappings(name: &str, mappings: &Value) -> Result<IndexSchema, SearchIndexError> {
    let properties = mappings
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SearchIndexError::parse(format!("Index {} has no mapped properties", name)))?;

    let key_field = mappings
        .get("_meta")
        .and_then(|meta| meta.get(KEY_FIELD_META))
        .and_then(Value::as_str);

    let fields = properties
        .iter()
        .map(|(field_name, mapping)| {
            let os_type = mapping.get("type").and_then(Value::as_str).unwrap_or("object");
            let has_raw = mapping
                .get("fields")
                .and_then(|f| f.get(RAW_SUBFIELD))
                .is_some();

            let field_type = match os_type {
                "text" | "keyword" => FieldType::String,
                "integer" => FieldType::Int32,
                "long" => FieldType::Int64,
                "double" | "float" => FieldType::Double,
                "boolean" => FieldType::Boolean,
                "date" => FieldType::DateTimeOffset,
                _ => FieldType::Unsupported,
            };
            let searchable = os_type == "text";
            let doc_values = !searchable || has_raw;

            FieldDef {
                name: field_name.clone(),
                field_type,
                key: key_field == Some(field_name.as_str()),
                searchable: Some(searchable),
                filterable: Some(doc_values),
                sortable: Some(doc_values),
                required: false,
            }
        })
        .collect();

    Ok(IndexSchema::new(name, fields))
}
