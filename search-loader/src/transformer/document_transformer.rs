use std::collections::HashSet;

use bson::{Bson, Document};
use search_loader_shared::{FieldDef, IndexDocument, IndexSchema};

use super::mapping::{coerce, FieldMapping};
use crate::errors::{LoaderError, TransformError};

/// Turns source documents into flat index documents.
///
/// Built once per run from the target schema and the field mappings; every
/// call to [`transform`](Self::transform) is pure.
#[derive(Debug, Clone)]
pub struct DocumentTransformer {
    key_field: String,
    mappings: Vec<(FieldDef, FieldMapping)>,
}

impl DocumentTransformer {
    /// Check `mappings` against `schema`.
    ///
    /// Every mapping must target a declared non-key field, at most once, and
    /// every required non-key field must have a mapping.
    pub fn new(
        schema: &IndexSchema,
        mappings: Vec<(String, FieldMapping)>,
    ) -> Result<Self, LoaderError> {
        let key = schema
            .validate()
            .map_err(|e| LoaderError::invalid_mapping(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(mappings.len());
        for (target, mapping) in mappings {
            let field = schema.field(&target).ok_or_else(|| {
                LoaderError::invalid_mapping(format!(
                    "{} is not a field of index {}",
                    target, schema.name
                ))
            })?;
            if field.key {
                return Err(LoaderError::invalid_mapping(format!(
                    "{} is the key field and is always taken from _id",
                    target
                )));
            }
            if !seen.insert(target.clone()) {
                return Err(LoaderError::invalid_mapping(format!(
                    "{} is mapped more than once",
                    target
                )));
            }
            resolved.push((field.clone(), mapping));
        }

        if let Some(unmapped) = schema
            .fields
            .iter()
            .find(|f| f.required && !f.key && !seen.contains(&f.name))
        {
            return Err(LoaderError::invalid_mapping(format!(
                "required field {} has no mapping",
                unmapped.name
            )));
        }

        Ok(Self {
            key_field: key.name.clone(),
            mappings: resolved,
        })
    }

    /// Name of the index field that receives the document key.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn transform(&self, document: &Document) -> Result<IndexDocument, TransformError> {
        let mut output = IndexDocument::new(document_key(document)?);

        for (field, mapping) in &self.mappings {
            match mapping.extract(document, &field.name)? {
                Some(value) => {
                    output.insert(field.name.clone(), coerce(&value, field.field_type, &field.name)?)
                }
                None if field.required => return Err(TransformError::missing_field(&field.name)),
                None => {}
            }
        }

        Ok(output)
    }
}

/// Key of a source document: its `_id` rendered as a string.
pub fn document_key(document: &Document) -> Result<String, TransformError> {
    match document.get("_id") {
        Some(Bson::ObjectId(oid)) => Ok(oid.to_hex()),
        Some(Bson::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Bson::Int32(v)) => Ok(v.to_string()),
        Some(Bson::Int64(v)) => Ok(v.to_string()),
        Some(Bson::String(_)) => Err(TransformError::missing_key("_id is an empty string")),
        Some(Bson::Null) | None => Err(TransformError::missing_key("_id is missing")),
        Some(other) => Err(TransformError::missing_key(format!(
            "_id of type {:?} cannot be used as a key",
            other.element_type()
        ))),
    }
}
