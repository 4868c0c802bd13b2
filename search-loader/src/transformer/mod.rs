//! Source document → index document transformation.

mod document_transformer;
mod mapping;

pub use document_transformer::{document_key, DocumentTransformer};
pub use mapping::{coerce, format_timestamp, lookup, FieldMapping};

use search_loader_shared::{FieldDef, FieldType, IndexSchema};

/// Index name used when none is configured.
pub const DEFAULT_INDEX_NAME: &str = "synthetic-index";

/// Key field of the default schema.
pub const DEFAULT_KEY_FIELD: &str = "id";

/// Schema of the synthetic-day index.
pub fn default_schema(index_name: impl Into<String>) -> IndexSchema {
    IndexSchema::new(
        index_name,
        vec![
            FieldDef::key(DEFAULT_KEY_FIELD),
            FieldDef::new("timestamp_day", FieldType::DateTimeOffset)
                .filterable()
                .sortable(),
            FieldDef::new("cat", FieldType::String)
                .searchable()
                .filterable()
                .sortable(),
            FieldDef::new("owner_email", FieldType::String).searchable(),
            FieldDef::new("owner_firstName", FieldType::String)
                .searchable()
                .sortable(),
            FieldDef::new("owner_lastName", FieldType::String)
                .searchable()
                .sortable(),
            FieldDef::new("events_count", FieldType::Int32)
                .filterable()
                .sortable(),
            FieldDef::new("avg_weight", FieldType::Double)
                .filterable()
                .sortable(),
        ],
    )
}

/// Mappings that flatten a synthetic day into the default schema.
pub fn default_mappings() -> Vec<(String, FieldMapping)> {
    vec![
        ("timestamp_day".into(), FieldMapping::path("timestamp_day")),
        ("cat".into(), FieldMapping::path("cat")),
        ("owner_email".into(), FieldMapping::path("owner.email")),
        ("owner_firstName".into(), FieldMapping::path("owner.firstName")),
        ("owner_lastName".into(), FieldMapping::path("owner.lastName")),
        ("events_count".into(), FieldMapping::array_length("events")),
        (
            "avg_weight".into(),
            FieldMapping::array_average("events", "weight"),
        ),
    ]
}
