//! Synthetic source documents.
//!
//! A `SyntheticDay` is the nested record written to the document store by the
//! synthetic data generator and read back by the loader. Timestamps are stored
//! as native BSON datetimes.

use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of a synthetic day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

/// A single weighted event within a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp_event: DateTime<Utc>,
    pub weight: i32,
}

/// One synthetic day record.
///
/// `id` is left empty by the generator; the store assigns it on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticDay {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp_day: DateTime<Utc>,
    #[serde(rename = "cat")]
    pub category: String,
    pub owner: Owner,
    pub events: Vec<Event>,
}

impl SyntheticDay {
    /// Mean event weight, or 0.0 when the day has no events.
    pub fn average_weight(&self) -> f64 {
        if self.events.is_empty() {
            return 0.0;
        }
        let total: i64 = self.events.iter().map(|e| i64::from(e.weight)).sum();
        total as f64 / self.events.len() as f64
    }
}
