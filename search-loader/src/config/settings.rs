//! Run settings read from the environment.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use search_loader_repository::azure::DEFAULT_API_VERSION;
use search_loader_source::mongo::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_TIMEOUT};
use search_loader_source::MongoConfig;

use crate::loader::LoaderConfig;
use crate::transformer::DEFAULT_INDEX_NAME;
use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default timeout for search service requests in seconds.
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;

/// Where the Azure AI Search service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzureLocation {
    /// `https://{name}.search.windows.net`
    ServiceName(String),
    /// Full endpoint URL.
    Endpoint(String),
}

/// Search service the documents are loaded into.
#[derive(Clone, PartialEq, Eq)]
pub enum SearchBackend {
    Azure {
        location: AzureLocation,
        api_key: String,
        api_version: String,
    },
    OpenSearch {
        url: String,
    },
}

impl fmt::Debug for SearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Azure {
                location,
                api_version,
                ..
            } => f
                .debug_struct("Azure")
                .field("location", location)
                .field("api_key", &"<redacted>")
                .field("api_version", api_version)
                .finish(),
            Self::OpenSearch { url } => f.debug_struct("OpenSearch").field("url", url).finish(),
        }
    }
}

/// Everything a run needs, collected once at startup.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub source: MongoConfig,
    pub backend: SearchBackend,
    pub index_name: String,
    pub loader: LoaderConfig,
    pub search_timeout: Duration,
}

impl LoaderSettings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `MONGO_CONN_STRING` (or `COSMOS_CONN_STRING`): source connection string (required)
    /// - `SOURCE_DATABASE`: database name (default: Synthetic_Data_DB)
    /// - `SOURCE_COLLECTION`: collection name (default: Synthetic_Data_COL)
    /// - `SOURCE_TIMEOUT_SECS`: source server selection timeout (default: 10)
    /// - `SEARCH_BACKEND`: "azure" or "opensearch" (default: azure when
    ///   `SEARCH_SERVICE_NAME` or `SEARCH_ENDPOINT` is set, otherwise opensearch)
    /// - `SEARCH_SERVICE_NAME` or `SEARCH_ENDPOINT`: Azure service (required for azure)
    /// - `SEARCH_ADMIN_KEY`: Azure admin key (required for azure)
    /// - `SEARCH_API_VERSION`: Azure REST API version (default: 2023-10-01-Preview)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `SEARCH_INDEX_NAME`: target index (default: synthetic-index)
    /// - `BATCH_SIZE`: documents per push (default: 1000)
    /// - `PUSH_MAX_RETRIES`: retries for throttled or dropped pushes (default: 0)
    /// - `SEARCH_TIMEOUT_SECS`: search service request timeout (default: 30)
    ///
    /// Every missing or malformed variable is reported in a single error.
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let connection_string = get("MONGO_CONN_STRING").or_else(|| get("COSMOS_CONN_STRING"));
        if connection_string.is_none() {
            problems.push("MONGO_CONN_STRING is not set".to_string());
        }
        let source_timeout = parse_or(&get, "SOURCE_TIMEOUT_SECS", DEFAULT_TIMEOUT.as_secs(), &mut problems);

        let service_name = get("SEARCH_SERVICE_NAME");
        let endpoint = get("SEARCH_ENDPOINT");
        let use_azure = match get("SEARCH_BACKEND").map(|b| b.to_lowercase()) {
            Some(b) if b == "azure" => true,
            Some(b) if b == "opensearch" => false,
            Some(other) => {
                problems.push(format!(
                    "SEARCH_BACKEND must be \"azure\" or \"opensearch\", got {:?}",
                    other
                ));
                false
            }
            None => service_name.is_some() || endpoint.is_some(),
        };

        let backend = if use_azure {
            let location = match (endpoint, service_name) {
                (Some(endpoint), _) => Some(AzureLocation::Endpoint(endpoint)),
                (None, Some(name)) => Some(AzureLocation::ServiceName(name)),
                (None, None) => {
                    problems.push("SEARCH_SERVICE_NAME or SEARCH_ENDPOINT is not set".to_string());
                    None
                }
            };
            let api_key = get("SEARCH_ADMIN_KEY");
            if api_key.is_none() {
                problems.push("SEARCH_ADMIN_KEY is not set".to_string());
            }
            location.zip(api_key).map(|(location, api_key)| SearchBackend::Azure {
                location,
                api_key,
                api_version: get("SEARCH_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            })
        } else {
            Some(SearchBackend::OpenSearch {
                url: get("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            })
        };

        let defaults = LoaderConfig::default();
        let batch_size = parse_or(&get, "BATCH_SIZE", defaults.batch_size, &mut problems);
        if batch_size == 0 {
            problems.push("BATCH_SIZE must be at least 1".to_string());
        }
        let max_retries = parse_or(&get, "PUSH_MAX_RETRIES", defaults.max_retries, &mut problems);
        let search_timeout =
            parse_or(&get, "SEARCH_TIMEOUT_SECS", DEFAULT_SEARCH_TIMEOUT_SECS, &mut problems);

        match (connection_string, backend) {
            (Some(connection_string), Some(backend)) if problems.is_empty() => Ok(Self {
                source: MongoConfig::new(connection_string)
                    .with_namespace(
                        get("SOURCE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                        get("SOURCE_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
                    )
                    .with_timeout(Duration::from_secs(source_timeout)),
                backend,
                index_name: get("SEARCH_INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
                loader: LoaderConfig {
                    batch_size,
                    max_retries,
                    ..defaults
                },
                search_timeout: Duration::from_secs(search_timeout),
            }),
            _ => Err(IndexingError::config(format!(
                "Invalid environment: {}",
                problems.join("; ")
            ))),
        }
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T, problems: &mut Vec<String>) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            problems.push(format!("{} has invalid value {:?}: {}", name, raw, e));
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<LoaderSettings, IndexingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoaderSettings::from_lookup(|name| vars.get(name).cloned())
    }

    fn config_message(result: Result<LoaderSettings, IndexingError>) -> String {
        match result {
            Err(IndexingError::ConfigError(msg)) => msg,
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_opensearch_defaults() {
        let s = settings(&[("MONGO_CONN_STRING", "mongodb://localhost:27017")]).unwrap();

        assert_eq!(
            s.backend,
            SearchBackend::OpenSearch {
                url: DEFAULT_OPENSEARCH_URL.to_string()
            }
        );
        assert_eq!(s.source.database, DEFAULT_DATABASE);
        assert_eq!(s.source.collection, DEFAULT_COLLECTION);
        assert_eq!(s.source.timeout, DEFAULT_TIMEOUT);
        assert_eq!(s.index_name, "synthetic-index");
        assert_eq!(s.loader, LoaderConfig::default());
        assert_eq!(s.search_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_azure_from_service_name() {
        let s = settings(&[
            ("COSMOS_CONN_STRING", "mongodb://cosmos"),
            ("SEARCH_SERVICE_NAME", "my-search"),
            ("SEARCH_ADMIN_KEY", "secret"),
            ("BATCH_SIZE", "250"),
            ("PUSH_MAX_RETRIES", "3"),
        ])
        .unwrap();

        assert_eq!(s.source.connection_string, "mongodb://cosmos");
        assert_eq!(
            s.backend,
            SearchBackend::Azure {
                location: AzureLocation::ServiceName("my-search".into()),
                api_key: "secret".into(),
                api_version: DEFAULT_API_VERSION.into(),
            }
        );
        assert_eq!(s.loader.batch_size, 250);
        assert_eq!(s.loader.max_retries, 3);
        assert!(!format!("{:?}", s.backend).contains("secret"));
    }

    #[test]
    fn test_explicit_backend_wins() {
        let s = settings(&[
            ("MONGO_CONN_STRING", "mongodb://localhost"),
            ("SEARCH_SERVICE_NAME", "my-search"),
            ("SEARCH_BACKEND", "OpenSearch"),
            ("OPENSEARCH_URL", "http://search:9200"),
        ])
        .unwrap();

        assert_eq!(
            s.backend,
            SearchBackend::OpenSearch {
                url: "http://search:9200".into()
            }
        );
    }

    #[test]
    fn test_missing_variables_reported_together() {
        let msg = config_message(settings(&[("SEARCH_BACKEND", "azure")]));

        assert!(msg.contains("MONGO_CONN_STRING"));
        assert!(msg.contains("SEARCH_SERVICE_NAME or SEARCH_ENDPOINT"));
        assert!(msg.contains("SEARCH_ADMIN_KEY"));
    }

    #[test]
    fn test_malformed_numbers() {
        let msg = config_message(settings(&[
            ("MONGO_CONN_STRING", "mongodb://localhost"),
            ("BATCH_SIZE", "lots"),
            ("SEARCH_TIMEOUT_SECS", "-1"),
        ]));

        assert!(msg.contains("BATCH_SIZE"));
        assert!(msg.contains("SEARCH_TIMEOUT_SECS"));

        let msg = config_message(settings(&[
            ("MONGO_CONN_STRING", "mongodb://localhost"),
            ("BATCH_SIZE", "0"),
        ]));
        assert!(msg.contains("BATCH_SIZE must be at least 1"));
    }

    #[test]
    fn test_unknown_backend() {
        let msg = config_message(settings(&[
            ("MONGO_CONN_STRING", "mongodb://localhost"),
            ("SEARCH_BACKEND", "solr"),
        ]));
        assert!(msg.contains("SEARCH_BACKEND"));
    }
}
