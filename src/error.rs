//! Error taxonomy for dataset loads and core lookups.
//!
//! Missing or non-numeric data is not an error: it surfaces as
//! [`TypedValue::Unavailable`](crate::data::TypedValue::Unavailable) or
//! [`MetricValue::Unavailable`](crate::derive::MetricValue::Unavailable).

use thiserror::Error;

/// Failures of a single query against a loaded dataset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("No core found with name '{identifier}'")]
    NotFound { identifier: String },
    #[error("Dimension '{field}' not found in dataset")]
    FieldNotFound { field: String },
}

/// Failures of a dataset load. Both variants leave any previously loaded
/// snapshot untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Data source '{source_id}' has no columns usable as a core identifier")]
    SchemaDegenerate { source_id: String },
    #[error("Reading data source '{source_id}'")]
    Unreadable {
        source_id: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl LoadError {
    pub(crate) fn unreadable(source_id: impl Into<String>, err: anyhow::Error) -> Self {
        LoadError::Unreadable {
            source_id: source_id.into(),
            cause: err.into(),
        }
    }
}
