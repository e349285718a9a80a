use std::fmt;

use thiserror::Error;

/// Failures of the cache layer. A `Deserialize` error only ever concerns one key, and
/// `Cache::get` reports it per key instead of returning it.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("failed to serialize value for {key}: {error}")]
    Serialize {
        key: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("failed to deserialize cached value for {key}: {error}")]
    Deserialize {
        key: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("value for {key} is not a string, and it is not being stored as json")]
    NotText { key: String },

    #[error("namespace {namespace:?} cannot contain ':'")]
    InvalidNamespace { namespace: String },
}

/// Failures talking to an upstream service. Raised per batch, never retried at this layer.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FetchError {
    /// Transient failures a retry policy may reasonably try again: transport problems,
    /// rate limiting (429) and server errors (5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Malformed(_) | FetchError::Config(_) => false,
        }
    }
}

/// A structural invariant of an upstream document was broken. This means the upstream format
/// changed, so it is always fatal for the batch being processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("expected exactly {expected} {what}, found {found}")]
    Cardinality {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("missing required field {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("malformed {format}: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
}

impl SchemaError {
    pub fn exactly_one(what: impl Into<String>, found: usize) -> Self {
        SchemaError::Cardinality {
            what: what.into(),
            expected: 1,
            found,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        SchemaError::MissingField(field.into())
    }
}

/// Which batch of a call an error happened in, so it can be diagnosed without re-running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub index: usize,
    pub size: usize,
    pub first_id: Option<String>,
}

impl fmt::Display for BatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.first_id {
            Some(first) => write!(
                f,
                "batch #{} ({} ids, starting at {})",
                self.index, self.size, first
            ),
            None => write!(f, "batch #{} ({} ids)", self.index, self.size),
        }
    }
}

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("{source_name}: fetching {batch} failed: {error}")]
    Fetch {
        source_name: String,
        batch: BatchContext,
        #[source]
        error: FetchError,
    },

    #[error("{source_name}: schema violation in {batch}: {error}")]
    Schema {
        source_name: String,
        batch: BatchContext,
        #[source]
        error: SchemaError,
    },

    #[error("{source_name}: failed to parse annotation for {id}: {error}")]
    Parse {
        source_name: String,
        id: String,
        #[source]
        error: SchemaError,
    },

    #[error("{source_name}: {id} was not found in the cache nor upstream")]
    NotFound { source_name: String, id: String },

    #[error("{source_name}: cache error: {error}")]
    Cache {
        source_name: String,
        #[source]
        error: CacheError,
    },
}

impl AnnotationError {
    pub fn source_name(&self) -> &str {
        match self {
            AnnotationError::Fetch { source_name, .. }
            | AnnotationError::Schema { source_name, .. }
            | AnnotationError::Parse { source_name, .. }
            | AnnotationError::NotFound { source_name, .. }
            | AnnotationError::Cache { source_name, .. } => source_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_message_names_expected_and_found() {
        let err = SchemaError::exactly_one("ClinVarAccession[Type=RCV]", 2);
        assert_eq!(
            err.to_string(),
            "expected exactly 1 ClinVarAccession[Type=RCV], found 2"
        );
    }

    #[test]
    fn test_batch_context_display() {
        let ctx = BatchContext {
            index: 2,
            size: 25,
            first_id: Some("rs123".to_string()),
        };
        assert_eq!(ctx.to_string(), "batch #2 (25 ids, starting at rs123)");

        let ctx = BatchContext {
            index: 0,
            size: 0,
            first_id: None,
        };
        assert_eq!(ctx.to_string(), "batch #0 (0 ids)");
    }

    #[test]
    fn test_annotation_error_carries_source_and_batch() {
        let err = AnnotationError::Schema {
            source_name: "clinvar".to_string(),
            batch: BatchContext {
                index: 1,
                size: 3,
                first_id: Some("RCV000001".to_string()),
            },
            error: SchemaError::exactly_one("accession", 0),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("clinvar: schema violation in batch #1"));
        assert!(msg.contains("found 0"));
        assert_eq!(err.source_name(), "clinvar");
    }

    #[test]
    fn test_retryable_statuses() {
        let rate_limited = FetchError::Status {
            status: 429,
            body: String::new(),
        };
        let server = FetchError::Status {
            status: 503,
            body: String::new(),
        };
        let client = FetchError::Status {
            status: 400,
            body: String::new(),
        };
        assert!(rate_limited.is_retryable());
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!FetchError::Malformed("bad".to_string()).is_retryable());
    }
}
