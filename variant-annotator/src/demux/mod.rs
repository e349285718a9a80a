use serde_json::Value;

use crate::error::SchemaError;
use crate::fetch::RawResponse;
use crate::record::Record;

pub mod json;
pub mod tabular;
pub mod xml;

pub use json::JsonKeyDemux;
pub use tabular::TabularDemux;
pub use xml::{IdLocator, ValueFrom, XmlElementDemux};

/// The raw data of exactly one entity, cut out of a batch response.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A serialized, self-contained XML element.
    Xml(String),
    Json(Value),
    /// One row of a tabular response, keyed by the header.
    Row(Record),
}

/// Splits one batch response into `(id, fragment)` pairs.
///
/// Ids are read from the response itself, never inferred from position, so reordered or
/// omitted entities are handled. Requested ids that are not in the response are simply absent.
/// Pairs for ids that were not requested are still returned; callers decide what to do with them.
pub trait Demultiplexer: Send + Sync {
    fn demultiplex(
        &self,
        requested: &[String],
        raw: &RawResponse,
    ) -> Result<Vec<(String, Fragment)>, SchemaError>;
}

pub(crate) fn unexpected_response(expected: &'static str, raw: &RawResponse) -> SchemaError {
    let got = match raw {
        RawResponse::Xml(_) => "xml",
        RawResponse::Json(_) => "json",
        RawResponse::Text(_) => "text",
    };
    SchemaError::Malformed {
        format: "response",
        message: format!("expected {expected}, got {got}"),
    }
}
