use serde_json::Value;

use super::{unexpected_response, Demultiplexer, Fragment};
use crate::error::SchemaError;
use crate::fetch::RawResponse;

/// For services answering with one json object keyed by the requested ids. Demultiplexing is a
/// lookup; ids mapped to nothing or to `null` were not found.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonKeyDemux;

impl Demultiplexer for JsonKeyDemux {
    fn demultiplex(
        &self,
        requested: &[String],
        raw: &RawResponse,
    ) -> Result<Vec<(String, Fragment)>, SchemaError> {
        let parsed;
        let body = match raw {
            RawResponse::Json(value) => value,
            RawResponse::Text(text) => {
                parsed = serde_json::from_str::<Value>(text).map_err(|e| SchemaError::Malformed {
                    format: "json",
                    message: e.to_string(),
                })?;
                &parsed
            }
            RawResponse::Xml(_) => return Err(unexpected_response("json", raw)),
        };

        let Value::Object(by_id) = body else {
            return Err(SchemaError::Malformed {
                format: "json",
                message: "expected an object keyed by id".to_string(),
            });
        };

        Ok(requested
            .iter()
            .filter_map(|id| match by_id.get(id) {
                None | Some(Value::Null) => None,
                Some(value) => Some((id.clone(), Fragment::Json(value.clone()))),
            })
            .collect())
    }
}
