use serde_json::Value;

use crate::demux::Fragment;
use crate::error::SchemaError;
use crate::record::Record;
use crate::xml::Element;

pub mod clinvar_rcv;
pub mod clinvar_variation;
pub mod ensembl;
pub mod pubmed;
pub mod tree;

pub use clinvar_rcv::ClinvarRcvParser;
pub use clinvar_variation::ClinvarVariationParser;
pub use ensembl::EnsemblParser;
pub use pubmed::PubmedParser;
pub use tree::{normalize, TreeNode, TreeParser};

/// Turns one entity's fragment into its normalized record.
///
/// Implementations are pure: the same fragment always gives the same value. Missing optional
/// data leaves keys out; missing required data is a [`SchemaError`].
pub trait FragmentParser: Send + Sync {
    fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError>;
}

pub(crate) fn wrong_fragment(expected: &'static str, fragment: &Fragment) -> SchemaError {
    let got = match fragment {
        Fragment::Xml(_) => "xml",
        Fragment::Json(_) => "json",
        Fragment::Row(_) => "row",
    };
    SchemaError::Malformed {
        format: "fragment",
        message: format!("expected {expected}, got {got}"),
    }
}

pub(crate) fn xml_root(fragment: &Fragment) -> Result<Element, SchemaError> {
    match fragment {
        Fragment::Xml(xml) => Element::parse(xml),
        other => Err(wrong_fragment("xml", other)),
    }
}

pub(crate) fn json_object(fragment: &Fragment) -> Result<Record, SchemaError> {
    match fragment {
        Fragment::Json(Value::Object(object)) => Ok(object.clone()),
        Fragment::Row(row) => Ok(row.clone()),
        other => Err(wrong_fragment("json object", other)),
    }
}

/// Integer attribute, absent when the attribute is.
pub(crate) fn int_attr(element: &Element, name: &str) -> Result<Option<i64>, SchemaError> {
    element.attr(name).map(|raw| parse_int(name, raw)).transpose()
}

pub(crate) fn parse_int(field: &str, raw: &str) -> Result<i64, SchemaError> {
    raw.trim().parse().map_err(|_| SchemaError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

pub(crate) fn parse_float(field: &str, raw: &str) -> Result<f64, SchemaError> {
    raw.trim().parse().map_err(|_| SchemaError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
