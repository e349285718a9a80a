use serde_json::{json, Value};

use super::{json_object, parse_float, FragmentParser};
use crate::demux::Fragment;
use crate::error::SchemaError;

const FULL_INFO_KEYS: [&str; 3] = ["populations", "population_genotypes", "genotypes"];

/// Ensembl `variation` records. Without `full_info` the population and genotype tables are
/// dropped, since they dwarf the rest of the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsemblParser {
    pub full_info: bool,
}

impl EnsemblParser {
    pub fn new(full_info: bool) -> Self {
        Self { full_info }
    }
}

impl FragmentParser for EnsemblParser {
    fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError> {
        let mut record = json_object(fragment)?;

        if !self.full_info {
            for key in FULL_INFO_KEYS {
                record.remove(key);
            }
        }

        // Ensembl sends MAF as a string for some variants and as a number for others.
        let maf = match record.get("MAF") {
            Some(Value::String(raw)) if !raw.is_empty() => Some(parse_float("MAF", raw)?),
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        };
        if let Some(maf) = maf {
            record.insert("MAF".to_string(), json!(maf));
        }

        Ok(Value::Object(record))
    }
}
