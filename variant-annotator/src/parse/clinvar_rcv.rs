use serde_json::{json, Value};

use super::{xml_root, FragmentParser};
use crate::demux::Fragment;
use crate::error::SchemaError;
use crate::record::{insert_opt, Record};
use crate::xml::Element;

/// Parses one `<ClinVarSet>` (efetch `rettype=clinvarset`) keyed by its RCV accession.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinvarRcvParser;

impl FragmentParser for ClinvarRcvParser {
    fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError> {
        let set = xml_root(fragment)?;
        let mut info = Record::new();

        let accession = set
            .find("ClinVarAccession", &[("Type", "RCV")])
            .ok_or_else(|| SchemaError::missing("ClinVarAccession[Type=RCV]"))?;
        info.insert("accession".into(), json!(accession.required_attr("Acc")?));

        let measure_set = set
            .find("MeasureSet", &[])
            .ok_or_else(|| SchemaError::missing("MeasureSet"))?;
        info.insert("entry_type".into(), json!(measure_set.required_attr("Type")?));

        let title = set
            .find("Title", &[])
            .ok_or_else(|| SchemaError::missing("Title"))?;
        info.insert("title".into(), json!(title.text.trim()));

        info.insert("attributes".into(), Value::Array(attributes(&set)));

        insert_opt(
            &mut info,
            "dbsnp_id",
            set.find("XRef", &[("DB", "dbSNP"), ("Type", "rs")])
                .and_then(|xref| xref.attr("ID"))
                .map(|id| format!("rs{id}")),
        );

        Ok(Value::Object(info))
    }
}

fn attributes(set: &Element) -> Vec<Value> {
    let measure_sets = set.select("MeasureSet");
    let mut attributes = Vec::new();
    for measure_set in &measure_sets {
        for measure in measure_set.select("Measure") {
            for attribute in measure.select("AttributeSet Attribute") {
                let mut info: Record = attribute
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.to_lowercase(), json!(v)))
                    .collect();
                info.insert("full_name".into(), json!(attribute.text.trim()));
                insert_opt(&mut info, "measureset_type", measure_set.attr("Type"));
                insert_opt(&mut info, "measure_type", measure.attr("Type"));
                info.insert("measuresets_in_this_entry".into(), json!(measure_sets.len()));
                attributes.push(Value::Object(info));
            }
        }
    }
    attributes
}
