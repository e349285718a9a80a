use super::{unexpected_response, Demultiplexer, Fragment};
use crate::error::SchemaError;
use crate::fetch::RawResponse;
use crate::xml::Element;

/// Where an entity's identifier lives in its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFrom {
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdLocator {
    /// An attribute on the entity element itself, like `<DocumentSummary uid="123">`.
    Attribute(String),
    /// The single descendant matching `selector`. Zero or several matches break the document's
    /// schema and fail the batch.
    UniqueDescendant { selector: String, value: ValueFrom },
}

/// Demultiplexes XML documents made of repeated entity elements.
#[derive(Debug, Clone)]
pub struct XmlElementDemux {
    /// Selector for the entity elements, e.g. `"ClinVarSet"`.
    pub element: String,
    pub id: IdLocator,
}

impl XmlElementDemux {
    pub fn by_attribute(element: &str, attribute: &str) -> Self {
        Self {
            element: element.to_string(),
            id: IdLocator::Attribute(attribute.to_string()),
        }
    }

    pub fn by_unique_descendant(element: &str, selector: &str, value: ValueFrom) -> Self {
        Self {
            element: element.to_string(),
            id: IdLocator::UniqueDescendant {
                selector: selector.to_string(),
                value,
            },
        }
    }

    fn entity_id(&self, entity: &Element) -> Result<String, SchemaError> {
        let id = match &self.id {
            IdLocator::Attribute(name) => entity.required_attr(name)?.to_string(),
            IdLocator::UniqueDescendant { selector, value } => {
                let holder = entity.select_exactly_one(selector)?;
                match value {
                    ValueFrom::Attribute(name) => holder.required_attr(name)?.to_string(),
                    ValueFrom::Text => holder.text.clone(),
                }
            }
        };
        if id.is_empty() {
            return Err(SchemaError::InvalidValue {
                field: format!("{} id", entity.name),
                value: id,
            });
        }
        Ok(id)
    }
}

impl Demultiplexer for XmlElementDemux {
    fn demultiplex(
        &self,
        _requested: &[String],
        raw: &RawResponse,
    ) -> Result<Vec<(String, Fragment)>, SchemaError> {
        let text = match raw {
            RawResponse::Xml(text) | RawResponse::Text(text) => text,
            RawResponse::Json(_) => return Err(unexpected_response("xml", raw)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let root = Element::parse(text)?;
        let entities = if root.name == self.element {
            vec![&root]
        } else {
            root.select(&self.element)
        };

        entities
            .into_iter()
            .map(|entity| Ok((self.entity_id(entity)?, Fragment::Xml(entity.to_xml()))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partial_response_covers_present_ids_only() {
        let raw = RawResponse::Xml(
            r#"<Root><Entity id="2"><v>b</v></Entity><Entity id="1"><v>a</v></Entity></Root>"#
                .to_string(),
        );
        let demux = XmlElementDemux::by_attribute("Entity", "id");
        let pairs = demux.demultiplex(&ids(&["1", "2", "3"]), &raw).unwrap();

        let keys: Vec<&str> = pairs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(keys, vec!["2", "1"]);
        assert_eq!(
            pairs[1].1,
            Fragment::Xml(r#"<Entity id="1"><v>a</v></Entity>"#.to_string())
        );
    }

    const CLINVAR_SETS: &str = r#"
        <ReleaseSet>
          <ClinVarSet ID="1">
            <ReferenceClinVarAssertion>
              <ClinVarAccession Acc="RCV000001" Type="RCV"/>
            </ReferenceClinVarAssertion>
            <ClinVarAssertion><ClinVarAccession Acc="SCV000009" Type="SCV"/></ClinVarAssertion>
          </ClinVarSet>
          <ClinVarSet ID="2">
            <ReferenceClinVarAssertion>
              <ClinVarAccession Acc="RCV000002" Type="RCV"/>
            </ReferenceClinVarAssertion>
          </ClinVarSet>
        </ReleaseSet>"#;

    fn rcv_demux() -> XmlElementDemux {
        XmlElementDemux::by_unique_descendant(
            "ClinVarSet",
            "ClinVarAccession[Type=RCV]",
            ValueFrom::Attribute("Acc".to_string()),
        )
    }

    #[test]
    fn test_unique_descendant_id() {
        let pairs = rcv_demux()
            .demultiplex(&ids(&["RCV000001"]), &RawResponse::Xml(CLINVAR_SETS.to_string()))
            .unwrap();
        let keys: Vec<&str> = pairs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(keys, vec!["RCV000001", "RCV000002"]);
    }

    #[test]
    fn test_cardinality_violation_fails() {
        let two = r#"<ReleaseSet><ClinVarSet>
              <ClinVarAccession Acc="RCV1" Type="RCV"/>
              <ClinVarAccession Acc="RCV2" Type="RCV"/>
            </ClinVarSet></ReleaseSet>"#;
        let err = rcv_demux()
            .demultiplex(&[], &RawResponse::Xml(two.to_string()))
            .unwrap_err();
        assert_eq!(err, SchemaError::exactly_one("ClinVarAccession[Type=RCV]", 2));

        let none = r#"<ReleaseSet><ClinVarSet><Title>x</Title></ClinVarSet></ReleaseSet>"#;
        let err = rcv_demux()
            .demultiplex(&[], &RawResponse::Xml(none.to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("found 0"));
    }

    #[test]
    fn test_id_from_text() {
        let raw = RawResponse::Xml(
            r#"<PubmedArticleSet>
                 <PubmedArticle><MedlineCitation><PMID Version="1">111</PMID></MedlineCitation></PubmedArticle>
               </PubmedArticleSet>"#
                .to_string(),
        );
        let demux =
            XmlElementDemux::by_unique_descendant("PubmedArticle", "MedlineCitation > PMID", ValueFrom::Text);
        let pairs = demux.demultiplex(&ids(&["111"]), &raw).unwrap();
        assert_eq!(pairs[0].0, "111");
    }

    #[test]
    fn test_root_can_be_the_entity_and_empty_body_is_empty() {
        let demux = XmlElementDemux::by_attribute("VariationReport", "VariationID");
        let pairs = demux
            .demultiplex(
                &[],
                &RawResponse::Xml(r#"<VariationReport VariationID="9"/>"#.to_string()),
            )
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(demux
            .demultiplex(&[], &RawResponse::Xml("  ".to_string()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_id_attribute_and_wrong_format() {
        let demux = XmlElementDemux::by_attribute("Entity", "id");
        assert_eq!(
            demux
                .demultiplex(&[], &RawResponse::Xml("<Root><Entity/></Root>".to_string()))
                .unwrap_err(),
            SchemaError::missing("Entity@id")
        );
        assert!(matches!(
            demux.demultiplex(&[], &RawResponse::Json(serde_json::json!({}))),
            Err(SchemaError::Malformed { format: "response", .. })
        ));
    }
}
