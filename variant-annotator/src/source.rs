use std::fmt;

use serde_json::Value;

use crate::demux::{Demultiplexer, Fragment, JsonKeyDemux, ValueFrom, XmlElementDemux};
use crate::error::SchemaError;
use crate::fetch::ensembl::DEFAULT_BATCH_SIZE as ENSEMBL_BATCH_SIZE;
use crate::fetch::{EntrezService, Pacing, RawResponse};
use crate::parse::{
    ClinvarRcvParser, ClinvarVariationParser, EnsemblParser, FragmentParser, PubmedParser,
    TreeParser,
};

const CLINVAR_VARIATION_BATCH_SIZE: usize = 200;

/// How a caller's id is rewritten before it is sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdTransform {
    #[default]
    Identity,
    /// `rs123` -> `123`. Ids without the prefix are sent as they are.
    StripPrefix(String),
}

impl IdTransform {
    pub fn apply(&self, id: &str) -> String {
        match self {
            IdTransform::Identity => id.to_string(),
            IdTransform::StripPrefix(prefix) => id.strip_prefix(prefix.as_str()).unwrap_or(id).to_string(),
        }
    }
}

/// Per-source knobs. Every field has an explicit value; nothing is inferred at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    /// Also the cache namespace.
    pub name: String,
    pub batch_size: usize,
    pub pacing: Pacing,
    pub id_transform: IdTransform,
}

impl SourceSpec {
    pub fn new(name: &str, batch_size: usize) -> Self {
        Self {
            name: name.to_string(),
            batch_size,
            pacing: Pacing::none(),
            id_transform: IdTransform::Identity,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_id_transform(mut self, id_transform: IdTransform) -> Self {
        self.id_transform = id_transform;
        self
    }
}

/// A data source: its knobs, how its batch responses split into fragments, and how one
/// fragment becomes a record.
pub struct Source {
    pub spec: SourceSpec,
    demux: Box<dyn Demultiplexer>,
    parser: Box<dyn FragmentParser>,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("spec", &self.spec).finish()
    }
}

impl Source {
    pub fn new(
        spec: SourceSpec,
        demux: impl Demultiplexer + 'static,
        parser: impl FragmentParser + 'static,
    ) -> Self {
        Self {
            spec,
            demux: Box::new(demux),
            parser: Box::new(parser),
        }
    }

    /// Replaces the pause between batches, e.g. with one read from configuration.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.spec = self.spec.with_pacing(pacing);
        self
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn demultiplex(
        &self,
        requested: &[String],
        raw: &RawResponse,
    ) -> Result<Vec<(String, Fragment)>, SchemaError> {
        self.demux.demultiplex(requested, raw)
    }

    pub fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError> {
        self.parser.parse(fragment)
    }
}

/// Which kind of client a built-in source needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamKind {
    Entrez(EntrezService),
    Ensembl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BuiltinSource {
    /// ClinVar RCV accessions, as ClinVarSet documents.
    ClinvarRcv,
    /// ClinVar variation ids, as variation reports.
    ClinvarVariation,
    /// dbSNP rs ids, as esummary document summaries.
    DbsnpSummary,
    /// Entrez gene ids, as esummary document summaries.
    GeneSummary,
    /// PubMed ids, posted once and fetched by page.
    Pubmed,
    /// rs ids against the Ensembl variation endpoint.
    Ensembl,
}

impl BuiltinSource {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinSource::ClinvarRcv => "clinvar_rcv",
            BuiltinSource::ClinvarVariation => "clinvar_variation",
            BuiltinSource::DbsnpSummary => "dbsnp_summary",
            BuiltinSource::GeneSummary => "gene_summary",
            BuiltinSource::Pubmed => "pubmed",
            BuiltinSource::Ensembl => "ensembl",
        }
    }

    pub fn upstream_kind(&self) -> UpstreamKind {
        match self {
            BuiltinSource::ClinvarRcv => {
                UpstreamKind::Entrez(EntrezService::efetch("clinvar", Some("clinvarset")))
            }
            BuiltinSource::ClinvarVariation => {
                UpstreamKind::Entrez(EntrezService::efetch("clinvar", Some("variation")))
            }
            BuiltinSource::DbsnpSummary => UpstreamKind::Entrez(EntrezService::esummary("snp")),
            BuiltinSource::GeneSummary => UpstreamKind::Entrez(EntrezService::esummary("gene")),
            BuiltinSource::Pubmed => {
                UpstreamKind::Entrez(EntrezService::post_then_fetch("pubmed", "xml"))
            }
            BuiltinSource::Ensembl => UpstreamKind::Ensembl,
        }
    }

    /// Ids per upstream request. Variation reports are small enough to ask for more than the
    /// efetch default.
    pub fn batch_size(&self) -> usize {
        match (self, self.upstream_kind()) {
            (BuiltinSource::ClinvarVariation, _) => CLINVAR_VARIATION_BATCH_SIZE,
            (_, UpstreamKind::Entrez(service)) => service.default_batch_size(),
            (_, UpstreamKind::Ensembl) => ENSEMBL_BATCH_SIZE,
        }
    }

    /// `full_info` only matters for Ensembl, whose population tables are dropped without it.
    pub fn source(&self, full_info: bool) -> Source {
        let spec = SourceSpec::new(self.name(), self.batch_size());

        match self {
            BuiltinSource::ClinvarRcv => Source::new(
                spec,
                XmlElementDemux::by_unique_descendant(
                    "ClinVarSet",
                    "ReferenceClinVarAssertion > ClinVarAccession[Type=RCV]",
                    ValueFrom::Attribute("Acc".to_string()),
                ),
                ClinvarRcvParser,
            ),
            BuiltinSource::ClinvarVariation => Source::new(
                spec,
                XmlElementDemux::by_attribute("VariationReport", "VariationID"),
                ClinvarVariationParser,
            ),
            BuiltinSource::DbsnpSummary => Source::new(
                spec.with_id_transform(IdTransform::StripPrefix("rs".to_string())),
                XmlElementDemux::by_attribute("DocumentSummary", "uid"),
                TreeParser::with_list_elements(&["GENES", "GLOBAL_MAFS"]),
            ),
            BuiltinSource::GeneSummary => Source::new(
                spec,
                XmlElementDemux::by_attribute("DocumentSummary", "uid"),
                TreeParser::with_list_elements(&["Mim", "GenomicInfo", "LocationHist"]),
            ),
            BuiltinSource::Pubmed => Source::new(
                spec,
                XmlElementDemux::by_unique_descendant(
                    "PubmedArticle",
                    "MedlineCitation > PMID",
                    ValueFrom::Text,
                ),
                PubmedParser,
            ),
            BuiltinSource::Ensembl => Source::new(spec, JsonKeyDemux, EnsemblParser::new(full_info)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_transform() {
        let strip = IdTransform::StripPrefix("rs".to_string());
        assert_eq!(strip.apply("rs268"), "268");
        assert_eq!(strip.apply("268"), "268");
        assert_eq!(IdTransform::default().apply("rs268"), "rs268");
    }

    #[test]
    fn test_builtin_batch_sizes_and_names() {
        assert_eq!(BuiltinSource::ClinvarRcv.source(false).spec.batch_size, 50);
        assert_eq!(BuiltinSource::ClinvarVariation.source(false).spec.batch_size, 200);
        assert_eq!(BuiltinSource::GeneSummary.source(false).spec.batch_size, 200);
        assert_eq!(BuiltinSource::DbsnpSummary.source(false).spec.batch_size, 200);
        assert_eq!(BuiltinSource::Pubmed.source(false).spec.batch_size, 1000);
        assert_eq!(BuiltinSource::Ensembl.source(false).spec.batch_size, 25);
        assert_eq!(BuiltinSource::GeneSummary.source(false).name(), "gene_summary");
        assert_eq!(BuiltinSource::Ensembl.upstream_kind(), UpstreamKind::Ensembl);
    }

    #[test]
    fn test_dbsnp_summary_end_to_end_on_one_response() {
        let source = BuiltinSource::DbsnpSummary.source(false);
        assert_eq!(source.spec.id_transform.apply("rs6311"), "6311");

        let raw = RawResponse::Xml(
            r#"<eSummaryResult><DocumentSummarySet status="OK">
                 <DocumentSummary uid="6311"><SNP_ID>6311</SNP_ID><CLINICAL_SIGNIFICANCE>benign</CLINICAL_SIGNIFICANCE></DocumentSummary>
               </DocumentSummarySet></eSummaryResult>"#
                .to_string(),
        );
        let pairs = source.demultiplex(&["6311".to_string()], &raw).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(
            source.parse(&pairs[0].1).unwrap(),
            json!({"uid": "6311", "SNP_ID": "6311", "CLINICAL_SIGNIFICANCE": "benign"})
        );
    }

    #[test]
    fn test_gene_summary_mim_is_always_a_list() {
        let source = BuiltinSource::GeneSummary.source(false);
        let raw = RawResponse::Xml(
            r#"<eSummaryResult><DocumentSummarySet status="OK">
                 <DocumentSummary uid="672"><Name>BRCA1</Name><Mim><int>113705</int></Mim></DocumentSummary>
               </DocumentSummarySet></eSummaryResult>"#
                .to_string(),
        );
        let pairs = source.demultiplex(&["672".to_string()], &raw).unwrap();
        let record = source.parse(&pairs[0].1).unwrap();
        assert_eq!(record["Mim"], json!(["113705"]));
    }
}
