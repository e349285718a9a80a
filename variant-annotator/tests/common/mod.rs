//! Shared fixtures for the upstream-backed integration tests.
#![allow(dead_code)]

use httpmock::MockServer;
use variant_annotator::cache::{Cache, MemoryCache};
use variant_annotator::fetch::{EntrezClient, EntrezConfig, EntrezService, HttpSettings};

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn memory_cache() -> Cache {
    Cache::new(MemoryCache::new(1_000))
}

pub fn entrez_client(server: &MockServer, service: EntrezService) -> EntrezClient {
    let config = EntrezConfig::new("someone@example.org").with_base_url(server.url(""));
    EntrezClient::new(config, service, &HttpSettings::default()).unwrap()
}

pub fn variation_report(id: &str, rs: &str) -> String {
    format!(
        r#"<VariationReport VariationID="{id}" VariationName="variant {id}" VariationType="Simple">
             <GeneList GeneCount="1"><Gene GeneID="672" Symbol="BRCA1"/></GeneList>
             <Allele AlleleID="{id}0">
               <Name>variant {id}</Name>
               <VariantType>single nucleotide variant</VariantType>
               <SequenceLocation Assembly="GRCh37" Chr="17" start="41197708" stop="41197708" referenceAllele="C" alternateAllele="T"/>
               <XRefList><XRef DB="dbSNP" Type="rs" ID="{rs}"/></XRefList>
             </Allele>
             <ObservationList>
               <Observation VariationID="{id}" ObservationType="primary">
                 <ReviewStatus>criteria provided, single submitter</ReviewStatus>
                 <ClinicalSignificance><Description>Pathogenic</Description></ClinicalSignificance>
                 <PhenotypeList><Phenotype Name="Breast-ovarian cancer, familial 1"/></PhenotypeList>
               </Observation>
             </ObservationList>
           </VariationReport>"#
    )
}

pub fn pubmed_article(pmid: &str, title: &str) -> String {
    format!(
        r#"<PubmedArticle>
             <MedlineCitation Status="MEDLINE">
               <PMID Version="1">{pmid}</PMID>
               <Article>
                 <Journal><Title>Some journal</Title></Journal>
                 <ArticleTitle>{title}</ArticleTitle>
               </Article>
             </MedlineCitation>
           </PubmedArticle>"#
    )
}
