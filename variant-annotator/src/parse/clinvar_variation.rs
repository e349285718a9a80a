use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{int_attr, parse_float, xml_root, FragmentParser};
use crate::demux::Fragment;
use crate::error::SchemaError;
use crate::record::{insert_opt, split_unique, Record};
use crate::xml::Element;

const VARIATION_URL: &str = "https://www.ncbi.nlm.nih.gov/clinvar/variation";
const CLINSIG_DELIMITERS: [char; 2] = ['/', ','];

/// Parses one `<VariationReport>` (efetch `rettype=variation`).
///
/// When the variation has exactly one allele, that allele's fields are also copied to the top
/// level; otherwise `genomic_allele` is `null`. Haplotypes get a `dbsnp_ids` list gathered from
/// their alleles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinvarVariationParser;

impl FragmentParser for ClinvarVariationParser {
    fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError> {
        let root = xml_root(fragment)?;
        let report = if root.name == "VariationReport" {
            &root
        } else {
            root.select_exactly_one("VariationReport")?
        };
        parse_report(report).map(Value::Object)
    }
}

fn parse_report(report: &Element) -> Result<Record, SchemaError> {
    let mut info = Record::new();

    let variation_id = report.required_attr("VariationID")?;
    info.insert("variation_id".into(), json!(variation_id));
    info.insert("url".into(), json!(format!("{VARIATION_URL}/{variation_id}")));

    let variation_name = report.required_attr("VariationName")?;
    info.insert("variation_name".into(), json!(variation_name));
    if variation_name != "Multiple Alleles" {
        insert_opt(&mut info, "variation_type", report.attr("VariationType"));
    }

    let genes = genes(report);
    let has_genes = !genes.is_empty();
    info.insert("genes".into(), Value::Array(genes));
    if has_genes {
        insert_opt(&mut info, "gene_symbol", single_gene_symbol(report));
    }

    let assertions = clinical_assertions(report)?;
    let submitters = json!(submitters(&assertions));
    let clinical_summary = clinical_summary(&assertions);
    let associated_phenotypes = json!(associated_phenotypes(&assertions));
    info.insert(
        "clinical_assertions".into(),
        Value::Array(assertions.into_iter().map(Value::Object).collect()),
    );
    info.insert("submitters".into(), submitters);
    info.insert("clinical_summary".into(), Value::Object(clinical_summary));

    let observation = observation(report, variation_id)?;
    let clinical_significances = observation.get("clinical_significances").cloned();
    info.insert("observation".into(), Value::Object(observation));
    insert_opt(&mut info, "clinical_significances", clinical_significances);
    info.insert("associated_phenotypes".into(), associated_phenotypes);

    let alleles: Vec<Value> = report
        .select("Allele")
        .into_iter()
        .map(|element| allele(element).map(Value::Object))
        .collect::<Result<_, SchemaError>>()?;
    info.insert("alleles".into(), Value::Array(alleles.clone()));

    if let [Value::Object(only)] = alleles.as_slice() {
        for (key, value) in only {
            info.insert(key.clone(), value.clone());
        }
    } else {
        info.insert("genomic_allele".into(), Value::Null);
    }

    if info.get("variation_type").and_then(Value::as_str) == Some("Haplotype") {
        let dbsnp_ids: Vec<&Value> = alleles
            .iter()
            .filter_map(|allele| allele.get("dbsnp_id"))
            .filter(|id| id.as_str().is_some_and(|s| !s.is_empty()))
            .collect();
        info.insert("dbsnp_ids".into(), json!(dbsnp_ids));
    }

    Ok(info)
}

fn genes(report: &Element) -> Vec<Value> {
    report
        .select("GeneList > Gene")
        .into_iter()
        .map(|gene| {
            let mut info = Record::new();
            insert_opt(&mut info, "symbol", gene.attr("Symbol"));
            insert_opt(&mut info, "full_name", gene.attr("FullName"));
            insert_opt(&mut info, "strand", gene.attr("strand"));
            insert_opt(&mut info, "entrez_id", gene.attr("GeneID"));
            insert_opt(
                &mut info,
                "hgnc_id",
                gene.attr("HGNCID")
                    .filter(|id| !id.is_empty())
                    .map(|id| id.replace("HGNC:", "")),
            );
            insert_opt(&mut info, "omim_id", gene.select_one("OMIM").map(|e| e.text.as_str()));
            Value::Object(info)
        })
        .collect()
}

fn single_gene_symbol(report: &Element) -> Option<&str> {
    let gene_list = report.select_one("GeneList")?;
    if gene_list.attr("GeneCount") != Some("1") {
        return None;
    }
    gene_list.select_one("Gene")?.attr("Symbol")
}

fn clinical_assertions(report: &Element) -> Result<Vec<Record>, SchemaError> {
    let selectors = [
        ("germline", "ClinicalAssertionList > GermlineList > Germline"),
        ("somatic", "ClinicalAssertionList > SomaticList > Somatic"),
    ];

    let mut assertions = Vec::new();
    for (assertion_type, selector) in selectors {
        for element in report.select(selector) {
            let mut info = clinical_assertion(element)?;
            info.insert("type".into(), json!(assertion_type));
            assertions.push(info);
        }
    }
    Ok(assertions)
}

fn description(clinsig: &Element) -> Result<&str, SchemaError> {
    clinsig
        .select_one("Description")
        .map(|e| e.text.as_str())
        .ok_or_else(|| SchemaError::missing("ClinicalSignificance > Description"))
}

fn clinical_assertion(assertion: &Element) -> Result<Record, SchemaError> {
    let mut info = Record::new();
    info.insert("submitter_name".into(), json!(assertion.required_attr("SubmitterName")?));
    info.insert(
        "date_last_submitted".into(),
        json!(assertion.required_attr("DateLastSubmitted")?),
    );

    let clinsig = assertion.select_exactly_one("ClinicalSignificance")?;
    let description = description(clinsig)?;
    info.insert(
        "clinical_significances".into(),
        json!(split_unique(description, &CLINSIG_DELIMITERS)),
    );

    let citations = clinsig
        .select("Citation")
        .into_iter()
        .map(citation)
        .collect::<Result<Vec<Value>, SchemaError>>()?;
    let comments = clinsig
        .select("Comment")
        .into_iter()
        .map(comment)
        .collect::<Result<Vec<Value>, SchemaError>>()?;
    info.insert(
        "clinical_significance_detail".into(),
        json!({
            "description": description,
            "citations": citations,
            "method": clinsig.select_exactly_one("Method")?.text,
            "comments": comments,
        }),
    );

    let phenotype_lists = assertion.select("PhenotypeList");
    if !phenotype_lists.is_empty() {
        if phenotype_lists.len() > 1 {
            return Err(SchemaError::exactly_one("PhenotypeList", phenotype_lists.len()));
        }
        info.insert("phenotypes".into(), phenotypes(phenotype_lists[0])?);
    }

    Ok(info)
}

fn citation(citation: &Element) -> Result<Value, SchemaError> {
    let mut info = Record::new();
    info.insert("type".into(), json!(citation.required_attr("Type")?));
    for id in citation.select("ID") {
        let source = match id.required_attr("Source")? {
            "PubMed" => "pmid",
            other => other,
        };
        info.insert(source.to_string(), json!(id.text));
    }
    Ok(Value::Object(info))
}

fn comment(comment: &Element) -> Result<Value, SchemaError> {
    Ok(json!({
        "data_source": comment.required_attr("DataSource")?,
        "type": comment.required_attr("Type")?,
        "text": comment.text.trim(),
    }))
}

fn phenotypes(phenotype_list: &Element) -> Result<Value, SchemaError> {
    let mut phenos = Vec::new();
    for pheno in phenotype_list.select("Phenotype") {
        let mut info = Record::new();
        info.insert("name".into(), json!(pheno.required_attr("Name")?));
        insert_opt(
            &mut info,
            "omim_id",
            pheno
                .select_one("XRefList > XRef[DB=OMIM]")
                .and_then(|omim| omim.attr("ID")),
        );
        phenos.push(Value::Object(info));
    }
    Ok(Value::Array(phenos))
}

fn observation(report: &Element, variation_id: &str) -> Result<Record, SchemaError> {
    let selector = format!("ObservationList > Observation[VariationID={variation_id}]");
    let observation = report.select_exactly_one(&selector)?;

    let mut info = Record::new();
    info.insert("variation_id".into(), json!(variation_id));
    info.insert("type".into(), json!(observation.required_attr("ObservationType")?));
    info.insert(
        "review_status".into(),
        json!(observation.select_exactly_one("ReviewStatus")?.text),
    );

    let clinsig = observation.select_exactly_one("ClinicalSignificance")?;
    info.insert(
        "clinical_significances".into(),
        json!(split_unique(description(clinsig)?, &CLINSIG_DELIMITERS)),
    );
    insert_opt(&mut info, "date_last_evaluated", clinsig.attr("DateLastEvaluated"));
    info.insert(
        "phenotypes".into(),
        phenotypes(observation.select_exactly_one("PhenotypeList")?)?,
    );
    Ok(info)
}

fn submitters(assertions: &[Record]) -> Vec<&str> {
    assertions
        .iter()
        .filter_map(|a| a.get("submitter_name").and_then(Value::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Count of each clinical significance across assertions, in first-seen order.
fn clinical_summary(assertions: &[Record]) -> Record {
    let mut summary = Record::new();
    for sig in assertions
        .iter()
        .filter_map(|a| a.get("clinical_significances").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
    {
        let count = summary.get(sig).and_then(Value::as_u64).unwrap_or(0);
        summary.insert(sig.to_string(), json!(count + 1));
    }
    summary
}

fn associated_phenotypes(assertions: &[Record]) -> Vec<&str> {
    assertions
        .iter()
        .filter_map(|a| a.get("phenotypes").and_then(Value::as_array))
        .flatten()
        .filter_map(|p| p.get("name").and_then(Value::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn allele(allele: &Element) -> Result<Record, SchemaError> {
    let mut info = Record::new();

    info.insert("allele_id".into(), json!(allele.required_attr("AlleleID")?));
    let required_text = |name: &str| {
        allele
            .select_one(name)
            .map(|e| e.text.clone())
            .ok_or_else(|| SchemaError::missing(format!("Allele > {name}")))
    };
    info.insert("name".into(), json!(required_text("Name")?));
    info.insert("variant_type".into(), json!(required_text("VariantType")?));

    sequence_locations(allele, &mut info)?;
    hgvs(allele, &mut info)?;
    xrefs(allele, &mut info);

    let mut consequences = Vec::new();
    let mut functions = BTreeSet::new();
    for consequence in allele.select("MolecularConsequence") {
        let function = consequence.required_attr("Function")?;
        functions.insert(function.to_string());
        consequences.push(json!({
            "hgvs": consequence.required_attr("HGVS")?,
            "function": function,
        }));
    }
    info.insert("consequences".into(), Value::Array(consequences));
    info.insert("frequencies".into(), Value::Object(frequencies(allele)?));
    info.insert("consequences_functions".into(), json!(functions));

    Ok(info)
}

fn sequence_locations(allele: &Element, info: &mut Record) -> Result<(), SchemaError> {
    let mut alts = BTreeSet::new();
    for (assembly, suffix) in [("GRCh37", "g37"), ("GRCh38", "g38")] {
        let Some(location) = allele.select_one(&format!("SequenceLocation[Assembly={assembly}]"))
        else {
            continue;
        };

        // Copy number variants carry innerStart/innerStop instead of start/stop.
        let start = match int_attr(location, "start")? {
            Some(start) => Some(start),
            None => int_attr(location, "innerStart")?,
        };
        let stop = match int_attr(location, "stop")? {
            Some(stop) => Some(stop),
            None => int_attr(location, "innerStop")?,
        };
        insert_opt(info, &format!("start_{suffix}"), start);
        insert_opt(info, &format!("stop_{suffix}"), stop);
        insert_opt(info, &format!("accession_{suffix}"), location.attr("Accession"));
        insert_opt(info, &format!("length_{suffix}"), int_attr(location, "variantLength")?);
        insert_opt(info, &format!("ref_{suffix}"), location.attr("referenceAllele"));
        insert_opt(info, &format!("alt_{suffix}"), location.attr("alternateAllele"));
        insert_opt(info, &format!("chrom_{suffix}"), location.attr("Chr"));

        if let Some(alt) = location.attr("alternateAllele").filter(|a| !a.is_empty()) {
            alts.insert(alt.to_string());
        }
    }

    let genomic_allele = match alts.len() {
        1 => alts.into_iter().next().map_or(Value::Null, Value::String),
        _ => Value::Null,
    };
    info.insert("genomic_allele".into(), genomic_allele);
    Ok(())
}

fn hgvs(allele: &Element, info: &mut Record) -> Result<(), SchemaError> {
    let lists = allele.select("HGVSlist");
    let list = match lists.as_slice() {
        [] => return Ok(()),
        [list] => *list,
        _ => return Err(SchemaError::exactly_one("HGVSlist", lists.len())),
    };

    for (assembly, suffix) in [("GRCh37", "g37"), ("GRCh38", "g38")] {
        if let Some(genomic) = list.select_one(&format!("HGVS[Assembly={assembly}]")) {
            let key = format!("genomic_change_{suffix}");
            insert_opt(info, &key, genomic.attr("Change"));
            insert_opt(info, &format!("{key}_accession"), genomic.attr("AccessionVersion"));
            info.insert(format!("{key}_name"), json!(genomic.text));
        }
    }

    for (kind, key) in [
        ("HGVS, coding, RefSeq", "coding_changes"),
        ("HGVS, protein, RefSeq", "protein_changes"),
    ] {
        let changes: Vec<&str> = list
            .find_all("HGVS", &[("Type", kind)])
            .into_iter()
            .map(|e| e.text.as_str())
            .collect();
        if !changes.is_empty() {
            info.insert(key.into(), json!(changes));
        }
    }
    Ok(())
}

fn xrefs(allele: &Element, info: &mut Record) {
    insert_opt(
        info,
        "dbsnp_id",
        allele
            .find("XRef", &[("DB", "dbSNP"), ("Type", "rs")])
            .and_then(|x| x.attr("ID"))
            .map(|id| format!("rs{id}")),
    );
    insert_opt(
        info,
        "omim_id",
        allele.find("XRef", &[("DB", "OMIM")]).and_then(|x| x.attr("ID")),
    );
    insert_opt(
        info,
        "uniprot_id",
        allele.find("XRef", &[("DB", "UniProtKB")]).and_then(|x| x.attr("ID")),
    );
}

/// `{minor allele: {source: frequency}}`; frequencies without a minor allele are skipped.
fn frequencies(allele: &Element) -> Result<Record, SchemaError> {
    let mut per_allele = Record::new();
    for frequency in allele.select("AlleleFrequency") {
        let Some(minor) = frequency.attr("MinorAllele").filter(|a| !a.is_empty()) else {
            continue;
        };
        let source = frequency.required_attr("Type")?;
        let value = parse_float("AlleleFrequency@Value", frequency.required_attr("Value")?)?;
        let entry = per_allele
            .entry(minor.to_string())
            .or_insert_with(|| Value::Object(Record::new()));
        if let Value::Object(sources) = entry {
            sources.insert(source.to_string(), json!(value));
        }
    }
    Ok(per_allele)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"
    <VariationReport VariationID="12375" VariationName="NM_000059.3(BRCA2):c.68-7T&gt;A" VariationType="Simple">
      <GeneList GeneCount="1">
        <Gene GeneID="675" Symbol="BRCA2" FullName="BRCA2, DNA repair associated" strand="+" HGNCID="HGNC:1101">
          <OMIM>600185</OMIM>
        </Gene>
      </GeneList>
      <Allele AlleleID="27414">
        <Name>NM_000059.3(BRCA2):c.68-7T&gt;A</Name>
        <VariantType>single nucleotide variant</VariantType>
        <SequenceLocation Assembly="GRCh37" Chr="13" Accession="NC_000013.10" start="32900617" stop="32900617" variantLength="1" referenceAllele="T" alternateAllele="A"/>
        <SequenceLocation Assembly="GRCh38" Chr="13" Accession="NC_000013.11" start="32326480" stop="32326480" variantLength="1" referenceAllele="T" alternateAllele="A"/>
        <HGVSlist>
          <HGVS Assembly="GRCh37" Change="g.32900617T&gt;A" AccessionVersion="NC_000013.10" Type="HGVS, genomic, top level, previous">NC_000013.10:g.32900617T&gt;A</HGVS>
          <HGVS Assembly="GRCh38" Change="g.32326480T&gt;A" AccessionVersion="NC_000013.11" Type="HGVS, genomic, top level">NC_000013.11:g.32326480T&gt;A</HGVS>
          <HGVS Type="HGVS, coding, RefSeq">NM_000059.3:c.68-7T&gt;A</HGVS>
        </HGVSlist>
        <XRefList>
          <XRef DB="dbSNP" Type="rs" ID="81002836"/>
          <XRef DB="OMIM" ID="600185.0001"/>
        </XRefList>
        <MolecularConsequenceList>
          <MolecularConsequence HGVS="NM_000059.3:c.68-7T&gt;A" Function="intron variant"/>
        </MolecularConsequenceList>
        <AlleleFrequencyList>
          <AlleleFrequency Type="ExAC" Value="0.01979" MinorAllele="A"/>
          <AlleleFrequency Type="GO-ESP" Value="0.02" MinorAllele="A"/>
          <AlleleFrequency Type="Unknown" Value="0.5"/>
        </AlleleFrequencyList>
      </Allele>
      <ClinicalAssertionList>
        <GermlineList>
          <Germline SubmitterName="Lab B" DateLastSubmitted="2016-01-01">
            <ClinicalSignificance>
              <Description>Benign/Likely benign, risk factor</Description>
              <Method>clinical testing</Method>
              <Citation Type="general"><ID Source="PubMed">123</ID></Citation>
              <Comment DataSource="submitter" Type="public"> A comment. </Comment>
            </ClinicalSignificance>
            <PhenotypeList>
              <Phenotype Name="Breast cancer"><XRefList><XRef DB="OMIM" ID="114480"/></XRefList></Phenotype>
            </PhenotypeList>
          </Germline>
          <Germline SubmitterName="Lab A" DateLastSubmitted="2017-02-02">
            <ClinicalSignificance>
              <Description>Benign</Description>
              <Method>literature only</Method>
            </ClinicalSignificance>
          </Germline>
        </GermlineList>
      </ClinicalAssertionList>
      <ObservationList>
        <Observation VariationID="12375" ObservationType="primary">
          <ReviewStatus>criteria provided, multiple submitters</ReviewStatus>
          <ClinicalSignificance DateLastEvaluated="2017-01-01">
            <Description>Benign/Likely benign</Description>
          </ClinicalSignificance>
          <PhenotypeList><Phenotype Name="not specified"/></PhenotypeList>
        </Observation>
      </ObservationList>
    </VariationReport>"#;

    fn parse(xml: &str) -> Result<Value, SchemaError> {
        ClinvarVariationParser.parse(&Fragment::Xml(xml.to_string()))
    }

    #[test]
    fn test_parse_variation_report() {
        let info = parse(REPORT).unwrap();

        assert_eq!(info["variation_id"], "12375");
        assert_eq!(info["url"], "https://www.ncbi.nlm.nih.gov/clinvar/variation/12375");
        assert_eq!(info["variation_type"], "Simple");
        assert_eq!(info["gene_symbol"], "BRCA2");
        assert_eq!(info["genes"][0]["hgnc_id"], "1101");
        assert_eq!(info["genes"][0]["omim_id"], "600185");

        assert_eq!(info["submitters"], json!(["Lab A", "Lab B"]));
        assert_eq!(
            info["clinical_summary"],
            json!({"Benign": 2, "Likely benign": 1, "risk factor": 1})
        );
        assert_eq!(info["associated_phenotypes"], json!(["Breast cancer"]));

        let first = &info["clinical_assertions"][0];
        assert_eq!(first["type"], "germline");
        assert_eq!(
            first["clinical_significances"],
            json!(["Benign", "Likely benign", "risk factor"])
        );
        assert_eq!(
            first["clinical_significance_detail"]["citations"],
            json!([{"type": "general", "pmid": "123"}])
        );
        assert_eq!(first["clinical_significance_detail"]["comments"][0]["text"], "A comment.");
        assert_eq!(first["phenotypes"], json!([{"name": "Breast cancer", "omim_id": "114480"}]));
        assert!(info["clinical_assertions"][1].get("phenotypes").is_none());

        assert_eq!(info["observation"]["review_status"], "criteria provided, multiple submitters");
        assert_eq!(info["observation"]["date_last_evaluated"], "2017-01-01");
        assert_eq!(info["clinical_significances"], json!(["Benign", "Likely benign"]));
    }

    #[test]
    fn test_report_keys_come_in_record_order() {
        let info = parse(REPORT).unwrap();
        let keys: Vec<&str> = info
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .take_while(|key| *key != "alleles")
            .collect();
        assert_eq!(
            keys,
            vec![
                "variation_id",
                "url",
                "variation_name",
                "variation_type",
                "genes",
                "gene_symbol",
                "clinical_assertions",
                "submitters",
                "clinical_summary",
                "observation",
                "clinical_significances",
                "associated_phenotypes",
            ]
        );
    }

    #[test]
    fn test_single_allele_is_hoisted() {
        let info = parse(REPORT).unwrap();
        let allele = &info["alleles"][0];

        assert_eq!(allele["start_g37"], 32900617);
        assert_eq!(allele["stop_g38"], 32326480);
        assert_eq!(allele["length_g37"], 1);
        assert_eq!(allele["genomic_allele"], "A");
        assert_eq!(allele["dbsnp_id"], "rs81002836");
        assert_eq!(allele["coding_changes"], json!(["NM_000059.3:c.68-7T>A"]));
        assert_eq!(allele["genomic_change_g38"], "g.32326480T>A");
        assert_eq!(allele["consequences_functions"], json!(["intron variant"]));
        assert_eq!(allele["frequencies"], json!({"A": {"ExAC": 0.01979, "GO-ESP": 0.02}}));

        assert_eq!(info["start_g37"], 32900617);
        assert_eq!(info["genomic_allele"], "A");
        assert_eq!(info["dbsnp_id"], "rs81002836");
        assert!(info.get("dbsnp_ids").is_none());
    }

    #[test]
    fn test_haplotype_collects_dbsnp_ids() {
        let second_allele = r#"<Allele AlleleID="2"><Name>b</Name><VariantType>snv</VariantType>
            <SequenceLocation Assembly="GRCh37" start="1" stop="1" alternateAllele="G"/>
            <XRefList><XRef DB="dbSNP" Type="rs" ID="999"/></XRefList></Allele>
            <ClinicalAssertionList>"#;
        let third_allele = r#"<Allele AlleleID="3"><Name>c</Name><VariantType>snv</VariantType></Allele>
            <ClinicalAssertionList>"#;
        let xml = REPORT
            .replace(r#"VariationType="Simple""#, r#"VariationType="Haplotype""#)
            .replacen("<ClinicalAssertionList>", second_allele, 1)
            .replacen("<ClinicalAssertionList>", third_allele, 1);

        let info = parse(&xml).unwrap();
        assert_eq!(info["alleles"].as_array().unwrap().len(), 3);
        assert_eq!(info["genomic_allele"], Value::Null);
        assert!(info.get("start_g37").is_none());
        assert_eq!(info["dbsnp_ids"], json!(["rs81002836", "rs999"]));
    }

    #[test]
    fn test_cardinality_violations() {
        let xml = REPORT.replace(
            "<Method>literature only</Method>",
            "<Method>literature only</Method><Method>again</Method>",
        );
        assert_eq!(parse(&xml).unwrap_err(), SchemaError::exactly_one("Method", 2));

        let xml = REPORT.replace(r#"<Observation VariationID="12375""#, r#"<Observation VariationID="1""#);
        assert!(matches!(
            parse(&xml).unwrap_err(),
            SchemaError::Cardinality { found: 0, .. }
        ));
    }

    #[test]
    fn test_non_integer_coordinate_fails() {
        let xml = REPORT.replace(r#"start="32900617""#, r#"start="abc""#);
        assert_eq!(
            parse(&xml).unwrap_err(),
            SchemaError::InvalidValue {
                field: "start".to_string(),
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_multiple_alleles_name_skips_type() {
        let xml = REPORT.replace(
            r#"VariationName="NM_000059.3(BRCA2):c.68-7T&gt;A""#,
            r#"VariationName="Multiple Alleles""#,
        );
        let info = parse(&xml).unwrap();
        assert!(info.get("variation_type").is_none());
    }
}
