use async_trait::async_trait;
use serde_json::json;
use url::Url;

use super::{check_status, Batch, HttpSettings, RawResponse, Session, Upstream};
use crate::error::FetchError;

/// Ensembl's POST endpoint accepts up to 1000 ids, but full records time out well before that.
pub const DEFAULT_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assembly {
    #[default]
    GRCh37,
    GRCh38,
}

impl Assembly {
    pub fn base_url(&self) -> &'static str {
        match self {
            Assembly::GRCh37 => "https://grch37.rest.ensembl.org",
            Assembly::GRCh38 => "https://rest.ensembl.org",
        }
    }
}

impl std::str::FromStr for Assembly {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "grch37" | "hg19" => Ok(Assembly::GRCh37),
            "grch38" | "hg38" => Ok(Assembly::GRCh38),
            _ => Err(format!("Unknown genome assembly: {s}")),
        }
    }
}

/// Client for the Ensembl REST variation endpoint. One POST per batch, answered with a json
/// object keyed by the requested ids.
pub struct EnsemblClient {
    endpoint: String,
    full_info: bool,
    client: reqwest::Client,
}

impl EnsemblClient {
    /// `full_info` also asks for population frequencies and genotypes, which are large.
    pub fn new(base_url: &str, full_info: bool, http: &HttpSettings) -> Result<Self, FetchError> {
        Url::parse(base_url)
            .map_err(|e| FetchError::Config(format!("invalid Ensembl base url {base_url}: {e}")))?;
        Ok(Self {
            endpoint: format!("{}/variation/homo_sapiens", base_url.trim_end_matches('/')),
            full_info,
            client: http.build_client()?,
        })
    }

    pub fn for_assembly(assembly: Assembly, full_info: bool, http: &HttpSettings) -> Result<Self, FetchError> {
        Self::new(assembly.base_url(), full_info, http)
    }

    fn query_params(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = vec![("phenotypes", "1")];
        if self.full_info {
            params.extend([("genotypes", "1"), ("pops", "1"), ("population_genotypes", "1")]);
        }
        params
    }
}

#[async_trait]
impl Upstream for EnsemblClient {
    fn name(&self) -> &str {
        "ensembl"
    }

    async fn fetch(&self, _session: &Session, batch: &Batch) -> Result<RawResponse, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&self.query_params())
            .header("Accept", "application/json")
            .json(&json!({ "ids": batch.query_ids }))
            .send()
            .await?;
        let body = check_status(response).await?.json().await?;
        Ok(RawResponse::Json(body))
    }
}
