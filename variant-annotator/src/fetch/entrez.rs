use async_trait::async_trait;
use tracing::info;
use url::Url;

use super::{check_status, Batch, HttpSettings, RawResponse, Session, Upstream};
use crate::error::FetchError;
use crate::xml::Element;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_TOOL: &str = "variant-annotator";

/// Credentials NCBI requires on every E-utilities call. NCBI contacts the email address before
/// blocking a client, so it is mandatory and checked once, up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrezConfig {
    pub email: String,
    pub api_key: Option<String>,
    pub tool: String,
    pub base_url: String,
}

impl EntrezConfig {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            api_key: None,
            tool: DEFAULT_TOOL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(FetchError::Config(
                "an email address is required for Entrez (set ENTREZ_EMAIL)".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(FetchError::Config(format!(
                "{email:?} does not look like an email address"
            )));
        }
        if self.tool.trim().is_empty() {
            return Err(FetchError::Config("Entrez tool name is empty".to_string()));
        }
        Url::parse(&self.base_url)
            .map_err(|e| FetchError::Config(format!("invalid Entrez base url {}: {e}", self.base_url)))?;
        Ok(())
    }

    fn endpoint(&self, utility: &str) -> String {
        format!("{}/{}.fcgi", self.base_url.trim_end_matches('/'), utility)
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("email", self.email.clone()), ("tool", self.tool.clone())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }
}

/// Which E-utility answers the batches, and with what parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrezService {
    /// `efetch` with the batch's ids in the query string.
    EFetch {
        db: String,
        rettype: Option<String>,
        retmode: Option<String>,
    },
    /// `esummary` (version 2.0 document summaries).
    ESummary { db: String },
    /// `epost` every id once, then `efetch` pages of the resulting server-side history entry.
    PostThenFetch {
        db: String,
        rettype: Option<String>,
        retmode: Option<String>,
    },
}

impl EntrezService {
    pub fn efetch(db: &str, rettype: Option<&str>) -> Self {
        EntrezService::EFetch {
            db: db.to_string(),
            rettype: rettype.map(str::to_string),
            retmode: None,
        }
    }

    pub fn esummary(db: &str) -> Self {
        EntrezService::ESummary { db: db.to_string() }
    }

    pub fn post_then_fetch(db: &str, retmode: &str) -> Self {
        EntrezService::PostThenFetch {
            db: db.to_string(),
            rettype: None,
            retmode: Some(retmode.to_string()),
        }
    }

    pub fn db(&self) -> &str {
        match self {
            EntrezService::EFetch { db, .. }
            | EntrezService::ESummary { db }
            | EntrezService::PostThenFetch { db, .. } => db,
        }
    }

    /// Largest batch each utility comfortably accepts.
    pub fn default_batch_size(&self) -> usize {
        match self {
            EntrezService::EFetch { .. } => 50,
            EntrezService::ESummary { .. } => 200,
            EntrezService::PostThenFetch { .. } => 1000,
        }
    }
}

fn push_fetch_params(
    params: &mut Vec<(&'static str, String)>,
    rettype: &Option<String>,
    retmode: &Option<String>,
) {
    if let Some(rettype) = rettype {
        params.push(("rettype", rettype.clone()));
    }
    if let Some(retmode) = retmode {
        params.push(("retmode", retmode.clone()));
    }
}

/// Client for NCBI's E-utilities.
pub struct EntrezClient {
    name: String,
    config: EntrezConfig,
    service: EntrezService,
    client: reqwest::Client,
}

impl EntrezClient {
    pub fn new(
        config: EntrezConfig,
        service: EntrezService,
        http: &HttpSettings,
    ) -> Result<Self, FetchError> {
        config.validate()?;
        let client = http.build_client()?;
        Ok(Self {
            name: format!("entrez:{}", service.db()),
            config,
            service,
            client,
        })
    }

    pub fn service(&self) -> &EntrezService {
        &self.service
    }

    async fn get(&self, utility: &str, params: Vec<(&'static str, String)>) -> Result<String, FetchError> {
        let response = self
            .client
            .get(self.config.endpoint(utility))
            .query(&params)
            .send()
            .await?;
        Ok(check_status(response).await?.text().await?)
    }

    async fn post_ids(&self, db: &str, query_ids: &[String]) -> Result<Session, FetchError> {
        info!(db, ids = query_ids.len(), "posting ids to create an Entrez history entry");
        let mut params = self.config.common_params();
        params.push(("db", db.to_string()));
        params.push(("id", query_ids.join(",")));

        let response = self
            .client
            .post(self.config.endpoint("epost"))
            .form(&params)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        parse_epost_result(&body)
    }
}

fn parse_epost_result(body: &str) -> Result<Session, FetchError> {
    let root = Element::parse(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    if let Some(error) = root.child("ERROR") {
        return Err(FetchError::Malformed(format!("epost failed: {}", error.text)));
    }
    let field = |name: &str| {
        root.child(name)
            .map(|e| e.text.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FetchError::Malformed(format!("epost response has no {name}")))
    };
    Ok(Session::Job {
        query_key: field("QueryKey")?,
        web_env: field("WebEnv")?,
    })
}

#[async_trait]
impl Upstream for EntrezClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, query_ids: &[String]) -> Result<Session, FetchError> {
        match &self.service {
            EntrezService::PostThenFetch { db, .. } => self.post_ids(db, query_ids).await,
            _ => Ok(Session::Stateless),
        }
    }

    async fn fetch(&self, session: &Session, batch: &Batch) -> Result<RawResponse, FetchError> {
        let mut params = self.config.common_params();
        let body = match &self.service {
            EntrezService::EFetch {
                db,
                rettype,
                retmode,
            } => {
                params.push(("db", db.clone()));
                params.push(("id", batch.query_ids.join(",")));
                push_fetch_params(&mut params, rettype, retmode);
                self.get("efetch", params).await?
            }
            EntrezService::ESummary { db } => {
                params.push(("db", db.clone()));
                params.push(("id", batch.query_ids.join(",")));
                params.push(("version", "2.0".to_string()));
                self.get("esummary", params).await?
            }
            EntrezService::PostThenFetch {
                db,
                rettype,
                retmode,
            } => {
                let Session::Job { web_env, query_key } = session else {
                    return Err(FetchError::Malformed(
                        "paged efetch needs the history entry created by epost".to_string(),
                    ));
                };
                // Pages do not echo ids back; the batch offset is the only link between a page
                // and the ids it covers.
                params.push(("db", db.clone()));
                params.push(("WebEnv", web_env.clone()));
                params.push(("query_key", query_key.clone()));
                params.push(("retstart", batch.offset.to_string()));
                params.push(("retmax", batch.len().to_string()));
                push_fetch_params(&mut params, rettype, retmode);
                self.get("efetch", params).await?
            }
        };
        Ok(RawResponse::Xml(body))
    }
}
