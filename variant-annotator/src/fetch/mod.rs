use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{BatchContext, FetchError};

pub mod backoff;
pub mod ensembl;
pub mod entrez;
pub mod pacing;

pub use backoff::{BackoffPolicy, Retrying};
pub use ensembl::{Assembly, EnsemblClient};
pub use entrez::{EntrezClient, EntrezConfig, EntrezService};
pub use pacing::Pacing;

/// The untouched payload of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Xml(String),
    Json(Value),
    Text(String),
}

/// Server-side state shared by every batch of one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Stateless,
    /// A submitted id list living on the server, paged through by offset.
    Job { web_env: String, query_key: String },
}

/// One upstream request's worth of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    /// Identifiers as the caller gave them; these are the cache keys.
    pub ids: Vec<String>,
    /// The same identifiers as sent upstream, position for position.
    pub query_ids: Vec<String>,
    /// Position of the first id of this batch in the whole fetch.
    pub offset: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn context(&self) -> BatchContext {
        BatchContext {
            index: self.index,
            size: self.ids.len(),
            first_id: self.ids.first().cloned(),
        }
    }
}

/// A remote service that answers many identifiers per call.
#[async_trait]
pub trait Upstream: Send + Sync {
    fn name(&self) -> &str;

    /// Called once before the first batch with every query id of the fetch. Two-phase services
    /// submit the ids here and return the job handle the batches page through.
    async fn prepare(&self, _query_ids: &[String]) -> Result<Session, FetchError> {
        Ok(Session::Stateless)
    }

    async fn fetch(&self, session: &Session, batch: &Batch) -> Result<RawResponse, FetchError>;
}

#[async_trait]
impl<U: Upstream + ?Sized> Upstream for std::sync::Arc<U> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn prepare(&self, query_ids: &[String]) -> Result<Session, FetchError> {
        (**self).prepare(query_ids).await
    }

    async fn fetch(&self, session: &Session, batch: &Batch) -> Result<RawResponse, FetchError> {
        (**self).fetch(session, batch).await
    }
}

#[async_trait]
impl<U: Upstream + ?Sized> Upstream for Box<U> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn prepare(&self, query_ids: &[String]) -> Result<Session, FetchError> {
        (**self).prepare(query_ids).await
    }

    async fn fetch(&self, session: &Session, batch: &Batch) -> Result<RawResponse, FetchError> {
        (**self).fetch(session, batch).await
    }
}

#[derive(Debug)]
pub struct FetchedBatch {
    pub batch: Batch,
    pub raw: RawResponse,
}

#[derive(Debug)]
pub struct FailedBatch {
    pub batch: BatchContext,
    pub error: FetchError,
}

/// Outbound route for upstream requests. Going direct is an explicit choice, not a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxySetting {
    #[default]
    Direct,
    Via(String),
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub proxy: ProxySetting,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            proxy: ProxySetting::Direct,
        }
    }
}

impl HttpSettings {
    pub fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("variant-annotator/", env!("CARGO_PKG_VERSION")));
        match &self.proxy {
            ProxySetting::Direct => {
                builder = builder.no_proxy();
            }
            ProxySetting::Via(url) => {
                info!(proxy = url.as_str(), "routing upstream requests through proxy");
                let proxy = reqwest::Proxy::all(url.as_str())
                    .map_err(|e| FetchError::Config(format!("invalid proxy {url}: {e}")))?;
                builder = builder.proxy(proxy);
            }
        }
        builder.build().map_err(FetchError::from)
    }
}

/// Turn an error status into a [`FetchError::Status`], keeping the body for diagnosis.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        status: status.as_u16(),
        body,
    })
}

pub struct BatchFetcher;

impl BatchFetcher {
    /// Split `ids` into consecutive batches of at most `batch_size`, keeping input order.
    /// `transform` maps each id to what the upstream expects.
    pub fn plan(ids: &[String], batch_size: usize, transform: impl Fn(&str) -> String) -> Vec<Batch> {
        let batch_size = batch_size.max(1);
        ids.chunks(batch_size)
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                ids: chunk.to_vec(),
                query_ids: chunk.iter().map(|id| transform(id)).collect(),
                offset: index * batch_size,
            })
            .collect()
    }

    pub fn start<'a>(upstream: &'a dyn Upstream, batches: Vec<Batch>, pacing: Pacing) -> BatchRun<'a> {
        BatchRun {
            upstream,
            batches: batches.into(),
            session: None,
            pacing,
            fetched: 0,
        }
    }
}

/// Sequential fetch of planned batches, one upstream call per [`BatchRun::next`].
pub struct BatchRun<'a> {
    upstream: &'a dyn Upstream,
    batches: VecDeque<Batch>,
    session: Option<Session>,
    pacing: Pacing,
    fetched: usize,
}

impl BatchRun<'_> {
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }

    /// Fetch the next batch. Returns `None` once every batch was fetched. A failed batch is
    /// returned as an error and the run should be abandoned.
    pub async fn next(&mut self) -> Option<Result<FetchedBatch, FailedBatch>> {
        let batch = self.batches.pop_front()?;

        if self.session.is_none() {
            let all_query_ids: Vec<String> = std::iter::once(&batch)
                .chain(self.batches.iter())
                .flat_map(|b| b.query_ids.iter().cloned())
                .collect();
            match self.upstream.prepare(&all_query_ids).await {
                Ok(session) => self.session = Some(session),
                Err(error) => {
                    return Some(Err(FailedBatch {
                        batch: batch.context(),
                        error,
                    }))
                }
            }
        }

        if self.fetched > 0 {
            let delay = self.pacing.next_delay();
            if !delay.is_zero() {
                debug!(
                    upstream = self.upstream.name(),
                    delay_ms = delay.as_millis() as u64,
                    "pausing between batches"
                );
                tokio::time::sleep(delay).await;
            }
        }

        debug!(
            upstream = self.upstream.name(),
            batch = batch.index,
            size = batch.len(),
            offset = batch.offset,
            "fetching batch"
        );
        let session = self.session.clone().unwrap_or_default();
        self.fetched += 1;
        match self.upstream.fetch(&session, &batch).await {
            Ok(raw) => Some(Ok(FetchedBatch { batch, raw })),
            Err(error) => Some(Err(FailedBatch {
                batch: batch.context(),
                error,
            })),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Upstream double: answers every batch with the response built by `respond` and records
    /// what it was asked.
    pub struct RecordingUpstream {
        pub prepared: Mutex<Vec<Vec<String>>>,
        pub fetched: Mutex<Vec<Batch>>,
        pub session: Session,
        #[allow(clippy::type_complexity)]
        respond: Box<dyn Fn(&Batch) -> Result<RawResponse, FetchError> + Send + Sync>,
    }

    impl RecordingUpstream {
        pub fn new(
            respond: impl Fn(&Batch) -> Result<RawResponse, FetchError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                prepared: Mutex::new(Vec::new()),
                fetched: Mutex::new(Vec::new()),
                session: Session::Stateless,
                respond: Box::new(respond),
            }
        }

        pub fn with_session(mut self, session: Session) -> Self {
            self.session = session;
            self
        }

        pub fn fetch_count(&self) -> usize {
            self.fetched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Upstream for RecordingUpstream {
        fn name(&self) -> &str {
            "recording"
        }

        async fn prepare(&self, query_ids: &[String]) -> Result<Session, FetchError> {
            self.prepared.lock().unwrap().push(query_ids.to_vec());
            Ok(self.session.clone())
        }

        async fn fetch(&self, session: &Session, batch: &Batch) -> Result<RawResponse, FetchError> {
            assert_eq!(session, &self.session);
            self.fetched.lock().unwrap().push(batch.clone());
            (self.respond)(batch)
        }
    }
}
