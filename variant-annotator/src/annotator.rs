use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::error::AnnotationError;
use crate::fetch::{BatchFetcher, FetchedBatch, Upstream};
use crate::metrics_consts::{
    BATCHES_FETCHED, BATCH_FETCH_TIME, CACHE_CORRUPT_ENTRIES, CACHE_HITS, CACHE_MISSES,
    CACHE_WRITES, FRAGMENTS_PARSED, FRAGMENTS_UNREQUESTED, IDS_NOT_FOUND, IDS_REQUESTED,
    SCHEMA_ERRORS, UPSTREAM_ERRORS,
};
use crate::source::Source;

/// Per-call switches for [`Annotator::annotate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateOptions {
    /// Read cached records and write fetched ones back.
    pub use_cache: bool,
    /// Fetch whatever the cache did not have.
    pub use_web: bool,
    /// Overrides the source's pause between batches for this call.
    pub sleep_time: Option<Duration>,
    /// Ignore what is cached but still write fetched records back, replacing stale entries.
    pub refresh_cache: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            use_web: true,
            sleep_time: None,
            refresh_cache: false,
        }
    }
}

impl AnnotateOptions {
    pub fn cache_only() -> Self {
        Self {
            use_web: false,
            ..Self::default()
        }
    }

    pub fn web_only() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }

    pub fn refresh() -> Self {
        Self {
            refresh_cache: true,
            ..Self::default()
        }
    }

    fn reads_cache(&self) -> bool {
        self.use_cache && !self.refresh_cache
    }

    fn writes_cache(&self) -> bool {
        self.use_cache || self.refresh_cache
    }
}

/// Annotates identifiers with one source: cache first, then the upstream for whatever is
/// missing, batch by batch.
pub struct Annotator {
    source: Source,
    upstream: Box<dyn Upstream>,
    cache: Option<Cache>,
}

impl Annotator {
    pub fn new(source: Source, upstream: impl Upstream + 'static) -> Self {
        Self {
            source,
            upstream: Box::new(upstream),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Records for every id found in the cache or upstream, keyed by the id as given (trimmed).
    /// Ids found nowhere are absent. An id the upstream answers with several entities maps to
    /// a list of records.
    ///
    /// Batches are processed in order and each batch's records are cached as soon as it is
    /// parsed, so a failure leaves the earlier batches cached.
    pub async fn annotate(
        &self,
        ids: &[String],
        options: &AnnotateOptions,
    ) -> Result<HashMap<String, Value>, AnnotationError> {
        let source_name = self.source.name();
        let ids = normalize_ids(ids);
        let mut results: HashMap<String, Value> = HashMap::new();
        if ids.is_empty() {
            return Ok(results);
        }
        metrics::counter!(IDS_REQUESTED, "source" => source_name.to_string())
            .increment(ids.len() as u64);

        let cache = self.cache.as_ref();
        if let Some(cache) = cache.filter(|_| options.reads_cache()) {
            results = self.read_cache(cache, &ids).await?;
        }

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !results.contains_key(*id))
            .cloned()
            .collect();

        info!(
            source = source_name,
            requested = ids.len(),
            cached = results.len(),
            missing = missing.len(),
            "annotating"
        );

        if !options.use_web || missing.is_empty() {
            return Ok(results);
        }

        let spec = &self.source.spec;
        let pacing = match options.sleep_time {
            Some(delay) => spec.pacing.with_delay(delay),
            None => spec.pacing,
        };
        let batches = BatchFetcher::plan(&missing, spec.batch_size, |id| spec.id_transform.apply(id));
        let mut run = BatchFetcher::start(self.upstream.as_ref(), batches, pacing);

        loop {
            let started = Instant::now();
            let Some(next) = run.next().await else {
                break;
            };
            let fetched = next.map_err(|failed| {
                metrics::counter!(UPSTREAM_ERRORS, "source" => source_name.to_string()).increment(1);
                AnnotationError::Fetch {
                    source_name: source_name.to_string(),
                    batch: failed.batch,
                    error: failed.error,
                }
            })?;
            metrics::counter!(BATCHES_FETCHED, "source" => source_name.to_string()).increment(1);
            metrics::histogram!(BATCH_FETCH_TIME, "source" => source_name.to_string())
                .record(started.elapsed().as_millis() as f64);

            let records = self.process_batch(&fetched)?;

            if let Some(cache) = cache.filter(|_| options.writes_cache()) {
                cache
                    .set(&records, source_name, true)
                    .await
                    .map_err(|error| AnnotationError::Cache {
                        source_name: source_name.to_string(),
                        error,
                    })?;
                metrics::counter!(CACHE_WRITES, "source" => source_name.to_string())
                    .increment(records.len() as u64);
            }

            results.extend(records);
        }

        let not_found = missing.iter().filter(|id| !results.contains_key(*id)).count();
        if not_found > 0 {
            debug!(source = source_name, not_found, "ids not found upstream");
            metrics::counter!(IDS_NOT_FOUND, "source" => source_name.to_string())
                .increment(not_found as u64);
        }

        Ok(results)
    }

    /// The record for a single id, or [`AnnotationError::NotFound`] when neither the cache nor
    /// the upstream has it.
    pub async fn annotate_one(
        &self,
        id: &str,
        options: &AnnotateOptions,
    ) -> Result<Value, AnnotationError> {
        let id = id.trim().to_string();
        let mut results = self.annotate(std::slice::from_ref(&id), options).await?;
        results
            .remove(&id)
            .ok_or_else(|| AnnotationError::NotFound {
                source_name: self.source.name().to_string(),
                id,
            })
    }

    /// Cached records among `ids`. Entries that cannot be decoded are left out so they get
    /// fetched again.
    async fn read_cache(
        &self,
        cache: &Cache,
        ids: &[String],
    ) -> Result<HashMap<String, Value>, AnnotationError> {
        let source_name = self.source.name();
        let cache_error = |error| AnnotationError::Cache {
            source_name: source_name.to_string(),
            error,
        };

        let known = cache.get_cached_ids(source_name).await.map_err(cache_error)?;
        let cached: Vec<String> = ids.iter().filter(|id| known.contains(*id)).cloned().collect();

        let hits = cache.get(&cached, source_name, true).await.map_err(cache_error)?;
        if !hits.corrupt.is_empty() {
            warn!(
                source = source_name,
                corrupt = hits.corrupt.len(),
                "refetching cache entries that could not be decoded"
            );
            metrics::counter!(CACHE_CORRUPT_ENTRIES, "source" => source_name.to_string())
                .increment(hits.corrupt.len() as u64);
        }

        metrics::counter!(CACHE_HITS, "source" => source_name.to_string())
            .increment(hits.values.len() as u64);
        metrics::counter!(CACHE_MISSES, "source" => source_name.to_string())
            .increment((ids.len() - hits.values.len()) as u64);
        Ok(hits.values)
    }

    /// Demultiplex one batch response, map each fragment back to the caller's id and parse it.
    fn process_batch(&self, fetched: &FetchedBatch) -> Result<HashMap<String, Value>, AnnotationError> {
        let source_name = self.source.name();
        let batch = &fetched.batch;

        let mut original_ids: HashMap<&str, Vec<&str>> = HashMap::new();
        for (query_id, id) in batch.query_ids.iter().zip(&batch.ids) {
            original_ids.entry(query_id.as_str()).or_default().push(id.as_str());
        }

        let pairs = self
            .source
            .demultiplex(&batch.query_ids, &fetched.raw)
            .map_err(|error| {
                metrics::counter!(SCHEMA_ERRORS, "source" => source_name.to_string()).increment(1);
                AnnotationError::Schema {
                    source_name: source_name.to_string(),
                    batch: batch.context(),
                    error,
                }
            })?;

        let mut records: HashMap<String, Value> = HashMap::new();
        for (query_id, fragment) in pairs {
            let Some(ids) = original_ids.get(query_id.as_str()) else {
                debug!(
                    source = source_name,
                    batch = batch.index,
                    id = query_id.as_str(),
                    "dropping fragment for an id that was not requested in this batch"
                );
                metrics::counter!(FRAGMENTS_UNREQUESTED, "source" => source_name.to_string())
                    .increment(1);
                continue;
            };

            let record = self.source.parse(&fragment).map_err(|error| {
                metrics::counter!(SCHEMA_ERRORS, "source" => source_name.to_string()).increment(1);
                AnnotationError::Parse {
                    source_name: source_name.to_string(),
                    id: query_id.clone(),
                    error,
                }
            })?;
            metrics::counter!(FRAGMENTS_PARSED, "source" => source_name.to_string()).increment(1);

            for id in ids {
                add_record(&mut records, id, record.clone());
            }
        }
        Ok(records)
    }
}

/// Trimmed, non-empty, first occurrence of each id, in input order.
fn normalize_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// A second record for the same id turns the entry into a list.
fn add_record(records: &mut HashMap<String, Value>, id: &str, record: Value) {
    match records.remove(id) {
        None => {
            records.insert(id.to_string(), record);
        }
        Some(Value::Array(mut list)) if !record.is_array() => {
            list.push(record);
            records.insert(id.to_string(), Value::Array(list));
        }
        Some(previous) => {
            records.insert(id.to_string(), Value::Array(vec![previous, record]));
        }
    }
}
