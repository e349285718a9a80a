pub const IDS_REQUESTED: &str = "variant_annotator_ids_requested";
pub const CACHE_HITS: &str = "variant_annotator_cache_hits";
pub const CACHE_MISSES: &str = "variant_annotator_cache_misses";
pub const CACHE_CORRUPT_ENTRIES: &str = "variant_annotator_cache_corrupt_entries";
pub const CACHE_WRITES: &str = "variant_annotator_cache_writes";
pub const BATCHES_FETCHED: &str = "variant_annotator_batches_fetched";
pub const BATCH_FETCH_TIME: &str = "variant_annotator_batch_fetch_time_ms";
pub const FRAGMENTS_PARSED: &str = "variant_annotator_fragments_parsed";
pub const FRAGMENTS_UNREQUESTED: &str = "variant_annotator_fragments_unrequested";
pub const IDS_NOT_FOUND: &str = "variant_annotator_ids_not_found";
pub const UPSTREAM_ERRORS: &str = "variant_annotator_upstream_errors";
pub const SCHEMA_ERRORS: &str = "variant_annotator_schema_errors";
pub const UPSTREAM_RETRIES: &str = "variant_annotator_upstream_retries";
