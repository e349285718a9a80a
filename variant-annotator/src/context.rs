use anyhow::Error;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::annotator::Annotator;
use crate::cache::{Cache, MemoryCache, PostgresCache, RedisCache};
use crate::config::{CacheBackendKind, Config};
use crate::fetch::{EnsemblClient, EntrezClient, HttpSettings, Retrying, Upstream};
use crate::source::{BuiltinSource, UpstreamKind};

pub struct AppContext {
    pub config: Config,
    pub cache: Cache,
    pub http: HttpSettings,
}

impl AppContext {
    pub async fn new(config: &Config) -> Result<Self, Error> {
        let cache = match config.cache_backend {
            CacheBackendKind::Memory => Cache::new(MemoryCache::new(config.memory_cache_capacity)),
            CacheBackendKind::Redis => {
                let client = redis::Client::open(config.redis_url.as_str())?;
                Cache::new(RedisCache::new_redis(client, config.redis_ttl_seconds).await?)
            }
            CacheBackendKind::Postgres => {
                // Connections go straight to postgres, keep the pool small
                let options = PgPoolOptions::new().max_connections(config.max_pg_connections);
                let pool = options.connect(&config.database_url).await?;
                let postgres = PostgresCache::new(pool);
                postgres.ensure_schema().await?;
                Cache::new(postgres)
            }
        };
        info!(backend = cache.backend_name(), "cache ready");

        Ok(Self {
            config: config.clone(),
            cache,
            http: config.http_settings(),
        })
    }

    /// The client `source` talks to, wrapped in the retry layer when more than one attempt is
    /// configured.
    pub fn upstream(&self, source: BuiltinSource) -> Result<Box<dyn Upstream>, Error> {
        let upstream: Box<dyn Upstream> = match source.upstream_kind() {
            UpstreamKind::Entrez(service) => Box::new(EntrezClient::new(
                self.config.entrez_config(),
                service,
                &self.http,
            )?),
            UpstreamKind::Ensembl => Box::new(EnsemblClient::new(
                self.config.ensembl_base_url(),
                self.config.ensembl_full_info,
                &self.http,
            )?),
        };

        if self.config.backoff_max_attempts <= 1 {
            return Ok(upstream);
        }
        Ok(Box::new(Retrying::new(
            upstream,
            self.config.backoff_policy(),
            self.config.backoff_max_attempts,
        )))
    }

    pub fn annotator(&self, source: BuiltinSource) -> Result<Annotator, Error> {
        let upstream = self.upstream(source)?;
        let mut source = source.source(self.config.ensembl_full_info);
        if let Some(pacing) = self.config.pacing() {
            source = source.with_pacing(pacing);
        }
        Ok(Annotator::new(source, upstream).with_cache(self.cache.clone()))
    }

}
