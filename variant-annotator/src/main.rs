use std::collections::BTreeMap;

use anyhow::Error;
use clap::Parser;
use envconfig::Envconfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use variant_annotator::{
    config::Config, context::AppContext, source::BuiltinSource, AnnotateOptions,
};

#[derive(Parser)]
#[command(version, about = "Annotate variant identifiers from one data source", long_about = None)]
struct Cli {
    /// The data source to annotate with
    #[arg(value_enum)]
    source: BuiltinSource,

    /// Identifiers to annotate (rs ids, accessions, gene ids, PubMed ids...)
    #[arg(required = true)]
    ids: Vec<String>,

    /// Only return what is already cached, never call the upstream service
    #[arg(long, conflicts_with_all = ["no_cache", "refresh"])]
    cache_only: bool,

    /// Neither read nor write the cache
    #[arg(long, conflicts_with = "refresh")]
    no_cache: bool,

    /// Fetch every id again and overwrite what is cached
    #[arg(long)]
    refresh: bool,
}

// Logs go to stderr, stdout is reserved for the annotations.
fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
pub async fn main() -> Result<(), Error> {
    setup_tracing();
    let cli = Cli::parse();

    let config = Config::init_from_env()?;
    let context = AppContext::new(&config).await?;
    let annotator = context.annotator(cli.source)?;

    let options = AnnotateOptions {
        use_web: !cli.cache_only,
        use_cache: !cli.no_cache,
        refresh_cache: cli.refresh,
        ..AnnotateOptions::default()
    };

    let annotations = annotator.annotate(&cli.ids, &options).await?;
    info!(
        source = cli.source.name(),
        requested = cli.ids.len(),
        found = annotations.len(),
        "done"
    );

    let sorted: BTreeMap<_, _> = annotations.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&sorted)?);
    Ok(())
}
