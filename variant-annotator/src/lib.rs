pub mod annotator;
pub mod cache;
pub mod config;
pub mod context;
pub mod demux;
pub mod error;
pub mod fetch;
pub mod metrics_consts;
pub mod parse;
pub mod record;
pub mod source;
pub mod xml;

pub use annotator::{AnnotateOptions, Annotator};
pub use cache::Cache;
pub use error::AnnotationError;
pub use record::Record;
pub use source::{BuiltinSource, Source, SourceSpec};
