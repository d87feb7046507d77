//! Data models and configuration.

pub mod config;
pub mod record;

pub use config::{ModelConfig, OcrEngineKind, RuanzhuConfig};
pub use record::{
    DocumentFormat, ExtractedRecord, Field, FieldCandidate, NameSource, SourceDocument,
};
