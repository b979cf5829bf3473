//! # DataFlux Core
//!
//! Core library for DataFlux data preparation.
//! Provides dataset loaders (CSV, SQLite, object storage), fit/apply
//! transform steps (imputation, scaling, encoding, cleanup), the pipeline
//! orchestrator and layered configuration.

pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod preprocess;

// Re-export commonly used types at the crate root.
pub use config::{DataFluxConfig, PipelineFile};
pub use dataset::{Column, ColumnType, Dataset, Value};
pub use error::{
    ConfigError, DataFluxError, DatasetError, LoadError, PipelineError, Result, TransformError,
};
pub use loader::{DataSource, SourceDescriptor, load_csv, load_source};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use preprocess::{
    Cleaner, EncodeMethod, Encoder, FillMissing, HandleUnknown, ImputeStrategy, ScaleMethod,
    Scaler, StepConfig, TransformStep,
};
