//! Data source abstraction for loading datasets.
//!
//! Every loader implements [`DataSource`]. A failed read surfaces immediately
//! as a [`LoadError`]: `SourceUnavailable` when the file, database or object
//! cannot be reached, `Format` when its content is not a table.

pub mod csv;
pub mod object_store;
pub mod sql;

pub use self::csv::{CsvOptions, CsvSource};
pub use self::object_store::{
    HttpObjectReader, LocalObjectReader, ObjectLocation, ObjectReader, ObjectStoreSource,
};
pub use self::sql::SqlSource;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DataFluxConfig;
use crate::dataset::Dataset;
use crate::error::LoadError;

/// Where to load a dataset from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    Csv {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delimiter: Option<char>,
    },
    Sql {
        db_path: PathBuf,
        query: String,
    },
    ObjectStore {
        bucket: String,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delimiter: Option<char>,
    },
}

impl SourceDescriptor {
    /// Make relative file paths relative to `base` instead of the working directory.
    pub fn resolve_relative(&mut self, base: &Path) {
        let path = match self {
            SourceDescriptor::Csv { path, .. } => path,
            SourceDescriptor::Sql { db_path, .. } => db_path,
            SourceDescriptor::ObjectStore { .. } => return,
        };
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

/// Information about a data source, used for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for loading a dataset from a source.
pub trait DataSource {
    /// Load the dataset, optionally keeping only the first `limit` rows.
    fn load(&self, limit: Option<usize>) -> Result<Dataset, LoadError>;

    /// Return metadata about this source.
    fn source_info(&self) -> DataSourceInfo;
}

/// Load a CSV file with default settings.
pub fn load_csv(path: impl Into<PathBuf>) -> Result<Dataset, LoadError> {
    CsvSource::new(path).load(None)
}

/// Build the loader a descriptor names and load from it.
pub fn load_source(
    descriptor: &SourceDescriptor,
    config: &DataFluxConfig,
    limit: Option<usize>,
) -> Result<Dataset, LoadError> {
    let source = build_source(descriptor, config)?;
    let info = source.source_info();
    let dataset = source.load(limit)?;
    tracing::info!(
        source_type = %info.source_type,
        location = %info.location,
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        "Loaded dataset"
    );
    Ok(dataset)
}

fn build_source(
    descriptor: &SourceDescriptor,
    config: &DataFluxConfig,
) -> Result<Box<dyn DataSource>, LoadError> {
    let mut csv_options = CsvOptions::from(&config.csv);
    let source: Box<dyn DataSource> = match descriptor {
        SourceDescriptor::Csv { path, delimiter } => {
            if let Some(d) = delimiter {
                csv_options.delimiter = *d;
            }
            Box::new(CsvSource::with_options(path.clone(), csv_options))
        }
        SourceDescriptor::Sql { db_path, query } => {
            Box::new(SqlSource::new(db_path.clone(), query.clone()))
        }
        SourceDescriptor::ObjectStore {
            bucket,
            key,
            region,
            endpoint,
            delimiter,
        } => {
            if let Some(d) = delimiter {
                csv_options.delimiter = *d;
            }
            let location = ObjectLocation {
                bucket: bucket.clone(),
                key: key.clone(),
                region: region
                    .clone()
                    .unwrap_or_else(|| config.object_store.region.clone()),
            };
            let endpoint = endpoint.as_ref().or(config.object_store.endpoint.as_ref());
            let reader: Box<dyn ObjectReader> = match endpoint {
                Some(ep) if ep.starts_with("file://") => {
                    Box::new(LocalObjectReader::new(ep.trim_start_matches("file://")))
                }
                Some(ep) => Box::new(
                    HttpObjectReader::new(Duration::from_secs(config.object_store.timeout_secs))?
                        .with_endpoint(ep)?,
                ),
                None => Box::new(HttpObjectReader::new(Duration::from_secs(
                    config.object_store.timeout_secs,
                ))?),
            };
            Box::new(ObjectStoreSource::new(location, reader).with_csv_options(csv_options))
        }
    };
    Ok(source)
}
