//! Object-storage source.
//!
//! Fetching bytes is delegated to an [`ObjectReader`]; the object itself is
//! parsed as delimited text. Requests are anonymous: signed access is left to
//! a caller-supplied reader.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use url::Url;

use super::csv::{CsvOptions, read_delimited};
use super::{DataSource, DataSourceInfo};
use crate::dataset::Dataset;
use crate::error::LoadError;

/// Bucket, key and region of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
    pub region: String,
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Reads the raw bytes of an object.
pub trait ObjectReader: Send + Sync {
    fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>, LoadError>;
}

/// Anonymous HTTP reader for S3-compatible storage.
pub struct HttpObjectReader {
    client: reqwest::blocking::Client,
    endpoint: Option<Url>,
}

impl HttpObjectReader {
    pub fn new(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::unavailable("http client", e))?;
        Ok(Self {
            client,
            endpoint: None,
        })
    }

    /// Send path-style requests (`{endpoint}/{bucket}/{key}`) to `endpoint`.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, LoadError> {
        let url = Url::parse(endpoint).map_err(|e| LoadError::unavailable(endpoint, e))?;
        self.endpoint = Some(url);
        Ok(self)
    }

    /// URL of an object: virtual-hosted AWS style unless an endpoint is set.
    pub fn object_url(&self, location: &ObjectLocation) -> Result<Url, LoadError> {
        let (mut url, prefix) = match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), Some(location.bucket.as_str())),
            None => {
                let host = format!(
                    "https://{}.s3.{}.amazonaws.com/",
                    location.bucket, location.region
                );
                let url = Url::parse(&host)
                    .map_err(|e| LoadError::unavailable(location.to_string(), e))?;
                (url, None)
            }
        };

        url.path_segments_mut()
            .map_err(|_| LoadError::unavailable(location.to_string(), "endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(prefix)
            .extend(location.key.split('/'));
        Ok(url)
    }
}

impl fmt::Debug for HttpObjectReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpObjectReader")
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .finish()
    }
}

impl ObjectReader for HttpObjectReader {
    fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>, LoadError> {
        let url = self.object_url(location)?;
        tracing::debug!(url = %url, "Fetching object");

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| LoadError::unavailable(location.to_string(), e))?;
        if !response.status().is_success() {
            return Err(LoadError::unavailable(
                location.to_string(),
                format!("request to {url} failed with status {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .map_err(|e| LoadError::unavailable(location.to_string(), e))?;
        Ok(body.to_vec())
    }
}

/// Reads objects from a directory laid out as `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalObjectReader {
    root: PathBuf,
}

impl LocalObjectReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectReader for LocalObjectReader {
    fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>, LoadError> {
        let mut path = self.root.clone();
        for segment in std::iter::once(location.bucket.as_str()).chain(location.key.split('/')) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => {
                    return Err(LoadError::unavailable(
                        location.to_string(),
                        format!("invalid path segment '{segment}'"),
                    ));
                }
            }
        }
        std::fs::read(&path).map_err(|e| LoadError::unavailable(location.to_string(), e))
    }
}

/// Object-storage data source; the object is parsed as delimited text.
pub struct ObjectStoreSource {
    pub location: ObjectLocation,
    pub options: CsvOptions,
    reader: Box<dyn ObjectReader>,
}

impl ObjectStoreSource {
    pub fn new(location: ObjectLocation, reader: Box<dyn ObjectReader>) -> Self {
        Self {
            location,
            options: CsvOptions::default(),
            reader,
        }
    }

    pub fn with_csv_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for ObjectStoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreSource")
            .field("location", &self.location)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DataSource for ObjectStoreSource {
    fn load(&self, limit: Option<usize>) -> Result<Dataset, LoadError> {
        let location = self.location.to_string();
        let bytes = self.reader.read(&self.location)?;
        tracing::debug!(location = %location, bytes = bytes.len(), "Read object");
        read_delimited(bytes.as_slice(), &self.options, &location, limit)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "object_store".to_string(),
            location: self.location.to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;

    fn location() -> ObjectLocation {
        ObjectLocation {
            bucket: "datasets".into(),
            key: "raw/customers 2024.csv".into(),
            region: "eu-west-1".into(),
        }
    }

    /// Serves a fixed payload for one key.
    struct StaticReader(&'static str);

    impl ObjectReader for StaticReader {
        fn read(&self, location: &ObjectLocation) -> Result<Vec<u8>, LoadError> {
            if location.key == "raw/customers 2024.csv" {
                Ok(self.0.as_bytes().to_vec())
            } else {
                Err(LoadError::unavailable(location.to_string(), "no such key"))
            }
        }
    }

    #[test]
    fn test_virtual_hosted_url() {
        let reader = HttpObjectReader::new(Duration::from_secs(1)).unwrap();
        let url = reader.object_url(&location()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://datasets.s3.eu-west-1.amazonaws.com/raw/customers%202024.csv"
        );
    }

    #[test]
    fn test_path_style_url() {
        let reader = HttpObjectReader::new(Duration::from_secs(1))
            .unwrap()
            .with_endpoint("http://localhost:9000")
            .unwrap();
        let url = reader.object_url(&location()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/datasets/raw/customers%202024.csv"
        );
    }

    #[test]
    fn test_load_with_custom_reader() {
        let src = ObjectStoreSource::new(location(), Box::new(StaticReader("age\n20\n30\n")));
        let ds = src.load(None).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(src.source_info().location, "s3://datasets/raw/customers 2024.csv");
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let mut loc = location();
        loc.key = "other.csv".into();
        let src = ObjectStoreSource::new(loc, Box::new(StaticReader("")));
        assert!(matches!(
            src.load(None).unwrap_err(),
            LoadError::SourceUnavailable { .. }
        ));
    }

    #[test]
    fn test_local_reader_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LocalObjectReader::new(dir.path());
        assert!(matches!(
            reader.read(&location()).unwrap_err(),
            LoadError::SourceUnavailable { .. }
        ));
    }

    #[test]
    fn test_local_reader_rejects_escaping_keys() {
        let root = tempfile::tempdir().unwrap();
        let bucket = root.path().join("datasets");
        std::fs::create_dir_all(&bucket).unwrap();
        std::fs::write(root.path().join("secret.csv"), "a\n1\n").unwrap();
        let reader = LocalObjectReader::new(&bucket);

        for (bucket, key) in [
            ("datasets", "../secret.csv"),
            ("..", "secret.csv"),
            ("datasets", "/etc/passwd"),
            ("datasets", "raw//x.csv"),
        ] {
            let loc = ObjectLocation {
                bucket: bucket.into(),
                key: key.into(),
                region: "eu-west-1".into(),
            };
            match reader.read(&loc).unwrap_err() {
                LoadError::SourceUnavailable { reason, .. } => {
                    assert!(reason.contains("invalid path segment"), "{key}: {reason}")
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }
}
