//! Delimited-text source.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use super::{DataSource, DataSourceInfo};
use crate::config::CsvSettings;
use crate::dataset::{Column, Dataset, Value};
use crate::error::LoadError;

/// Options for parsing delimited text.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub delimiter: char,
    pub null_values: Vec<String>,
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self::from(&CsvSettings::default())
    }
}

impl From<&CsvSettings> for CsvOptions {
    fn from(settings: &CsvSettings) -> Self {
        Self {
            delimiter: settings.delimiter,
            null_values: settings.null_values.clone(),
            trim: settings.trim,
        }
    }
}

/// CSV file data source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub options: CsvOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.options.delimiter = delimiter;
        self
    }
}

impl DataSource for CsvSource {
    fn load(&self, limit: Option<usize>) -> Result<Dataset, LoadError> {
        let location = self.path.display().to_string();
        let file = File::open(&self.path).map_err(|e| LoadError::unavailable(&location, e))?;
        let dataset = read_delimited(BufReader::new(file), &self.options, &location, limit)?;
        tracing::debug!(
            path = %location,
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "Parsed CSV file"
        );
        Ok(dataset)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

/// Parse delimited text with a header row into a dataset.
///
/// Column types are inferred from the non-missing fields of each column:
/// integer, then float, then boolean, falling back to string. `NaN` in any
/// case counts as missing; infinities are not floats.
pub(crate) fn read_delimited<R: io::Read>(
    reader: R,
    options: &CsvOptions,
    location: &str,
    limit: Option<usize>,
) -> Result<Dataset, LoadError> {
    if !options.delimiter.is_ascii() {
        return Err(LoadError::format(
            location,
            format!(
                "delimiter must be a single-byte character, got '{}'",
                options.delimiter
            ),
        ));
    }
    let delimiter = options.delimiter as u8;

    let mut rdr = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(if options.trim {
            ::csv::Trim::All
        } else {
            ::csv::Trim::None
        })
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| csv_error(location, e))?
        .clone();
    if headers.is_empty() {
        return Err(LoadError::format(location, "missing header row"));
    }

    let mut seen = HashSet::new();
    for (i, name) in headers.iter().enumerate() {
        if name.is_empty() {
            return Err(LoadError::format(
                location,
                format!("empty column name at position {}", i + 1),
            ));
        }
        if !seen.insert(name) {
            return Err(LoadError::format(
                location,
                format!("duplicate column name '{name}'"),
            ));
        }
    }

    let nulls: HashSet<&str> = options.null_values.iter().map(String::as_str).collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for result in rdr.records().take(limit.unwrap_or(usize::MAX)) {
        let record = result.map_err(|e| csv_error(location, e))?;
        for (field, column) in record.iter().zip(cells.iter_mut()) {
            column.push(if nulls.contains(field) || field.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(field.to_string())
            });
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, fields)| parse_column(name, fields))
        .collect();
    Dataset::new(columns).map_err(|e| LoadError::format(location, e))
}

fn csv_error(location: &str, err: ::csv::Error) -> LoadError {
    match err.kind() {
        ::csv::ErrorKind::Io(_) => LoadError::unavailable(location, err),
        _ => LoadError::format(location, err),
    }
}

fn parse_column(name: &str, fields: Vec<Option<String>>) -> Column {
    let all_present = |check: fn(&str) -> bool| fields.iter().flatten().all(|f| check(f));

    let values: Vec<Value> = if all_present(|f| f.parse::<i64>().is_ok()) {
        map_fields(&fields, |f| f.parse().map(Value::Int).ok())
    } else if all_present(|f| parse_finite(f).is_some()) {
        map_fields(&fields, |f| parse_finite(f).map(Value::Float))
    } else if all_present(|f| parse_bool(f).is_some()) {
        map_fields(&fields, |f| parse_bool(f).map(Value::Bool))
    } else {
        map_fields(&fields, |f| Some(Value::from(f)))
    };

    Column::new(name, values)
}

fn map_fields(fields: &[Option<String>], parse: impl Fn(&str) -> Option<Value>) -> Vec<Value> {
    fields
        .iter()
        .map(|f| f.as_deref().and_then(&parse).unwrap_or(Value::Null))
        .collect()
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn parse_bool(field: &str) -> Option<bool> {
    if field.eq_ignore_ascii_case("true") {
        Some(true)
    } else if field.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnType;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Dataset, LoadError> {
        read_delimited(text.as_bytes(), &CsvOptions::default(), "inline", None)
    }

    #[test]
    fn test_type_inference() {
        let ds = parse("id,value,category,flag\n1,10.5,A,true\n2,20.7,B,FALSE\n3,30.2,A,true\n")
            .unwrap();
        assert_eq!(ds.n_rows(), 3);
        let types: Vec<ColumnType> = ds.columns().iter().map(|c| c.dtype()).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::String,
                ColumnType::Boolean,
            ]
        );
    }

    #[test]
    fn test_missing_values() {
        let ds = parse("x,name\n1,a\n,NA\n3, c \n").unwrap();
        assert_eq!(
            ds.column("x").unwrap().values(),
            &[Value::Int(1), Value::Null, Value::Int(3)]
        );
        assert_eq!(
            ds.column("name").unwrap().values(),
            &[Value::from("a"), Value::Null, Value::from("c")]
        );
    }

    #[test]
    fn test_limit() {
        let ds = read_delimited(
            "x\n1\n2\n3\n".as_bytes(),
            &CsvOptions::default(),
            "inline",
            Some(2),
        )
        .unwrap();
        assert_eq!(ds.n_rows(), 2);
    }

    #[test]
    fn test_custom_delimiter() {
        let options = CsvOptions {
            delimiter: ';',
            ..CsvOptions::default()
        };
        let ds = read_delimited("a;b\n1;2\n".as_bytes(), &options, "inline", None).unwrap();
        assert_eq!(ds.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_ragged_rows_are_format_errors() {
        let err = parse("a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn test_empty_input_is_format_error() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn test_duplicate_header_is_format_error() {
        let err = parse("a,a\n1,2\n").unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn test_empty_header_is_format_error() {
        match parse("a,\n1,2\n").unwrap_err() {
            LoadError::Format { reason, .. } => assert!(reason.contains("empty column name")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_nan_is_missing() {
        let ds = parse("x\n1.5\nnan\nNaN\n3\n").unwrap();
        let col = ds.column("x").unwrap();
        assert_eq!(col.dtype(), ColumnType::Float);
        assert_eq!(
            col.values(),
            &[Value::Float(1.5), Value::Null, Value::Null, Value::Float(3.0)]
        );
    }

    #[test]
    fn test_infinities_are_not_floats() {
        let ds = parse("x\n1\ninf\n-Infinity\n").unwrap();
        let col = ds.column("x").unwrap();
        assert_eq!(col.dtype(), ColumnType::String);
        assert_eq!(col.values()[1], Value::from("inf"));
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let options = CsvOptions {
            delimiter: 'é',
            ..CsvOptions::default()
        };
        let err = read_delimited("a\n1\n".as_bytes(), &options, "inline", None).unwrap_err();
        assert!(matches!(err, LoadError::Format { .. }));
    }

    #[test]
    fn test_header_only() {
        let ds = parse("a,b\n").unwrap();
        assert_eq!(ds.n_columns(), 2);
        assert_eq!(ds.n_rows(), 0);
        assert_eq!(ds.column("a").unwrap().dtype(), ColumnType::Null);
    }

    #[test]
    fn test_csv_source_info() {
        let src = CsvSource::new("data.csv");
        let info = src.source_info();
        assert_eq!(info.source_type, "csv");
        assert_eq!(info.location, "data.csv");
    }
}
