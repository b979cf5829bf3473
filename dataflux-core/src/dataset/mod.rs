//! In-memory tabular dataset.
//!
//! A [`Dataset`] is an ordered list of named, equally long [`Column`]s. Each
//! column holds values of a single [`ColumnType`] (plus nulls); rows keep the
//! order in which they were loaded.

pub mod schema;
pub mod value;

pub use schema::{ColumnSchema, ColumnStats, ColumnType, SchemaDefinition, infer_column_type};
pub use value::Value;

use std::collections::HashSet;
use std::io;

use crate::error::DatasetError;

/// A named, homogeneously typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, inferring its type and coercing mixed values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = infer_column_type(&values);
        let values = values.into_iter().map(|v| v.coerce_to(dtype)).collect();
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn from_f64(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Value::Float).collect())
    }

    pub fn from_i64(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, values.into_iter().map(Value::Int).collect())
    }

    pub fn from_strs<'a>(name: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(name, values.into_iter().map(Value::from).collect())
    }

    /// Build a column from optional values, `None` becoming a null.
    pub fn from_options<T: Into<Value>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<T>>,
    ) -> Self {
        Self::new(name, values.into_iter().map(Value::from).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> ColumnType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Numeric view of the column; `None` if the column is not numeric.
    pub fn as_f64s(&self) -> Option<Vec<Option<f64>>> {
        if !self.dtype.is_numeric() {
            return None;
        }
        Some(self.values.iter().map(Value::as_f64).collect())
    }

    /// Replace the values of this column, keeping its length.
    ///
    /// The column type is re-inferred from the new values.
    pub fn set_values(&mut self, values: Vec<Value>) -> Result<(), DatasetError> {
        if values.len() != self.values.len() {
            return Err(DatasetError::LengthMismatch {
                name: self.name.clone(),
                expected: self.values.len(),
                actual: values.len(),
            });
        }
        let replaced = Column::new(std::mem::take(&mut self.name), values);
        *self = replaced;
        Ok(())
    }

    fn stats(&self) -> ColumnStats {
        let unique_count = self
            .values
            .iter()
            .filter(|v| !v.is_null())
            .map(ToString::to_string)
            .collect::<HashSet<_>>()
            .len();

        let numeric: Vec<f64> = self.values.iter().filter_map(Value::as_f64).collect();
        let (min, max, mean, std_dev) = if numeric.is_empty() {
            (None, None, None, None)
        } else {
            let n = numeric.len() as f64;
            let min = numeric.iter().copied().fold(f64::INFINITY, f64::min);
            let max = numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = numeric.iter().sum::<f64>() / n;
            let var = numeric.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            (Some(min), Some(max), Some(mean), Some(var.sqrt()))
        };

        ColumnStats {
            name: self.name.clone(),
            dtype: self.dtype,
            null_count: self.null_count(),
            unique_count,
            min,
            max,
            mean,
            std_dev,
        }
    }
}

/// A tabular, in-memory, mutable collection of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut dataset = Self::default();
        for column in columns {
            dataset.push_column(column)?;
        }
        Ok(dataset)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Append a column after all existing ones.
    pub fn push_column(&mut self, column: Column) -> Result<(), DatasetError> {
        if self.has_column(&column.name) {
            return Err(DatasetError::DuplicateColumn { name: column.name });
        }
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(DatasetError::LengthMismatch {
                name: column.name,
                expected: self.n_rows(),
                actual: column.values.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// The values of row `index`, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.n_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Keep only the rows whose mask entry is `true`.
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<(), DatasetError> {
        if mask.len() != self.n_rows() {
            return Err(DatasetError::MaskMismatch {
                expected: self.n_rows(),
                actual: mask.len(),
            });
        }
        for column in &mut self.columns {
            let mut keep = mask.iter();
            column.values.retain(|_| *keep.next().unwrap_or(&false));
        }
        Ok(())
    }

    pub fn schema(&self) -> SchemaDefinition {
        SchemaDefinition {
            columns: self
                .columns
                .iter()
                .map(|c| ColumnSchema {
                    name: c.name.clone(),
                    dtype: c.dtype,
                    nullable: c.null_count() > 0,
                })
                .collect(),
        }
    }

    /// Per-column summary statistics (numeric statistics only for numeric columns).
    pub fn describe(&self) -> Vec<ColumnStats> {
        self.columns.iter().map(Column::stats).collect()
    }

    /// Write the dataset as delimited text with a header row. Nulls become
    /// empty fields; floats always carry a decimal point or exponent so the
    /// file reads back with the same column types.
    pub fn write_csv<W: io::Write>(&self, writer: W, delimiter: u8) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        wtr.write_record(self.column_names())?;
        for i in 0..self.n_rows() {
            wtr.write_record(self.columns.iter().map(|c| match &c.values[i] {
                Value::Float(x) => format!("{x:?}"),
                other => other.to_string(),
            }))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::from_i64("age", [20, 30, 40]),
            Column::from_strs("city", ["Oslo", "Rome", "Oslo"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_dataset_shape() {
        let ds = sample();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.n_columns(), 2);
        assert_eq!(ds.column_names(), vec!["age", "city"]);
        assert_eq!(ds.column("age").unwrap().dtype(), ColumnType::Integer);
    }

    #[test]
    fn test_dataset_rejects_duplicate_column() {
        let err = Dataset::new(vec![
            Column::from_i64("a", [1]),
            Column::from_i64("a", [2]),
        ])
        .unwrap_err();
        assert_eq!(err, DatasetError::DuplicateColumn { name: "a".into() });
    }

    #[test]
    fn test_dataset_rejects_length_mismatch() {
        let mut ds = sample();
        let err = ds.push_column(Column::from_i64("b", [1])).unwrap_err();
        assert!(matches!(err, DatasetError::LengthMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_column_coerces_mixed_values() {
        let col = Column::new("x", vec![Value::Int(1), Value::Float(2.5), Value::Null]);
        assert_eq!(col.dtype(), ColumnType::Float);
        assert_eq!(col.values(), &[Value::Float(1.0), Value::Float(2.5), Value::Null]);
    }

    #[test]
    fn test_set_values_keeps_length() {
        let mut col = Column::from_i64("x", [1, 2]);
        assert!(col.set_values(vec![Value::Int(1)]).is_err());
        col.set_values(vec![Value::Float(0.0), Value::Float(1.0)]).unwrap();
        assert_eq!(col.dtype(), ColumnType::Float);
        assert_eq!(col.name(), "x");
    }

    #[test]
    fn test_retain_rows() {
        let mut ds = sample();
        ds.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(
            ds.column("city").unwrap().values(),
            &[Value::from("Oslo"), Value::from("Oslo")]
        );
        assert!(ds.retain_rows(&[true]).is_err());
    }

    #[test]
    fn test_describe() {
        let stats = sample().describe();
        assert_eq!(stats[0].min, Some(20.0));
        assert_eq!(stats[0].max, Some(40.0));
        assert_eq!(stats[0].mean, Some(30.0));
        assert_eq!(stats[1].unique_count, 2);
        assert_eq!(stats[1].mean, None);
    }

    #[test]
    fn test_write_csv() {
        let mut ds = sample();
        ds.push_column(Column::from_options("score", [Some(0.5), None, Some(1.0)]))
            .unwrap();
        let mut out = Vec::new();
        ds.write_csv(&mut out, b',').unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "age,city,score\n20,Oslo,0.5\n30,Rome,\n40,Oslo,1.0\n"
        );
    }

    #[test]
    fn test_write_csv_keeps_float_type() {
        let ds = Dataset::new(vec![Column::from_f64("x", [0.0, 1.0, 1e300])]).unwrap();
        let mut out = Vec::new();
        ds.write_csv(&mut out, b',').unwrap();
        let reloaded = crate::loader::csv::read_delimited(
            out.as_slice(),
            &crate::loader::CsvOptions::default(),
            "inline",
            None,
        )
        .unwrap();
        assert_eq!(reloaded, ds);
    }
}
