//! Row and string cleanup.

use std::collections::HashSet;

use super::TransformStep;
use crate::dataset::{ColumnType, Dataset, Value};
use crate::error::TransformError;

/// Trims strings, then drops incomplete rows and duplicate rows.
///
/// Stateless: needs no fit. Duplicate detection keeps the first occurrence.
#[derive(Debug, Clone)]
pub struct Cleaner {
    drop_missing: bool,
    drop_duplicates: bool,
    trim_strings: bool,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self {
            drop_missing: false,
            drop_duplicates: true,
            trim_strings: true,
        }
    }
}

impl Cleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drop_missing(mut self, enabled: bool) -> Self {
        self.drop_missing = enabled;
        self
    }

    pub fn drop_duplicates(mut self, enabled: bool) -> Self {
        self.drop_duplicates = enabled;
        self
    }

    pub fn trim_strings(mut self, enabled: bool) -> Self {
        self.trim_strings = enabled;
        self
    }

    fn retain(&self, dataset: &mut Dataset, mask: &[bool]) -> Result<usize, TransformError> {
        let before = dataset.n_rows();
        dataset
            .retain_rows(mask)
            .map_err(|e| TransformError::invalid_column(self.name(), "*", e.to_string()))?;
        Ok(before - dataset.n_rows())
    }
}

impl TransformStep for Cleaner {
    fn name(&self) -> &str {
        "clean"
    }

    fn apply(&self, dataset: &mut Dataset) -> Result<(), TransformError> {
        if self.trim_strings {
            let string_columns: Vec<String> = dataset
                .columns()
                .iter()
                .filter(|c| c.dtype() == ColumnType::String)
                .map(|c| c.name().to_string())
                .collect();
            for name in string_columns {
                let Some(column) = dataset.column_mut(&name) else {
                    continue;
                };
                let needs_trim = column
                    .values()
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| s.trim() != s);
                if !needs_trim {
                    continue;
                }
                let trimmed = column
                    .values()
                    .iter()
                    .map(|v| match v {
                        Value::Str(s) => Value::from(s.trim()),
                        other => other.clone(),
                    })
                    .collect();
                column
                    .set_values(trimmed)
                    .map_err(|e| TransformError::invalid_column(self.name(), &name, e.to_string()))?;
            }
        }

        if self.drop_missing {
            let mask: Vec<bool> = (0..dataset.n_rows())
                .map(|i| dataset.columns().iter().all(|c| !c.values()[i].is_null()))
                .collect();
            let dropped = self.retain(dataset, &mask)?;
            tracing::debug!(step = "clean", dropped, "Dropped rows with missing values");
        }

        if self.drop_duplicates {
            let mut seen = HashSet::new();
            let mask: Vec<bool> = (0..dataset.n_rows())
                .map(|i| seen.insert(format!("{:?}", dataset.row(i))))
                .collect();
            let dropped = self.retain(dataset, &mask)?;
            tracing::debug!(step = "clean", dropped, "Dropped duplicate rows");
        }

        Ok(())
    }
}
