//! Missing-value imputation.

use std::collections::HashMap;

use super::{ImputeStrategy, TransformStep, target_columns};
use crate::dataset::{Column, Dataset, Value};
use crate::error::TransformError;

/// Fills missing values with a learned or constant value.
///
/// `mean` and `median` apply to numeric columns and produce a Float fill
/// value; on other columns they fall back to the most frequent value.
/// `constant` needs no fit. Without an explicit column list every column is
/// considered; columns without any observed value are skipped.
#[derive(Debug, Clone)]
pub struct FillMissing {
    name: String,
    strategy: ImputeStrategy,
    constant: Option<Value>,
    columns: Option<Vec<String>>,
    fills: Option<Vec<(String, Value)>>,
}

impl FillMissing {
    /// A fill step for a statistics-based strategy.
    ///
    /// Use [`FillMissing::constant`] for [`ImputeStrategy::Constant`]; with
    /// `new` a constant strategy fills with nulls, i.e. does nothing.
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            name: format!("fill_missing({strategy})"),
            strategy,
            constant: None,
            columns: None,
            fills: None,
        }
    }

    pub fn mean() -> Self {
        Self::new(ImputeStrategy::Mean)
    }

    pub fn median() -> Self {
        Self::new(ImputeStrategy::Median)
    }

    pub fn most_frequent() -> Self {
        Self::new(ImputeStrategy::MostFrequent)
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Self {
            constant: Some(value.into()),
            ..Self::new(ImputeStrategy::Constant)
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// The fill value learned for `column`, if fitted.
    pub fn fill_value(&self, column: &str) -> Option<&Value> {
        if let Some(value) = &self.constant {
            return Some(value);
        }
        self.fills
            .as_ref()?
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    fn invalid(&self, column: &str, reason: impl Into<String>) -> TransformError {
        TransformError::invalid_column(&self.name, column, reason)
    }

    fn statistic(&self, column: &Column) -> Option<Value> {
        let numeric = column.as_f64s().map(|values| values.into_iter().flatten().collect::<Vec<_>>());
        match (self.strategy, numeric) {
            (ImputeStrategy::Mean, Some(values)) if !values.is_empty() => {
                Some(Value::Float(values.iter().sum::<f64>() / values.len() as f64))
            }
            (ImputeStrategy::Median, Some(values)) if !values.is_empty() => {
                Some(Value::Float(median(values)))
            }
            _ => most_frequent(column.values()),
        }
    }

    fn fill_column(
        &self,
        dataset: &mut Dataset,
        name: &str,
        fill: &Value,
    ) -> Result<(), TransformError> {
        let column = dataset
            .column_mut(name)
            .ok_or_else(|| self.invalid(name, "column not found"))?;
        let missing = column.null_count();
        if missing == 0 || fill.is_null() {
            return Ok(());
        }
        let values = column
            .values()
            .iter()
            .map(|v| if v.is_null() { fill.clone() } else { v.clone() })
            .collect();
        column
            .set_values(values)
            .map_err(|e| self.invalid(name, e.to_string()))?;
        tracing::debug!(step = %self.name, column = name, filled = missing, "Filled missing values");
        Ok(())
    }
}

impl TransformStep for FillMissing {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_fit(&self) -> bool {
        self.strategy != ImputeStrategy::Constant
    }

    fn is_fitted(&self) -> bool {
        !self.requires_fit() || self.fills.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<(), TransformError> {
        if !self.requires_fit() {
            return Ok(());
        }

        let explicit = self.columns.is_some();
        let targets = target_columns(self.columns.as_deref(), dataset, |_| true);
        let mut fills = Vec::with_capacity(targets.len());
        for name in targets {
            let column = dataset
                .column(&name)
                .ok_or_else(|| self.invalid(&name, "column not found"))?;
            match self.statistic(column) {
                Some(value) => fills.push((name, value)),
                None if explicit => {
                    return Err(self.invalid(&name, "no observed values to fit"));
                }
                None => {
                    tracing::warn!(step = %self.name, column = %name, "Skipping column without observed values");
                }
            }
        }

        self.fills = Some(fills);
        Ok(())
    }

    fn apply(&self, dataset: &mut Dataset) -> Result<(), TransformError> {
        if !self.requires_fit() {
            let Some(value) = &self.constant else {
                return Ok(());
            };
            let targets = target_columns(self.columns.as_deref(), dataset, |_| true);
            for name in targets {
                self.fill_column(dataset, &name, value)?;
            }
            return Ok(());
        }

        let fills = self
            .fills
            .as_ref()
            .ok_or_else(|| TransformError::unfitted(&self.name))?;
        for (name, value) in fills {
            self.fill_column(dataset, name, value)?;
        }
        Ok(())
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Most common non-null value; ties go to the value seen first.
fn most_frequent(values: &[Value]) -> Option<Value> {
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for value in values.iter().filter(|v| !v.is_null()) {
        let key = value.to_string();
        match positions.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(key, counts.len());
                counts.push((value, 1));
            }
        }
    }

    let mut best: Option<(&Value, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}
