//! Numeric scaling.

use super::{ScaleMethod, TransformStep, target_columns};
use crate::dataset::{Dataset, Value};
use crate::error::TransformError;

/// Per-column parameters learned at fit: `(x / divisor - offset) / range`.
///
/// `divisor` is 1 unless the raw statistics would overflow, in which case
/// values are shrunk before `offset` and `range` are computed.
#[derive(Debug, Clone, PartialEq)]
struct ScaleParams {
    column: String,
    divisor: f64,
    offset: f64,
    range: f64,
}

impl ScaleParams {
    fn scale(&self, x: f64) -> f64 {
        if self.range == 0.0 {
            0.0
        } else {
            (x / self.divisor - self.offset) / self.range
        }
    }
}

/// Largest magnitude whose square cannot overflow when summed.
const SQUARE_SAFE: f64 = 1.0e150;

fn min_max_params(column: &str, observed: &[f64]) -> ScaleParams {
    let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let divisor = if (max - min).is_finite() { 1.0 } else { 2.0 };
    ScaleParams {
        column: column.to_string(),
        divisor,
        offset: min / divisor,
        range: max / divisor - min / divisor,
    }
}

fn standard_params(column: &str, observed: &[f64]) -> ScaleParams {
    let largest = observed.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    let divisor = if largest > SQUARE_SAFE { largest } else { 1.0 };
    let n = observed.len() as f64;
    let mean = observed.iter().map(|x| x / divisor).sum::<f64>() / n;
    let var = observed
        .iter()
        .map(|x| (x / divisor - mean).powi(2))
        .sum::<f64>()
        / n;
    ScaleParams {
        column: column.to_string(),
        divisor,
        offset: mean,
        range: var.sqrt(),
    }
}

/// Rescales numeric columns with min-max or standard scaling.
///
/// Without an explicit column list every Integer or Float column present at
/// fit time is scaled. Scaled columns become Float; a column with zero
/// spread maps to 0.
#[derive(Debug, Clone)]
pub struct Scaler {
    name: String,
    method: ScaleMethod,
    columns: Option<Vec<String>>,
    params: Option<Vec<ScaleParams>>,
}

impl Scaler {
    pub fn new(method: ScaleMethod) -> Self {
        Self {
            name: format!("scale({method})"),
            method,
            columns: None,
            params: None,
        }
    }

    pub fn min_max() -> Self {
        Self::new(ScaleMethod::MinMax)
    }

    pub fn standard() -> Self {
        Self::new(ScaleMethod::Standard)
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn method(&self) -> ScaleMethod {
        self.method
    }

    fn invalid(&self, column: &str, reason: impl Into<String>) -> TransformError {
        TransformError::invalid_column(&self.name, column, reason)
    }

    fn fit_column(&self, dataset: &Dataset, name: &str) -> Result<ScaleParams, TransformError> {
        let column = dataset
            .column(name)
            .ok_or_else(|| self.invalid(name, "column not found"))?;
        let values = column.as_f64s().ok_or_else(|| {
            self.invalid(
                name,
                format!("expected a numeric column, found {}", column.dtype()),
            )
        })?;
        let statistics = match self.method {
            ScaleMethod::MinMax => "min/max",
            ScaleMethod::Standard => "mean/std",
        };
        let observed: Vec<f64> = values
            .into_iter()
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| self.invalid(name, format!("{statistics} undefined over missing values")))?;
        if observed.is_empty() {
            return Err(self.invalid(name, "no values to fit"));
        }
        if observed.iter().any(|x| !x.is_finite()) {
            return Err(self.invalid(
                name,
                format!("{statistics} undefined over non-finite values"),
            ));
        }

        Ok(match self.method {
            ScaleMethod::MinMax => min_max_params(name, &observed),
            ScaleMethod::Standard => standard_params(name, &observed),
        })
    }
}

impl TransformStep for Scaler {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_fit(&self) -> bool {
        true
    }

    fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<(), TransformError> {
        let targets = target_columns(self.columns.as_deref(), dataset, |c| {
            c.dtype().is_numeric()
        });
        let params = targets
            .iter()
            .map(|name| self.fit_column(dataset, name))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(step = %self.name, columns = params.len(), "Fitted scaler");
        self.params = Some(params);
        Ok(())
    }

    fn apply(&self, dataset: &mut Dataset) -> Result<(), TransformError> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| TransformError::unfitted(&self.name))?;

        for p in params {
            let column = dataset
                .column_mut(&p.column)
                .ok_or_else(|| self.invalid(&p.column, "column not found"))?;
            let values = column.as_f64s().ok_or_else(|| {
                self.invalid(
                    &p.column,
                    format!("expected a numeric column, found {}", column.dtype()),
                )
            })?;
            let scaled = values
                .into_iter()
                .map(|v| match v {
                    Some(x) if x.is_finite() => Ok(Value::Float(p.scale(x))),
                    Some(_) => Err(self.invalid(&p.column, "cannot scale non-finite values")),
                    None => Err(self.invalid(&p.column, "cannot scale missing values")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            column
                .set_values(scaled)
                .map_err(|e| self.invalid(&p.column, e.to_string()))?;
        }
        Ok(())
    }
}
