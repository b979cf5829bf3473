//! Transform steps.
//!
//! A step is anything implementing [`TransformStep`]. Steps that depend on
//! statistics of the data (scaling bounds, category sets, fill values) learn
//! them in [`TransformStep::fit`] and refuse to [`TransformStep::apply`] until
//! they have been fit. Built-in steps can also be described declaratively with
//! [`StepConfig`], which is how pipeline files name them.

pub mod clean;
pub mod encode;
pub mod impute;
pub mod scale;

pub use clean::Cleaner;
pub use encode::Encoder;
pub use impute::FillMissing;
pub use scale::Scaler;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::{Dataset, Value};
use crate::error::{PipelineError, TransformError};

/// A single transformation in a pipeline.
///
/// Implement this trait to plug custom logic into a
/// [`Pipeline`](crate::pipeline::Pipeline). Stateless steps only need
/// [`name`](Self::name) and [`apply`](Self::apply).
pub trait TransformStep: fmt::Debug + Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether [`fit`](Self::fit) must run before [`apply`](Self::apply).
    fn requires_fit(&self) -> bool {
        false
    }

    fn is_fitted(&self) -> bool {
        true
    }

    /// Learn the statistics this step needs from `dataset`.
    fn fit(&mut self, _dataset: &Dataset) -> Result<(), TransformError> {
        Ok(())
    }

    /// Transform `dataset` in place.
    fn apply(&self, dataset: &mut Dataset) -> Result<(), TransformError>;
}

/// How missing values are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    Median,
    MostFrequent,
    Constant,
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Median => "median",
            ImputeStrategy::MostFrequent => "most_frequent",
            ImputeStrategy::Constant => "constant",
        })
    }
}

/// Numeric scaling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMethod {
    /// `(x - min) / (max - min)`
    #[serde(rename = "minmax", alias = "min_max")]
    MinMax,
    /// `(x - mean) / std`
    #[serde(rename = "standard", alias = "zscore")]
    Standard,
}

impl fmt::Display for ScaleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleMethod::MinMax => "minmax",
            ScaleMethod::Standard => "standard",
        })
    }
}

/// Categorical encoding method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodeMethod {
    /// One 0/1 indicator column per category.
    #[serde(rename = "onehot", alias = "one_hot")]
    OneHot,
    /// Replace each category with its index.
    #[serde(rename = "ordinal")]
    Ordinal,
}

impl fmt::Display for EncodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodeMethod::OneHot => "onehot",
            EncodeMethod::Ordinal => "ordinal",
        })
    }
}

/// What an encoder does with a category it did not see during fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

/// Declarative description of a built-in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepConfig {
    FillMissing {
        strategy: ImputeStrategy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill_value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },
    Scale {
        method: ScaleMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },
    Encode {
        method: EncodeMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Clean {
        #[serde(default)]
        drop_missing: bool,
        #[serde(default = "default_true")]
        drop_duplicates: bool,
        #[serde(default = "default_true")]
        trim_strings: bool,
    },
}

fn default_true() -> bool {
    true
}

impl StepConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StepConfig::FillMissing { .. } => "fill_missing",
            StepConfig::Scale { .. } => "scale",
            StepConfig::Encode { .. } => "encode",
            StepConfig::Clean { .. } => "clean",
        }
    }

    /// Instantiate the step this configuration describes.
    pub fn build(&self) -> Result<Box<dyn TransformStep>, PipelineError> {
        let step: Box<dyn TransformStep> = match self {
            StepConfig::FillMissing {
                strategy,
                fill_value,
                columns,
            } => {
                let step = match (strategy, fill_value) {
                    (ImputeStrategy::Constant, Some(value)) => FillMissing::constant(value.clone()),
                    (ImputeStrategy::Constant, None) => {
                        return Err(PipelineError::InvalidStep {
                            kind: self.kind().to_string(),
                            reason: "strategy 'constant' requires a fill_value".to_string(),
                        });
                    }
                    (strategy, _) => FillMissing::new(*strategy),
                };
                Box::new(with_columns(step, columns, FillMissing::with_columns))
            }
            StepConfig::Scale { method, columns } => Box::new(with_columns(
                Scaler::new(*method),
                columns,
                Scaler::with_columns,
            )),
            StepConfig::Encode {
                method,
                columns,
                handle_unknown,
            } => Box::new(with_columns(
                Encoder::new(*method).with_handle_unknown(*handle_unknown),
                columns,
                Encoder::with_columns,
            )),
            StepConfig::Clean {
                drop_missing,
                drop_duplicates,
                trim_strings,
            } => Box::new(
                Cleaner::new()
                    .drop_missing(*drop_missing)
                    .drop_duplicates(*drop_duplicates)
                    .trim_strings(*trim_strings),
            ),
        };
        Ok(step)
    }
}

fn with_columns<S>(
    step: S,
    columns: &Option<Vec<String>>,
    set: fn(S, Vec<String>) -> S,
) -> S {
    match columns {
        Some(columns) => set(step, columns.clone()),
        None => step,
    }
}

/// Resolve the columns a step works on: the configured list, or every column
/// of `dataset` accepted by `auto`.
pub(crate) fn target_columns(
    configured: Option<&[String]>,
    dataset: &Dataset,
    auto: impl Fn(&crate::dataset::Column) -> bool,
) -> Vec<String> {
    match configured {
        Some(columns) => columns.to_vec(),
        None => dataset
            .columns()
            .iter()
            .filter(|&c| auto(c))
            .map(|c| c.name().to_string())
            .collect(),
    }
}
