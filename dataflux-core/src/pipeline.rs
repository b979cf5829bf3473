//! Pipeline orchestration.
//!
//! A [`Pipeline`] runs an ordered sequence of [`TransformStep`]s over a
//! dataset. Each step is fit (when it needs statistics and has none yet) and
//! then applied, strictly in sequence order; the first failure aborts the run
//! and is returned unchanged. Order is never inferred: a scaler placed before
//! imputation sees the missing values and fails.

use std::time::Instant;

use crate::dataset::Dataset;
use crate::error::{PipelineError, TransformError};
use crate::preprocess::{StepConfig, TransformStep};

/// Assembles the step sequence of a [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    steps: Vec<Box<dyn TransformStep>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from declarative step descriptions, in order.
    pub fn from_configs(configs: &[StepConfig]) -> Result<Self, PipelineError> {
        let steps = configs
            .iter()
            .map(StepConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    /// Append a step.
    pub fn step(self, step: impl TransformStep + 'static) -> Self {
        self.boxed_step(Box::new(step))
    }

    pub fn boxed_step(mut self, step: Box<dyn TransformStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Insert a step before the step currently at `position`.
    ///
    /// `position == len()` appends. Anything larger is an error.
    pub fn insert_step(
        mut self,
        position: usize,
        step: impl TransformStep + 'static,
    ) -> Result<Self, PipelineError> {
        if position > self.steps.len() {
            return Err(PipelineError::InvalidPosition {
                position,
                len: self.steps.len(),
            });
        }
        self.steps.insert(position, Box::new(step));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn build(self) -> Pipeline {
        Pipeline { steps: self.steps }
    }
}

/// An ordered, fixed sequence of transform steps.
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<Box<dyn TransformStep>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Whether every step that needs fitting has been fit.
    pub fn is_fitted(&self) -> bool {
        self.steps.iter().all(|s| !s.requires_fit() || s.is_fitted())
    }

    /// Run every step in order, fitting steps that have not been fit yet.
    ///
    /// Steps that were already fit keep their statistics, so a pipeline fit
    /// on training data can be run again on new data.
    pub fn run(&mut self, dataset: Dataset) -> Result<Dataset, TransformError> {
        self.execute(dataset, FitMode::IfNeeded)
    }

    /// Run every step in order, refitting every step that needs statistics.
    pub fn fit_transform(&mut self, dataset: Dataset) -> Result<Dataset, TransformError> {
        self.execute(dataset, FitMode::Always)
    }

    /// Apply every step without fitting. Fails on the first unfit step.
    pub fn apply(&self, mut dataset: Dataset) -> Result<Dataset, TransformError> {
        for (index, step) in self.steps.iter().enumerate() {
            if step.requires_fit() && !step.is_fitted() {
                return Err(TransformError::unfitted(step.name()));
            }
            tracing::debug!(index, step = step.name(), "Applying step");
            step.apply(&mut dataset)?;
        }
        Ok(dataset)
    }

    fn execute(&mut self, mut dataset: Dataset, mode: FitMode) -> Result<Dataset, TransformError> {
        let start = Instant::now();
        tracing::info!(
            steps = self.steps.len(),
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "Running pipeline"
        );

        for (index, step) in self.steps.iter_mut().enumerate() {
            let refit = match mode {
                FitMode::Always => step.requires_fit(),
                FitMode::IfNeeded => step.requires_fit() && !step.is_fitted(),
            };
            if refit {
                tracing::debug!(index, step = step.name(), "Fitting step");
                step.fit(&dataset).inspect_err(|e| {
                    tracing::warn!(index, step = step.name(), error = %e, "Step failed to fit");
                })?;
            }
            tracing::debug!(index, step = step.name(), "Applying step");
            step.apply(&mut dataset).inspect_err(|e| {
                tracing::warn!(index, step = step.name(), error = %e, "Step failed to apply");
            })?;
        }

        tracing::info!(
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline finished"
        );
        Ok(dataset)
    }
}

#[derive(Debug, Clone, Copy)]
enum FitMode {
    IfNeeded,
    Always,
}
