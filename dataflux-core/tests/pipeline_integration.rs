//! End-to-end pipeline tests: load, transform, write.

use dataflux_core::loader::{CsvSource, DataSource};
use dataflux_core::preprocess::{Encoder, FillMissing, Scaler, StepConfig};
use dataflux_core::{
    Column, ColumnType, Dataset, PipelineBuilder, PipelineFile, TransformError, TransformStep,
    Value,
};
use pretty_assertions::assert_eq;

fn floats(ds: &Dataset, name: &str) -> Vec<f64> {
    ds.column(name)
        .unwrap()
        .values()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

#[test]
fn minmax_scales_age_column() {
    let ds = Dataset::new(vec![Column::from_i64("age", [20, 30, 40])]).unwrap();
    let mut pipeline = PipelineBuilder::new()
        .step(Scaler::min_max().with_columns(vec!["age".into()]))
        .build();
    let out = pipeline.run(ds).unwrap();
    assert_eq!(floats(&out, "age"), vec![0.0, 0.5, 1.0]);
}

#[test]
fn fill_then_scale_succeeds() {
    let ds = Dataset::new(vec![Column::from_options("x", [Some(1i64), None, Some(3)])]).unwrap();
    let mut pipeline = PipelineBuilder::new()
        .step(FillMissing::mean())
        .step(Scaler::min_max())
        .build();
    let out = pipeline.run(ds).unwrap();
    assert_eq!(floats(&out, "x"), vec![0.0, 0.5, 1.0]);
}

#[test]
fn scale_then_fill_fails_in_scaler() {
    let ds = Dataset::new(vec![Column::from_options("x", [Some(1i64), None, Some(3)])]).unwrap();
    let mut pipeline = PipelineBuilder::new()
        .step(Scaler::min_max())
        .step(FillMissing::mean())
        .build();
    match pipeline.run(ds).unwrap_err() {
        TransformError::InvalidColumn {
            step,
            column,
            reason,
        } => {
            assert_eq!(step, "scale(minmax)");
            assert_eq!(column, "x");
            assert!(reason.contains("min/max undefined"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

/// Doubles every numeric value in place.
#[derive(Debug)]
struct Double;

impl TransformStep for Double {
    fn name(&self) -> &str {
        "double"
    }

    fn apply(&self, dataset: &mut Dataset) -> Result<(), TransformError> {
        let numeric: Vec<String> = dataset
            .columns()
            .iter()
            .filter(|c| c.dtype().is_numeric())
            .map(|c| c.name().to_string())
            .collect();
        for name in numeric {
            let column = dataset.column_mut(&name).unwrap();
            let doubled = column
                .values()
                .iter()
                .map(|v| v.as_f64().map_or(Value::Null, |x| Value::Float(x * 2.0)))
                .collect();
            column
                .set_values(doubled)
                .map_err(|e| TransformError::invalid_column("double", &name, e.to_string()))?;
        }
        Ok(())
    }
}

#[test]
fn custom_step_runs_at_inserted_position() {
    let ds = Dataset::new(vec![Column::from_i64("x", [0, 5, 10])]).unwrap();
    let mut pipeline = PipelineBuilder::new()
        .step(Scaler::min_max())
        .insert_step(1, Double)
        .unwrap()
        .build();
    assert_eq!(pipeline.step_names(), vec!["scale(minmax)", "double"]);
    let out = pipeline.run(ds).unwrap();
    assert_eq!(floats(&out, "x"), vec![0.0, 1.0, 2.0]);
}

#[test]
fn custom_step_before_scaler() {
    let ds = Dataset::new(vec![Column::from_i64("x", [0, 5, 10])]).unwrap();
    let mut pipeline = PipelineBuilder::new()
        .step(Scaler::min_max())
        .insert_step(0, Double)
        .unwrap()
        .build();
    let out = pipeline.run(ds).unwrap();
    assert_eq!(floats(&out, "x"), vec![0.0, 0.5, 1.0]);
}

#[test]
fn one_hot_then_scale_numeric_only() {
    let ds = Dataset::new(vec![
        Column::from_i64("age", [20, 40]),
        Column::from_strs("city", ["Oslo", "Rome"]),
    ])
    .unwrap();
    let mut pipeline = PipelineBuilder::new()
        .step(Scaler::min_max())
        .step(Encoder::one_hot())
        .build();
    let out = pipeline.run(ds).unwrap();
    assert_eq!(
        out.column_names(),
        vec!["age", "city", "city_Oslo", "city_Rome"]
    );
    assert_eq!(floats(&out, "age"), vec![0.0, 1.0]);
    assert_eq!(out.column("city_Rome").unwrap().dtype(), ColumnType::Integer);
}

#[test]
fn csv_file_through_configured_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("customers.csv");
    std::fs::write(
        &csv_path,
        "id,age,city\n1,20,Oslo\n2,,Rome\n3,40,Oslo\n3,40,Oslo\n",
    )
    .unwrap();

    let file = PipelineFile::from_toml_str(
        r#"
[source]
type = "csv"
path = "customers.csv"

[[steps]]
kind = "clean"

[[steps]]
kind = "fill_missing"
strategy = "median"
columns = ["age"]

[[steps]]
kind = "scale"
method = "minmax"
columns = ["age"]

[[steps]]
kind = "encode"
method = "onehot"
columns = ["city"]
"#,
    )
    .unwrap();

    let ds = CsvSource::new(&csv_path).load(None).unwrap();
    let mut pipeline = PipelineBuilder::from_configs(&file.steps).unwrap().build();
    let out = pipeline.run(ds).unwrap();

    assert_eq!(out.n_rows(), 3);
    assert_eq!(floats(&out, "age"), vec![0.0, 0.5, 1.0]);
    assert_eq!(
        out.column("city_Oslo").unwrap().values(),
        &[Value::Int(1), Value::Int(0), Value::Int(1)]
    );

    let mut written = Vec::new();
    out.write_csv(&mut written, b',').unwrap();
    let text = String::from_utf8(written).unwrap();
    assert_eq!(
        text.lines().next(),
        Some("id,age,city,city_Oslo,city_Rome")
    );
}

#[test]
fn configured_steps_match_hand_built() {
    let configs = vec![StepConfig::Scale {
        method: dataflux_core::ScaleMethod::Standard,
        columns: None,
    }];
    let ds = Dataset::new(vec![Column::from_f64("x", [1.0, 3.0])]).unwrap();

    let mut from_config = PipelineBuilder::from_configs(&configs).unwrap().build();
    let mut by_hand = PipelineBuilder::new().step(Scaler::standard()).build();
    assert_eq!(
        from_config.run(ds.clone()).unwrap(),
        by_hand.run(ds).unwrap()
    );
}
