//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use dataflux_core::config::{self, DataFluxConfig, PipelineFile};
use dataflux_core::dataset::ColumnStats;
use dataflux_core::loader::{CsvOptions, CsvSource, DataSource};
use dataflux_core::Dataset;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run { pipeline, output } => {
            let config = resolve_config(workspace, config_file)?;
            handle_run(&pipeline, output, &config)
        }
        Commands::Inspect {
            path,
            delimiter,
            limit,
            json,
        } => {
            let config = resolve_config(workspace, config_file)?;
            handle_inspect(&path, delimiter, limit, json, &config)
        }
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn resolve_config(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<DataFluxConfig> {
    let config = match config_file {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Some(workspace), None),
    };
    config.map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

fn handle_run(
    pipeline_path: &Path,
    output: Option<PathBuf>,
    config: &DataFluxConfig,
) -> anyhow::Result<()> {
    let file = PipelineFile::load(pipeline_path)
        .map_err(|e| anyhow::anyhow!("Failed to read pipeline {}: {}", pipeline_path.display(), e))?;

    tracing::info!(pipeline = %pipeline_path.display(), "Running pipeline file");
    let result = file.execute(config)?;

    let delimiter = config.output.delimiter as u8;
    match output.or(file.output.map(|o| o.path)) {
        Some(path) => {
            write_dataset(&result, BufWriter::new(File::create(&path)?), delimiter)?;
            tracing::info!(
                path = %path.display(),
                rows = result.n_rows(),
                columns = result.n_columns(),
                "Wrote output"
            );
        }
        None => write_dataset(&result, io::stdout().lock(), delimiter)?,
    }
    Ok(())
}

fn write_dataset(dataset: &Dataset, writer: impl Write, delimiter: u8) -> anyhow::Result<()> {
    dataset.write_csv(writer, delimiter)?;
    Ok(())
}

fn handle_inspect(
    path: &Path,
    delimiter: Option<char>,
    limit: Option<usize>,
    json: bool,
    config: &DataFluxConfig,
) -> anyhow::Result<()> {
    let mut options = CsvOptions::from(&config.csv);
    if let Some(d) = delimiter {
        options.delimiter = d;
    }
    let dataset = CsvSource::with_options(path, options).load(limit)?;
    let stats = dataset.describe();

    if json {
        let report = serde_json::json!({
            "schema": dataset.schema(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}: {} rows x {} columns\n",
            path.display(),
            dataset.n_rows(),
            dataset.n_columns()
        );
        print!("{}", format_stats(&stats));
    }
    Ok(())
}

/// Render column statistics as an aligned text table.
fn format_stats(stats: &[ColumnStats]) -> String {
    let number = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".into());
    let rows: Vec<[String; 7]> = stats
        .iter()
        .map(|s| {
            [
                s.name.clone(),
                s.dtype.to_string(),
                s.null_count.to_string(),
                s.unique_count.to_string(),
                number(s.min),
                number(s.max),
                number(s.mean),
            ]
        })
        .collect();

    let header = ["column", "type", "nulls", "unique", "min", "max", "mean"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut push_line = |cells: &[&str]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    };
    push_line(&header);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_line(&cells);
    }
    out
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = config::workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&DataFluxConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(workspace, config_file)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
