//! Offline data pipeline. Each stage is a plain function; `run` chains them
//! in order and stops at the first error.

use anyhow::{Context, Result};
use csv::Reader;
use std::fs::File;
use std::path::Path;

use crate::config::ProjectPaths;
use crate::dataset::{self, TripRecord};
use crate::features::build_feature_records;
use crate::model::{warmup, LinearModel};

/// raw -> processed. Returns the number of rows written, or `None` when there was no raw data.
pub fn make_dataset(paths: &ProjectPaths) -> Result<Option<usize>> {
    let raw = dataset::load_raw_data(&paths.raw_data)?;
    if raw.is_empty() {
        return Ok(None);
    }
    let cleaned = dataset::clean_data(raw);
    dataset::save_processed_data(&cleaned, &paths.processed_data)?;
    Ok(Some(cleaned.len()))
}

/// processed -> features. Returns `None` when the processed table is missing.
pub fn build_features(paths: &ProjectPaths) -> Result<Option<usize>> {
    if !paths.processed_data.exists() {
        tracing::warn!(
            "processed data not found at {}; run make-dataset first",
            paths.processed_data.display()
        );
        return Ok(None);
    }
    let trips: Vec<TripRecord> = dataset::read_csv(&paths.processed_data)?;
    let records = build_feature_records(trips);
    tracing::info!("feature engineering complete for {} rows", records.len());

    dataset::write_csv(&records, &paths.features_data)?;
    tracing::info!("features saved to {}", paths.features_data.display());
    Ok(Some(records.len()))
}

/// (rows, columns) of a CSV table with a header line.
pub fn table_shape(path: &Path) -> Result<(usize, usize)> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let mut reader = Reader::from_reader(file);
    let cols = reader.headers()?.len();
    let mut rows = 0;
    for record in reader.records() {
        record.with_context(|| format!("Failed to read {:?}", path))?;
        rows += 1;
    }
    Ok((rows, cols))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineReport {
    pub processed_rows: Option<usize>,
    pub feature_rows: Option<usize>,
    pub features_shape: Option<(usize, usize)>,
    pub model_checked: bool,
}

pub fn run(paths: &ProjectPaths) -> Result<PipelineReport> {
    tracing::info!("starting training pipeline");
    let mut report = PipelineReport::default();

    tracing::info!("[step 1] making dataset");
    report.processed_rows = make_dataset(paths).context("pipeline failed at make-dataset")?;

    tracing::info!("[step 2] building features");
    report.feature_rows = build_features(paths).context("pipeline failed at build-features")?;

    if paths.features_data.exists() {
        let shape = table_shape(&paths.features_data)?;
        tracing::info!("[step 3] features shape: ({}, {})", shape.0, shape.1);
        report.features_shape = Some(shape);
    } else {
        tracing::warn!("features file not found at {}", paths.features_data.display());
    }

    // Training happens outside this tool; only verify what it produced.
    if paths.model.exists() {
        let model = LinearModel::load(&paths.model).context("pipeline failed at model check")?;
        warmup(&model)?;
        tracing::info!("[step 4] model artifact {} matches serving columns", paths.model.display());
        report.model_checked = true;
    } else {
        tracing::warn!("no model artifact at {}; train one before serving", paths.model.display());
    }

    tracing::info!("training pipeline completed");
    Ok(report)
}
