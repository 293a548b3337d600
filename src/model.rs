use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::ModelError;
use crate::types::FEATURE_COLUMNS;

/// A pre-trained single-row regressor. Implementations must be reentrant:
/// the server calls `predict` concurrently from many requests without locking.
pub trait Regressor: Send + Sync {
    /// Column order the model was fitted on.
    fn feature_names(&self) -> &[String];

    fn predict(&self, row: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// On-disk form of a fitted linear regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn from_artifact(artifact: LinearArtifact) -> Result<Self> {
        if artifact.coefficients.len() != artifact.feature_names.len() {
            bail!(
                "artifact has {} coefficients for {} features",
                artifact.coefficients.len(),
                artifact.feature_names.len()
            );
        }
        check_column_contract(&artifact.feature_names)?;
        Ok(Self {
            feature_names: artifact.feature_names,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact at {}", path.display()))?;
        let artifact: LinearArtifact = serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
        Self::from_artifact(artifact)
            .with_context(|| format!("model artifact {} is unusable", path.display()))
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.coefficients.len() {
            return Err(ModelError::FeatureLength {
                got: row.len(),
                expected: self.coefficients.len(),
            });
        }
        let y = row
            .iter()
            .zip(&self.coefficients)
            .fold(self.intercept, |acc, (x, w)| acc + x * w);
        Ok(vec![y])
    }
}

/// Fails unless `names` is exactly the serving column order.
pub fn check_column_contract(names: &[String]) -> Result<()> {
    if names.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
        bail!(
            "model expects columns {:?}, serving builds {:?}",
            names,
            FEATURE_COLUMNS
        );
    }
    Ok(())
}

/// Probe forward on an all-zero row so a broken model fails at startup, not on the first request.
pub fn warmup(model: &dyn Regressor) -> Result<f64> {
    let out = model
        .predict(&vec![0.0; model.feature_names().len()])
        .context("warmup prediction failed")?;
    match out.first() {
        Some(y) if y.is_finite() => Ok(*y),
        Some(y) => bail!("warmup prediction is not finite: {}", y),
        None => bail!("warmup prediction returned no values"),
    }
}
