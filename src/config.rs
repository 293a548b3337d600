use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the pipeline and the server find their files.
///
/// Defaults mirror the project layout (`data/raw`, `data/processed`,
/// `data/features`, `models/saved`, `monitoring/logs`). A JSON file may
/// override any subset; relative entries are taken from the project root.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectPaths {
    pub raw_data: PathBuf,
    pub processed_data: PathBuf,
    pub features_data: PathBuf,
    pub model: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("data/raw/taxi_fares.csv"),
            processed_data: PathBuf::from("data/processed/processed_taxi_fares.csv"),
            features_data: PathBuf::from("data/features/features_taxi_fares.csv"),
            model: PathBuf::from("models/saved/linear_regression_taxi_fare.json"),
            log_dir: PathBuf::from("monitoring/logs"),
        }
    }
}

impl ProjectPaths {
    /// Default layout under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        Self::default().rooted(root.as_ref())
    }

    /// Loads overrides from a JSON file and resolves them against `root`.
    pub fn load(path: impl AsRef<Path>, root: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: ProjectPaths = serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON in {}", path.display()))?;
        Ok(cfg.rooted(root.as_ref()))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("app.log")
    }

    fn rooted(self, root: &Path) -> Self {
        let at = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };
        Self {
            raw_data: at(self.raw_data),
            processed_data: at(self.processed_data),
            features_data: at(self.features_data),
            model: at(self.model),
            log_dir: at(self.log_dir),
        }
    }
}
