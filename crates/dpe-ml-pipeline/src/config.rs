use std::fs;
use std::path::{Path, PathBuf};

use dpe_ml_preprocessing::PrunePolicy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};

/// Settings shared by the preparation and training binaries.
///
/// Every path is relative to the invocation root. Missing fields in
/// `dpe.json` keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub raw_file: String,
    pub processed_dir: PathBuf,
    pub model_dir: PathBuf,
    pub model_file: String,

    pub target_column: String,
    /// Columns coerced to numbers and min-max normalized during preparation.
    pub numeric_columns: Vec<String>,
    pub test_ratio: f64,
    pub split_seed: u64,

    pub correlation_threshold: f64,
    pub prune_policy: PrunePolicy,
    pub variance_floor: f64,

    pub n_trials: usize,
    pub n_startup_trials: usize,
    pub search_seed: Option<u64>,
    pub model_seed: u64,

    pub stacking_folds: usize,
    pub cv_folds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let numeric = [
            "consommation_energie",
            "surface_habitable",
            "annee_construction",
            "nombre_niveaux",
            "surface_verriere",
            "surface_baies_orientees_nord",
            "surface_baies_orientees_est_ouest",
            "surface_baies_orientees_sud",
            "surface_planchers_hauts_deperditifs",
            "surface_planchers_bas_deperditifs",
            "surface_parois_verticales_opaques_deperditives",
        ];
        PipelineConfig {
            data_dir: PathBuf::from("data"),
            raw_file: "geo_dep_95.csv".to_string(),
            processed_dir: PathBuf::from("data").join("processed"),
            model_dir: PathBuf::from("models"),
            model_file: "stacking_energy_model.json".to_string(),
            target_column: "consommation_energie".to_string(),
            numeric_columns: numeric.iter().map(|s| s.to_string()).collect(),
            test_ratio: 0.2,
            split_seed: 42,
            correlation_threshold: 0.9,
            prune_policy: PrunePolicy::UpperRow,
            variance_floor: 1e-5,
            n_trials: 10,
            n_startup_trials: 4,
            search_seed: Some(42),
            model_seed: 42,
            stacking_folds: 5,
            cv_folds: 3,
        }
    }
}

impl PipelineConfig {
    pub const FILE_NAME: &'static str = "dpe.json";

    /// Read `<root>/dpe.json` if it exists, otherwise use the defaults.
    pub fn load<P: AsRef<Path>>(root: P) -> PipelineResult<Self> {
        let path = root.as_ref().join(Self::FILE_NAME);
        if !path.exists() {
            return Ok(PipelineConfig::default());
        }
        let bad = |reason: String| PipelineError::Config { path: path.clone(), reason };
        let text = fs::read_to_string(&path).map_err(|e| bad(e.to_string()))?;
        let config: PipelineConfig = serde_json::from_str(&text).map_err(|e| bad(e.to_string()))?;
        config.validate().map_err(bad)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(format!("test_ratio {} must be in (0, 1)", self.test_ratio));
        }
        if self.n_trials == 0 {
            return Err("n_trials must be at least 1".into());
        }
        if self.stacking_folds < 2 || self.cv_folds < 2 {
            return Err("stacking_folds and cv_folds must be at least 2".into());
        }
        if !(self.correlation_threshold >= 0.0 && self.correlation_threshold <= 1.0) {
            return Err(format!("correlation_threshold {} must be in [0, 1]", self.correlation_threshold));
        }
        if !(self.variance_floor >= 0.0) {
            return Err(format!("variance_floor {} must be >= 0", self.variance_floor));
        }
        Ok(())
    }

    pub fn raw_path(&self, root: &Path) -> PathBuf {
        root.join(&self.data_dir).join(&self.raw_file)
    }

    pub fn processed_path(&self, root: &Path) -> PathBuf {
        root.join(&self.processed_dir)
    }

    pub fn model_path(&self, root: &Path) -> PathBuf {
        root.join(&self.model_dir).join(&self.model_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("dpe-ml-config").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_file() {
        let root = scratch("empty");
        let _ = fs::remove_file(root.join(PipelineConfig::FILE_NAME));
        let config = PipelineConfig::load(&root).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.numeric_columns.len(), 11);
        assert_eq!(
            config.model_path(&root),
            root.join("models").join("stacking_energy_model.json")
        );
    }

    #[test]
    fn test_partial_override() {
        let root = scratch("partial");
        fs::write(
            root.join(PipelineConfig::FILE_NAME),
            r#"{ "n_trials": 3, "prune_policy": "mean_absolute" }"#,
        )
        .unwrap();
        let config = PipelineConfig::load(&root).unwrap();
        assert_eq!(config.n_trials, 3);
        assert_eq!(config.prune_policy, PrunePolicy::MeanAbsolute);
        assert_eq!(config.cv_folds, 3);
    }

    #[test]
    fn test_invalid_file() {
        let root = scratch("invalid");
        fs::write(root.join(PipelineConfig::FILE_NAME), r#"{ "test_ratio": 1.5 }"#).unwrap();
        assert!(matches!(PipelineConfig::load(&root), Err(PipelineError::Config { .. })));

        fs::write(root.join(PipelineConfig::FILE_NAME), "not json").unwrap();
        assert!(matches!(PipelineConfig::load(&root), Err(PipelineError::Config { .. })));
    }
}
