use std::collections::BTreeMap;
use std::path::Path;

use dpe_ml_core::FeatureMatrix;
use dpe_ml_io::{read_raw, FeatureBundle, RawTable};
use dpe_ml_preprocessing::{train_test_split, LabelEncoder, MeanImputer, MinMaxScaler, MinMaxStats};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

/// Output of a preparation run, with the fitted encoders kept for reference.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub bundle: FeatureBundle,
    pub encoders: BTreeMap<String, LabelEncoder>,
    pub minmax: MinMaxStats<f64>,
}

/// Turns the raw diagnostics CSV into a train/test feature bundle.
///
/// Declared numeric columns are coerced to numbers (bad cells become
/// missing), other text columns are label encoded, missing values are
/// mean-imputed, declared numeric columns are min-max normalized, and rows
/// are shuffled and split.
#[derive(Debug, Clone)]
pub struct DatasetPreparer {
    config: PipelineConfig,
}

fn parse_or_nan(cell: &str) -> f64 {
    if cell.is_empty() {
        return f64::NAN;
    }
    cell.parse().unwrap_or(f64::NAN)
}

impl DatasetPreparer {
    pub fn new(config: PipelineConfig) -> Self {
        DatasetPreparer { config }
    }

    /// Read `<root>/data/<raw_file>`, prepare it and write the bundle.
    pub fn run<P: AsRef<Path>>(&self, root: P) -> PipelineResult<PreparedDataset> {
        let root = root.as_ref();
        let raw_path = self.config.raw_path(root);
        info!(path = %raw_path.display(), "reading raw dataset");
        let table = read_raw(&raw_path)?;

        let prepared = self.prepare(&table)?;
        prepared
            .bundle
            .save(self.config.processed_path(root), &self.config.target_column)?;
        Ok(prepared)
    }

    pub fn prepare(&self, table: &RawTable) -> PipelineResult<PreparedDataset> {
        let target = &self.config.target_column;
        let mut scaled_ids = self.config.numeric_columns.clone();
        if !scaled_ids.contains(target) {
            scaled_ids.push(target.clone());
        }
        for id in &scaled_ids {
            table.column_index(id)?;
        }
        if table.n_rows() == 0 {
            return Err(PipelineError::ShapeMismatch { expected: vec![1], got: vec![0] });
        }

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(table.headers.len());
        let mut encoders = BTreeMap::new();
        for (j, name) in table.headers.iter().enumerate() {
            let cells: Vec<&str> = table.column(j).collect();
            let numeric = scaled_ids.contains(name)
                || cells.iter().all(|c| c.is_empty() || c.parse::<f64>().is_ok());
            if numeric {
                columns.push(cells.iter().map(|c| parse_or_nan(c)).collect());
            } else {
                let mut encoder = LabelEncoder::new();
                columns.push(encoder.fit_transform(&cells)?);
                debug!(column = %name, classes = encoder.classes().len(), "label encoded");
                encoders.insert(name.clone(), encoder);
            }
        }

        let frame = FeatureMatrix::from_columns(&columns, table.headers.clone())?;
        let frame = MeanImputer::new().fit_transform(&frame)?;
        let scaler = MinMaxScaler::new();
        let (frame, minmax) = scaler.fit_transform(&frame, &scaled_ids)?;

        let y = frame.column(frame.column_index(target)?)?;
        let x = frame.drop_columns(std::slice::from_ref(target))?;
        let (x_train, x_test, y_train, y_test) =
            train_test_split(&x, &y, self.config.test_ratio, Some(self.config.split_seed))?;
        let bundle = FeatureBundle::new(x_train, x_test, y_train, y_test)?;

        info!(
            rows = table.n_rows(),
            features = x.n_cols(),
            encoded = encoders.len(),
            train = bundle.y_train.len(),
            test = bundle.y_test.len(),
            "prepared dataset"
        );
        Ok(PreparedDataset { bundle, encoders, minmax })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::fs;

    fn config() -> PipelineConfig {
        PipelineConfig {
            numeric_columns: vec!["consommation_energie".into(), "surface_habitable".into()],
            ..PipelineConfig::default()
        }
    }

    fn table() -> RawTable {
        let rows = [
            ["100", "50", "gaz", "3"],
            ["200", "n/a", "fioul", "1"],
            ["300", "70", "gaz", ""],
            ["400", "90", "bois", "2"],
            ["500", "", "fioul", "2"],
        ];
        RawTable {
            headers: vec![
                "consommation_energie".into(),
                "surface_habitable".into(),
                "energie_chauffage".into(),
                "code_postal_rang".into(),
            ],
            records: rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect(),
        }
    }

    #[test]
    fn test_prepare_encodes_imputes_and_splits() {
        let prepared = DatasetPreparer::new(config()).prepare(&table()).unwrap();
        let bundle = &prepared.bundle;

        assert_eq!(bundle.x_train.n_rows(), 4);
        assert_eq!(bundle.x_test.n_rows(), 1);
        assert_eq!(
            bundle.x_train.columns(),
            &["surface_habitable", "energie_chauffage", "code_postal_rang"]
        );
        assert_eq!(prepared.encoders["energie_chauffage"].classes(), &["bois", "fioul", "gaz"]);
        assert!(!prepared.encoders.contains_key("code_postal_rang"));

        // targets were min-max scaled from 100..500
        let mut y: Vec<f64> = bundle.y_train.iter().chain(&bundle.y_test).copied().collect();
        y.sort_by(f64::total_cmp);
        assert_eq!(y, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        // surface: 50, 70, 90 present, the mean 70 fills the gaps, then scaled to [0, 1]
        let mut surface: Vec<f64> = bundle
            .x_train
            .column(0)
            .unwrap()
            .into_iter()
            .chain(bundle.x_test.column(0).unwrap())
            .collect();
        surface.sort_by(f64::total_cmp);
        for (got, want) in surface.iter().zip([0.0, 0.5, 0.5, 0.5, 1.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }

        // undeclared numeric column is imputed with its mean (2.0) but not rescaled
        let mut rang: Vec<f64> = bundle
            .x_train
            .column(2)
            .unwrap()
            .into_iter()
            .chain(bundle.x_test.column(2).unwrap())
            .collect();
        rang.sort_by(f64::total_cmp);
        assert_eq!(rang, vec![1.0, 2.0, 2.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_declared_column() {
        let config = PipelineConfig {
            numeric_columns: vec!["nombre_niveaux".into()],
            ..config()
        };
        let err = DatasetPreparer::new(config).prepare(&table()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "nombre_niveaux"));
    }

    #[test]
    fn test_run_writes_bundle() {
        let root = std::env::temp_dir().join("dpe-ml-prepare-run");
        let config = config();
        fs::create_dir_all(root.join(&config.data_dir)).unwrap();
        fs::write(
            config.raw_path(&root),
            "consommation_energie,surface_habitable,energie_chauffage\n\
             120,40,gaz\n80,35,fioul\n60,,gaz\n150,90,bois\n90,60,gaz\n",
        )
        .unwrap();

        let prepared = DatasetPreparer::new(config.clone()).run(&root).unwrap();
        let loaded = FeatureBundle::load(config.processed_path(&root)).unwrap();
        assert_eq!(loaded.x_train.columns(), prepared.bundle.x_train.columns());
        assert_eq!(loaded.y_train.len(), 4);
        assert_eq!(loaded.y_test.len(), 1);
    }
}
