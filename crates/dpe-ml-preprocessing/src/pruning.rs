use dpe_ml_core::{FeatureMatrix, Float, MatrixResult};
use serde::{Deserialize, Serialize};

/// Column ids removed from a feature matrix.
///
/// Computed once from training statistics, then applied to every split so
/// that train and test keep identical column sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropList {
    columns: Vec<String>,
}

impl DropList {
    pub fn new(columns: Vec<String>) -> Self {
        DropList { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.columns.iter().any(|c| c == id)
    }

    /// Remove the listed columns from `x`. Fails with `MissingColumn` if `x`
    /// lacks any of them.
    pub fn apply<T: Float>(&self, x: &FeatureMatrix<T>) -> MatrixResult<FeatureMatrix<T>> {
        x.drop_columns(&self.columns)
    }
}

/// Absolute Pearson correlation between every pair of columns.
///
/// Zero-variance columns correlate 0 with everything (including themselves).
pub fn abs_correlation_matrix<T: Float>(x: &FeatureMatrix<T>) -> Vec<Vec<f64>> {
    let p = x.n_cols();
    let means: Vec<f64> = x.column_means().into_iter().map(|m| m.to_f64()).collect();

    let mut cov = vec![vec![0.0f64; p]; p];
    for row in x.rows() {
        let centered: Vec<f64> = row.iter().zip(&means).map(|(&v, m)| v.to_f64() - m).collect();
        for i in 0..p {
            let ci = centered[i];
            for j in i..p {
                cov[i][j] += ci * centered[j];
            }
        }
    }

    let std: Vec<f64> = (0..p).map(|i| cov[i][i].sqrt()).collect();
    let mut corr = vec![vec![0.0f64; p]; p];
    for i in 0..p {
        for j in i..p {
            let denom = std[i] * std[j];
            let r = if denom > 0.0 { (cov[i][j] / denom).abs().min(1.0) } else { 0.0 };
            corr[i][j] = r;
            corr[j][i] = r;
        }
    }
    corr
}

/// Which member of a highly correlated pair gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunePolicy {
    /// Drop column `i` when its upper-triangle row `r[i][j], j > i` has an
    /// entry above the threshold. Of a correlated pair, the earlier column goes.
    #[default]
    UpperRow,
    /// Drop column `j` when its upper-triangle column `r[i][j], i < j` has an
    /// entry above the threshold. Of a correlated pair, the later column goes.
    UpperColumn,
    /// Walk offending pairs in order and drop the member with the higher mean
    /// absolute correlation to all other columns; pairs touching an already
    /// dropped column are skipped.
    MeanAbsolute,
}

/// Removes redundant features whose absolute correlation exceeds a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPruner {
    pub threshold: f64,
    pub policy: PrunePolicy,
}

impl Default for CorrelationPruner {
    fn default() -> Self {
        CorrelationPruner {
            threshold: 0.9,
            policy: PrunePolicy::UpperRow,
        }
    }
}

impl CorrelationPruner {
    pub fn new(threshold: f64, policy: PrunePolicy) -> Self {
        CorrelationPruner { threshold, policy }
    }

    /// Compute the drop list from a (scaled) training matrix.
    pub fn fit<T: Float>(&self, x: &FeatureMatrix<T>) -> DropList {
        let corr = abs_correlation_matrix(x);
        let p = corr.len();
        let t = self.threshold;

        let drop: Vec<usize> = match self.policy {
            PrunePolicy::UpperRow => (0..p)
                .filter(|&i| (i + 1..p).any(|j| corr[i][j] > t))
                .collect(),
            PrunePolicy::UpperColumn => (0..p)
                .filter(|&j| (0..j).any(|i| corr[i][j] > t))
                .collect(),
            PrunePolicy::MeanAbsolute => {
                let mean_abs: Vec<f64> = (0..p)
                    .map(|i| {
                        let others: f64 = (0..p).filter(|&j| j != i).map(|j| corr[i][j]).sum();
                        if p > 1 { others / (p - 1) as f64 } else { 0.0 }
                    })
                    .collect();
                let mut dropped = vec![false; p];
                for i in 0..p {
                    for j in i + 1..p {
                        if dropped[i] || dropped[j] || corr[i][j] <= t {
                            continue;
                        }
                        if mean_abs[i] > mean_abs[j] {
                            dropped[i] = true;
                        } else {
                            dropped[j] = true;
                        }
                    }
                }
                (0..p).filter(|&k| dropped[k]).collect()
            }
        };

        DropList::new(drop.into_iter().map(|j| x.columns()[j].clone()).collect())
    }
}

/// Removes near-constant features whose variance is below a floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariancePruner {
    pub floor: f64,
}

impl Default for VariancePruner {
    fn default() -> Self {
        VariancePruner { floor: 1e-5 }
    }
}

impl VariancePruner {
    pub fn new(floor: f64) -> Self {
        VariancePruner { floor }
    }

    /// Columns whose population variance is strictly below the floor.
    pub fn fit<T: Float>(&self, x: &FeatureMatrix<T>) -> DropList {
        let ids = x
            .column_variances()
            .into_iter()
            .zip(x.columns())
            .filter(|(v, _)| v.to_f64() < self.floor)
            .map(|(_, id)| id.clone())
            .collect();
        DropList::new(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use dpe_ml_core::MatrixError;

    /// Columns: a, 2a (perfect copy), b (independent), 5.0 (constant).
    fn correlated() -> FeatureMatrix<f64> {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let a = i as f64;
                let b = ((i * 7) % 11) as f64;
                vec![a, 2.0 * a + 1.0, b, 5.0]
            })
            .collect();
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_abs_correlation_matrix() {
        let corr = abs_correlation_matrix(&correlated());
        assert_abs_diff_eq!(corr[0][1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(corr[1][0], 1.0, epsilon = 1e-12);
        assert!(corr[0][2] < 0.9);
        assert_eq!(corr[3][0], 0.0);
        assert_eq!(corr[3][3], 0.0);
    }

    #[test]
    fn test_upper_row_drops_earlier_member() {
        let drop = CorrelationPruner::default().fit(&correlated());
        assert_eq!(drop.columns(), &["0"]);
    }

    #[test]
    fn test_upper_column_drops_later_member() {
        let drop = CorrelationPruner::new(0.9, PrunePolicy::UpperColumn).fit(&correlated());
        assert_eq!(drop.columns(), &["1"]);
    }

    #[test]
    fn test_mean_absolute_drops_one_of_pair() {
        let drop = CorrelationPruner::new(0.9, PrunePolicy::MeanAbsolute).fit(&correlated());
        assert_eq!(drop.len(), 1);
        assert!(drop.contains("0") || drop.contains("1"));
    }

    #[test]
    fn test_never_drops_column_below_threshold_in_its_row() {
        let x = correlated();
        let corr = abs_correlation_matrix(&x);
        for &t in &[0.0, 0.1, 0.5, 0.9, 0.99, 1.0] {
            let drop = CorrelationPruner::new(t, PrunePolicy::UpperRow).fit(&x);
            for (i, id) in x.columns().iter().enumerate() {
                let row_max = (i + 1..x.n_cols()).map(|j| corr[i][j]).fold(0.0, f64::max);
                if row_max <= t {
                    assert!(!drop.contains(id), "column {} dropped at t={}", id, t);
                }
            }
        }
    }

    #[test]
    fn test_variance_pruner() {
        let x = correlated();
        let drop = VariancePruner::default().fit(&x);
        assert_eq!(drop.columns(), &["3"]);

        let kept = drop.apply(&x).unwrap();
        let again = VariancePruner::default().fit(&kept);
        assert!(again.is_empty());

        for (v, id) in kept.column_variances().iter().zip(kept.columns()) {
            assert!(*v >= 1e-5, "kept low variance column {}", id);
        }
    }

    #[test]
    fn test_drop_list_applies_to_both_splits() {
        let x = correlated();
        let train = x.select_rows(&(0..15).collect::<Vec<_>>()).unwrap();
        let test = x.select_rows(&(15..20).collect::<Vec<_>>()).unwrap();

        let drop = CorrelationPruner::default().fit(&train);
        let train_p = drop.apply(&train).unwrap();
        let test_p = drop.apply(&test).unwrap();
        assert_eq!(train_p.columns(), test_p.columns());

        let stale = DropList::new(vec!["missing".into()]);
        assert_eq!(stale.apply(&train), Err(MatrixError::MissingColumn("missing".into())));
    }
}
