use dpe_ml_core::{MatrixError, MatrixResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of one train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter. The first `n % k` folds get one extra row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl KFold {
    /// Contiguous, unshuffled folds.
    pub fn new(n_splits: usize) -> Self {
        KFold {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn shuffled(n_splits: usize, seed: Option<u64>) -> Self {
        KFold {
            n_splits,
            shuffle: true,
            seed,
        }
    }

    pub fn split(&self, n_samples: usize) -> MatrixResult<Vec<Fold>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(MatrixError::invalid_parameter("n_splits", "must be at least 2"));
        }
        if n_samples < k {
            return Err(MatrixError::invalid_parameter(
                "n_splits",
                format!("cannot split {} samples into {} folds", n_samples, k),
            ));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let base = n_samples / k;
        let remainder = n_samples % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let size = if i < remainder { base + 1 } else { base };
            let end = start + size;
            let test = indices[start..end].to_vec();
            let train = indices[..start].iter().chain(&indices[end..]).copied().collect();
            folds.push(Fold { train, test });
            start = end;
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_sizes() {
        let folds = KFold::new(3).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[0].test, vec![0, 1, 2, 3]);
        assert_eq!(folds[1].train, vec![0, 1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn test_folds_partition_rows() {
        let folds = KFold::shuffled(4, Some(3)).split(17).unwrap();
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.iter().copied()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..17).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 17);
            assert!(fold.test.iter().all(|i| !fold.train.contains(i)));
        }
    }

    #[test]
    fn test_invalid_split() {
        assert!(matches!(KFold::new(1).split(10), Err(MatrixError::InvalidParameter { .. })));
        assert!(matches!(KFold::new(5).split(3), Err(MatrixError::InvalidParameter { .. })));
    }
}
