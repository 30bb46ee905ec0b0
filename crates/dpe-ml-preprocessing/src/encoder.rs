use std::collections::{BTreeSet, HashMap};

use dpe_ml_core::{Float, MatrixError, MatrixResult};
use serde::{Deserialize, Serialize};

/// Encode string labels as integers `0..k-1`, in sorted label order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) {
        let unique: BTreeSet<&str> = labels.iter().map(|s| s.as_ref()).collect();
        self.classes = unique.into_iter().map(String::from).collect();
        self.rebuild_index();
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform<S: AsRef<str>, T: Float>(&self, labels: &[S]) -> MatrixResult<Vec<T>> {
        if self.classes.is_empty() {
            return Err(MatrixError::NotFitted("LabelEncoder"));
        }
        labels
            .iter()
            .map(|s| {
                let s = s.as_ref();
                self.code(s).map(T::from_usize).ok_or_else(|| {
                    MatrixError::InvalidOperation(format!("unseen label `{}`", s))
                })
            })
            .collect()
    }

    pub fn fit_transform<S: AsRef<str>, T: Float>(&mut self, labels: &[S]) -> MatrixResult<Vec<T>> {
        self.fit(labels);
        self.transform(labels)
    }

    pub fn inverse_transform(&self, codes: &[usize]) -> MatrixResult<Vec<String>> {
        codes
            .iter()
            .map(|&c| {
                self.classes.get(c).cloned().ok_or(MatrixError::IndexOutOfBounds {
                    index: c,
                    axis: 0,
                    size: self.classes.len(),
                })
            })
            .collect()
    }

    fn code(&self, label: &str) -> Option<usize> {
        if self.index.len() == self.classes.len() {
            self.index.get(label).copied()
        } else {
            // deserialized encoders have no index yet
            self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
    }
}
