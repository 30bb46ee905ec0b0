use crate::dtype::Float;
use crate::error::{MatrixError, MatrixResult};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Two-dimensional feature table with stable column identities.
///
/// Stores values in a flat row-major `Vec<T>`. Every column carries a string
/// id that survives row selection and column drops, so a drop list computed
/// on one split can be applied to another by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct FeatureMatrix<T: Float> {
    data: Vec<T>,
    n_rows: usize,
    columns: Vec<String>,
}

/// Column ids used when a matrix is built without names: `"0"`, `"1"`, ...
pub fn default_column_ids(n_cols: usize) -> Vec<String> {
    (0..n_cols).map(|j| j.to_string()).collect()
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> FeatureMatrix<T> {
    /// Create a matrix from row-major data and column ids.
    pub fn new(data: Vec<T>, n_rows: usize, columns: Vec<String>) -> MatrixResult<Self> {
        if data.len() != n_rows * columns.len() {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![n_rows, columns.len()],
                got: vec![data.len()],
            });
        }
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(MatrixError::InvalidOperation(format!(
                    "duplicate column id `{}`",
                    c
                )));
            }
        }
        Ok(FeatureMatrix { data, n_rows, columns })
    }

    /// Create a matrix from rows, naming columns `"0".."p-1"`.
    pub fn from_rows(rows: &[Vec<T>]) -> MatrixResult<Self> {
        let n_cols = rows.first().map_or(0, |r| r.len());
        Self::from_rows_named(rows, default_column_ids(n_cols))
    }

    /// Create a matrix from rows with explicit column ids.
    pub fn from_rows_named(rows: &[Vec<T>], columns: Vec<String>) -> MatrixResult<Self> {
        let n_cols = columns.len();
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(MatrixError::ShapeMismatch {
                    expected: vec![n_cols],
                    got: vec![row.len()],
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, rows.len(), columns)
    }

    /// Create a matrix from column vectors of equal length.
    pub fn from_columns(cols: &[Vec<T>], columns: Vec<String>) -> MatrixResult<Self> {
        if cols.len() != columns.len() {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![columns.len()],
                got: vec![cols.len()],
            });
        }
        let n_rows = cols.first().map_or(0, |c| c.len());
        if let Some(bad) = cols.iter().find(|c| c.len() != n_rows) {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![n_rows],
                got: vec![bad.len()],
            });
        }
        let mut data = Vec::with_capacity(n_rows * cols.len());
        for i in 0..n_rows {
            for col in cols {
                data.push(col[i]);
            }
        }
        Self::new(data, n_rows, columns)
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> MatrixResult<T> {
        if row >= self.n_rows {
            return Err(MatrixError::IndexOutOfBounds { index: row, axis: 0, size: self.n_rows });
        }
        if col >= self.n_cols() {
            return Err(MatrixError::IndexOutOfBounds { index: col, axis: 1, size: self.n_cols() });
        }
        Ok(self.data[row * self.n_cols() + col])
    }

    /// Borrow row `i`. Panics if `i` is out of bounds, like slice indexing.
    pub fn row(&self, i: usize) -> &[T] {
        let p = self.n_cols();
        &self.data[i * p..(i + 1) * p]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Copy of column `j`.
    pub fn column(&self, j: usize) -> MatrixResult<Vec<T>> {
        if j >= self.n_cols() {
            return Err(MatrixError::IndexOutOfBounds { index: j, axis: 1, size: self.n_cols() });
        }
        Ok(self.rows().map(|r| r[j]).collect())
    }

    /// Position of the column named `id`.
    pub fn column_index(&self, id: &str) -> MatrixResult<usize> {
        self.columns
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| MatrixError::MissingColumn(id.to_string()))
    }

    // ─── Selection ──────────────────────────────────────────────────────────

    /// New matrix holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> MatrixResult<Self> {
        let mut data = Vec::with_capacity(indices.len() * self.n_cols());
        for &i in indices {
            if i >= self.n_rows {
                return Err(MatrixError::IndexOutOfBounds { index: i, axis: 0, size: self.n_rows });
            }
            data.extend_from_slice(self.row(i));
        }
        Ok(FeatureMatrix {
            data,
            n_rows: indices.len(),
            columns: self.columns.clone(),
        })
    }

    /// New matrix holding the given columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> MatrixResult<Self> {
        let p = self.n_cols();
        if let Some(&bad) = indices.iter().find(|&&j| j >= p) {
            return Err(MatrixError::IndexOutOfBounds { index: bad, axis: 1, size: p });
        }
        let mut data = Vec::with_capacity(self.n_rows * indices.len());
        for row in self.rows() {
            data.extend(indices.iter().map(|&j| row[j]));
        }
        let columns = indices.iter().map(|&j| self.columns[j].clone()).collect();
        Self::new(data, self.n_rows, columns)
    }

    /// Drop the named columns. Every name must exist.
    pub fn drop_columns(&self, ids: &[String]) -> MatrixResult<Self> {
        let mut dropped = HashSet::with_capacity(ids.len());
        for id in ids {
            dropped.insert(self.column_index(id)?);
        }
        let keep: Vec<usize> = (0..self.n_cols()).filter(|j| !dropped.contains(j)).collect();
        self.select_columns(&keep)
    }

    /// Apply `f(col, value)` to every element.
    pub fn map_columns<F: Fn(usize, T) -> T>(&self, f: F) -> Self {
        let p = self.n_cols().max(1);
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(k, &v)| f(k % p, v))
            .collect();
        FeatureMatrix {
            data,
            n_rows: self.n_rows,
            columns: self.columns.clone(),
        }
    }

    // ─── Column statistics ──────────────────────────────────────────────────

    /// Per-column arithmetic mean.
    pub fn column_means(&self) -> Vec<T> {
        let p = self.n_cols();
        let mut sums = vec![T::ZERO; p];
        for row in self.rows() {
            for (s, &v) in sums.iter_mut().zip(row) {
                *s += v;
            }
        }
        if self.n_rows == 0 {
            return sums;
        }
        let n = T::from_usize(self.n_rows);
        sums.into_iter().map(|s| s / n).collect()
    }

    /// Per-column population variance (ddof = 0).
    pub fn column_variances(&self) -> Vec<T> {
        let means = self.column_means();
        let mut acc = vec![T::ZERO; self.n_cols()];
        for row in self.rows() {
            for ((a, &v), &m) in acc.iter_mut().zip(row).zip(&means) {
                let d = v - m;
                *a += d * d;
            }
        }
        if self.n_rows == 0 {
            return acc;
        }
        let n = T::from_usize(self.n_rows);
        acc.into_iter().map(|a| a / n).collect()
    }

    // ─── Alignment ──────────────────────────────────────────────────────────

    /// Check that `other` has exactly the same column ids, in the same order.
    pub fn ensure_same_columns(&self, other: &FeatureMatrix<T>) -> MatrixResult<()> {
        if self.n_cols() != other.n_cols() {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![self.n_cols()],
                got: vec![other.n_cols()],
            });
        }
        match self.columns.iter().zip(&other.columns).find(|(a, b)| a != b) {
            Some((a, _)) => Err(MatrixError::MissingColumn(a.clone())),
            None => Ok(()),
        }
    }
}

impl<T: Float> fmt::Display for FeatureMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FeatureMatrix({} x {}) [{}]", self.n_rows, self.n_cols(), self.columns.join(", "))?;
        for row in self.rows().take(5) {
            let cells: Vec<String> = row.iter().take(8).map(|v| format!("{:.4}", v)).collect();
            writeln!(f, "  [{}{}]", cells.join(", "), if row.len() > 8 { ", ..." } else { "" })?;
        }
        if self.n_rows > 5 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}
