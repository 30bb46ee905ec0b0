use std::path::Path;

use dpe_ml_core::{FeatureMatrix, MatrixError, MatrixResult};

use crate::error::{IoError, IoResult};

/// A CSV file kept as strings, for columns that still need typing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    pub fn column_index(&self, name: &str) -> MatrixResult<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| MatrixError::MissingColumn(name.to_string()))
    }

    /// Cells of column `j`, one per record.
    pub fn column(&self, j: usize) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(move |r| r.get(j).map(String::as_str).unwrap_or(""))
    }
}

/// Read a CSV file with a header row without interpreting the cells.
pub fn read_raw<P: AsRef<Path>>(path: P) -> IoResult<RawTable> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        records.push(record.iter().map(|f| f.trim().to_string()).collect());
    }
    Ok(RawTable { headers, records })
}

fn parse_cell(value: &str, column: &str, row: usize) -> IoResult<f64> {
    value.trim().parse().map_err(|_| IoError::Parse {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

/// Read a numeric CSV file into a feature matrix. The header row supplies
/// the column ids.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> IoResult<FeatureMatrix<f64>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut data = Vec::new();
    let mut n_rows = 0usize;
    for result in rdr.records() {
        let record = result?;
        if record.len() != headers.len() {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![headers.len()],
                got: vec![record.len()],
            }
            .into());
        }
        for (field, column) in record.iter().zip(&headers) {
            data.push(parse_cell(field, column, n_rows)?);
        }
        n_rows += 1;
    }

    Ok(FeatureMatrix::new(data, n_rows, headers)?)
}

/// Write a feature matrix with a header row of its column ids.
pub fn write_matrix<P: AsRef<Path>>(path: P, x: &FeatureMatrix<f64>) -> IoResult<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record(x.columns())?;
    for row in x.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush().map_err(|e| IoError::io(path.as_ref(), e))?;
    Ok(())
}

/// Read a single-column target file.
pub fn read_target<P: AsRef<Path>>(path: P) -> IoResult<Vec<f64>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let column = rdr.headers()?.get(0).unwrap_or("target").trim().to_string();

    let mut y = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        if record.len() != 1 {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![1],
                got: vec![record.len()],
            }
            .into());
        }
        y.push(parse_cell(&record[0], &column, row)?);
    }
    Ok(y)
}

pub fn write_target<P: AsRef<Path>>(path: P, name: &str, y: &[f64]) -> IoResult<()> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    wtr.write_record([name])?;
    for v in y {
        wtr.write_record([v.to_string()])?;
    }
    wtr.flush().map_err(|e| IoError::io(path.as_ref(), e))?;
    Ok(())
}
