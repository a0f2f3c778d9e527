//! Vector data set loading.
//!
//! The data file holds one vector per line as whitespace-separated integers.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::DataError;

/// Dense row-major matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: Vec<Vec<f64>>,
}

/// Wire form of a matrix, checked by `from_rows` before use
#[derive(Deserialize)]
struct RawMatrix {
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = DataError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        Matrix::from_rows(raw.rows)
    }
}

impl Matrix {
    /// Build a matrix from rows that must all have the same length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DataError> {
        let expected = match rows.first() {
            Some(first) => first.len(),
            None => return Err(DataError::Empty),
        };
        for (i, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(DataError::Ragged {
                    line: i + 1,
                    expected,
                    found: row.len(),
                });
            }
        }
        Ok(Self { rows })
    }

    /// Matrix of the same shape with every entry zero
    pub fn zeros_like(other: &Matrix) -> Self {
        Self {
            rows: other.rows.iter().map(|r| vec![0.0; r.len()]).collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    /// `self += weight * other`; shapes must match
    pub fn add_scaled(&mut self, weight: f64, other: &Matrix) -> Result<(), DataError> {
        if self.shape() != other.shape() {
            return Err(DataError::Shape {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        for (dst, src) in self.rows.iter_mut().zip(&other.rows) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += weight * s;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.rows {
            let line = row
                .iter()
                .map(|v| format!("{:.6}", v))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Parse vectors from text, one row per non-blank line
pub fn parse_vectors(content: &str) -> Result<Matrix, DataError> {
    let mut rows = Vec::new();
    let mut expected: Option<usize> = None;

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<i64>()
                    .map(|v| v as f64)
                    .map_err(|_| DataError::Parse {
                        line: idx + 1,
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match expected {
            None => expected = Some(row.len()),
            Some(n) if n != row.len() => {
                return Err(DataError::Ragged {
                    line: idx + 1,
                    expected: n,
                    found: row.len(),
                });
            }
            Some(_) => {}
        }

        rows.push(row);
    }

    Matrix::from_rows(rows)
}

/// Read the data file into a matrix
pub fn load_vectors(path: &Path) -> Result<Matrix, DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_vectors(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_rows() {
        let m = parse_vectors("1 2 3\n4 5 6\n\n7  8\t9\n").unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.rows()[2], vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        match parse_vectors("1 2 3\n4 5\n") {
            Err(DataError::Ragged { line, expected, found }) => {
                assert_eq!((line, expected, found), (2, 3, 2));
            }
            other => panic!("expected ragged error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_integers() {
        match parse_vectors("1 2\n3 x\n") {
            Err(DataError::Parse { line, token }) => {
                assert_eq!(line, 2);
                assert_eq!(token, "x");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(matches!(parse_vectors("1.5 2"), Err(DataError::Parse { .. })));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(matches!(parse_vectors("\n  \n"), Err(DataError::Empty)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "-1 0 1").unwrap();
        writeln!(file, "2 3 4").unwrap();

        let m = load_vectors(file.path()).unwrap();
        assert_eq!(m.rows()[0], vec![-1.0, 0.0, 1.0]);

        let missing = load_vectors(Path::new("/nonexistent/adac/data.txt"));
        assert!(matches!(missing, Err(DataError::Io { .. })));
    }

    #[test]
    fn test_add_scaled() {
        let mut acc = parse_vectors("1 1\n1 1").unwrap();
        let other = parse_vectors("2 4\n6 8").unwrap();
        acc.add_scaled(0.5, &other).unwrap();
        assert_eq!(acc.rows(), &[vec![2.0, 3.0], vec![4.0, 5.0]]);

        let wrong = parse_vectors("1 2 3").unwrap();
        match acc.add_scaled(1.0, &wrong) {
            Err(DataError::Shape { expected, found }) => {
                assert_eq!(expected, (2, 2));
                assert_eq!(found, (1, 3));
            }
            other => panic!("expected shape error, got {:?}", other),
        }
        // Accumulator untouched on mismatch
        assert_eq!(acc.rows(), &[vec![2.0, 3.0], vec![4.0, 5.0]]);
    }

    #[test]
    fn test_decode_checks_row_lengths() {
        let m: Matrix = serde_json::from_str(r#"{"rows":[[1.0,2.0],[3.0,4.0]]}"#).unwrap();
        assert_eq!(m.shape(), (2, 2));

        let ragged = serde_json::from_str::<Matrix>(r#"{"rows":[[1.0,2.0],[3.0]]}"#);
        assert!(ragged.is_err());

        let empty = serde_json::from_str::<Matrix>(r#"{"rows":[]}"#);
        assert!(empty.is_err());
    }
}
