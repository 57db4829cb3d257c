use std::path::Path;

use crate::error::{Result, WganError};
use crate::gan::task::TaskKind;
use crate::io::idx::MnistProvider;
use crate::math::matrix::Matrix;

/// Paired training examples held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    conditions: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
}

impl Dataset {
    /// Checks that both sides have the same length and that every row of a
    /// side has the same width.
    pub fn new(conditions: Vec<Vec<f64>>, targets: Vec<Vec<f64>>) -> Result<Dataset> {
        if conditions.len() != targets.len() {
            return Err(WganError::Data(format!(
                "{} conditions but {} targets",
                conditions.len(),
                targets.len()
            )));
        }
        for (side, rows) in [("condition", &conditions), ("target", &targets)] {
            if let Some(first) = rows.first() {
                if let Some(i) = rows.iter().position(|r| r.len() != first.len()) {
                    return Err(WganError::Data(format!(
                        "{side} row {i} has {} values, expected {}",
                        rows[i].len(),
                        first.len()
                    )));
                }
            }
        }
        Ok(Dataset { conditions, targets })
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn condition_dims(&self) -> usize {
        self.conditions.first().map_or(0, Vec::len)
    }

    pub fn target_dims(&self) -> usize {
        self.targets.first().map_or(0, Vec::len)
    }

    pub fn conditions(&self) -> &[Vec<f64>] {
        &self.conditions
    }

    pub fn targets(&self) -> &[Vec<f64>] {
        &self.targets
    }

    /// Gathers the rows at `indices` as `(conditions, targets)`.
    pub fn batch(&self, indices: &[usize]) -> (Matrix, Matrix) {
        let x = indices.iter().map(|&i| self.conditions[i].clone()).collect();
        let y = indices.iter().map(|&i| self.targets[i].clone()).collect();
        (Matrix::from_data(x), Matrix::from_data(y))
    }
}

/// Loads a `Dataset` from disk.
pub trait DataProvider {
    fn load(&self, path: &Path) -> Result<Dataset>;
}

/// Default provider for each task.
pub fn provider_for(task: TaskKind) -> Box<dyn DataProvider> {
    match task {
        TaskKind::Vector => Box::new(JetTableProvider::default()),
        TaskKind::Image => Box::new(MnistProvider::default()),
    }
}

/// Whitespace-separated table of matched parton and reco jets.
///
/// Each row holds eight columns, `pt eta phi E` for the parton (condition)
/// followed by the same four for the reconstructed jet (target). Columns are
/// normalized over the whole file before the training split is taken:
/// pt and E as `(v - min) / max`, eta and phi as z-scores.
#[derive(Debug, Clone)]
pub struct JetTableProvider {
    pub header_rows: usize,
    /// Leading share of rows used for training; the rest is held out.
    pub train_fraction: f64,
}

impl Default for JetTableProvider {
    fn default() -> Self {
        JetTableProvider { header_rows: 2, train_fraction: 0.8 }
    }
}

const JET_COLUMNS: usize = 8;

impl JetTableProvider {
    pub fn parse(&self, text: &str) -> Result<Dataset> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (number, line) in text.lines().enumerate().skip(self.header_rows) {
            if line.trim().is_empty() {
                continue;
            }
            let row = line.split_whitespace()
                .map(|cell| cell.parse::<f64>().map_err(|e| {
                    WganError::Data(format!("line {}: '{cell}': {e}", number + 1))
                }))
                .collect::<Result<Vec<f64>>>()?;
            if row.len() != JET_COLUMNS {
                return Err(WganError::Data(format!(
                    "line {}: expected {JET_COLUMNS} columns, found {}",
                    number + 1,
                    row.len()
                )));
            }
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(WganError::Data("jet table has no data rows".into()));
        }

        for offset in [0, 4] {
            normalize_min_over_max(&mut rows, offset)?;
            normalize_z_score(&mut rows, offset + 1)?;
            normalize_z_score(&mut rows, offset + 2)?;
            normalize_min_over_max(&mut rows, offset + 3)?;
        }

        let split = (self.train_fraction * rows.len() as f64) as usize;
        if split == 0 {
            return Err(WganError::Data(format!(
                "training split of {} rows at fraction {} is empty",
                rows.len(),
                self.train_fraction
            )));
        }
        rows.truncate(split);
        let (conditions, targets) = rows.into_iter()
            .map(|mut row| {
                let target = row.split_off(4);
                (row, target)
            })
            .unzip();
        Dataset::new(conditions, targets)
    }
}

impl DataProvider for JetTableProvider {
    fn load(&self, path: &Path) -> Result<Dataset> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WganError::Data(format!("{}: {e}", path.display())))?;
        self.parse(&text)
    }
}

fn normalize_min_over_max(rows: &mut [Vec<f64>], column: usize) -> Result<()> {
    let min = rows.iter().map(|r| r[column]).fold(f64::INFINITY, f64::min);
    let max = rows.iter().map(|r| r[column]).fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        return Err(WganError::Data(format!("column {column} has a zero maximum")));
    }
    for row in rows.iter_mut() {
        row[column] = (row[column] - min) / max;
    }
    Ok(())
}

fn normalize_z_score(rows: &mut [Vec<f64>], column: usize) -> Result<()> {
    let n = rows.len() as f64;
    let mean = rows.iter().map(|r| r[column]).sum::<f64>() / n;
    let std = (rows.iter().map(|r| (r[column] - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return Err(WganError::Data(format!("column {column} is constant")));
    }
    for row in rows.iter_mut() {
        row[column] = (row[column] - mean) / std;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
parton pt eta phi E   reco pt eta phi E
-----
10 -1 0.5 20   12 -1.1 0.4 22
20  0 1.5 40   18  0.1 1.6 38
30  1 2.5 60   33  0.9 2.4 61
40  0 1.5 80   41  0.1 1.6 79
50  0 1.5 100  49  0.0 1.5 99
";

    #[test]
    fn normalizes_and_splits() {
        let data = JetTableProvider::default().parse(TABLE).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!((data.condition_dims(), data.target_dims()), (4, 4));
        // pt: (10 - 10) / 50, (20 - 10) / 50
        assert_eq!(data.conditions()[0][0], 0.0);
        assert!((data.conditions()[1][0] - 0.2).abs() < 1e-12);
        // eta z-score over all five rows: mean 0, std sqrt(0.4)
        assert!((data.conditions()[0][1] + 1.0 / 0.4f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ragged_rows_are_reported_with_line_numbers() {
        let err = JetTableProvider::default().parse("h\nh\n1 2 3\n").unwrap_err();
        assert!(matches!(err, WganError::Data(msg) if msg.starts_with("line 3")));
    }

    #[test]
    fn mismatched_sides_are_rejected() {
        assert!(Dataset::new(vec![vec![1.0]], vec![]).is_err());
        assert!(Dataset::new(vec![vec![1.0], vec![1.0, 2.0]], vec![vec![0.0], vec![0.0]]).is_err());
    }

    #[test]
    fn batch_gathers_rows() {
        let data = Dataset::new(
            vec![vec![0.0], vec![1.0], vec![2.0]],
            vec![vec![10.0], vec![11.0], vec![12.0]],
        ).unwrap();
        let (x, y) = data.batch(&[2, 0]);
        assert_eq!(x.data, vec![vec![2.0], vec![0.0]]);
        assert_eq!(y.data, vec![vec![12.0], vec![10.0]]);
    }

    #[test]
    fn empty_training_split_is_rejected() {
        let provider = JetTableProvider { header_rows: 2, train_fraction: 0.1 };
        let err = provider.parse(TABLE).unwrap_err();
        assert!(matches!(err, WganError::Data(msg) if msg.contains("split")));
    }
}
