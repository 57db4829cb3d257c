use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, WganError};

/// Persists named loss series.
pub trait LossLogSink {
    /// `columns` are written in the given order.
    fn write(&self, prefix: &str, columns: &[(&str, &[f64])]) -> Result<()>;
}

/// Writes `<root>/<prefix>losses.csv`.
///
/// The first column is the row index with an empty header, followed by one
/// column per series. Shorter series leave trailing cells empty.
#[derive(Debug, Clone)]
pub struct CsvLossLog {
    root: PathBuf,
}

impl CsvLossLog {
    pub fn new(root: &Path) -> CsvLossLog {
        CsvLossLog { root: root.to_path_buf() }
    }

    pub fn path(&self, prefix: &str) -> PathBuf {
        self.root.join(format!("{prefix}losses.csv"))
    }
}

impl LossLogSink for CsvLossLog {
    fn write(&self, prefix: &str, columns: &[(&str, &[f64])]) -> Result<()> {
        let path = self.path(prefix);
        let persistence = |e: std::io::Error| WganError::Persistence { path: path.clone(), detail: e.to_string() };
        let file = std::fs::File::create(&path).map_err(persistence)?;
        let mut out = std::io::BufWriter::new(file);

        let header: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        writeln!(out, ",{}", header.join(",")).map_err(persistence)?;
        let rows = columns.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
        for i in 0..rows {
            let cells: Vec<String> = columns.iter()
                .map(|(_, values)| values.get(i).map_or_else(String::new, f64::to_string))
                .collect();
            writeln!(out, "{i},{}", cells.join(",")).map_err(persistence)?;
        }
        out.flush().map_err(persistence)
    }
}
