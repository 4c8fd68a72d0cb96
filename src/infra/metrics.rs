// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the running training loss to a CSV file every
// `print_every` iterations, next to the checkpoints of the run.
//
// Example CSV output:
//   iteration,average_loss
//   1,8.912301
//   2,8.874522
//   ...
//
// Resumed runs append to the same file, so one CSV covers the
// whole history of a run directory.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "iteration,average_loss";

/// One row: the mean per-token loss over the last print interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationMetrics {
    pub iteration:    usize,
    pub average_loss: f64,
}

impl IterationMetrics {
    pub fn new(iteration: usize, average_loss: f64) -> Self {
        Self { iteration, average_loss }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory and the CSV header if they don't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row
    pub fn log(&self, m: &IterationMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6}", m.iteration, m.average_loss)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_appended_across_loggers() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&IterationMetrics::new(1, 2.5)).unwrap();

        // A resumed run opens the same file again
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&IterationMetrics::new(2, 2.25)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![HEADER, "1,2.500000", "2,2.250000"]);
    }
}
