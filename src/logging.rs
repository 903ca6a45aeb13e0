//! Fit-log collaborator.
//!
//! The search strategies report sigma distribution summaries and per-step
//! losses through a narrow trait; verbosity 0 resolves it to a no-op. The
//! file-backed implementation buffers everything in memory and performs I/O
//! only when the final profile is written, so nothing blocks inside the
//! algorithmic core.

use crate::sigma::SigmaSummary;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Sink for per-fit statistics.
pub trait FitLog {
    /// Record a sigma distribution summary from a BUILD round.
    fn build_sigma_summary(&mut self, summary: SigmaSummary);

    /// Record a sigma distribution summary from a SWAP iteration.
    fn swap_sigma_summary(&mut self, summary: SigmaSummary);

    /// Record the total loss after an applied swap.
    fn swap_loss(&mut self, loss: f64);

    /// Write the final profile: medoids after BUILD and SWAP, applied step
    /// count, final loss, and the buffered per-iteration statistics.
    fn write_profile(
        &mut self,
        medoids_build: &[usize],
        medoids_final: &[usize],
        steps: usize,
        final_loss: f64,
    ) -> io::Result<()>;
}

/// Log sink that discards everything (verbosity 0).
#[derive(Debug, Default)]
pub struct NoopLog;

impl FitLog for NoopLog {
    fn build_sigma_summary(&mut self, _summary: SigmaSummary) {}

    fn swap_sigma_summary(&mut self, _summary: SigmaSummary) {}

    fn swap_loss(&mut self, _loss: f64) {}

    fn write_profile(
        &mut self,
        _medoids_build: &[usize],
        _medoids_final: &[usize],
        _steps: usize,
        _final_loss: f64,
    ) -> io::Result<()> {
        Ok(())
    }
}

/// Log sink that buffers statistics and writes a plain-text profile file.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    sigma_build: Vec<SigmaSummary>,
    sigma_swap: Vec<SigmaSummary>,
    loss_swap: Vec<f64>,
}

impl FileLog {
    /// Create a file-backed log that will write to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sigma_build: Vec::new(),
            sigma_swap: Vec::new(),
            loss_swap: Vec::new(),
        }
    }
}

impl FitLog for FileLog {
    fn build_sigma_summary(&mut self, summary: SigmaSummary) {
        self.sigma_build.push(summary);
    }

    fn swap_sigma_summary(&mut self, summary: SigmaSummary) {
        self.sigma_swap.push(summary);
    }

    fn swap_loss(&mut self, loss: f64) {
        self.loss_swap.push(loss);
    }

    fn write_profile(
        &mut self,
        medoids_build: &[usize],
        medoids_final: &[usize],
        steps: usize,
        final_loss: f64,
    ) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);

        writeln!(out, "Medoids after BUILD: {}", join_indices(medoids_build))?;
        writeln!(out, "Medoids after SWAP: {}", join_indices(medoids_final))?;
        writeln!(out, "Swap steps: {steps}")?;
        writeln!(out, "Final loss: {final_loss}")?;
        for summary in &self.sigma_build {
            writeln!(out, "Build sigma: {summary}")?;
        }
        for summary in &self.sigma_swap {
            writeln!(out, "Swap sigma: {summary}")?;
        }
        for loss in &self.loss_swap {
            writeln!(out, "Swap loss: {loss}")?;
        }
        out.flush()
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_log_writes_nothing() {
        let mut log = NoopLog;
        log.swap_loss(1.0);
        assert!(log.write_profile(&[0], &[1], 1, 2.0).is_ok());
    }

    #[test]
    fn file_log_writes_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.log");

        let mut log = FileLog::new(&path);
        log.build_sigma_summary(SigmaSummary::from_sigmas(&[1.0, 2.0, 3.0]));
        log.swap_sigma_summary(SigmaSummary::from_sigmas(&[0.5, 0.5]));
        log.swap_loss(12.5);
        log.write_profile(&[1, 4], &[2, 4], 1, 10.0).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Medoids after BUILD: 1,4"));
        assert!(text.contains("Medoids after SWAP: 2,4"));
        assert!(text.contains("Swap steps: 1"));
        assert!(text.contains("Final loss: 10"));
        assert!(text.contains("Build sigma: min: 1"));
        assert!(text.contains("Swap loss: 12.5"));
    }
}
