//! Run metrics and the end-of-run report.

use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{info, warn};

/// Counters collected over one run.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    /// Completed iterations (basket/payment pairs generated).
    pub iterations: u64,
    pub baskets_produced: u64,
    pub payments_produced: u64,
    /// Explicit broker flushes issued mid-run.
    pub flushes: u64,
    pub documents_written: u64,
    /// Documents lost to conversion or write errors.
    pub document_failures: u64,
    /// Record pairs that could not be appended to the dump files.
    pub file_failures: u64,
    pub total_duration: Duration,
}

impl RunMetrics {
    /// Calculate iterations per second.
    pub fn iterations_per_second(&self) -> f64 {
        if self.total_duration.as_secs_f64() > 0.0 {
            self.iterations as f64 / self.total_duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Log the operator report.
    pub fn report(&self, started_at: DateTime<Local>, ended_at: DateTime<Local>) {
        info!("**** DONE Processing ****");
        info!("Start                  : {started_at}");
        info!("End                    : {ended_at}");
        info!(
            "Elapsed time (seconds) : {:.3}",
            self.total_duration.as_secs_f64()
        );
        info!("Records processed      : {}", self.iterations);
        info!(
            "Messages produced      : {} baskets, {} payments ({} flushes)",
            self.baskets_produced, self.payments_produced, self.flushes
        );
        info!("Documents written      : {}", self.documents_written);
        info!(
            "Throughput             : {:.2} records/sec",
            self.iterations_per_second()
        );

        if self.document_failures > 0 {
            warn!(
                "{} documents were not written to the document store",
                self.document_failures
            );
        }
        if self.file_failures > 0 {
            warn!(
                "{} record pairs were not written to the dump files",
                self.file_failures
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterations_per_second() {
        let metrics = RunMetrics {
            iterations: 50,
            total_duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(metrics.iterations_per_second(), 25.0);
    }

    #[test]
    fn test_zero_duration_is_zero_rate() {
        let metrics = RunMetrics {
            iterations: 10,
            ..Default::default()
        };
        assert_eq!(metrics.iterations_per_second(), 0.0);
    }
}
