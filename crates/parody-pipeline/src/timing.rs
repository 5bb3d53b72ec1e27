//! Named timing spans for one request.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use parody_models::TimingReport;
use tokio::time::Instant;

use crate::metrics::record_step;

/// Collects step durations from the moment a request is received.
#[derive(Debug)]
pub struct Timings {
    started: Instant,
    spans: BTreeMap<String, u64>,
}

impl Default for Timings {
    fn default() -> Self {
        Self::start()
    }
}

impl Timings {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            spans: BTreeMap::new(),
        }
    }

    /// Record a finished span. Repeated names accumulate.
    pub fn record(&mut self, name: &str, elapsed: Duration) {
        record_step(name, elapsed);
        *self.spans.entry(name.to_string()).or_insert(0) += elapsed.as_millis() as u64;
    }

    /// Await `future` and record how long it took under `name`.
    pub async fn measure<F: Future>(&mut self, name: &str, future: F) -> F::Output {
        let started = Instant::now();
        let output = future.await;
        self.record(name, started.elapsed());
        output
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Freeze the spans and the total so far into a report.
    pub fn report(&self) -> TimingReport {
        TimingReport {
            spans: self.spans.clone(),
            total: self.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_measure_records_named_spans_and_total() {
        let mut timings = Timings::start();

        timings
            .measure("classify", tokio::time::sleep(Duration::from_millis(120)))
            .await;
        let value = timings
            .measure("storyline", async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                7
            })
            .await;
        assert_eq!(value, 7);

        let report = timings.report();
        assert_eq!(report.span("classify"), Some(120));
        assert_eq!(report.span("storyline"), Some(300));
        assert_eq!(report.total, 420);
    }

    #[test]
    fn test_repeated_span_accumulates() {
        let mut timings = Timings::start();
        timings.record("media", Duration::from_millis(5));
        timings.record("media", Duration::from_millis(7));
        assert_eq!(timings.report().span("media"), Some(12));
    }
}
