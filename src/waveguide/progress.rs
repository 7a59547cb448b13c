//! Progress logging for long simulation runs.

use std::time::{Duration, Instant};

use log::info;

/// Rate-limited progress logger with ETA.
pub struct ProgressReporter {
    /// When the run started
    start_time: Instant,
    /// Name of the run (for display)
    name: String,
    /// Total steps
    total_steps: usize,
    /// Minimum time between log lines
    report_interval: Duration,
    /// When we last reported
    last_report: Instant,
    /// Whether to log at all
    verbose: bool,
}

impl ProgressReporter {
    pub fn new(name: impl Into<String>, total_steps: usize) -> Self {
        Self {
            start_time: Instant::now(),
            name: name.into(),
            total_steps,
            report_interval: Duration::from_secs(5),
            last_report: Instant::now(),
            verbose: true,
        }
    }

    /// Set the report interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set whether to log progress
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn eta(&self, step: usize, elapsed: Duration) -> Duration {
        if step == 0 {
            return Duration::ZERO;
        }
        let per_step = elapsed.as_secs_f64() / step as f64;
        let remaining = self.total_steps.saturating_sub(step);
        Duration::from_secs_f64(per_step * remaining as f64)
    }

    /// Log progress if the interval has passed since the last line.
    pub fn report(&mut self, step: usize) {
        if !self.verbose {
            return;
        }
        let now = Instant::now();
        if now.duration_since(self.last_report) < self.report_interval {
            return;
        }

        let elapsed = now.duration_since(self.start_time);
        let progress = if self.total_steps == 0 {
            1.0
        } else {
            step as f64 / self.total_steps as f64
        };
        info!(
            "[{}] {:3.1}% | step {}/{} | elapsed: {:.1}s | ETA: {:.1}s",
            self.name,
            progress * 100.0,
            step,
            self.total_steps,
            elapsed.as_secs_f64(),
            self.eta(step, elapsed).as_secs_f64()
        );
        self.last_report = now;
    }

    /// Final line; `steps` is how many steps actually ran.
    pub fn finish(&self, steps: usize, cancelled: bool) {
        if !self.verbose {
            return;
        }
        let elapsed = self.start_time.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            steps as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        if cancelled {
            info!(
                "[{}] cancelled after {}/{} steps ({:.1}s)",
                self.name,
                steps,
                self.total_steps,
                elapsed.as_secs_f64()
            );
        } else {
            info!(
                "[{}] completed {} steps in {:.1}s ({:.0} steps/s)",
                self.name,
                steps,
                elapsed.as_secs_f64(),
                rate
            );
        }
    }
}
