//! Step loop with progress callback and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::info;

use super::{ProgressReporter, Receiver, Source, StepOutput, Waveguide};
use crate::error::{Result, WaveguideError};

/// Action to take after a step callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Keep stepping
    Continue,
    /// Stop the run; it yields no result
    Stop,
}

/// Progress update passed to the step callback
#[derive(Debug, Clone, Copy)]
pub struct StepProgress {
    /// Zero-based step just completed
    pub step: usize,
    /// Total steps requested
    pub total: usize,
    /// Receiver output of this step
    pub output: StepOutput,
}

impl Waveguide {
    /// Run `steps` steps and collect the receiver output of each.
    ///
    /// `cancel` is polled before every step and `callback` fires after
    /// every step. Either one stopping the run yields `Ok(None)`; a partial
    /// output is never returned.
    pub fn run<F>(
        &mut self,
        source: &Source,
        receiver: &Receiver,
        steps: usize,
        cancel: &AtomicBool,
        mut callback: F,
    ) -> Result<Option<Vec<StepOutput>>>
    where
        F: FnMut(&StepProgress) -> CallbackAction,
    {
        let source_index = self.source_index(source)?;
        let mut receiver = self.receiver_state(receiver)?;
        let injection = self.prepare_source(source, source_index)?;
        receiver.reset();

        info!(
            "running {} steps: source node {}, receiver node {}",
            steps, source_index, receiver.index
        );
        let mut reporter = ProgressReporter::new("waveguide", steps)
            .with_interval(Duration::from_millis(self.config.progress_interval_ms));
        let mut outputs = Vec::with_capacity(steps);

        for step in 0..steps {
            if cancel.load(Ordering::Relaxed) {
                reporter.finish(step, true);
                return Ok(None);
            }

            injection.apply(step, &mut self.buffers.current_mut()[source_index]);
            let output = receiver.sample(self.buffers.current());
            if self.config.check_numerics && !output.is_finite() {
                return Err(WaveguideError::NumericalAnomaly {
                    quantity: "intensity".to_string(),
                    step,
                    index: receiver.index,
                });
            }
            self.update(step)?;
            outputs.push(output);

            let progress = StepProgress {
                step,
                total: steps,
                output,
            };
            if callback(&progress) == CallbackAction::Stop {
                reporter.finish(step + 1, true);
                return Ok(None);
            }
            reporter.report(step + 1);
        }

        reporter.finish(steps, false);
        Ok(Some(outputs))
    }
}
