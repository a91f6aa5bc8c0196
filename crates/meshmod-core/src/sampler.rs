//! Windowed running-average accumulator for radio signal samples
//!
//! The radio stack delivers signal-strength measurements asynchronously,
//! one 8-bit sample at a time, and at a rate far too noisy to report
//! directly. The accumulator batches a fixed window of consecutive
//! samples into one average, then starts the next window from scratch -
//! disjoint batch averages, not a sliding or exponentially-weighted mean.
//!
//! The execution model is single-threaded and cooperative: samples and
//! start/stop requests arrive on different call paths but never
//! concurrently, so ordering is event arrival order and no locking is
//! needed. A late sample still in flight when a new window starts simply
//! folds into the new window.

/// Number of samples per completed window; the average covers
/// `WINDOW + 1` samples because the recompute triggers on the sample
/// that pushes the count past the window.
pub const WINDOW: u16 = 50;

/// Accumulation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Not measuring; incoming samples are dropped
    Idle,
    /// Collecting samples toward the next window rollover
    Accumulating,
}

/// Fixed-window running-average engine for a noisy async signal
///
/// Owned by the link it measures. Mutated only by sample delivery and
/// explicit start/stop requests.
#[derive(Debug, Clone)]
pub struct SampleAccumulator {
    state: State,
    sample_count: u16,
    sample_sum: i32,
    running_average: Option<i8>,
}

impl SampleAccumulator {
    /// Create an idle accumulator with no reported average yet
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            sample_count: 0,
            sample_sum: 0,
            running_average: None,
        }
    }

    /// Begin accumulating, resetting the window
    ///
    /// Idempotent: starting while already accumulating discards the
    /// partial window and begins a fresh one. The last computed average
    /// is kept until the next rollover replaces it.
    pub fn start(&mut self) {
        self.sample_count = 0;
        self.sample_sum = 0;
        self.state = State::Accumulating;
    }

    /// Stop accumulating
    ///
    /// The in-progress partial window is discarded; the last completed
    /// average remains the reported value.
    pub fn stop(&mut self) {
        self.state = State::Idle;
        self.sample_count = 0;
        self.sample_sum = 0;
    }

    /// Whether the accumulator is currently collecting samples
    pub fn is_accumulating(&self) -> bool {
        self.state == State::Accumulating
    }

    /// Feed one asynchronous sample
    ///
    /// Dropped without effect while idle. On crossing the window the
    /// average is recomputed with truncating integer division and the
    /// window resets.
    pub fn on_sample(&mut self, value: i8) {
        if self.state == State::Idle {
            return;
        }

        self.sample_count += 1;
        self.sample_sum += i32::from(value);

        if self.sample_count > WINDOW {
            self.running_average = Some((self.sample_sum / i32::from(self.sample_count)) as i8);
            self.sample_count = 0;
            self.sample_sum = 0;
        }
    }

    /// Last completed window average, if any window has completed yet
    pub fn average(&self) -> Option<i8> {
        self.running_average
    }

    /// Samples collected toward the current window
    pub fn sample_count(&self) -> u16 {
        self.sample_count
    }

    /// Sum of samples in the current window
    pub fn sample_sum(&self) -> i32 {
        self.sample_sum
    }
}

impl Default for SampleAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
