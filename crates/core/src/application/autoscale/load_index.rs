// Load index: the autoscaler's control signal.

use std::collections::VecDeque;

/// Number of queue-depth samples in the moving window. At the 5 s tick
/// cadence this smooths over ~50 s of load.
pub const WINDOW_SIZE: usize = 10;

/// Scale-up threshold: one more jury wanted per 20 index points.
const SCALE_UP_INDEX: f64 = 20.0;

/// Scale-down threshold. The wide dead band between the two thresholds
/// keeps the controller from oscillating.
const SCALE_DOWN_INDEX: f64 = 2.0;

/// Moving average of claimable-job counts, divided by the believed fleet
/// size, mapped to a fleet-size delta.
pub struct LoadIndex {
    last_n: VecDeque<i64>,
    jury_count: u32,
}

impl LoadIndex {
    pub fn new(jury_count: u32) -> Self {
        Self {
            last_n: VecDeque::with_capacity(WINDOW_SIZE + 1),
            jury_count,
        }
    }

    /// Push one queue-depth sample, dropping the oldest beyond the window.
    pub fn observe(&mut self, enqueued: i64) {
        self.last_n.push_back(enqueued);
        if self.last_n.len() > WINDOW_SIZE {
            self.last_n.pop_front();
        }
    }

    pub fn set_jury_count(&mut self, jury_count: u32) {
        self.jury_count = jury_count;
    }

    /// Desired fleet-size delta for the current window: positive to scale
    /// up (one per 20 index points), `-1` to scale down, `0` inside the
    /// dead band or with an empty window.
    pub fn optimal_change(&self) -> i64 {
        if self.last_n.is_empty() {
            return 0;
        }
        let avg = self.last_n.iter().sum::<i64>() as f64 / self.last_n.len() as f64;
        let index = avg / self.jury_count.max(1) as f64;
        tracing::info!(avg, index, "Average enqueued per jury");

        if index >= SCALE_UP_INDEX {
            (index as i64) / 20
        } else if index < SCALE_DOWN_INDEX {
            -1
        } else {
            0
        }
    }
}
