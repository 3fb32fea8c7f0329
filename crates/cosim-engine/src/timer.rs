//! Real-time pacing and measured real-time factor.
//!
//! The real-time factor (RTF) is simulated time over wall-clock time.  The
//! timer always measures it, both since the start and over a rolling window
//! of the last `steps_to_monitor` steps.  When real-time simulation is
//! enabled it also tells the caller how long to sleep after each step so the
//! simulation does not run faster than `target × wall clock`.

use std::collections::VecDeque;
use std::time::Instant;

use cosim_core::{CosimError, CosimResult, TimePoint};

pub const DEFAULT_STEPS_TO_MONITOR: usize = 5;

/// Read-only view of the timer's configuration and measurements.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RealTimeMetrics {
    pub total_average:    f64,
    pub rolling_average:  f64,
    pub target:           f64,
    pub enabled:          bool,
    pub steps_to_monitor: usize,
}

#[derive(Debug)]
pub struct RealTimeTimer {
    enabled:          bool,
    target:           f64,
    steps_to_monitor: usize,
    /// Pacing reference, reset whenever pacing is (re)configured.
    pace_origin:      Option<(Instant, TimePoint)>,
    measure_origin:   Option<(Instant, TimePoint)>,
    window:           VecDeque<(Instant, TimePoint)>,
    total_average:    f64,
    rolling_average:  f64,
}

impl Default for RealTimeTimer {
    fn default() -> Self {
        Self {
            enabled:          false,
            target:           1.0,
            steps_to_monitor: DEFAULT_STEPS_TO_MONITOR,
            pace_origin:      None,
            measure_origin:   None,
            window:           VecDeque::new(),
            total_average:    0.0,
            rolling_average:  0.0,
        }
    }
}

fn factor(from: (Instant, TimePoint), to: (Instant, TimePoint)) -> f64 {
    let wall = to.0.duration_since(from.0).as_secs_f64();
    if wall <= 0.0 {
        return 0.0;
    }
    (to.1 - from.1).as_secs_f64() / wall
}

impl RealTimeTimer {
    /// Reset all references at simulation time `time`.
    pub fn start(&mut self, time: TimePoint) {
        let now = Instant::now();
        self.pace_origin = Some((now, time));
        self.measure_origin = Some((now, time));
        self.window.clear();
        self.window.push_back((now, time));
    }

    /// Record a completed step ending at `time` and return how long the
    /// caller should sleep to keep pace.
    pub fn step_complete(&mut self, time: TimePoint) -> Option<std::time::Duration> {
        let now = Instant::now();
        let origin = *self.measure_origin.get_or_insert((now, time));
        self.total_average = factor(origin, (now, time));

        self.window.push_back((now, time));
        while self.window.len() > self.steps_to_monitor + 1 {
            self.window.pop_front();
        }
        if let Some(&oldest) = self.window.front() {
            self.rolling_average = factor(oldest, (now, time));
        }

        if !self.enabled {
            return None;
        }
        let Some((wall_origin, sim_origin)) = self.pace_origin else {
            self.pace_origin = Some((now, time));
            return None;
        };
        let due = (time - sim_origin).as_secs_f64() / self.target;
        let elapsed = now.duration_since(wall_origin).as_secs_f64();
        (due > elapsed).then(|| std::time::Duration::from_secs_f64(due - elapsed))
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.pace_origin = None;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_target(&mut self, target: f64) -> CosimResult<()> {
        if !(target.is_finite() && target > 0.0) {
            return Err(CosimError::InvalidArgument(format!(
                "real-time factor target must be positive, got {target}"
            )));
        }
        self.target = target;
        self.pace_origin = None;
        Ok(())
    }

    pub fn set_steps_to_monitor(&mut self, steps: usize) -> CosimResult<()> {
        if steps == 0 {
            return Err(CosimError::InvalidArgument("steps to monitor must be positive".into()));
        }
        self.steps_to_monitor = steps;
        Ok(())
    }

    pub fn metrics(&self) -> RealTimeMetrics {
        RealTimeMetrics {
            total_average:    self.total_average,
            rolling_average:  self.rolling_average,
            target:           self.target,
            enabled:          self.enabled,
            steps_to_monitor: self.steps_to_monitor,
        }
    }
}
