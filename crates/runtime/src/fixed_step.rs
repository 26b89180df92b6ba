//! Fixed-timestep accumulator.
//!
//! Converts variable render-frame deltas into a whole number of constant
//! physics steps. Frame deltas are clamped, the number of steps per frame is
//! capped, and the fractional remainder carries to the next frame. Given the
//! same sequence of frame deltas it always produces the same step sequence.

pub const DEFAULT_STEP_S: f64 = 1.0 / 120.0;
pub const DEFAULT_MAX_FRAME_S: f64 = 0.05;
pub const DEFAULT_MAX_STEPS: u32 = 6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedStep {
    step_s: f64,
    max_frame_s: f64,
    max_steps: u32,
    accumulator_s: f64,
}

/// What a single [`FixedStep::advance`] call did.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct StepSummary {
    pub steps: u32,
    /// The frame delta exceeded the clamp.
    pub clamped: bool,
    /// Whole steps discarded because the per-frame cap was hit.
    pub dropped_s: f64,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_S, DEFAULT_MAX_FRAME_S, DEFAULT_MAX_STEPS)
    }
}

impl FixedStep {
    pub fn new(step_s: f64, max_frame_s: f64, max_steps: u32) -> Self {
        Self {
            step_s,
            max_frame_s,
            max_steps,
            accumulator_s: 0.0,
        }
    }

    pub fn step_s(&self) -> f64 {
        self.step_s
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Time carried over to the next frame (always `< step_s` after a capped frame).
    pub fn remainder_s(&self) -> f64 {
        self.accumulator_s
    }

    pub fn reset(&mut self) {
        self.accumulator_s = 0.0;
    }

    /// Feed one frame delta, invoking `step` once per whole fixed step.
    pub fn advance(&mut self, frame_dt_s: f64, mut step: impl FnMut(f64)) -> StepSummary {
        let mut summary = StepSummary::default();
        if !(self.step_s > 0.0) {
            return summary;
        }

        let mut dt = if frame_dt_s.is_finite() {
            frame_dt_s.max(0.0)
        } else {
            0.0
        };
        if dt > self.max_frame_s {
            dt = self.max_frame_s;
            summary.clamped = true;
        }

        self.accumulator_s += dt;
        while self.accumulator_s >= self.step_s && summary.steps < self.max_steps {
            step(self.step_s);
            self.accumulator_s -= self.step_s;
            summary.steps += 1;
        }

        if self.accumulator_s >= self.step_s {
            let kept = self.accumulator_s % self.step_s;
            summary.dropped_s = self.accumulator_s - kept;
            self.accumulator_s = kept;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_STEP_S, FixedStep};

    // Power-of-two step sizes keep the arithmetic exact.
    #[test]
    fn whole_steps_run_and_remainder_carries() {
        let mut fs = FixedStep::new(0.25, 1.0, 6);
        let mut steps = 0;
        let s = fs.advance(0.625, |_| steps += 1);
        assert_eq!(s.steps, 2);
        assert_eq!(steps, 2);
        assert_eq!(fs.remainder_s(), 0.125);

        let s = fs.advance(0.125, |_| steps += 1);
        assert_eq!(s.steps, 1);
        assert_eq!(fs.remainder_s(), 0.0);
    }

    #[test]
    fn large_frame_delta_is_clamped_and_capped() {
        let mut fs = FixedStep::new(0.125, 0.5, 3);
        let mut steps = 0;
        let s = fs.advance(5.0, |_| steps += 1);
        assert!(s.clamped);
        assert_eq!(steps, 3);
        assert_eq!(s.dropped_s, 0.125);
        assert_eq!(fs.remainder_s(), 0.0);
    }

    #[test]
    fn default_cap_bounds_catch_up() {
        let mut fs = FixedStep::default();
        let s = fs.advance(10.0, |_| {});
        assert!(s.clamped);
        assert!(s.steps <= fs.max_steps());
        assert!(fs.remainder_s() < DEFAULT_STEP_S);
    }

    #[test]
    fn negative_and_nan_deltas_do_nothing() {
        let mut fs = FixedStep::default();
        assert_eq!(fs.advance(-1.0, |_| panic!("no step")).steps, 0);
        assert_eq!(fs.advance(f64::NAN, |_| panic!("no step")).steps, 0);
        assert_eq!(fs.remainder_s(), 0.0);
    }

    #[test]
    fn exact_step_deltas_run_one_step_each() {
        let mut fs = FixedStep::default();
        for _ in 0..240 {
            assert_eq!(fs.advance(DEFAULT_STEP_S, |_| {}).steps, 1);
        }
    }

    #[test]
    fn same_deltas_give_same_step_counts() {
        let deltas = [0.016, 0.017, 0.033, 0.004, 0.2, 0.0166];
        let run = || {
            let mut fs = FixedStep::default();
            deltas
                .iter()
                .map(|dt| fs.advance(*dt, |_| {}).steps)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
