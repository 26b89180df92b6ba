use foundation::time::Time;

/// Per-frame metadata handed to the simulation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index since the loop started.
    pub index: u64,
    /// Measured delta time (seconds). Zero on the first frame.
    pub dt_s: f64,
    /// Host timestamp of the frame.
    pub time: Time,
}

/// Derives frame deltas from monotonically increasing host timestamps.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FrameClock {
    last: Option<Time>,
    next_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now: Time) -> Frame {
        let dt_s = self.last.map(|last| now.since(last)).unwrap_or(0.0);
        // A timestamp that went backwards keeps the old baseline.
        if self.last.is_none_or(|last| now.0 >= last.0) {
            self.last = Some(now);
        }
        let frame = Frame {
            index: self.next_index,
            dt_s,
            time: now,
        };
        self.next_index += 1;
        frame
    }
}

/// Render-synchronized loop state owned by whoever drives per-frame updates.
///
/// While stopped, ticks are ignored. Starting resets the clock so the first
/// frame after a start never sees the time spent stopped.
#[derive(Debug, Default)]
pub struct FrameLoop {
    clock: Option<FrameClock>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    /// Returns `true` if the loop was not already running.
    pub fn start(&mut self) -> bool {
        if self.clock.is_some() {
            return false;
        }
        self.clock = Some(FrameClock::new());
        true
    }

    /// Returns `true` if the loop was running.
    pub fn stop(&mut self) -> bool {
        self.clock.take().is_some()
    }

    pub fn tick(&mut self, now: Time) -> Option<Frame> {
        self.clock.as_mut().map(|c| c.tick(now))
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameClock, FrameLoop};
    use foundation::time::Time;

    #[test]
    fn first_tick_has_zero_delta() {
        let mut clock = FrameClock::new();
        let f0 = clock.tick(Time(10.0));
        assert_eq!(f0.index, 0);
        assert_eq!(f0.dt_s, 0.0);

        let f1 = clock.tick(Time(10.25));
        assert_eq!(f1.index, 1);
        assert_eq!(f1.dt_s, 0.25);
    }

    #[test]
    fn backwards_timestamp_yields_zero_delta() {
        let mut clock = FrameClock::new();
        clock.tick(Time(5.0));
        assert_eq!(clock.tick(Time(4.0)).dt_s, 0.0);
        assert_eq!(clock.tick(Time(5.5)).dt_s, 0.5);
    }

    #[test]
    fn stopped_loop_ignores_ticks() {
        let mut lp = FrameLoop::new();
        assert!(lp.tick(Time(1.0)).is_none());
        assert!(lp.start());
        assert!(!lp.start());
        assert_eq!(lp.tick(Time(1.0)).map(|f| f.dt_s), Some(0.0));
        assert!(lp.stop());
        assert!(!lp.stop());
        assert!(lp.tick(Time(2.0)).is_none());

        // Restart does not carry the gap spent stopped.
        lp.start();
        assert_eq!(lp.tick(Time(30.0)).map(|f| f.dt_s), Some(0.0));
    }
}
