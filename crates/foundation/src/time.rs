/// Host timestamp in seconds. Only differences between two instants matter.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    /// Seconds elapsed since `earlier`; never negative.
    pub fn since(self, earlier: Time) -> f64 {
        let d = self.0 - earlier.0;
        if d.is_finite() { d.max(0.0) } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn since_clamps_backwards_clocks() {
        assert_eq!(Time(2.5).since(Time(2.0)), 0.5);
        assert_eq!(Time(1.0).since(Time(2.0)), 0.0);
        assert_eq!(Time(f64::NAN).since(Time(0.0)), 0.0);
    }
}
