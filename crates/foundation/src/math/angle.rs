use std::f64::consts::{PI, TAU};

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(a: f64) -> f64 {
    if !a.is_finite() {
        return a;
    }
    let mut w = a.rem_euclid(TAU);
    if w > PI {
        w -= TAU;
    }
    // rem_euclid maps -PI to PI already; guard the lower bound for rounding.
    if w <= -PI { w + TAU } else { w }
}

/// Cosine threshold for an angle given in degrees.
pub fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}
