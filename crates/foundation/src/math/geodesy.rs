use super::{Ecef, Vec3};

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (meters).
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
/// WGS84 second eccentricity squared.
pub const WGS84_EP2: f64 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);

/// Geodetic coordinates in radians and meters (height above the ellipsoid).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geodetic {
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub alt_m: f64,
}

impl Geodetic {
    pub fn new(lat_rad: f64, lon_rad: f64, alt_m: f64) -> Self {
        Self {
            lat_rad,
            lon_rad,
            alt_m,
        }
    }

    /// Build from longitude/latitude in degrees, the order terrain providers use.
    pub fn from_degrees(lon_deg: f64, lat_deg: f64, alt_m: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians(), alt_m)
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon_rad.to_degrees()
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat_rad.to_degrees()
    }

    pub fn with_alt(self, alt_m: f64) -> Self {
        Self { alt_m, ..self }
    }
}

pub fn geodetic_to_ecef(geo: Geodetic) -> Ecef {
    let sin_lat = geo.lat_rad.sin();
    let cos_lat = geo.lat_rad.cos();
    let sin_lon = geo.lon_rad.sin();
    let cos_lon = geo.lon_rad.cos();

    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let x = (n + geo.alt_m) * cos_lat * cos_lon;
    let y = (n + geo.alt_m) * cos_lat * sin_lon;
    let z = (n * (1.0 - WGS84_E2) + geo.alt_m) * sin_lat;

    Ecef::new(x, y, z)
}

/// Bowring's closed-form inverse. Sub-millimetre for heights near the surface.
pub fn ecef_to_geodetic(ecef: Ecef) -> Geodetic {
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();

    // On the polar axis the longitude is arbitrary and cos(lat) vanishes.
    if p < 1e-9 {
        let lat = if ecef.z >= 0.0 {
            std::f64::consts::FRAC_PI_2
        } else {
            -std::f64::consts::FRAC_PI_2
        };
        return Geodetic::new(lat, 0.0, ecef.z.abs() - WGS84_B);
    }

    let lon = ecef.y.atan2(ecef.x);

    let theta = (ecef.z * WGS84_A).atan2(p * WGS84_B);
    let sin_theta = theta.sin();
    let cos_theta = theta.cos();

    let lat = (ecef.z + WGS84_EP2 * WGS84_B * sin_theta * sin_theta * sin_theta)
        .atan2(p - WGS84_E2 * WGS84_A * cos_theta * cos_theta * cos_theta);

    let sin_lat = lat.sin();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let alt = p / lat.cos() - n;

    Geodetic::new(lat, lon, alt)
}

/// Outward ellipsoid normal at a geodetic position.
pub fn surface_normal(geo: Geodetic) -> Vec3 {
    let cos_lat = geo.lat_rad.cos();
    Vec3::new(
        cos_lat * geo.lon_rad.cos(),
        cos_lat * geo.lon_rad.sin(),
        geo.lat_rad.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::{Geodetic, WGS84_A, WGS84_B, ecef_to_geodetic, geodetic_to_ecef, surface_normal};
    use crate::math::Ecef;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn equator_prime_meridian_lies_on_x_axis() {
        let ecef = geodetic_to_ecef(Geodetic::from_degrees(0.0, 0.0, 0.0));
        assert_close(ecef.x, WGS84_A, 1e-6);
        assert_close(ecef.y, 0.0, 1e-6);
        assert_close(ecef.z, 0.0, 1e-6);
    }

    #[test]
    fn round_trip_keeps_walking_heights() {
        let geo = Geodetic::from_degrees(-122.4194, 37.7749, 101.7);
        let rt = ecef_to_geodetic(geodetic_to_ecef(geo));
        assert_close(rt.lat_deg(), geo.lat_deg(), 1e-9);
        assert_close(rt.lon_deg(), geo.lon_deg(), 1e-9);
        assert_close(rt.alt_m, 101.7, 1e-6);
    }

    #[test]
    fn polar_axis_does_not_produce_nan() {
        let geo = ecef_to_geodetic(Ecef::new(0.0, 0.0, WGS84_B + 50.0));
        assert_close(geo.lat_deg(), 90.0, 1e-12);
        assert_close(geo.alt_m, 50.0, 1e-6);
        assert!(geo.lon_rad.is_finite());
    }

    #[test]
    fn surface_normal_is_unit_length() {
        let n = surface_normal(Geodetic::from_degrees(10.0, 45.0, 0.0));
        assert_close(n.length(), 1.0, 1e-12);
    }
}
