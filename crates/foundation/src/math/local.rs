use super::{Ecef, Geodetic, Vec3, ecef_to_geodetic, geodetic_to_ecef, surface_normal};

/// Local East-North-Up coordinates (meters).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Enu {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

impl Enu {
    pub fn new(east: f64, north: f64, up: f64) -> Self {
        Self { east, north, up }
    }
}

/// Orthonormal east/north/up basis of the local tangent plane at a point.
///
/// Heading convention used throughout: yaw is measured clockwise from north
/// toward east, pitch is positive above the tangent plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EnuFrame {
    pub east: Vec3,
    pub north: Vec3,
    pub up: Vec3,
}

/// Camera basis produced from yaw/pitch in a tangent frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LookBasis {
    pub direction: Vec3,
    pub up: Vec3,
    pub right: Vec3,
}

impl EnuFrame {
    pub fn at_geodetic(geo: Geodetic) -> Self {
        let sin_lat = geo.lat_rad.sin();
        let cos_lat = geo.lat_rad.cos();
        let sin_lon = geo.lon_rad.sin();
        let cos_lon = geo.lon_rad.cos();

        Self {
            east: Vec3::new(-sin_lon, cos_lon, 0.0),
            north: Vec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: surface_normal(geo),
        }
    }

    /// Tangent frame at a world (ECEF) position.
    pub fn at(position: Vec3) -> Self {
        Self::at_geodetic(ecef_to_geodetic(Ecef::from(position)))
    }

    /// Local offset expressed as a world-space vector.
    pub fn to_world(&self, enu: Enu) -> Vec3 {
        self.east * enu.east + self.north * enu.north + self.up * enu.up
    }

    /// World-space vector expressed in this frame.
    pub fn to_local(&self, v: Vec3) -> Enu {
        Enu::new(v.dot(self.east), v.dot(self.north), v.dot(self.up))
    }

    /// Unit vector on the tangent plane for a heading.
    pub fn heading_vector(&self, yaw: f64) -> Vec3 {
        self.east * yaw.sin() + self.north * yaw.cos()
    }

    pub fn look_basis(&self, yaw: f64, pitch: f64) -> LookBasis {
        let horizontal = self.heading_vector(yaw);
        let (sin_p, cos_p) = pitch.sin_cos();
        let direction = horizontal * cos_p + self.up * sin_p;
        let up = horizontal * -sin_p + self.up * cos_p;
        LookBasis {
            direction,
            up,
            right: direction.cross(up),
        }
    }

    /// Inverse of [`EnuFrame::look_basis`]: (yaw, pitch) of a world direction.
    pub fn yaw_pitch_of(&self, direction: Vec3) -> Option<(f64, f64)> {
        let d = direction.try_normalize()?;
        let local = self.to_local(d);
        let pitch = local.up.clamp(-1.0, 1.0).asin();
        let horizontal = (local.east * local.east + local.north * local.north).sqrt();
        let yaw = if horizontal > 1e-9 {
            local.east.atan2(local.north)
        } else {
            0.0
        };
        Some((yaw, pitch))
    }
}

pub fn ecef_to_enu(point: Ecef, origin: Geodetic) -> Enu {
    let origin_ecef = geodetic_to_ecef(origin);
    let frame = EnuFrame::at_geodetic(origin);
    frame.to_local(point.to_vec3() - origin_ecef.to_vec3())
}

pub fn enu_to_ecef(enu: Enu, origin: Geodetic) -> Ecef {
    let origin_ecef = geodetic_to_ecef(origin);
    let frame = EnuFrame::at_geodetic(origin);
    Ecef::from(origin_ecef.to_vec3() + frame.to_world(enu))
}
