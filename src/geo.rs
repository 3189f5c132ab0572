//! Spherical geometry on the unit sphere.
//!
//! Boundaries arrive as longitude/latitude rings. They are converted once
//! to unit vectors so that containment can be decided with a winding sum,
//! which keeps working across the antimeridian and around the poles where
//! a planar lon/lat test breaks down.

use std::f64::consts::PI;

use glam::DVec3;

/// Two vertices closer than this (in unit-sphere distance) are the same point.
const SAME_POINT: f64 = 1e-9;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Unit vector with x towards (0°, 0°), y towards (90°E, 0°), z towards the north pole.
    pub fn to_vec3(self) -> DVec3 {
        let (lon, lat) = (self.lon.to_radians(), self.lat.to_radians());
        let cos_lat = lat.cos();
        DVec3::new(cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin())
    }

    pub fn from_vec3(v: DVec3) -> Self {
        Self {
            lon: v.y.atan2(v.x).to_degrees(),
            lat: v.z.clamp(-1.0, 1.0).asin().to_degrees(),
        }
    }
}

/// A closed boundary ring.
///
/// The ring keeps its source coordinates for painting and a unit-vector
/// copy (closing duplicate removed) for containment. `centroid` and `reach`
/// describe the smallest spherical cap around the vertex mean that holds
/// every vertex; points outside that cap are rejected without a winding sum.
#[derive(Debug, Clone)]
pub struct Ring {
    points: Vec<LonLat>,
    unit: Vec<DVec3>,
    centroid: DVec3,
    reach: f64,
}

impl Ring {
    pub fn new(points: Vec<LonLat>) -> Self {
        let mut unit: Vec<DVec3> = points.iter().map(|p| p.to_vec3()).collect();
        if unit.len() > 1 {
            let (first, last) = (unit[0], unit[unit.len() - 1]);
            if first.distance_squared(last) < SAME_POINT {
                unit.pop();
            }
        }

        let sum: DVec3 = unit.iter().copied().sum();
        let centroid = sum.try_normalize().unwrap_or(DVec3::X);
        let reach = unit
            .iter()
            .map(|v| v.dot(centroid))
            .fold(1.0_f64, f64::min);

        Self { points, unit, centroid, reach }
    }

    pub fn points(&self) -> &[LonLat] {
        &self.points
    }

    /// Vertices as unit vectors, without the closing duplicate.
    pub fn unit(&self) -> &[DVec3] {
        &self.unit
    }

    pub fn centroid(&self) -> DVec3 {
        self.centroid
    }

    /// Angular radius (radians) of the cap around `centroid` holding all vertices.
    pub fn angular_radius(&self) -> f64 {
        self.reach.clamp(-1.0, 1.0).acos()
    }

    /// Signed angle swept by the ring as seen from `p`, in radians.
    ///
    /// The result is close to a multiple of 2π: zero when neither `p` nor its
    /// antipode is enclosed, ±2π when exactly one of them is.
    pub fn winding(&self, p: DVec3) -> f64 {
        let n = self.unit.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.unit[i];
            let b = self.unit[(i + 1) % n];
            let cross = p.dot(a.cross(b));
            let dot = a.dot(b) - p.dot(a) * p.dot(b);
            sum += cross.atan2(dot);
        }
        sum
    }

    /// Whether `p` lies in the smaller of the two regions this ring bounds.
    pub fn contains(&self, p: DVec3) -> bool {
        if self.unit.len() < 3 {
            return false;
        }
        // Only a cap narrower than a hemisphere can be used to reject early.
        if self.reach > 0.0 && p.dot(self.centroid) < self.reach - SAME_POINT {
            return false;
        }
        if self.winding(p).abs() < PI {
            return false;
        }
        // One of p / -p is enclosed; the enclosed one is on the centroid's side.
        p.dot(self.centroid) > 0.0
    }
}

/// An exterior ring with zero or more holes.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    pub fn contains(&self, p: DVec3) -> bool {
        self.exterior.contains(p) && !self.holes.iter().any(|h| h.contains(p))
    }
}

/// Every country geometry is held as a multi-polygon; a plain polygon is a
/// multi-polygon with one member.
#[derive(Debug, Clone, Default)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
    pub fn polygons(&self) -> &[Polygon] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: MultiPolygon) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, p: DVec3) -> bool {
        self.0.iter().any(|poly| poly.contains(p))
    }

    /// Point to center the view on: the middle of the widest member polygon.
    pub fn focus(&self) -> Option<LonLat> {
        self.0
            .iter()
            .max_by(|a, b| {
                a.exterior
                    .angular_radius()
                    .total_cmp(&b.exterior.angular_radius())
            })
            .map(|poly| LonLat::from_vec3(poly.exterior.centroid()))
    }
}
