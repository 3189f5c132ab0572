//! Orthographic projection with horizon clipping.
//!
//! A [`Projection`] is rebuilt from the current rotation, zoom and viewport
//! for every paint, so a resize never disturbs the view state. Geometry on
//! the far hemisphere is clipped at the horizon; polygon pieces that leave
//! and re-enter the visible side are joined along the sphere's outline.

use std::f64::consts::{PI, TAU};
use std::fmt::Write as _;

use glam::DVec3;

use crate::config::ViewSettings;
use crate::geo::{LonLat, Polygon, Ring};
use crate::interaction::{RotationState, ZoomState};

/// Recursion limit for great-circle resampling.
const MAX_DEPTH: u8 = 16;

/// Edges longer than 30° are always split, whatever their screen error.
const COS_MIN_DISTANCE: f64 = 0.866_025_403_784_438_6;

/// Angular step (radians) used when walking along the sphere outline.
const LIMB_STEP: f64 = 5.0 * PI / 180.0;

/// Points this close to the horizon count as hidden.
const HORIZON_EPSILON: f64 = 1e-9;

/// Drawing area in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    /// Size a viewport from the available width: the height follows the
    /// configured aspect ratio, kept within the configured bounds.
    pub fn for_width(width: f64, view: &ViewSettings) -> Self {
        let height = (width * view.aspect).round().clamp(view.min_height, view.max_height);
        Self::new(width, height)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Sphere radius at zoom 1.
    pub fn base_radius(&self, margin: f64) -> f64 {
        (self.width.min(self.height) / 2.0 - margin).max(1.0)
    }
}

/// Accumulates SVG path data.
#[derive(Debug, Default, Clone)]
pub struct PathBuilder {
    d: String,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, (x, y): (f64, f64)) {
        let _ = write!(self.d, "M{x:.2},{y:.2}");
    }

    pub fn line_to(&mut self, (x, y): (f64, f64)) {
        let _ = write!(self.d, "L{x:.2},{y:.2}");
    }

    pub fn close(&mut self) {
        self.d.push('Z');
    }

    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    pub fn finish(self) -> String {
        self.d
    }
}

/// Geographic ⇄ screen mapping for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    yaw: (f64, f64),
    pitch: (f64, f64),
    scale: f64,
    center: (f64, f64),
    /// Squared resampling tolerance in px²; zero disables resampling.
    delta2: f64,
}

impl Projection {
    pub fn new(
        rotation: RotationState,
        zoom: ZoomState,
        viewport: Viewport,
        view: &ViewSettings,
    ) -> Self {
        let (ys, yc) = rotation.yaw.to_radians().sin_cos();
        let (ps, pc) = rotation.pitch.to_radians().sin_cos();
        Self {
            yaw: (ys, yc),
            pitch: (ps, pc),
            scale: viewport.base_radius(view.margin) * zoom.get(),
            center: viewport.center(),
            delta2: view.precision * view.precision,
        }
    }

    /// Sphere radius on screen.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    /// World vector → view vector. In view space +x points at the viewer.
    pub fn rotate(&self, v: DVec3) -> DVec3 {
        let (ys, yc) = self.yaw;
        let (ps, pc) = self.pitch;
        let x = v.x * yc - v.y * ys;
        let y = v.x * ys + v.y * yc;
        DVec3::new(x * pc - v.z * ps, y, v.z * pc + x * ps)
    }

    /// View vector → world vector.
    pub fn unrotate(&self, v: DVec3) -> DVec3 {
        let (ys, yc) = self.yaw;
        let (ps, pc) = self.pitch;
        let x = v.x * pc + v.z * ps;
        let z = v.z * pc - v.x * ps;
        DVec3::new(x * yc + v.y * ys, -x * ys + v.y * yc, z)
    }

    fn screen(&self, r: DVec3) -> (f64, f64) {
        (self.center.0 + self.scale * r.y, self.center.1 - self.scale * r.z)
    }

    fn visible(r: DVec3) -> bool {
        r.x > HORIZON_EPSILON
    }

    /// Screen position of a coordinate, or `None` on the far hemisphere.
    pub fn project(&self, p: LonLat) -> Option<(f64, f64)> {
        let r = self.rotate(p.to_vec3());
        Self::visible(r).then(|| self.screen(r))
    }

    /// Geographic coordinate under a screen point, or `None` off the sphere.
    pub fn invert(&self, x: f64, y: f64) -> Option<LonLat> {
        let u = (x - self.center.0) / self.scale;
        let v = (self.center.1 - y) / self.scale;
        let r2 = u * u + v * v;
        if !r2.is_finite() || r2 > 1.0 {
            return None;
        }
        let r = DVec3::new((1.0 - r2).sqrt(), u, v);
        Some(LonLat::from_vec3(self.unrotate(r)))
    }

    /// Whether a screen point falls on the projected sphere.
    pub fn on_sphere(&self, x: f64, y: f64) -> bool {
        self.invert(x, y).is_some()
    }

    /// Outline of the whole sphere.
    pub fn sphere_path(&self) -> String {
        let (cx, cy) = self.center;
        let r = self.scale;
        format!(
            "M{cx:.2},{top:.2}A{r:.2},{r:.2} 0 1,1 {cx:.2},{bottom:.2}A{r:.2},{r:.2} 0 1,1 {cx:.2},{top:.2}Z",
            top = cy - r,
            bottom = cy + r,
        )
    }

    pub fn polygon_path(&self, polygon: &Polygon, out: &mut PathBuilder) {
        for ring in polygon.rings() {
            self.ring_path(ring, out);
        }
    }

    /// One closed ring, clipped to the visible hemisphere.
    pub fn ring_path(&self, ring: &Ring, out: &mut PathBuilder) {
        let view: Vec<DVec3> = ring.unit().iter().map(|&v| self.rotate(v)).collect();
        let n = view.len();
        if n < 3 {
            return;
        }

        let shown = view.iter().filter(|&&r| Self::visible(r)).count();
        if shown == 0 {
            return;
        }
        if shown == n {
            let first = self.screen(view[0]);
            out.move_to(first);
            for i in 0..n {
                let (a, b) = (view[i], view[(i + 1) % n]);
                self.resample(a, self.screen(a), b, self.screen(b), MAX_DEPTH, out);
                out.line_to(self.screen(b));
            }
            out.close();
            return;
        }

        // Clip against the horizon plane. The flag marks points created on
        // the horizon; two flagged points in a row are an exit followed by an
        // entry, joined along the outline.
        let mut clipped: Vec<(DVec3, bool)> = Vec::with_capacity(n + 4);
        for i in 0..n {
            let (prev, cur) = (view[(i + n - 1) % n], view[i]);
            match (Self::visible(prev), Self::visible(cur)) {
                (true, true) => clipped.push((cur, false)),
                (true, false) => clipped.push((horizon_crossing(prev, cur), true)),
                (false, true) => {
                    clipped.push((horizon_crossing(prev, cur), true));
                    clipped.push((cur, false));
                }
                (false, false) => {}
            }
        }

        let m = clipped.len();
        out.move_to(self.screen(clipped[0].0));
        for i in 0..m {
            let (a, a_limb) = clipped[i];
            let (b, b_limb) = clipped[(i + 1) % m];
            if a_limb && b_limb {
                self.limb_arc(a, b, out);
            } else {
                self.resample(a, self.screen(a), b, self.screen(b), MAX_DEPTH, out);
                out.line_to(self.screen(b));
            }
        }
        out.close();
    }

    /// An open polyline (graticule line), split where it passes behind the globe.
    pub fn line_path(&self, line: &[DVec3], out: &mut PathBuilder) {
        let mut prev: Option<DVec3> = None;
        for &v in line {
            let cur = self.rotate(v);
            match prev {
                None if Self::visible(cur) => out.move_to(self.screen(cur)),
                None => {}
                Some(p) => match (Self::visible(p), Self::visible(cur)) {
                    (true, true) => self.segment(p, cur, out),
                    (true, false) => self.segment(p, horizon_crossing(p, cur), out),
                    (false, true) => {
                        let entry = horizon_crossing(p, cur);
                        out.move_to(self.screen(entry));
                        self.segment(entry, cur, out);
                    }
                    (false, false) => {}
                },
            }
            prev = Some(cur);
        }
    }

    fn segment(&self, a: DVec3, b: DVec3, out: &mut PathBuilder) {
        let pb = self.screen(b);
        self.resample(a, self.screen(a), b, pb, MAX_DEPTH, out);
        out.line_to(pb);
    }

    /// Emit intermediate points along the great circle from `a` to `b` until
    /// the chord is within tolerance. The end point itself is not emitted.
    fn resample(
        &self,
        a: DVec3,
        pa: (f64, f64),
        b: DVec3,
        pb: (f64, f64),
        depth: u8,
        out: &mut PathBuilder,
    ) {
        if self.delta2 == 0.0 || depth == 0 {
            return;
        }
        let (dx, dy) = (pb.0 - pa.0, pb.1 - pa.1);
        let d2 = dx * dx + dy * dy;
        if d2 <= 4.0 * self.delta2 && a.dot(b) >= COS_MIN_DISTANCE {
            return;
        }
        let Some(m) = (a + b).try_normalize() else {
            return;
        };
        let pm = self.screen(m);
        let (dx2, dy2) = (pm.0 - pa.0, pm.1 - pa.1);
        let dz = dy * dx2 - dx * dy2;
        let off_chord = d2 > 0.0 && dz * dz / d2 > self.delta2;
        let uneven = d2 > 0.0 && ((dx * dx2 + dy * dy2) / d2 - 0.5).abs() > 0.3;
        if off_chord || uneven || a.dot(b) < COS_MIN_DISTANCE {
            self.resample(a, pa, m, pm, depth - 1, out);
            out.line_to(pm);
            self.resample(m, pm, b, pb, depth - 1, out);
        }
    }

    /// Walk the outline circle from horizon point `a` to horizon point `b`
    /// the short way round, ending on `b`.
    fn limb_arc(&self, a: DVec3, b: DVec3, out: &mut PathBuilder) {
        let ta = a.z.atan2(a.y);
        let tb = b.z.atan2(b.y);
        let mut delta = (tb - ta) % TAU;
        if delta > PI {
            delta -= TAU;
        } else if delta < -PI {
            delta += TAU;
        }
        let steps = ((delta.abs() / LIMB_STEP).ceil() as usize).max(1);
        let (cx, cy) = self.center;
        for k in 1..=steps {
            let t = ta + delta * k as f64 / steps as f64;
            out.line_to((cx + self.scale * t.cos(), cy - self.scale * t.sin()));
        }
    }
}

/// Where the great-circle arc from visible `a` to hidden `b` (or the other
/// way round) meets the horizon plane `x = 0`.
fn horizon_crossing(a: DVec3, b: DVec3) -> DVec3 {
    let denom = a.x - b.x;
    if denom.abs() < f64::EPSILON {
        return a;
    }
    let t = a.x / denom;
    let p = a + (b - a) * t;
    DVec3::new(0.0, p.y, p.z).try_normalize().unwrap_or(a)
}
