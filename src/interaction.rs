//! Pointer and wheel gestures, plus idle auto-rotation.
//!
//! The controller is the only writer of [`RotationState`] and [`ZoomState`].
//! Each handler reports whether it changed the view; the caller turns that
//! into a redraw request.

use crate::config::ViewSettings;

/// View rotation in degrees. Yaw is unbounded; pitch stays within the limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub yaw: f64,
    pub pitch: f64,
}

impl RotationState {
    pub fn new(yaw: f64, pitch: f64, pitch_limit: f64) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-pitch_limit, pitch_limit),
        }
    }

    pub fn rotate_by(&mut self, d_yaw: f64, d_pitch: f64, pitch_limit: f64) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-pitch_limit, pitch_limit);
    }
}

/// Multiplier on the base sphere radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState(f64);

impl ZoomState {
    pub fn new(scale: f64, min: f64, max: f64) -> Self {
        Self(scale.clamp(min, max))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Auto-rotating (unless reduced motion is requested).
    Idle,
    Dragging { last: (f64, f64) },
    /// Wheel zoom in progress; `quiet_ms` counts time since the last wheel event.
    Zooming { quiet_ms: f64 },
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: Mode,
    rotation: RotationState,
    zoom: ZoomState,
    settings: ViewSettings,
}

impl InteractionController {
    pub fn new(settings: &ViewSettings) -> Self {
        Self {
            mode: Mode::Idle,
            rotation: RotationState::new(
                settings.initial_yaw,
                settings.initial_pitch,
                settings.pitch_limit,
            ),
            zoom: ZoomState::new(settings.initial_zoom, settings.min_zoom, settings.max_zoom),
            settings: settings.clone(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rotation(&self) -> RotationState {
        self.rotation
    }

    pub fn zoom(&self) -> ZoomState {
        self.zoom
    }

    /// Current auto-rotation speed in degrees per millisecond.
    pub fn spin_velocity(&self) -> f64 {
        match self.mode {
            Mode::Idle if !self.settings.reduced_motion => self.settings.spin_speed,
            _ => 0.0,
        }
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.settings.reduced_motion = reduced;
    }

    /// Start a drag. A pending wheel zoom is finished first.
    pub fn pointer_down(&mut self, pos: (f64, f64)) {
        if let Mode::Dragging { .. } = self.mode {
            return;
        }
        log::debug!("drag start at {pos:?}");
        self.mode = Mode::Dragging { last: pos };
    }

    /// Rotate with the pointer while dragging. Returns whether the view changed.
    pub fn pointer_move(&mut self, pos: (f64, f64)) -> bool {
        let Mode::Dragging { last } = self.mode else {
            return false;
        };
        let (dx, dy) = (pos.0 - last.0, pos.1 - last.1);
        self.mode = Mode::Dragging { last: pos };
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        let k = self.settings.drag_sensitivity;
        self.rotation.rotate_by(dx * k, -dy * k, self.settings.pitch_limit);
        true
    }

    pub fn pointer_up(&mut self) {
        if let Mode::Dragging { .. } = self.mode {
            log::debug!("drag end, rotation {:?}", self.rotation);
            self.mode = Mode::Idle;
        }
    }

    /// Zoom by a wheel delta (positive = away from the user = zoom out).
    /// Ignored while dragging. Returns whether the view changed.
    pub fn wheel(&mut self, delta_y: f64) -> bool {
        if let Mode::Dragging { .. } = self.mode {
            return false;
        }
        self.mode = Mode::Zooming { quiet_ms: 0.0 };
        let s = &self.settings;
        let before = self.zoom;
        self.zoom = ZoomState::new(
            before.get() * (-delta_y * s.wheel_sensitivity).exp(),
            s.min_zoom,
            s.max_zoom,
        );
        self.zoom != before
    }

    /// Advance time by `dt_ms`. Settles a finished zoom and applies idle
    /// auto-rotation. Returns whether the view changed.
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        if dt_ms <= 0.0 {
            return false;
        }
        if let Mode::Zooming { quiet_ms } = self.mode {
            let quiet_ms = quiet_ms + dt_ms;
            self.mode = if quiet_ms >= self.settings.zoom_settle_ms {
                Mode::Idle
            } else {
                Mode::Zooming { quiet_ms }
            };
            return false;
        }
        let velocity = self.spin_velocity();
        if velocity == 0.0 {
            return false;
        }
        self.rotation.rotate_by(velocity * dt_ms, 0.0, self.settings.pitch_limit);
        true
    }

    /// Point the view at a location, leaving the gesture mode unchanged.
    pub fn center_on(&mut self, lon: f64, lat: f64) -> bool {
        let target = RotationState::new(-lon, -lat, self.settings.pitch_limit);
        if target == self.rotation {
            return false;
        }
        self.rotation = target;
        true
    }
}
