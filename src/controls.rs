//! Damped orbit controls.
//!
//! Pointer drags rotate the camera around a fixed target and the wheel dollies
//! it closer or further away. Input only accumulates into a pending spherical
//! delta; [`OrbitControls::update`] applies a `damping_factor` share of it to
//! the camera and decays the rest, so motion eases out instead of stopping.
//! `update` has to run once per frame whether or not there was input.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
};

use crate::{camera::PerspectiveCamera, config::ControlsConfig};

/// Keeps the camera off the poles where `look_at` loses its up vector.
const POLAR_EPSILON: f32 = 1e-3;
/// Pixels of a `PixelDelta` wheel event counted as one wheel notch.
const PIXELS_PER_LINE: f32 = 100.0;

/// Spherical coordinates around the target. `theta` is the azimuth around +Y
/// measured from +Z, `phi` the polar angle measured from +Y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    Idle,
    Rotating,
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    target: Point3<f32>,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    spherical_delta: Spherical,
    scale: f32,
    drag: Drag,
    last_pointer: Option<PhysicalPosition<f64>>,
    touch_id: Option<u64>,
    /// Height of the window in physical pixels. A drag across the full height
    /// turns a full circle.
    viewport_height: f32,
}

impl OrbitControls {
    pub fn new(config: &ControlsConfig, viewport_height: u32) -> Self {
        Self {
            target: Point3::from(config.target),
            damping_factor: config.damping_factor,
            enable_zoom: config.enable_zoom,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical_delta: Spherical::default(),
            scale: 1.0,
            drag: Drag::Idle,
            last_pointer: None,
            touch_id: None,
            viewport_height: viewport_height.max(1) as f32,
        }
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Feed a window event. Returns whether the event was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.drag = match state {
                    ElementState::Pressed => Drag::Rotating,
                    ElementState::Released => Drag::Idle,
                };
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.last_pointer.replace(*position);
                match (self.drag, previous) {
                    (Drag::Rotating, Some(previous)) => {
                        self.handle_drag(position.x - previous.x, position.y - previous.y);
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_pointer = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.handle_wheel(notches)
            }
            WindowEvent::Touch(touch) => match touch.phase {
                TouchPhase::Started if self.touch_id.is_none() => {
                    self.touch_id = Some(touch.id);
                    self.last_pointer = Some(touch.location);
                    true
                }
                TouchPhase::Moved if self.touch_id == Some(touch.id) => {
                    if let Some(previous) = self.last_pointer.replace(touch.location) {
                        self.handle_drag(touch.location.x - previous.x, touch.location.y - previous.y);
                    }
                    true
                }
                TouchPhase::Ended | TouchPhase::Cancelled if self.touch_id == Some(touch.id) => {
                    self.touch_id = None;
                    self.last_pointer = None;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Rotate by a pointer movement in pixels.
    pub fn handle_drag(&mut self, dx: f64, dy: f64) {
        let per_pixel = 2.0 * PI * self.rotate_speed / self.viewport_height;
        self.spherical_delta.theta -= dx as f32 * per_pixel;
        self.spherical_delta.phi -= dy as f32 * per_pixel;
    }

    /// Dolly by wheel notches. Positive moves towards the target.
    pub fn handle_wheel(&mut self, notches: f32) -> bool {
        if !self.enable_zoom || notches == 0.0 {
            return false;
        }
        let zoom_scale = 0.95f32.powf(self.zoom_speed);
        if notches > 0.0 {
            self.scale *= zoom_scale;
        } else {
            self.scale /= zoom_scale;
        }
        true
    }

    /// Integrate one damping step and move the camera. Call once per frame.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        spherical.theta += self.spherical_delta.theta * self.damping_factor;
        spherical.phi += self.spherical_delta.phi * self.damping_factor;
        spherical.phi = spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.position = Point3::from_vec(self.target.to_vec() + spherical.to_offset());
        camera.look_at(self.target);

        self.spherical_delta.theta *= 1.0 - self.damping_factor;
        self.spherical_delta.phi *= 1.0 - self.damping_factor;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn setup() -> (OrbitControls, PerspectiveCamera) {
        let config = ViewerConfig::default();
        let controls = OrbitControls::new(&config.controls, 600);
        let camera = PerspectiveCamera::new(&config.camera, 800, 600);
        (controls, camera)
    }

    fn distance(a: Point3<f32>, b: Point3<f32>) -> f32 {
        (a - b).magnitude()
    }

    #[test]
    fn spherical_round_trips_an_offset() {
        let offset = Vector3::new(5.0, 4.0, 29.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!((back - offset).magnitude() < 1e-4);
    }

    #[test]
    fn without_input_the_camera_stays_put() {
        let (mut controls, mut camera) = setup();
        controls.update(&mut camera);
        let settled = camera.position;
        for _ in 0..10 {
            controls.update(&mut camera);
        }
        assert!(distance(camera.position, settled) < 1e-4);
        assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn damping_shrinks_each_step_geometrically() {
        let (mut controls, mut camera) = setup();
        controls.update(&mut camera);
        controls.handle_drag(100.0, 0.0);

        let mut steps = Vec::new();
        let mut last = Spherical::from_offset(camera.position - controls.target()).theta;
        for _ in 0..5 {
            controls.update(&mut camera);
            let theta = Spherical::from_offset(camera.position - controls.target()).theta;
            steps.push((theta - last).abs());
            last = theta;
        }
        for pair in steps.windows(2) {
            let ratio = pair[1] / pair[0];
            assert!((ratio - 0.9).abs() < 1e-3, "ratio was {}", ratio);
        }
    }

    #[test]
    fn rotation_keeps_the_distance_and_target() {
        let (mut controls, mut camera) = setup();
        controls.update(&mut camera);
        let radius = distance(camera.position, controls.target());
        controls.handle_drag(250.0, -80.0);
        for _ in 0..100 {
            controls.update(&mut camera);
        }
        assert!((distance(camera.position, controls.target()) - radius).abs() < 1e-3);
        assert_eq!(controls.target(), Point3::new(0.0, 1.0, 0.0));
        assert_eq!(camera.target, controls.target());
    }

    #[test]
    fn wheel_changes_only_the_radius() {
        let (mut controls, mut camera) = setup();
        controls.update(&mut camera);
        let before = Spherical::from_offset(camera.position - controls.target());
        assert!(controls.handle_wheel(1.0));
        controls.update(&mut camera);
        let after = Spherical::from_offset(camera.position - controls.target());
        assert!((after.radius - before.radius * 0.95).abs() < 1e-3);
        assert!((after.theta - before.theta).abs() < 1e-5);
        assert!((after.phi - before.phi).abs() < 1e-5);
    }

    #[test]
    fn disabled_zoom_ignores_the_wheel() {
        let (mut controls, mut camera) = setup();
        controls.enable_zoom = false;
        controls.update(&mut camera);
        let before = distance(camera.position, controls.target());
        assert!(!controls.handle_wheel(3.0));
        controls.update(&mut camera);
        assert!((distance(camera.position, controls.target()) - before).abs() < 1e-5);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let (mut controls, mut camera) = setup();
        controls.handle_drag(0.0, 100_000.0);
        for _ in 0..200 {
            controls.update(&mut camera);
        }
        let s = Spherical::from_offset(camera.position - controls.target());
        assert!(s.phi > 0.0 && s.phi < PI);
    }
}
