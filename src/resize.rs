//! Debounced viewport resizing.
//!
//! Continuous drag-resizing produces a burst of resize events. Reconfiguring
//! the surface and reallocating the depth buffer for each of them is wasted
//! work, so only the last event of a burst is applied: a resize is due once
//! `delay` has passed without another one arriving.

use instant::{Duration, Instant};
use winit::dpi::{LogicalSize, PhysicalSize};

use crate::{camera::PerspectiveCamera, controls::OrbitControls};

/// Trailing-edge debouncer. Every [`push`](Self::push) restarts the timer and
/// replaces the pending value.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Take the pending value if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }
}

/// A viewport as the windowing system reports it: physical pixels plus the
/// device pixel ratio they were derived with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub size: PhysicalSize<u32>,
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        Self { size, scale_factor }
    }

    /// Drawing surface size with the pixel ratio capped at `max_pixel_ratio`.
    pub fn surface_size(&self, max_pixel_ratio: f64) -> PhysicalSize<u32> {
        let scale_factor = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        let logical: LogicalSize<f64> = self.size.to_logical(scale_factor);
        let capped = scale_factor.min(max_pixel_ratio);
        logical.to_physical(capped)
    }
}

/// Collects resize events and, once a burst has settled, applies the final
/// viewport to the camera. The caller reconfigures the surface with the
/// returned size.
#[derive(Debug)]
pub struct ResizeHandler {
    debouncer: Debouncer<Viewport>,
    max_pixel_ratio: f64,
}

impl ResizeHandler {
    pub fn new(delay: Duration, max_pixel_ratio: f64) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
            max_pixel_ratio,
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport, now: Instant) {
        self.debouncer.push(viewport, now);
    }

    /// Apply a settled resize: camera aspect follows the new surface, whose
    /// size is returned. Orbit speed follows the window height in physical
    /// pixels, the unit pointer positions arrive in. Zero-sized (minimized)
    /// viewports are dropped.
    pub fn poll(
        &mut self,
        now: Instant,
        camera: &mut PerspectiveCamera,
        controls: &mut OrbitControls,
    ) -> Option<PhysicalSize<u32>> {
        let viewport = self.debouncer.poll(now)?;
        let size = viewport.surface_size(self.max_pixel_ratio);
        if size.width == 0 || size.height == 0 {
            return None;
        }
        camera.resize(size.width, size.height);
        controls.set_viewport_height(viewport.size.height);
        Some(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn nothing_is_due_before_the_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(200));
        debouncer.push(1, start);
        assert_eq!(debouncer.poll(start + ms(199)), None);
        assert_eq!(debouncer.poll(start + ms(200)), Some(1));
        assert_eq!(debouncer.poll(start + ms(500)), None);
    }

    #[test]
    fn each_push_restarts_the_timer() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(200));
        debouncer.push("a", start);
        debouncer.push("b", start + ms(150));
        assert_eq!(debouncer.poll(start + ms(250)), None);
        assert_eq!(debouncer.poll(start + ms(349)), None);
        assert_eq!(debouncer.poll(start + ms(350)), Some("b"));
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let retina = Viewport::new(PhysicalSize::new(3000, 1500), 3.0);
        assert_eq!(retina.surface_size(2.0), PhysicalSize::new(2000, 1000));
        let plain = Viewport::new(PhysicalSize::new(1280, 720), 1.0);
        assert_eq!(plain.surface_size(2.0), PhysicalSize::new(1280, 720));
        let hidpi = Viewport::new(PhysicalSize::new(2560, 1440), 2.0);
        assert_eq!(hidpi.surface_size(2.0), PhysicalSize::new(2560, 1440));
    }

    #[test]
    fn a_burst_of_resizes_applies_only_the_last_one() {
        let config = crate::config::ViewerConfig::default();
        let mut camera = PerspectiveCamera::new(&config.camera, 800, 600);
        let mut controls = OrbitControls::new(&config.controls, 600);
        let mut handler = ResizeHandler::new(ms(200), 2.0);

        let start = Instant::now();
        let mut applied = Vec::new();
        for (i, (w, h)) in [(900, 700), (1000, 650), (1200, 500)].into_iter().enumerate() {
            let now = start + ms(50 * i as u64);
            handler.on_resize(Viewport::new(PhysicalSize::new(w, h), 1.0), now);
            applied.extend(handler.poll(now, &mut camera, &mut controls));
        }
        for t in (100..800).step_by(16) {
            applied.extend(handler.poll(start + ms(t), &mut camera, &mut controls));
        }

        assert_eq!(applied, vec![PhysicalSize::new(1200, 500)]);
        assert_eq!(camera.aspect, 1200.0 / 500.0);
    }

    #[test]
    fn minimized_windows_are_ignored() {
        let config = crate::config::ViewerConfig::default();
        let mut camera = PerspectiveCamera::new(&config.camera, 800, 600);
        let mut controls = OrbitControls::new(&config.controls, 600);
        let mut handler = ResizeHandler::new(ms(200), 2.0);
        let start = Instant::now();
        handler.on_resize(Viewport::new(PhysicalSize::new(0, 0), 1.0), start);
        assert_eq!(handler.poll(start + ms(300), &mut camera, &mut controls), None);
        assert_eq!(camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn orbit_speed_follows_the_uncapped_window_height() {
        let config = crate::config::ViewerConfig::default();
        let mut camera = PerspectiveCamera::new(&config.camera, 800, 600);
        let mut controls = OrbitControls::new(&config.controls, 600);
        let mut handler = ResizeHandler::new(ms(200), 2.0);
        let start = Instant::now();
        handler.on_resize(Viewport::new(PhysicalSize::new(2400, 1800), 3.0), start);

        let size = handler.poll(start + ms(200), &mut camera, &mut controls);
        assert_eq!(size, Some(PhysicalSize::new(1600, 1200)));
        assert_eq!(controls.viewport_height(), 1800.0);
    }
}
