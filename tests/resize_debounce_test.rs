use dojo_viewer::{
    ViewerConfig,
    resize::{ResizeHandler, Viewport},
};
use instant::Instant;
use winit::dpi::PhysicalSize;

use crate::common::test_utils::{camera_and_controls, ms};

mod common;

fn viewport(width: u32, height: u32, scale_factor: f64) -> Viewport {
    Viewport::new(PhysicalSize::new(width, height), scale_factor)
}

#[test]
fn burst_of_resizes_is_applied_once_with_the_last_size() {
    let config = ViewerConfig::default();
    let (mut camera, mut controls) = camera_and_controls(&config);
    let mut resize = ResizeHandler::new(config.resize_debounce, config.renderer.max_pixel_ratio);

    let t0 = Instant::now();
    resize.on_resize(viewport(1000, 500, 1.0), t0);
    resize.on_resize(viewport(1100, 550, 1.0), t0 + ms(50));
    resize.on_resize(viewport(1200, 600, 1.0), t0 + ms(100));

    assert_eq!(resize.poll(t0 + ms(250), &mut camera, &mut controls), None);
    assert_eq!(
        resize.poll(t0 + ms(300), &mut camera, &mut controls),
        Some(PhysicalSize::new(1200, 600))
    );
    assert!((camera.aspect - 2.0).abs() < 1e-6);
    assert_eq!(resize.poll(t0 + ms(1000), &mut camera, &mut controls), None);
}

#[test]
fn pixel_ratio_is_capped_at_two() {
    let config = ViewerConfig::default();
    let (mut camera, mut controls) = camera_and_controls(&config);
    let mut resize = ResizeHandler::new(config.resize_debounce, config.renderer.max_pixel_ratio);

    let t0 = Instant::now();
    // 800x600 logical at a pixel ratio of 3
    resize.on_resize(viewport(2400, 1800, 3.0), t0);
    assert_eq!(
        resize.poll(t0 + config.resize_debounce, &mut camera, &mut controls),
        Some(PhysicalSize::new(1600, 1200))
    );
}

#[test]
fn minimized_window_is_not_applied() {
    let config = ViewerConfig::default();
    let (mut camera, mut controls) = camera_and_controls(&config);
    let aspect = camera.aspect;
    let mut resize = ResizeHandler::new(config.resize_debounce, config.renderer.max_pixel_ratio);

    let t0 = Instant::now();
    resize.on_resize(viewport(0, 0, 1.0), t0);
    assert_eq!(resize.poll(t0 + ms(200), &mut camera, &mut controls), None);
    assert_eq!(camera.aspect, aspect);
}
