//! GPU context.
//!
//! [`Context`] owns everything tied to one GPU device: the surface, the depth
//! buffer, the camera and light uniforms and the render pipelines. Losing the
//! device invalidates all of it at once, which is why a context-loss reload
//! drops and rebuilds the whole `Context`.

use std::sync::Arc;

use anyhow::Context as _;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::{CameraResources, PerspectiveCamera},
    config::ViewerConfig,
    context_loss::{ContextLostFlag, watch_device},
    data_structures::texture,
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
    resize::Viewport,
};

/// Anisotropy level assumed when the adapter reports support for anisotropic
/// filtering. wgpu accepts clamps up to 16.
const SUPPORTED_ANISOTROPY: u16 = 16;

/// Sample count for multisample antialiasing. 4 is the only count above 1
/// that wgpu offers without adapter specific features, so anything else
/// falls back to no multisampling.
pub fn msaa_sample_count(requested: u32, four_supported: bool) -> u32 {
    if requested >= 4 && four_supported { 4 } else { 1 }
}

fn supports_four_samples(adapter: &wgpu::Adapter, surface_format: wgpu::TextureFormat) -> bool {
    let color = adapter.get_texture_format_features(surface_format).flags;
    let depth = adapter
        .get_texture_format_features(texture::Texture::DEPTH_FORMAT)
        .flags;
    color.sample_count_supported(4)
        && color.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
        && depth.sample_count_supported(4)
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    /// Multisampled colour target, resolved into the surface each frame.
    /// `None` when antialiasing is off.
    pub(crate) msaa_view: Option<wgpu::TextureView>,
    pub sample_count: u32,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub light: LightResources,
    pub pipelines: Pipelines,
    /// Highest anisotropic filtering level the device supports.
    pub max_anisotropy: u16,
    /// Shadow mapping is switched on globally. Nothing in the scene casts a
    /// shadow, so no shadow pass is ever recorded.
    pub shadows: bool,
    pub(crate) lost: ContextLostFlag,
}

impl Context {
    /// `lost` is raised when the device goes away and is shared with whoever
    /// else watches for context loss (the canvas on the web).
    pub async fn new(
        window: Arc<Window>,
        viewer: &ViewerConfig,
        lost: ContextLostFlag,
    ) -> anyhow::Result<Self> {
        let viewport = Viewport::new(window.inner_size(), window.scale_factor());
        let size = viewport.surface_size(viewer.renderer.max_pixel_ratio);

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a drawing surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("could not open the GPU device")?;

        watch_device(&device, lost.clone());

        let max_anisotropy = if adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::ANISOTROPIC_FILTERING)
        {
            SUPPORTED_ANISOTROPY
        } else {
            1
        };

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear colour and rely on the surface to encode sRGB.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = PerspectiveCamera::new(&viewer.camera, config.width, config.height);
        let camera = CameraResources::new(&device, camera);

        let sample_count = msaa_sample_count(
            viewer.renderer.msaa_samples,
            supports_four_samples(&adapter, config.format),
        );
        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_view = (sample_count > 1)
            .then(|| texture::Texture::create_msaa_target(&device, &config, sample_count));

        let light_uniform = LightUniform::new(&viewer.ambient, &viewer.directional, &viewer.fog);
        let light = LightResources::new(light_uniform, &device);

        let pipelines = Pipelines::new(
            &device,
            &config,
            sample_count,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        log::info!(
            "surface {}x{} {:?}, {}x msaa, max anisotropy {}",
            config.width,
            config.height,
            config.format,
            sample_count,
            max_anisotropy
        );

        Ok(Self {
            window,
            depth_texture,
            msaa_view,
            sample_count,
            surface,
            device,
            queue,
            config,
            camera,
            light,
            pipelines,
            max_anisotropy,
            shadows: viewer.renderer.shadows,
            lost,
        })
    }

    /// Reconfigure the surface and reallocate the render targets. Zero sizes
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            self.sample_count,
            "depth_texture",
        );
        if self.msaa_view.is_some() {
            self.msaa_view = Some(texture::Texture::create_msaa_target(
                &self.device,
                &self.config,
                self.sample_count,
            ));
        }
    }

    /// Configure the surface again at its current size, after it was lost or
    /// became outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_samples_when_requested_and_supported() {
        assert_eq!(msaa_sample_count(4, true), 4);
        assert_eq!(msaa_sample_count(8, true), 4);
    }

    #[test]
    fn falls_back_to_one_sample() {
        assert_eq!(msaa_sample_count(4, false), 1);
        assert_eq!(msaa_sample_count(2, true), 1);
        assert_eq!(msaa_sample_count(0, true), 1);
    }
}
