//! Viewer configuration.
//!
//! Every constant the scene is built from lives in [`ViewerConfig`]. There is no
//! config file: callers start from [`ViewerConfig::default`] and tweak fields
//! before handing the value to [`crate::flow::run`].

use instant::Duration;

/// An RGB colour in sRGB space with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a colour from a `0xRRGGBB` literal.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Convert to linear space. Shaders write to an sRGB surface so every colour
    /// uploaded as a uniform has to be linear.
    pub fn to_linear(self) -> [f32; 3] {
        let convert = |c: f32| {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        [convert(self.r), convert(self.g), convert(self.b)]
    }

    pub fn scaled(self, intensity: f32) -> [f32; 3] {
        let [r, g, b] = self.to_linear();
        [r * intensity, g * intensity, b * intensity]
    }
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Upper bound for the device pixel ratio used to size the surface.
    pub max_pixel_ratio: f64,
    /// Multisample antialiasing. Anything below 4 turns it off.
    pub msaa_samples: u32,
    pub shadows: bool,
    pub window_title: String,
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub position: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct ControlsConfig {
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub target: [f32; 3],
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

#[derive(Clone, Debug)]
pub struct SkyConfig {
    pub radius: f32,
    pub segments: u32,
    pub top: Color,
    pub bottom: Color,
}

#[derive(Clone, Debug)]
pub struct SunConfig {
    pub radius: f32,
    pub segments: u32,
    pub position: [f32; 3],
    pub color: Color,
}

#[derive(Clone, Debug)]
pub struct FogConfig {
    pub color: Color,
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Debug)]
pub struct AmbientLightConfig {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Clone, Debug)]
pub struct DirectionalLightConfig {
    pub color: Color,
    pub intensity: f32,
    pub position: [f32; 3],
    /// The point the light aims at. The light direction is `position - target`.
    pub target: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct GroundConfig {
    pub size: f32,
    pub height: f32,
    pub texture: String,
    pub texture_repeat: [f32; 2],
    /// Anisotropy never goes above this, regardless of what the device supports.
    pub max_anisotropy: u16,
}

/// A glTF asset to fetch and attach once it arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    pub path: String,
    pub scale: f32,
    pub position: [f32; 3],
}

impl ModelRequest {
    pub fn new(path: &str, scale: f32, position: [f32; 3]) -> Self {
        Self {
            path: path.to_string(),
            scale,
            position,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub renderer: RendererConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub sky: SkyConfig,
    pub sun: SunConfig,
    pub fog: FogConfig,
    pub ambient: AmbientLightConfig,
    pub directional: DirectionalLightConfig,
    pub ground: GroundConfig,
    pub models: Vec<ModelRequest>,
    pub resize_debounce: Duration,
    pub reload_delay: Duration,
    /// Directory assets are read from on native targets. The web build fetches
    /// relative to the page origin instead.
    pub asset_root: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig {
                max_pixel_ratio: 2.0,
                msaa_samples: 4,
                shadows: true,
                window_title: "dojo-viewer".to_string(),
            },
            camera: CameraConfig {
                fovy_degrees: 75.0,
                znear: 0.1,
                zfar: 10_000.0,
                position: [5.0, 5.0, 30.0],
            },
            controls: ControlsConfig {
                damping_factor: 0.1,
                enable_zoom: true,
                target: [0.0, 1.0, 0.0],
                rotate_speed: 1.0,
                zoom_speed: 1.0,
            },
            sky: SkyConfig {
                radius: 5000.0,
                segments: 16,
                top: Color::from_hex(0x6ba6c8),
                bottom: Color::from_hex(0xe6c000),
            },
            sun: SunConfig {
                radius: 10.0,
                segments: 16,
                position: [50.0, 20.0, -200.0],
                color: Color::from_hex(0xffd700),
            },
            fog: FogConfig {
                color: Color::from_hex(0x87ceeb),
                near: 50.0,
                far: 5000.0,
            },
            ambient: AmbientLightConfig {
                color: Color::from_hex(0x404040),
                intensity: 2.0,
            },
            directional: DirectionalLightConfig {
                color: Color::WHITE,
                intensity: 2.0,
                position: [5.0, 5.0, 5.0],
                target: [0.0, 0.0, 0.0],
            },
            ground: GroundConfig {
                size: 50.0,
                height: -10.0,
                texture: "/ground.jpg".to_string(),
                texture_repeat: [1.0, 1.0],
                max_anisotropy: 8,
            },
            models: vec![
                ModelRequest::new("/model.glb", 0.8, [0.0, -4.0, -2.0]),
                ModelRequest::new("/shotokan.glb", 0.03, [12.0, -9.0, 11.0]),
            ],
            resize_debounce: Duration::from_millis(200),
            reload_delay: Duration::from_millis(1000),
            asset_root: "assets".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours_are_split_into_channels() {
        let c = Color::from_hex(0xff8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn linear_conversion_keeps_black_and_white() {
        assert_eq!(Color::new(0.0, 0.0, 0.0).to_linear(), [0.0, 0.0, 0.0]);
        let [r, g, b] = Color::WHITE.to_linear();
        assert!((r - 1.0).abs() < 1e-6 && (g - 1.0).abs() < 1e-6 && (b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_requests_both_models() {
        let config = ViewerConfig::default();
        let paths: Vec<_> = config.models.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/model.glb", "/shotokan.glb"]);
        assert_eq!(config.resize_debounce, Duration::from_millis(200));
        assert_eq!(config.reload_delay, Duration::from_millis(1000));
    }

    #[test]
    fn antialiasing_is_on_by_default() {
        assert_eq!(ViewerConfig::default().renderer.msaa_samples, 4);
    }
}
