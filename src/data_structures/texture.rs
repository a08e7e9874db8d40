//! GPU textures and texture creation utilities.
//!
//! [`Texture`] wraps a WGPU texture with its view and sampler. Colour textures
//! are created from decoded images via [`Texture::from_image`] and take a
//! [`SamplerOptions`] describing wrapping, filtering and anisotropy. When
//! mipmapped filtering is requested the full mip chain is generated on the CPU
//! and uploaded along with the base level.

use anyhow::*;
use image::{GenericImageView, imageops::FilterType};

/// A GPU texture with a view and sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub mip_level_count: u32,
    pub anisotropy: u16,
}

/// Sampler configuration applied when a texture is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerOptions {
    pub address_mode: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    /// `Some` builds a mip chain and filters between levels with this mode.
    pub mipmap_filter: Option<wgpu::FilterMode>,
    pub anisotropy: u16,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            address_mode: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: None,
            anisotropy: 1,
        }
    }
}

impl SamplerOptions {
    /// Repeat on both axes, trilinear minification and anisotropic filtering
    /// clamped to `min(device_max, cap)`.
    pub fn tiled(device_max: u16, cap: u16) -> Self {
        Self {
            address_mode: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: Some(wgpu::FilterMode::Linear),
            anisotropy: clamp_anisotropy(device_max, cap),
        }
    }
}

/// Effective anisotropy level: never above the device limit or `cap`, never below 1.
pub fn clamp_anisotropy(device_max: u16, cap: u16) -> u16 {
    device_max.min(cap).max(1)
}

/// Number of levels in a full mip chain for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `sample_count` has to match the colour target it is used with
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            mip_level_count: 1,
            anisotropy: 1,
        }
    }

    /// Multisampled colour target matching the surface. Frames are drawn into
    /// it and resolved into the surface texture.
    pub fn create_msaa_target(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("msaa_target"),
                size: wgpu::Extent3d {
                    width: config.width.max(1),
                    height: config.height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// A 1x1 opaque white texture. Bound wherever a material has no image (yet),
    /// so the base colour factor alone decides the colour.
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue, label: &str) -> Self {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([255, 255, 255, 255]),
        ));
        Self::from_image(device, queue, &img, Some(label), SamplerOptions::default())
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        options: SamplerOptions,
    ) -> Self {
        let (width, height) = img.dimensions();
        let mip_level_count = match options.mipmap_filter {
            Some(_) => mip_level_count(width, height),
            None => 1,
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut level_image = img.clone();
        for mip_level in 0..mip_level_count {
            let level_width = (width >> mip_level).max(1);
            let level_height = (height >> mip_level).max(1);
            if mip_level > 0 {
                level_image = level_image.resize_exact(level_width, level_height, FilterType::Triangle);
            }
            let rgba = level_image.to_rgba8();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level,
                    origin: wgpu::Origin3d::ZERO,
                },
                &rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        // WGPU rejects anisotropy unless every filter is linear.
        let all_linear = options.mag_filter == wgpu::FilterMode::Linear
            && options.min_filter == wgpu::FilterMode::Linear
            && options.mipmap_filter == Some(wgpu::FilterMode::Linear);
        let anisotropy = if all_linear { options.anisotropy.max(1) } else { 1 };

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: options.address_mode,
            address_mode_v: options.address_mode,
            address_mode_w: options.address_mode,
            mag_filter: options.mag_filter,
            min_filter: options.min_filter,
            mipmap_filter: options.mipmap_filter.unwrap_or(wgpu::FilterMode::Nearest),
            anisotropy_clamp: anisotropy,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            mip_level_count,
            anisotropy,
        }
    }
}

/// Decode image file contents, trusting the mime type when one is given.
pub fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> Result<image::DynamicImage> {
    let format = mime_type
        .and_then(|mt| mt.split('/').last())
        .and_then(image::ImageFormat::from_extension);
    let img = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anisotropy_never_exceeds_cap_or_device() {
        for device_max in [1u16, 2, 4, 8, 16] {
            let level = SamplerOptions::tiled(device_max, 8).anisotropy;
            assert!(level <= device_max.min(8));
        }
        assert_eq!(clamp_anisotropy(16, 8), 8);
        assert_eq!(clamp_anisotropy(4, 8), 4);
        assert_eq!(clamp_anisotropy(0, 8), 1);
    }

    #[test]
    fn tiled_sampler_repeats_with_trilinear_filtering() {
        let options = SamplerOptions::tiled(16, 8);
        assert_eq!(options.address_mode, wgpu::AddressMode::Repeat);
        assert_eq!(options.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(options.mipmap_filter, Some(wgpu::FilterMode::Linear));
    }

    #[test]
    fn mip_chain_goes_down_to_one_texel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(1000, 3), 10);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_image(&[0, 1, 2, 3], Some("image/png")).is_err());
        assert!(decode_image(&[0, 1, 2, 3], None).is_err());
    }
}
