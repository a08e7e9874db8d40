//! Scene lighting: one ambient and one directional light, plus the fog that
//! lit and unlit materials fade into. All of it goes to the GPU as a single
//! uniform bound at group 2.

use wgpu::util::DeviceExt;

use crate::config::{AmbientLightConfig, DirectionalLightConfig, FogConfig};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub directional: [f32; 3],
    _padding2: u32,
    /// Unit vector from the lit surface towards the light.
    pub direction: [f32; 3],
    _padding3: u32,
    pub fog_color: [f32; 3],
    _padding4: u32,
    /// `[near, far, 0, 0]`
    pub fog_range: [f32; 4],
}

impl LightUniform {
    pub fn new(
        ambient: &AmbientLightConfig,
        directional: &DirectionalLightConfig,
        fog: &FogConfig,
    ) -> Self {
        Self {
            ambient: ambient.color.scaled(ambient.intensity),
            _padding: 0,
            directional: directional.color.scaled(directional.intensity),
            _padding2: 0,
            direction: light_direction(directional.position, directional.target),
            _padding3: 0,
            fog_color: fog.color.to_linear(),
            _padding4: 0,
            fog_range: [fog.near, fog.far, 0.0, 0.0],
        }
    }
}

/// Direction a directional light shines from: `position - target`, normalized.
/// A light sitting on its target falls back to straight down.
pub fn light_direction(position: [f32; 3], target: [f32; 3]) -> [f32; 3] {
    use cgmath::InnerSpace;
    let dir = cgmath::Vector3::from(position) - cgmath::Vector3::from(target);
    if dir.magnitude2() == 0.0 {
        return [0.0, 1.0, 0.0];
    }
    dir.normalize().into()
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(uniform: LightUniform, device: &wgpu::Device) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    #[test]
    fn uniform_matches_the_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 80);
    }

    #[test]
    fn default_light_shines_from_its_position_towards_the_origin() {
        let config = ViewerConfig::default();
        let uniform = LightUniform::new(&config.ambient, &config.directional, &config.fog);
        let k = 1.0 / 3f32.sqrt();
        for c in uniform.direction {
            assert!((c - k).abs() < 1e-6);
        }
        assert_eq!(uniform.fog_range, [50.0, 5000.0, 0.0, 0.0]);
        assert_eq!(uniform.directional, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn degenerate_light_points_down() {
        assert_eq!(light_direction([1.0; 3], [1.0; 3]), [0.0, 1.0, 0.0]);
    }
}
