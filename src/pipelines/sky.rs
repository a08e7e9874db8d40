//! Sky backdrop.
//!
//! A large sphere seen from the inside: only back faces are rasterized and it
//! never writes depth, so it cannot hide real geometry. The fragment colour is
//! a vertical gradient between a bottom and a top colour.

use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::{
    config::{Color, SkyConfig},
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{Mesh, ModelVertex, Side, Vertex},
    },
    pipelines::basic::{DepthOptions, mk_render_pipeline},
    resources::geometry,
};

/// CPU mirror of the gradient in `sky.wgsl`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyGradient {
    pub top: Color,
    pub bottom: Color,
}

impl SkyGradient {
    /// Linear colour the shader writes at a world position (or direction). `y`
    /// of the normalized vector is mapped from `[-1, 1]` to `[0, 1]` and blends
    /// the linear bottom colour into the linear top colour.
    pub fn color_at(&self, world_position: cgmath::Vector3<f32>) -> [f32; 3] {
        let h = world_position.normalize().y * 0.5 + 0.5;
        let bottom = self.bottom.to_linear();
        let top = self.top.to_linear();
        std::array::from_fn(|i| bottom[i] * (1.0 - h) + top[i] * h)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyUniform {
    pub top_color: [f32; 4],
    pub bottom_color: [f32; 4],
}

impl From<SkyGradient> for SkyUniform {
    fn from(gradient: SkyGradient) -> Self {
        let [tr, tg, tb] = gradient.top.to_linear();
        let [br, bg, bb] = gradient.bottom.to_linear();
        Self {
            top_color: [tr, tg, tb, 1.0],
            bottom_color: [br, bg, bb, 1.0],
        }
    }
}

pub struct Sky {
    pub mesh: Mesh,
    instance_buffer: wgpu::Buffer,
    #[allow(unused)]
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl Sky {
    pub fn new(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        config: &SkyConfig,
    ) -> Self {
        let gradient = SkyGradient {
            top: config.top,
            bottom: config.bottom,
        };
        let geometry = geometry::sphere(config.radius, config.segments, config.segments);
        let mesh = Mesh::new(device, "sky", &geometry.vertices, &geometry.indices, 0);

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Instance Buffer"),
            contents: bytemuck::cast_slice(&[Instance::new().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Buffer"),
            contents: bytemuck::cast_slice(&[SkyUniform::from(gradient)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("sky_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("sky_bind_group"),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sky Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout, camera_bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sky.wgsl").into()),
        };
        let pipeline = mk_render_pipeline(
            device,
            &layout,
            surface_config.format,
            Some(wgpu::BlendState::REPLACE),
            Some(DepthOptions {
                write: false,
                ..Default::default()
            }),
            Side::Back.cull_mode(),
            sample_count,
            &[ModelVertex::desc(), InstanceRaw::desc()],
            shader,
        );

        Self {
            mesh,
            instance_buffer,
            buffer,
            bind_group,
            pipeline,
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>, camera_bind_group: &'a wgpu::BindGroup) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_bind_group(1, camera_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.mesh.num_elements, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    fn gradient() -> SkyGradient {
        let config = ViewerConfig::default();
        SkyGradient {
            top: config.sky.top,
            bottom: config.sky.bottom,
        }
    }

    #[test]
    fn looking_up_sees_the_top_colour() {
        let g = gradient();
        assert_eq!(g.color_at([0.0, 1.0, 0.0].into()), g.top.to_linear());
        assert_eq!(g.color_at([0.0, 5000.0, 0.0].into()), g.top.to_linear());
    }

    #[test]
    fn looking_down_sees_the_bottom_colour() {
        let g = gradient();
        assert_eq!(g.color_at([0.0, -1.0, 0.0].into()), g.bottom.to_linear());
    }

    #[test]
    fn horizon_mixes_the_uploaded_colours() {
        let g = gradient();
        let uniform = SkyUniform::from(g);
        let c = g.color_at([1.0, 0.0, 0.0].into());
        for i in 0..3 {
            let mixed = (uniform.bottom_color[i] + uniform.top_color[i]) * 0.5;
            assert!((c[i] - mixed).abs() < 1e-6);
        }
    }

    #[test]
    fn horizon_is_not_an_srgb_blend() {
        let g = gradient();
        let srgb_mid = Color::new(
            (g.bottom.r + g.top.r) * 0.5,
            (g.bottom.g + g.top.g) * 0.5,
            (g.bottom.b + g.top.b) * 0.5,
        )
        .to_linear();
        let c = g.color_at([1.0, 0.0, 0.0].into());
        assert!((c[0] - srgb_mid[0]).abs() > 0.01);
    }

    #[test]
    fn uniform_matches_the_wgsl_layout() {
        assert_eq!(std::mem::size_of::<SkyUniform>(), 32);
    }
}
