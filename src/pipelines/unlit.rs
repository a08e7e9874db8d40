use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Side, Vertex},
    },
    pipelines::basic::{DepthOptions, mk_render_pipeline},
    resources::texture::material_layout,
};

/// Flat coloured meshes that ignore lighting (the sun marker). Fog still applies.
pub fn mk_unlit_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Unlit Pipeline Layout"),
        bind_group_layouts: &[
            &material_layout(device),
            camera_bind_group_layout,
            light_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Unlit Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("unlit.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState::REPLACE),
        Some(DepthOptions::default()),
        Side::Front.cull_mode(),
        sample_count,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
