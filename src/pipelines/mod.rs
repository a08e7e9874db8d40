//! Render pipelines.
//!
//! - `basic` builds the lit pipelines and the shared pipeline constructor
//! - `light` holds the ambient/directional/fog uniform
//! - `sky` is the gradient backdrop with its own pipeline and bind group
//! - `unlit` is for flat coloured meshes such as the sun marker

pub mod basic;
pub mod light;
pub mod sky;
pub mod unlit;

use crate::data_structures::model::Side;

#[derive(Debug)]
pub struct Pipelines {
    pub lit_front: wgpu::RenderPipeline,
    pub lit_double: wgpu::RenderPipeline,
    pub unlit: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let lit = |side| {
            basic::mk_lit_pipeline(
                device,
                config,
                side,
                sample_count,
                camera_bind_group_layout,
                light_bind_group_layout,
            )
        };
        Self {
            lit_front: lit(Side::Front),
            lit_double: lit(Side::Double),
            unlit: unlit::mk_unlit_pipeline(
                device,
                config,
                sample_count,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
        }
    }

    pub fn lit(&self, side: Side) -> Option<&wgpu::RenderPipeline> {
        match side {
            Side::Front => Some(&self.lit_front),
            Side::Double => Some(&self.lit_double),
            Side::Back => None,
        }
    }
}
