//! Render composition and pipeline batching.
//!
//! Scene nodes describe what they want drawn as a [`Render`]. The frame loop
//! flattens all renders into one batch per pipeline and then draws the batches
//! in a fixed order: lit single-sided meshes, lit double-sided meshes, unlit
//! meshes. The sky is drawn before any of them by its own pipeline.
//!
//! # Key types
//!
//! - [`Render<'a>`] describes render operations of a node or a whole scene
//! - [`Instanced<'a>`] is one model with its per-instance transform buffer

use crate::{
    data_structures::{
        model::{DrawModel, Model, Side},
        scene_graph::SceneNode,
    },
    pipelines::Pipelines,
};

/// How a mesh is shaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// Texture times base colour, lit by the ambient and directional lights.
    Lit,
    /// Flat base colour. Used for light-emitting markers like the sun.
    Unlit,
}

/// A model and the instance buffer carrying its world transform.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub shading: Shading,
}

pub enum Render<'a> {
    Lit(Instanced<'a>),
    Unlit(Instanced<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Sort everything into per-pipeline batches.
    pub(crate) fn set_pipelines(self, lits: &mut Vec<Instanced<'a>>, unlits: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Lit(instanced) => lits.push(instanced),
            Render::Unlit(instanced) => unlits.push(instanced),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(lits, unlits)),
        }
    }
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        match instanced.shading {
            Shading::Lit => Render::Lit(instanced),
            Shading::Unlit => Render::Unlit(instanced),
        }
    }
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(sn: &'a dyn SceneNode) -> Self {
        Render::Composed(sn.get_render().into_iter().map(Render::from).collect())
    }
}

/// Draw the batches. Lit models are drawn twice, once per sidedness, since the
/// cull mode is part of the pipeline.
pub(crate) fn draw_batches<'a>(
    render_pass: &mut wgpu::RenderPass<'a>,
    pipelines: &'a Pipelines,
    lits: &[Instanced<'a>],
    unlits: &[Instanced<'a>],
    camera_bind_group: &'a wgpu::BindGroup,
    light_bind_group: &'a wgpu::BindGroup,
) {
    for side in [Side::Front, Side::Double] {
        let Some(pipeline) = pipelines.lit(side) else {
            continue;
        };
        render_pass.set_pipeline(pipeline);
        for instanced in lits.iter().filter(|i| i.model.has_side(side)) {
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_model_side_instanced(
                instanced.model,
                side,
                0..1,
                camera_bind_group,
                light_bind_group,
            );
        }
    }

    render_pass.set_pipeline(&pipelines.unlit);
    for instanced in unlits {
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_side_instanced(
            instanced.model,
            Side::Front,
            0..1,
            camera_bind_group,
            light_bind_group,
        );
    }
}
