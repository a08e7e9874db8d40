//! The scene itself.
//!
//! [`World`] assembles the sky backdrop, the sun marker and the ground plane,
//! and splices loaded models and the ground texture in when they arrive.
//! Lights live in [`Context`] as a uniform; the camera too.

use cgmath::{Deg, Rotation3};

use crate::{
    config::{GroundConfig, SunConfig, ViewerConfig},
    context::Context,
    data_structures::{
        instance::Instance,
        model::{Material, Mesh, Model, Side},
        scene_graph::{ModelNode, Scene, SceneNode},
        texture::{SamplerOptions, Texture},
    },
    pipelines::sky::Sky,
    render::Shading,
    resources::{
        geometry,
        loader::{Loaded, Loader, attach_loaded_model},
        texture::material_layout,
    },
};

pub const SUN_NODE: &str = "sun";
pub const GROUND_NODE: &str = "ground";

pub struct World {
    pub sky: Sky,
    pub scene: Scene,
    ground_texture: String,
    ground_anisotropy_cap: u16,
}

impl World {
    /// Build the static part of the scene. Models and the ground texture are
    /// requested from `loader` and show up later.
    pub fn new(ctx: &Context, config: &ViewerConfig, loader: &Loader) -> Self {
        let sky = Sky::new(
            &ctx.device,
            &ctx.config,
            ctx.sample_count,
            &ctx.camera.bind_group_layout,
            &config.sky,
        );

        let mut scene = Scene::new();
        scene.add(Box::new(mk_sun(ctx, &config.sun)));
        scene.add(Box::new(mk_ground(ctx, &config.ground)));

        for request in &config.models {
            loader.load_model(request.clone());
        }
        loader.load_image(&config.ground.texture);

        Self {
            sky,
            scene,
            ground_texture: config.ground.texture.clone(),
            ground_anisotropy_cap: config.ground.max_anisotropy,
        }
    }

    /// Splice a finished load into the scene. Failures are logged and leave the
    /// scene as it was.
    pub fn on_loaded(&mut self, ctx: &Context, loaded: Loaded) {
        match loaded {
            Loaded::Model { request, result } => {
                match attach_loaded_model(&mut self.scene, &request, result) {
                    Ok(()) => log::info!("attached {}", request.path),
                    Err(e) => log::error!("{:#}", e),
                }
            }
            Loaded::Image { path, result } => match result {
                Ok(img) if path == self.ground_texture => self.apply_ground_texture(ctx, &img),
                Ok(_) => log::warn!("no use for image {}", path),
                Err(e) => log::error!("Error loading {}: {:#}", path, e),
            },
        }
    }

    fn apply_ground_texture(&mut self, ctx: &Context, img: &image::DynamicImage) {
        let options = SamplerOptions::tiled(ctx.max_anisotropy, self.ground_anisotropy_cap);
        let texture = Texture::from_image(
            &ctx.device,
            &ctx.queue,
            img,
            Some(self.ground_texture.as_str()),
            options,
        );
        log::info!(
            "ground texture {}: {} mip levels, anisotropy {}",
            self.ground_texture,
            texture.mip_level_count,
            texture.anisotropy
        );
        let Some(model) = self.scene.find_mut(GROUND_NODE).and_then(|node| node.model_mut()) else {
            log::warn!("no ground to put {} on", self.ground_texture);
            return;
        };
        let layout = material_layout(&ctx.device);
        for material in model.materials.iter_mut() {
            material.set_texture(&ctx.device, texture.clone(), &layout);
        }
    }

    /// Recompute transforms and upload them.
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.scene.update_world_transforms();
        self.scene.write_to_buffers(queue);
    }
}

fn mk_sun(ctx: &Context, config: &SunConfig) -> ModelNode {
    let geometry = geometry::sphere(config.radius, config.segments, config.segments);
    let [r, g, b] = config.color.to_linear();
    let model = single_mesh_model(
        ctx,
        SUN_NODE,
        &geometry,
        Texture::create_white(&ctx.device, &ctx.queue, "sun"),
        [r, g, b, 1.0],
        Side::Front,
    );
    let mut node = ModelNode::new(&ctx.device, SUN_NODE, model, Shading::Unlit);
    node.set_local_transform(Instance::placed(config.position, 1.0));
    node
}

/// Horizontal plane, drawn from both sides. Starts out white until the
/// texture arrives.
fn mk_ground(ctx: &Context, config: &GroundConfig) -> ModelNode {
    let geometry = geometry::plane(config.size, config.size).repeat_uvs(config.texture_repeat);
    let model = single_mesh_model(
        ctx,
        GROUND_NODE,
        &geometry,
        Texture::create_white(&ctx.device, &ctx.queue, "ground placeholder"),
        [1.0; 4],
        Side::Double,
    );
    let mut node = ModelNode::new(&ctx.device, GROUND_NODE, model, Shading::Lit);
    node.set_local_transform(ground_transform(config));
    node
}

/// The plane geometry faces +Z; a -90° turn about X lays it flat facing up.
pub fn ground_transform(config: &GroundConfig) -> Instance {
    Instance {
        position: cgmath::Vector3::new(0.0, config.height, 0.0),
        rotation: cgmath::Quaternion::from_angle_x(Deg(-90.0)),
        scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
    }
}

fn single_mesh_model(
    ctx: &Context,
    name: &str,
    geometry: &geometry::Geometry,
    texture: Texture,
    base_color: [f32; 4],
    side: Side,
) -> Model {
    let material = Material::new(
        &ctx.device,
        name,
        texture,
        base_color,
        side,
        &material_layout(&ctx.device),
    );
    let mesh = Mesh::new(&ctx.device, name, &geometry.vertices, &geometry.indices, 0);
    Model {
        meshes: vec![mesh],
        materials: vec![material],
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;

    #[test]
    fn ground_lies_flat_and_faces_up() {
        let config = ViewerConfig::default();
        let transform = ground_transform(&config.ground);
        let up = transform.rotation * Vector3::new(0.0, 0.0, 1.0);
        assert!((up - Vector3::unit_y()).magnitude() < 1e-6);
        assert_eq!(transform.position, Vector3::new(0.0, -10.0, 0.0));
    }
}
