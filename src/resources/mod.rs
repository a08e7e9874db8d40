//! Loading of external assets and procedural geometry.
//!
//! - `texture` fetches raw bytes and images and builds GPU textures from them
//! - `geometry` generates spheres and planes
//! - `loader` runs asset loads in the background and reports back to the event loop
//!
//! glTF models are read here, turned into a scene sub-graph that keeps the file's
//! node hierarchy and node transforms.

use anyhow::Context as _;
use futures::future::try_join_all;

use crate::{
    data_structures::{
        instance::Instance,
        model::{self, Side},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::{SamplerOptions, Texture, decode_image},
    },
    render::Shading,
    resources::texture::{load_binary, material_layout},
};

pub mod geometry;
pub mod loader;
pub mod texture;

/// Shading parameters of one glTF material, before it is bound to a mesh.
#[derive(Clone)]
struct MaterialDesc {
    name: String,
    texture: Option<usize>,
    base_color: [f32; 4],
    side: Side,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            texture: None,
            base_color: [1.0; 4],
            side: Side::Front,
        }
    }
}

/// Everything a glTF node needs to become a scene node.
struct GltfAssets<'a> {
    buffers: &'a [Vec<u8>],
    textures: &'a [Texture],
    materials: &'a [MaterialDesc],
    white: &'a Texture,
    layout: &'a wgpu::BindGroupLayout,
}

/// Load a glTF/GLB file into a scene sub-graph. A file with a single root node
/// yields that node, several roots are grouped under a container named after
/// the file.
pub async fn load_model_gltf(
    file_name: &str,
    asset_root: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let data = load_binary(file_name, asset_root).await?;
    let gltf = gltf::Gltf::from_slice(&data)?;

    // Load buffers, external ones concurrently
    let blob = gltf.blob.as_deref();
    let buffer_data: Vec<Vec<u8>> = try_join_all(gltf.buffers().map(|buffer| async move {
        match buffer.source() {
            gltf::buffer::Source::Bin => blob
                .map(<[u8]>::to_vec)
                .context("binary buffer referenced but the file has no BIN chunk"),
            gltf::buffer::Source::Uri(uri) => {
                load_binary(&sibling_path(file_name, uri), asset_root).await
            }
        }
    }))
    .await?;

    // Load images
    let buffers = &buffer_data;
    let images = try_join_all(gltf.images().map(|image| async move {
        match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                decode_image(buffer_view(buffers, &view)?, Some(mime_type))
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let bytes = load_binary(&sibling_path(file_name, uri), asset_root).await?;
                decode_image(&bytes, mime_type)
            }
        }
    }))
    .await?;

    let textures: Vec<Texture> = gltf
        .textures()
        .map(|texture| {
            let source = texture.source().index();
            let img = images
                .get(source)
                .with_context(|| format!("texture refers to missing image {}", source))?;
            Ok(Texture::from_image(
                device,
                queue,
                img,
                Some(&format!("{} image {}", file_name, source)),
                SamplerOptions {
                    address_mode: wgpu::AddressMode::Repeat,
                    mipmap_filter: Some(wgpu::FilterMode::Linear),
                    ..Default::default()
                },
            ))
        })
        .collect::<anyhow::Result<_>>()?;

    // Load materials
    let materials: Vec<MaterialDesc> = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            MaterialDesc {
                name: material.name().unwrap_or(file_name).to_string(),
                texture: pbr.base_color_texture().map(|info| info.texture().index()),
                base_color: pbr.base_color_factor(),
                side: if material.double_sided() {
                    Side::Double
                } else {
                    Side::Front
                },
            }
        })
        .collect();

    let white = Texture::create_white(device, queue, "gltf white");
    let layout = material_layout(device);
    let assets = GltfAssets {
        buffers: &buffer_data,
        textures: &textures,
        materials: &materials,
        white: &white,
        layout: &layout,
    };

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{} contains no scene", file_name))?;
    let mut roots = Vec::new();
    for node in scene.nodes() {
        roots.push(to_scene_node(node, &assets, device)?);
    }

    let root_node = if roots.len() == 1 {
        roots.remove(0)
    } else {
        let mut root_node = ContainerNode::new(file_name);
        root_node.children = roots;
        Box::new(root_node)
    };
    log::info!("loaded {} ({} nodes)", file_name, root_node.node_count());
    Ok(root_node)
}

fn to_scene_node(
    node: gltf::scene::Node,
    assets: &GltfAssets,
    device: &wgpu::Device,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node {}", node.index()));

    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let model = to_model(&mesh, assets, device);
            Box::new(ModelNode::new(device, &name, model, Shading::Lit))
        }
        None => Box::new(ContainerNode::new(&name)),
    };

    let (position, rotation, scale) = node.transform().decomposed();
    scene_node.set_local_transform(Instance {
        position: position.into(),
        rotation: rotation.into(),
        scale: scale.into(),
    });

    for child in node.children() {
        scene_node.add_child(to_scene_node(child, assets, device)?);
    }
    Ok(scene_node)
}

/// One mesh per triangle primitive, each with its own material instance.
fn to_model(mesh: &gltf::Mesh, assets: &GltfAssets, device: &wgpu::Device) -> model::Model {
    let mesh_name = mesh.name().unwrap_or("unknown_mesh");
    let mut meshes = Vec::new();
    let mut materials = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "skipping primitive {} of mesh {}: {:?} is not supported",
                primitive.index(),
                mesh_name,
                primitive.mode()
            );
            continue;
        }
        let Some(vertices) = read_vertices(&primitive, assets.buffers) else {
            log::warn!("primitive {} of mesh {} has no positions", primitive.index(), mesh_name);
            continue;
        };
        let reader = primitive.reader(|buffer| assets.buffers.get(buffer.index()).map(Vec::as_slice));
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let desc = primitive
            .material()
            .index()
            .and_then(|idx| assets.materials.get(idx))
            .cloned()
            .unwrap_or_default();
        let texture = desc
            .texture
            .and_then(|idx| assets.textures.get(idx))
            .unwrap_or(assets.white)
            .clone();

        materials.push(model::Material::new(
            device,
            &desc.name,
            texture,
            desc.base_color,
            desc.side,
            assets.layout,
        ));
        meshes.push(model::Mesh::new(
            device,
            mesh_name,
            &vertices,
            &indices,
            materials.len() - 1,
        ));
    }

    model::Model { meshes, materials }
}

/// Positions, normals and first texture coordinate set of a primitive.
/// Missing normals point up, missing texture coordinates are zero.
fn read_vertices(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> Option<Vec<model::ModelVertex>> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<model::ModelVertex> = reader
        .read_positions()?
        .map(|position| model::ModelVertex {
            position,
            tex_coords: [0.0, 0.0],
            normal: [0.0, 1.0, 0.0],
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
    }
    Some(vertices)
}

fn buffer_view<'a>(buffers: &'a [Vec<u8>], view: &gltf::buffer::View) -> anyhow::Result<&'a [u8]> {
    let buffer = buffers
        .get(view.buffer().index())
        .with_context(|| format!("buffer view {} refers to a missing buffer", view.index()))?;
    buffer
        .get(view.offset()..view.offset() + view.length())
        .with_context(|| format!("buffer view {} is out of bounds", view.index()))
}

/// Resolve a URI found inside a glTF file relative to that file.
pub fn sibling_path(file_name: &str, uri: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}{}", &file_name[..=idx], uri),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_resolve_next_to_the_gltf_file() {
        assert_eq!(sibling_path("/model.gltf", "model.bin"), "/model.bin");
        assert_eq!(sibling_path("/dojo/hall.gltf", "tex/floor.png"), "/dojo/tex/floor.png");
        assert_eq!(sibling_path("hall.gltf", "hall.bin"), "hall.bin");
    }

    #[test]
    fn unknown_materials_are_white_and_single_sided() {
        let desc = MaterialDesc::default();
        assert_eq!(desc.base_color, [1.0; 4]);
        assert_eq!(desc.side, Side::Front);
        assert!(desc.texture.is_none());
    }

    #[test]
    fn positions_only_primitives_face_up_with_zero_tex_coords() {
        let gltf =
            gltf::Gltf::from_slice(include_bytes!("../../tests/fixtures/two_nodes.gltf")).unwrap();
        let buffers = vec![include_bytes!("../../tests/fixtures/two_nodes.bin").to_vec()];
        let mesh = gltf.meshes().next().unwrap();
        let primitive = mesh.primitives().next().unwrap();

        let vertices = read_vertices(&primitive, &buffers).unwrap();

        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        for vertex in &vertices {
            assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
            assert_eq!(vertex.tex_coords, [0.0, 0.0]);
        }
    }
}
