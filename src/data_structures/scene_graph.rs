//! Scene graph and hierarchical scene organization.
//!
//! Every node owns its children and carries a local transform; the world
//! transform is the parent's world matrix times the local one. Nodes are
//! only ever added, never removed: the graph lives as long as the GPU context
//! that owns its buffers.

use std::collections::HashSet;

use anyhow::bail;
use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::Model,
    },
    render::{Instanced, Render, Shading},
};

/// A node of the scene graph.
///
/// Nodes are `Send` so that assets can be turned into nodes on a loader task
/// and handed to the event loop in one piece.
pub trait SceneNode: Send {
    fn name(&self) -> &str;

    fn local_transform(&self) -> &Instance;

    fn set_local_transform(&mut self, instance: Instance);

    fn world_transform(&self) -> &Matrix4<f32>;

    /// Recompute this node's world transform from its parent's and pass it on
    /// to all children.
    fn update_world_transform(&mut self, parent: &Matrix4<f32>);

    fn children(&self) -> &[Box<dyn SceneNode>];

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children_mut().push(child);
    }

    /// Upload world transforms of this node and its descendants.
    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    fn get_render(&self) -> Vec<Instanced<'_>>;

    /// The drawable model, for nodes that have one.
    fn model_mut(&mut self) -> Option<&mut Model> {
        None
    }

    /// Number of nodes in this subtree, this one included.
    fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// A transform-only node grouping its children.
pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    local: Instance,
    world: Matrix4<f32>,
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            local: Instance::default(),
            world: Matrix4::identity(),
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn world_transform(&self) -> &Matrix4<f32> {
        &self.world
    }

    fn update_world_transform(&mut self, parent: &Matrix4<f32>) {
        self.world = *parent * self.local.to_matrix();
        for child in self.children.iter_mut() {
            child.update_world_transform(&self.world);
        }
    }

    fn children(&self) -> &[Box<dyn SceneNode>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A node drawing one model at its world transform.
pub struct ModelNode {
    name: String,
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    local: Instance,
    world: Matrix4<f32>,
    model: Model,
    shading: Shading,
}

impl ModelNode {
    pub fn new(device: &wgpu::Device, name: &str, model: Model, shading: Shading) -> Self {
        let world = Matrix4::identity();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Instance Buffer", name)),
            contents: bytemuck::cast_slice(&[InstanceRaw::from_matrix(world)]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            name: name.to_string(),
            children: Vec::new(),
            instance_buffer,
            local: Instance::default(),
            world,
            model,
            shading,
        }
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn world_transform(&self) -> &Matrix4<f32> {
        &self.world
    }

    fn update_world_transform(&mut self, parent: &Matrix4<f32>) {
        self.world = *parent * self.local.to_matrix();
        for child in self.children.iter_mut() {
            child.update_world_transform(&self.world);
        }
    }

    fn children(&self) -> &[Box<dyn SceneNode>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        let raw = InstanceRaw::from_matrix(self.world);
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&[raw]));
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                shading: self.shading,
            }])
            .collect()
    }

    fn model_mut(&mut self) -> Option<&mut Model> {
        Some(&mut self.model)
    }
}

/// The scene: a root container plus bookkeeping for loaded models, each of
/// which may be attached at most once.
pub struct Scene {
    root: ContainerNode,
    models: HashSet<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: ContainerNode::new("scene"),
            models: HashSet::new(),
        }
    }

    pub fn add(&mut self, node: Box<dyn SceneNode>) {
        self.root.add_child(node);
        self.update_world_transforms();
    }

    /// Attach a loaded model sub-graph under `name`. A second attach under the
    /// same name is an error and leaves the scene untouched.
    pub fn attach_model(&mut self, name: &str, node: Box<dyn SceneNode>) -> anyhow::Result<()> {
        if self.models.contains(name) {
            bail!("model {} is already attached", name);
        }
        self.models.insert(name.to_string());
        self.add(node);
        Ok(())
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains(name)
    }

    pub fn root(&self) -> &dyn SceneNode {
        &self.root
    }

    /// All nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// First node called `name`, depth first.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Box<dyn SceneNode>> {
        fn find<'n>(
            nodes: &'n mut Vec<Box<dyn SceneNode>>,
            name: &str,
        ) -> Option<&'n mut Box<dyn SceneNode>> {
            for node in nodes.iter_mut() {
                if node.name() == name {
                    return Some(node);
                }
                if let Some(found) = find(node.children_mut(), name) {
                    return Some(found);
                }
            }
            None
        }
        find(&mut self.root.children, name)
    }

    pub fn update_world_transforms(&mut self) {
        self.root.update_world_transform(&Matrix4::identity());
    }

    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.root.write_to_buffers(queue);
    }

    pub fn get_render(&self) -> Render<'_> {
        Render::from(self.root())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, InnerSpace, Rotation3};

    use super::*;

    fn container(name: &str, instance: Instance) -> Box<dyn SceneNode> {
        let mut node = ContainerNode::new(name);
        node.set_local_transform(instance);
        Box::new(node)
    }

    #[test]
    fn world_transform_is_parent_times_local() {
        let mut parent = ContainerNode::new("parent");
        parent.set_local_transform(Instance {
            position: cgmath::Vector3::new(0.0, -4.0, -2.0),
            rotation: cgmath::Quaternion::from_angle_y(Deg(90.0)),
            scale: cgmath::Vector3::new(2.0, 2.0, 2.0),
        });
        parent.add_child(container("child", Instance::placed([1.0, 0.0, 0.0], 1.0)));
        parent.update_world_transform(&Matrix4::identity());

        let child = *parent.children()[0].world_transform();
        // x is scaled by 2 and rotated onto -z
        assert!((child.w.truncate() - cgmath::Vector3::new(0.0, -4.0, -4.0)).magnitude2() < 1e-8);
        assert!((child.x.truncate().magnitude() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rotated_child_of_a_stretched_parent_is_sheared() {
        let mut parent = ContainerNode::new("parent");
        parent.set_local_transform(Instance {
            scale: cgmath::Vector3::new(2.0, 1.0, 1.0),
            ..Instance::new()
        });
        parent.add_child(container(
            "child",
            Instance {
                rotation: cgmath::Quaternion::from_angle_z(Deg(90.0)),
                ..Instance::new()
            },
        ));
        parent.update_world_transform(&Matrix4::identity());

        let child = *parent.children()[0].world_transform();
        // the child's x axis turns onto y and is not stretched, its y axis
        // turns onto -x and is
        let x = child * cgmath::Vector4::unit_x();
        let y = child * cgmath::Vector4::unit_y();
        assert!((x.truncate() - cgmath::Vector3::new(0.0, 1.0, 0.0)).magnitude() < 1e-6);
        assert!((y.truncate() - cgmath::Vector3::new(-2.0, 0.0, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn models_attach_once() {
        let mut scene = Scene::new();
        scene
            .attach_model("/model.glb", container("a", Instance::default()))
            .unwrap();
        assert!(scene.attach_model("/model.glb", container("b", Instance::default())).is_err());
        assert!(scene.has_model("/model.glb"));
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn nested_nodes_are_found_by_name() {
        let mut scene = Scene::new();
        let mut group = ContainerNode::new("group");
        group.add_child(container("ground", Instance::default()));
        scene.add(Box::new(group));
        assert!(scene.find_mut("ground").is_some());
        assert!(scene.find_mut("sky").is_none());
    }
}
