#![cfg(feature = "integration-tests")]

use cgmath::{One, Quaternion};
use dojo_viewer::{
    config::ModelRequest,
    data_structures::{model::Side, scene_graph::Scene},
    resources::{load_model_gltf, loader::attach_loaded_model},
};

use crate::common::test_utils::headless_device;

mod common;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

#[test]
fn gltf_hierarchy_keeps_node_transforms_and_materials() {
    let (device, queue, _adapter) = headless_device();
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut parent = runtime
        .block_on(load_model_gltf("/two_nodes.gltf", FIXTURES, &device, &queue))
        .unwrap();

    assert_eq!(parent.name(), "parent");
    assert_eq!(parent.node_count(), 2);
    assert!(parent.model_mut().is_none());

    let child = &mut parent.children_mut()[0];
    assert_eq!(child.name(), "child");
    let local = child.local_transform();
    assert_eq!(local.position, [1.0, 2.0, 3.0].into());
    assert_eq!(local.scale, [2.0, 2.0, 2.0].into());
    assert_eq!(local.rotation, Quaternion::one());

    let model = child.model_mut().expect("the child carries the mesh");
    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.materials[0].side, Side::Double);
    assert_eq!(model.materials[0].uniform.base_color, [0.5, 0.25, 1.0, 1.0]);
}

#[test]
fn missing_gltf_is_reported_and_attaches_nothing() {
    let (device, queue, _adapter) = headless_device();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut scene = Scene::new();
    let request = ModelRequest::new("/missing.glb", 1.0, [0.0, 0.0, 0.0]);

    let result = runtime.block_on(load_model_gltf(&request.path, FIXTURES, &device, &queue));
    let err = attach_loaded_model(&mut scene, &request, result).unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("/missing.glb"), "{}", message);
    assert_eq!(scene.node_count(), 1);
    assert!(!scene.has_model("/missing.glb"));
}
