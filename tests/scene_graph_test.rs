use anyhow::anyhow;
use cgmath::{InnerSpace, Vector3};
use dojo_viewer::{
    config::ModelRequest,
    data_structures::scene_graph::{Scene, SceneNode},
    resources::loader::attach_loaded_model,
};

use crate::common::test_utils::fake_model;

mod common;

#[test]
fn loaded_model_is_attached_once_at_its_position() {
    let mut scene = Scene::new();
    let request = ModelRequest::new("/dojo.glb", 3.0, [0.0, -10.0, 0.0]);

    attach_loaded_model(&mut scene, &request, Ok(fake_model("dojo", 2))).unwrap();
    assert!(scene.has_model("/dojo.glb"));
    // root, placement container, model root and its two children
    assert_eq!(scene.node_count(), 5);

    let placed = scene.find_mut("/dojo.glb").expect("placement node");
    assert_eq!(placed.local_transform().position, [0.0, -10.0, 0.0].into());
    assert_eq!(placed.local_transform().scale, [3.0, 3.0, 3.0].into());

    let err = attach_loaded_model(&mut scene, &request, Ok(fake_model("dojo", 2))).unwrap_err();
    assert!(format!("{:#}", err).contains("/dojo.glb"));
    assert_eq!(scene.node_count(), 5);
}

#[test]
fn failed_load_attaches_nothing_and_names_the_asset() {
    let mut scene = Scene::new();
    let request = ModelRequest::new("/boy.glb", 0.1, [5.0, -10.0, 0.0]);

    let err = attach_loaded_model(&mut scene, &request, Err(anyhow!("404 Not Found"))).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Error loading /boy.glb"), "{}", message);
    assert!(message.contains("404 Not Found"), "{}", message);
    assert!(!scene.has_model("/boy.glb"));
    assert_eq!(scene.node_count(), 1);
}

#[test]
fn one_failure_does_not_keep_the_other_model_out() {
    let mut scene = Scene::new();
    let dojo = ModelRequest::new("/dojo.glb", 3.0, [0.0, -10.0, 0.0]);
    let boy = ModelRequest::new("/boy.glb", 0.1, [5.0, -10.0, 0.0]);

    assert!(attach_loaded_model(&mut scene, &boy, Err(anyhow!("broken"))).is_err());
    attach_loaded_model(&mut scene, &dojo, Ok(fake_model("dojo", 0))).unwrap();

    assert!(scene.has_model("/dojo.glb"));
    assert!(!scene.has_model("/boy.glb"));
}

#[test]
fn placement_scales_the_loaded_subtree() {
    let mut scene = Scene::new();
    let request = ModelRequest::new("/boy.glb", 0.1, [5.0, -10.0, 0.0]);
    attach_loaded_model(&mut scene, &request, Ok(fake_model("boy", 1))).unwrap();
    scene.update_world_transforms();

    let child = scene.find_mut("boy child 0").expect("child node");
    let world = *child.world_transform();
    assert_eq!(world.w.truncate(), Vector3::new(5.0, -10.0, 0.0));
    assert!((world.x.truncate().magnitude() - 0.1).abs() < 1e-6);
}
