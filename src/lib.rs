//! dojo-viewer
//!
//! A small cross-platform 3D scene viewer running natively and in the browser
//! (WASM): a gradient sky, a sun, ambient and directional light, two glTF
//! models streamed in the background and a textured ground plane, looked at
//! through damped orbit controls.
//!
//! High-level modules
//! - `camera`: perspective camera and its uniform
//! - `config`: every constant the scene is built from
//! - `context`: GPU and window context that owns device/queue/pipelines
//! - `context_loss`: reload scheduling after the GPU device is lost
//! - `controls`: damped orbit controls
//! - `data_structures`: meshes, materials, textures, transforms and the scene graph
//! - `flow`: the event loop and frame loop
//! - `pipelines`: render pipelines and their uniforms (lit, unlit, sky, light)
//! - `render`: render composition and pipeline batching
//! - `resize`: debounced resizing
//! - `resources`: asset fetching, glTF import, procedural geometry
//! - `world`: the scene contents
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod context_loss;
pub mod controls;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resize;
pub mod resources;
pub mod world;

pub use config::ViewerConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Web entry point: runs the viewer with the default configuration as soon as
/// the module is loaded.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
