//! Fire-and-forget asset loading.
//!
//! Loads run in the background (a tokio task natively, a `spawn_local` future
//! on the web) and report back to the event loop as [`ViewerEvent::Loaded`].
//! Nobody waits on them; the scene renders without the asset until it arrives.
//! A failed load is reported once and never retried.

use anyhow::Context as _;
use winit::event_loop::EventLoopProxy;

use crate::{
    config::ModelRequest,
    data_structures::{
        instance::Instance,
        scene_graph::{ContainerNode, Scene, SceneNode},
    },
    flow::ViewerEvent,
    resources::{load_model_gltf, texture::load_image},
};

/// The result of a background load.
pub enum Loaded {
    Model {
        request: ModelRequest,
        result: anyhow::Result<Box<dyn SceneNode>>,
    },
    Image {
        path: String,
        result: anyhow::Result<image::DynamicImage>,
    },
}

impl std::fmt::Debug for Loaded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model { request, result } => f
                .debug_struct("Model")
                .field("path", &request.path)
                .field("ok", &result.is_ok())
                .finish(),
            Self::Image { path, result } => f
                .debug_struct("Image")
                .field("path", path)
                .field("ok", &result.is_ok())
                .finish(),
        }
    }
}

/// Spawns asset loads. `generation` tags every result so the event loop can
/// drop results meant for a GPU context that has since been rebuilt.
pub struct Loader {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
    proxy: EventLoopProxy<ViewerEvent>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    asset_root: String,
    generation: u32,
}

impl Loader {
    pub fn new(
        #[cfg(not(target_arch = "wasm32"))] runtime: tokio::runtime::Handle,
        proxy: EventLoopProxy<ViewerEvent>,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        asset_root: &str,
        generation: u32,
    ) -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            runtime,
            proxy,
            // device and queue are handles, cloning shares the same GPU objects
            device: device.clone(),
            queue: queue.clone(),
            asset_root: asset_root.to_string(),
            generation,
        }
    }

    pub fn load_model(&self, request: ModelRequest) {
        let device = self.device.clone();
        let queue = self.queue.clone();
        let asset_root = self.asset_root.clone();
        let proxy = self.proxy.clone();
        let generation = self.generation;
        log::debug!("loading {}", request.path);
        self.spawn(async move {
            let result = load_model_gltf(&request.path, &asset_root, &device, &queue).await;
            send(&proxy, generation, Loaded::Model { request, result });
        });
    }

    pub fn load_image(&self, path: &str) {
        let path = path.to_string();
        let asset_root = self.asset_root.clone();
        let proxy = self.proxy.clone();
        let generation = self.generation;
        log::debug!("loading {}", path);
        self.spawn(async move {
            let result = load_image(&path, &asset_root).await;
            send(&proxy, generation, Loaded::Image { path, result });
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn(&self, fut: impl Future<Output = ()> + 'static) {
        wasm_bindgen_futures::spawn_local(fut);
    }
}

fn send(proxy: &EventLoopProxy<ViewerEvent>, generation: u32, loaded: Loaded) {
    if proxy
        .send_event(ViewerEvent::Loaded { generation, loaded })
        .is_err()
    {
        log::debug!("event loop closed before a load finished");
    }
}

/// Place a loaded model at its requested scale and position and attach it to
/// the scene. On failure nothing is attached and the error names the asset.
pub fn attach_loaded_model(
    scene: &mut Scene,
    request: &ModelRequest,
    result: anyhow::Result<Box<dyn SceneNode>>,
) -> anyhow::Result<()> {
    let node = result.with_context(|| format!("Error loading {}", request.path))?;
    let mut placed = ContainerNode::new(&request.path);
    placed.set_local_transform(Instance::placed(request.position, request.scale));
    placed.add_child(node);
    scene
        .attach_model(&request.path, Box::new(placed))
        .with_context(|| format!("Error loading {}", request.path))
}
