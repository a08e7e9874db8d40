use dojo_viewer::{
    ViewerConfig,
    camera::PerspectiveCamera,
    controls::OrbitControls,
    data_structures::scene_graph::{ContainerNode, SceneNode},
};
use instant::Duration;

pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Camera and orbit controls for an 800x600 surface, set up from the default
/// configuration.
pub fn camera_and_controls(config: &ViewerConfig) -> (PerspectiveCamera, OrbitControls) {
    let camera = PerspectiveCamera::new(&config.camera, 800, 600);
    let controls = OrbitControls::new(&config.controls, 600);
    (camera, controls)
}

/// A stand-in for a loaded glTF file: a root with `children` empty child nodes.
pub fn fake_model(name: &str, children: usize) -> Box<dyn SceneNode> {
    let mut root = ContainerNode::new(name);
    for i in 0..children {
        root.add_child(Box::new(ContainerNode::new(&format!("{} child {}", name, i))));
    }
    Box::new(root)
}

#[cfg(feature = "integration-tests")]
pub fn headless_device() -> (wgpu::Device, wgpu::Queue, wgpu::Adapter) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    runtime.block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .expect("no GPU adapter available");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("test device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("could not open the GPU device");
        (device, queue, adapter)
    })
}
