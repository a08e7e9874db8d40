#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    dojo_viewer::run(dojo_viewer::ViewerConfig::default())
}

// the web build starts from the library's `wasm_bindgen(start)` entry point
#[cfg(target_arch = "wasm32")]
fn main() {}
