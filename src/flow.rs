//! Application event loop.
//!
//! [`run`] opens a window (native) or appends a canvas to the page (web), sets
//! up the GPU context and the scene, and then drives everything from winit's
//! event loop: pointer input goes to the orbit controls, resizes go through the
//! debouncer, finished asset loads arrive as user events and every redraw
//! renders one frame and asks for the next.
//!
//! # Lifecycle Flow
//!
//! Each redraw:
//! 1. Apply a settled resize, if any
//! 2. Advance the orbit controls by one damping step
//! 3. Upload camera and node transforms
//! 4. Draw sky, lit meshes, unlit meshes
//! 5. Present and request the next redraw

use std::{fmt::Debug, iter, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    context_loss::{ContextLostFlag, ReloadSchedule},
    controls::OrbitControls,
    render::draw_batches,
    resize::{ResizeHandler, Viewport},
    resources::loader::{Loaded, Loader},
    world::World,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Everything that lives and dies with one GPU context.
pub struct AppState {
    pub(crate) ctx: Context,
    world: World,
    controls: OrbitControls,
    resize: ResizeHandler,
    reload: ReloadSchedule,
    generation: u32,
}

impl Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("generation", &self.generation)
            .field("size", &self.ctx.size())
            .finish()
    }
}

impl AppState {
    async fn new(
        window: Arc<Window>,
        config: ViewerConfig,
        #[cfg(not(target_arch = "wasm32"))] runtime: tokio::runtime::Handle,
        proxy: EventLoopProxy<ViewerEvent>,
        lost: ContextLostFlag,
        generation: u32,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, &config, lost).await?;
        let loader = Loader::new(
            #[cfg(not(target_arch = "wasm32"))]
            runtime,
            proxy,
            &ctx.device,
            &ctx.queue,
            &config.asset_root,
            generation,
        );
        let world = World::new(&ctx, &config, &loader);
        let controls = OrbitControls::new(&config.controls, ctx.window.inner_size().height);
        let resize = ResizeHandler::new(config.resize_debounce, config.renderer.max_pixel_ratio);
        let reload = ReloadSchedule::new(config.reload_delay);
        Ok(Self {
            ctx,
            world,
            controls,
            resize,
            reload,
            generation,
        })
    }

    fn on_loaded(&mut self, generation: u32, loaded: Loaded) {
        if generation != self.generation {
            log::debug!("dropping {:?} loaded for a previous context", loaded);
            return;
        }
        self.world.on_loaded(&self.ctx, loaded);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        let now = Instant::now();
        if let Some(size) = self
            .resize
            .poll(now, &mut self.ctx.camera.camera, &mut self.controls)
        {
            log::debug!("resizing surface to {}x{}", size.width, size.height);
            self.ctx.resize(size);
        }
        self.controls.update(&mut self.ctx.camera.camera);
        self.ctx.camera.write_to_buffer(&self.ctx.queue);
        self.world.write_to_buffers(&self.ctx.queue);

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        // With antialiasing on, draw into the multisampled target and resolve
        // into the surface.
        let (target, resolve_target) = match &self.ctx.msaa_view {
            Some(msaa) => (msaa, Some(&view)),
            None => (&view, None),
        };

        let [r, g, b] = self.ctx.light.uniform.fog_color;
        let clear_colour = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            self.world
                .sky
                .draw(&mut render_pass, &self.ctx.camera.bind_group);

            let mut lits = Vec::new();
            let mut unlits = Vec::new();
            self.world
                .scene
                .get_render()
                .set_pipelines(&mut lits, &mut unlits);
            draw_batches(
                &mut render_pass,
                &self.ctx.pipelines,
                &lits,
                &unlits,
                &self.ctx.camera.bind_group,
                &self.ctx.light.bind_group,
            );
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub enum ViewerEvent {
    /// Context and scene are ready. Only sent on the web, where setup cannot
    /// block the event loop.
    #[allow(dead_code)]
    Initialized(anyhow::Result<Box<AppState>>),
    /// A background asset load finished. `generation` names the context the
    /// load was started for.
    Loaded { generation: u32, loaded: Loaded },
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f
                .debug_tuple("Initialized")
                .field(&state.is_ok())
                .finish(),
            Self::Loaded { generation, loaded } => f
                .debug_struct("Loaded")
                .field("generation", generation)
                .field("loaded", loaded)
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    state: Option<AppState>,
    /// Raised by the device-lost callback and, on the web, the canvas.
    lost: ContextLostFlag,
    /// Bumped every time the context is rebuilt.
    generation: u32,
    /// Setup error that ended the event loop, handed back by [`run`].
    error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy,
            config,
            window: None,
            state: None,
            lost: ContextLostFlag::default(),
            generation: 0,
            error: None,
        })
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Arc<Window>> {
        #[allow(unused_mut)]
        let mut window_attributes =
            Window::default_attributes().with_title(self.config.renderer.window_title.as_str());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;
            window_attributes = window_attributes.with_append(true);
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;

            let canvas = window.canvas().ok_or_else(|| anyhow::anyhow!("window has no canvas"))?;
            let style = canvas.style();
            for (property, value) in [("display", "block"), ("width", "100vw"), ("height", "100vh")] {
                style
                    .set_property(property, value)
                    .map_err(|e| anyhow::anyhow!("could not style the canvas: {:?}", e))?;
            }
            crate::context_loss::watch_canvas(
                &canvas,
                ReloadSchedule::new(self.config.reload_delay),
                self.lost.clone(),
            );
        }

        Ok(window)
    }

    /// Build context and scene for `window`. Natively this blocks until the
    /// device is ready; on the web the result arrives as
    /// [`ViewerEvent::Initialized`].
    fn init(&mut self, event_loop: &ActiveEventLoop, window: Arc<Window>) {
        let init_future = AppState::new(
            window,
            self.config.clone(),
            #[cfg(not(target_arch = "wasm32"))]
            self.async_runtime.handle().clone(),
            self.proxy.clone(),
            self.lost.clone(),
            self.generation,
        );

        #[cfg(not(target_arch = "wasm32"))]
        {
            let state = self.async_runtime.block_on(init_future);
            self.on_initialized(event_loop, state);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let _ = event_loop;
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = init_future.await.map(Box::new);
                if proxy.send_event(ViewerEvent::Initialized(state)).is_err() {
                    log::error!("event loop closed during setup");
                }
            });
        }
    }

    fn on_initialized(&mut self, event_loop: &ActiveEventLoop, state: anyhow::Result<AppState>) {
        match state {
            Ok(state) => {
                log::info!("scene ready (context generation {})", state.generation);
                state.ctx.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("App initialization failed: {:#}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    /// Drop the lost context with everything built on it and start over on the
    /// same window.
    #[cfg(not(target_arch = "wasm32"))]
    fn rebuild(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else {
            return;
        };
        log::warn!("rebuilding the GPU context");
        self.state = None;
        self.generation += 1;
        self.init(event_loop, window);
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window = match self.create_window(event_loop) {
            Ok(window) => window,
            Err(e) => {
                log::error!("could not create a window: {:#}", e);
                self.error = Some(e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());
        self.init(event_loop, window);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(state) => {
                // This is the message from our wasm `spawn_local`
                self.on_initialized(event_loop, state.map(|state| *state));
            }
            ViewerEvent::Loaded { generation, loaded } => match &mut self.state {
                Some(state) => state.on_loaded(generation, loaded),
                None => log::debug!("dropping {:?}, no scene", loaded),
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.controls.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let viewport = Viewport::new(size, state.ctx.window.scale_factor());
                state.resize.on_resize(viewport, Instant::now());
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let viewport = Viewport::new(state.ctx.window.inner_size(), scale_factor);
                state.resize.on_resize(viewport, Instant::now());
            }
            WindowEvent::RedrawRequested => {
                if state.reload.is_lost() || state.ctx.lost.is_raised() {
                    return;
                }
                match state.render() {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.ctx.reconfigure();
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };
        let now = Instant::now();
        if state.ctx.lost.take() && state.reload.on_context_lost(now).is_some() {
            log::warn!("GPU context lost. Reloading...");
        }
        if let Some(deadline) = state.reload.deadline() {
            event_loop.set_control_flow(winit::event_loop::ControlFlow::WaitUntil(deadline));
        }
        if state.reload.take_due(now) {
            event_loop.set_control_flow(winit::event_loop::ControlFlow::Wait);
            self.rebuild(event_loop);
        }
    }
}

/// Open the viewer and run until the window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
