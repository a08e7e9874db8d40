//! Device-context loss.
//!
//! Losing the GPU device is fatal for the session. Nothing is salvaged: the
//! default handling is suppressed and a full reload is scheduled after a fixed
//! delay. On the web that is `location.reload()`; natively the app drops its
//! GPU context and scene and builds both again on the same window.
//!
//! [`ReloadSchedule`] holds the timing rules shared by both targets: the first
//! loss schedules exactly one reload, later losses are ignored.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use instant::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReloadState {
    Idle,
    Scheduled(Instant),
    Fired,
}

#[derive(Clone, Debug)]
pub struct ReloadSchedule {
    delay: Duration,
    state: ReloadState,
}

impl ReloadSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: ReloadState::Idle,
        }
    }

    /// Record a context loss. Returns the reload deadline if this call
    /// scheduled it, `None` if a reload is already on its way.
    pub fn on_context_lost(&mut self, now: Instant) -> Option<Instant> {
        match self.state {
            ReloadState::Idle => {
                let deadline = now + self.delay;
                self.state = ReloadState::Scheduled(deadline);
                Some(deadline)
            }
            ReloadState::Scheduled(_) | ReloadState::Fired => None,
        }
    }

    /// True exactly once, when the scheduled reload is due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.state {
            ReloadState::Scheduled(deadline) if now >= deadline => {
                self.state = ReloadState::Fired;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            ReloadState::Scheduled(deadline) => Some(deadline),
            _ => None,
        }
    }

    /// Whether the context is gone. Nothing should be rendered from here on.
    pub fn is_lost(&self) -> bool {
        self.state != ReloadState::Idle
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Flag raised from the device-lost callback, which may run off the event loop
/// thread. The event loop turns it into a [`ReloadSchedule`] entry.
#[derive(Clone, Debug, Default)]
pub struct ContextLostFlag(Arc<AtomicBool>);

impl ContextLostFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Read and clear.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Hook the device-lost callback up to `flag`.
pub fn watch_device(device: &wgpu::Device, flag: ContextLostFlag) {
    device.set_device_lost_callback(move |reason, message| {
        // dropping the device on purpose (reload, shutdown) also lands here
        if reason == wgpu::DeviceLostReason::Destroyed {
            log::debug!("device destroyed: {}", message);
            return;
        }
        log::warn!("GPU device lost ({:?}): {}", reason, message);
        flag.raise();
    });
}

/// Listen for `webglcontextlost` on the canvas: suppress the browser's default
/// handling, raise `flag` so nothing more is drawn, and reload the page once
/// `schedule`'s delay has passed.
#[cfg(target_arch = "wasm32")]
pub fn watch_canvas(
    canvas: &web_sys::HtmlCanvasElement,
    schedule: ReloadSchedule,
    flag: ContextLostFlag,
) {
    use std::{cell::RefCell, rc::Rc};
    use wasm_bindgen::{JsCast, closure::Closure};

    let schedule = Rc::new(RefCell::new(schedule));
    let on_lost = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        event.prevent_default();
        flag.raise();
        let mut schedule = schedule.borrow_mut();
        if schedule.on_context_lost(Instant::now()).is_none() {
            return;
        }
        log::warn!("WebGL context lost. Reloading...");
        schedule_page_reload(schedule.delay());
    });
    if let Err(e) = canvas
        .add_event_listener_with_callback("webglcontextlost", on_lost.as_ref().unchecked_ref())
    {
        log::error!("could not listen for context loss: {:?}", e);
    }
    // the listener lives as long as the page
    on_lost.forget();
}

#[cfg(target_arch = "wasm32")]
fn schedule_page_reload(delay: Duration) {
    use wasm_bindgen::{JsCast, closure::Closure};

    let Some(window) = web_sys::window() else {
        log::error!("no window to reload");
        return;
    };
    let reload = Closure::once_into_js(|| {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().reload() {
                log::error!("reload failed: {:?}", e);
            }
        }
    });
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        reload.unchecked_ref(),
        delay.as_millis() as i32,
    ) {
        log::error!("could not schedule reload: {:?}", e);
    }
}
