//! Frame pacing on a JS host.
//!
//! Prefers the host's display-synchronized `requestAnimationFrame`, which
//! slows down or pauses with a hidden or throttled display. Hosts without
//! it (Node, some worker scopes) fall back to `setTimeout` at the
//! configured frame interval. Both are looked up on the global object, so
//! the same code serves a window and a dedicated worker.

use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use crate::error::{Result, SimulationError};

/// A scheduled callback that can still be cancelled.
#[derive(Debug, Clone)]
pub enum FrameRequest {
    /// Handle returned by `requestAnimationFrame`.
    Animation(JsValue),
    /// Handle returned by `setTimeout`.
    Timeout(JsValue),
}

/// Schedules one callback per frame on the JS global scope.
#[derive(Debug, Clone)]
pub struct HostScheduler {
    interval_ms: f64,
}

impl HostScheduler {
    /// Fallback timers fire every `interval_ms`.
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms }
    }

    /// Run `callback` once, before the next frame.
    pub fn request(&self, callback: &Function) -> Result<FrameRequest> {
        let global = js_sys::global();
        if let Some(raf) = global_function(&global, "requestAnimationFrame") {
            let handle = raf.call1(&global, callback).map_err(host_error)?;
            return Ok(FrameRequest::Animation(handle));
        }
        if let Some(set_timeout) = global_function(&global, "setTimeout") {
            let delay = JsValue::from_f64(self.interval_ms);
            let handle = set_timeout.call2(&global, callback, &delay).map_err(host_error)?;
            return Ok(FrameRequest::Timeout(handle));
        }
        Err(SimulationError::Host("no frame scheduling primitive on this host".into()))
    }

    /// Cancel a pending request so its callback never runs.
    pub fn cancel(&self, request: &FrameRequest) -> Result<()> {
        let global = js_sys::global();
        let (name, handle) = match request {
            FrameRequest::Animation(handle) => ("cancelAnimationFrame", handle),
            FrameRequest::Timeout(handle) => ("clearTimeout", handle),
        };
        let cancel = global_function(&global, name)
            .ok_or_else(|| SimulationError::Host(format!("{name} is not available")))?;
        cancel.call1(&global, handle).map_err(host_error)?;
        Ok(())
    }
}

fn global_function(global: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(global, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

fn host_error(err: JsValue) -> SimulationError {
    SimulationError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}
