//! Single-threaded run loop for a JS host.
//!
//! The loop state sits behind `Rc<RefCell<_>>` because the frame callback
//! and the driver-facing methods both need it. The callback only holds a
//! weak reference, and the tick callback is invoked with no borrow held,
//! so a driver may call back into the loop (e.g. `stop`) from `onTick`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Function;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use super::frame::{FrameRequest, HostScheduler};
use super::message::{Command, Event, LoadRequest};
use crate::error::{Result, SimulationError};
use crate::simulation::{Simulation, SimulationConfig};

struct LoopState {
    sim: Simulation,
    running: bool,
    pending: Option<FrameRequest>,
    frame_callback: Option<Function>,
    on_tick: Option<Function>,
    scheduler: HostScheduler,
}

impl LoopState {
    fn schedule(&mut self) -> Result<()> {
        if !self.running || self.pending.is_some() {
            return Ok(());
        }
        let Some(callback) = self.frame_callback.as_ref() else {
            return Ok(());
        };
        self.pending = Some(self.scheduler.request(callback)?);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(request) = self.pending.take() {
            if let Err(err) = self.scheduler.cancel(&request) {
                tracing::warn!(%err, "failed to cancel pending frame");
            }
        }
    }
}

/// Frame-paced simulation loop on the JS event loop.
pub struct BrowserLoop {
    state: Rc<RefCell<LoopState>>,
    // Owns the Rust side of the JS frame callback.
    _frame: Closure<dyn FnMut()>,
}

impl BrowserLoop {
    /// Create an idle loop.
    pub fn new(config: SimulationConfig) -> Self {
        let config = config.sanitized();
        let scheduler = HostScheduler::new(config.frame_interval_ms());
        let state = Rc::new(RefCell::new(LoopState {
            sim: Simulation::new(config),
            running: false,
            pending: None,
            frame_callback: None,
            on_tick: None,
            scheduler,
        }));

        let weak = Rc::downgrade(&state);
        let frame = Closure::<dyn FnMut()>::new(move || run_frame(&weak));
        state.borrow_mut().frame_callback = Some(frame.as_ref().unchecked_ref::<Function>().clone());

        Self {
            state,
            _frame: frame,
        }
    }

    /// Apply a driver command.
    pub fn handle(&self, command: Command) -> Result<()> {
        match command {
            Command::Init(request) => self.load(request, false),
            Command::Update(request) => self.load(request, true),
            Command::Stop => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Load a dataset from scratch and start the loop.
    pub fn init(&self, request: LoadRequest) -> Result<()> {
        self.load(request, false)
    }

    /// Replace the dataset and keep (or start) the loop.
    pub fn update(&self, request: LoadRequest) -> Result<()> {
        self.load(request, true)
    }

    fn load(&self, request: LoadRequest, replace: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        // a re-init restarts the loop rather than running two
        state.cancel();
        if let Some(config) = request.config {
            state.scheduler = HostScheduler::new(config.clone().sanitized().frame_interval_ms());
            state.sim.set_config(config);
        }
        if replace {
            state.sim.replace_dataset(&request.data, request.width, request.height);
        } else {
            state.sim.initialize(&request.data, request.width, request.height);
        }
        state.running = true;
        tracing::debug!(
            nodes = state.sim.node_count(),
            links = state.sim.link_count(),
            replace,
            "simulation started"
        );
        if let Err(err) = state.schedule() {
            state.running = false;
            return Err(err);
        }
        Ok(())
    }

    /// Halt the loop and cancel the pending frame. Idempotent.
    pub fn stop(&self) {
        let mut state = self.state.borrow_mut();
        if state.running {
            tracing::debug!(steps = state.sim.steps(), "simulation stopped");
        }
        state.running = false;
        state.cancel();
    }

    /// Whether frames are being scheduled.
    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Set (or clear) the function receiving tick events.
    pub fn set_on_tick(&self, callback: Option<Function>) {
        self.state.borrow_mut().on_tick = callback;
    }

    /// Borrow the simulation for a query or a manual step.
    pub fn with_simulation<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> R {
        f(&mut self.state.borrow_mut().sim)
    }
}

impl Drop for BrowserLoop {
    fn drop(&mut self) {
        // the JS callback must not fire once the closure is gone
        self.stop();
    }
}

fn run_frame(state: &Weak<RefCell<LoopState>>) {
    let Some(state) = state.upgrade() else {
        return;
    };

    let (callback, event) = {
        let mut state = state.borrow_mut();
        state.pending = None;
        if !state.running {
            return;
        }
        state.sim.tick();
        (state.on_tick.clone(), Event::Tick(state.sim.snapshot()))
    };

    if let Some(callback) = callback {
        match to_js(&event) {
            Ok(payload) => {
                if let Err(err) = callback.call1(&JsValue::NULL, &payload) {
                    tracing::warn!(?err, "tick callback threw");
                }
            }
            Err(err) => tracing::warn!(%err, "failed to encode tick"),
        }
    }

    // the callback may have stopped or reloaded the loop
    let mut state = state.borrow_mut();
    if let Err(err) = state.schedule() {
        tracing::warn!(%err, "failed to schedule next frame; stopping");
        state.running = false;
    }
}

/// Encode a value as a plain JS object.
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| SimulationError::Decode(err.to_string()))
}
