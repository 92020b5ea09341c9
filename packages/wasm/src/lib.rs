//! Force Graph - WASM Module
//!
//! A force-directed layout worker for the dashboard relationship graph. It
//! takes a set of nodes and links and iteratively moves the nodes under
//! spring, repulsion, collision and centering forces, reporting positions
//! to the driver after every step.
//!
//! # Architecture
//!
//! - `graph`: input dataset and its forgiving decoding
//! - `simulation`: physics state, force phases and snapshots
//! - `spatial`: R-tree index for hit testing
//! - `worker`: command/event protocol and the run loops (thread or JS frames)

use js_sys::{Float64Array, Function};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod graph;
pub mod simulation;
pub mod spatial;
pub mod worker;

use error::SimulationError;
use graph::{GraphData, NodeId};
use simulation::SimulationConfig;
use worker::{BrowserLoop, Command, LoadRequest, to_js};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Layout worker exposed to JavaScript.
///
/// Speaks the same `init` / `update` / `stop` protocol as a dedicated
/// worker through [`post_message`](Self::post_message), and delivers
/// `tick` events to the function registered with `onTick`.
#[wasm_bindgen]
pub struct ForceGraphWorker {
    inner: BrowserLoop,
}

#[wasm_bindgen]
impl ForceGraphWorker {
    /// Create an idle worker. `config` may be omitted or partial.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ForceGraphWorker, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            SimulationConfig::default()
        } else {
            decode(config)?
        };
        Ok(Self {
            inner: BrowserLoop::new(config),
        })
    }

    // =========================================================================
    // Protocol
    // =========================================================================

    /// Handle one inbound message.
    ///
    /// Never throws: messages that are not a known command are reported to
    /// the console and otherwise ignored.
    #[wasm_bindgen(js_name = postMessage)]
    pub fn post_message(&self, message: JsValue) {
        let result = decode::<Command>(message).and_then(|command| self.inner.handle(command));
        if let Err(err) = result {
            report("ignored message", &err);
        }
    }

    /// Register the function receiving `{ type: "tick", nodes }` events.
    ///
    /// Pass `undefined` to stop listening.
    #[wasm_bindgen(js_name = onTick)]
    pub fn on_tick(&self, callback: Option<Function>) {
        self.inner.set_on_tick(callback);
    }

    /// Load `data` from scratch and start the loop.
    pub fn init(&self, data: JsValue, width: Option<f64>, height: Option<f64>) -> Result<(), JsValue> {
        let request = load_request(data, width, height)?;
        Ok(self.inner.init(request)?)
    }

    /// Replace the dataset and keep (or start) the loop.
    pub fn update(&self, data: JsValue, width: Option<f64>, height: Option<f64>) -> Result<(), JsValue> {
        let request = load_request(data, width, height)?;
        Ok(self.inner.update(request)?)
    }

    /// Halt the loop. Safe to call repeatedly.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Whether frames are being scheduled.
    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    // =========================================================================
    // Manual stepping
    // =========================================================================

    /// Advance one step outside the loop and return the snapshot.
    ///
    /// `dt` defaults to the configured time step.
    pub fn step(&self, dt: Option<f64>) -> Result<JsValue, JsValue> {
        let snapshot = self.inner.with_simulation(|sim| {
            match dt {
                Some(dt) => sim.step(dt),
                None => sim.tick(),
            }
            sim.snapshot()
        });
        Ok(to_js(&snapshot)?)
    }

    /// Current positions without stepping.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.inner.with_simulation(|sim| sim.snapshot());
        Ok(to_js(&snapshot)?)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of nodes held.
    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.inner.with_simulation(|sim| sim.node_count() as u32)
    }

    /// Number of resolved links.
    #[wasm_bindgen(js_name = linkCount)]
    pub fn link_count(&self) -> u32 {
        self.inner.with_simulation(|sim| sim.link_count() as u32)
    }

    /// Links dropped by the last load for naming unknown nodes.
    #[wasm_bindgen(js_name = droppedLinkCount)]
    pub fn dropped_link_count(&self) -> u32 {
        self.inner.with_simulation(|sim| sim.dropped_link_count() as u32)
    }

    /// Number of steps since the last load.
    #[wasm_bindgen(js_name = stepCount)]
    pub fn step_count(&self) -> f64 {
        self.inner.with_simulation(|sim| sim.steps() as f64)
    }

    /// Get a zero-copy view of X positions, in node order.
    ///
    /// # Safety
    ///
    /// The returned view is invalidated if any Rust allocation occurs.
    /// Copy the data immediately or use it before calling other methods.
    #[wasm_bindgen(js_name = getPositionsXView)]
    pub fn get_positions_x_view(&self) -> Float64Array {
        self.inner
            .with_simulation(|sim| unsafe { Float64Array::view(sim.positions_x()) })
    }

    /// Get a zero-copy view of Y positions, in node order.
    ///
    /// # Safety
    ///
    /// The returned view is invalidated if any Rust allocation occurs.
    /// Copy the data immediately or use it before calling other methods.
    #[wasm_bindgen(js_name = getPositionsYView)]
    pub fn get_positions_y_view(&self) -> Float64Array {
        self.inner
            .with_simulation(|sim| unsafe { Float64Array::view(sim.positions_y()) })
    }

    /// Ids in the order of the position views.
    #[wasm_bindgen(js_name = getNodeIds)]
    pub fn get_node_ids(&self) -> Result<JsValue, JsValue> {
        let ids = self.inner.with_simulation(|sim| sim.ids().to_vec());
        Ok(to_js(&ids)?)
    }

    /// `[x, y]` of a node, or `undefined` for an unknown id.
    #[wasm_bindgen(js_name = getPosition)]
    pub fn get_position(&self, id: JsValue) -> Result<Option<Vec<f64>>, JsValue> {
        let id: NodeId = decode(id)?;
        Ok(self
            .inner
            .with_simulation(|sim| sim.position(&id).map(|(x, y)| vec![x, y])))
    }

    /// Ids linked to `id` in either direction.
    #[wasm_bindgen(js_name = getNeighbors)]
    pub fn get_neighbors(&self, id: JsValue) -> Result<JsValue, JsValue> {
        let id: NodeId = decode(id)?;
        let neighbors = self.inner.with_simulation(|sim| sim.neighbors(&id));
        Ok(to_js(&neighbors)?)
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Id of the nearest node within `max_distance` of a point, or `undefined`.
    #[wasm_bindgen(js_name = findNodeAt)]
    pub fn find_node_at(&self, x: f64, y: f64, max_distance: f64) -> Result<JsValue, JsValue> {
        let hit = self.inner.with_simulation(|sim| sim.node_at(x, y, max_distance));
        match hit {
            Some(id) => Ok(to_js(&id)?),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Ids of all nodes inside an axis-aligned rectangle.
    #[wasm_bindgen(js_name = findNodesInRect)]
    pub fn find_nodes_in_rect(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Result<JsValue, JsValue> {
        let ids = self
            .inner
            .with_simulation(|sim| sim.nodes_in_rect(min_x, min_y, max_x, max_y));
        Ok(to_js(&ids)?)
    }

    /// Ids of all nodes within `radius` of a point.
    #[wasm_bindgen(js_name = findNodesInRadius)]
    pub fn find_nodes_in_radius(&self, x: f64, y: f64, radius: f64) -> Result<JsValue, JsValue> {
        let ids = self.inner.with_simulation(|sim| sim.nodes_in_radius(x, y, radius));
        Ok(to_js(&ids)?)
    }
}

fn load_request(data: JsValue, width: Option<f64>, height: Option<f64>) -> Result<LoadRequest, SimulationError> {
    let data: GraphData = if data.is_undefined() || data.is_null() {
        GraphData::default()
    } else {
        decode(data)?
    };
    Ok(LoadRequest {
        width,
        height,
        data,
        config: None,
    })
}

fn decode<T: DeserializeOwned>(value: JsValue) -> Result<T, SimulationError> {
    serde_wasm_bindgen::from_value(value).map_err(|err| SimulationError::Decode(err.to_string()))
}

fn report(context: &str, err: &SimulationError) {
    tracing::warn!(%err, "{context}");
    web_sys::console::warn_1(&JsValue::from_str(&format!("{context}: {err}")));
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    /// Resolve after `ms` milliseconds of host time.
    async fn sleep(ms: i32) {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let global = js_sys::global();
            let set_timeout: Function = js_sys::Reflect::get(&global, &JsValue::from_str("setTimeout"))
                .unwrap()
                .dyn_into()
                .unwrap();
            set_timeout.call2(&global, &resolve, &JsValue::from(ms)).unwrap();
        });
        JsFuture::from(promise).await.unwrap();
    }

    /// A tick listener and the number of times it has fired.
    fn tick_counter(worker: &ForceGraphWorker) -> (Rc<Cell<u32>>, Closure<dyn FnMut(JsValue)>) {
        let count = Rc::new(Cell::new(0));
        let listener = Closure::<dyn FnMut(JsValue)>::new({
            let count = Rc::clone(&count);
            move |_event: JsValue| count.set(count.get() + 1)
        });
        worker.on_tick(Some(listener.as_ref().unchecked_ref::<Function>().clone()));
        (count, listener)
    }

    fn parse(json: &str) -> JsValue {
        js_sys::JSON::parse(json).unwrap()
    }

    fn pair() -> JsValue {
        parse(
            r#"{
                "nodes": [{"id": "a", "x": 100, "y": 100}, {"id": "b", "x": 300, "y": 200}],
                "links": [{"source": "a", "target": "b"}]
            }"#,
        )
    }

    #[wasm_bindgen_test]
    fn test_init_and_stop() {
        let worker = ForceGraphWorker::new(JsValue::UNDEFINED).unwrap();
        assert!(!worker.is_running());

        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        assert!(worker.is_running());
        assert_eq!(worker.node_count(), 2);
        assert_eq!(worker.link_count(), 1);

        worker.stop();
        worker.stop();
        assert!(!worker.is_running());
    }

    #[wasm_bindgen_test]
    fn test_post_message_protocol() {
        let worker = ForceGraphWorker::new(parse(r#"{"seed": 7}"#)).unwrap();
        worker.post_message(parse(
            r#"{"type": "init", "width": 800, "height": 500,
                "data": {"nodes": [{"id": 1}, {"id": 2}, {"id": 3}], "links": [{"source": 1, "target": 9}]}}"#,
        ));
        assert!(worker.is_running());
        assert_eq!(worker.node_count(), 3);
        assert_eq!(worker.dropped_link_count(), 1);

        worker.post_message(parse(r#"{"type": "stop"}"#));
        assert!(!worker.is_running());
    }

    #[wasm_bindgen_test]
    fn test_garbage_messages_are_ignored() {
        let worker = ForceGraphWorker::new(JsValue::NULL).unwrap();
        worker.post_message(JsValue::from_str("init"));
        worker.post_message(parse(r#"{"type": "explode"}"#));
        worker.post_message(JsValue::UNDEFINED);
        assert!(!worker.is_running());
        assert_eq!(worker.node_count(), 0);
    }

    #[wasm_bindgen_test]
    fn test_manual_step_returns_snapshot() {
        let worker = ForceGraphWorker::new(JsValue::UNDEFINED).unwrap();
        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        worker.stop();

        let snapshot = worker.step(None).unwrap();
        let nodes = js_sys::Reflect::get(&snapshot, &JsValue::from_str("nodes")).unwrap();
        let nodes: js_sys::Array = nodes.dyn_into().unwrap();
        assert_eq!(nodes.length(), 2);
        assert_eq!(worker.step_count(), 1.0);

        let xs = worker.get_positions_x_view().to_vec();
        let first = js_sys::Reflect::get(&nodes.get(0), &JsValue::from_str("x")).unwrap();
        assert_eq!(first.as_f64(), Some(xs[0]));
    }

    #[wasm_bindgen_test]
    fn test_hit_testing() {
        let worker = ForceGraphWorker::new(JsValue::UNDEFINED).unwrap();
        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        worker.stop();

        let hit = worker.find_node_at(101.0, 100.0, 20.0).unwrap();
        assert_eq!(hit.as_string().as_deref(), Some("a"));
        assert!(worker.find_node_at(700.0, 20.0, 5.0).unwrap().is_undefined());

        let neighbors = worker.get_neighbors(JsValue::from_str("a")).unwrap();
        let neighbors: js_sys::Array = neighbors.dyn_into().unwrap();
        assert_eq!(neighbors.get(0).as_string().as_deref(), Some("b"));
    }

    #[wasm_bindgen_test]
    fn test_node_ids_follow_view_order() {
        let worker = ForceGraphWorker::new(JsValue::UNDEFINED).unwrap();
        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        worker.stop();

        let ids: js_sys::Array = worker.get_node_ids().unwrap().dyn_into().unwrap();
        assert_eq!(ids.length(), 2);
        assert_eq!(ids.get(1).as_string().as_deref(), Some("b"));
        assert_eq!(worker.get_positions_y_view().to_vec()[1], 200.0);
    }

    #[wasm_bindgen_test]
    async fn test_no_ticks_after_stop() {
        let worker = ForceGraphWorker::new(JsValue::UNDEFINED).unwrap();
        let (count, _listener) = tick_counter(&worker);

        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        sleep(150).await;
        assert!(count.get() > 0, "loop never ticked");

        worker.stop();
        let at_stop = count.get();
        sleep(150).await;
        assert_eq!(count.get(), at_stop);
    }

    #[wasm_bindgen_test]
    async fn test_reinit_keeps_a_single_frame_chain() {
        // 200 ms frames; the test host has no animation frames, so the
        // loop runs on the timer fallback at that interval
        let worker = ForceGraphWorker::new(parse(r#"{"timeStep": 0.2}"#)).unwrap();
        let (count, _listener) = tick_counter(&worker);

        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        worker.init(pair(), Some(800.0), Some(500.0)).unwrap();
        sleep(300).await;
        worker.stop();

        assert_eq!(count.get(), 1);
        assert_eq!(worker.step_count(), 1.0);
    }
}
