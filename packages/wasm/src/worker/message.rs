//! Typed messages between a driver and a simulation loop.
//!
//! Inbound: `init`, `update`, `stop`. Outbound: `tick`. All are one-way;
//! results of a command only ever show up in later ticks.
//!
//! On the wire every message is an object tagged by `type`:
//!
//! ```json
//! { "type": "init", "width": 800, "height": 500,
//!   "data": { "nodes": [{ "id": "a" }], "links": [] } }
//! ```

use serde::{Deserialize, Serialize};

use crate::graph::GraphData;
use crate::graph::lenient;
use crate::simulation::{SimulationConfig, Snapshot};

/// Payload shared by `init` and `update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: Option<f64>,
    #[serde(default)]
    pub data: GraphData,
    /// Replaces the loop's tuning for this and later runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SimulationConfig>,
}

impl LoadRequest {
    /// A request for `data` in a `width` × `height` viewport.
    pub fn new(data: GraphData, width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            data,
            config: None,
        }
    }
}

/// Driver → simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    /// Rebuild from scratch and (re)start the loop.
    Init(LoadRequest),
    /// Replace the dataset; same shape and effect as `Init`.
    Update(LoadRequest),
    /// Halt the loop, keeping state.
    Stop,
}

/// Simulation → driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// Positions after one step.
    Tick(Snapshot),
}
