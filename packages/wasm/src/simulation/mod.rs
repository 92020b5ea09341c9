//! Force-directed layout simulation.
//!
//! [`Simulation`] is the explicit context object holding every piece of
//! physics state for one layout. It is driven either directly (call
//! [`Simulation::step`] and read [`Simulation::snapshot`]) or through one
//! of the run loops in [`crate::worker`].

mod config;
mod forces;
mod snapshot;
mod state;

pub use config::SimulationConfig;
pub use forces::Bodies;
pub use snapshot::{NodePosition, Snapshot};
pub use state::Simulation;
