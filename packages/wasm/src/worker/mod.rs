//! Run loops that drive a [`Simulation`](crate::simulation::Simulation).
//!
//! - `message`: typed commands and events exchanged with a driver
//! - `native`: a dedicated thread paced by a [`FrameClock`]
//! - `browser` / `frame`: the JS event loop, paced by animation frames

mod browser;
mod frame;
pub mod message;
#[cfg(not(target_arch = "wasm32"))]
mod native;

pub use browser::BrowserLoop;
pub(crate) use browser::to_js;
pub use frame::{FrameRequest, HostScheduler};
pub use message::{Command, Event, LoadRequest};
#[cfg(not(target_arch = "wasm32"))]
pub use native::{FrameClock, IntervalClock, SimulationWorker};
