//! Error types for the worker transport.
//!
//! Graph data never produces an error; these cover the seams around the
//! simulation: threads, message decoding and the JS host.

use thiserror::Error;

/// Errors that can occur while driving a simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The worker loop is gone and can no longer take commands.
    #[error("simulation worker disconnected")]
    Disconnected,

    /// The OS refused to start the worker thread.
    #[error("failed to spawn simulation worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// A message did not have the shape of any known command.
    #[error("undecodable message: {0}")]
    Decode(String),

    /// The JS host refused a scheduling or callback request.
    #[error("host call failed: {0}")]
    Host(String),
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

impl From<SimulationError> for wasm_bindgen::JsValue {
    fn from(err: SimulationError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(SimulationError::Disconnected.to_string(), "simulation worker disconnected");
        assert_eq!(
            SimulationError::Decode("missing field `type`".into()).to_string(),
            "undecodable message: missing field `type`"
        );
    }

    #[test]
    fn test_spawn_error_from_io() {
        let err: SimulationError = std::io::Error::other("no threads").into();
        assert!(matches!(err, SimulationError::Spawn(_)));
        assert!(err.to_string().ends_with("no threads"));
    }
}
