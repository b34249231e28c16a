//! Common test utilities for imgbatch
//!
//! - `fixtures`: the `ScriptedWork` work function and controller factories
//! - `assertions`: invariant checks on stats and snapshots

pub mod assertions;

// Re-export commonly used items
pub use assertions::ControllerAssertions;
pub use fixtures::{ScriptedWork, controller_with, wait_until};
