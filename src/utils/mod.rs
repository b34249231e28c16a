//! Utility modules for the batch engine
//!
//! - **error**: Error types and the crate `Result` alias
//! - **logging**: Tracing subscriber setup

pub mod error;
pub mod logging;
