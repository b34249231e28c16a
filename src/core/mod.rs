//! Core functionality for the batch engine
//!
//! This module contains the scheduler, its controller and the bundled work functions.

pub mod batch;
pub mod inspect;
