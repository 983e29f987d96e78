//! Onyx Core
//!
//! Shared utilities for the Onyx renderer: logging, profiling, math and configuration.

pub mod config;
pub mod logging;
pub mod math;
pub mod profiling;
