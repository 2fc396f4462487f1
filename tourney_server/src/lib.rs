//! HTTP server for the tournament prize settlement engine.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
