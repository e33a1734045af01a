//! CLI command implementations.

pub mod config;
pub mod desktop;
pub mod doctor;
pub mod memory;
pub mod serve;
