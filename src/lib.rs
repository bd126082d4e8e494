//! label-worker - turn GitHub labels into coding-agent runs

pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod orchestrator;
pub mod review;
pub mod subprocess;
pub mod tasks;
pub mod telemetry;
pub mod template;
pub mod workers;
