//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod dns;
pub mod error;
pub mod hosting;
pub mod http;
pub mod telemetry;
