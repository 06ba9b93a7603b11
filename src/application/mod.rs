//! Application services: site registry, release pipeline, connection
//! orchestration and reconciliation.

pub mod connections;
pub mod deploy;
pub mod dns;
pub mod error;
pub mod hosting;
pub mod jobs;
pub mod reconcile;
pub mod registry;
pub mod repos;
pub mod retry;
