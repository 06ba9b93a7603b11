//! Hosted site provisioning, content releases and custom-domain
//! reconciliation.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
