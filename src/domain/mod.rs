//! Domain layer types and invariants.

pub mod dns;
pub mod entities;
pub mod error;
pub mod hostname;
pub mod manifest;
pub mod site_id;
pub mod status;
pub mod types;
