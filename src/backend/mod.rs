//! Client for the hosted backend: auth API, data API and the installations
//! table that lives there.

pub mod client;
mod endpoints;
pub mod installations;
pub mod rest;
pub mod token;

pub use client::{BackendClient, build_http_client};
pub use installations::RemoteInstallations;
