//! services/api/src/lib.rs
//!
//! The HTTP service: configuration, credentials, adapters for the core ports,
//! and the axum web layer.

pub mod access;
pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
