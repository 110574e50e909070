//! services/api/src/lib.rs
//!
//! Adapters, configuration and the HTTP layer of the Aikido Live service.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
