//! Taskboard HTTP server library.
//!
//! Exposes the router, configuration and background sweeper for use in
//! tests and embedding. The binary in `main.rs` wires them together.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod sweeper;
