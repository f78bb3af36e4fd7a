//! HTTP surface over the reconciliation engine. The binary in `main.rs`
//! loads config and attaches middleware; tests drive [`routes::build_router`]
//! directly.

pub mod api_types;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
