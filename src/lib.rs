//! halo — CLI client for a hallucination-detection monitoring service.
//!
//! The crate is organized around one core piece and its collaborators:
//!
//! - [`api`] — the backend adapter: one stable operation set over two
//!   incompatible backend contracts, with input validation, credential
//!   attachment, and graceful degradation where a contract lacks an
//!   endpoint.
//! - [`store`] — the durable client-side credential store the adapter
//!   reads on every request.
//! - [`config`] — layered configuration (defaults, TOML files, `HALO_*`
//!   environment variables).
//! - [`cli`] — the thin view layer: subcommand handlers that call the
//!   adapter and render its results.

pub mod api;
pub mod cli;
pub mod config;
pub mod store;
