//! `trellis-http` - HTTP transport for trellis backends and mirror clients.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Blocking HTTP fetcher.
pub mod client;
/// Server configuration.
pub mod config;
/// Demo backend.
pub mod demo;
/// Error types.
pub mod error;
/// Backend HTTP server.
pub mod server;

pub use client::HttpFetcher;
pub use config::ServerConfig;
pub use error::HttpError;
pub use server::{start_server, WebServer};
