//! # Depot
//!
//! A self-hosted artifact repository gateway. Each configured repository maps a
//! URL prefix `/repository/<name>/` onto a directory; clients download with
//! `GET`/`HEAD` and deploy with `PUT`, authenticated with HTTP Basic auth.
//!
//! ## Key Modules
//!
//! - [`config`]: TOML configuration
//! - [`registry`]: immutable name → repository descriptor map
//! - [`auth`] and [`credentials`]: Basic credential parsing and matching
//! - [`authz`]: the per-request permission decision
//! - [`paths`]: containment-checked path resolution
//! - [`repository`]: per-repository download and upload handling
//! - [`upload`]: size-bounded streaming to disk
//! - [`router`] and [`server`]: HTTP routing and lifecycle
//! - [`listing`]: repository listings

pub mod auth;
pub mod authz;
pub mod config;
pub mod credentials;
pub mod download;
pub mod error;
pub mod listing;
pub mod paths;
pub mod registry;
pub mod repository;
pub mod router;
pub mod server;
pub mod upload;

// Re-export key types for convenience
pub use auth::BasicCredentials;
pub use authz::{authorize, Permissions};
pub use config::{Config, ConfigError};
pub use error::{AppError, AppResult, ErrorCode};
pub use registry::{Registry, RepositoryDescriptor};
pub use router::{RepositoryRouter, RouterSettings};
pub use server::{build_app, run_server};
