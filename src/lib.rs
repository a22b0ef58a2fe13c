//! # ShareAI Client
//!
//! Client library for the ShareAI image sharing platform: session
//! management with publish/subscribe, a bearer-authenticated HTTP client,
//! and the auth and catalog operations the `shareai` CLI is built on.

pub mod api;
pub mod client;
pub mod common;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use client::{AuthClient, CatalogClient, ClientMetrics};
pub use common::config::ClientConfig;
pub use session::Session;
