//! Post messages and rendered notebook output to Mattermost from inside a
//! JupyterHub deployment, authenticated by the hub's own tokens rather than
//! a separate chat login.
//!
//! Three surfaces, one per audience:
//!
//! - [configure_hub] — for the deployment: registers the poster as a
//!   hub-managed service and publishes its URL to every user server.
//! - [post] — for notebook code: hands one message (and optionally one
//!   attachment) to the service.
//! - [router] + the `jupyterpost` binary — the service itself: relays each
//!   inbound post to Mattermost's REST API.

pub mod client;
pub mod config;
pub mod error;
pub mod hub;
pub mod mattermost;
pub mod router;

pub use client::{post, Attachment, PostError, PostOptions, Renderable};
pub use error::ConfigurationError;
pub use hub::config::{configure_hub, HubConfig, ServiceSettings};
