//! The JupyterHub boundary: registration on one side, caller authentication
//! on the other.
//!
//! Everything else about the hub — spawning the service process, proxying
//! user traffic to it, issuing tokens — belongs to the hub itself.

pub mod auth;
pub mod config;
