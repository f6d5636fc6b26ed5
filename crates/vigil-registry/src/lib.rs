//! # Vigil Registry
//!
//! Registry-provider capability for Vigil: a generic OCI distribution
//! client plus the built-in provider presets (Docker Hub, GHCR, Quay,
//! GCR, ECR public, Gitea/Forgejo/Codeberg, and custom self-hosted
//! registries).
//!
//! Providers implement [`vigil_core::RegistryProvider`]: they match
//! images to their backend, normalize registry URLs and repository
//! names, and resolve tag lists and manifest digests through the shared
//! [`OciClient`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod oci;
pub mod providers;

pub use client::OciClient;
pub use config::AuthScheme;
pub use error::{RegistryError, Result};
pub use providers::install_factories;
