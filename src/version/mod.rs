//! Release version layer
//!
//! This module knows what a Chromium version is, how to ask the remote
//! release-metadata service which versions exist, and how the stable history
//! is persisted between runs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Catalog   │
//! │  (fetch)    │     │ (snapshot)  │
//! └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Registries  │
//! │(versionhist)│
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: JSON snapshot of the stable release history
//! - [`registry`]: Registry trait for fetching releases from a remote source
//! - [`registries`]: Concrete registry implementations
//! - [`error`]: Error types for registry and catalog operations
//! - [`types`]: `Version`, `Channel` and `DownloadTarget`

pub mod catalog;
pub mod error;
pub mod registries;
pub mod registry;
pub mod types;
