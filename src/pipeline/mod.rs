//! Download, build and orchestration layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Driver    │────▶│ Downloader  │────▶│  Container  │
//! │ (Pipeline)  │     │  / Builder  │     │   Runtime   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │ tier::sync  │                         │   Runner    │
//! │ + retention │                         │ (processes) │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`driver`]: Default cycle per mode and the explicit CLI actions
//! - [`download`]: Online download of a version's source bundle
//! - [`build`]: Offline build and disassembly of a version
//! - [`container`]: Container runtime command lines
//! - [`runner`]: CommandRunner trait and the host implementation
//! - [`error`]: Error type for pipeline operations

pub mod build;
pub mod container;
pub mod download;
pub mod driver;
pub mod error;
pub mod runner;
