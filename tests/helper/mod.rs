//! Shared fixtures for integration tests

#![allow(dead_code)]

mod registry;
mod runner;
mod tiers;

pub use registry::FakeRegistry;
pub use runner::FakeRunner;
pub use tiers::{Tiers, put_files};
