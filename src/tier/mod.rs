//! Storage tiers and the artifacts that move between them
//!
//! # Modules
//!
//! - [`locator`]: Which artifact sets a version directory holds
//! - [`copy`]: Non-destructive directory copy
//! - [`sync`]: The four propagation directions between tiers
//! - [`retention`]: Keep-set computation and forced deletion
//! - [`error`]: Filesystem error type for this layer

pub mod copy;
pub mod error;
pub mod locator;
pub mod retention;
pub mod sync;
