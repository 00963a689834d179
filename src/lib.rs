pub mod config;
pub mod pipeline;
pub mod tier;
pub mod version;
