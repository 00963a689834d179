//! Registry implementations for fetching Chromium releases

pub mod version_history;

pub use version_history::VersionHistoryRegistry;
