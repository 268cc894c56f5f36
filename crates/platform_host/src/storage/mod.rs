//! Durable key-value storage contracts and adapters.

pub mod file_prefs;
pub mod prefs;
