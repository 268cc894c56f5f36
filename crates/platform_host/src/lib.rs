//! Typed host-domain contracts shared by the desktop session core and its hosts.
//!
//! This crate is the API-first boundary for platform services. It exposes the synchronous
//! preference-store contract with in-memory, no-op, and file-backed adapters, plus time helpers.
//! Browser hosts implement [`PrefsStore`] over `localStorage`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod storage;
pub mod time;

pub use storage::file_prefs::FilePrefsStore;
pub use storage::prefs::{
    load_pref_with, save_pref_with, MemoryPrefsStore, NoopPrefsStore, PrefsStore,
};
pub use time::unix_time_ms_now;
