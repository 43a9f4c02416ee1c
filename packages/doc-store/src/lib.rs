//! The document behind a yamlfs mount.
//!
//! - `DocumentStore`: the tree, its backing file, persistence and reloads
//! - `resolve` / `resolve_mut`: from paths to locations in the tree
//! - `WriteSessions`: buffered writes, committed when a file is released
//! - `EphemeralStore`: hidden files kept only in memory
//!
//! # Example
//!
//! ```rust,no_run
//! use yamlfs_core_store::{path, Value};
//! use yamlfs_doc_store::{resolve_mut, DocumentOptions, DocumentStore};
//!
//! let store = DocumentStore::open("config.yaml", DocumentOptions::default());
//! let target = path!("server/port");
//!
//! store
//!     .mutate(|root| resolve_mut(root, &target, true)?.set(Value::from(8080i64)))
//!     .unwrap();
//! ```

mod document;
mod ephemeral;
mod resolve;
mod session;

pub use document::{DocumentOptions, DocumentStore, StalenessMarker};
pub use ephemeral::{slice, EphemeralStore, MAX_EPHEMERAL_SIZE};
pub use resolve::{lookup, resolve, resolve_mut, Location, LocationMut, MAX_SEQUENCE_GAP};
pub use session::WriteSessions;
