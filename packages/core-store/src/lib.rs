//! Core yamlfs: the shared vocabulary of the projection.
//!
//! - `Value`: the document tree (the "yaml" in yamlfs)
//! - `Path`: a filesystem path split into tree segments
//! - `Format`: which presentation a read or stat asks for
//! - `Error`: the failure taxonomy, with errno mapping for the host boundary
//!
//! # Example
//!
//! ```rust
//! use yamlfs_core_store::{path, Format, Value};
//!
//! let tree: Value = [("app", [("name", Value::from("demo"))].into_iter().collect())]
//!     .into_iter()
//!     .collect();
//! assert_eq!(tree.get(&path!("app/name")), Some(&Value::from("demo")));
//!
//! let (stem, format) = path!("app.json").split_format_suffix();
//! assert_eq!(stem, path!("app"));
//! assert_eq!(format, Some(Format::JSON));
//! ```

mod error;
mod format;
mod path;
mod value;

pub use error::Error;
pub use format::Format;
pub use path::{Path, PathError, HIDDEN_MARKER};
pub use value::{Map, Value};
