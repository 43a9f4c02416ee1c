//! Content codecs for yamlfs
//!
//! This layer turns tree values into file contents and back:
//! - `YamlCodec`: the structured format, written in block style with
//!   multi-line strings kept as literal blocks
//! - `JsonCodec`: the alternate interchange view
//! - `render`: what a read of a file returns for a given presentation
//! - `infer_value`: what a write to a file commits into the tree
//! - Value <-> serde value conversions
//!
//! # Example
//!
//! ```rust
//! use yamlfs_serde_store::{infer_value, render, Format, Value};
//!
//! let value = infer_value(b"- x\n- y\n");
//! assert_eq!(value, Value::from(vec!["x", "y"]));
//!
//! let bytes = render(&value, &Format::YAML).unwrap();
//! assert_eq!(&bytes[..], b"- x\n- y\n");
//! ```

pub use bytes::Bytes;

mod codec;
mod convert;
mod infer;

pub use codec::{render, Codec, JsonCodec, MultiCodec, YamlCodec};
pub use convert::{json_to_value, value_to_json, value_to_yaml, yaml_to_value};
pub use infer::infer_value;

// Re-export core types for convenience
pub use yamlfs_core_store::{Error, Format, Path, Value};
