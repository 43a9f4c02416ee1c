//! Projection settings.

use std::time::Duration;

use yamlfs_core_store::Format;

/// How the document is presented through the filesystem.
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Presentation for paths without a `.json`/`.yaml`/`.yml` suffix.
    pub default_format: Format,
    /// Repair `\n` escape sequences when the document is loaded.
    pub repair_escaped_newlines: bool,
    /// How long the kernel may cache attributes and entries.
    pub attr_ttl: Duration,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            default_format: Format::YAML,
            repair_escaped_newlines: false,
            attr_ttl: Duration::from_secs(1),
        }
    }
}
