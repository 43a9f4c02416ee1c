//! Presentation formats for file contents.

use std::borrow::Cow;
use std::fmt;

/// The presentation a read or stat request asks for.
///
/// Uses MIME-type-like strings so codecs can be looked up by format. The
/// backing document itself is always YAML; JSON is an alternate view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format(pub Cow<'static, str>);

impl Format {
    /// YAML, the structured format of the backing document (`application/yaml`)
    pub const YAML: Format = Format(Cow::Borrowed("application/yaml"));

    /// JSON, the alternate interchange view (`application/json`)
    pub const JSON: Format = Format(Cow::Borrowed("application/json"));

    /// Get the format string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is JSON format.
    pub fn is_json(&self) -> bool {
        self == &Self::JSON
    }

    /// Check if this is YAML format.
    pub fn is_yaml(&self) -> bool {
        self == &Self::YAML
    }

    /// Split a recognised file suffix off `name`.
    ///
    /// ```rust
    /// use yamlfs_core_store::Format;
    ///
    /// assert_eq!(Format::strip_suffix("db.json"), Some(("db", Format::JSON)));
    /// assert_eq!(Format::strip_suffix("db.yml"), Some(("db", Format::YAML)));
    /// assert_eq!(Format::strip_suffix("db"), None);
    /// ```
    pub fn strip_suffix(name: &str) -> Option<(&str, Format)> {
        if let Some(stem) = name.strip_suffix(".json") {
            Some((stem, Format::JSON))
        } else if let Some(stem) = name.strip_suffix(".yaml") {
            Some((stem, Format::YAML))
        } else {
            name.strip_suffix(".yml").map(|stem| (stem, Format::YAML))
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::YAML
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Format {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
