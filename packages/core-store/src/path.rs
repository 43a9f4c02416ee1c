//! Path type: a filesystem path split into document tree segments.

use std::fmt;

use crate::Format;

/// First character of a hidden (ephemeral) path component.
pub const HIDDEN_MARKER: char = '.';

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component can't name a tree entry.
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
    /// The path string is invalid.
    InvalidPath { message: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidComponent {
                component,
                position,
                message,
            } => {
                write!(
                    f,
                    "invalid path component '{}' at position {}: {}",
                    component, position, message
                )
            }
            PathError::InvalidPath { message } => {
                write!(f, "invalid path: {}", message)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A path inside the mounted filesystem.
///
/// Components map one-to-one onto map keys (or sequence indices) of the
/// document tree. Any component is accepted except the relative markers `.`
/// and `..` and names containing NUL, since map keys are arbitrary strings.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// The root path (`/`), which denotes the document itself.
    pub fn root() -> Self {
        Path {
            components: Vec::new(),
        }
    }

    /// Parse a path string, validating components.
    ///
    /// # Path Syntax
    ///
    /// - Components are separated by `/`
    /// - Empty components are ignored (normalizes `//`, leading and trailing `/`)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use yamlfs_core_store::Path;
    ///
    /// let path = Path::parse("/users/0/name").unwrap();
    /// assert_eq!(path.len(), 3);
    ///
    /// assert_eq!(Path::parse("foo/bar/").unwrap(), Path::parse("/foo/bar").unwrap());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let components: Vec<String> = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();

        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }

        Ok(Path { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        let message = if component.is_empty() {
            "empty component"
        } else if component == "." || component == ".." {
            "relative components are not allowed"
        } else if component.contains('\0') {
            "NUL byte in component"
        } else if component.contains('/') {
            "separator in component"
        } else {
            return Ok(());
        };

        Err(PathError::InvalidComponent {
            component: component.to_string(),
            position,
            message: message.to_string(),
        })
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if this path has no components (same as `is_root`).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// The last component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The path without its last component, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, parents) = self.components.split_last()?;
        Some(Path {
            components: parents.to_vec(),
        })
    }

    /// Append a single entry name.
    pub fn child(&self, name: &str) -> Result<Path, PathError> {
        Self::validate_component(name, self.components.len())?;
        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Path { components })
    }

    /// Whether any component starts with the hidden marker.
    ///
    /// Hidden paths are served from the ephemeral table and never reach the
    /// document.
    pub fn is_hidden(&self) -> bool {
        self.components.iter().any(|c| c.starts_with(HIDDEN_MARKER))
    }

    /// Split a presentation suffix off the last component.
    ///
    /// `config.json` becomes (`config`, JSON) and `config.yml` becomes
    /// (`config`, YAML). Paths without a known suffix, and bare suffixes such
    /// as `.json`, come back unchanged with `None`.
    pub fn split_format_suffix(&self) -> (Path, Option<Format>) {
        let Some((last, parents)) = self.components.split_last() else {
            return (self.clone(), None);
        };

        match Format::strip_suffix(last) {
            Some((stem, format)) if !stem.is_empty() => {
                let mut components = parents.to_vec();
                components.push(stem.to_string());
                (Path { components }, Some(format))
            }
            _ => (self.clone(), None),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use yamlfs_core_store::path;
///
/// let p = path!("users/0/name");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
