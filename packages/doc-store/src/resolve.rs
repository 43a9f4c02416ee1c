//! Path resolution against the document tree.
//!
//! A path resolves to a *location*: the container that holds the entry and
//! the entry's key within it. The root path resolves to the root itself with
//! no key. Sequences are walked by integer index, but only here; they are
//! never listed as directories.

use yamlfs_core_store::{Error, Path, Value};

/// How many nulls a write past the end of a sequence may pad with.
pub const MAX_SEQUENCE_GAP: usize = 1024;

/// A resolved location for reading.
#[derive(Debug, Clone, Copy)]
pub struct Location<'a, 'p> {
    /// The map or sequence that holds the entry (the root for the root path).
    pub container: &'a Value,
    /// The entry's key, `None` for the root.
    pub key: Option<&'p str>,
}

impl<'a> Location<'a, '_> {
    /// The value at this location, if the entry exists.
    pub fn value(&self) -> Option<&'a Value> {
        match self.key {
            None => Some(self.container),
            Some(key) => child(self.container, key),
        }
    }
}

/// A resolved location for writing.
#[derive(Debug)]
pub struct LocationMut<'a, 'p> {
    pub container: &'a mut Value,
    pub key: Option<&'p str>,
}

impl LocationMut<'_, '_> {
    /// The value at this location, if the entry exists.
    pub fn value(&self) -> Option<&Value> {
        match self.key {
            None => Some(&*self.container),
            Some(key) => child(&*self.container, key),
        }
    }

    /// Mutable access to the value at this location.
    pub fn value_mut(&mut self) -> Option<&mut Value> {
        match self.key {
            None => Some(&mut *self.container),
            Some(key) => match &mut *self.container {
                Value::Map(map) => map.get_mut(key),
                Value::Sequence(items) => items.get_mut(key.parse::<usize>().ok()?),
                _ => None,
            },
        }
    }

    /// Store a value at this location.
    ///
    /// Map entries are inserted or replaced in place. For a sequence, an
    /// integer key past the end pads the sequence with nulls up to that
    /// index (at most `MAX_SEQUENCE_GAP` of them), and a non-integer key
    /// appends.
    pub fn set(self, value: Value) -> Result<(), Error> {
        let Some(key) = self.key else {
            *self.container = value;
            return Ok(());
        };

        match self.container {
            Value::Map(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            Value::Sequence(items) => {
                match key.parse::<usize>() {
                    Ok(index) if index < items.len() => items[index] = value,
                    Ok(index) if index - items.len() > MAX_SEQUENCE_GAP => {
                        return Err(Error::TooLarge {
                            message: format!(
                                "sequence index {} is more than {} past the end (len={})",
                                index,
                                MAX_SEQUENCE_GAP,
                                items.len()
                            ),
                        });
                    }
                    Ok(index) => {
                        items.resize(index, Value::Null);
                        items.push(value);
                    }
                    Err(_) => items.push(value),
                }
                Ok(())
            }
            _ => Err(Error::not_directory(key)),
        }
    }

    /// Remove the entry at this location and return it.
    pub fn remove(self) -> Result<Value, Error> {
        let Some(key) = self.key else {
            return Err(Error::NotPermitted {
                message: "cannot remove the document root".to_string(),
            });
        };

        let removed = match self.container {
            Value::Map(map) => map.shift_remove(key),
            Value::Sequence(items) => match key.parse::<usize>() {
                Ok(index) if index < items.len() => Some(items.remove(index)),
                _ => None,
            },
            _ => None,
        };
        removed.ok_or_else(|| Error::not_found(key))
    }
}

fn child<'a>(container: &'a Value, key: &str) -> Option<&'a Value> {
    match container {
        Value::Map(map) => map.get(key),
        Value::Sequence(items) => items.get(key.parse::<usize>().ok()?),
        _ => None,
    }
}

fn prefix(path: &Path, end: usize) -> Path {
    Path {
        components: path.components[..end].to_vec(),
    }
}

/// Resolve a path for reading.
///
/// Walks every segment but the last. A missing map key or an out-of-range
/// sequence index fails with `NotFound`; landing on a scalar fails with
/// `NotDirectory`.
pub fn resolve<'a, 'p>(root: &'a Value, path: &'p Path) -> Result<Location<'a, 'p>, Error> {
    let Some((last, parents)) = path.components.split_last() else {
        return Ok(Location {
            container: root,
            key: None,
        });
    };

    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        current = match current {
            Value::Map(_) | Value::Sequence(_) => {
                child(current, segment).ok_or_else(|| Error::not_found(prefix(path, i + 1)))?
            }
            _ => return Err(Error::not_directory(prefix(path, i))),
        };
    }

    if !matches!(current, Value::Map(_) | Value::Sequence(_)) {
        return Err(Error::not_directory(prefix(path, parents.len())));
    }

    Ok(Location {
        container: current,
        key: Some(last.as_str()),
    })
}

/// Resolve a path for writing.
///
/// With `create_missing`, absent map keys along the way are filled in with
/// empty maps. Sequences are never extended while walking.
pub fn resolve_mut<'a, 'p>(
    root: &'a mut Value,
    path: &'p Path,
    create_missing: bool,
) -> Result<LocationMut<'a, 'p>, Error> {
    let Some((last, parents)) = path.components.split_last() else {
        return Ok(LocationMut {
            container: root,
            key: None,
        });
    };

    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        current = match current {
            Value::Map(map) => {
                if create_missing {
                    map.entry(segment.clone()).or_insert_with(Value::map)
                } else {
                    map.get_mut(segment.as_str())
                        .ok_or_else(|| Error::not_found(prefix(path, i + 1)))?
                }
            }
            Value::Sequence(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| Error::not_found(prefix(path, i + 1)))?,
            _ => return Err(Error::not_directory(prefix(path, i))),
        };
    }

    if !matches!(current, Value::Map(_) | Value::Sequence(_)) {
        return Err(Error::not_directory(prefix(path, parents.len())));
    }

    Ok(LocationMut {
        container: current,
        key: Some(last.as_str()),
    })
}

/// Resolve a path all the way to its value.
pub fn lookup<'a>(root: &'a Value, path: &Path) -> Result<&'a Value, Error> {
    resolve(root, path)?
        .value()
        .ok_or_else(|| Error::not_found(path))
}
