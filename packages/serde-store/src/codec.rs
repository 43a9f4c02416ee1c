//! Codecs and the read-path rendering rule.

use bytes::Bytes;
use yamlfs_core_store::{Error, Format, Value};

use crate::convert::{json_to_value, value_to_json, value_to_yaml, yaml_to_value};

/// Converts between tree values and bytes of one or more formats.
pub trait Codec: Send + Sync {
    /// Decode bytes in the given format into a value.
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error>;

    /// Encode a value into bytes of the given format.
    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error>;

    /// Whether this codec handles the format.
    fn supports(&self, format: &Format) -> bool;
}

/// The YAML codec used for the backing document.
///
/// Encoding is block style throughout: multi-line strings are written as
/// literal blocks and sequences are expanded, one item per line.
///
/// # Example
///
/// ```rust
/// use yamlfs_serde_store::{Codec, YamlCodec};
/// use yamlfs_core_store::{Format, Value};
///
/// let codec = YamlCodec;
/// let value: Value = [("motd", Value::from("hello\nworld"))].into_iter().collect();
///
/// let bytes = codec.encode(&value, &Format::YAML).unwrap();
/// assert_eq!(&bytes[..], b"motd: |-\n  hello\n  world\n");
/// assert_eq!(codec.decode(&bytes, &Format::YAML).unwrap(), value);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }

        let text = std::str::from_utf8(bytes).map_err(|e| Error::decode(format.clone(), e.to_string()))?;
        let yaml: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(text).map_err(|e| Error::decode(format.clone(), e.to_string()))?;

        Ok(yaml_to_value(yaml))
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }

        let yaml = serde_yaml_ng::to_string(&value_to_yaml(value))
            .map_err(|e| Error::encode(format.clone(), e.to_string()))?;

        Ok(Bytes::from(yaml))
    }

    fn supports(&self, format: &Format) -> bool {
        format.is_yaml()
    }
}

/// A codec for the JSON view.
///
/// Output is pretty-printed with a trailing newline, keys in tree order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }

        let json: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::decode(format.clone(), e.to_string()))?;

        Ok(json_to_value(json))
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        if !self.supports(format) {
            return Err(Error::UnsupportedFormat(format.clone()));
        }

        let json = value_to_json(value);
        let mut bytes = serde_json::to_vec_pretty(&json)
            .map_err(|e| Error::encode(format.clone(), e.to_string()))?;
        bytes.push(b'\n');

        Ok(Bytes::from(bytes))
    }

    fn supports(&self, format: &Format) -> bool {
        format.is_json()
    }
}

/// A codec that combines multiple codecs.
///
/// Routes encode/decode to the first codec that supports the format.
pub struct MultiCodec {
    codecs: Vec<Box<dyn Codec>>,
}

impl MultiCodec {
    /// Create an empty multi-codec.
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Add a codec.
    pub fn add(&mut self, codec: impl Codec + 'static) {
        self.codecs.push(Box::new(codec));
    }
}

impl Default for MultiCodec {
    /// YAML and JSON.
    fn default() -> Self {
        let mut mc = Self::new();
        mc.add(YamlCodec);
        mc.add(JsonCodec);
        mc
    }
}

impl Codec for MultiCodec {
    fn decode(&self, bytes: &Bytes, format: &Format) -> Result<Value, Error> {
        for codec in &self.codecs {
            if codec.supports(format) {
                return codec.decode(bytes, format);
            }
        }
        Err(Error::UnsupportedFormat(format.clone()))
    }

    fn encode(&self, value: &Value, format: &Format) -> Result<Bytes, Error> {
        for codec in &self.codecs {
            if codec.supports(format) {
                return codec.encode(value, format);
            }
        }
        Err(Error::UnsupportedFormat(format.clone()))
    }

    fn supports(&self, format: &Format) -> bool {
        self.codecs.iter().any(|c| c.supports(format))
    }
}

/// File contents for a value in the requested presentation.
///
/// - strings are returned as their literal bytes, in any presentation
/// - null is an empty file
/// - other scalars are their YAML form, or compact JSON, plus a newline
/// - mappings and sequences go through the codec for the presentation
pub fn render(value: &Value, format: &Format) -> Result<Bytes, Error> {
    match value {
        Value::String(s) => Ok(Bytes::from(s.clone().into_bytes())),
        Value::Null => Ok(Bytes::new()),
        Value::Bool(_) | Value::Integer(_) | Value::Float(_) if format.is_json() => {
            let mut bytes = serde_json::to_vec(&value_to_json(value))
                .map_err(|e| Error::encode(format.clone(), e.to_string()))?;
            bytes.push(b'\n');
            Ok(Bytes::from(bytes))
        }
        Value::Bool(_) | Value::Integer(_) | Value::Float(_) => {
            YamlCodec.encode(value, &Format::YAML)
        }
        Value::Map(_) | Value::Sequence(_) => MultiCodec::default().encode(value, format),
    }
}
