//! Output engines.
//!
//! An [`Engine`] turns one kind of data into a response body and knows the
//! head that goes with it. Engines that can fail produce the whole body
//! before touching the sink, so a failed render writes nothing.

use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use minijinja::Value;
use serde::Serialize;

use crate::error::{RenderError, Result};
use crate::pool::{BufferPool, PooledBuffer};
use crate::sink::{ResponseHead, Sink};
use crate::template::TemplateSet;

/// Renders `T` into a sink.
pub trait Engine<T: ?Sized> {
    fn render(&self, sink: &mut dyn Sink, data: &T) -> Result<()>;
}

/// Content type and status written ahead of a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub content_type: String,
    pub status: StatusCode,
}

impl Head {
    pub fn new(content_type: impl Into<String>, status: StatusCode) -> Self {
        Self {
            content_type: content_type.into(),
            status,
        }
    }

    /// Sets `Content-Type` and sends the status.
    pub fn write(&self, head: &mut dyn ResponseHead) -> Result<()> {
        let value = HeaderValue::from_str(&self.content_type).map_err(|err| {
            RenderError::Config(format!(
                "invalid content type {:?}: {}",
                self.content_type, err
            ))
        })?;
        head.headers_mut().insert(CONTENT_TYPE, value);
        head.write_status(self.status);
        Ok(())
    }

    fn write_to(&self, sink: &mut dyn Sink) -> Result<()> {
        match sink.response_head() {
            Some(head) => self.write(head),
            None => Ok(()),
        }
    }
}

/// Executes a named template from a compiled set.
///
/// Output goes to a pooled buffer first; the head and body are only written
/// once execution has succeeded.
#[derive(Debug)]
pub struct Html {
    pub head: Head,
    pub name: String,
    pub set: Arc<TemplateSet>,
    pub pool: Arc<dyn BufferPool>,
}

impl Engine<Value> for Html {
    fn render(&self, sink: &mut dyn Sink, data: &Value) -> Result<()> {
        let mut buf = PooledBuffer::acquire(self.pool.as_ref());
        self.set.execute(&self.name, data.clone(), &mut *buf)?;

        self.head.write_to(sink)?;
        sink.write_all(&buf)?;
        Ok(())
    }
}

/// Serializes data as JSON.
#[derive(Debug, Clone)]
pub struct Json {
    pub head: Head,
    pub indent: bool,
    pub prefix: Vec<u8>,
}

impl<T: Serialize + ?Sized> Engine<T> for Json {
    fn render(&self, sink: &mut dyn Sink, data: &T) -> Result<()> {
        let body = if self.indent {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };

        self.head.write_to(sink)?;
        sink.write_all(&self.prefix)?;
        sink.write_all(&body)?;
        Ok(())
    }
}

/// Serializes data as XML.
///
/// Named structs use the type name as the root element. Maps, sequences and
/// primitives go under a `<data>` root with keys turned into valid element
/// names; sequences and primitives are written as `<value>` children.
#[derive(Debug, Clone)]
pub struct Xml {
    pub head: Head,
    pub indent: bool,
    pub prefix: Vec<u8>,
}

impl<T: Serialize + ?Sized> Engine<T> for Xml {
    fn render(&self, sink: &mut dyn Sink, data: &T) -> Result<()> {
        let body = serialize_xml(data, self.indent)?;

        self.head.write_to(sink)?;
        sink.write_all(&self.prefix)?;
        sink.write_all(body.as_bytes())?;
        Ok(())
    }
}

fn serialize_xml<T: Serialize + ?Sized>(data: &T, indent: bool) -> Result<String> {
    if let Ok(xml) = write_xml(data, None, indent) {
        return Ok(xml);
    }

    let wrapped = match sanitize_xml_keys(serde_json::to_value(data)?) {
        object @ serde_json::Value::Object(_) => object,
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            serde_json::Value::Object(map)
        }
    };
    Ok(write_xml(&wrapped, Some("data"), indent)?)
}

fn write_xml<T: Serialize + ?Sized>(
    data: &T,
    root: Option<&str>,
    indent: bool,
) -> std::result::Result<String, quick_xml::DeError> {
    let mut body = String::new();
    let mut serializer = match root {
        Some(_) => quick_xml::se::Serializer::with_root(&mut body, root)?,
        None => quick_xml::se::Serializer::new(&mut body),
    };
    if indent {
        serializer.indent(' ', 2);
    }
    data.serialize(serializer)?;
    Ok(body)
}

fn sanitize_xml_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(key, val)| (sanitize_xml_name(&key), sanitize_xml_keys(val)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sanitize_xml_keys).collect())
        }
        other => other,
    }
}

/// Element names start with a letter or underscore and continue with
/// letters, digits, `-`, `_` or `.`. Anything else becomes `_`.
fn sanitize_xml_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    let mut result = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 && !(c.is_ascii_alphabetic() || c == '_') {
            result.push('_');
            if c.is_ascii_alphanumeric() {
                result.push(c);
            }
        } else if i == 0 || c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
            result.push(c);
        } else {
            result.push('_');
        }
    }
    result
}

/// Writes raw bytes.
#[derive(Debug, Clone)]
pub struct Data {
    pub head: Head,
}

impl Engine<[u8]> for Data {
    fn render(&self, sink: &mut dyn Sink, data: &[u8]) -> Result<()> {
        self.head.write_to(sink)?;
        sink.write_all(data)?;
        Ok(())
    }
}

/// Writes plain text.
#[derive(Debug, Clone)]
pub struct Text {
    pub head: Head,
}

impl Engine<str> for Text {
    fn render(&self, sink: &mut dyn Sink, data: &str) -> Result<()> {
        self.head.write_to(sink)?;
        sink.write_all(data.as_bytes())?;
        Ok(())
    }
}
