use quick_xml::{
    events::{BytesStart, BytesText, Event},
    Reader,
};
use serde_json::{Map, Value};
use std::{borrow::Cow, io::Write};

pub use quick_xml::Writer;

use crate::Error;

/// Object key holding an element's XML attributes.
pub const ATTRIBUTES_KEY: &str = "attributes";

/// Object key holding the text of an element that also has attributes.
pub const VALUE_KEY: &str = "value";

pub trait ToXml {
    fn to_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error>;
}

/// A JSON value written under one element name.
#[derive(Debug)]
pub struct Element<'a> {
    name: Cow<'a, str>,
    value: &'a Value,
}

impl<'a> Element<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, value: &'a Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl ToXml for Element<'_> {
    fn to_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        write_element(writer, &self.name, self.value)
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(text) => Some(Cow::Borrowed(text)),
        Value::Bool(flag) => Some(Cow::Owned(flag.to_string())),
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Writes `value` as the element `name`.
///
/// Arrays repeat the element, `null` writes nothing, and objects use the
/// [`ATTRIBUTES_KEY`] and [`VALUE_KEY`] conventions.
pub fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &Value,
) -> Result<(), Error> {
    match value {
        Value::Null => Ok(()),

        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }

            Ok(())
        }

        Value::Object(map) => {
            let mut start = BytesStart::owned_name(name.to_owned());

            if let Some(Value::Object(attributes)) = map.get(ATTRIBUTES_KEY) {
                for (key, value) in attributes {
                    if let Some(text) = scalar_text(value) {
                        start.push_attribute((key.as_str(), &*text));
                    }
                }
            }

            writer.write_event(Event::Start(start.to_borrowed()))?;

            for (key, child) in map {
                match (key.as_str(), scalar_text(child)) {
                    (ATTRIBUTES_KEY, _) => (),
                    (VALUE_KEY, Some(text)) => {
                        writer.write_event(Event::Text(BytesText::from_plain_str(&text)))?;
                    }
                    _ => write_element(writer, key, child)?,
                }
            }

            writer.write_event(Event::End(start.to_end()))?;
            Ok(())
        }

        scalar => {
            let start = BytesStart::owned_name(name.to_owned());
            let text = scalar_text(scalar).unwrap_or_default();

            writer.write_event(Event::Start(start.to_borrowed()))?;
            writer.write_event(Event::Text(BytesText::from_plain_str(&text)))?;
            writer.write_event(Event::End(start.to_end()))?;
            Ok(())
        }
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

#[derive(Default)]
struct Frame {
    name: String,
    nil: bool,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open<B: std::io::BufRead>(reader: &Reader<B>, start: &BytesStart<'_>) -> Result<Self, Error> {
        let mut frame = Frame {
            name: local_name(reader.decode(start.name())?).to_owned(),
            ..Default::default()
        };

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?;

            match key.split_once(':') {
                Some(("xsi", "nil")) => {
                    frame.nil = attribute.unescape_and_decode_value(reader)? == "true";
                }

                Some(("xmlns" | "xsi", _)) => (),
                None if key == "xmlns" => (),

                _ => {
                    let value = attribute.unescape_and_decode_value(reader)?;
                    frame
                        .attributes
                        .insert(local_name(key).to_owned(), Value::String(value));
                }
            }
        }

        Ok(frame)
    }

    fn close(self) -> (String, Value) {
        let Frame {
            name,
            nil,
            attributes,
            mut children,
            text,
        } = self;

        let value = if nil {
            Value::Null
        } else if attributes.is_empty() && children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !attributes.is_empty() {
                children.insert(ATTRIBUTES_KEY.to_owned(), Value::Object(attributes));
            }

            if !text.is_empty() {
                children.insert(VALUE_KEY.to_owned(), Value::String(text));
            }

            Value::Object(children)
        };

        (name, value)
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }
}

/// Reads a whole XML document into its root element's local name and value.
pub fn read_document(xml: &[u8]) -> Result<(String, Value), Error> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;
    let mut buffer = Vec::new();

    loop {
        let closed = match reader.read_event(&mut buffer)? {
            Event::Start(start) => {
                stack.push(Frame::open(&reader, &start)?);
                None
            }

            Event::Empty(start) => Some(Frame::open(&reader, &start)?.close()),

            Event::End(_) => stack.pop().map(Frame::close),

            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape_and_decode(&reader)?);
                }
                None
            }

            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(reader.decode(&data)?);
                }
                None
            }

            Event::Eof => break,

            _ => None,
        };

        if let Some((name, value)) = closed {
            match stack.last_mut() {
                Some(parent) => parent.push_child(name, value),
                None => root = root.or(Some((name, value))),
            }
        }

        buffer.clear();
    }

    root.ok_or(Error::EmptyDocument)
}
