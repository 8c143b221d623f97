//! Request templates derived from an operation's input shape.
//!
//! A template mirrors the schema: every leaf is `""` and every container is
//! an object. Top-level elements stay flat unless they are `searchCriteria`,
//! `returnedTags`, or an element whose name appears inside the operation
//! name (`phone` in `addPhone`).

use axl_wsdl::{ElementDescription, OperationDescription, MAX_DEPTH};
use serde_json::{Map, Value};

use crate::{Error, Result};

pub type Tags = Map<String, Value>;

const ALWAYS_EXPANDED: [&str; 2] = ["searchCriteria", "returnedTags"];

fn leaf() -> Value {
    Value::String(String::new())
}

pub fn template(operation: &str, elements: &[ElementDescription]) -> Result<Tags> {
    let operation = operation.to_lowercase();
    let mut tags = Tags::new();

    for element in elements {
        let expand = ALWAYS_EXPANDED.contains(&element.name.as_str())
            || operation.contains(&element.name.to_lowercase());

        let value = if expand { nested(element, 0)? } else { leaf() };
        tags.insert(element.name.clone(), value);
    }

    Ok(tags)
}

pub fn operation_tags(description: &OperationDescription) -> Result<Tags> {
    template(&description.name, &description.input)
}

fn nested(element: &ElementDescription, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(Error::SchemaIo(axl_wsdl::error::Error::DepthExceeded(
            MAX_DEPTH,
        )));
    }

    let mut children = Tags::new();

    for child in &element.elements {
        let value = if child.elements.is_empty() {
            leaf()
        } else {
            nested(child, depth + 1)?
        };

        children.insert(child.name.clone(), value);
    }

    if children.is_empty() {
        Ok(leaf())
    } else {
        Ok(Value::Object(children))
    }
}
