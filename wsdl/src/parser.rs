use quick_xml::{
    events::{attributes::Attributes, BytesStart, BytesText, Event},
    Reader,
};
use std::{
    collections::{HashMap, HashSet},
    io::{BufRead, BufReader},
};
use tracing::{debug, trace};
use url::Url;

use super::{
    error,
    types::{
        Binding, BindingOperation, ComplexType, Definition, Derivation, Element, Field, FieldKind,
        Message, NamespacedName, Occurs, Operation, Part, Port, PortType, Service, Type, TypeKind,
    },
};

fn get_attributes<B: BufRead, const N: usize>(
    reader: &Reader<B>,
    attributes: Attributes<'_>,
    names: [&'static str; N],
) -> Result<[Option<String>; N], error::Error> {
    const INIT: Option<String> = None;
    let mut result = [INIT; N];

    for attribute in attributes {
        let attribute = attribute?;
        let key = reader.decode(attribute.key)?;

        for (index, name) in names.iter().enumerate() {
            if key == *name {
                result[index] = Some(reader.decode(attribute.value.as_ref())?.to_owned());
                break;
            }
        }
    }

    Ok(result)
}

fn required(
    value: Option<String>,
    element: &'static str,
    attribute: &'static str,
) -> Result<String, error::Error> {
    value.ok_or(error::Error::MissingAttribute { element, attribute })
}

fn split_namespaced_name(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, prefixed_name),
    }
}

#[derive(Clone, Default)]
struct CurrentNamespaces {
    target: Vec<String>,
    namespaces: HashMap<Option<String>, String>,
}

struct Parser {
    root: Url,
    visited: HashSet<Url>,

    definition: Definition,
    current_namespaces: CurrentNamespaces,
}

#[derive(Debug)]
enum ParseState {
    Definitions,

    Types,
    Schema,
    Element {
        name: Option<String>,
        reference: Option<NamespacedName>,
        ty: Option<NamespacedName>,
        inner: Option<TypeKind>,
        occurs: Occurs,
    },
    ComplexType {
        name: Option<String>,
        content: ComplexType,
    },
    Compositor(Vec<Field>),
    ComplexContent {
        base: Option<Derivation>,
        fields: Vec<Field>,
        attributes: Vec<String>,
    },
    Derivation {
        base: Derivation,
        fields: Vec<Field>,
        attributes: Vec<String>,
    },
    SimpleContent {
        base: Option<NamespacedName>,
        attributes: Vec<String>,
    },
    SimpleDerivation {
        base: NamespacedName,
        attributes: Vec<String>,
    },
    Attribute {
        name: Option<String>,
    },
    SimpleType {
        name: Option<String>,
        base: Option<NamespacedName>,
    },
    Restriction {
        base: Option<NamespacedName>,
    },

    Message {
        name: String,
        parts: Vec<Part>,
    },
    Part(Part),

    PortType {
        name: String,
        operations: Vec<Operation>,
    },
    Operation {
        name: String,
        documentation: Option<String>,
        input: Option<NamespacedName>,
        output: Option<NamespacedName>,
    },
    Documentation(Option<String>),
    Input {
        message: NamespacedName,
    },
    Output {
        message: NamespacedName,
    },

    Binding {
        name: String,
        ty: NamespacedName,
        transport: Option<String>,
        operations: Vec<BindingOperation>,
    },
    Transport {
        transport: Option<String>,
    },
    BindingOperation {
        name: String,
        action: Option<String>,
        style: Option<String>,
        input: Option<String>,
        output: Option<String>,
    },
    OperationAction {
        action: Option<String>,
        style: Option<String>,
    },
    BindingInput {
        body: Option<String>,
    },
    BindingOutput {
        body: Option<String>,
    },
    BindingBody {
        body: Option<String>,
    },

    Service {
        name: String,
        ports: Vec<Port>,
    },
    Port {
        name: String,
        binding: NamespacedName,
        address: Option<String>,
    },
    Address {
        location: String,
    },

    Import,

    Other(String),
}

impl CurrentNamespaces {
    pub fn push_target_namespace(&mut self, namespace: Option<String>) {
        let namespace = namespace
            .or_else(|| self.target.last().cloned())
            .unwrap_or_default();

        self.target.push(namespace);
    }

    pub fn pop_target_namespace(&mut self) {
        self.target.pop();
    }

    pub fn add_namespace_prefix(&mut self, prefix: Option<String>, namespace: &str) {
        self.namespaces.insert(prefix, namespace.to_owned());
    }

    pub fn target(&self) -> &str {
        self.target.last().map(String::as_str).unwrap_or("")
    }

    pub fn resolve(&self, prefix: Option<&str>) -> Result<&str, error::Error> {
        match self.namespaces.get(&prefix.map(ToOwned::to_owned)) {
            Some(namespace) => Ok(namespace),
            None => match prefix {
                None => Ok(self.target()),
                Some(prefix) => Err(error::Error::UnknownPrefix(prefix.to_owned())),
            },
        }
    }
}

impl Parser {
    fn new(url: Url) -> Self {
        Self {
            root: url,
            visited: HashSet::new(),

            definition: Default::default(),
            current_namespaces: Default::default(),
        }
    }

    fn push_target_namespace(&mut self, namespace: Option<String>) {
        self.current_namespaces.push_target_namespace(namespace);
    }

    fn pop_target_namespace(&mut self) {
        self.current_namespaces.pop_target_namespace();
    }

    fn add_namespace_prefix(&mut self, prefix: Option<String>, namespace: &str) {
        self.current_namespaces
            .add_namespace_prefix(prefix, namespace);
    }

    fn target_namespaced(&mut self, name: String) -> NamespacedName {
        let target = self.current_namespaces.target().to_owned();
        NamespacedName::new(&mut self.definition.namespaces, &target, name)
    }

    fn resolve_namespace(&mut self, prefixed_name: &str) -> Result<NamespacedName, error::Error> {
        let (prefix, local_name) = split_namespaced_name(prefixed_name);

        match prefix {
            Some("tns") => Ok(self.target_namespaced(local_name.to_owned())),

            _ => {
                let namespace = self.current_namespaces.resolve(prefix)?.to_owned();
                Ok(NamespacedName::new(
                    &mut self.definition.namespaces,
                    &namespace,
                    local_name.to_owned(),
                ))
            }
        }
    }

    fn resolve_optional(
        &mut self,
        prefixed_name: Option<String>,
    ) -> Result<Option<NamespacedName>, error::Error> {
        prefixed_name
            .map(|name| self.resolve_namespace(&name))
            .transpose()
    }

    fn parse(mut self) -> Result<Definition, error::Error> {
        self.parse_url(self.root.clone())?;
        Ok(self.definition)
    }

    fn parse_url(&mut self, url: Url) -> Result<(), error::Error> {
        if !self.visited.insert(url.clone()) {
            trace!(%url, "schema already loaded");
            return Ok(());
        }

        debug!(%url, "parsing schema document");

        let result = match url.scheme() {
            "file" => self.parse_xml(
                &url,
                Reader::from_file(
                    url.to_file_path()
                        .map_err(|()| error::Error::PathConversionError(None))?,
                )
                .map_err(error::Error::FileOpenError)?,
            ),

            "http" | "https" => self.parse_xml(
                &url,
                Reader::from_reader(BufReader::new(reqwest::blocking::get(url.clone())?)),
            ),

            other => Err(error::Error::UnsupportedScheme(other.into())),
        };

        debug!(%url, ok = result.is_ok(), "finished schema document");
        result
    }

    fn import(&mut self, url: &Url, location: Option<String>) -> Result<(), error::Error> {
        match location {
            Some(location) => self.parse_url(url.join(&location)?),
            None => Ok(()),
        }
    }

    fn parse_xml<B: BufRead>(&mut self, url: &Url, mut reader: Reader<B>) -> Result<(), error::Error> {
        reader.trim_text(true);

        let mut stack = Vec::new();
        let mut buffer = Vec::new();

        loop {
            match reader.read_event(&mut buffer)? {
                Event::Start(start) => self.handle_start(&mut stack, &reader, &start, url)?,
                Event::End(..) => self.handle_end(&mut stack)?,

                Event::Empty(start) => {
                    self.handle_start(&mut stack, &reader, &start, url)?;
                    self.handle_end(&mut stack)?;
                }

                Event::Text(text) => self.handle_text(&mut stack, &reader, &text)?,

                Event::Eof => break,

                _ => (),
            }

            buffer.clear();
        }

        Ok(())
    }

    fn handle_start<B: BufRead>(
        &mut self,
        stack: &mut Vec<ParseState>,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
        url: &Url,
    ) -> Result<(), error::Error> {
        let (_, local_name) = split_namespaced_name(reader.decode(start.name())?);

        let state = stack.pop();
        let mut new_state = ParseState::Other(local_name.to_owned());

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?;
            let value = reader.decode(attribute.value.as_ref())?;

            match split_namespaced_name(key) {
                (Some("xmlns"), prefix) => self.add_namespace_prefix(Some(prefix.to_owned()), value),
                (None, "xmlns") => self.add_namespace_prefix(None, value),
                _ => (),
            }
        }

        match &state {
            None => match local_name {
                "definitions" | "schema" => {
                    let [namespace] =
                        get_attributes(reader, start.attributes(), ["targetNamespace"])?;

                    self.push_target_namespace(namespace);

                    new_state = if local_name == "definitions" {
                        ParseState::Definitions
                    } else {
                        ParseState::Schema
                    };
                }

                _ => trace!("found {} at document root", local_name),
            },

            Some(ParseState::Definitions) => match local_name {
                "import" => {
                    let [location] = get_attributes(reader, start.attributes(), ["location"])?;
                    self.import(url, location)?;
                    new_state = ParseState::Import;
                }

                "types" => new_state = ParseState::Types,

                "message" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Message {
                        name: required(name, "message", "name")?,
                        parts: Vec::new(),
                    };
                }

                "portType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::PortType {
                        name: required(name, "portType", "name")?,
                        operations: Vec::new(),
                    };
                }

                "binding" => {
                    let [name, ty] = get_attributes(reader, start.attributes(), ["name", "type"])?;

                    new_state = ParseState::Binding {
                        name: required(name, "binding", "name")?,
                        ty: self.resolve_namespace(&required(ty, "binding", "type")?)?,
                        transport: None,
                        operations: Vec::new(),
                    };
                }

                "service" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Service {
                        name: required(name, "service", "name")?,
                        ports: Vec::new(),
                    };
                }

                _ => trace!("found {} inside definitions block", local_name),
            },

            Some(ParseState::Types) => match local_name {
                "schema" => {
                    let [namespace] =
                        get_attributes(reader, start.attributes(), ["targetNamespace"])?;

                    self.push_target_namespace(namespace);
                    new_state = ParseState::Schema;
                }

                _ => trace!("found {} inside types block", local_name),
            },

            Some(ParseState::Schema) => match local_name {
                "element" => new_state = self.element_state(reader, start)?,

                "complexType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::ComplexType {
                        name: Some(required(name, "complexType", "name")?),
                        content: ComplexType::default(),
                    };
                }

                "simpleType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::SimpleType {
                        name: Some(required(name, "simpleType", "name")?),
                        base: None,
                    };
                }

                "include" | "import" => {
                    let [location] =
                        get_attributes(reader, start.attributes(), ["schemaLocation"])?;

                    self.import(url, location)?;
                    new_state = ParseState::Import;
                }

                _ => trace!("found {} inside schema block", local_name),
            },

            Some(ParseState::Element { .. }) => match local_name {
                "complexType" => {
                    new_state = ParseState::ComplexType {
                        name: None,
                        content: ComplexType::default(),
                    }
                }

                "simpleType" => new_state = ParseState::SimpleType { name: None, base: None },

                _ => trace!("found {} inside element block", local_name),
            },

            Some(ParseState::ComplexType { .. }) => match local_name {
                "sequence" | "choice" | "all" => new_state = ParseState::Compositor(Vec::new()),

                "complexContent" => {
                    new_state = ParseState::ComplexContent {
                        base: None,
                        fields: Vec::new(),
                        attributes: Vec::new(),
                    }
                }

                "simpleContent" => {
                    new_state = ParseState::SimpleContent {
                        base: None,
                        attributes: Vec::new(),
                    }
                }

                "attribute" => new_state = self.attribute_state(reader, start)?,

                _ => trace!("found {} inside complex type block", local_name),
            },

            Some(ParseState::Compositor(_)) => match local_name {
                "element" => new_state = self.element_state(reader, start)?,

                "sequence" | "choice" | "all" => new_state = ParseState::Compositor(Vec::new()),

                _ => trace!("found {} inside compositor block", local_name),
            },

            Some(ParseState::ComplexContent { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;
                    let base = self.resolve_namespace(&required(base, "extension", "base")?)?;

                    let base = if local_name == "extension" {
                        Derivation::Extension(base)
                    } else {
                        Derivation::Restriction(base)
                    };

                    new_state = ParseState::Derivation {
                        base,
                        fields: Vec::new(),
                        attributes: Vec::new(),
                    };
                }

                _ => trace!("found {} inside complex content block", local_name),
            },

            Some(ParseState::Derivation { .. }) => match local_name {
                "sequence" | "choice" | "all" => new_state = ParseState::Compositor(Vec::new()),

                "attribute" => new_state = self.attribute_state(reader, start)?,

                _ => trace!("found {} inside derivation block", local_name),
            },

            Some(ParseState::SimpleContent { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;

                    new_state = ParseState::SimpleDerivation {
                        base: self.resolve_namespace(&required(base, "extension", "base")?)?,
                        attributes: Vec::new(),
                    };
                }

                _ => trace!("found {} inside simple content block", local_name),
            },

            Some(ParseState::SimpleDerivation { .. }) => match local_name {
                "attribute" => new_state = self.attribute_state(reader, start)?,

                _ => trace!("found {} inside simple derivation block", local_name),
            },

            Some(ParseState::SimpleType { .. }) => match local_name {
                "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;

                    new_state = ParseState::Restriction {
                        base: self.resolve_optional(base)?,
                    };
                }

                _ => trace!("found {} inside simple type block", local_name),
            },

            Some(ParseState::Attribute { .. }) => match local_name {
                "simpleType" => new_state = ParseState::SimpleType { name: None, base: None },

                _ => trace!("found {} inside attribute block", local_name),
            },

            Some(ParseState::Message { .. }) => match local_name {
                "part" => {
                    let [name, element, ty] =
                        get_attributes(reader, start.attributes(), ["name", "element", "type"])?;

                    new_state = ParseState::Part(Part {
                        name: required(name, "part", "name")?,
                        element: self.resolve_optional(element)?,
                        ty: self.resolve_optional(ty)?,
                    });
                }

                _ => trace!("found {} inside message block", local_name),
            },

            Some(ParseState::PortType { .. }) => match local_name {
                "operation" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Operation {
                        name: required(name, "operation", "name")?,
                        documentation: None,
                        input: None,
                        output: None,
                    }
                }

                _ => trace!("found {} inside port type block", local_name),
            },

            Some(ParseState::Operation { .. }) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),

                "input" | "output" => {
                    let [message] = get_attributes(reader, start.attributes(), ["message"])?;
                    let message = self.resolve_namespace(&required(message, "input", "message")?)?;

                    if local_name == "input" {
                        new_state = ParseState::Input { message }
                    } else {
                        new_state = ParseState::Output { message }
                    }
                }

                _ => trace!("found {} inside operation block", local_name),
            },

            Some(ParseState::Binding { .. }) => match local_name {
                "binding" => {
                    let [transport] = get_attributes(reader, start.attributes(), ["transport"])?;
                    new_state = ParseState::Transport { transport }
                }

                "operation" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::BindingOperation {
                        name: required(name, "operation", "name")?,
                        action: None,
                        style: None,
                        input: None,
                        output: None,
                    }
                }

                _ => trace!("found {} inside binding block", local_name),
            },

            Some(ParseState::BindingOperation { .. }) => match local_name {
                "operation" => {
                    let [action, style] =
                        get_attributes(reader, start.attributes(), ["soapAction", "style"])?;

                    new_state = ParseState::OperationAction { action, style };
                }

                "input" => new_state = ParseState::BindingInput { body: None },
                "output" => new_state = ParseState::BindingOutput { body: None },

                _ => trace!("found {} inside binding operation block", local_name),
            },

            Some(ParseState::BindingInput { .. } | ParseState::BindingOutput { .. }) => {
                match local_name {
                    "body" => {
                        let [body] = get_attributes(reader, start.attributes(), ["use"])?;
                        new_state = ParseState::BindingBody { body };
                    }

                    _ => trace!("found {} inside binding message block", local_name),
                }
            }

            Some(ParseState::Service { .. }) => match local_name {
                "port" => {
                    let [name, binding] =
                        get_attributes(reader, start.attributes(), ["name", "binding"])?;

                    new_state = ParseState::Port {
                        name: required(name, "port", "name")?,
                        binding: self.resolve_namespace(&required(binding, "port", "binding")?)?,
                        address: None,
                    };
                }

                _ => trace!("found {} inside service block", local_name),
            },

            Some(ParseState::Port { .. }) => match local_name {
                "address" => {
                    let [location] = get_attributes(reader, start.attributes(), ["location"])?;

                    new_state = ParseState::Address {
                        location: required(location, "address", "location")?,
                    }
                }

                _ => trace!("found {} inside port block", local_name),
            },

            Some(ParseState::Other(name)) => {
                trace!("found {} inside {} block", local_name, name);
            }

            Some(_) => trace!("found {} inside leaf block", local_name),
        }

        stack.extend(state);
        stack.push(new_state);

        Ok(())
    }

    fn element_state<B: BufRead>(
        &mut self,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<ParseState, error::Error> {
        let [name, reference, ty, min, max] = get_attributes(
            reader,
            start.attributes(),
            ["name", "ref", "type", "minOccurs", "maxOccurs"],
        )?;

        if name.is_none() && reference.is_none() {
            return Err(error::Error::MissingAttribute {
                element: "element",
                attribute: "name",
            });
        }

        Ok(ParseState::Element {
            name,
            reference: self.resolve_optional(reference)?,
            ty: self.resolve_optional(ty)?,
            inner: None,
            occurs: Occurs::parse(min.as_deref(), max.as_deref()),
        })
    }

    fn attribute_state<B: BufRead>(
        &mut self,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<ParseState, error::Error> {
        let [name, reference] = get_attributes(reader, start.attributes(), ["name", "ref"])?;

        let name = name.or_else(|| {
            reference.map(|reference| split_namespaced_name(&reference).1.to_owned())
        });

        Ok(ParseState::Attribute { name })
    }

    fn handle_end(&mut self, stack: &mut Vec<ParseState>) -> Result<(), error::Error> {
        let finished_state = stack.pop();
        let mut next_state = stack.pop();

        match finished_state {
            Some(ParseState::Definitions | ParseState::Schema) => self.pop_target_namespace(),

            Some(ParseState::Element {
                name,
                reference,
                ty,
                inner,
                occurs,
            }) => {
                let kind = match (inner, ty, &reference) {
                    (Some(inner), _, _) => FieldKind::Inner(inner),
                    (None, Some(ty), _) => FieldKind::Type(ty),
                    (None, None, Some(reference)) => FieldKind::Ref(reference.clone()),
                    (None, None, None) => FieldKind::Untyped,
                };

                match next_state {
                    Some(ParseState::Schema) => {
                        if let Some(name) = name {
                            let name = self.target_namespaced(name);
                            self.definition.elements.push(Element { name, ty: kind })
                        }
                    }

                    Some(ParseState::Compositor(ref mut fields)) => {
                        let name = match (name, reference) {
                            (Some(name), _) => Some(self.target_namespaced(name)),
                            (None, reference) => reference,
                        };

                        if let Some(name) = name {
                            fields.push(Field {
                                name,
                                ty: kind,
                                occurs,
                            })
                        }
                    }

                    _ => trace!("dropping element outside schema or compositor"),
                }
            }

            Some(ParseState::ComplexType { name, content }) => match next_state {
                Some(ParseState::Element { ref mut inner, .. }) => {
                    *inner = Some(TypeKind::Complex(content))
                }

                Some(ParseState::Schema) => {
                    if let Some(name) = name {
                        let name = self.target_namespaced(name);
                        self.definition.types.push(Type {
                            name,
                            kind: TypeKind::Complex(content),
                        })
                    }
                }

                _ => trace!("dropping complex type outside schema or element"),
            },

            Some(ParseState::Compositor(fields)) => match next_state {
                Some(ParseState::ComplexType {
                    ref mut content, ..
                }) => content.fields.extend(fields),

                Some(ParseState::Compositor(ref mut parent)) => parent.extend(fields),

                Some(ParseState::Derivation {
                    fields: ref mut derived,
                    ..
                }) => derived.extend(fields),

                _ => trace!("dropping compositor outside type"),
            },

            Some(ParseState::ComplexContent {
                base,
                fields,
                attributes,
            }) => {
                if let Some(ParseState::ComplexType {
                    ref mut content, ..
                }) = next_state
                {
                    content.base = base;
                    content.fields.extend(fields);
                    content.attributes.extend(attributes);
                }
            }

            Some(ParseState::Derivation {
                base,
                fields,
                attributes,
            }) => {
                if let Some(ParseState::ComplexContent {
                    base: ref mut content_base,
                    fields: ref mut content_fields,
                    attributes: ref mut content_attributes,
                }) = next_state
                {
                    *content_base = Some(base);
                    content_fields.extend(fields);
                    content_attributes.extend(attributes);
                }
            }

            Some(ParseState::SimpleContent { base, attributes }) => {
                if let Some(ParseState::ComplexType {
                    ref mut content, ..
                }) = next_state
                {
                    content.simple_content = base;
                    content.attributes.extend(attributes);
                }
            }

            Some(ParseState::SimpleDerivation { base, attributes }) => {
                if let Some(ParseState::SimpleContent {
                    base: ref mut content_base,
                    attributes: ref mut content_attributes,
                }) = next_state
                {
                    *content_base = Some(base);
                    content_attributes.extend(attributes);
                }
            }

            Some(ParseState::Attribute { name: Some(name) }) => match next_state {
                Some(ParseState::ComplexType {
                    ref mut content, ..
                }) => content.attributes.push(name),

                Some(
                    ParseState::Derivation {
                        ref mut attributes, ..
                    }
                    | ParseState::SimpleDerivation {
                        ref mut attributes, ..
                    },
                ) => attributes.push(name),

                _ => trace!("dropping attribute outside type"),
            },

            Some(ParseState::SimpleType { name, base }) => match next_state {
                Some(ParseState::Schema) => {
                    if let Some(name) = name {
                        let name = self.target_namespaced(name);
                        self.definition.types.push(Type {
                            name,
                            kind: TypeKind::Simple(base),
                        })
                    }
                }

                Some(ParseState::Element { ref mut inner, .. }) => {
                    *inner = Some(TypeKind::Simple(base))
                }

                _ => (),
            },

            Some(ParseState::Restriction { base: restriction }) => {
                if let Some(ParseState::SimpleType { ref mut base, .. }) = next_state {
                    *base = restriction
                }
            }

            Some(ParseState::Message { name, parts }) => {
                let name = self.target_namespaced(name);
                self.definition.messages.push(Message { name, parts })
            }

            Some(ParseState::Part(part)) => {
                if let Some(ParseState::Message { ref mut parts, .. }) = next_state {
                    parts.push(part)
                }
            }

            Some(ParseState::PortType { name, operations }) => {
                let name = self.target_namespaced(name);
                self.definition
                    .port_types
                    .push(PortType { name, operations })
            }

            Some(ParseState::Operation {
                name,
                input,
                output,
                documentation,
            }) => {
                if let Some(ParseState::PortType {
                    ref mut operations, ..
                }) = next_state
                {
                    operations.push(Operation {
                        name: self.target_namespaced(name),
                        input,
                        output,
                        documentation,
                    })
                }
            }

            Some(ParseState::Documentation(text)) => {
                if let Some(ParseState::Operation {
                    ref mut documentation,
                    ..
                }) = next_state
                {
                    *documentation = text
                }
            }

            Some(ParseState::Input { message }) => {
                if let Some(ParseState::Operation { ref mut input, .. }) = next_state {
                    *input = Some(message)
                }
            }

            Some(ParseState::Output { message }) => {
                if let Some(ParseState::Operation { ref mut output, .. }) = next_state {
                    *output = Some(message)
                }
            }

            Some(ParseState::Transport { transport: kind }) => {
                if let Some(ParseState::Binding {
                    ref mut transport, ..
                }) = next_state
                {
                    *transport = kind
                }
            }

            Some(ParseState::Binding {
                name,
                ty,
                transport,
                operations,
            }) => {
                let name = self.target_namespaced(name);
                self.definition.bindings.push(Binding {
                    name,
                    ty,
                    transport,
                    operations,
                })
            }

            Some(ParseState::BindingOperation {
                name,
                action,
                style,
                input,
                output,
            }) => {
                if let Some(ParseState::Binding {
                    ref mut operations, ..
                }) = next_state
                {
                    operations.push(BindingOperation {
                        name: self.target_namespaced(name),
                        action,
                        style,
                        input,
                        output,
                    })
                }
            }

            Some(ParseState::OperationAction { action, style }) => {
                if let Some(ParseState::BindingOperation {
                    action: ref mut a,
                    style: ref mut s,
                    ..
                }) = next_state
                {
                    *a = action;
                    *s = style;
                }
            }

            Some(ParseState::BindingInput { body }) => {
                if let Some(ParseState::BindingOperation { ref mut input, .. }) = next_state {
                    *input = body
                }
            }

            Some(ParseState::BindingOutput { body }) => {
                if let Some(ParseState::BindingOperation { ref mut output, .. }) = next_state {
                    *output = body
                }
            }

            Some(ParseState::BindingBody { body: body_use }) => {
                if let Some(
                    ParseState::BindingInput { ref mut body }
                    | ParseState::BindingOutput { ref mut body },
                ) = next_state
                {
                    *body = body_use
                }
            }

            Some(ParseState::Service { name, ports }) => {
                let name = self.target_namespaced(name);
                self.definition.services.push(Service { name, ports })
            }

            Some(ParseState::Port {
                name,
                binding,
                address,
            }) => {
                if let Some(ParseState::Service { ref mut ports, .. }) = next_state {
                    ports.push(Port {
                        name: self.target_namespaced(name),
                        binding,
                        location: address,
                    })
                }
            }

            Some(ParseState::Address { location }) => {
                if let Some(ParseState::Port {
                    ref mut address, ..
                }) = next_state
                {
                    *address = Some(location)
                }
            }

            _ => (),
        }

        stack.extend(next_state);
        Ok(())
    }

    fn handle_text<B: BufRead>(
        &mut self,
        stack: &mut Vec<ParseState>,
        reader: &Reader<B>,
        start: &BytesText<'_>,
    ) -> Result<(), error::Error> {
        if let Some(ParseState::Documentation(ref mut docs)) = stack.last_mut() {
            let unescaped = start.unescaped()?;
            let text = reader.decode(unescaped.as_ref())?;
            *docs = Some(text.to_owned());
        }

        Ok(())
    }
}

pub fn parse(url: Url) -> Result<Definition, error::Error> {
    Parser::new(url).parse()
}
