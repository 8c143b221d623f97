use serde::Serialize;
use serde_json::Value;
use std::{
    collections::HashSet,
    fmt,
    io::{Cursor, Write},
    sync::Arc,
};
use tracing::debug;
use url::Url;

use quick_xml::events::{BytesDecl, BytesStart, Event};

use super::{
    transport::{Credentials, Request, Response, Transport},
    xml::{self, Element, ToXml, Writer, VALUE_KEY},
    Error,
};

pub const ENVELOPE_PREFIX: &str = "soapenv";
pub const ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Prefix and URI the operation element is qualified with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

#[derive(Debug)]
pub struct Envelope<T> {
    namespace: Namespace,
    body: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fault {
    pub code: Option<String>,
    pub string: String,
    pub detail: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Contents of the first element inside `Body`.
    Body(Value),
    Fault(Fault),
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub message: Message,
}

/// Invocable client over one endpoint and a fixed set of operations.
pub struct Client {
    transport: Arc<dyn Transport>,
    endpoint: Url,
    operations: HashSet<String>,
    credentials: Option<Credentials>,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    pub fn qualify(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }
}

impl<T> Envelope<T> {
    pub fn new(namespace: Namespace, body: T) -> Self {
        Self { namespace, body }
    }
}

impl<T: ToXml> Envelope<T> {
    pub fn to_request(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new(b"1.0", Some(&b"UTF-8"[..]), None)))?;
        self.to_xml(&mut writer)?;
        Ok(writer.into_inner().into_inner())
    }
}

impl<T: ToXml> ToXml for Envelope<T> {
    fn to_xml<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let namespace_attribute = format!("xmlns:{}", self.namespace.prefix);

        let mut envelope = BytesStart::owned_name(format!("{}:Envelope", ENVELOPE_PREFIX));
        envelope.push_attribute((
            format!("xmlns:{}", ENVELOPE_PREFIX).as_str(),
            ENVELOPE_NAMESPACE,
        ));
        envelope.push_attribute((namespace_attribute.as_str(), self.namespace.uri.as_str()));

        let header = BytesStart::owned_name(format!("{}:Header", ENVELOPE_PREFIX));
        let body = BytesStart::owned_name(format!("{}:Body", ENVELOPE_PREFIX));

        writer.write_event(Event::Start(envelope.to_borrowed()))?;
        writer.write_event(Event::Empty(header.to_borrowed()))?;
        writer.write_event(Event::Start(body.to_borrowed()))?;
        self.body.to_xml(writer)?;
        writer.write_event(Event::End(body.to_end()))?;
        writer.write_event(Event::End(envelope.to_end()))?;

        Ok(())
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map.get(VALUE_KEY).and_then(text_of),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

impl Fault {
    pub fn new(string: impl Into<String>) -> Self {
        Self {
            code: None,
            string: string.into(),
            detail: None,
        }
    }

    fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name);

        Self {
            code: field("faultcode").and_then(text_of),
            string: field("faultstring")
                .and_then(text_of)
                .unwrap_or_default(),
            detail: field("detail").cloned().filter(|detail| !detail.is_null()),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.string),
            None => write!(f, "{}", self.string),
        }
    }
}

/// Splits a SOAP response document into its body payload or its fault.
pub fn parse_envelope(xml: &[u8]) -> Result<Message, Error> {
    let (root, value) = xml::read_document(xml)?;

    if root != "Envelope" {
        return Err(Error::NotAnEnvelope);
    }

    let body = match value.get("Body") {
        Some(body) => body,
        None => return Err(Error::NotAnEnvelope),
    };

    if let Some(fault) = body.get("Fault") {
        return Ok(Message::Fault(Fault::from_value(fault)));
    }

    let payload = match body {
        Value::Object(children) => children
            .iter()
            .find(|(key, _)| key.as_str() != xml::ATTRIBUTES_KEY)
            .map(|(_, payload)| payload.clone())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    };

    Ok(Message::Body(payload))
}

impl Client {
    pub fn new<I>(transport: Arc<dyn Transport>, endpoint: Url, operations: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            transport,
            endpoint,
            operations: operations.into_iter().collect(),
            credentials: None,
        }
    }

    pub fn set_security(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn set_endpoint(&mut self, endpoint: Url) {
        self.endpoint = endpoint;
    }

    pub fn has_operation(&self, operation: &str) -> bool {
        self.operations.contains(operation)
    }

    /// Serializes `message` as the body of `operation` and sends it.
    pub async fn call(
        &self,
        operation: &str,
        message: &Value,
        namespace: &Namespace,
        headers: &[(String, String)],
    ) -> Result<Reply, Error> {
        if !self.has_operation(operation) {
            return Err(Error::UnknownOperation(operation.to_owned()));
        }

        let name = namespace.qualify(operation);
        let envelope = Envelope::new(namespace.clone(), Element::new(name, message));

        let response = self.request(envelope.to_request()?, headers).await?;

        match parse_envelope(&response.body) {
            Ok(message) => Ok(Reply {
                status: response.status,
                message,
            }),

            Err(Error::Xml(_) | Error::EmptyDocument | Error::NotAnEnvelope) => {
                Err(Error::UnexpectedResponse {
                    status: response.status,
                    body: response.text().into_owned(),
                })
            }

            Err(err) => Err(err),
        }
    }

    /// Sends an already serialized envelope.
    pub async fn request(
        &self,
        xml: Vec<u8>,
        headers: &[(String, String)],
    ) -> Result<Response, Error> {
        let mut request = Request::post(self.endpoint.clone(), xml)
            .header("Content-Type", "text/xml; charset=utf-8")
            .basic_auth(self.credentials.clone());

        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(endpoint = %self.endpoint, "posting SOAP request");
        self.transport.send(request).await
    }
}
