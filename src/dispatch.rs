//! Operation execution.
//!
//! Operations the schema binds go through [`Client::call`]. `apply*` and
//! `reset*` actions the client does not know are sent as a bare envelope
//! carrying only their `uuid` or `name`.

use axl_util::{
    soap::{Client, Envelope, Message},
    xml::Element,
};
use axl_wsdl::ElementDescription;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::{
    auth::FAILURE_PHRASES,
    config::ServiceConfig,
    error::is_auth_status,
    sanitize,
    tags::Tags,
    Error, Fault, Result,
};

pub const DEFAULT_AUX_DATA_SUFFIX: &str = "_data";

const RETURN_KEY: &str = "return";
const FAULT_MARKER: &str = "Fault";
const FAULT_PATTERN: &str = "<faultstring>(.*?)</faultstring>";
const UNKNOWN_FAULT: &str = "Unknown SOAP fault occurred";
const ACTION_PREFIXES: [&str; 2] = ["apply", "reset"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// Prune `null` and empty containers from the result.
    pub clean: bool,
    /// Strip attribute-marked containers from the result.
    pub remove_attributes: bool,
    /// Top-level tags ending with this are never sent. Empty disables.
    #[serde(alias = "dataContainerIdentifierTails")]
    pub aux_data_suffix: String,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            clean: false,
            remove_attributes: false,
            aux_data_suffix: DEFAULT_AUX_DATA_SUFFIX.to_owned(),
        }
    }
}

impl ExecuteOptions {
    pub fn is_auxiliary(&self, tag: &str) -> bool {
        !self.aux_data_suffix.is_empty() && tag.ends_with(&self.aux_data_suffix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The client binds the operation.
    Direct,
    /// Unbound `apply*`/`reset*` action sent as a raw envelope.
    RawAction,
}

impl Dispatch {
    pub fn resolve(client: &Client, operation: &str) -> Result<Self> {
        if client.has_operation(operation) {
            Ok(Dispatch::Direct)
        } else if is_action(operation) {
            Ok(Dispatch::RawAction)
        } else {
            Err(Error::OperationNotFound(operation.to_owned()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Uuid(String),
    Name(String),
}

impl Identifier {
    pub fn tag(&self) -> &'static str {
        match self {
            Identifier::Uuid(_) => "uuid",
            Identifier::Name(_) => "name",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Identifier::Uuid(value) | Identifier::Name(value) => value,
        }
    }

    pub fn into_message(self) -> Tags {
        let mut message = Tags::new();
        message.insert(self.tag().to_owned(), Value::String(self.value().to_owned()));
        message
    }
}

pub fn is_action(operation: &str) -> bool {
    ACTION_PREFIXES
        .iter()
        .any(|prefix| operation.starts_with(prefix))
}

/// Drops unset (`""`) and auxiliary top-level tags.
pub fn prepare(tags: Tags, options: &ExecuteOptions) -> Tags {
    tags.into_iter()
        .filter(|(tag, value)| {
            let keep = value.as_str() != Some("") && !options.is_auxiliary(tag);

            if !keep {
                trace!(%tag, "dropping tag");
            }

            keep
        })
        .collect()
}

fn text(source: &Tags, key: &str) -> Option<String> {
    source
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn identifier_in(source: &Tags) -> Option<Identifier> {
    text(source, "uuid")
        .map(Identifier::Uuid)
        .or_else(|| text(source, "name").map(Identifier::Name))
}

fn nested<'a>(operation: &str, payload: &'a Tags) -> Option<&'a Tags> {
    match payload.get(operation) {
        Some(Value::Object(nested)) => Some(nested),
        _ => None,
    }
}

/// The `uuid`, else the `name`, of an action; nested under the operation
/// name first, then at the top level. Falls back to an empty name.
pub fn identifier(operation: &str, payload: &Tags) -> Identifier {
    nested(operation, payload)
        .and_then(identifier_in)
        .or_else(|| identifier_in(payload))
        .unwrap_or_else(|| Identifier::Name(String::new()))
}

/// Flattens `{applyX: {uuid | name}}` to the bare identifier for bound actions.
pub fn action_message(operation: &str, payload: Tags) -> Tags {
    if is_action(operation) && nested(operation, &payload).is_some() {
        identifier(operation, &payload).into_message()
    } else {
        payload
    }
}

/// Wraps single occurrences of repeating elements into sequences.
pub fn shape(value: &mut Value, elements: &[ElementDescription]) {
    let map = match value {
        Value::Object(map) => map,
        _ => return,
    };

    for element in elements {
        let child = match map.get_mut(&element.name) {
            Some(child) => child,
            None => continue,
        };

        if element.is_many() && !child.is_array() && !child.is_null() {
            let single = child.take();
            *child = Value::Array(vec![single]);
        }

        match child {
            Value::Array(items) => {
                for item in items {
                    shape(item, &element.elements);
                }
            }

            other => shape(other, &element.elements),
        }
    }
}

fn masked(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if key == "password" {
                        Value::String("********".into())
                    } else {
                        masked(value)
                    };

                    (key.clone(), value)
                })
                .collect(),
        ),

        Value::Array(items) => Value::Array(items.iter().map(masked).collect()),

        other => other.clone(),
    }
}

fn success() -> Value {
    json!({ "return": "Success" })
}

fn finish(body: Value, options: &ExecuteOptions) -> Value {
    let mut output = match body {
        Value::Object(mut map) => match map.remove(RETURN_KEY) {
            Some(output) => output,
            None => return success(),
        },

        _ => return success(),
    };

    if options.clean {
        sanitize::prune(&mut output);
    }

    if options.remove_attributes {
        sanitize::strip_attributes(&mut output);
    }

    output
}

fn raw_fault(body: &str) -> Error {
    let string = Regex::new(FAULT_PATTERN)
        .ok()
        .and_then(|pattern| {
            pattern
                .captures(body)
                .and_then(|captures| captures.get(1))
                .map(|found| found.as_str().to_owned())
        })
        .filter(|string| !string.is_empty());

    match string {
        Some(string) => Error::from_fault(Fault::new(string)),
        None => Error::RemoteFault(Fault::new(UNKNOWN_FAULT)),
    }
}

pub(crate) struct Dispatcher<'a> {
    client: &'a Client,
    config: &'a ServiceConfig,
    output: &'a [ElementDescription],
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(
        client: &'a Client,
        config: &'a ServiceConfig,
        output: &'a [ElementDescription],
    ) -> Self {
        Self {
            client,
            config,
            output,
        }
    }

    fn headers(&self, operation: &str) -> Vec<(String, String)> {
        vec![
            ("SOAPAction".to_owned(), self.config.soap_action(operation)),
            ("Connection".to_owned(), "keep-alive".to_owned()),
        ]
    }

    pub(crate) async fn execute(
        &self,
        operation: &str,
        tags: Tags,
        options: &ExecuteOptions,
    ) -> Result<Value> {
        let payload = prepare(tags, options);

        match Dispatch::resolve(self.client, operation)? {
            Dispatch::Direct => self.direct(operation, payload, options).await,
            Dispatch::RawAction => self.raw_action(operation, &payload).await,
        }
    }

    async fn direct(&self, operation: &str, payload: Tags, options: &ExecuteOptions) -> Result<Value> {
        let message = Value::Object(action_message(operation, payload));
        debug!(operation, message = %masked(&message), "executing operation");

        let reply = self
            .client
            .call(
                operation,
                &message,
                &self.config.namespace(),
                &self.headers(operation),
            )
            .await
            .map_err(Error::from_transport)?;

        if is_auth_status(reply.status) {
            return Err(Error::auth());
        }

        match reply.message {
            Message::Fault(fault) => {
                debug!(operation, %fault, "operation returned a fault");
                Err(Error::from_fault(fault))
            }

            Message::Body(mut body) => {
                shape(&mut body, self.output);
                Ok(finish(body, options))
            }
        }
    }

    async fn raw_action(&self, operation: &str, payload: &Tags) -> Result<Value> {
        let identifier = identifier(operation, payload);
        debug!(operation, tag = identifier.tag(), "sending raw action envelope");

        let namespace = self.config.namespace();
        let message = Value::Object(identifier.into_message());
        let xml = Envelope::new(
            namespace.clone(),
            Element::new(namespace.qualify(operation), &message),
        )
        .to_request()
        .map_err(Error::from_transport)?;

        let response = self
            .client
            .request(xml, &self.headers(operation))
            .await
            .map_err(Error::from_transport)?;

        if is_auth_status(response.status) {
            return Err(Error::auth());
        }

        let body = response.text();

        if FAILURE_PHRASES.iter().any(|phrase| body.contains(phrase)) {
            return Err(Error::auth());
        }

        if body.contains(FAULT_MARKER) {
            return Err(raw_fault(&body));
        }

        Ok(success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ScriptedTransport};
    use axl_util::{Request, Response};
    use std::sync::Arc;

    fn tags(value: Value) -> Tags {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    async fn run(
        operation: &str,
        payload: Value,
        options: ExecuteOptions,
        replies: Vec<std::result::Result<Response, axl_util::Error>>,
    ) -> (Result<Value>, Vec<Request>) {
        let config = testing::config();
        let definition = testing::definition();
        let transport = Arc::new(ScriptedTransport::new(replies));

        let mut client = Client::new(
            transport.clone(),
            config.endpoint().clone(),
            definition.operation_names(),
        );
        client.set_security(config.credentials().clone());

        let output = definition
            .describe_operation(operation)
            .unwrap()
            .map(|description| description.output)
            .unwrap_or_default();

        let result = Dispatcher::new(&client, &config, &output)
            .execute(operation, tags(payload), &options)
            .await;

        (result, transport.requests())
    }

    #[test]
    fn test_prepare_drops_unset_and_auxiliary_tags() {
        let prepared = prepare(
            tags(json!({
                "name": "SEP001122334455",
                "description": "",
                "lines_data": {"line": "x"},
                "returnedTags": {"name": ""}
            })),
            &ExecuteOptions::default(),
        );

        assert_eq!(
            Value::Object(prepared),
            json!({"name": "SEP001122334455", "returnedTags": {"name": ""}})
        );
    }

    #[test]
    fn test_empty_suffix_disables_auxiliary_rule() {
        let options = ExecuteOptions {
            aux_data_suffix: String::new(),
            ..Default::default()
        };

        let prepared = prepare(tags(json!({"lines_data": "kept"})), &options);
        assert!(prepared.contains_key("lines_data"));
    }

    #[test]
    fn test_options_deserialize() {
        let options: ExecuteOptions = serde_json::from_value(json!({"clean": true})).unwrap();
        assert_eq!(
            options,
            ExecuteOptions {
                clean: true,
                ..Default::default()
            }
        );

        let options: ExecuteOptions = serde_json::from_value(
            json!({"removeAttributes": true, "dataContainerIdentifierTails": "_tpl"}),
        )
        .unwrap();
        assert!(options.remove_attributes);
        assert_eq!(options.aux_data_suffix, "_tpl");
    }

    #[test]
    fn test_identifier_priority() {
        let payload = tags(json!({"resetPhone": {"name": "SEPAAAA", "uuid": "{1}"}}));
        assert_eq!(
            identifier("resetPhone", &payload),
            Identifier::Uuid("{1}".into())
        );

        let payload = tags(json!({"resetPhone": {"name": "SEPAAAA", "uuid": ""}}));
        assert_eq!(
            identifier("resetPhone", &payload),
            Identifier::Name("SEPAAAA".into())
        );

        let payload = tags(json!({"resetPhone": {}, "uuid": "{2}"}));
        assert_eq!(
            identifier("resetPhone", &payload),
            Identifier::Uuid("{2}".into())
        );

        assert_eq!(
            identifier("resetPhone", &Tags::new()),
            Identifier::Name(String::new())
        );
    }

    #[test]
    fn test_action_message_flattens_nested_payload() {
        let payload = tags(json!({"applyLine": {"uuid": "{3}", "pattern": "1000"}}));
        assert_eq!(
            Value::Object(action_message("applyLine", payload)),
            json!({"uuid": "{3}"})
        );

        let payload = tags(json!({"pattern": "1000"}));
        assert_eq!(
            Value::Object(action_message("applyLine", payload.clone())),
            Value::Object(payload)
        );

        let payload = tags(json!({"getPhone": {"uuid": "{3}"}}));
        assert_eq!(
            Value::Object(action_message("getPhone", payload.clone())),
            Value::Object(payload)
        );
    }

    #[test]
    fn test_shape_wraps_single_occurrences() {
        let output = testing::definition()
            .describe_operation("listRoutePartition")
            .unwrap()
            .unwrap()
            .output;

        let mut body = json!({"return": {"routePartition": {"name": "PT-1"}}});
        shape(&mut body, &output);
        assert_eq!(body, json!({"return": {"routePartition": [{"name": "PT-1"}]}}));

        let mut body = json!({"return": null});
        shape(&mut body, &output);
        assert_eq!(body, json!({"return": null}));
    }

    #[test]
    fn test_masked_hides_passwords() {
        let message = json!({"user": {"userid": "jdoe", "password": "hunter2"}});
        assert_eq!(
            masked(&message),
            json!({"user": {"userid": "jdoe", "password": "********"}})
        );
    }

    #[tokio::test]
    async fn test_direct_returns_return_value() {
        let reply = testing::envelope(
            "<ns:addRoutePartitionResponse xmlns:ns=\"http://www.cisco.com/AXL/API/14.0\">\
             <return>{9C6B2E4A-1111-2222-3333-444455556666}</return>\
             </ns:addRoutePartitionResponse>",
        );

        let (result, requests) = run(
            "addRoutePartition",
            json!({"routePartition": {"name": "TEST-PT", "description": "d"}}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(200, reply))],
        )
        .await;

        assert_eq!(
            result.unwrap(),
            json!("{9C6B2E4A-1111-2222-3333-444455556666}")
        );

        let request = &requests[0];
        let body = request.body_text();

        assert_eq!(
            request.header_value("SOAPAction"),
            Some("\"CUCM:DB ver=14.0 addRoutePartition\"")
        );
        assert_eq!(request.header_value("Connection"), Some("keep-alive"));
        assert!(body.contains("xmlns:ns=\"http://www.cisco.com/AXL/API/14.0\""));
        assert!(body.contains(
            "<ns:addRoutePartition><routePartition><name>TEST-PT</name>\
             <description>d</description></routePartition></ns:addRoutePartition>"
        ));
    }

    #[tokio::test]
    async fn test_direct_cleans_result() {
        let reply = testing::envelope(
            "<ns:getPhoneResponse><return><phone uuid=\"{1}\">\
             <name>SEP001122334455</name><description/>\
             <lines><line uuid=\"{2}\"><index>1</index></line></lines>\
             </phone></return></ns:getPhoneResponse>",
        );

        let (result, _) = run(
            "getPhone",
            json!({"name": "SEP001122334455", "uuid": "", "returnedTags": {"name": ""}}),
            ExecuteOptions {
                clean: true,
                ..Default::default()
            },
            vec![Ok(Response::new(200, reply))],
        )
        .await;

        assert_eq!(
            result.unwrap(),
            json!({
                "phone": {
                    "name": "SEP001122334455",
                    "lines": {"line": [{"index": "1", "attributes": {"uuid": "{2}"}}]},
                    "attributes": {"uuid": "{1}"}
                }
            })
        );
    }

    #[tokio::test]
    async fn test_direct_removes_attributes() {
        let reply = testing::envelope(
            "<ns:getPhoneResponse><return><phone uuid=\"{1}\">\
             <name>SEP001122334455</name>\
             </phone></return></ns:getPhoneResponse>",
        );

        let (result, _) = run(
            "getPhone",
            json!({"name": "SEP001122334455"}),
            ExecuteOptions {
                remove_attributes: true,
                ..Default::default()
            },
            vec![Ok(Response::new(200, reply))],
        )
        .await;

        assert_eq!(result.unwrap(), json!({"phone": {"name": "SEP001122334455"}}));
    }

    #[tokio::test]
    async fn test_direct_without_return_is_success() {
        let reply = testing::envelope("<ns:addPhoneResponse/>");

        let (result, _) = run(
            "addPhone",
            json!({"phone": {"name": "SEP001122334455"}}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(200, reply))],
        )
        .await;

        assert_eq!(result.unwrap(), json!({"return": "Success"}));
    }

    #[tokio::test]
    async fn test_direct_faults() {
        let (result, _) = run(
            "addRoutePartition",
            json!({"routePartition": {"name": "TEST-PT"}}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(
                500,
                testing::fault("Could not insert new row - duplicate value in a UNIQUE INDEX column"),
            ))],
        )
        .await;

        match result {
            Err(Error::RemoteFault(fault)) => {
                assert_eq!(fault.code.as_deref(), Some("soapenv:Client"));
                assert!(fault.string.contains("duplicate value"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let (result, _) = run(
            "addRoutePartition",
            json!({"routePartition": {"name": "TEST-PT"}}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(500, testing::fault("Invalid credentials supplied")))],
        )
        .await;

        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_direct_unauthorized_html() {
        let (result, _) = run(
            "getPhone",
            json!({"name": "SEP1"}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(401, "<html>401 Unauthorized</html>"))],
        )
        .await;

        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_raw_action_for_unbound_reset() {
        let (result, requests) = run(
            "resetPhone",
            json!({"resetPhone": {"name": "SEPAAAA"}}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(
                200,
                testing::envelope("<ns:resetPhoneResponse><return>{1}</return></ns:resetPhoneResponse>"),
            ))],
        )
        .await;

        assert_eq!(result.unwrap(), json!({"return": "Success"}));

        let body = requests[0].body_text();
        assert!(body.contains("<ns:resetPhone><name>SEPAAAA</name></ns:resetPhone>"));
        assert_eq!(
            requests[0].header_value("SOAPAction"),
            Some("\"CUCM:DB ver=14.0 resetPhone\"")
        );
    }

    #[tokio::test]
    async fn test_raw_action_fault_text() {
        let (result, _) = run(
            "resetPhone",
            json!({"uuid": "{ABC}"}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(
                500,
                "<soapenv:Fault><faultstring>Device not found</faultstring></soapenv:Fault>",
            ))],
        )
        .await;

        assert!(matches!(result, Err(Error::RemoteFault(fault)) if fault.string == "Device not found"));

        let (result, _) = run(
            "resetPhone",
            json!({"uuid": "{ABC}"}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(500, "<Fault/>"))],
        )
        .await;

        assert!(matches!(result, Err(Error::RemoteFault(fault)) if fault.string == UNKNOWN_FAULT));

        let (result, _) = run(
            "applyPhone",
            json!({"name": "SEP1"}),
            ExecuteOptions::default(),
            vec![Ok(Response::new(
                500,
                "<Fault><faultstring>User not authorized</faultstring></Fault>",
            ))],
        )
        .await;

        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_unroutable_operation() {
        let (result, requests) = run(
            "doThing",
            json!({"name": "x"}),
            ExecuteOptions::default(),
            vec![],
        )
        .await;

        assert!(matches!(result, Err(Error::OperationNotFound(name)) if name == "doThing"));
        assert!(requests.is_empty());
    }
}
