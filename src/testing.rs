//! Shared helpers for unit tests.

use async_trait::async_trait;
use axl_util::{Request, Response, Transport};
use axl_wsdl::types::Definition;
use std::{collections::VecDeque, path::PathBuf, sync::Mutex};

use crate::ServiceConfig;

pub const BANNER_PAGE: &str =
    "<html><head><title>Cisco CallManager: AXL Web Service</title></head>\
     <body><h1>Cisco CallManager: AXL Web Service</h1>\
     <p>The AXL Web Service is working and accepting requests.</p></body></html>";

pub fn schema_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/schema")
}

pub fn config() -> ServiceConfig {
    ServiceConfig::new("cucm.example.com", "admin", "secret", "14.0")
        .unwrap()
        .with_schema_dir(schema_dir())
}

pub fn definition() -> Definition {
    axl_wsdl::parse_path(config().schema_location()).unwrap()
}

pub fn envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Body>{}</soapenv:Body></soapenv:Envelope>",
        body
    )
}

pub fn fault(message: &str) -> String {
    envelope(&format!(
        "<soapenv:Fault><faultcode>soapenv:Client</faultcode>\
         <faultstring>{}</faultstring><detail/></soapenv:Fault>",
        message
    ))
}

/// Replies with canned responses in order and records every request.
/// Fails like an unreachable host once the script runs out.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Response, axl_util::Error>>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<Response, axl_util::Error>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> Result<Response, axl_util::Error> {
        self.requests.lock().unwrap().push(request);

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(axl_util::Error::Transport("connection refused".into())))
    }
}
