use axl_util::{Credentials, Request, Transport};
use tracing::{debug, warn};
use url::Url;

use crate::error::is_auth_status;

/// Served on the AXL endpoint to an authenticated GET.
pub const SUCCESS_BANNER: &str = "Cisco CallManager: AXL Web Service";

pub const FAILURE_PHRASES: [&str; 3] = ["Authentication failed", "401 Unauthorized", "403 Forbidden"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Accepted,
    Rejected,
    Inconclusive,
}

impl ProbeOutcome {
    pub fn is_accepted(self) -> bool {
        self == ProbeOutcome::Accepted
    }
}

pub fn classify(status: u16, body: &str) -> ProbeOutcome {
    if is_auth_status(status) {
        ProbeOutcome::Rejected
    } else if body.contains(SUCCESS_BANNER) {
        ProbeOutcome::Accepted
    } else if FAILURE_PHRASES.iter().any(|phrase| body.contains(phrase)) {
        ProbeOutcome::Rejected
    } else {
        ProbeOutcome::Inconclusive
    }
}

/// Credential check against the AXL endpoint.
pub struct Prober<'a> {
    transport: &'a dyn Transport,
    endpoint: &'a Url,
    credentials: &'a Credentials,
}

impl<'a> Prober<'a> {
    pub fn new(transport: &'a dyn Transport, endpoint: &'a Url, credentials: &'a Credentials) -> Self {
        Self {
            transport,
            endpoint,
            credentials,
        }
    }

    /// True only when the endpoint answered with the service banner.
    pub async fn probe(&self) -> bool {
        let request = Request::get(self.endpoint.clone())
            .header("Connection", "keep-alive")
            .basic_auth(Some(self.credentials.clone()));

        debug!(endpoint = %self.endpoint, "testing authentication");

        match self.transport.send(request).await {
            Ok(response) => {
                let outcome = classify(response.status, &response.text());
                debug!(status = response.status, ?outcome, "authentication probe finished");
                outcome.is_accepted()
            }

            Err(err) => {
                warn!(error = %err, "authentication probe could not reach the endpoint");
                false
            }
        }
    }
}
