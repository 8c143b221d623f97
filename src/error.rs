use axl_util::soap::Fault;
use serde_json::Value;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Text that marks a reply as a credential rejection.
const AUTH_SIGNATURES: [&str; 5] = [
    "Authentication failed",
    "credentials",
    "authorize",
    "401 Unauthorized",
    "403 Forbidden",
];

pub(crate) const AUTH_FAILED: &str = "Authentication failed. Check username and password.";

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing or invalid parameter: {0}")]
    Config(&'static str),

    #[error("error loading schema")]
    SchemaIo(#[from] axl_wsdl::error::Error),

    #[error("operation {0} is not defined in the schema")]
    SchemaLookup(String),

    #[error("{0}")]
    Auth(String),

    #[error("operation {0} not found")]
    OperationNotFound(String),

    #[error("remote fault: {0}")]
    RemoteFault(Fault),

    #[error("transport error")]
    Transport(#[source] axl_util::Error),
}

pub(crate) fn is_auth_text(text: &str) -> bool {
    AUTH_SIGNATURES.iter().any(|signature| text.contains(signature))
}

pub(crate) fn is_auth_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

impl Error {
    pub(crate) fn auth() -> Self {
        Error::Auth(AUTH_FAILED.to_owned())
    }

    pub(crate) fn from_fault(fault: Fault) -> Self {
        if is_auth_text(&fault.string) {
            Error::auth()
        } else {
            Error::RemoteFault(fault)
        }
    }

    pub(crate) fn from_transport(err: axl_util::Error) -> Self {
        match err {
            axl_util::Error::UnexpectedResponse { status, .. } if is_auth_status(status) => {
                Error::auth()
            }

            axl_util::Error::UnexpectedResponse { status, body } => {
                if is_auth_text(&body) {
                    return Error::auth();
                }

                Error::RemoteFault(Fault {
                    code: Some(status.to_string()),
                    string: format!("unexpected response with HTTP status {}", status),
                    detail: (!body.is_empty()).then(|| Value::String(body)),
                })
            }

            axl_util::Error::UnknownOperation(operation) => Error::OperationNotFound(operation),

            err => Error::Transport(err),
        }
    }
}
