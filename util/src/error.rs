use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("Error parsing XML")]
    Xml(#[from] quick_xml::Error),

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("Document is not a SOAP envelope")]
    NotAnEnvelope,

    #[error("Unexpected response with status {status}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("Operation {0} is not part of this client")]
    UnknownOperation(String),

    #[error("Transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
