//! Client for the Cisco Unified CM AXL SOAP interface.
//!
//! Request templates are derived from the versioned AXL schema at call time,
//! so any operation in the schema can be listed, templated and executed
//! without generated bindings.

pub mod auth;
pub mod config;
pub mod dispatch;
mod error;
pub mod sanitize;
mod schema;
pub mod service;
pub mod tags;

#[cfg(test)]
mod testing;

pub use axl_util::{soap::Fault, Credentials, HttpTransport, Request, Response, Transport};
pub use config::ServiceConfig;
pub use dispatch::ExecuteOptions;
pub use error::{Error, Result};
pub use service::AxlService;
pub use tags::Tags;
