mod error;

pub mod soap;
pub mod transport;
pub mod xml;

pub use error::Error;
pub use transport::{Credentials, HttpTransport, Method, Request, Response, Transport};
