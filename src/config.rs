use axl_util::{soap::Namespace, Credentials};
use std::path::{Path, PathBuf};
use url::Url;

use crate::{Error, Result};

pub const AXL_PORT: u16 = 8443;
pub const DEFAULT_SCHEMA_DIR: &str = "schema";
pub const SCHEMA_FILE: &str = "AXLAPI.wsdl";
pub const NAMESPACE_PREFIX: &str = "ns";

/// Connection settings for one AXL service. Fixed once built.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    host: String,
    credentials: Credentials,
    version: String,
    endpoint: Url,
    schema_dir: PathBuf,
}

fn required(field: &'static str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(Error::Config(field))
    } else {
        Ok(value)
    }
}

impl ServiceConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let host = required("host", host.into())?;
        let username = required("username", username.into())?;
        let password = required("password", password.into())?;
        let version = required("version", version.into())?;

        let endpoint = Url::parse(&format!("https://{}:{}/axl/", host, AXL_PORT))
            .map_err(|_| Error::Config("host"))?;

        Ok(Self {
            host,
            credentials: Credentials::new(username, password),
            version,
            endpoint,
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
        })
    }

    /// Directory holding one `{version}/AXLAPI.wsdl` tree per schema version.
    pub fn with_schema_dir(mut self, schema_dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = schema_dir.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    pub fn schema_location(&self) -> PathBuf {
        self.schema_dir.join(&self.version).join(SCHEMA_FILE)
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(
            NAMESPACE_PREFIX,
            format!("http://www.cisco.com/AXL/API/{}", self.version),
        )
    }

    pub fn soap_action(&self, operation: &str) -> String {
        format!("\"CUCM:DB ver={} {}\"", self.version, operation)
    }
}
