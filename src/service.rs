use axl_util::{soap::Client, HttpTransport, Transport};
use serde_json::Value;
use std::{cmp::Ordering, future::Future, sync::Arc};
use tracing::{debug, instrument::WithSubscriber, Dispatch};

use crate::{
    auth::Prober,
    config::ServiceConfig,
    dispatch::{Dispatcher, ExecuteOptions},
    schema, tags, Error, Result, Tags,
};

/// AXL client for one CUCM host.
///
/// Every call loads the versioned schema again and builds its own SOAP
/// client; only the configuration is shared between calls.
pub struct AxlService {
    config: ServiceConfig,
    transport: Arc<dyn Transport>,
    logger: Option<Dispatch>,
}

impl AxlService {
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_transport(
            config,
            Arc::new(HttpTransport::new().accept_invalid_certs(true)),
        )
    }

    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            logger: None,
        }
    }

    /// Runs every call under `logger` instead of the caller's default dispatcher.
    pub fn with_logger(mut self, logger: impl Into<Dispatch>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn scoped<F: Future>(&self, future: F) -> F::Output {
        match &self.logger {
            Some(logger) => future.with_subscriber(logger.clone()).await,
            None => future.await,
        }
    }

    fn prober(&self) -> Prober<'_> {
        Prober::new(
            self.transport.as_ref(),
            self.config.endpoint(),
            self.config.credentials(),
        )
    }

    /// Operation names containing `filter` (case-insensitive), naturally sorted.
    pub async fn return_operations(&self, filter: Option<&str>) -> Result<Vec<String>> {
        self.scoped(async {
            let definition = schema::load(self.config.schema_location()).await?;
            let filter = filter.map(str::to_lowercase);

            let mut names: Vec<String> = definition
                .operation_names()
                .into_iter()
                .filter(|name| match &filter {
                    Some(filter) => name.to_lowercase().contains(filter.as_str()),
                    None => true,
                })
                .collect();

            names.sort_by(|a, b| natural_cmp(a, b));
            debug!(count = names.len(), ?filter, "listed operations");

            Ok(names)
        })
        .await
    }

    pub async fn get_operation_tags(&self, operation: &str) -> Result<Tags> {
        self.scoped(async {
            let definition = schema::load(self.config.schema_location()).await?;
            let description = schema::describe(&definition, operation)?;

            tags::operation_tags(&description)
        })
        .await
    }

    /// `Ok(true)` when the endpoint accepts the credentials, else an auth error.
    pub async fn test_authentication(&self) -> Result<bool> {
        self.scoped(async {
            if self.prober().probe().await {
                Ok(true)
            } else {
                Err(Error::auth())
            }
        })
        .await
    }

    pub async fn execute_operation(
        &self,
        operation: &str,
        tags: Tags,
        options: &ExecuteOptions,
    ) -> Result<Value> {
        self.scoped(async move {
            if !self.prober().probe().await {
                debug!(operation, "skipping operation after failed authentication");
                return Err(Error::auth());
            }

            let definition = schema::load(self.config.schema_location()).await?;
            let output = definition
                .describe_operation(operation)?
                .map(|description| description.output)
                .unwrap_or_default();

            let mut client = Client::new(
                self.transport.clone(),
                self.config.endpoint().clone(),
                definition.operation_names(),
            );
            client.set_security(self.config.credentials().clone());

            Dispatcher::new(&client, &self.config, &output)
                .execute(operation, tags, options)
                .await
        })
        .await
    }
}

fn is_digit_run(chunk: &str) -> bool {
    chunk.starts_with(|c: char| c.is_ascii_digit())
}

fn chunks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;

    std::iter::from_fn(move || {
        let digits = is_digit_run(rest);
        let first = rest.chars().next()?;
        let end = rest[first.len_utf8()..]
            .find(|c: char| c.is_ascii_digit() != digits)
            .map_or(rest.len(), |index| index + first.len_utf8());

        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn compare_chunks(a: &str, b: &str) -> Ordering {
    match (is_digit_run(a), is_digit_run(b)) {
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }

        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Orders digit runs by value and text runs case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match compare_chunks(x, y) {
                Ordering::Equal => continue,
                unequal => return unequal,
            },

            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return a.cmp(b),
        }
    }
}
