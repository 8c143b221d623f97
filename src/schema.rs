use axl_wsdl::{error::Error as WsdlError, types::Definition, OperationDescription};
use std::{io, path::PathBuf};
use tracing::{debug, dispatcher};

use crate::{Error, Result};

/// Parses the schema on the blocking pool, under the caller's dispatcher.
pub(crate) async fn load(location: PathBuf) -> Result<Definition> {
    let dispatch = dispatcher::get_default(|current| current.clone());

    let task = tokio::task::spawn_blocking(move || {
        dispatcher::with_default(&dispatch, || {
            debug!(location = %location.display(), "loading schema");
            axl_wsdl::parse_path(&location)
        })
    });

    match task.await {
        Ok(definition) => Ok(definition?),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(Error::SchemaIo(WsdlError::Io(io::Error::new(
            io::ErrorKind::Other,
            err,
        )))),
    }
}

pub(crate) fn describe(definition: &Definition, operation: &str) -> Result<OperationDescription> {
    definition
        .describe_operation(operation)?
        .ok_or_else(|| Error::SchemaLookup(operation.to_owned()))
}
