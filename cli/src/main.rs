use std::{fs, path::PathBuf};

use serde_json::Value;
use structopt::StructOpt;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use axl::{AxlService, ExecuteOptions, ServiceConfig};

#[derive(Debug, Error)]
enum Error {
    #[error("AXL request failed")]
    Axl(#[from] axl::Error),

    #[error("Error")]
    IoError(#[from] std::io::Error),

    #[error("Error reading JSON")]
    JsonError(#[from] serde_json::Error),

    #[error("tags file must hold a JSON object")]
    NotAnObject,
}

#[derive(StructOpt)]
#[structopt(name = "axl", about = "Cisco Unified CM AXL client")]
struct Args {
    #[structopt(long, env = "CUCM_HOSTNAME")]
    host: String,

    #[structopt(long, env = "CUCM_USERNAME")]
    username: String,

    #[structopt(long, env = "CUCM_PASSWORD", hide_env_values = true)]
    password: String,

    #[structopt(long, env = "CUCM_VERSION")]
    version: String,

    /// Directory holding one `{version}/AXLAPI.wsdl` tree per schema version
    #[structopt(long, default_value = "schema", parse(from_os_str))]
    schema_dir: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[structopt(short, long)]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// List operations, optionally filtered by a case-insensitive substring
    Operations { filter: Option<String> },

    /// Print the request template for an operation
    Tags { operation: String },

    /// Check the credentials against the AXL endpoint
    Auth,

    /// Execute an operation with tags read from a JSON file
    Execute {
        operation: String,

        #[structopt(long, parse(from_os_str))]
        tags: PathBuf,

        #[structopt(long)]
        clean: bool,

        #[structopt(long)]
        remove_attributes: bool,

        #[structopt(long, default_value = "_data")]
        aux_data_suffix: String,
    },
}

fn filter(verbose: bool) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("axl=debug,axl_util=debug,axl_wsdl=debug"),
        Err(_) => EnvFilter::new("warn"),
    }
}

fn print(value: &Value) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(service: AxlService, command: Command) -> Result<(), Error> {
    match command {
        Command::Operations { filter } => {
            for name in service.return_operations(filter.as_deref()).await? {
                println!("{}", name);
            }
        }

        Command::Tags { operation } => {
            let tags = service.get_operation_tags(&operation).await?;
            print(&Value::Object(tags))?;
        }

        Command::Auth => {
            print(&Value::Bool(service.test_authentication().await?))?;
        }

        Command::Execute {
            operation,
            tags,
            clean,
            remove_attributes,
            aux_data_suffix,
        } => {
            let tags = match serde_json::from_str::<Value>(&fs::read_to_string(tags)?)? {
                Value::Object(tags) => tags,
                _ => return Err(Error::NotAnObject),
            };

            let options = ExecuteOptions {
                clean,
                remove_attributes,
                aux_data_suffix,
            };

            print(&service.execute_operation(&operation, tags, &options).await?)?;
        }
    }

    Ok(())
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    let config = ServiceConfig::new(args.host, args.username, args.password, args.version)?
        .with_schema_dir(args.schema_dir);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(args.verbose))
        .with_writer(std::io::stderr)
        .finish();

    let service = AxlService::new(config).with_logger(subscriber);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(service, args.command))
}
