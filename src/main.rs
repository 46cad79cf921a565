//! openapi-from-proto - command-line tool that turns annotated protobuf
//! services into an OpenAPI 3.0 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-proto [OPTIONS] [OUTPUT]
//! ```
//!
//! # Examples
//!
//! Generate YAML from a single proto file:
//! ```bash
//! openapi-from-proto openapi.yaml --title "Users API" -p users.proto
//! ```
//!
//! Generate JSON from every proto under a directory:
//! ```bash
//! openapi-from-proto openapi.json -f json -p ./protos
//! ```
//!
//! Use a descriptor set compiled elsewhere, with verbose logging:
//! ```bash
//! openapi-from-proto --descriptor-set api.pb -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_proto::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-proto starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
