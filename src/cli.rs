use crate::loader::{compile_protos, read_descriptor_set, to_proto_set};
use crate::openapi_builder::{generate_document, Info};
use crate::scanner::ProtoScanner;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Generate an OpenAPI document from HTTP annotations in protobuf service comments
#[derive(Parser, Debug)]
#[command(name = "openapi-from-proto")]
#[command(author, about, long_about = None)]
pub struct CliArgs {
    /// Output file path (if not specified, outputs to stdout)
    #[arg(value_name = "OUTPUT")]
    pub output_path: Option<PathBuf>,

    /// API title written to the info section
    #[arg(long, default_value = "Generated API")]
    pub title: String,

    /// API version written to the info section
    #[arg(long = "version", value_name = "VERSION", default_value = "1.0.0")]
    pub api_version: String,

    /// API description written to the info section
    #[arg(long)]
    pub description: Option<String>,

    /// Proto file, or directory searched recursively for proto files
    #[arg(short = 'p', long = "proto", value_name = "PATH")]
    pub protos: Vec<PathBuf>,

    /// Additional import directory passed to protoc
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub includes: Vec<PathBuf>,

    /// Read a compiled FileDescriptorSet instead of running protoc
    #[arg(long = "descriptor-set", value_name = "FILE", conflicts_with = "protos")]
    pub descriptor_set: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if args.protos.is_empty() && args.descriptor_set.is_none() {
        anyhow::bail!("No input given: pass at least one --proto or a --descriptor-set");
    }

    for path in args.protos.iter().chain(&args.includes).chain(&args.descriptor_set) {
        if !path.exists() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }
    }

    info!("API: {} {}", args.title, args.api_version);
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    // Step 1: obtain the descriptor set
    let descriptor_set = if let Some(path) = &args.descriptor_set {
        info!("Reading descriptor set {}", path.display());
        read_descriptor_set(path)
            .with_context(|| format!("Failed to read descriptor set: {}", path.display()))?
    } else {
        info!("Scanning proto inputs...");
        // unreadable entries were already logged by the scanner
        let scan_result = ProtoScanner::new(args.protos.clone()).scan()?;
        if scan_result.proto_files.is_empty() {
            anyhow::bail!("No .proto files found in the given inputs");
        }
        info!("Found {} proto files", scan_result.proto_files.len());

        let mut includes = scan_result.include_dirs;
        includes.extend(args.includes.iter().cloned());
        compile_protos(&scan_result.proto_files, &includes)
            .context("Failed to compile proto files")?
    };

    // Step 2: flatten into services, messages and enums
    let protos = to_proto_set(&descriptor_set);
    if protos.method_count() == 0 {
        warn!("No RPC methods found; the document will have no paths");
    }

    // Step 3: build the document; any error aborts before output is written
    let info = Info {
        title: args.title.clone(),
        version: args.api_version.clone(),
        description: args.description.clone(),
    };
    let document = generate_document(&protos, info)?;
    info!("OpenAPI document built with {} paths", document.paths.len());

    // Step 4: serialize and output
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    Ok(())
}
