//! Loads protobuf definitions into a [`ProtoSet`].
//!
//! Proto sources are compiled with `protoc` into a `FileDescriptorSet`
//! (imports and source info included, so method comments survive), which is
//! then decoded with `prost` and flattened into the generator's own model.

use crate::descriptor::{
    Cardinality, EnumDef, FieldDef, FieldType, MessageDef, MethodDef, ProtoSet, ScalarType,
    ServiceDef,
};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

// Field numbers in descriptor.proto, used to address SourceCodeInfo locations
const FILE_SERVICE: i32 = 6;
const SERVICE_METHOD: i32 = 2;

/// Compiles proto files with `protoc` and returns the decoded descriptor set.
///
/// The binary is taken from the `PROTOC` environment variable, falling back to
/// `protoc` on the `PATH`.
pub fn compile_protos(protos: &[PathBuf], includes: &[PathBuf]) -> Result<FileDescriptorSet> {
    let tmp = tempfile::Builder::new()
        .prefix("openapi-from-proto")
        .tempdir()?;
    let descriptor_path = tmp.path().join("descriptor-set.pb");

    let protoc = std::env::var_os("PROTOC").unwrap_or_else(|| "protoc".into());
    let mut cmd = Command::new(&protoc);
    cmd.arg("--include_imports")
        .arg("--include_source_info")
        .arg("-o")
        .arg(&descriptor_path);
    for include in includes {
        cmd.arg("-I").arg(include);
    }
    for proto in protos {
        cmd.arg(proto);
    }

    debug!("Running {:?}", cmd);
    let output = cmd.output().map_err(|e| {
        Error::Protoc(format!(
            "failed to invoke {} (set PROTOC to its location): {}",
            Path::new(&protoc).display(),
            e
        ))
    })?;
    if !output.status.success() {
        return Err(Error::Protoc(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    read_descriptor_set(&descriptor_path)
}

/// Reads a binary `FileDescriptorSet`, e.g. one written by `protoc -o`
pub fn read_descriptor_set(path: &Path) -> Result<FileDescriptorSet> {
    debug!("Reading descriptor set {}", path.display());
    let bytes = fs::read(path)?;
    decode_descriptor_set(&bytes)
}

pub fn decode_descriptor_set(bytes: &[u8]) -> Result<FileDescriptorSet> {
    Ok(FileDescriptorSet::decode(bytes)?)
}

/// Flattens every file of the set into one [`ProtoSet`].
///
/// Nested messages and enums are registered under their full names. Map entry
/// messages are folded into the `map` fields that use them.
pub fn to_proto_set(set: &FileDescriptorSet) -> ProtoSet {
    let mut index = DescriptorIndex::default();
    for file in &set.file {
        let package = package_prefix(file);
        for message in &file.message_type {
            index.collect(&package, message);
        }
    }

    let mut protos = ProtoSet::new();
    for file in &set.file {
        debug!("Converting {}", file.name());
        let package = package_prefix(file);

        for message in &file.message_type {
            convert_message(&index, &package, message, &mut protos);
        }
        for enum_type in &file.enum_type {
            protos.add_enum(convert_enum(&package, enum_type));
        }
        convert_services(file, &package, &mut protos);
    }

    info!(
        "Loaded {} services, {} methods, {} messages",
        protos.services.len(),
        protos.method_count(),
        protos.message_count()
    );
    protos
}

/// Message descriptors by full name, needed to recognise map entries
#[derive(Default)]
struct DescriptorIndex<'a> {
    messages: HashMap<String, &'a DescriptorProto>,
}

impl<'a> DescriptorIndex<'a> {
    fn collect(&mut self, scope: &str, message: &'a DescriptorProto) {
        let full_name = format!("{}.{}", scope, message.name());
        for nested in &message.nested_type {
            self.collect(&full_name, nested);
        }
        self.messages.insert(full_name, message);
    }

    fn map_entry(&self, type_name: &str) -> Option<&'a DescriptorProto> {
        self.messages
            .get(type_name)
            .copied()
            .filter(|m| m.options.as_ref().map(|o| o.map_entry()).unwrap_or(false))
    }
}

/// `.package`, or the empty string for files without a package
fn package_prefix(file: &FileDescriptorProto) -> String {
    if file.package().is_empty() {
        String::new()
    } else {
        format!(".{}", file.package())
    }
}

fn convert_message(
    index: &DescriptorIndex,
    scope: &str,
    message: &DescriptorProto,
    protos: &mut ProtoSet,
) {
    let full_name = format!("{}.{}", scope, message.name());

    for nested in &message.nested_type {
        if nested.options.as_ref().map(|o| o.map_entry()).unwrap_or(false) {
            continue;
        }
        convert_message(index, &full_name, nested, protos);
    }
    for enum_type in &message.enum_type {
        protos.add_enum(convert_enum(&full_name, enum_type));
    }

    let fields = message
        .field
        .iter()
        .map(|field| convert_field(index, message, field))
        .collect();
    protos.add_message(MessageDef::new(full_name, fields));
}

fn convert_field(
    index: &DescriptorIndex,
    message: &DescriptorProto,
    field: &FieldDescriptorProto,
) -> FieldDef {
    let mut field_type = field_type(field);
    let mut cardinality = match field.label() {
        Label::Repeated => Cardinality::Repeated,
        _ if field.proto3_optional() => Cardinality::Optional,
        _ => Cardinality::Singular,
    };

    if cardinality == Cardinality::Repeated {
        if let FieldType::Message(type_name) = &field_type {
            if let Some(entry) = index.map_entry(type_name) {
                field_type = map_type(entry);
                cardinality = Cardinality::Singular;
            }
        }
    }

    // proto3 optional fields sit in a synthetic oneof that is not a real choice
    let oneof = match field.oneof_index {
        Some(i) if !field.proto3_optional() => message
            .oneof_decl
            .get(i as usize)
            .map(|o| o.name().to_string()),
        _ => None,
    };

    FieldDef {
        name: field.name().to_string(),
        number: field.number(),
        field_type,
        cardinality,
        oneof,
    }
}

fn field_type(field: &FieldDescriptorProto) -> FieldType {
    let raw = field.r#type.unwrap_or_default();
    let kind = match Type::try_from(raw) {
        Ok(kind) => kind,
        Err(_) => return FieldType::Unsupported(format!("type number {}", raw)),
    };
    match kind {
        Type::Double => FieldType::Scalar(ScalarType::Double),
        Type::Float => FieldType::Scalar(ScalarType::Float),
        Type::Int64 => FieldType::Scalar(ScalarType::Int64),
        Type::Uint64 => FieldType::Scalar(ScalarType::Uint64),
        Type::Int32 => FieldType::Scalar(ScalarType::Int32),
        Type::Fixed64 => FieldType::Scalar(ScalarType::Fixed64),
        Type::Fixed32 => FieldType::Scalar(ScalarType::Fixed32),
        Type::Bool => FieldType::Scalar(ScalarType::Bool),
        Type::String => FieldType::Scalar(ScalarType::String),
        Type::Bytes => FieldType::Scalar(ScalarType::Bytes),
        Type::Uint32 => FieldType::Scalar(ScalarType::Uint32),
        Type::Sfixed32 => FieldType::Scalar(ScalarType::Sfixed32),
        Type::Sfixed64 => FieldType::Scalar(ScalarType::Sfixed64),
        Type::Sint32 => FieldType::Scalar(ScalarType::Sint32),
        Type::Sint64 => FieldType::Scalar(ScalarType::Sint64),
        Type::Message => FieldType::Message(field.type_name().to_string()),
        Type::Enum => FieldType::Enum(field.type_name().to_string()),
        Type::Group => FieldType::Unsupported("group".to_string()),
    }
}

fn map_type(entry: &DescriptorProto) -> FieldType {
    let key = entry.field.iter().find(|f| f.number() == 1);
    let value = entry.field.iter().find(|f| f.number() == 2);
    match (key.map(field_type), value.map(field_type)) {
        (Some(FieldType::Scalar(key)), Some(value)) => FieldType::Map {
            key,
            value: Box::new(value),
        },
        _ => FieldType::Unsupported(format!("map entry {}", entry.name())),
    }
}

fn convert_enum(scope: &str, enum_type: &EnumDescriptorProto) -> EnumDef {
    EnumDef {
        full_name: format!("{}.{}", scope, enum_type.name()),
        values: enum_type
            .value
            .iter()
            .map(|v| (v.name().to_string(), v.number()))
            .collect(),
    }
}

fn convert_services(file: &FileDescriptorProto, package: &str, protos: &mut ProtoSet) {
    let locations: HashMap<&[i32], &Location> = file
        .source_code_info
        .as_ref()
        .map(|info| {
            info.location
                .iter()
                .map(|location| (location.path.as_slice(), location))
                .collect()
        })
        .unwrap_or_default();

    if locations.is_empty() && !file.service.is_empty() {
        warn!(
            "{} has no source info; method annotations cannot be read",
            file.name()
        );
    }

    for (service_idx, service) in file.service.iter().enumerate() {
        let methods = service
            .method
            .iter()
            .enumerate()
            .map(|(method_idx, method)| {
                let path = [
                    FILE_SERVICE,
                    service_idx as i32,
                    SERVICE_METHOD,
                    method_idx as i32,
                ];
                let comment = locations
                    .get(&path[..])
                    .and_then(|location| location.leading_comments.clone())
                    .unwrap_or_default();
                if method.client_streaming() || method.server_streaming() {
                    debug!("{} is a streaming method", method.name());
                }
                MethodDef {
                    name: method.name().to_string(),
                    comment,
                    input_type: method.input_type().to_string(),
                    output_type: method.output_type().to_string(),
                }
            })
            .collect();

        protos.add_service(ServiceDef {
            full_name: format!("{}.{}", package, service.name()),
            methods,
        });
    }
}
