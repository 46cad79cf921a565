use crate::descriptor::{
    schema_key, Cardinality, EnumDef, FieldDef, FieldType, MessageDef, ProtoSet, ScalarType,
};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

const EMPTY: &str = ".google.protobuf.Empty";
const TIMESTAMP: &str = ".google.protobuf.Timestamp";
const DURATION: &str = ".google.protobuf.Duration";

/// OpenAPI Schema object.
///
/// Used for registered message and enum schemas as well as for the inline
/// fragments describing fields: primitives, arrays, maps, oneof groups and
/// `$ref` references to registered schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a registered schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format hint for primitive types (e.g., "int32", "double", "binary")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types, in field declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Value schema for map types
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    /// Enum values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<i64>>,
}

impl Schema {
    pub fn primitive(schema_type: &str, format: Option<&str>) -> Self {
        Schema {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Schema::default()
        }
    }

    pub fn object(properties: IndexMap<String, Schema>) -> Self {
        Schema {
            schema_type: Some("object".to_string()),
            properties,
            ..Schema::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Schema::default()
        }
    }

    pub fn map(values: Schema) -> Self {
        Schema {
            schema_type: Some("object".to_string()),
            additional_properties: Some(Box::new(values)),
            ..Schema::default()
        }
    }

    /// `$ref` to the registered schema stored under `key`
    pub fn reference(key: &str) -> Self {
        Schema {
            reference: Some(format!("#/components/schemas/{}", key)),
            ..Schema::default()
        }
    }

    /// Registry key this schema refers to, if it is a reference
    pub fn referenced_key(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix("#/components/schemas/"))
    }
}

/// Registry slot. A message is marked in progress before its fields are
/// visited so that cyclic message graphs resolve to references.
#[derive(Debug, Clone)]
enum SchemaEntry {
    InProgress,
    Complete(Schema),
}

/// Maps protobuf messages to OpenAPI schemas.
///
/// Every message or enum reached is registered once, keyed by its full name
/// without the leading dot; fields that use it get a `$ref`. One mapper
/// serves a single generation run.
pub struct SchemaMapper<'a> {
    protos: &'a ProtoSet,
    registry: IndexMap<String, SchemaEntry>,
}

impl<'a> SchemaMapper<'a> {
    pub fn new(protos: &'a ProtoSet) -> Self {
        debug!("Initializing SchemaMapper");
        Self {
            protos,
            registry: IndexMap::new(),
        }
    }

    /// Maps a request or response message type.
    ///
    /// Returns a `$ref` for ordinary messages and an inline schema for the
    /// well-known types. `referrer` describes the user of the type in errors.
    pub fn map_message(&mut self, full_name: &str, referrer: &str) -> Result<Schema> {
        debug!("Mapping message {} for {}", full_name, referrer);
        self.message_schema(full_name)
            .unwrap_or_else(|| Err(unresolved(referrer.to_string(), full_name)))
    }

    /// Whether `full_name` is `google.protobuf.Empty`
    pub fn is_empty_message(full_name: &str) -> bool {
        full_name == EMPTY
    }

    /// The finished schemas, in the order they were first reached
    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.registry
            .into_iter()
            .filter_map(|(key, entry)| match entry {
                SchemaEntry::Complete(schema) => Some((key, schema)),
                SchemaEntry::InProgress => None,
            })
            .collect()
    }

    /// Returns `None` when the type is unknown, leaving the error to the caller
    fn message_schema(&mut self, full_name: &str) -> Option<Result<Schema>> {
        if let Some(schema) = well_known(full_name) {
            return Some(Ok(schema));
        }
        let protos = self.protos;
        let message = protos.message(full_name)?;
        Some(
            self.register_message(message)
                .map(|_| Schema::reference(schema_key(full_name))),
        )
    }

    fn register_message(&mut self, message: &'a MessageDef) -> Result<()> {
        let key = schema_key(&message.full_name);
        if self.registry.contains_key(key) {
            debug!("Schema for {} already registered", key);
            return Ok(());
        }

        debug!("Generating schema for message {}", key);
        self.registry
            .insert(key.to_string(), SchemaEntry::InProgress);

        let mut properties = IndexMap::new();
        let mut oneofs: IndexMap<&str, Vec<Schema>> = IndexMap::new();

        for field in &message.fields {
            let schema = self.field_schema(message, field)?;
            match field.oneof.as_deref() {
                Some(group) => {
                    // the group takes the position of its first member
                    properties
                        .entry(group.to_string())
                        .or_insert_with(Schema::default);
                    let mut variant = IndexMap::new();
                    variant.insert(field.name.clone(), schema);
                    oneofs
                        .entry(group)
                        .or_default()
                        .push(Schema::object(variant));
                }
                None => {
                    properties.insert(field.name.clone(), schema);
                }
            }
        }

        for (group, variants) in oneofs {
            properties.insert(
                group.to_string(),
                Schema {
                    one_of: variants,
                    ..Schema::default()
                },
            );
        }

        self.registry
            .insert(key.to_string(), SchemaEntry::Complete(Schema::object(properties)));
        Ok(())
    }

    fn field_schema(&mut self, message: &MessageDef, field: &FieldDef) -> Result<Schema> {
        let schema = self.type_schema(message, field, &field.field_type)?;
        Ok(match field.cardinality {
            Cardinality::Repeated => Schema::array(schema),
            Cardinality::Singular | Cardinality::Optional => schema,
        })
    }

    fn type_schema(
        &mut self,
        message: &MessageDef,
        field: &FieldDef,
        field_type: &FieldType,
    ) -> Result<Schema> {
        match field_type {
            FieldType::Scalar(scalar) => Ok(scalar_schema(*scalar)),
            FieldType::Message(name) => self
                .message_schema(name)
                .unwrap_or_else(|| Err(unresolved(field_referrer(message, field), name))),
            FieldType::Enum(name) => self
                .enum_schema(name)
                .ok_or_else(|| unresolved(field_referrer(message, field), name)),
            FieldType::Map { value, .. } => {
                let values = self.type_schema(message, field, value)?;
                Ok(Schema::map(values))
            }
            FieldType::Unsupported(description) => Err(Error::UnsupportedFieldType {
                message: message.full_name.clone(),
                field: field.name.clone(),
                type_name: description.clone(),
            }),
        }
    }

    fn enum_schema(&mut self, full_name: &str) -> Option<Schema> {
        let protos = self.protos;
        let enum_def = protos.enum_def(full_name)?;
        let key = schema_key(full_name);
        if !self.registry.contains_key(key) {
            debug!("Generating schema for enum {}", key);
            self.registry.insert(
                key.to_string(),
                SchemaEntry::Complete(enum_to_schema(enum_def)),
            );
        }
        Some(Schema::reference(key))
    }
}

fn scalar_schema(scalar: ScalarType) -> Schema {
    let (schema_type, format) = match scalar {
        ScalarType::Int32
        | ScalarType::Uint32
        | ScalarType::Sint32
        | ScalarType::Fixed32
        | ScalarType::Sfixed32 => ("integer", Some("int32")),
        ScalarType::Int64
        | ScalarType::Uint64
        | ScalarType::Sint64
        | ScalarType::Fixed64
        | ScalarType::Sfixed64 => ("integer", Some("int64")),
        ScalarType::Double => ("number", Some("double")),
        ScalarType::Float => ("number", Some("float")),
        ScalarType::Bool => ("boolean", None),
        ScalarType::String => ("string", None),
        ScalarType::Bytes => ("string", Some("binary")),
    };
    Schema::primitive(schema_type, format)
}

/// Enums are integers on the wire; the names go into the description
fn enum_to_schema(enum_def: &EnumDef) -> Schema {
    Schema {
        description: Some(
            enum_def
                .values
                .iter()
                .map(|(name, number)| format!("{} = {}", name, number))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        enum_values: Some(enum_def.values.iter().map(|(_, n)| i64::from(*n)).collect()),
        ..Schema::primitive("integer", Some("int32"))
    }
}

fn well_known(full_name: &str) -> Option<Schema> {
    match full_name {
        EMPTY => Some(Schema::object(IndexMap::new())),
        TIMESTAMP => Some(Schema::primitive("string", Some("date-time"))),
        DURATION => Some(Schema::primitive("string", None)),
        _ => None,
    }
}

fn field_referrer(message: &MessageDef, field: &FieldDef) -> String {
    format!("field `{}` of message {}", field.name, message.full_name)
}

fn unresolved(referrer: String, type_name: &str) -> Error {
    Error::UnresolvedType {
        referrer,
        type_name: type_name.to_string(),
    }
}
