//! In-memory model of the protobuf definitions the generator works on.
//!
//! The [`loader`](crate::loader) builds a [`ProtoSet`] from a compiled
//! `FileDescriptorSet`; tests usually build one by hand.
//!
//! Type names are fully qualified with a leading dot, as protoc writes them
//! (`.hello.HelloMessage`).

use log::debug;
use std::collections::HashMap;

/// Protobuf scalar value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// The declared type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    /// Fully-qualified message name
    Message(String),
    /// Fully-qualified enum name
    Enum(String),
    /// `map<K, V>`
    Map {
        key: ScalarType,
        value: Box<FieldType>,
    },
    /// Anything the generator cannot express (groups, unknown type numbers)
    Unsupported(String),
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    Singular,
    /// proto3 `optional`
    Optional,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub number: i32,
    pub field_type: FieldType,
    pub cardinality: Cardinality,
    /// Name of the (real) oneof group this field belongs to
    pub oneof: Option<String>,
}

impl FieldDef {
    /// Singular field with no oneof membership
    pub fn new(name: impl Into<String>, number: i32, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            field_type,
            cardinality: Cardinality::Singular,
            oneof: None,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    pub fn optional(mut self) -> Self {
        self.cardinality = Cardinality::Optional;
        self
    }

    pub fn in_oneof(mut self, oneof: impl Into<String>) -> Self {
        self.oneof = Some(oneof.into());
        self
    }
}

/// A message type. Nested types are registered separately under their own full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDef {
    pub full_name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDef>,
}

impl MessageDef {
    pub fn new(full_name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            full_name: full_name.into(),
            fields,
        }
    }

    /// Simple name, e.g. `HelloMessage` for `.hello.HelloMessage`
    pub fn short_name(&self) -> &str {
        short_name(&self.full_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub full_name: String,
    /// `(name, number)` in declaration order
    pub values: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    /// Leading comment text, possibly empty
    pub comment: String,
    pub input_type: String,
    pub output_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDef {
    /// Fully-qualified service name
    pub full_name: String,
    pub methods: Vec<MethodDef>,
}

impl ServiceDef {
    /// `package.Service.Method`, used to identify a method in errors
    pub fn rpc_name(&self, method: &MethodDef) -> String {
        format!("{}.{}", schema_key(&self.full_name), method.name)
    }

    /// `package_Service_Method`; the package keeps ids unique across packages
    pub fn operation_id(&self, method: &MethodDef) -> String {
        format!("{}_{}", schema_key(&self.full_name).replace('.', "_"), method.name)
    }
}

/// Every service, message and enum known to one generation run
#[derive(Debug, Clone, Default)]
pub struct ProtoSet {
    pub services: Vec<ServiceDef>,
    messages: HashMap<String, MessageDef>,
    enums: HashMap<String, EnumDef>,
}

impl ProtoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_service(&mut self, service: ServiceDef) {
        debug!("Registering service {}", service.full_name);
        self.services.push(service);
    }

    pub fn add_message(&mut self, message: MessageDef) {
        debug!("Registering message {}", message.full_name);
        self.messages.insert(message.full_name.clone(), message);
    }

    pub fn add_enum(&mut self, enum_def: EnumDef) {
        debug!("Registering enum {}", enum_def.full_name);
        self.enums.insert(enum_def.full_name.clone(), enum_def);
    }

    pub fn message(&self, full_name: &str) -> Option<&MessageDef> {
        self.messages.get(full_name)
    }

    pub fn enum_def(&self, full_name: &str) -> Option<&EnumDef> {
        self.enums.get(full_name)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn method_count(&self) -> usize {
        self.services.iter().map(|s| s.methods.len()).sum()
    }
}

/// Last segment of a dotted name
pub fn short_name(full_name: &str) -> &str {
    full_name.rsplit('.').next().unwrap_or(full_name)
}

/// Key used in `components.schemas`: the full name without its leading dot
pub fn schema_key(full_name: &str) -> &str {
    full_name.strip_prefix('.').unwrap_or(full_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(short_name(".hello.HelloMessage"), "HelloMessage");
        assert_eq!(short_name("Plain"), "Plain");
        assert_eq!(schema_key(".hello.Outer.Inner"), "hello.Outer.Inner");
        assert_eq!(schema_key("hello.Outer"), "hello.Outer");
    }

    #[test]
    fn test_rpc_name() {
        let method = MethodDef {
            name: "SayHello".to_string(),
            comment: String::new(),
            input_type: ".google.protobuf.Empty".to_string(),
            output_type: ".hello.HelloMessage".to_string(),
        };
        let service = ServiceDef {
            full_name: ".hello.Greeter".to_string(),
            methods: vec![method.clone()],
        };
        assert_eq!(service.rpc_name(&method), "hello.Greeter.SayHello");
        assert_eq!(service.operation_id(&method), "hello_Greeter_SayHello");
    }

    #[test]
    fn test_names_differ_across_packages() {
        let method = MethodDef {
            name: "GetUser".to_string(),
            comment: String::new(),
            input_type: ".v1.User".to_string(),
            output_type: ".v1.User".to_string(),
        };
        let v1 = ServiceDef {
            full_name: ".v1.Users".to_string(),
            methods: vec![method.clone()],
        };
        let v2 = ServiceDef {
            full_name: ".v2.Users".to_string(),
            methods: vec![method.clone()],
        };
        assert_ne!(v1.operation_id(&method), v2.operation_id(&method));
        assert_ne!(v1.rpc_name(&method), v2.rpc_name(&method));

        let bare = ServiceDef {
            full_name: ".Users".to_string(),
            methods: vec![],
        };
        assert_eq!(bare.operation_id(&method), "Users_GetUser");
    }

    #[test]
    fn test_lookup() {
        let mut set = ProtoSet::new();
        set.add_message(MessageDef::new(
            ".a.B",
            vec![FieldDef::new("x", 1, FieldType::Scalar(ScalarType::Int32)).repeated()],
        ));
        assert_eq!(set.message_count(), 1);
        let message = set.message(".a.B").unwrap();
        assert_eq!(message.short_name(), "B");
        assert_eq!(message.fields[0].cardinality, Cardinality::Repeated);
        assert!(set.message(".a.C").is_none());
    }
}
