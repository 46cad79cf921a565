//! Serialization of the finished OpenAPI document to YAML or JSON.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML.
///
/// Maps keep the order in which paths and schemas were generated, so the same
/// input always yields byte-identical output.
///
/// # Example
///
/// ```
/// use openapi_from_proto::descriptor::ProtoSet;
/// use openapi_from_proto::openapi_builder::{generate_document, Info};
/// use openapi_from_proto::serializer::serialize_yaml;
///
/// let info = Info {
///     title: "Empty".to_string(),
///     version: "1.0.0".to_string(),
///     description: None,
/// };
/// let doc = generate_document(&ProtoSet::new(), info).unwrap();
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("openapi: 3.0.0"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to pretty-printed JSON.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDef, FieldType, MessageDef, MethodDef, ProtoSet, ScalarType, ServiceDef};
    use crate::openapi_builder::{generate_document, Info, OpenApiDocument};
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn create_test_document() -> OpenApiDocument {
        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: Info {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("A test API".to_string()),
            },
            paths: IndexMap::new(),
            components: None,
        }
    }

    fn create_users_document() -> OpenApiDocument {
        let mut protos = ProtoSet::new();
        protos.add_message(MessageDef::new(
            ".users.User",
            vec![
                FieldDef::new("id", 1, FieldType::Scalar(ScalarType::Int64)),
                FieldDef::new("name", 2, FieldType::Scalar(ScalarType::String)),
            ],
        ));
        protos.add_service(ServiceDef {
            full_name: ".users.Users".to_string(),
            methods: vec![
                MethodDef {
                    name: "GetUser".to_string(),
                    comment: " Fetches one user.\n GET /users/{id:int} [Users]".to_string(),
                    input_type: ".users.User".to_string(),
                    output_type: ".users.User".to_string(),
                },
                MethodDef {
                    name: "CreateUser".to_string(),
                    comment: "POST /users [Users]".to_string(),
                    input_type: ".users.User".to_string(),
                    output_type: ".users.User".to_string(),
                },
            ],
        });
        let info = Info {
            title: "Users".to_string(),
            version: "2.0.0".to_string(),
            description: None,
        };
        generate_document(&protos, info).unwrap()
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.contains("openapi: 3.0.0"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("version: 1.0.0"));
        assert!(yaml.contains("description: A test API"));
        assert!(yaml.contains("paths:"));
        assert!(!yaml.contains("components"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_document()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.0");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert!(parsed["paths"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize_json(&create_test_document()).unwrap();
        assert!(json.contains('\n'));
        assert!(json.lines().count() > 5, "Pretty printed JSON should have multiple lines");
    }

    #[test]
    fn test_serialize_yaml_with_users_document() {
        let yaml = serialize_yaml(&create_users_document()).unwrap();

        assert!(yaml.contains("/users/{id}:"));
        assert!(yaml.contains("/users:"));
        assert!(yaml.contains("operationId: users_Users_GetUser"));
        assert!(yaml.contains("#/components/schemas/users.User"));
        assert!(yaml.contains("in: path"));
        assert!(yaml.contains("requestBody:"));
        // paths keep generation order
        let get = yaml.find("/users/{id}:").unwrap();
        let post = yaml.find("/users:").unwrap();
        assert!(get < post);
    }

    #[test]
    fn test_serialize_json_with_users_document() {
        let json = serialize_json(&create_users_document()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        let get = &parsed["paths"]["/users/{id}"]["get"];
        assert_eq!(get["parameters"][0]["name"], "id");
        assert_eq!(get["parameters"][0]["schema"]["type"], "integer");
        assert!(get.get("requestBody").is_none());
        assert_eq!(
            get["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/users.User"
        );
        assert_eq!(
            parsed["components"]["schemas"]["users.User"]["properties"]["id"]["format"],
            "int64"
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let first = serialize_yaml(&create_users_document()).unwrap();
        let second = serialize_yaml(&create_users_document()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_roundtrip_yaml_document() {
        let doc = create_users_document();
        let yaml = serialize_yaml(&doc).unwrap();

        let deserialized: OpenApiDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized.info.title, doc.info.title);
        assert_eq!(deserialized.paths.len(), 2);
        assert_eq!(
            deserialized.components.unwrap().schemas.keys().collect::<Vec<_>>(),
            vec!["users.User"]
        );
    }
}
