use crate::annotation::{AnnotationRecord, HttpMethod, ParsedComment};
use crate::descriptor::{short_name, MethodDef, ProtoSet, ServiceDef};
use crate::error::{Error, Result};
use crate::path_template::CompiledPath;
use crate::schema_mapper::{Schema, SchemaMapper};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const JSON: &str = "application/json";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Paths collection (path template -> PathItem)
    paths: IndexMap<String, PathItem>,
    /// RPC that produced each (path, method) pair
    owners: HashMap<(String, HttpMethod), String>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
        }
    }

    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Documentation text of the RPC method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Path parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location, always `path` here
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    pub schemas: IndexMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    pub info: Info,
    pub paths: IndexMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiDocument {
    /// `$ref` targets that are missing from `components.schemas`
    pub fn unresolved_references(&self) -> Vec<String> {
        let schemas = self.components.as_ref().map(|c| &c.schemas);
        let mut missing = Vec::new();
        let mut check = |schema: &Schema| {
            collect_references(schema, &mut |key: &str| {
                if !schemas.map(|s| s.contains_key(key)).unwrap_or(false) {
                    missing.push(key.to_string());
                }
            })
        };

        for item in self.paths.values() {
            for method in [
                HttpMethod::Get,
                HttpMethod::Put,
                HttpMethod::Post,
                HttpMethod::Delete,
            ] {
                let Some(operation) = item.operation(method) else {
                    continue;
                };
                for parameter in operation.parameters.iter().flatten() {
                    check(&parameter.schema);
                }
                if let Some(body) = &operation.request_body {
                    body.content.values().for_each(|m| check(&m.schema));
                }
                for response in operation.responses.values() {
                    response
                        .content
                        .iter()
                        .flat_map(|c| c.values())
                        .for_each(|m| check(&m.schema));
                }
            }
        }
        if let Some(schemas) = schemas {
            schemas.values().for_each(|s| check(s));
        }
        missing
    }
}

fn collect_references(schema: &Schema, found: &mut dyn FnMut(&str)) {
    if let Some(key) = schema.referenced_key() {
        found(key);
    }
    schema
        .properties
        .values()
        .chain(schema.items.as_deref())
        .chain(schema.additional_properties.as_deref())
        .chain(schema.one_of.iter())
        .for_each(|child| collect_references(child, found));
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: None,
            },
            paths: IndexMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Adds every annotated method of a service. Returns the number of operations added.
    pub fn add_service(&mut self, service: &ServiceDef, mapper: &mut SchemaMapper) -> Result<usize> {
        debug!("Adding service {}", service.full_name);
        let mut added = 0;
        for method in &service.methods {
            added += self.add_method(service, method, mapper)?;
        }
        Ok(added)
    }

    /// Adds one operation per annotation in the method's comment.
    ///
    /// Methods without an annotation are skipped. Returns the number of operations added.
    pub fn add_method(
        &mut self,
        service: &ServiceDef,
        method: &MethodDef,
        mapper: &mut SchemaMapper,
    ) -> Result<usize> {
        let rpc = service.rpc_name(method);
        let parsed = ParsedComment::parse(&rpc, &method.comment)?;
        if parsed.annotations.is_empty() {
            debug!("Skipping {}: no annotation", rpc);
            return Ok(0);
        }

        let base_id = service.operation_id(method);
        for (idx, record) in parsed.annotations.iter().enumerate() {
            let operation_id = if idx == 0 {
                base_id.clone()
            } else {
                format!("{}_{}", base_id, idx + 1)
            };
            self.add_operation(&rpc, method, record, &parsed, operation_id, mapper)?;
        }
        Ok(parsed.annotations.len())
    }

    fn add_operation(
        &mut self,
        rpc: &str,
        method: &MethodDef,
        record: &AnnotationRecord,
        parsed: &ParsedComment,
        operation_id: String,
        mapper: &mut SchemaMapper,
    ) -> Result<()> {
        debug!("Adding operation: {} {} ({})", record.method, record.raw_path, rpc);

        let compiled = CompiledPath::compile(rpc, &record.line, &record.raw_path)?;
        let referrer = format!("method {}", rpc);

        let response_schema = mapper.map_message(&method.output_type, &referrer)?;
        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: format!("A response containing {}", short_name(&method.output_type)),
                content: Some(json_content(response_schema)),
            },
        );

        // an Empty input has nothing to send
        let request_body = if record.omit_body || SchemaMapper::is_empty_message(&method.input_type) {
            None
        } else {
            let schema = mapper.map_message(&method.input_type, &referrer)?;
            Some(RequestBody {
                required: true,
                content: json_content(schema),
            })
        };

        let parameters = if compiled.parameters.is_empty() {
            None
        } else {
            Some(
                compiled
                    .parameters
                    .iter()
                    .map(|p| Parameter {
                        name: p.name.clone(),
                        location: "path".to_string(),
                        required: true,
                        schema: Schema::primitive(p.param_type.openapi_type(), None),
                    })
                    .collect(),
            )
        };

        let operation = Operation {
            tags: record.tags.clone(),
            summary: parsed.summary(),
            operation_id: Some(operation_id),
            parameters,
            request_body,
            responses,
        };

        let key = (compiled.template.clone(), record.method);
        if let Some(first) = self.owners.get(&key) {
            return Err(Error::DuplicatePathOperation {
                path: compiled.template,
                method: record.method.to_string(),
                first: first.clone(),
                second: rpc.to_string(),
            });
        }
        self.owners.insert(key, rpc.to_string());

        let path_item = self.paths.entry(compiled.template).or_default();
        *path_item.slot(record.method) = Some(operation);
        Ok(())
    }

    /// Build the final OpenAPI document
    pub fn build(self, mapper: SchemaMapper) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let schemas = mapper.into_schemas();
        let components = if schemas.is_empty() {
            None
        } else {
            Some(Components { schemas })
        };

        let document = OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            paths: self.paths,
            components,
        };
        debug_assert!(
            document.unresolved_references().is_empty(),
            "document refers to unregistered schemas: {:?}",
            document.unresolved_references()
        );
        document
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON.to_string(), MediaType { schema });
    content
}

/// Builds the document for every service in `protos`.
///
/// Stops at the first error; no partial document is returned.
pub fn generate_document(protos: &ProtoSet, info: Info) -> Result<OpenApiDocument> {
    let mut builder = OpenApiBuilder::new().with_info(info.title, info.version, info.description);
    let mut mapper = SchemaMapper::new(protos);

    let mut operations = 0;
    for service in &protos.services {
        operations += builder.add_service(service, &mut mapper)?;
    }
    info!("Generated {} operations", operations);

    Ok(builder.build(mapper))
}
