//! openapi-from-proto - OpenAPI documents from annotated protobuf services.
//!
//! RPC methods opt into HTTP exposure with a one-line annotation in their
//! leading comment:
//!
//! ```proto
//! service Users {
//!   // Fetches a single user.
//!   // GET /users/{userId:int} [Users]
//!   rpc GetUser(GetUserRequest) returns (User);
//! }
//! ```
//!
//! # Architecture
//!
//! 1. [`scanner`] - collects `.proto` files from the given paths
//! 2. [`loader`] - compiles them with `protoc` and flattens the descriptors into a [`descriptor::ProtoSet`]
//! 3. [`annotation`] - parses the annotation lines of a method comment
//! 4. [`path_template`] - validates typed path templates such as `/users/{id:int}`
//! 5. [`schema_mapper`] - maps messages, enums and scalars to OpenAPI schemas
//! 6. [`openapi_builder`] - assembles the document from services and methods
//! 7. [`serializer`] - renders the document as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_proto::{
//!     loader::{compile_protos, to_proto_set},
//!     openapi_builder::{generate_document, Info},
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let set = compile_protos(&[PathBuf::from("users.proto")], &[PathBuf::from(".")]).unwrap();
//! let protos = to_proto_set(&set);
//! let info = Info {
//!     title: "Users API".to_string(),
//!     version: "1.0.0".to_string(),
//!     description: None,
//! };
//! let document = generate_document(&protos, info).unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod openapi_builder;
pub mod path_template;
pub mod scanner;
pub mod schema_mapper;
pub mod serializer;
