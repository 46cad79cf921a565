//! Compiles annotated paths such as `/users/{userId:int}` into OpenAPI path templates.

use crate::error::{Error, Result};
use log::debug;
use std::fmt;

/// Declared type of a path parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Int,
}

impl ParamType {
    /// Parses the type token used in annotations. Case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "string" => Some(ParamType::String),
            "int" => Some(ParamType::Int),
            _ => None,
        }
    }

    /// The token as written in an annotation
    pub fn as_token(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "int",
        }
    }

    /// The OpenAPI primitive type name
    pub fn openapi_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "integer",
        }
    }
}

/// A typed placeholder from the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParameter {
    pub name: String,
    pub param_type: ParamType,
}

impl fmt::Display for PathParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.name, self.param_type.as_token())
    }
}

/// A path with its type annotations stripped, plus the parameters they declared.
///
/// Placeholder names in `template` match `parameters` one to one, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    /// OpenAPI path, e.g. `/users/{userId}`
    pub template: String,
    /// Parameters in left-to-right order
    pub parameters: Vec<PathParameter>,
}

impl CompiledPath {
    /// Compiles `raw_path`. `rpc` and `line` (the annotation it came from)
    /// only locate the path in errors.
    pub fn compile(rpc: &str, line: &str, raw_path: &str) -> Result<Self> {
        debug!("Compiling path {} for {}", raw_path, rpc);

        let mut template = String::with_capacity(raw_path.len());
        let mut parameters: Vec<PathParameter> = Vec::new();
        let mut chars = raw_path.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(Error::malformed(rpc, line, "nested '{' in path"))
                            }
                            _ => inner.push(c),
                        }
                    }
                    if !closed {
                        return Err(Error::malformed(
                            rpc,
                            line,
                            "unterminated '{' in path",
                        ));
                    }

                    let param = parse_parameter(rpc, line, &inner)?;
                    if parameters.iter().any(|p| p.name == param.name) {
                        return Err(Error::DuplicateParameterName {
                            rpc: rpc.to_string(),
                            name: param.name,
                        });
                    }
                    template.push('{');
                    template.push_str(&param.name);
                    template.push('}');
                    parameters.push(param);
                }
                '}' => {
                    return Err(Error::malformed(rpc, line, "unbalanced '}' in path"));
                }
                _ => template.push(c),
            }
        }

        Ok(CompiledPath {
            template,
            parameters,
        })
    }
}

fn parse_parameter(rpc: &str, line: &str, inner: &str) -> Result<PathParameter> {
    let (name, type_token) = inner.split_once(':').ok_or_else(|| {
        Error::malformed(
            rpc,
            line,
            format!("path parameter `{}` must be written as {{name:type}}", inner),
        )
    })?;

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::malformed(
            rpc,
            line,
            format!("invalid path parameter name `{}`", name),
        ));
    }

    let param_type = ParamType::from_token(type_token).ok_or_else(|| Error::UnknownParameterType {
        rpc: rpc.to_string(),
        name: name.to_string(),
        type_name: type_token.to_string(),
    })?;

    Ok(PathParameter {
        name: name.to_string(),
        param_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(path: &str) -> Result<CompiledPath> {
        CompiledPath::compile("Test.Method", path, path)
    }

    /// Re-inserts the type annotations, giving back an equivalent raw path
    fn annotated(compiled: &CompiledPath) -> String {
        let mut out = compiled.template.clone();
        for param in &compiled.parameters {
            out = out.replacen(&format!("{{{}}}", param.name), &param.to_string(), 1);
        }
        out
    }

    #[test]
    fn test_literal_path_unchanged() {
        let compiled = compile("/users/list").unwrap();
        assert_eq!(compiled.template, "/users/list");
        assert!(compiled.parameters.is_empty());
    }

    #[test]
    fn test_typed_parameters_are_stripped() {
        let compiled = compile("/users/{userId:int}/posts/{slug:string}").unwrap();
        assert_eq!(compiled.template, "/users/{userId}/posts/{slug}");
        assert_eq!(
            compiled.parameters,
            vec![
                PathParameter {
                    name: "userId".to_string(),
                    param_type: ParamType::Int,
                },
                PathParameter {
                    name: "slug".to_string(),
                    param_type: ParamType::String,
                },
            ]
        );
    }

    #[test]
    fn test_round_trip_preserves_parameters() {
        for raw in [
            "/a/{x:int}",
            "/a/{x:string}/b/{y:int}",
            "/{first:string}/{second:string}/{third:int}",
        ] {
            let compiled = compile(raw).unwrap();
            assert_eq!(annotated(&compiled), raw);
            let recompiled = compile(&annotated(&compiled)).unwrap();
            assert_eq!(recompiled, compiled);
        }
    }

    #[test]
    fn test_unknown_parameter_type() {
        let err = compile("/items/{id:uuid}").unwrap_err();
        match err {
            Error::UnknownParameterType { name, type_name, .. } => {
                assert_eq!(name, "id");
                assert_eq!(type_name, "uuid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parameter_type_is_case_sensitive() {
        assert!(matches!(
            compile("/items/{id:Int}"),
            Err(Error::UnknownParameterType { .. })
        ));
    }

    #[test]
    fn test_duplicate_parameter_name() {
        let err = compile("/a/{id:int}/b/{id:string}").unwrap_err();
        assert!(matches!(err, Error::DuplicateParameterName { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_unterminated_brace() {
        let err = compile("/users/{id:int").unwrap_err();
        match err {
            Error::MalformedAnnotation { reason, rpc, .. } => {
                assert_eq!(rpc, "Test.Method");
                assert!(reason.contains("unterminated"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_type_is_malformed() {
        assert!(matches!(
            compile("/users/{id}"),
            Err(Error::MalformedAnnotation { .. })
        ));
    }

    #[test]
    fn test_errors_quote_the_annotation_line() {
        let err = CompiledPath::compile("Users.GetUser", "GET /users/{id} [Users]", "/users/{id}")
            .unwrap_err();
        match err {
            Error::MalformedAnnotation { rpc, line, .. } => {
                assert_eq!(rpc, "Users.GetUser");
                assert_eq!(line, "GET /users/{id} [Users]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stray_closing_brace_is_malformed() {
        assert!(matches!(
            compile("/users/id}"),
            Err(Error::MalformedAnnotation { .. })
        ));
    }
}
