//! Parser for the HTTP annotations written in RPC method comments.
//!
//! An annotation is a single comment line of the form
//!
//! ```text
//! <METHOD> <path> [- BODY] [[tag, tag, ...]]
//! ```
//!
//! where `<METHOD>` is one of `GET`, `PUT`, `POST` or `DELETE`. Lines that do
//! not start with one of those keywords are ordinary documentation and are
//! ignored; a method whose comment carries no annotation is left out of the
//! generated document.

use crate::error::{Error, Result};
use log::debug;
use std::fmt;

/// HTTP methods an annotation may bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    /// Matches the annotation keyword exactly (`GET`, not `get`)
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "GET" => Some(HttpMethod::Get),
            "PUT" => Some(HttpMethod::Put),
            "POST" => Some(HttpMethod::Post),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed annotation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub method: HttpMethod,
    /// Path exactly as written, type annotations included
    pub raw_path: String,
    /// The whole annotation line, trimmed
    pub line: String,
    /// Always `true` for GET
    pub omit_body: bool,
    /// Empty when no tag list was given
    pub tags: Vec<String>,
}

/// Explicit request body marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMarker {
    /// `- BODY`
    Omit,
    /// `+ BODY`
    Include,
}

/// Annotations found in one comment block, with the remaining documentation text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedComment {
    pub annotations: Vec<AnnotationRecord>,
    /// Non-annotation lines, trimmed, blank lines dropped
    pub doc_lines: Vec<String>,
}

impl ParsedComment {
    /// Parses every line of a comment block. `rpc` names the method in errors.
    pub fn parse(rpc: &str, comment: &str) -> Result<Self> {
        let mut parsed = ParsedComment::default();
        for line in comment.lines() {
            match parse_line(rpc, line)? {
                Some(record) => parsed.annotations.push(record),
                None => {
                    let text = line.trim();
                    if !text.is_empty() {
                        parsed.doc_lines.push(text.to_string());
                    }
                }
            }
        }
        Ok(parsed)
    }

    /// The documentation text as a single sentence, if any
    pub fn summary(&self) -> Option<String> {
        if self.doc_lines.is_empty() {
            None
        } else {
            Some(self.doc_lines.join(" "))
        }
    }
}

/// Parses a single comment line.
///
/// Returns `Ok(None)` when the line does not start with a supported method keyword.
pub fn parse_line(rpc: &str, line: &str) -> Result<Option<AnnotationRecord>> {
    let text = line.trim();
    let (keyword, rest) = match text.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim_start()),
        None => (text, ""),
    };

    let method = match HttpMethod::from_keyword(keyword) {
        Some(method) => method,
        None => return Ok(None),
    };
    debug!("Found {} annotation on {}: {}", method, rpc, text);

    let (raw_path, mut rest) = match rest.split_once(char::is_whitespace) {
        Some((path, rest)) => (path, rest.trim_start()),
        None => (rest, ""),
    };
    if raw_path.is_empty() {
        return Err(Error::malformed(rpc, line, "missing path"));
    }
    if !raw_path.starts_with('/') {
        return Err(Error::malformed(rpc, line, "path must start with '/'"));
    }
    if let Some(reason) = brace_error(raw_path) {
        return Err(Error::malformed(rpc, line, reason));
    }

    let mut marker: Option<BodyMarker> = None;
    let mut tags: Option<Vec<String>> = None;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| Error::malformed(rpc, line, "unterminated tag list"))?;
            if tags.is_some() {
                return Err(Error::malformed(rpc, line, "more than one tag list"));
            }
            tags = Some(split_tags(&after[..end]));
            rest = after[end + 1..].trim_start();
        } else if rest.starts_with('-') || rest.starts_with('+') {
            let found = if rest.starts_with('-') {
                BodyMarker::Omit
            } else {
                BodyMarker::Include
            };
            let after = rest[1..].trim_start();
            let after = after
                .strip_prefix("BODY")
                .filter(|after| after.is_empty() || after.starts_with(char::is_whitespace) || after.starts_with('['))
                .ok_or_else(|| Error::malformed(rpc, line, "expected `BODY` after body marker"))?;
            if marker.is_some() {
                return Err(Error::malformed(rpc, line, "more than one BODY marker"));
            }
            marker = Some(found);
            rest = after.trim_start();
        } else {
            let token = rest.split_whitespace().next().unwrap_or(rest);
            return Err(Error::malformed(
                rpc,
                line,
                format!("unexpected `{}` after path", token),
            ));
        }
    }

    // GET never carries a body, whatever the marker says
    let omit_body = method == HttpMethod::Get || marker == Some(BodyMarker::Omit);

    Ok(Some(AnnotationRecord {
        method,
        raw_path: raw_path.to_string(),
        line: text.to_string(),
        omit_body,
        tags: tags.unwrap_or_default(),
    }))
}

fn split_tags(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

fn brace_error(path: &str) -> Option<&'static str> {
    let mut open = false;
    for c in path.chars() {
        match c {
            '{' if open => return Some("nested '{' in path"),
            '{' => open = true,
            '}' if !open => return Some("unbalanced '}' in path"),
            '}' => open = false,
            _ => {}
        }
    }
    if open {
        Some("unterminated '{' in path")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<AnnotationRecord>> {
        parse_line("Svc.Method", line)
    }

    #[test]
    fn test_full_annotation() {
        let record = parse("POST /users/{userId:int} - BODY [Users, Admin]")
            .unwrap()
            .unwrap();
        assert_eq!(record.method, HttpMethod::Post);
        assert_eq!(record.raw_path, "/users/{userId:int}");
        assert!(record.omit_body);
        assert_eq!(record.tags, vec!["Users", "Admin"]);
    }

    #[test]
    fn test_suffixes_in_any_order() {
        let record = parse("PUT /items [Items] - BODY").unwrap().unwrap();
        assert!(record.omit_body);
        assert_eq!(record.tags, vec!["Items"]);
    }

    #[test]
    fn test_defaults_without_suffixes() {
        let record = parse("  POST /items").unwrap().unwrap();
        assert_eq!(record.line, "POST /items");
        assert!(!record.omit_body);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_get_always_omits_body() {
        let plain = parse("GET /hello [Greeting]").unwrap().unwrap();
        assert!(plain.omit_body);
        assert_eq!(plain.tags, vec!["Greeting"]);

        let with_marker = parse("GET /hello - BODY").unwrap().unwrap();
        assert!(with_marker.omit_body);

        let forced = parse("GET /hello + BODY").unwrap().unwrap();
        assert!(forced.omit_body);
    }

    #[test]
    fn test_delete_honours_explicit_marker() {
        let record = parse("DELETE /users/{userId:int} - BODY").unwrap().unwrap();
        assert_eq!(record.method, HttpMethod::Delete);
        assert!(record.omit_body);

        let record = parse("DELETE /users/{userId:int}").unwrap().unwrap();
        assert!(!record.omit_body);
    }

    #[test]
    fn test_plus_body_keeps_body() {
        let record = parse("PUT /items + BODY").unwrap().unwrap();
        assert!(!record.omit_body);
    }

    #[test]
    fn test_empty_tag_list() {
        let record = parse("POST /items []").unwrap().unwrap();
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_non_annotation_lines() {
        assert_eq!(parse("Returns the current user.").unwrap(), None);
        assert_eq!(parse("get /lowercase").unwrap(), None);
        assert_eq!(parse("PATCH /users").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("GETTER /x").unwrap(), None);
    }

    #[test]
    fn test_missing_leading_slash() {
        let err = parse("GET users").unwrap_err();
        match err {
            Error::MalformedAnnotation { rpc, line, .. } => {
                assert_eq!(rpc, "Svc.Method");
                assert_eq!(line, "GET users");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_path() {
        assert!(matches!(parse("DELETE"), Err(Error::MalformedAnnotation { .. })));
    }

    #[test]
    fn test_unterminated_parameter() {
        let err = parse("GET /users/{id:int [Users]").unwrap_err();
        assert!(matches!(err, Error::MalformedAnnotation { ref reason, .. } if reason.contains("unterminated")));
    }

    #[test]
    fn test_unterminated_tag_list() {
        assert!(matches!(
            parse("POST /users [Users, Admin"),
            Err(Error::MalformedAnnotation { .. })
        ));
    }

    #[test]
    fn test_unexpected_trailing_token() {
        assert!(matches!(
            parse("POST /users - BOD"),
            Err(Error::MalformedAnnotation { .. })
        ));
        assert!(matches!(
            parse("POST /users creates a user"),
            Err(Error::MalformedAnnotation { .. })
        ));
    }

    #[test]
    fn test_parse_comment_block() {
        let comment = " Says hello.\n GET /hello [Greeting]\n\n Second line of docs.\n";
        let parsed = ParsedComment::parse("Greeter.Hello", comment).unwrap();
        assert_eq!(parsed.annotations.len(), 1);
        assert_eq!(parsed.annotations[0].raw_path, "/hello");
        assert_eq!(
            parsed.summary(),
            Some("Says hello. Second line of docs.".to_string())
        );
    }

    #[test]
    fn test_parse_comment_without_annotation() {
        let parsed = ParsedComment::parse("Greeter.Hello", " Internal only.\n").unwrap();
        assert!(parsed.annotations.is_empty());
    }

    #[test]
    fn test_parse_comment_multiple_bindings() {
        let comment = "GET /users/{id:int}\nPOST /users/{id:int}/lookup";
        let parsed = ParsedComment::parse("Users.Get", comment).unwrap();
        assert_eq!(parsed.annotations.len(), 2);
        assert_eq!(parsed.annotations[1].method, HttpMethod::Post);
        assert!(parsed.summary().is_none());
    }

    #[test]
    fn test_broken_annotation_aborts_comment() {
        let comment = "Docs\nPOST users";
        assert!(ParsedComment::parse("Users.Create", comment).is_err());
    }
}
