//! OpenAPI introspection
//!
//! Reads the parsed OpenAPI v3 document to answer the engine's questions
//! about an operation: which parameters go where, which body properties
//! exist, which response codes are valid, and which server URL applies.
//! Schema composition (`allOf`) is flattened by a pure recursive walk that
//! returns a fresh property set, so shared sub-schemas are never mutated.

use crate::error::{Error, Result};
use openapiv3::{
    OpenAPI, Operation, Parameter, ParameterData, PathItem, ReferenceOr, Schema, SchemaKind,
    StatusCode, Type,
};
use reqwest::Method;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Declared parameter names for one operation, bucketed by location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSets {
    pub path: BTreeSet<String>,
    pub query: BTreeSet<String>,
    pub headers: BTreeSet<String>,
    pub cookies: BTreeSet<String>,
}

/// Read-only view over a parsed, reference-resolved OpenAPI document.
#[derive(Clone)]
pub struct Introspector {
    document: Arc<OpenAPI>,
}

/// Parse an OpenAPI document from YAML text (JSON is a YAML subset, so
/// this accepts both).
pub fn load_document(text: &str) -> Result<OpenAPI> {
    serde_yaml::from_str(text).map_err(|e| Error::Document(e.to_string()))
}

fn parameter_data(parameter: &Parameter) -> &ParameterData {
    match parameter {
        Parameter::Query { parameter_data, .. }
        | Parameter::Header { parameter_data, .. }
        | Parameter::Path { parameter_data, .. }
        | Parameter::Cookie { parameter_data, .. } => parameter_data,
    }
}

impl Introspector {
    pub fn new(document: Arc<OpenAPI>) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &OpenAPI {
        &self.document
    }

    /// Look up the operation declared for `(method, path)`, failing if the
    /// path or the method slot is absent.
    fn operation(&self, method: &Method, path: &str) -> Result<(&PathItem, &Operation)> {
        let item = self
            .document
            .paths
            .paths
            .get(path)
            .and_then(|entry| entry.as_item())
            .ok_or_else(|| Error::PathNotFound {
                path: path.to_string(),
            })?;

        let operation = match method.as_str() {
            "GET" => item.get.as_ref(),
            "PUT" => item.put.as_ref(),
            "POST" => item.post.as_ref(),
            "DELETE" => item.delete.as_ref(),
            "OPTIONS" => item.options.as_ref(),
            "HEAD" => item.head.as_ref(),
            "PATCH" => item.patch.as_ref(),
            "TRACE" => item.trace.as_ref(),
            _ => None,
        }
        .ok_or_else(|| Error::OperationNotFound {
            method: method.to_string(),
            path: path.to_string(),
        })?;

        Ok((item, operation))
    }

    /// All parameters that apply to the operation: path-item-level ones
    /// merged with operation-level ones. `#/components/parameters/` refs
    /// are followed one hop.
    fn parameters<'a>(
        &'a self,
        item: &'a PathItem,
        operation: &'a Operation,
    ) -> Result<Vec<&'a Parameter>> {
        item.parameters
            .iter()
            .chain(operation.parameters.iter())
            .map(|p| match p {
                ReferenceOr::Item(parameter) => Ok(parameter),
                ReferenceOr::Reference { reference } => self.resolve_parameter(reference),
            })
            .collect()
    }

    fn resolve_parameter(&self, reference: &str) -> Result<&Parameter> {
        let unresolved = || Error::UnresolvedReference {
            reference: reference.to_string(),
        };
        let name = reference
            .strip_prefix("#/components/parameters/")
            .ok_or_else(unresolved)?;
        let parameter = self
            .document
            .components
            .as_ref()
            .and_then(|components| components.parameters.get(name))
            .ok_or_else(unresolved)?;
        match parameter {
            ReferenceOr::Item(parameter) => Ok(parameter),
            ReferenceOr::Reference { .. } => Err(unresolved()),
        }
    }

    /// Declared parameter names bucketed by location.
    pub fn requested_params(&self, method: &Method, path: &str) -> Result<ParamSets> {
        let (item, operation) = self.operation(method, path)?;
        let mut sets = ParamSets::default();
        for parameter in self.parameters(item, operation)? {
            let name = parameter_data(parameter).name.clone();
            match parameter {
                Parameter::Path { .. } => sets.path.insert(name),
                Parameter::Query { .. } => sets.query.insert(name),
                Parameter::Header { .. } => sets.headers.insert(name),
                Parameter::Cookie { .. } => sets.cookies.insert(name),
            };
        }
        Ok(sets)
    }

    /// Top-level property names of the operation's JSON request body.
    ///
    /// `allOf` compositions are flattened recursively and array-typed
    /// bodies recurse into their item schema, so a property declared only
    /// through composition is still discoverable. Operations without a
    /// request body yield an empty set.
    pub fn requested_body(&self, method: &Method, path: &str) -> Result<BTreeSet<String>> {
        let (_, operation) = self.operation(method, path)?;
        let mut properties = BTreeSet::new();

        let Some(request_body) = operation.request_body.as_ref() else {
            return Ok(properties);
        };
        let request_body = match request_body {
            ReferenceOr::Item(body) => body,
            ReferenceOr::Reference { reference } => {
                return Err(Error::UnresolvedReference {
                    reference: reference.clone(),
                })
            }
        };

        let media = request_body
            .content
            .iter()
            .find(|(content_type, _)| content_type.contains("json"))
            .or_else(|| request_body.content.iter().next());
        let Some((_, media)) = media else {
            return Ok(properties);
        };
        if let Some(schema) = media.schema.as_ref() {
            let schema = self.resolve(schema)?;
            self.collect_properties(schema, &mut properties)?;
        }
        Ok(properties)
    }

    /// Fail if any required declared parameter is absent from the supplied
    /// maps. Authorization-style headers are implicitly satisfied: they
    /// are injected by the authentication callback, not user-supplied.
    pub fn validate_request(
        &self,
        method: &Method,
        path: &str,
        parameters: &BTreeMap<String, String>,
        query: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
        cookies: &BTreeMap<String, String>,
    ) -> Result<()> {
        let (item, operation) = self.operation(method, path)?;
        for parameter in self.parameters(item, operation)? {
            let data = parameter_data(parameter);
            if !data.required {
                continue;
            }
            let (location, present) = match parameter {
                Parameter::Path { .. } => ("path", parameters.contains_key(&data.name)),
                Parameter::Query { .. } => ("query", query.contains_key(&data.name)),
                Parameter::Header { .. } => {
                    if data.name.to_ascii_lowercase().contains("authorization") {
                        continue;
                    }
                    // Header names are case-insensitive on the wire.
                    let present = headers
                        .keys()
                        .any(|name| name.eq_ignore_ascii_case(&data.name));
                    ("header", present)
                }
                Parameter::Cookie { .. } => ("cookie", cookies.contains_key(&data.name)),
            };
            if !present {
                return Err(Error::MissingParameter {
                    location,
                    name: data.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// The operation's declared success codes: every literal response code
    /// in [200, 300). Ranges like `2XX` and `default` do not count.
    pub fn valid_status_codes(&self, method: &Method, path: &str) -> Result<BTreeSet<u16>> {
        let (_, operation) = self.operation(method, path)?;
        Ok(operation
            .responses
            .responses
            .keys()
            .filter_map(|status| match status {
                StatusCode::Code(code) if (200..300).contains(code) => Some(*code),
                _ => None,
            })
            .collect())
    }

    /// The server URL for an operation: the first operation-level server
    /// override if one is declared, otherwise the document's first server.
    pub fn server_url(&self, method: &Method, path: &str) -> Result<String> {
        let (_, operation) = self.operation(method, path)?;
        operation
            .servers
            .first()
            .or_else(|| self.document.servers.first())
            .map(|server| server.url.clone())
            .ok_or_else(|| Error::NoServer {
                path: path.to_string(),
            })
    }

    fn resolve<'a>(&'a self, schema: &'a ReferenceOr<Schema>) -> Result<&'a Schema> {
        match schema {
            ReferenceOr::Item(schema) => Ok(schema),
            ReferenceOr::Reference { reference } => self.resolve_reference(reference),
        }
    }

    fn resolve_boxed<'a>(&'a self, schema: &'a ReferenceOr<Box<Schema>>) -> Result<&'a Schema> {
        match schema {
            ReferenceOr::Item(schema) => Ok(schema),
            ReferenceOr::Reference { reference } => self.resolve_reference(reference),
        }
    }

    /// Resolve a `#/components/schemas/` reference against the document.
    /// Anything else should have been resolved upstream and is an error.
    fn resolve_reference(&self, reference: &str) -> Result<&Schema> {
        let unresolved = || Error::UnresolvedReference {
            reference: reference.to_string(),
        };
        let name = reference
            .strip_prefix("#/components/schemas/")
            .ok_or_else(unresolved)?;
        let schema = self
            .document
            .components
            .as_ref()
            .and_then(|components| components.schemas.get(name))
            .ok_or_else(unresolved)?;
        match schema {
            ReferenceOr::Item(schema) => Ok(schema),
            // A reference to a reference; one hop is all we follow.
            ReferenceOr::Reference { .. } => Err(unresolved()),
        }
    }

    fn collect_properties(&self, schema: &Schema, out: &mut BTreeSet<String>) -> Result<()> {
        match &schema.schema_kind {
            SchemaKind::Type(Type::Object(object)) => {
                out.extend(object.properties.keys().cloned());
            }
            SchemaKind::Type(Type::Array(array)) => {
                if let Some(items) = array.items.as_ref() {
                    self.collect_properties(self.resolve_boxed(items)?, out)?;
                }
            }
            SchemaKind::AllOf { all_of } => {
                for part in all_of {
                    self.collect_properties(self.resolve(part)?, out)?;
                }
            }
            SchemaKind::Any(any) => {
                out.extend(any.properties.keys().cloned());
            }
            _ => {}
        }
        Ok(())
    }
}
