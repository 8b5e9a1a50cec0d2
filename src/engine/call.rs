//! Call building and request-configuration merging
//!
//! [`build_api_call`] turns an action plus the declared descriptors into a
//! [`CallInfo`]; [`build_call_config`] merges the three value sources into
//! the final [`RequestConfiguration`] under a fixed precedence:
//!
//! 1. configuration-document values at `<locationKey>.<action>` (lowest,
//!    overwritten by explicit mappings),
//! 2. explicit field mappings from the descriptor,
//! 3. bare same-named fields from the resource's `spec`,
//! 4. bare same-named fields from the resource's `status`.
//!
//! Steps 3 and 4 only fill slots that are still unset: desired state is
//! authoritative over observed, and neither may override an explicit value.

use crate::compare::normalize::{display_value, normalize};
use crate::error::{Error, Result};
use crate::path;
use crate::schema::descriptor::{
    Action, FieldMappingItem, OperationDescriptor, PaginationConfig, ResourceDescription,
};
use crate::schema::openapi::{Introspector, ParamSets};
use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// How the engine dispatches a built call: findBy loops pages, everything
/// else performs a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Single,
    Paginated,
}

/// Everything the invocation engine needs to know about one call.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// OpenAPI path template.
    pub path: String,
    pub method: Method,
    pub action: Action,
    /// Path expressions naming the fields that identify "the same object"
    /// during search.
    pub identifier_fields: Vec<String>,
    pub field_mapping: Vec<FieldMappingItem>,
    /// Declared parameter names, bucketed by location.
    pub params: ParamSets,
    /// Top-level property names of the request body schema.
    pub body_params: BTreeSet<String>,
    pub pagination: Option<PaginationConfig>,
}

/// Accumulator for one outgoing request, populated by
/// [`build_call_config`] and consumed once by the invocation engine.
/// The body is always a document, even when empty.
#[derive(Debug, Clone, Default)]
pub struct RequestConfiguration {
    /// Path parameters, substituted into the path template.
    pub parameters: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: Map<String, Value>,
    pub method: Method,
}

fn parse_method(descriptor: &OperationDescriptor) -> Result<Method> {
    Method::from_bytes(descriptor.method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        Error::InvalidMethod {
            method: descriptor.method.clone(),
        }
    })
}

/// Select the first descriptor matching `action` (case-insensitive),
/// introspect its operation, and assemble the call.
pub fn build_api_call(
    description: &ResourceDescription,
    introspector: &Introspector,
    action: Action,
) -> Result<(CallInfo, CallKind)> {
    let descriptor = description
        .descriptors
        .iter()
        .find(|descriptor| descriptor.matches(action))
        .ok_or_else(|| Error::UnsupportedAction {
            action: action.to_string(),
        })?;

    let method = parse_method(descriptor)?;
    let params = introspector.requested_params(&method, &descriptor.path)?;
    let body_params = introspector.requested_body(&method, &descriptor.path)?;

    let kind = if action == Action::FindBy {
        CallKind::Paginated
    } else {
        CallKind::Single
    };

    Ok((
        CallInfo {
            path: descriptor.path.clone(),
            method,
            action,
            identifier_fields: description.identifiers.clone(),
            field_mapping: descriptor.request_field_mapping.clone(),
            params,
            body_params,
            pagination: descriptor.pagination.clone(),
        },
        kind,
    ))
}

/// Merge the configuration document, the declared field mappings, and the
/// resource's own fields into one request configuration.
pub fn build_call_config(
    info: &CallInfo,
    resource: &Value,
    configuration: &Value,
) -> Result<RequestConfiguration> {
    let mut conf = RequestConfiguration {
        method: info.method.clone(),
        ..RequestConfiguration::default()
    };

    apply_configuration_document(info, configuration, &mut conf);
    apply_field_mappings(info, resource, &mut conf)?;
    // spec before status: desired state is authoritative once known.
    apply_resource_fields(info, resource, "spec", &mut conf);
    apply_resource_fields(info, resource, "status", &mut conf);

    Ok(conf)
}

/// Step 1: operator-authored values, keyed `<locationKey>.<action>`.
fn apply_configuration_document(
    info: &CallInfo,
    configuration: &Value,
    conf: &mut RequestConfiguration,
) {
    let action = info.action.key();
    let locations: [(&str, &mut BTreeMap<String, String>); 4] = [
        ("path", &mut conf.parameters),
        ("query", &mut conf.query),
        ("headers", &mut conf.headers),
        ("cookies", &mut conf.cookies),
    ];
    for (location, slot) in locations {
        let Some(Value::Object(values)) = configuration
            .get(location)
            .and_then(|section| section.get(action))
        else {
            continue;
        };
        for (name, value) in values {
            slot.insert(name.clone(), display_value(value));
        }
    }
}

/// Step 2: explicit mappings. These are the primary contract for renames
/// and nesting, and they overwrite configuration-document values.
fn apply_field_mappings(
    info: &CallInfo,
    resource: &Value,
    conf: &mut RequestConfiguration,
) -> Result<()> {
    for mapping in &info.field_mapping {
        let source = path::parse(&mapping.in_custom_resource)?;
        let Some(value) = path::lookup(resource, &source) else {
            continue;
        };
        if let Some(name) = &mapping.in_path {
            conf.parameters.insert(name.clone(), display_value(value));
        } else if let Some(name) = &mapping.in_query {
            conf.query.insert(name.clone(), display_value(value));
        } else if let Some(target) = &mapping.in_body {
            let target = path::parse(target)?;
            path::set(&mut conf.body, &target, normalize(value));
        }
    }
    Ok(())
}

/// Steps 3 and 4: bare same-named fields, the convenience default for the
/// common case where the wire name equals the resource field name. Slots
/// already set are never overwritten.
fn apply_resource_fields(
    info: &CallInfo,
    resource: &Value,
    subtree: &str,
    conf: &mut RequestConfiguration,
) {
    let Some(Value::Object(fields)) = resource.get(subtree) else {
        return;
    };
    for (name, value) in fields {
        if info.params.path.contains(name) && !conf.parameters.contains_key(name) {
            conf.parameters.insert(name.clone(), display_value(value));
        }
        if info.params.query.contains(name) && !conf.query.contains_key(name) {
            conf.query.insert(name.clone(), display_value(value));
        }
        if info.body_params.contains(name) && !conf.body.contains_key(name) {
            conf.body.insert(name.clone(), normalize(value));
        }
    }
}

/// Whether the resource already carries everything the `get` action needs,
/// i.e. a server-assigned identifier is present. Decides at Observe time
/// between routing to `get` and searching via `findBy`.
pub fn is_resource_known(
    description: &ResourceDescription,
    introspector: &Introspector,
    resource: &Value,
) -> bool {
    let Ok((info, _)) = build_api_call(description, introspector, Action::Get) else {
        return false;
    };
    let Ok(conf) = build_call_config(&info, resource, &description.configuration) else {
        return false;
    };
    introspector
        .validate_request(
            &info.method,
            &info.path,
            &conf.parameters,
            &conf.query,
            &conf.headers,
            &conf.cookies,
        )
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn description() -> (ResourceDescription, Introspector) {
        let document: openapiv3::OpenAPI = serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "servers": [{"url": "https://api.example.com"}],
            "paths": {
                "/users/{id}": {
                    "get": {
                        "parameters": [
                            {"name": "id", "in": "path", "required": true,
                             "schema": {"type": "string"}}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                },
                "/users": {
                    "get": {
                        "parameters": [
                            {"name": "name", "in": "query", "schema": {"type": "string"}},
                            {"name": "limit", "in": "query", "schema": {"type": "integer"}}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    },
                    "post": {
                        "requestBody": {"content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "size": {"type": "integer"},
                                "metadata": {"type": "object"}
                            }
                        }}}},
                        "responses": {"201": {"description": "created"}}
                    }
                }
            }
        }))
        .unwrap();
        let document = Arc::new(document);
        let introspector = Introspector::new(Arc::clone(&document));
        let description = ResourceDescription {
            document,
            descriptors: vec![
                OperationDescriptor {
                    action: "get".into(),
                    method: "GET".into(),
                    path: "/users/{id}".into(),
                    request_field_mapping: vec![FieldMappingItem {
                        in_path: Some("id".into()),
                        in_custom_resource: "status.id".into(),
                        ..FieldMappingItem::default()
                    }],
                    pagination: None,
                },
                OperationDescriptor {
                    action: "create".into(),
                    method: "POST".into(),
                    path: "/users".into(),
                    request_field_mapping: vec![FieldMappingItem {
                        in_body: Some("metadata.displayName".into()),
                        in_custom_resource: "spec.title".into(),
                        ..FieldMappingItem::default()
                    }],
                    pagination: None,
                },
                OperationDescriptor {
                    action: "findBy".into(),
                    method: "GET".into(),
                    path: "/users".into(),
                    request_field_mapping: vec![FieldMappingItem {
                        in_query: Some("name".into()),
                        in_custom_resource: "spec.name".into(),
                        ..FieldMappingItem::default()
                    }],
                    pagination: None,
                },
            ],
            configuration: json!({"query": {"findBy": {"limit": 50}}}),
            identifiers: vec!["name".into()],
            authenticator: None,
        };
        (description, introspector)
    }

    #[test]
    fn action_selection_is_case_insensitive() {
        let (mut description, introspector) = description();
        description.descriptors[0].action = "GET".into();
        let (info, kind) = build_api_call(&description, &introspector, Action::Get).unwrap();
        assert_eq!(info.path, "/users/{id}");
        assert_eq!(kind, CallKind::Single);
    }

    #[test]
    fn find_by_routes_to_the_paginating_kind() {
        let (description, introspector) = description();
        let (_, kind) = build_api_call(&description, &introspector, Action::FindBy).unwrap();
        assert_eq!(kind, CallKind::Paginated);
    }

    #[test]
    fn unknown_action_is_a_typed_error() {
        let (mut description, introspector) = description();
        description.descriptors.clear();
        assert!(matches!(
            build_api_call(&description, &introspector, Action::Delete),
            Err(Error::UnsupportedAction { .. })
        ));
    }

    #[test]
    fn mapping_beats_bare_spec_field() {
        let (description, introspector) = description();
        let (info, _) = build_api_call(&description, &introspector, Action::FindBy).unwrap();
        // `name` exists both as a mapped query parameter (from spec.name)
        // and as a bare spec field; the mapping wins.
        let resource = json!({"spec": {"name": "mapped-value"}});
        let conf = build_call_config(&info, &resource, &description.configuration).unwrap();
        assert_eq!(conf.query.get("name").map(String::as_str), Some("mapped-value"));
    }

    #[test]
    fn mapping_beats_configuration_document() {
        let (mut description, introspector) = description();
        description.configuration = json!({"query": {"findBy": {"name": "hardcoded"}}});
        let (info, _) = build_api_call(&description, &introspector, Action::FindBy).unwrap();
        let resource = json!({"spec": {"name": "from-mapping"}});
        let conf = build_call_config(&info, &resource, &description.configuration).unwrap();
        assert_eq!(conf.query.get("name").map(String::as_str), Some("from-mapping"));
    }

    #[test]
    fn configuration_document_fills_untouched_slots() {
        let (description, introspector) = description();
        let (info, _) = build_api_call(&description, &introspector, Action::FindBy).unwrap();
        let conf = build_call_config(&info, &json!({}), &description.configuration).unwrap();
        assert_eq!(conf.query.get("limit").map(String::as_str), Some("50"));
    }

    #[test]
    fn spec_wins_over_status_for_bare_fields() {
        let (description, introspector) = description();
        let (info, _) = build_api_call(&description, &introspector, Action::Create).unwrap();
        let resource = json!({
            "spec": {"name": "desired", "size": 3},
            "status": {"name": "observed", "size": 9}
        });
        let conf = build_call_config(&info, &resource, &json!({})).unwrap();
        assert_eq!(conf.body.get("name"), Some(&json!("desired")));
        assert_eq!(conf.body.get("size"), Some(&json!(3)));
    }

    #[test]
    fn body_mappings_write_nested_paths() {
        let (description, introspector) = description();
        let (info, _) = build_api_call(&description, &introspector, Action::Create).unwrap();
        let resource = json!({"spec": {"title": "My Thing"}});
        let conf = build_call_config(&info, &resource, &json!({})).unwrap();
        assert_eq!(
            Value::Object(conf.body.clone()),
            json!({"metadata": {"displayName": "My Thing"}})
        );
    }

    #[test]
    fn body_is_a_document_even_when_empty() {
        let (description, introspector) = description();
        let (info, _) = build_api_call(&description, &introspector, Action::Get).unwrap();
        let conf = build_call_config(&info, &json!({}), &json!({})).unwrap();
        assert!(conf.body.is_empty());
    }

    #[test]
    fn resource_known_iff_get_validates() {
        let (description, introspector) = description();
        // No server-assigned id yet: the get call cannot be built validly.
        let fresh = json!({"spec": {"name": "x"}});
        assert!(!is_resource_known(&description, &introspector, &fresh));

        let adopted = json!({"spec": {"name": "x"}, "status": {"id": "abc"}});
        assert!(is_resource_known(&description, &introspector, &adopted));
    }
}
