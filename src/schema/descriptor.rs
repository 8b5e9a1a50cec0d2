//! Operation descriptors - the declarative schema driving the engine
//!
//! Descriptors are externally authored (JSON or YAML), one per supported
//! action per resource kind, and decoded with serde into the shapes below.
//! They say *which* HTTP operation realizes an action and *where* each
//! resource field lands on the wire; the OpenAPI document says what the
//! operation itself looks like.

use crate::engine::http::Authenticator;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The actions a resource kind can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Get,
    Create,
    Update,
    Delete,
    List,
    FindBy,
}

impl Action {
    /// Case-insensitive parse; descriptor authors write `"findBy"`,
    /// `"FINDBY"` and `"findby"` interchangeably.
    pub fn parse(s: &str) -> Option<Action> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Action::Get),
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            "list" => Some(Action::List),
            "findby" => Some(Action::FindBy),
            _ => None,
        }
    }

    /// The key used for configuration-document lookups (`query.<action>`).
    pub fn key(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::List => "list",
            Action::FindBy => "findBy",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One declared field mapping. Exactly one of the three targets is set;
/// more than one is a configuration error on the author's side and the
/// first non-empty target wins here (best effort, not validated).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingItem {
    /// Target path parameter name.
    #[serde(default)]
    pub in_path: Option<String>,
    /// Target query parameter name.
    #[serde(default)]
    pub in_query: Option<String>,
    /// Target body position, possibly nested (`metadata.name`).
    #[serde(default)]
    pub in_body: Option<String>,
    /// Path expression into the resource document to read the value from.
    #[serde(default)]
    pub in_custom_resource: String,
}

/// Where the outbound continuation token is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestTokenIn {
    Query,
    Header,
}

/// Where the inbound continuation token is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseTokenIn {
    Header,
    Body,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestConfig {
    pub token_in: RequestTokenIn,
    /// Query/header key the token is sent under.
    pub token_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponseConfig {
    pub token_in: ResponseTokenIn,
    /// Header name, or a field-path into the body.
    pub token_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationTokenConfig {
    pub request: TokenRequestConfig,
    pub response: TokenResponseConfig,
}

/// Pagination configuration, tagged by strategy type. Adding a strategy
/// means adding a variant here and an arm in `engine::paginate`; callers
/// never change.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PaginationConfig {
    #[serde(rename = "continuationToken", rename_all = "camelCase")]
    ContinuationToken {
        continuation_token: ContinuationTokenConfig,
    },
}

/// One declared API action for a resource kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub action: String,
    pub method: String,
    /// OpenAPI path template, e.g. `/resources/{id}`.
    pub path: String,
    #[serde(default)]
    pub request_field_mapping: Vec<FieldMappingItem>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
}

impl OperationDescriptor {
    /// Whether this descriptor serves the given action (case-insensitive).
    pub fn matches(&self, action: Action) -> bool {
        Action::parse(&self.action) == Some(action)
    }
}

/// Identifier-match policy for FindBy. Sourced from engine configuration,
/// never from the environment at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchPolicy {
    And,
    /// The default: one matching identifier is enough.
    #[default]
    Or,
}

impl MatchPolicy {
    /// Parse a policy flag, falling back to OR for unset or invalid input.
    pub fn parse(s: &str) -> MatchPolicy {
        match s.to_ascii_uppercase().as_str() {
            "AND" => MatchPolicy::And,
            _ => MatchPolicy::Or,
        }
    }
}

/// Everything a collaborator supplies to manage one resource kind: the
/// parsed OpenAPI document, the declared operations, the operator-authored
/// configuration document, and the authentication callback.
#[derive(Clone)]
pub struct ResourceDescription {
    pub document: Arc<openapiv3::OpenAPI>,
    pub descriptors: Vec<OperationDescriptor>,
    /// Free-form document merged into requests at lowest precedence,
    /// keyed `<locationKey>.<action>`.
    pub configuration: Value,
    /// Path expressions naming the fields FindBy uses to recognize "this
    /// is the same external object".
    pub identifiers: Vec<String>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
}

impl fmt::Debug for ResourceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescription")
            .field("descriptors", &self.descriptors)
            .field("configuration", &self.configuration)
            .field("authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_parse_is_case_insensitive() {
        assert_eq!(Action::parse("FINDBY"), Some(Action::FindBy));
        assert_eq!(Action::parse("FindBy"), Some(Action::FindBy));
        assert_eq!(Action::parse("get"), Some(Action::Get));
        assert_eq!(Action::parse("observe"), None);
    }

    #[test]
    fn match_policy_defaults_to_or() {
        assert_eq!(MatchPolicy::parse("AND"), MatchPolicy::And);
        assert_eq!(MatchPolicy::parse("and"), MatchPolicy::And);
        assert_eq!(MatchPolicy::parse(""), MatchPolicy::Or);
        assert_eq!(MatchPolicy::parse("nonsense"), MatchPolicy::Or);
        assert_eq!(MatchPolicy::default(), MatchPolicy::Or);
    }

    #[test]
    fn descriptor_decodes_wire_shape() {
        let descriptor: OperationDescriptor = serde_json::from_value(json!({
            "action": "findBy",
            "method": "GET",
            "path": "/users",
            "requestFieldMapping": [
                {"inQuery": "userName", "inCustomResource": "spec.name"}
            ],
            "pagination": {
                "type": "continuationToken",
                "continuationToken": {
                    "request": {"tokenIn": "query", "tokenPath": "pageToken"},
                    "response": {"tokenIn": "header", "tokenPath": "X-Next-Token"}
                }
            }
        }))
        .unwrap();

        assert!(descriptor.matches(Action::FindBy));
        assert_eq!(descriptor.request_field_mapping.len(), 1);
        let Some(PaginationConfig::ContinuationToken { continuation_token }) =
            descriptor.pagination.as_ref()
        else {
            panic!("expected continuation token pagination");
        };
        assert_eq!(continuation_token.request.token_in, RequestTokenIn::Query);
        assert_eq!(continuation_token.response.token_path, "X-Next-Token");
    }
}
