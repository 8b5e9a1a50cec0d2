//! Item matching ("FindBy")
//!
//! Locates the external object corresponding to a resource inside a list
//! response: normalize the body into candidate items, then match each
//! candidate's identifier fields against the resource's desired (then
//! observed) values under the configured AND/OR policy.

use crate::compare::loose_equal;
use crate::engine::call::{CallInfo, RequestConfiguration};
use crate::engine::http::{decode, Response, RestClient};
use crate::engine::paginate;
use crate::error::{Error, Result};
use crate::path;
use crate::schema::descriptor::MatchPolicy;
use serde_json::Value;

/// Normalize a response body into a uniform candidate list.
///
/// Three shapes are recognized: the body is already an array; the body is
/// a document whose first array-valued property holds the items (the
/// property name is not assumed - when more than one array property
/// exists, which one wins is order-dependent, a known limitation); or the
/// body is a single object, treated as a one-element list. An object with
/// zero keys yields an empty list.
pub fn extract_items(body: &Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => {
            if map.is_empty() {
                return Ok(Vec::new());
            }
            if let Some(items) = map.values().find_map(Value::as_array) {
                return Ok(items.clone());
            }
            Ok(vec![body.clone()])
        }
        _ => Err(Error::UnexpectedBody(
            "expected an object or array response".into(),
        )),
    }
}

/// The resource-side value for an identifier: desired fields first, then
/// observed fields as a fallback.
fn resource_value<'a>(resource: &'a Value, segments: &[String]) -> Option<&'a Value> {
    resource
        .get("spec")
        .and_then(|spec| path::lookup(spec, segments))
        .or_else(|| {
            resource
                .get("status")
                .and_then(|status| path::lookup(status, segments))
        })
}

/// Whether one candidate item matches the resource under the policy.
///
/// AND: every identifier must individually match; a missing value on
/// either side short-circuits false. OR (the default): the first positive
/// match wins, and an identifier absent from the item is skipped rather
/// than counted as a mismatch. No configured identifiers never matches.
fn is_item_match(
    item: &Value,
    resource: &Value,
    identifiers: &[String],
    policy: MatchPolicy,
) -> Result<bool> {
    if identifiers.is_empty() {
        return Ok(false);
    }
    match policy {
        MatchPolicy::And => {
            for identifier in identifiers {
                let segments = path::parse(identifier)?;
                let Some(candidate) = path::lookup(item, &segments) else {
                    return Ok(false);
                };
                let Some(local) = resource_value(resource, &segments) else {
                    return Ok(false);
                };
                if !loose_equal(candidate, local) {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        MatchPolicy::Or => {
            for identifier in identifiers {
                let segments = path::parse(identifier)?;
                let Some(candidate) = path::lookup(item, &segments) else {
                    continue;
                };
                let Some(local) = resource_value(resource, &segments) else {
                    continue;
                };
                if loose_equal(candidate, local) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// First item matching the resource, skipping candidates that are not
/// key-value documents.
pub fn find_match(
    items: &[Value],
    resource: &Value,
    identifiers: &[String],
    policy: MatchPolicy,
) -> Result<Option<Value>> {
    for item in items {
        if !item.is_object() {
            continue;
        }
        if is_item_match(item, resource, identifiers, policy)? {
            return Ok(Some(item.clone()));
        }
    }
    Ok(None)
}

impl RestClient {
    /// Dispatch a built call: findBy routes to the paginating search,
    /// everything else performs a single call.
    pub async fn perform(
        &self,
        kind: crate::engine::call::CallKind,
        info: &CallInfo,
        conf: &RequestConfiguration,
        resource: &Value,
    ) -> Result<Response> {
        match kind {
            crate::engine::call::CallKind::Single => self.call(info, conf).await,
            crate::engine::call::CallKind::Paginated => self.find_by(info, conf, resource).await,
        }
    }

    /// Locate the resource's external object, paging as configured.
    ///
    /// Pages are fetched strictly in sequence; a match returns immediately
    /// without fetching further pages. Exhausting all pages (or the single
    /// call, when no pagination is configured) without a match is the
    /// typed [`Error::NotFound`], distinguishable from transport or status
    /// failures.
    pub async fn find_by(
        &self,
        info: &CallInfo,
        conf: &RequestConfiguration,
        resource: &Value,
    ) -> Result<Response> {
        let mut paginator = paginate::for_config(info.pagination.as_ref());
        paginator.init();

        loop {
            let mut page_conf = conf.clone();
            paginator.update_request(&mut page_conf)?;

            let page = self.execute(info, &page_conf).await?;
            let response = decode(&page)?;

            if let Some(body) = response.body.as_ref() {
                let items = extract_items(body)?;
                tracing::debug!(candidates = items.len(), "matching page items");
                if let Some(item) = find_match(
                    &items,
                    resource,
                    &info.identifier_fields,
                    self.settings.match_policy,
                )? {
                    return Ok(Response {
                        body: Some(item),
                        status_code: response.status_code,
                    });
                }
            }

            if !paginator.should_continue(&page)? {
                return Err(Error::NotFound);
            }
        }
    }
}
