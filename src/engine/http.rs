//! HTTP invocation
//!
//! Turns a [`RequestConfiguration`] into a real request against the
//! OpenAPI-declared server, validates the response status against the
//! operation's declared success codes, and decodes the body without losing
//! 64-bit integer precision (serde_json keeps integers as i64/u64, so a
//! large server-assigned id round-trips exactly).

use crate::engine::call::{CallInfo, RequestConfiguration};
use crate::engine::EngineSettings;
use crate::error::{Error, Result};
use crate::schema::descriptor::ResourceDescription;
use crate::schema::openapi::Introspector;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, COOKIE};
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize a response body for logging: truncate and strip non-printable
/// characters.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// The decoded outcome of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Decoded body, or `None` for the bodyless 204/304 statuses.
    pub body: Option<Value>,
    pub status_code: u16,
}

impl Response {
    /// True for the informational and accepted-class codes that signal the
    /// server is still completing the operation asynchronously.
    pub fn is_pending(&self) -> bool {
        matches!(self.status_code, 100 | 102 | 202)
    }
}

/// One raw page as fetched from the wire, before decoding. Pagination
/// strategies read the headers and raw bytes to extract their cursor.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

/// Authentication callback, supplied by an external collaborator and
/// opaque to the engine: it mutates the outgoing request, typically by
/// attaching a bearer or basic credential, and may block on I/O of its
/// own (e.g. fetching a token).
pub trait Authenticator: Send + Sync {
    fn authenticate<'a>(
        &'a self,
        request: reqwest::RequestBuilder,
    ) -> BoxFuture<'a, Result<reqwest::RequestBuilder>>;
}

/// Static bearer-token authenticator.
pub struct BearerToken(pub String);

impl Authenticator for BearerToken {
    fn authenticate<'a>(
        &'a self,
        request: reqwest::RequestBuilder,
    ) -> BoxFuture<'a, Result<reqwest::RequestBuilder>> {
        Box::pin(async move { Ok(request.bearer_auth(&self.0)) })
    }
}

/// Observer of outgoing requests and incoming responses. The chain is
/// explicit and keyed by [`Interceptor::name`], so re-inserting the same
/// interceptor (as a pagination loop would, once per page) is a no-op.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;
    fn on_request(
        &self,
        method: &Method,
        url: &Url,
        headers: &BTreeMap<String, String>,
        body: Option<&Value>,
    );
    fn on_response(&self, status: u16, headers: &HeaderMap, body: &[u8]);
}

/// Debug interceptor dumping the full request and response through
/// `tracing`.
pub struct WireDump;

impl Interceptor for WireDump {
    fn name(&self) -> &'static str {
        "wire-dump"
    }

    fn on_request(
        &self,
        method: &Method,
        url: &Url,
        headers: &BTreeMap<String, String>,
        body: Option<&Value>,
    ) {
        let body = body.map(|body| body.to_string()).unwrap_or_default();
        tracing::debug!(%method, %url, ?headers, body = %body, "request");
    }

    fn on_response(&self, status: u16, headers: &HeaderMap, body: &[u8]) {
        tracing::debug!(
            status,
            ?headers,
            body = %sanitize_for_log(&String::from_utf8_lossy(body)),
            "response"
        );
    }
}

/// HTTP client for one resource description: the reqwest client, the
/// introspector over the OpenAPI document, the authentication callback,
/// and the interceptor chain.
pub struct RestClient {
    http: reqwest::Client,
    introspector: Introspector,
    authenticator: Option<Arc<dyn Authenticator>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    pub(crate) settings: EngineSettings,
}

impl RestClient {
    /// Build a client for a resource description.
    pub fn new(description: &ResourceDescription, settings: EngineSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("declarest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut client = Self {
            http,
            introspector: Introspector::new(Arc::clone(&description.document)),
            authenticator: description.authenticator.clone(),
            interceptors: Vec::new(),
            settings,
        };
        if settings.debug {
            client.ensure_interceptor(Arc::new(WireDump));
        }
        Ok(client)
    }

    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }

    /// Insert an interceptor unless one with the same name is already in
    /// the chain. Idempotent so pagination loops never stack duplicates.
    pub fn ensure_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        if self
            .interceptors
            .iter()
            .any(|existing| existing.name() == interceptor.name())
        {
            return;
        }
        self.interceptors.push(interceptor);
    }

    /// Number of interceptors currently in the chain.
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Resolve the final URL: substitute percent-escaped path parameters
    /// into the template, prepend the declared server URL, append the
    /// encoded query.
    fn resolve_url(&self, info: &CallInfo, conf: &RequestConfiguration) -> Result<Url> {
        let base = self.introspector.server_url(&info.method, &info.path)?;
        let mut path = info.path.clone();
        for (name, value) in &conf.parameters {
            path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
        }
        let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;
        if !conf.query.is_empty() {
            url.query_pairs_mut().extend_pairs(conf.query.iter());
        }
        Ok(url)
    }

    /// Execute one request and return the raw page after status
    /// validation. The full body is read before any interpretation.
    pub(crate) async fn execute(
        &self,
        info: &CallInfo,
        conf: &RequestConfiguration,
    ) -> Result<Page> {
        // Validate required parameters before any I/O happens.
        self.introspector.validate_request(
            &info.method,
            &info.path,
            &conf.parameters,
            &conf.query,
            &conf.headers,
            &conf.cookies,
        )?;

        let url = self.resolve_url(info, conf)?;
        tracing::debug!(method = %info.method, url = %url, "calling");

        let mut request = self.http.request(info.method.clone(), url.clone());

        // The body is serialized only when it is a non-empty document;
        // reqwest's json() sets Content-Type: application/json.
        let body = if conf.body.is_empty() {
            None
        } else {
            Some(Value::Object(conf.body.clone()))
        };
        if let Some(body) = &body {
            request = request.json(body);
        }

        for (name, value) in &conf.headers {
            request = request.header(name, value);
        }
        if !conf.cookies.is_empty() {
            let cookie = conf
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, cookie);
        }

        if let Some(authenticator) = &self.authenticator {
            request = authenticator.authenticate(request).await?;
        }

        for interceptor in &self.interceptors {
            interceptor.on_request(&info.method, &url, &conf.headers, body.as_ref());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let reason = response
            .status()
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?.to_vec();

        for interceptor in &self.interceptors {
            interceptor.on_response(status, &headers, &bytes);
        }

        let valid = self.introspector.valid_status_codes(&info.method, &info.path)?;
        if !valid.contains(&status) {
            tracing::error!(
                status,
                body = %sanitize_for_log(&String::from_utf8_lossy(&bytes)),
                "API error"
            );
            return Err(Error::Status {
                code: status,
                reason,
            });
        }

        Ok(Page {
            status,
            headers,
            bytes,
        })
    }

    /// Perform a single call and decode the outcome.
    pub async fn call(&self, info: &CallInfo, conf: &RequestConfiguration) -> Result<Response> {
        let page = self.execute(info, conf).await?;
        decode(&page)
    }
}

/// Decode a validated page into a [`Response`]. 204 and 304 may carry an
/// empty body; any other status with an empty body is an error.
pub(crate) fn decode(page: &Page) -> Result<Response> {
    if page.bytes.is_empty() {
        if matches!(page.status, 204 | 304) {
            return Ok(Response {
                body: None,
                status_code: page.status,
            });
        }
        return Err(Error::EmptyBody { code: page.status });
    }
    let body: Value = serde_json::from_slice(&page.bytes)?;
    Ok(Response {
        body: Some(body),
        status_code: page.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_statuses() {
        for code in [100u16, 102, 202] {
            let response = Response {
                body: None,
                status_code: code,
            };
            assert!(response.is_pending(), "{code} should be pending");
        }
        let done = Response {
            body: None,
            status_code: 200,
        };
        assert!(!done.is_pending());
    }

    #[test]
    fn decode_allows_empty_body_only_for_204_and_304() {
        let empty_204 = Page {
            status: 204,
            headers: HeaderMap::new(),
            bytes: Vec::new(),
        };
        assert_eq!(decode(&empty_204).unwrap().body, None);

        let empty_200 = Page {
            status: 200,
            headers: HeaderMap::new(),
            bytes: Vec::new(),
        };
        assert!(matches!(
            decode(&empty_200),
            Err(Error::EmptyBody { code: 200 })
        ));
    }

    #[test]
    fn decode_preserves_large_integers() {
        let page = Page {
            status: 200,
            headers: HeaderMap::new(),
            bytes: br#"{"id": 9007199254740993}"#.to_vec(),
        };
        let body = decode(&page).unwrap().body.unwrap();
        assert_eq!(body["id"].as_i64(), Some(9_007_199_254_740_993));
    }

    #[test]
    fn sanitize_truncates_and_strips() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("truncated"));
        assert_eq!(sanitize_for_log("ok\u{7}body"), "okbody");
    }
}
