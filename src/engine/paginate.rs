//! Pagination strategies
//!
//! A [`Paginator`] lives for exactly one FindBy invocation: it mutates
//! each page's request with its cursor and decides after each page whether
//! another fetch is worthwhile. The engine is strategy-agnostic; adding a
//! strategy means a new implementation here, not a caller change.

use crate::engine::call::RequestConfiguration;
use crate::engine::http::Page;
use crate::error::Result;
use crate::path;
use crate::schema::descriptor::{
    ContinuationTokenConfig, PaginationConfig, RequestTokenIn, ResponseTokenIn,
};
use serde_json::Value;

pub trait Paginator: Send {
    /// Reset strategy state before the first page.
    fn init(&mut self);

    /// Called before sending each page's request; adds the cursor.
    fn update_request(&mut self, conf: &mut RequestConfiguration) -> Result<()>;

    /// Called after each page to decide whether to fetch another.
    fn should_continue(&mut self, page: &Page) -> Result<bool>;
}

/// Build the paginator for a descriptor's pagination config. No config
/// means FindBy performs exactly one call.
pub(crate) fn for_config(config: Option<&PaginationConfig>) -> Box<dyn Paginator> {
    match config {
        None => Box::new(SinglePage),
        Some(PaginationConfig::ContinuationToken { continuation_token }) => {
            Box::new(ContinuationToken::new(continuation_token.clone()))
        }
    }
}

/// Degenerate strategy: one page, never continue.
struct SinglePage;

impl Paginator for SinglePage {
    fn init(&mut self) {}

    fn update_request(&mut self, _conf: &mut RequestConfiguration) -> Result<()> {
        Ok(())
    }

    fn should_continue(&mut self, _page: &Page) -> Result<bool> {
        Ok(false)
    }
}

/// Opaque-cursor strategy: the API returns a token naming the next page,
/// and the next request carries it back. An empty or missing token ends
/// pagination.
pub struct ContinuationToken {
    config: ContinuationTokenConfig,
    token: Option<String>,
}

impl ContinuationToken {
    pub fn new(config: ContinuationTokenConfig) -> Self {
        Self {
            config,
            token: None,
        }
    }

    /// Extract the next token from a page, per the response-side config.
    fn next_token(&self, page: &Page) -> Result<Option<String>> {
        let token = match self.config.response.token_in {
            ResponseTokenIn::Header => page
                .headers
                .get(&self.config.response.token_path)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            ResponseTokenIn::Body => {
                let body: Value = match serde_json::from_slice(&page.bytes) {
                    Ok(body) => body,
                    Err(_) => return Ok(None),
                };
                path::lookup_path(&body, &self.config.response.token_path)?.map(|value| {
                    match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    }
                })
            }
        };
        Ok(token.filter(|token| !token.is_empty()))
    }
}

impl Paginator for ContinuationToken {
    fn init(&mut self) {
        self.token = None;
    }

    fn update_request(&mut self, conf: &mut RequestConfiguration) -> Result<()> {
        // First call, or no token extracted yet: nothing is added.
        let Some(token) = &self.token else {
            return Ok(());
        };
        match self.config.request.token_in {
            RequestTokenIn::Query => {
                conf.query
                    .insert(self.config.request.token_path.clone(), token.clone());
            }
            RequestTokenIn::Header => {
                conf.headers
                    .insert(self.config.request.token_path.clone(), token.clone());
            }
        }
        Ok(())
    }

    fn should_continue(&mut self, page: &Page) -> Result<bool> {
        match self.next_token(page)? {
            Some(token) => {
                tracing::debug!(token = %token, "continuation token found, fetching next page");
                self.token = Some(token);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
