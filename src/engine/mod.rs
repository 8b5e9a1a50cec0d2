//! The invocation engine
//!
//! One call chain per reconciliation: build the call from descriptors,
//! merge the request configuration, invoke, optionally paginate, match.
//! The engine is stateless across calls; the only cursor is a paginator
//! scoped to a single FindBy.
//!
//! - [`call`] - call builder and request-configuration builder
//! - [`http`] - the HTTP invocation engine and wire-dump interceptors
//! - [`paginate`] - pagination strategy abstraction
//! - [`findby`] - item extraction and identifier matching

pub mod call;
pub mod findby;
pub mod http;
pub mod paginate;

use crate::schema::descriptor::MatchPolicy;

/// Process-wide engine configuration, passed explicitly at construction
/// rather than read from the environment at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineSettings {
    /// How FindBy combines multiple identifier fields. Defaults to OR.
    pub match_policy: MatchPolicy,
    /// When set, a wire-dump interceptor logs every request and response.
    pub debug: bool,
}
