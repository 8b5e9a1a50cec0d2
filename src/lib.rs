//! declarest - schema-driven REST invocation engine
//!
//! Drives an arbitrary REST API on behalf of a declarative resource
//! record, using only metadata: an OpenAPI description of the remote API
//! and a small set of field-mapping rules. A control loop (external to
//! this crate) decides *when* to observe, create, update or delete; this
//! crate knows *how* to turn those intents into valid HTTP calls, locate
//! the external object among list results, and detect drift between
//! desired and observed state.
//!
//! # Module Structure
//!
//! - [`path`] - field-path expression parsing and document access
//! - [`schema`] - operation descriptors and OpenAPI introspection
//! - [`engine`] - call building, HTTP invocation, pagination, matching
//! - [`compare`] - drift comparison and value normalization
//! - [`error`] - the typed error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use declarest::engine::call::{build_api_call, build_call_config};
//! use declarest::engine::http::RestClient;
//! use declarest::engine::EngineSettings;
//! use declarest::schema::descriptor::Action;
//!
//! async fn observe(description: &declarest::schema::descriptor::ResourceDescription,
//!                  resource: &serde_json::Value) -> declarest::Result<()> {
//!     let client = RestClient::new(description, EngineSettings::default())?;
//!     let (info, _) = build_api_call(description, client.introspector(), Action::FindBy)?;
//!     let conf = build_call_config(&info, resource, &description.configuration)?;
//!     let found = client.find_by(&info, &conf, resource).await?;
//!     tracing::debug!(?found.status_code, "located external object");
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod engine;
pub mod error;
pub mod path;
pub mod schema;

pub use compare::{compare_existing, ComparisonResult, Reason};
pub use engine::call::{
    build_api_call, build_call_config, is_resource_known, CallInfo, CallKind, RequestConfiguration,
};
pub use engine::http::{Authenticator, BearerToken, Interceptor, Response, RestClient, WireDump};
pub use engine::paginate::Paginator;
pub use engine::EngineSettings;
pub use error::{Error, Result};
pub use schema::descriptor::{
    Action, FieldMappingItem, MatchPolicy, OperationDescriptor, PaginationConfig,
    ResourceDescription,
};
pub use schema::openapi::{load_document, Introspector};
