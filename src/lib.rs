//! Request normalization and preview-aware visibility gating for content APIs.
//!
//! This crate sits between a host HTTP layer and a content engine's REST
//! collection and single-resource endpoints. It provides:
//! - **Visibility decisions**: whether drafts, scheduled and pending content
//!   may be exposed, derived from request headers and path only
//! - **Legacy filter translation**: the nested `filter[...]` query syntax of
//!   older clients rewritten into canonical collection parameters
//! - **Default paging**: a page size injected when the caller sent none
//! - **Schema relaxation**: a startup pass widening declared `per_page`,
//!   `orderby` and `order` constraints
//!
//! # Core Types
//!
//! - [`RequestContext`]: Immutable per-request snapshot of headers, path and query
//! - [`VisibilityPolicy`]: Decides visibility and gates single resources
//! - [`LegacyFilterTranslator`]: Filter object to [`NormalizedQuery`]
//! - [`CollectionParameterRelaxer`]: Widens endpoint constraints at startup
//! - [`RequestNormalizationMiddleware`]: Runs the above at the two hook points
//!
//! # Examples
//!
//! ```
//! use content_gate::{GateConfig, QueryVars, RequestContext, RequestNormalizationMiddleware};
//! use content_gate::query::{QueryValue, RequestParams};
//!
//! let middleware = RequestNormalizationMiddleware::new(&GateConfig::default(), &QueryVars::new());
//!
//! let mut builder = RequestContext::from_uri("req-1", "/posts?filter[post__in][]=3&filter[post__in][]=0")
//!     .expect("valid uri");
//! builder.add_header("Preview", "true");
//! let ctx = builder.build();
//!
//! let scope = middleware.begin(&ctx);
//! let mut params = RequestParams::new();
//! scope.before_dispatch(false).apply_to(&mut params);
//!
//! assert_eq!(params["include"], QueryValue::IntegerList(vec![3]));
//! assert_eq!(params["per_page"], QueryValue::Integer(10));
//! assert!(scope.decision().include_non_published());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coerce;
pub mod config;
mod error;
mod filter;
mod logging;
mod middleware;
pub mod pipeline;
pub mod query;
mod request;
mod schema;
mod status;
mod visibility;

pub use config::GateConfig;
pub use error::{AccessDenied, ConfigError, DenialKind, Error, InvalidUri};
pub use filter::{
    LegacyFilterTranslator, QueryVarSource, QueryVars, INTEGER_FILTER_KEYS,
    LEGACY_FILTER_MAPPING, META_QUERY_VARS, RECOGNIZED_FILTER_KEYS,
};
pub use logging::{RequestLog, AUDIT_TARGET, LOG_TARGET};
pub use middleware::{RequestNormalizationMiddleware, RequestScope};
pub use query::{NormalizedQuery, QueryValue};
pub use request::{RequestContext, RequestContextBuilder};
pub use schema::{
    CollectionParameterRelaxer, CollectionSchemaEntry, EndpointRegistry, EndpointSchemas,
    ParamConstraint,
};
pub use status::{ContentStatus, ContentType, ParseStatusError};
pub use visibility::{ResourceItem, VisibilityDecision, VisibilityPolicy};
