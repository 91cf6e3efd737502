//! Request normalization middleware.
//!
//! The host calls the middleware at two points of every request:
//!
//! ```text
//! incoming request
//!   ↓  RequestContext (built once)
//! decide()                  → VisibilityDecision (once per request)
//!   ↓
//! before_dispatch()         → Mutations applied to the outgoing request
//!   ↓
//! content engine runs the collection query / loads the single resource
//!   ↓
//! after_prepare()           → original response, or AccessDenied (403)
//! ```
//!
//! [`RequestScope`] bundles the three calls so the decision cannot be
//! recomputed or swapped between them.

use crate::config::GateConfig;
use crate::error::AccessDenied;
use crate::filter::{LegacyFilterTranslator, QueryVarSource, QueryVars};
use crate::logging::RequestLog;
use crate::pipeline::{
    DefaultPageSize, LegacyFilterStage, Mutations, Pipeline, Stage, StageInput, StatusConstraint,
};
use crate::request::RequestContext;
use crate::visibility::{ResourceItem, VisibilityDecision, VisibilityPolicy};

/// Orchestrates visibility, filter translation and default paging.
///
/// Holds only read-only configuration; one instance serves all requests
/// concurrently.
///
/// # Examples
///
/// ```
/// use content_gate::{
///     ContentStatus, ContentType, GateConfig, QueryVars, RequestContext,
///     RequestNormalizationMiddleware, ResourceItem,
/// };
///
/// let middleware = RequestNormalizationMiddleware::new(&GateConfig::default(), &QueryVars::new());
/// let ctx = RequestContext::from_uri("req-1", "/posts?filter[post__in][]=3").unwrap().build();
///
/// let scope = middleware.begin(&ctx);
/// let mutations = scope.before_dispatch(false);
/// assert_eq!(mutations.value("per_page").and_then(|v| v.as_integer()), Some(10));
///
/// let draft = ResourceItem::new(ContentType::new("post"), ContentStatus::Draft);
/// assert!(scope.after_prepare("payload", &draft).is_err());
/// ```
#[derive(Debug)]
pub struct RequestNormalizationMiddleware {
    policy: VisibilityPolicy,
    pipeline: Pipeline,
    query_vars: QueryVars,
}

impl RequestNormalizationMiddleware {
    /// Builds the middleware with the standard stages.
    ///
    /// The engine's recognized query variables are snapshotted and extended
    /// with the meta and taxonomy variables; hand [`query_vars`](Self::query_vars)
    /// back to the engine so it honors them too.
    pub fn new(config: &GateConfig, engine_vars: &impl QueryVarSource) -> Self {
        let query_vars = QueryVars::from_source(engine_vars).with_meta_vars();
        let pipeline = Pipeline::new()
            .with_stage(DefaultPageSize::new(config.default_per_page))
            .with_stage(LegacyFilterStage::new(LegacyFilterTranslator::new(
                query_vars.clone(),
            )))
            .with_stage(StatusConstraint);

        Self {
            policy: VisibilityPolicy::new(config),
            pipeline,
            query_vars,
        }
    }

    /// Adds a host-defined stage.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.pipeline = self.pipeline.with_stage(stage);
        self
    }

    /// Returns the visibility policy.
    pub fn policy(&self) -> &VisibilityPolicy {
        &self.policy
    }

    /// Returns the before-dispatch pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the query variables the engine must recognize.
    pub fn query_vars(&self) -> &QueryVars {
        &self.query_vars
    }

    /// Starts handling a request: decides visibility once and scopes the
    /// remaining calls to that decision.
    pub fn begin<'a>(&'a self, ctx: &'a RequestContext) -> RequestScope<'a> {
        RequestScope {
            middleware: self,
            ctx,
            decision: self.decide(ctx),
        }
    }

    /// Derives the visibility decision for a request.
    pub fn decide(&self, ctx: &RequestContext) -> VisibilityDecision {
        let decision = self.policy.decide(ctx);
        RequestLog::new(ctx.request_id()).decision(&decision);
        decision
    }

    /// Computes the parameter writes for the outgoing request.
    ///
    /// Must run exactly once per request, before the content engine sees it.
    pub fn before_dispatch(
        &self,
        ctx: &RequestContext,
        decision: &VisibilityDecision,
        already_served: bool,
    ) -> Mutations {
        let mutations = self.pipeline.run(&StageInput {
            ctx,
            decision,
            already_served,
        });
        RequestLog::new(ctx.request_id()).mutations(&mutations);
        mutations
    }

    /// Gates a prepared single-resource response.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when `item` must be withheld; the host sends it
    /// in place of `response`.
    pub fn after_prepare<R>(
        &self,
        ctx: &RequestContext,
        response: R,
        item: &ResourceItem,
        decision: &VisibilityDecision,
    ) -> Result<R, AccessDenied> {
        match self.policy.authorize(item, decision) {
            Ok(()) => Ok(response),
            Err(denied) => {
                RequestLog::new(ctx.request_id()).denied(item);
                Err(denied)
            }
        }
    }
}

/// One request's view of the middleware, pinned to a single decision.
#[derive(Debug)]
pub struct RequestScope<'a> {
    middleware: &'a RequestNormalizationMiddleware,
    ctx: &'a RequestContext,
    decision: VisibilityDecision,
}

impl RequestScope<'_> {
    /// Returns the decision taken for this request.
    pub fn decision(&self) -> &VisibilityDecision {
        &self.decision
    }

    /// Returns the request snapshot.
    pub fn context(&self) -> &RequestContext {
        self.ctx
    }

    /// See [`RequestNormalizationMiddleware::before_dispatch`].
    pub fn before_dispatch(&self, already_served: bool) -> Mutations {
        self.middleware
            .before_dispatch(self.ctx, &self.decision, already_served)
    }

    /// See [`RequestNormalizationMiddleware::after_prepare`].
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` when `item` must be withheld.
    pub fn after_prepare<R>(&self, response: R, item: &ResourceItem) -> Result<R, AccessDenied> {
        self.middleware
            .after_prepare(self.ctx, response, item, &self.decision)
    }
}
