//! Ordered before-dispatch stages.
//!
//! Each stage reads the request snapshot and the visibility decision and
//! appends parameter mutations. Stages run in ascending priority; stages
//! with equal priority keep their registration order. Nothing is written to
//! the outgoing request until the host applies the returned [`Mutations`].

use std::fmt;

use crate::filter::LegacyFilterTranslator;
use crate::query::{QueryValue, RequestParams};
use crate::request::RequestContext;
use crate::visibility::VisibilityDecision;

/// Inputs shared by every stage of one request.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// The request snapshot
    pub ctx: &'a RequestContext,
    /// The decision taken once for this request
    pub decision: &'a VisibilityDecision,
    /// `true` if an earlier layer already produced a response
    pub already_served: bool,
}

/// A named, prioritized step of the before-dispatch pipeline.
pub trait Stage: fmt::Debug + Send + Sync {
    /// Stable name, recorded on every mutation the stage produces.
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> i32;

    /// Appends this stage's parameter mutations.
    fn before_dispatch(&self, input: &StageInput<'_>, mutations: &mut Mutations);
}

/// A single parameter write on the outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Stage that produced the write
    pub stage: &'static str,
    /// Parameter name
    pub name: String,
    /// New value
    pub value: QueryValue,
}

/// The ordered list of parameter writes for one request.
///
/// Later writes to the same parameter win when applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutations {
    items: Vec<Mutation>,
}

impl Mutations {
    /// Appends a write.
    pub fn set(&mut self, stage: &'static str, name: impl Into<String>, value: QueryValue) {
        self.items.push(Mutation {
            stage,
            name: name.into(),
            value,
        });
    }

    /// Returns the value the parameter will end up with, if any stage wrote it.
    pub fn value(&self, name: &str) -> Option<&QueryValue> {
        self.items
            .iter()
            .rev()
            .find(|m| m.name == name)
            .map(|m| &m.value)
    }

    /// Returns `true` if any stage wrote the parameter.
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|m| m.name == name)
    }

    /// Iterates the writes in order.
    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.items.iter()
    }

    /// Iterates the written parameter names in order (with repeats).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|m| m.name.as_str())
    }

    /// Returns the number of writes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no stage wrote anything.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Applies the writes, in order, to the outgoing request's parameters.
    pub fn apply_to(&self, params: &mut RequestParams) {
        for mutation in &self.items {
            params.insert(mutation.name.clone(), mutation.value.clone());
        }
    }
}

impl IntoIterator for Mutations {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Injects a default page size when the caller did not ask for one.
///
/// Skipped when a response was already produced, or when the primary query
/// string carries a non-empty `per_page`.
#[derive(Debug, Clone)]
pub struct DefaultPageSize {
    per_page: i64,
}

impl DefaultPageSize {
    /// Stage name.
    pub const NAME: &'static str = "default_page_size";

    /// Creates the stage with the page size to inject.
    pub fn new(per_page: i64) -> Self {
        Self { per_page }
    }
}

impl Stage for DefaultPageSize {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        1
    }

    fn before_dispatch(&self, input: &StageInput<'_>, mutations: &mut Mutations) {
        let explicit = input
            .ctx
            .query_param("per_page")
            .is_some_and(|v| !v.is_empty());
        if !input.already_served && !explicit {
            mutations.set(Self::NAME, "per_page", QueryValue::Integer(self.per_page));
        }
    }
}

/// Translates the legacy filter object into canonical parameters.
#[derive(Debug, Clone)]
pub struct LegacyFilterStage {
    translator: LegacyFilterTranslator,
}

impl LegacyFilterStage {
    /// Stage name.
    pub const NAME: &'static str = "legacy_filter";

    /// Wraps a translator.
    pub fn new(translator: LegacyFilterTranslator) -> Self {
        Self { translator }
    }
}

impl Stage for LegacyFilterStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        10
    }

    fn before_dispatch(&self, input: &StageInput<'_>, mutations: &mut Mutations) {
        let query = self.translator.translate(input.ctx, input.decision);
        for (name, value) in query {
            mutations.set(Self::NAME, name, value);
        }
    }
}

/// Constrains the collection query to the permitted statuses.
///
/// The filter translator only sets `status` when a filter object is present;
/// this stage covers every other request. An earlier `status` write wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusConstraint;

impl StatusConstraint {
    /// Stage name.
    pub const NAME: &'static str = "status_constraint";
}

impl Stage for StatusConstraint {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        20
    }

    fn before_dispatch(&self, input: &StageInput<'_>, mutations: &mut Mutations) {
        if !mutations.contains("status") {
            mutations.set(
                Self::NAME,
                "status",
                QueryValue::Statuses(input.decision.permitted_statuses().clone()),
            );
        }
    }
}

/// An ordered set of stages.
///
/// # Examples
///
/// ```
/// use content_gate::pipeline::{DefaultPageSize, Pipeline, StatusConstraint};
///
/// let pipeline = Pipeline::new()
///     .with_stage(StatusConstraint)
///     .with_stage(DefaultPageSize::new(10));
///
/// assert_eq!(pipeline.stage_names(), vec!["default_page_size", "status_constraint"]);
/// ```
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage, keeping the stages ordered by priority.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self.stages.sort_by_key(|s| s.priority());
        self
    }

    /// Returns the stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage and returns the accumulated writes.
    pub fn run(&self, input: &StageInput<'_>) -> Mutations {
        let mut mutations = Mutations::default();
        for stage in &self.stages {
            stage.before_dispatch(input, &mut mutations);
        }
        mutations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ContentStatus;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn run(pipeline: &Pipeline, ctx: &RequestContext, already_served: bool) -> Mutations {
        let decision = VisibilityDecision::published_only();
        pipeline.run(&StageInput {
            ctx,
            decision: &decision,
            already_served,
        })
    }

    #[test]
    fn default_page_size_applies_without_explicit_per_page() {
        let pipeline = Pipeline::new().with_stage(DefaultPageSize::new(10));
        let ctx = RequestContext::builder("req-1").build();
        let mutations = run(&pipeline, &ctx, false);
        assert_eq!(mutations.value("per_page"), Some(&QueryValue::Integer(10)));
    }

    #[test]
    fn default_page_size_respects_explicit_per_page() {
        let pipeline = Pipeline::new().with_stage(DefaultPageSize::new(10));
        let mut builder = RequestContext::builder("req-2");
        builder.add_query_param("per_page", "25");
        let mutations = run(&pipeline, &builder.build(), false);
        assert!(mutations.is_empty());
    }

    #[test]
    fn empty_per_page_counts_as_missing() {
        let pipeline = Pipeline::new().with_stage(DefaultPageSize::new(10));
        let mut builder = RequestContext::builder("req-3");
        builder.add_query_param("per_page", "");
        let mutations = run(&pipeline, &builder.build(), false);
        assert_eq!(mutations.value("per_page"), Some(&QueryValue::Integer(10)));
    }

    #[test]
    fn default_page_size_skipped_when_already_served() {
        let pipeline = Pipeline::new().with_stage(DefaultPageSize::new(10));
        let ctx = RequestContext::builder("req-4").build();
        assert!(run(&pipeline, &ctx, true).is_empty());
    }

    #[test]
    fn stages_run_in_priority_order() {
        let pipeline = Pipeline::new()
            .with_stage(StatusConstraint)
            .with_stage(LegacyFilterStage::new(LegacyFilterTranslator::default()))
            .with_stage(DefaultPageSize::new(10));
        assert_eq!(
            pipeline.stage_names(),
            vec!["default_page_size", "legacy_filter", "status_constraint"]
        );
    }

    #[test]
    fn filter_per_page_wins_over_default() {
        let pipeline = Pipeline::new()
            .with_stage(LegacyFilterStage::new(LegacyFilterTranslator::default()))
            .with_stage(DefaultPageSize::new(10));
        let mut builder = RequestContext::builder("req-5");
        builder.set_filter(json!({ "per_page": "5" }));
        let mutations = run(&pipeline, &builder.build(), false);

        let mut params = RequestParams::new();
        mutations.apply_to(&mut params);
        assert_eq!(params["per_page"], QueryValue::Integer(5));
        assert_eq!(mutations.iter().next().map(|m| m.stage), Some(DefaultPageSize::NAME));
    }

    #[test]
    fn status_constraint_fills_in_without_filter() {
        let pipeline = Pipeline::new()
            .with_stage(LegacyFilterStage::new(LegacyFilterTranslator::default()))
            .with_stage(StatusConstraint);
        let ctx = RequestContext::builder("req-6").build();
        let mutations = run(&pipeline, &ctx, false);

        assert_eq!(mutations.len(), 1);
        assert_eq!(
            mutations.value("status"),
            Some(&QueryValue::Statuses(BTreeSet::from([ContentStatus::Published])))
        );
    }

    #[test]
    fn status_constraint_defers_to_earlier_status() {
        let pipeline = Pipeline::new()
            .with_stage(LegacyFilterStage::new(LegacyFilterTranslator::default()))
            .with_stage(StatusConstraint);
        let mut builder = RequestContext::builder("req-7");
        builder.set_filter(json!({ "s": "news" }));
        let mutations = run(&pipeline, &builder.build(), false);

        let writers: Vec<_> = mutations
            .iter()
            .filter(|m| m.name == "status")
            .map(|m| m.stage)
            .collect();
        assert_eq!(writers, vec![LegacyFilterStage::NAME]);
    }

    #[test]
    fn equal_priority_keeps_registration_order() {
        #[derive(Debug)]
        struct Tag(&'static str);
        impl Stage for Tag {
            fn name(&self) -> &'static str {
                self.0
            }
            fn priority(&self) -> i32 {
                5
            }
            fn before_dispatch(&self, _input: &StageInput<'_>, mutations: &mut Mutations) {
                mutations.set(self.0, "tag", QueryValue::from(self.0));
            }
        }

        let pipeline = Pipeline::new().with_stage(Tag("first")).with_stage(Tag("second"));
        let ctx = RequestContext::builder("req-8").build();
        let mutations = run(&pipeline, &ctx, false);
        assert_eq!(mutations.value("tag"), Some(&QueryValue::Text("second".into())));
    }
}
