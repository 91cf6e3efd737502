//! Legacy filter translation.
//!
//! Older clients send a nested `filter[...]` object using the content
//! engine's internal query variable names (`post__in`, `paged`, `s`, ...).
//! The translator turns that object into the canonical collection
//! parameters (`include`, `page`, `search`, ...), sanitizing integer lists
//! on the way. It never fails: unusable input is dropped.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::coerce::{coerce_integer, coerce_integer_list, positive_integer};
use crate::logging::RequestLog;
use crate::query::{NormalizedQuery, QueryValue};
use crate::request::RequestContext;
use crate::visibility::VisibilityDecision;

/// Legacy filter key to canonical parameter, applied in this order.
///
/// Injective on both sides. `post_status` is absent: the
/// visibility policy alone decides the `status` parameter.
pub const LEGACY_FILTER_MAPPING: [(&str, &str); 14] = [
    ("author__in", "author"),
    ("author__not_in", "author_exclude"),
    ("menu_order", "menu_order"),
    ("offset", "offset"),
    ("order", "order"),
    ("orderby", "orderby"),
    ("paged", "page"),
    ("post__in", "include"),
    ("post__not_in", "exclude"),
    ("post_name__in", "slug"),
    ("post_parent__in", "parent"),
    ("post_parent__not_in", "parent_exclude"),
    ("posts_per_page", "per_page"),
    ("s", "search"),
];

/// Filter keys whose values are coerced to integers before mapping.
pub const INTEGER_FILTER_KEYS: [&str; 7] = [
    "author__in",
    "author__not_in",
    "post__not_in",
    "post__in",
    "post_parent__in",
    "post_parent",
    "post_parent__not_in",
];

/// Filter keys the translator understands without an allow-list entry.
pub const RECOGNIZED_FILTER_KEYS: [&str; 17] = [
    "per_page",
    "author__in",
    "author__not_in",
    "post__not_in",
    "post__in",
    "menu_order",
    "offset",
    "order",
    "orderby",
    "paged",
    "post_parent__in",
    "post_parent",
    "post_parent__not_in",
    "s",
    "post_name__in",
    "post_status",
    "posts_per_page",
];

/// Query variables this crate asks the content engine to honor.
pub const META_QUERY_VARS: [&str; 5] = [
    "meta_key",
    "meta_value",
    "meta_compare",
    "meta_query",
    "tax_query",
];

/// Supplies the content engine's recognized query variables.
///
/// Implemented by the host's content engine adapter. Filter keys named here
/// are copied verbatim into the normalized query.
pub trait QueryVarSource {
    /// Returns the names of the query variables the engine accepts.
    fn recognized_query_vars(&self) -> Vec<String>;
}

/// An allow-list of extra query variables.
///
/// # Examples
///
/// ```
/// use content_gate::QueryVars;
///
/// let vars: QueryVars = ["year", "monthnum"].into_iter().collect();
/// let vars = vars.with_meta_vars();
///
/// assert!(vars.contains("year"));
/// assert!(vars.contains("tax_query"));
/// assert_eq!(vars.len(), 7);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryVars {
    vars: BTreeSet<String>,
}

impl QueryVars {
    /// Creates an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the allow-list published by a content engine.
    pub fn from_source(source: &impl QueryVarSource) -> Self {
        source.recognized_query_vars().into_iter().collect()
    }

    /// Adds a variable. Returns `false` if it was already present.
    pub fn register(&mut self, name: impl Into<String>) -> bool {
        self.vars.insert(name.into())
    }

    /// Adds the meta and taxonomy query variables. Idempotent.
    pub fn with_meta_vars(mut self) -> Self {
        for name in META_QUERY_VARS {
            self.register(name);
        }
        self
    }

    /// Returns `true` if `name` is allowed.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains(name)
    }

    /// Iterates the allowed names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(String::as_str)
    }

    /// Returns the number of allowed names.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if nothing is allowed.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for QueryVars {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl QueryVarSource for QueryVars {
    fn recognized_query_vars(&self) -> Vec<String> {
        self.vars.iter().cloned().collect()
    }
}

/// Translates a legacy filter object into canonical query parameters.
///
/// # Examples
///
/// ```
/// use content_gate::{LegacyFilterTranslator, QueryVars, RequestContext, VisibilityDecision};
/// use serde_json::json;
///
/// let mut builder = RequestContext::builder("req-1");
/// builder.set_filter(json!({ "per_page": "5", "post__in": ["3", "0", "abc", "7"] }));
/// let ctx = builder.build();
///
/// let translator = LegacyFilterTranslator::new(QueryVars::new());
/// let query = translator.translate(&ctx, &VisibilityDecision::published_only());
///
/// assert_eq!(query.per_page(), Some(5));
/// assert_eq!(query.get("include").unwrap().as_integer_list(), Some(&[3, 7][..]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LegacyFilterTranslator {
    query_vars: QueryVars,
}

impl LegacyFilterTranslator {
    /// Creates a translator honoring the given extra query variables.
    pub fn new(query_vars: QueryVars) -> Self {
        Self { query_vars }
    }

    /// Returns the extra query variables copied verbatim.
    pub fn query_vars(&self) -> &QueryVars {
        &self.query_vars
    }

    /// Translates the request's filter object.
    ///
    /// Returns an empty query when there is no filter or it is not an
    /// object. Otherwise, in order:
    ///
    /// 1. `per_page` is kept if it coerces to an integer `>= 1`.
    /// 2. Allow-listed query variables are copied verbatim.
    /// 3. Integer keys are sanitized: lists drop elements coercing to `0`,
    ///    scalars coerce (a failed scalar stays `0`).
    /// 4. [`LEGACY_FILTER_MAPPING`] renames legacy keys to canonical ones.
    /// 5. `status` is set to the decision's permitted statuses unless step 4
    ///    produced one.
    pub fn translate(&self, ctx: &RequestContext, decision: &VisibilityDecision) -> NormalizedQuery {
        let log = RequestLog::new(ctx.request_id());
        let mut query = NormalizedQuery::new();

        let filter = match ctx.filter() {
            Some(Value::Object(filter)) => filter,
            Some(_) => {
                log.debug(format_args!("ignoring filter that is not an object"));
                return query;
            }
            None => return query,
        };

        self.log_unrecognized(&log, filter);

        if let Some(raw) = filter.get("per_page") {
            match positive_integer(raw) {
                Some(per_page) => query.insert("per_page", QueryValue::Integer(per_page)),
                None => log.debug(format_args!("ignoring unusable filter per_page {}", raw)),
            }
        }

        for name in self.query_vars.iter() {
            if let Some(raw) = filter.get(name) {
                query.insert(name, QueryValue::verbatim(raw));
            }
        }

        let sanitized: Vec<(&str, QueryValue)> = INTEGER_FILTER_KEYS
            .iter()
            .filter_map(|key| filter.get(*key).map(|raw| (*key, sanitize_integers(raw))))
            .collect();

        let mut status_from_filter = false;
        for (legacy, canonical) in LEGACY_FILTER_MAPPING {
            let value = match sanitized.iter().find(|(key, _)| *key == legacy) {
                Some((_, value)) => value.clone(),
                None => match filter.get(legacy) {
                    Some(raw) => QueryValue::verbatim(raw),
                    None => continue,
                },
            };
            status_from_filter |= canonical == "status";
            query.insert(canonical, value);
        }

        if !status_from_filter {
            query.insert(
                "status",
                QueryValue::Statuses(decision.permitted_statuses().clone()),
            );
        }

        query
    }

    fn log_unrecognized(&self, log: &RequestLog<'_>, filter: &Map<String, Value>) {
        let ignored: Vec<&str> = filter
            .keys()
            .map(String::as_str)
            .filter(|key| !RECOGNIZED_FILTER_KEYS.contains(key) && !self.query_vars.contains(key))
            .collect();
        if !ignored.is_empty() {
            log.debug(format_args!("ignoring unrecognized filter keys {:?}", ignored));
        }
    }
}

/// Lists keep only non-zero integers; scalars always coerce.
fn sanitize_integers(raw: &Value) -> QueryValue {
    if raw.is_array() || raw.is_object() {
        QueryValue::IntegerList(coerce_integer_list(raw))
    } else {
        QueryValue::Integer(coerce_integer(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ContentStatus;
    use serde_json::json;

    fn ctx_with_filter(filter: Value) -> RequestContext {
        let mut builder = RequestContext::builder("req-filter");
        builder.set_path("/posts");
        builder.set_filter(filter);
        builder.build()
    }

    fn translate(filter: Value) -> NormalizedQuery {
        LegacyFilterTranslator::default()
            .translate(&ctx_with_filter(filter), &VisibilityDecision::published_only())
    }

    #[test]
    fn mapping_is_injective() {
        let legacy: BTreeSet<_> = LEGACY_FILTER_MAPPING.iter().map(|(l, _)| *l).collect();
        let canonical: BTreeSet<_> = LEGACY_FILTER_MAPPING.iter().map(|(_, c)| *c).collect();
        assert_eq!(legacy.len(), LEGACY_FILTER_MAPPING.len());
        assert_eq!(canonical.len(), LEGACY_FILTER_MAPPING.len());
        assert!(!canonical.contains("status"));
    }

    #[test]
    fn mapped_keys_are_recognized() {
        for (legacy, _) in LEGACY_FILTER_MAPPING {
            assert!(RECOGNIZED_FILTER_KEYS.contains(&legacy), "{legacy}");
        }
        for key in INTEGER_FILTER_KEYS {
            assert!(RECOGNIZED_FILTER_KEYS.contains(&key), "{key}");
        }
    }

    #[test]
    fn missing_filter_adds_nothing() {
        let ctx = RequestContext::builder("req-none").build();
        let query = LegacyFilterTranslator::default()
            .translate(&ctx, &VisibilityDecision::including_non_published());
        assert!(query.is_empty());
    }

    #[test]
    fn non_object_filter_adds_nothing() {
        for filter in [json!("oops"), json!([1, 2]), json!(7), Value::Null] {
            assert!(translate(filter).is_empty());
        }
    }

    #[test]
    fn per_page_must_be_positive() {
        assert_eq!(translate(json!({ "per_page": "5" })).per_page(), Some(5));
        assert_eq!(translate(json!({ "per_page": 12 })).per_page(), Some(12));
        assert_eq!(translate(json!({ "per_page": "0" })).per_page(), None);
        assert_eq!(translate(json!({ "per_page": "abc" })).per_page(), None);
        assert_eq!(translate(json!({ "per_page": "-1" })).per_page(), None);
        assert!(!translate(json!({ "per_page": "abc" })).contains("per_page"));
    }

    #[test]
    fn integer_lists_drop_zero_and_invalid_in_order() {
        let query = translate(json!({ "post__in": ["3", "0", "abc", "7"] }));
        assert_eq!(query.get("include"), Some(&QueryValue::IntegerList(vec![3, 7])));
    }

    #[test]
    fn integer_scalars_keep_failed_coercion_as_zero() {
        let query = translate(json!({ "author__in": "abc", "post__not_in": "12" }));
        assert_eq!(query.get("author"), Some(&QueryValue::Integer(0)));
        assert_eq!(query.get("exclude"), Some(&QueryValue::Integer(12)));
    }

    #[test]
    fn non_integer_keys_pass_through_verbatim() {
        let query = translate(json!({
            "order": "desc",
            "orderby": "title",
            "s": "hello",
            "post_name__in": ["about", "contact"],
            "paged": "2",
            "offset": 4
        }));
        assert_eq!(query.get("order"), Some(&QueryValue::Text("desc".into())));
        assert_eq!(query.get("orderby"), Some(&QueryValue::Text("title".into())));
        assert_eq!(query.get("search"), Some(&QueryValue::Text("hello".into())));
        assert_eq!(
            query.get("slug"),
            Some(&QueryValue::Raw(json!(["about", "contact"])))
        );
        assert_eq!(query.get("page"), Some(&QueryValue::Text("2".into())));
        assert_eq!(query.get("offset"), Some(&QueryValue::Integer(4)));
    }

    #[test]
    fn posts_per_page_overrides_filter_per_page() {
        let query = translate(json!({ "per_page": "5", "posts_per_page": 20 }));
        assert_eq!(query.per_page(), Some(20));
    }

    #[test]
    fn each_mapped_key_yields_exactly_its_canonical_key() {
        for (legacy, canonical) in LEGACY_FILTER_MAPPING {
            let query = translate(json!({ legacy: "1" }));
            let names: Vec<&str> = query.names().filter(|n| *n != "status").collect();
            assert_eq!(names, vec![canonical], "legacy key {legacy}");
        }
    }

    #[test]
    fn status_always_comes_from_decision() {
        let query = translate(json!({ "post_status": "draft" }));
        assert_eq!(
            query.status(),
            Some(&BTreeSet::from([ContentStatus::Published]))
        );

        let ctx = ctx_with_filter(json!({ "post_status": "draft" }));
        let query = LegacyFilterTranslator::default()
            .translate(&ctx, &VisibilityDecision::including_non_published());
        assert_eq!(query.status().map(BTreeSet::len), Some(4));
    }

    #[test]
    fn allow_listed_status_var_cannot_bypass_policy() {
        let translator = LegacyFilterTranslator::new(["status"].into_iter().collect());
        let query = translator.translate(
            &ctx_with_filter(json!({ "status": "draft" })),
            &VisibilityDecision::published_only(),
        );
        assert_eq!(
            query.status(),
            Some(&BTreeSet::from([ContentStatus::Published]))
        );
    }

    #[test]
    fn allow_listed_vars_are_copied_verbatim() {
        let translator = LegacyFilterTranslator::new(QueryVars::new().with_meta_vars());
        let query = translator.translate(
            &ctx_with_filter(json!({
                "meta_key": "colour",
                "meta_query": [{ "key": "colour", "value": "red" }],
                "year": "2016"
            })),
            &VisibilityDecision::published_only(),
        );
        assert_eq!(query.get("meta_key"), Some(&QueryValue::Text("colour".into())));
        assert_eq!(
            query.get("meta_query"),
            Some(&QueryValue::Raw(json!([{ "key": "colour", "value": "red" }])))
        );
        assert!(!query.contains("year"));
    }

    #[test]
    fn post_parent_is_copied_unsanitized_when_allow_listed() {
        let translator = LegacyFilterTranslator::new(["post_parent"].into_iter().collect());
        let query = translator.translate(
            &ctx_with_filter(json!({ "post_parent": "7abc" })),
            &VisibilityDecision::published_only(),
        );
        assert_eq!(query.get("post_parent"), Some(&QueryValue::Text("7abc".into())));
        assert!(!query.contains("parent"));
    }

    #[test]
    fn meta_vars_registration_is_idempotent() {
        let once = QueryVars::new().with_meta_vars();
        let twice = once.clone().with_meta_vars();
        assert_eq!(once, twice);
        assert_eq!(once.len(), META_QUERY_VARS.len());
    }

    #[test]
    fn query_vars_from_source() {
        struct Engine;
        impl QueryVarSource for Engine {
            fn recognized_query_vars(&self) -> Vec<String> {
                vec!["year".to_string(), "monthnum".to_string()]
            }
        }

        let vars = QueryVars::from_source(&Engine);
        assert!(vars.contains("year"));
        assert!(vars.contains("monthnum"));
        assert_eq!(vars.recognized_query_vars(), vec!["monthnum", "year"]);
    }
}
