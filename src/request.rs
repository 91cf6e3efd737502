//! Immutable per-request snapshot consumed by every gate component.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, InvalidUri};
use crate::logging::RequestLog;

/// Deepest bracket path accepted under `filter`, counting the first key.
const MAX_FILTER_DEPTH: usize = 8;

/// Everything the gate reads from an incoming request.
///
/// Built once per request through [`RequestContextBuilder`] and never mutated
/// afterwards, so the visibility decision made for the collection query and
/// for the single-resource response is taken from the same inputs.
///
/// # Examples
///
/// ```
/// use content_gate::RequestContext;
///
/// let mut builder = RequestContext::builder("req-1");
/// builder.set_path("/wp-json/wp/v2/posts");
/// builder.add_header("Preview", "true");
/// builder.add_query_param("per_page", "25");
/// let ctx = builder.build();
///
/// assert_eq!(ctx.header("preview"), Some("true"));
/// assert_eq!(ctx.query_param("per_page"), Some("25"));
/// assert!(ctx.filter().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    /// Keys are stored lowercased
    headers: HashMap<String, String>,
    path: String,
    query_params: BTreeMap<String, String>,
    /// Legacy filter object; may be any JSON shape, only objects are used
    filter: Option<Value>,
}

impl RequestContext {
    /// Starts building a context for the given request id.
    pub fn builder(request_id: impl Into<String>) -> RequestContextBuilder {
        RequestContextBuilder {
            request_id: request_id.into(),
            headers: HashMap::new(),
            path: String::new(),
            query_params: BTreeMap::new(),
            filter: None,
        }
    }

    /// Starts building a context from a raw request URI such as
    /// `/posts/preview?per_page=5&filter[post__in][]=3`.
    ///
    /// The path and the percent-decoded query string are taken from the URI.
    /// Bracketed `filter[...]` parameters are folded into the legacy filter
    /// object following the whole bracket path: `[name]` addresses an object
    /// key and `[]` appends, so `filter[meta_query][0][key]=colour` yields
    /// `{"meta_query":[{"key":"colour"}]}`. Objects whose keys are exactly
    /// `0..n` become arrays. A bare `filter=...` becomes a non-object filter,
    /// which translation ignores. Paths deeper than eight segments are
    /// dropped. Headers still have to be added on the returned builder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUri`] if the URI cannot be resolved.
    ///
    /// # Examples
    ///
    /// ```
    /// use content_gate::RequestContext;
    ///
    /// let ctx = RequestContext::from_uri("req-2", "/posts?filter[post__in][]=3&filter[post__in][]=7&s=x")
    ///     .unwrap()
    ///     .build();
    ///
    /// assert_eq!(ctx.path(), "/posts");
    /// assert_eq!(ctx.query_param("s"), Some("x"));
    /// assert_eq!(ctx.filter().unwrap()["post__in"], serde_json::json!(["3", "7"]));
    /// ```
    pub fn from_uri(
        request_id: impl Into<String>,
        uri: &str,
    ) -> Result<RequestContextBuilder, Error> {
        let base = Url::parse("http://localhost/").map_err(|e| InvalidUri::new(uri, e))?;
        let url = base.join(uri).map_err(|e| InvalidUri::new(uri, e))?;

        let request_id: String = request_id.into();
        let log = RequestLog::new(&request_id);
        let mut builder = Self::builder(request_id.clone());
        builder.set_path(url.path());

        let mut filter: Option<Value> = None;
        for (key, value) in url.query_pairs() {
            match parse_filter_param(&key) {
                Some(FilterParam::Whole) => filter = Some(Value::String(value.into_owned())),
                Some(FilterParam::Path(path)) if path.len() > MAX_FILTER_DEPTH => {
                    log.debug(format_args!("ignoring filter parameter nested too deeply: {}", key));
                }
                Some(FilterParam::Path(path)) => {
                    let root = filter.get_or_insert_with(|| Value::Object(Map::new()));
                    insert_at_path(root, &path, value.into_owned());
                }
                None => builder.add_query_param(key.to_string(), value.into_owned()),
            }
        }

        if let Some(filter) = filter {
            builder.set_filter(match filter {
                Value::Object(map) => Value::Object(
                    map.into_iter().map(|(k, v)| (k, collapse_lists(v))).collect(),
                ),
                other => other,
            });
        }

        Ok(builder)
    }

    /// Returns the request id used to correlate log events.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Looks up a header value, ignoring the case of `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the URL path of the request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks up a parameter on the primary query string.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Returns all primary query string parameters.
    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    /// Returns the legacy filter object, if the client sent one.
    pub fn filter(&self) -> Option<&Value> {
        self.filter.as_ref()
    }
}

/// Builder for [`RequestContext`].
///
/// Framework integrations fill this from their own request type and call
/// [`build`](Self::build) once, before any gate component runs.
#[derive(Debug, Clone)]
pub struct RequestContextBuilder {
    request_id: String,
    headers: HashMap<String, String>,
    path: String,
    query_params: BTreeMap<String, String>,
    filter: Option<Value>,
}

impl RequestContextBuilder {
    /// Adds a header. Names are case-insensitive; a later value replaces an earlier one.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Sets the URL path.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Adds a primary query string parameter.
    pub fn add_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query_params.insert(name.into(), value.into());
    }

    /// Sets the legacy filter object.
    pub fn set_filter(&mut self, filter: Value) {
        self.filter = Some(filter);
    }

    /// Freezes the builder into an immutable context.
    pub fn build(self) -> RequestContext {
        RequestContext {
            request_id: self.request_id,
            headers: self.headers,
            path: self.path,
            query_params: self.query_params,
            filter: self.filter,
        }
    }
}

/// A query string key addressing the legacy filter object.
#[derive(Debug, PartialEq, Eq)]
enum FilterParam<'a> {
    /// `filter=...`
    Whole,
    /// `filter[name]...`, starting with a named key
    Path(Vec<PathSegment<'a>>),
}

/// One bracketed segment of a filter key.
#[derive(Debug, PartialEq, Eq)]
enum PathSegment<'a> {
    /// `[name]`
    Key(&'a str),
    /// `[]`
    Push,
}

fn parse_filter_param(key: &str) -> Option<FilterParam<'_>> {
    let mut rest = key.strip_prefix("filter")?;
    if rest.is_empty() {
        return Some(FilterParam::Whole);
    }

    // Text after the last well-formed bracket is ignored.
    let mut path = Vec::new();
    while let Some((segment, tail)) = rest.strip_prefix('[').and_then(|r| r.split_once(']')) {
        path.push(if segment.is_empty() {
            PathSegment::Push
        } else {
            PathSegment::Key(segment)
        });
        rest = tail;
    }

    match path.first() {
        Some(PathSegment::Key(_)) => Some(FilterParam::Path(path)),
        _ => None,
    }
}

/// Writes `value` at `path` below `node`, replacing scalars that sit where
/// a container is needed. Later writes to the same path win.
fn insert_at_path(node: &mut Value, path: &[PathSegment<'_>], value: String) {
    let Some((segment, rest)) = path.split_first() else {
        *node = Value::String(value);
        return;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let key = match segment {
            PathSegment::Key(key) => key.to_string(),
            PathSegment::Push => next_index(map).to_string(),
        };
        let child = map.entry(key).or_insert(Value::Null);
        insert_at_path(child, rest, value);
    }
}

/// One past the largest canonical integer key, or `0`.
fn next_index(map: &Map<String, Value>) -> u64 {
    map.keys()
        .filter_map(|key| key.parse::<u64>().ok().filter(|n| n.to_string() == *key))
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Turns objects keyed exactly `"0".."n-1"` into arrays, recursively.
fn collapse_lists(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            let is_list =
                !map.is_empty() && (0..map.len()).all(|i| map.contains_key(&i.to_string()));
            if is_list {
                Value::Array(
                    (0..map.len())
                        .map(|i| collapse_lists(map.remove(&i.to_string()).unwrap_or(Value::Null)))
                        .collect(),
                )
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, collapse_lists(v))).collect())
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_case_insensitive() {
        let mut builder = RequestContext::builder("req-1");
        builder.add_header("Include-Drafts", "TRUE");
        let ctx = builder.build();

        assert_eq!(ctx.header("include-drafts"), Some("TRUE"));
        assert_eq!(ctx.header("INCLUDE-DRAFTS"), Some("TRUE"));
        assert_eq!(ctx.header("preview"), None);
    }

    #[test]
    fn later_header_replaces_earlier() {
        let mut builder = RequestContext::builder("req-1");
        builder.add_header("Preview", "false");
        builder.add_header("preview", "true");
        assert_eq!(builder.build().header("Preview"), Some("true"));
    }

    #[test]
    fn parse_filter_param_shapes() {
        use PathSegment::{Key, Push};

        assert_eq!(parse_filter_param("filter"), Some(FilterParam::Whole));
        assert_eq!(
            parse_filter_param("filter[s]"),
            Some(FilterParam::Path(vec![Key("s")]))
        );
        assert_eq!(
            parse_filter_param("filter[post__in][]"),
            Some(FilterParam::Path(vec![Key("post__in"), Push]))
        );
        assert_eq!(
            parse_filter_param("filter[tax_query][0][terms][]"),
            Some(FilterParam::Path(vec![
                Key("tax_query"),
                Key("0"),
                Key("terms"),
                Push
            ]))
        );
        assert_eq!(
            parse_filter_param("filter[s]junk[x]"),
            Some(FilterParam::Path(vec![Key("s")]))
        );
        assert_eq!(parse_filter_param("filter[]"), None);
        assert_eq!(parse_filter_param("filter[s"), None);
        assert_eq!(parse_filter_param("filters"), None);
        assert_eq!(parse_filter_param("per_page"), None);
    }

    #[test]
    fn from_uri_builds_nested_meta_query() {
        let ctx = RequestContext::from_uri(
            "req-meta",
            "/posts?filter[meta_query][0][key]=colour&filter[meta_query][0][value]=red",
        )
        .unwrap()
        .build();

        assert_eq!(
            ctx.filter(),
            Some(&json!({ "meta_query": [{ "key": "colour", "value": "red" }] }))
        );
    }

    #[test]
    fn from_uri_builds_nested_tax_query_with_lists() {
        let ctx = RequestContext::from_uri(
            "req-tax",
            "/posts?filter[tax_query][0][taxonomy]=cat&filter[tax_query][0][terms][]=5&filter[tax_query][0][terms][]=9&filter[tax_query][relation]=OR",
        )
        .unwrap()
        .build();

        assert_eq!(
            ctx.filter(),
            Some(&json!({
                "tax_query": {
                    "0": { "taxonomy": "cat", "terms": ["5", "9"] },
                    "relation": "OR"
                }
            }))
        );
    }

    #[test]
    fn from_uri_explicit_indexes_become_lists_only_when_contiguous() {
        let ctx = RequestContext::from_uri(
            "req-idx",
            "/posts?filter[post__in][1]=4&filter[post__in][0]=3&filter[author__in][2]=8",
        )
        .unwrap()
        .build();

        assert_eq!(ctx.filter().unwrap()["post__in"], json!(["3", "4"]));
        assert_eq!(ctx.filter().unwrap()["author__in"], json!({ "2": "8" }));
    }

    #[test]
    fn from_uri_later_values_replace_earlier() {
        let ctx = RequestContext::from_uri("req-dup", "/posts?filter[s]=a&filter[s][x]=b")
            .unwrap()
            .build();
        assert_eq!(ctx.filter(), Some(&json!({ "s": { "x": "b" } })));
    }

    #[test]
    fn from_uri_drops_overly_deep_filter_paths() {
        let ctx = RequestContext::from_uri(
            "req-deep",
            "/posts?filter[a][b][c][d][e][f][g][h][i]=x&filter[s]=ok",
        )
        .unwrap()
        .build();
        assert_eq!(ctx.filter(), Some(&json!({ "s": "ok" })));
    }

    #[test]
    fn next_index_ignores_non_canonical_keys() {
        let map: Map<String, Value> = [("007", json!(1)), ("2", json!(2)), ("x", json!(3))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(next_index(&map), 3);
        assert_eq!(next_index(&Map::new()), 0);
    }

    #[test]
    fn from_uri_splits_path_query_and_filter() {
        let ctx = RequestContext::from_uri(
            "req-uri",
            "/wp-json/wp/v2/posts/preview?per_page=5&filter%5Bs%5D=hello%20world&filter[orderby]=title",
        )
        .unwrap()
        .build();

        assert_eq!(ctx.path(), "/wp-json/wp/v2/posts/preview");
        assert_eq!(ctx.query_param("per_page"), Some("5"));
        assert_eq!(ctx.query_params().len(), 1);
        assert_eq!(
            ctx.filter(),
            Some(&json!({ "s": "hello world", "orderby": "title" }))
        );
    }

    #[test]
    fn from_uri_keeps_list_order() {
        let ctx = RequestContext::from_uri(
            "req-list",
            "/posts?filter[post__in][]=9&filter[post__in][]=abc&filter[post__in][]=2",
        )
        .unwrap()
        .build();

        assert_eq!(ctx.filter().unwrap()["post__in"], json!(["9", "abc", "2"]));
    }

    #[test]
    fn from_uri_bare_filter_is_not_an_object() {
        let ctx = RequestContext::from_uri("req-bare", "/posts?filter=oops")
            .unwrap()
            .build();
        assert_eq!(ctx.filter(), Some(&json!("oops")));
    }

    #[test]
    fn from_uri_accepts_absolute_uris() {
        let ctx = RequestContext::from_uri("req-abs", "https://cms.example.com/pages?page=2")
            .unwrap()
            .build();
        assert_eq!(ctx.path(), "/pages");
        assert_eq!(ctx.query_param("page"), Some("2"));
    }

    #[test]
    fn from_uri_rejects_unparsable_uris() {
        match RequestContext::from_uri("req-bad", "http://[::1") {
            Err(Error::InvalidUri(err)) => assert_eq!(err.uri(), "http://[::1"),
            other => panic!("expected InvalidUri, got {:?}", other),
        }
    }
}
