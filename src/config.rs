//! Gate configuration.
//!
//! [`GateConfig::default()`] reproduces the stock behavior: a page size of 10,
//! the `Preview` and `Include-Drafts` opt-in headers, the `/preview` path
//! suffix, and relaxed `per_page` bounds of `-1..=99999999`. Hosts that need
//! different values can load a JSON document or use the builder methods.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error};

/// Page size injected when the caller did not ask for one.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Relaxed lower bound for `per_page`; `-1` means "no limit" to the engine.
pub const RELAXED_PER_PAGE_MINIMUM: i64 = -1;

/// Relaxed upper bound for `per_page`.
pub const RELAXED_PER_PAGE_MAXIMUM: i64 = 99_999_999;

/// Headers whose value `true` opts a request into non-published content.
pub const PREVIEW_HEADERS: [&str; 2] = ["Preview", "Include-Drafts"];

/// Path suffix that opts a request into non-published content.
pub const PREVIEW_PATH_SUFFIX: &str = "/preview";

/// Sort fields added to every declared `orderby` enum.
pub const EXTRA_ORDERBY: [&str; 11] = [
    "none",
    "author",
    "modified",
    "name",
    "type",
    "parent",
    "menu_order",
    "meta_value",
    "meta_value_num",
    "post__in",
    "post_name__in",
];

/// Sort directions added to every declared `order` enum.
pub const EXTRA_ORDER: [&str; 2] = ["ASC", "DESC"];

/// Configuration shared by the visibility policy, the filter pipeline and
/// the startup schema relaxer.
///
/// # Examples
///
/// ```
/// use content_gate::GateConfig;
///
/// let config = GateConfig::from_json(r#"{ "default_per_page": 20 }"#).unwrap();
/// assert_eq!(config.default_per_page, 20);
/// assert_eq!(config.preview_path_suffix, "/preview");
///
/// let config = GateConfig::default().with_preview_header("X-Preview");
/// assert_eq!(config.preview_headers.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Page size injected when the primary query string has no `per_page`
    pub default_per_page: i64,
    /// Opt-in header names, matched case-insensitively
    pub preview_headers: Vec<String>,
    /// Path suffix that opts a request into non-published content
    pub preview_path_suffix: String,
    /// Relaxed lower bound for declared `per_page` constraints
    pub per_page_minimum: i64,
    /// Relaxed upper bound for declared `per_page` constraints
    pub per_page_maximum: i64,
    /// Values unioned into declared `orderby` enums
    pub extra_orderby: Vec<String>,
    /// Values unioned into declared `order` enums
    pub extra_order: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            preview_headers: PREVIEW_HEADERS.iter().map(|h| h.to_string()).collect(),
            preview_path_suffix: PREVIEW_PATH_SUFFIX.to_string(),
            per_page_minimum: RELAXED_PER_PAGE_MINIMUM,
            per_page_maximum: RELAXED_PER_PAGE_MAXIMUM,
            extra_orderby: EXTRA_ORDERBY.iter().map(|v| v.to_string()).collect(),
            extra_order: EXTRA_ORDER.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl GateConfig {
    /// Loads a configuration from JSON, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed or fails
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: GateConfig = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the default page size is below 1, the relaxed
    /// bounds are inverted, or the preview suffix is empty (which would put
    /// every request in preview mode).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_per_page < 1 {
            return Err(ConfigError::new(format!(
                "default_per_page must be at least 1, got {}",
                self.default_per_page
            )));
        }
        if self.per_page_minimum > self.per_page_maximum {
            return Err(ConfigError::new(format!(
                "per_page_minimum ({}) exceeds per_page_maximum ({})",
                self.per_page_minimum, self.per_page_maximum
            )));
        }
        if self.preview_path_suffix.is_empty() {
            return Err(ConfigError::new("preview_path_suffix must not be empty"));
        }
        Ok(())
    }

    /// Sets the injected default page size.
    pub fn with_default_per_page(mut self, per_page: i64) -> Self {
        self.default_per_page = per_page;
        self
    }

    /// Adds an opt-in header, ignoring duplicates (case-insensitive).
    pub fn with_preview_header(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self
            .preview_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&name))
        {
            self.preview_headers.push(name);
        }
        self
    }

    /// Sets the preview path suffix.
    pub fn with_preview_path_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.preview_path_suffix = suffix.into();
        self
    }

    /// Sets the relaxed `per_page` bounds.
    pub fn with_per_page_bounds(mut self, minimum: i64, maximum: i64) -> Self {
        self.per_page_minimum = minimum;
        self.per_page_maximum = maximum;
        self
    }
}
