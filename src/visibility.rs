//! Preview-aware visibility policy.
//!
//! Whether non-published content is visible is decided from the request
//! alone (headers and path), never from authentication or engine state.
//! The same [`VisibilityDecision`] then constrains the collection query
//! (as the permitted `status` set) and gates single-resource responses.

use std::collections::BTreeSet;

use crate::config::GateConfig;
use crate::error::AccessDenied;
use crate::request::RequestContext;
use crate::status::{ContentStatus, ContentType};

/// Statuses visible when a request opts into non-published content.
const PREVIEW_STATUSES: [ContentStatus; 4] = [
    ContentStatus::Published,
    ContentStatus::Draft,
    ContentStatus::Scheduled,
    ContentStatus::Pending,
];

/// Statuses an attachment may have and still be served.
const ATTACHMENT_STATUSES: [ContentStatus; 2] =
    [ContentStatus::Inherited, ContentStatus::Published];

/// The per-request visibility outcome.
///
/// `permitted_statuses` is always derived from `include_non_published`, so
/// the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityDecision {
    include_non_published: bool,
    permitted_statuses: BTreeSet<ContentStatus>,
}

impl VisibilityDecision {
    /// A decision that only exposes published content.
    pub fn published_only() -> Self {
        Self::from_flag(false)
    }

    /// A decision that also exposes drafts, scheduled and pending content.
    pub fn including_non_published() -> Self {
        Self::from_flag(true)
    }

    fn from_flag(include_non_published: bool) -> Self {
        let permitted_statuses = if include_non_published {
            PREVIEW_STATUSES.into_iter().collect()
        } else {
            BTreeSet::from([ContentStatus::Published])
        };
        Self {
            include_non_published,
            permitted_statuses,
        }
    }

    /// Returns `true` if non-published content may be returned.
    pub fn include_non_published(&self) -> bool {
        self.include_non_published
    }

    /// Returns the statuses this request may see.
    pub fn permitted_statuses(&self) -> &BTreeSet<ContentStatus> {
        &self.permitted_statuses
    }
}

/// A single content item about to be returned by a resource endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Registered content type of the item
    pub content_type: ContentType,
    /// Current lifecycle status of the item
    pub status: ContentStatus,
}

impl ResourceItem {
    /// Creates a resource item.
    pub fn new(content_type: ContentType, status: ContentStatus) -> Self {
        Self {
            content_type,
            status,
        }
    }
}

/// Decides visibility from request context and gates single resources.
///
/// # Examples
///
/// ```
/// use content_gate::{ContentStatus, ContentType, RequestContext, ResourceItem, VisibilityPolicy};
///
/// let policy = VisibilityPolicy::default();
///
/// let mut builder = RequestContext::builder("req-1");
/// builder.set_path("/posts/42");
/// let decision = policy.decide(&builder.build());
/// assert!(!decision.include_non_published());
///
/// let draft = ResourceItem::new(ContentType::new("post"), ContentStatus::Draft);
/// let denied = policy.authorize(&draft, &decision).unwrap_err();
/// assert_eq!(denied.http_status(), 403);
/// ```
#[derive(Debug, Clone)]
pub struct VisibilityPolicy {
    preview_headers: Vec<String>,
    preview_path_suffix: String,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

impl VisibilityPolicy {
    /// Creates a policy from the preview settings in `config`.
    pub fn new(config: &GateConfig) -> Self {
        Self {
            preview_headers: config.preview_headers.clone(),
            preview_path_suffix: config.preview_path_suffix.clone(),
        }
    }

    /// Derives the visibility decision for a request.
    ///
    /// Non-published content is included if any opt-in header equals `true`
    /// (ignoring case) or the path ends with the preview suffix. Missing
    /// headers simply do not match. Pure function of `ctx`.
    pub fn decide(&self, ctx: &RequestContext) -> VisibilityDecision {
        let header_opt_in = self.preview_headers.iter().any(|name| {
            ctx.header(name)
                .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        });
        let path_opt_in =
            !self.preview_path_suffix.is_empty() && ctx.path().ends_with(&self.preview_path_suffix);

        VisibilityDecision::from_flag(header_opt_in || path_opt_in)
    }

    /// Decides whether a single resource may be returned.
    ///
    /// Attachments are served only while `inherit` or `publish`, even in
    /// preview. Any other type is served when published, or when the
    /// decision includes non-published content.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied::unauthorized`] when the item must be withheld.
    /// Callers substitute it for the response; it is not retryable.
    pub fn authorize(
        &self,
        item: &ResourceItem,
        decision: &VisibilityDecision,
    ) -> Result<(), AccessDenied> {
        let visible = if item.content_type.is_attachment() {
            ATTACHMENT_STATUSES.contains(&item.status)
        } else {
            item.status == ContentStatus::Published || decision.include_non_published()
        };

        if visible {
            Ok(())
        } else {
            Err(AccessDenied::unauthorized())
        }
    }
}
