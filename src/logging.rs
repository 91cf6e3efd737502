use std::fmt;

use crate::pipeline::Mutations;
use crate::visibility::{ResourceItem, VisibilityDecision};

/// Target for routine gate events.
pub const LOG_TARGET: &str = "content_gate";

/// Target for withheld-resource events, so hosts can route them to an audit sink.
pub const AUDIT_TARGET: &str = "content_gate::audit";

/// A request-scoped structured logger.
///
/// Every event carries the request id of the context it was created from.
/// Unusable client input is logged at `debug`: it is expected noise, not a
/// fault.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Creates a logger for the given request id.
    pub fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: LOG_TARGET, request_id = %self.request_id, "{}", args);
    }

    /// Records the visibility decision taken for the request.
    pub fn decision(&self, decision: &VisibilityDecision) {
        tracing::debug!(
            target: LOG_TARGET,
            request_id = %self.request_id,
            include_non_published = decision.include_non_published(),
            permitted = ?decision.permitted_statuses(),
            "visibility decided"
        );
    }

    /// Records the parameter mutations produced before dispatch.
    pub fn mutations(&self, mutations: &Mutations) {
        tracing::debug!(
            target: LOG_TARGET,
            request_id = %self.request_id,
            count = mutations.len(),
            params = ?mutations.names().collect::<Vec<_>>(),
            "request parameters normalized"
        );
    }

    /// Records a single resource withheld by the visibility policy.
    pub fn denied(&self, item: &ResourceItem) {
        tracing::info!(
            target: AUDIT_TARGET,
            request_id = %self.request_id,
            content_type = %item.content_type,
            status = %item.status,
            outcome = "denied",
            "resource withheld"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ContentStatus, ContentType};

    #[test]
    fn request_log_keeps_request_id() {
        let log = RequestLog::new("req-log");
        assert_eq!(log.request_id(), "req-log");
    }

    #[test]
    fn events_do_not_panic_without_subscriber() {
        let log = RequestLog::new("req-quiet");
        log.debug(format_args!("ignored {}", "value"));
        log.decision(&VisibilityDecision::published_only());
        log.mutations(&Mutations::default());
        log.denied(&ResourceItem::new(
            ContentType::new("post"),
            ContentStatus::Draft,
        ));
    }
}
