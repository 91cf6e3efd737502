//! Startup relaxation of collection endpoint constraints.
//!
//! The content engine declares, per endpoint, bounds and enums for its
//! collection parameters. Legacy clients page through everything and sort
//! by fields the stock enums do not list, so before serving we widen
//! `per_page`, `orderby` and `order` wherever they are declared. The pass
//! only widens and is idempotent; hosts that hot-reload endpoint
//! registration simply run it again.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::logging::LOG_TARGET;

/// Declared constraints for one parameter of an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamConstraint {
    /// Smallest accepted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    /// Largest accepted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    /// Accepted values, if restricted
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<BTreeSet<String>>,
}

impl ParamConstraint {
    /// A numeric range constraint.
    pub fn range(minimum: i64, maximum: i64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
            enumeration: None,
        }
    }

    /// An enum constraint.
    pub fn one_of<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self {
            minimum: None,
            maximum: None,
            enumeration: Some(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Declared parameter constraints of one collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchemaEntry {
    /// Parameter name to constraint
    #[serde(default)]
    pub args: BTreeMap<String, ParamConstraint>,
}

impl CollectionSchemaEntry {
    /// Declares a parameter constraint, builder style.
    pub fn with_arg(mut self, name: impl Into<String>, constraint: ParamConstraint) -> Self {
        self.args.insert(name.into(), constraint);
        self
    }
}

/// Endpoint id (route pattern) to declared constraints.
pub type EndpointSchemas = BTreeMap<String, CollectionSchemaEntry>;

/// Read/write access to the content engine's endpoint registrations.
///
/// The relaxer depends on this seam instead of reaching into the engine's
/// internals. Implementations hand every registered endpoint to `visit`.
pub trait EndpointRegistry {
    /// Calls `visit` with each endpoint id and its mutable schema.
    fn visit_endpoints(&mut self, visit: &mut dyn FnMut(&str, &mut CollectionSchemaEntry));
}

impl EndpointRegistry for EndpointSchemas {
    fn visit_endpoints(&mut self, visit: &mut dyn FnMut(&str, &mut CollectionSchemaEntry)) {
        for (id, entry) in self.iter_mut() {
            visit(id, entry);
        }
    }
}

/// Widens declared collection constraints.
///
/// # Examples
///
/// ```
/// use content_gate::{CollectionParameterRelaxer, CollectionSchemaEntry, EndpointSchemas, ParamConstraint};
///
/// let mut schemas = EndpointSchemas::new();
/// schemas.insert(
///     "/wp/v2/posts".to_string(),
///     CollectionSchemaEntry::default()
///         .with_arg("per_page", ParamConstraint::range(1, 100))
///         .with_arg("order", ParamConstraint::one_of(["asc", "desc"])),
/// );
///
/// let relaxer = CollectionParameterRelaxer::default();
/// let relaxed = relaxer.relax(schemas);
/// let args = &relaxed["/wp/v2/posts"].args;
///
/// assert_eq!(args["per_page"].maximum, Some(99_999_999));
/// assert_eq!(args["per_page"].minimum, Some(-1));
/// assert!(args["order"].enumeration.as_ref().unwrap().contains("DESC"));
/// assert_eq!(relaxer.relax(relaxed.clone()), relaxed);
/// ```
#[derive(Debug, Clone)]
pub struct CollectionParameterRelaxer {
    per_page_minimum: i64,
    per_page_maximum: i64,
    extra_orderby: BTreeSet<String>,
    extra_order: BTreeSet<String>,
}

impl Default for CollectionParameterRelaxer {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

impl CollectionParameterRelaxer {
    /// Creates a relaxer from the bounds and enum extensions in `config`.
    pub fn new(config: &GateConfig) -> Self {
        Self {
            per_page_minimum: config.per_page_minimum,
            per_page_maximum: config.per_page_maximum,
            extra_orderby: config.extra_orderby.iter().cloned().collect(),
            extra_order: config.extra_order.iter().cloned().collect(),
        }
    }

    /// Returns a relaxed copy of `schemas`.
    pub fn relax(&self, mut schemas: EndpointSchemas) -> EndpointSchemas {
        self.apply(&mut schemas);
        schemas
    }

    /// Relaxes every endpoint in the registry in place.
    ///
    /// Returns the number of endpoints whose constraints changed. A second
    /// run over the same registry returns `0`.
    pub fn apply(&self, registry: &mut impl EndpointRegistry) -> usize {
        let mut changed = 0;
        registry.visit_endpoints(&mut |id: &str, entry: &mut CollectionSchemaEntry| {
            if self.relax_entry(entry) {
                tracing::debug!(target: LOG_TARGET, endpoint = %id, "relaxed collection parameters");
                changed += 1;
            }
        });
        changed
    }

    /// Relaxes one endpoint. Returns `true` if anything changed.
    ///
    /// Parameters that are not declared are left undeclared.
    pub fn relax_entry(&self, entry: &mut CollectionSchemaEntry) -> bool {
        let mut changed = false;

        if let Some(per_page) = entry.args.get_mut("per_page") {
            let maximum = per_page
                .maximum
                .map_or(self.per_page_maximum, |m| m.max(self.per_page_maximum));
            let minimum = per_page
                .minimum
                .map_or(self.per_page_minimum, |m| m.min(self.per_page_minimum));
            changed |= per_page.maximum != Some(maximum) || per_page.minimum != Some(minimum);
            per_page.maximum = Some(maximum);
            per_page.minimum = Some(minimum);
        }

        changed |= widen_enum(entry.args.get_mut("orderby"), &self.extra_orderby);
        changed |= widen_enum(entry.args.get_mut("order"), &self.extra_order);

        changed
    }
}

fn widen_enum(constraint: Option<&mut ParamConstraint>, extra: &BTreeSet<String>) -> bool {
    match constraint.and_then(|c| c.enumeration.as_mut()) {
        Some(values) => {
            let before = values.len();
            values.extend(extra.iter().cloned());
            values.len() != before
        }
        None => false,
    }
}
