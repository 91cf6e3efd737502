//! Content lifecycle statuses and content types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a content item.
///
/// Serialized with the content engine's wire names (`publish`, `inherit`, ...).
/// Not every status applies to every content type: attachments only use
/// [`Inherited`](ContentStatus::Inherited) and [`Published`](ContentStatus::Published).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentStatus {
    /// Publicly visible
    #[serde(rename = "publish", alias = "published")]
    Published,
    /// Work in progress
    #[serde(rename = "draft")]
    Draft,
    /// Scheduled for future publication
    #[serde(rename = "scheduled")]
    Scheduled,
    /// Awaiting review
    #[serde(rename = "pending")]
    Pending,
    /// Takes its visibility from a parent item (attachments)
    #[serde(rename = "inherit", alias = "inherited")]
    Inherited,
}

impl ContentStatus {
    /// Returns the content engine's name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Published => "publish",
            ContentStatus::Draft => "draft",
            ContentStatus::Scheduled => "scheduled",
            ContentStatus::Pending => "pending",
            ContentStatus::Inherited => "inherit",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    input: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown content status '{}'", self.input)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ContentStatus {
    type Err = ParseStatusError;

    /// Parses wire names and descriptive names, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "publish" | "published" => Ok(ContentStatus::Published),
            "draft" => Ok(ContentStatus::Draft),
            "scheduled" => Ok(ContentStatus::Scheduled),
            "pending" => Ok(ContentStatus::Pending),
            "inherit" | "inherited" => Ok(ContentStatus::Inherited),
            _ => Err(ParseStatusError {
                input: s.to_string(),
            }),
        }
    }
}

/// The registered type of a content item (`post`, `page`, `attachment`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(String);

impl ContentType {
    /// Name of the attachment (media) content type.
    pub const ATTACHMENT: &'static str = "attachment";

    /// Creates a content type from its registered name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The attachment content type.
    pub fn attachment() -> Self {
        Self::new(Self::ATTACHMENT)
    }

    /// Returns `true` for attachments, which follow their own status rules.
    pub fn is_attachment(&self) -> bool {
        self.0 == Self::ATTACHMENT
    }

    /// Returns the registered name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
