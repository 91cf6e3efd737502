use std::fmt;

use serde::{Serialize, Serializer};

/// Errors that can occur in the content gate crate.
///
/// Returned by the fallible entry points, [`GateConfig::from_json`](crate::GateConfig::from_json)
/// and [`RequestContext::from_uri`](crate::RequestContext::from_uri). Malformed
/// filter input never raises one; unusable values are dropped instead.
/// `Denied` converts from [`AccessDenied`] so hosts can propagate a withheld
/// resource with `?`.
#[derive(Debug)]
pub enum Error {
    /// A single resource was withheld by the visibility policy
    Denied(AccessDenied),
    /// Gate configuration could not be loaded or is inconsistent
    Config(ConfigError),
    /// A raw request URI could not be parsed
    InvalidUri(InvalidUri),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Denied(d) => write!(f, "Access denied: {}", d),
            Error::Config(c) => write!(f, "Configuration error: {}", c),
            Error::InvalidUri(u) => write!(f, "Invalid request URI: {}", u),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Denied(d) => Some(d),
            Error::Config(c) => Some(c),
            Error::InvalidUri(u) => Some(u),
        }
    }
}

impl From<AccessDenied> for Error {
    fn from(d: AccessDenied) -> Self {
        Error::Denied(d)
    }
}

impl From<ConfigError> for Error {
    fn from(c: ConfigError) -> Self {
        Error::Config(c)
    }
}

impl From<InvalidUri> for Error {
    fn from(u: InvalidUri) -> Self {
        Error::InvalidUri(u)
    }
}

/// The kind of access denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    /// The caller may not see the resource in its current status
    Unauthorized,
}

impl DenialKind {
    /// Returns the machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            DenialKind::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The structured result substituted for a withheld single resource.
///
/// It mimics the content engine's own authentication failure so clients
/// cannot distinguish "not published" from "not allowed". Serializes to the
/// engine's error body:
///
/// ```
/// use content_gate::AccessDenied;
///
/// let body = serde_json::to_value(AccessDenied::unauthorized()).unwrap();
/// assert_eq!(body["code"], "unauthorized");
/// assert_eq!(body["message"], "Authentication failed");
/// assert_eq!(body["data"]["status"], 403);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    kind: DenialKind,
    message: String,
    http_status: u16,
}

impl AccessDenied {
    /// The HTTP status code carried by every denial.
    pub const HTTP_STATUS: u16 = 403;

    /// Creates the standard `unauthorized` / `Authentication failed` / 403 denial.
    pub fn unauthorized() -> Self {
        Self {
            kind: DenialKind::Unauthorized,
            message: "Authentication failed".to_string(),
            http_status: Self::HTTP_STATUS,
        }
    }

    /// Returns the denial kind.
    pub fn kind(&self) -> DenialKind {
        self.kind
    }

    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code the host must respond with.
    pub fn http_status(&self) -> u16 {
        self.http_status
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.http_status, self.message)
    }
}

impl std::error::Error for AccessDenied {}

#[derive(Serialize)]
struct DenialBody<'a> {
    code: &'a str,
    message: &'a str,
    data: DenialData,
}

#[derive(Serialize)]
struct DenialData {
    status: u16,
}

impl Serialize for AccessDenied {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DenialBody {
            code: self.kind.code(),
            message: &self.message,
            data: DenialData {
                status: self.http_status,
            },
        }
        .serialize(serializer)
    }
}

/// Error returned when a [`GateConfig`](crate::GateConfig) cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Creates a new configuration error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::new(format!("malformed gate config: {}", e))
    }
}

/// Error returned when a raw request URI cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUri {
    uri: String,
    reason: String,
}

impl InvalidUri {
    /// Creates a new URI error.
    pub fn new(uri: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the URI that failed to parse.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for InvalidUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.uri, self.reason)
    }
}

impl std::error::Error for InvalidUri {}
