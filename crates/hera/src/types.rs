//! Shared value types for the Hera domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (an endpoint is an absolute URL, a URL pattern always
//! has a scheme and a host) or mirror the result shapes the appliance returns.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::HeraError;

// ---------------------------------------------------------------------------
// Connection parameters
// ---------------------------------------------------------------------------

/// Network address of the appliance's control API, e.g.
/// `https://lb1.example.com:9090/soap`.
///
/// Fixed for the lifetime of a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parses an endpoint URL. Only `http` and `https` are accepted.
    pub fn parse(value: &str) -> Result<Self, HeraError> {
        let url = Url::parse(value).map_err(|e| HeraError::InvalidArgument {
            argument: "endpoint".to_string(),
            reason: format!("'{value}' is not a valid URL: {e}"),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(HeraError::InvalidArgument {
                argument: "endpoint".to_string(),
                reason: format!("unsupported scheme '{other}', expected http or https"),
            }),
        }
    }

    /// Returns the endpoint as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Username / password pair used for HTTP basic authentication.
///
/// Supplied once at construction; every rebind builds a fresh transport from
/// it. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Credential {
    username: String,
    password: SecretString,
}

impl Credential {
    /// Creates a credential from a username and a password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// The account name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password. Callers must not log the returned value.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Version of the appliance's control API (e.g. `1.2`).
///
/// Determines which description file is preferred (`Pool_1_2.wsdl` over
/// `Pool.wsdl`) and which SOAP envelope the adapter speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl ApiVersion {
    /// The version this client targets unless told otherwise.
    pub const DEFAULT: ApiVersion = ApiVersion { major: 1, minor: 2 };

    /// Creates a new [`ApiVersion`].
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Suffix appended to versioned description names, e.g. `_1_2`.
    pub fn file_suffix(self) -> String {
        format!("_{}_{}", self.major, self.minor)
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl std::str::FromStr for ApiVersion {
    type Err = HeraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HeraError::InvalidArgument {
            argument: "api version".to_string(),
            reason: format!("'{s}' is not of the form <major>.<minor>"),
        };
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

// ---------------------------------------------------------------------------
// Cache URL patterns
// ---------------------------------------------------------------------------

/// A cache URL pattern split into the three parts the cache API expects.
///
/// Host and path may contain `*` wildcards, e.g. `http://*.example.com/img/*`.
/// Host and path are taken verbatim from the caller's text: no case folding,
/// port elision, percent-encoding or dot-segment removal. The host includes
/// the port when one is given; query and fragment are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPattern {
    /// Protocol, e.g. `http`.
    pub scheme: String,
    /// Host name pattern, with `:port` when present.
    pub host: String,
    /// Path pattern, always starting with `/`.
    pub path: String,
}

impl UrlPattern {
    /// Splits `pattern` into scheme, host and path.
    ///
    /// The pattern must be an absolute URL with an authority.
    pub fn parse(pattern: &str) -> Result<Self, HeraError> {
        let invalid = |reason: String| HeraError::InvalidArgument {
            argument: "url pattern".to_string(),
            reason,
        };
        let url = Url::parse(pattern).map_err(|e| invalid(format!("'{pattern}': {e}")))?;

        let (_, rest) = pattern
            .split_once("://")
            .ok_or_else(|| invalid(format!("'{pattern}' has no host")))?;
        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, remainder) = rest.split_at(authority_end);
        let host = authority.rsplit('@').next().unwrap_or(authority);
        if host.is_empty() {
            return Err(invalid(format!("'{pattern}' has no host")));
        }

        let path_end = remainder.find(['?', '#']).unwrap_or(remainder.len());
        let path = match &remainder[..path_end] {
            "" => "/",
            path => path,
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            path: path.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Cache results
// ---------------------------------------------------------------------------

/// Global statistics for the appliance's content cache.
///
/// Fields the appliance does not report are left at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalCacheInfo {
    /// Number of objects currently cached.
    pub entries: u64,
    /// Maximum number of objects the cache may hold.
    pub max_entries: u64,
    /// Bytes of cache memory in use.
    pub memory_used: u64,
    /// Bytes of memory allotted to the cache.
    pub total_memory: u64,
    /// Percentage of lookups served from cache.
    pub hit_rate: f64,
    /// Lookups that were served from cache.
    pub hits: u64,
    /// Lookups that missed the cache.
    pub misses: u64,
}

/// One cached object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Protocol the object was fetched over.
    pub protocol: String,
    /// Host the object belongs to.
    pub host: String,
    /// Request path of the object.
    pub path: String,
    /// Size of the cached body in bytes, when reported.
    pub size: u64,
    /// Seconds until the entry expires, when reported.
    pub expiry_time: i64,
}

impl CacheEntry {
    /// Rebuilds the full URL of the cached object (`scheme://host/path`).
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.protocol, self.host, self.path)
    }
}

/// Result of a cache lookup by pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheContent {
    /// Total number of matching objects (may exceed `matching_items.len()`
    /// when a limit was applied).
    pub number_matching_items: u64,
    /// The matching objects that were returned.
    pub matching_items: Vec<CacheEntry>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
