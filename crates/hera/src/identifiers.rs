//! Newtype domain identifiers.
//!
//! Every name the control API hands back or accepts is represented as a
//! distinct newtype wrapping a `String`. This prevents accidentally passing a
//! [`NodeName`] where a [`PoolName`] is expected even though both are plain
//! strings on the wire.
//!
//! [`ModuleName`] is special: it is *normalized* on construction so that a bare
//! name (`"Pool"`), a file name (`"Pool.wsdl"`) and a full path
//! (`"/usr/share/zeus/wsdl/Pool.wsdl"`) all produce the same identifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File suffix of a service description on disk.
pub const DESCRIPTION_SUFFIX: &str = ".wsdl";

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, AsRef<str>.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Appliance object names
// ---------------------------------------------------------------------------

string_id! {
    /// Name of a load-balancing pool as configured on the appliance.
    PoolName
}

string_id! {
    /// A back-end node in `host:port` form, as the appliance reports it.
    NodeName
}

string_id! {
    /// Name of a virtual server (a listening service on the appliance).
    VirtualServerName
}

// ---------------------------------------------------------------------------
// Module names
// ---------------------------------------------------------------------------

/// Strips directory components and the `.wsdl` suffix from `name`.
///
/// Both `/` and `\` count as separators and trailing separators are ignored,
/// so `"wsdl/Pool.wsdl/"` becomes `"Pool"`. Repeated suffixes are all removed,
/// which keeps the function idempotent.
pub fn normalize_module_name(name: &str) -> String {
    let trimmed = name.trim_end_matches(['/', '\\']);
    let mut base = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    while let Some(stripped) = base.strip_suffix(DESCRIPTION_SUFFIX) {
        base = stripped;
    }
    base.to_string()
}

/// Logical name of a control-API module (e.g. `Pool`, `System.Cache`).
///
/// Always stored in normalized form; see [`normalize_module_name`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    /// Normalizes `value` into a module name, returning `None` if nothing is
    /// left after normalization.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let normalized = normalize_module_name(value.as_ref());
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Returns the module name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this module's description, e.g. `Pool.wsdl`.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, DESCRIPTION_SUFFIX)
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The modules the typed client surface knows how to drive.
///
/// Any other module found in the description directory can still be bound
/// through [`crate::BindingCache`]; it just has no typed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModule {
    /// `Pool`: pools and their nodes.
    Pool,
    /// `VirtualServer`: listening services.
    VirtualServer,
    /// `System.Cache`: the content cache.
    SystemCache,
}

impl KnownModule {
    /// Canonical module name as it appears in the description directory.
    pub fn as_str(self) -> &'static str {
        match self {
            KnownModule::Pool => "Pool",
            KnownModule::VirtualServer => "VirtualServer",
            KnownModule::SystemCache => "System.Cache",
        }
    }

    /// Identifies the known module behind `module`, if any.
    pub fn from_module(module: &ModuleName) -> Option<Self> {
        match module.as_str() {
            "Pool" => Some(KnownModule::Pool),
            "VirtualServer" => Some(KnownModule::VirtualServer),
            "System.Cache" => Some(KnownModule::SystemCache),
            _ => None,
        }
    }
}

impl std::fmt::Display for KnownModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session identifier
// ---------------------------------------------------------------------------

/// Identifies one administrative session (one [`crate::Client`] instance).
///
/// Generated fresh for every client and recorded on tracing spans so all
/// activity from a single session can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
