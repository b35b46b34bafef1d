//! Client library for the SOAP control API of a load balancer / cache
//! appliance.
//!
//! Hera resolves a logical API module (`Pool`, `VirtualServer`,
//! `System.Cache`, ...) to its service description on disk, binds a handle for
//! it lazily, and exposes typed operations that each forward one remote call.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate performs no network I/O. The
//! [`ServiceBinder`] trait and the per-module service traits are implemented
//! by infrastructure crates (the `soap` crate for the real appliance, fakes in
//! tests).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype names (`ModuleName`, `PoolName`, `NodeName`, ...) and module-name normalization |
//! | [`types`] | Value types (`Endpoint`, `Credential`, `ApiVersion`, cache results, ...) |
//! | [`errors`] | [`HeraError`], [`RemoteError`], [`RetryPolicy`] |
//! | [`services`] | Port traits: [`ServiceBinder`], [`BoundService`], module interfaces |
//! | [`resolver`] | Description directory listing and module resolution |
//! | [`binding`] | [`BindingCache`]: one binding at a time, rebound only on module change |
//! | [`client`] | [`Client`]: the typed operation surface |

pub mod binding;
pub mod client;
pub mod errors;
pub mod identifiers;
pub mod resolver;
pub mod services;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use binding::{Binding, BindingCache};
pub use client::{Client, ClientConfig};
pub use errors::{HeraError, HeraResult, RemoteError, RemoteErrorKind, RetryPolicy};
pub use identifiers::{
    normalize_module_name, KnownModule, ModuleName, NodeName, PoolName, SessionId,
    VirtualServerName, DESCRIPTION_SUFFIX,
};
pub use resolver::{
    list_available_modules, resolve_module_location, resolve_versioned_module_location,
    DEFAULT_DESCRIPTION_DIR,
};
pub use services::{
    BindRequest, BoundService, CacheService, PoolService, ServiceBinder, VirtualServerService,
};
pub use types::{
    ApiVersion, CacheContent, CacheEntry, Credential, Endpoint, GlobalCacheInfo, Timestamp,
    UrlPattern,
};
