//! Port traits between the Hera domain and the infrastructure that talks to
//! the appliance.
//!
//! The domain never sees SOAP, XML or HTTP. It asks a [`ServiceBinder`] to
//! turn a service-description file into a bound handle, and drives that
//! handle through closed, per-module interfaces:
//!
//! | Module | Interface |
//! |--------|-----------|
//! | `Pool` | [`PoolService`] |
//! | `VirtualServer` | [`VirtualServerService`] |
//! | `System.Cache` | [`CacheService`] |
//!
//! A bound handle exposes whichever of these views its module supports via
//! [`BoundService`].

use std::path::Path;

use async_trait::async_trait;

use crate::{
    ApiVersion, CacheContent, Credential, Endpoint, GlobalCacheInfo, HeraResult, ModuleName,
    NodeName, PoolName, UrlPattern, VirtualServerName,
};

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Everything a binder needs to produce a handle for one module.
#[derive(Debug, Clone, Copy)]
pub struct BindRequest<'a> {
    /// Module being bound (normalized logical name).
    pub module: &'a ModuleName,
    /// Description file resolved for the module.
    pub location: &'a Path,
    /// Control-API endpoint all calls are sent to.
    pub endpoint: &'a Endpoint,
    /// Credential to build the transport from.
    pub credential: &'a Credential,
    /// Control-API version in use.
    pub api_version: ApiVersion,
}

/// Turns a service description into a ready-to-call handle.
///
/// Binding is local work only (reading and validating the description and
/// building an authenticated transport); it must not contact the endpoint.
/// Implementations must build a **fresh** transport from
/// [`BindRequest::credential`] on every call: transports are not shared
/// between bindings.
pub trait ServiceBinder: Send + Sync {
    /// The handle type produced by this binder.
    type Handle: BoundService;

    /// Binds the description at `request.location`.
    ///
    /// # Errors
    ///
    /// [`crate::HeraError::Configuration`] if the description cannot be read
    /// or is not a usable service description.
    fn bind(&self, request: &BindRequest<'_>) -> HeraResult<Self::Handle>;
}

/// A live handle for one bound module.
///
/// The capability accessors return `Some` only for the interface matching the
/// bound module.
pub trait BoundService: Send + Sync {
    /// Module this handle was bound for.
    fn module(&self) -> &ModuleName;

    /// `Pool` operations, when this handle is bound to the `Pool` module.
    fn as_pool(&self) -> Option<&dyn PoolService> {
        None
    }

    /// `VirtualServer` operations, when bound to the `VirtualServer` module.
    fn as_virtual_server(&self) -> Option<&dyn VirtualServerService> {
        None
    }

    /// `System.Cache` operations, when bound to the `System.Cache` module.
    fn as_cache(&self) -> Option<&dyn CacheService> {
        None
    }
}

// ---------------------------------------------------------------------------
// Module interfaces
// ---------------------------------------------------------------------------

/// Remote operations of the `Pool` module.
///
/// Multi-pool operations take parallel slices: `nodes[i]` applies to
/// `pools[i]`.
#[async_trait]
pub trait PoolService: Send + Sync {
    /// `getPoolNames()`
    async fn get_pool_names(&self) -> HeraResult<Vec<PoolName>>;

    /// `getNodes(pools)`
    async fn get_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>>;

    /// `getNodesConnectionCounts(nodes)`: one count per requested node.
    async fn get_nodes_connection_counts(&self, nodes: &[NodeName]) -> HeraResult<Vec<u64>>;

    /// `getDisabledNodes(pools)`
    async fn get_disabled_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>>;

    /// `disableNodes(pools, nodes)`
    async fn disable_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()>;

    /// `enableNodes(pools, nodes)`
    async fn enable_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()>;

    /// `getDrainingNodes(pools)`
    async fn get_draining_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>>;

    /// `setDrainingNodes(pools, nodes)`: replaces the draining set.
    async fn set_draining_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()>;
}

/// Remote operations of the `VirtualServer` module.
#[async_trait]
pub trait VirtualServerService: Send + Sync {
    /// `getVirtualServerNames()`
    async fn get_virtual_server_names(&self) -> HeraResult<Vec<VirtualServerName>>;

    /// `getEnabled(names)`: one flag per requested virtual server.
    async fn get_enabled(&self, names: &[VirtualServerName]) -> HeraResult<Vec<bool>>;
}

/// Remote operations of the `System.Cache` module.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// `getGlobalCacheInfo()`
    async fn get_global_cache_info(&self) -> HeraResult<GlobalCacheInfo>;

    /// `clearWebCache()`
    async fn clear_web_cache(&self) -> HeraResult<()>;

    /// `clearMatchingCacheContent(protocol, host, path)`
    async fn clear_matching_cache_content(&self, pattern: &UrlPattern) -> HeraResult<()>;

    /// `getCacheContent(protocol, host, path, max_objects)`
    async fn get_cache_content(
        &self,
        pattern: &UrlPattern,
        max_objects: Option<u32>,
    ) -> HeraResult<CacheContent>;
}
