//! The typed client surface.
//!
//! Every operation selects its module through the [`BindingCache`] and then
//! forwards exactly one remote call to the bound handle. Two operations add
//! client-side behaviour:
//!
//! - [`Client::disable_nodes`] reads the nodes' active-connection counts
//!   first and refuses with [`HeraError::Policy`] if any connections remain.
//!   The check and the disable are separate calls, so connections opened in
//!   between are not caught; the appliance offers nothing transactional.
//! - [`Client::flush_objects_by_pattern`] can look up the matching objects
//!   before flushing and return their URLs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::binding::{Binding, BindingCache};
use crate::resolver::{list_available_modules, DEFAULT_DESCRIPTION_DIR};
use crate::services::{BoundService, CacheService, PoolService, ServiceBinder, VirtualServerService};
use crate::{
    ApiVersion, CacheEntry, Credential, Endpoint, GlobalCacheInfo, HeraError, HeraResult,
    KnownModule, ModuleName, NodeName, PoolName, RemoteError, RemoteErrorKind, SessionId,
    UrlPattern, VirtualServerName,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction parameters for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control-API endpoint.
    pub endpoint: Endpoint,
    /// Credential for the appliance.
    pub credential: Credential,
    /// Module bound at construction. Defaults to `System.Cache`.
    pub initial_module: String,
    /// Directory holding the service descriptions. Defaults to
    /// [`DEFAULT_DESCRIPTION_DIR`].
    pub description_dir: PathBuf,
    /// Control-API version. Defaults to [`ApiVersion::DEFAULT`].
    pub api_version: ApiVersion,
}

impl ClientConfig {
    /// Configuration with default module, directory and version.
    pub fn new(endpoint: Endpoint, credential: Credential) -> Self {
        Self {
            endpoint,
            credential,
            initial_module: KnownModule::SystemCache.as_str().to_string(),
            description_dir: PathBuf::from(DEFAULT_DESCRIPTION_DIR),
            api_version: ApiVersion::DEFAULT,
        }
    }

    /// Sets the module bound at construction.
    pub fn with_initial_module(mut self, module: impl Into<String>) -> Self {
        self.initial_module = module.into();
        self
    }

    /// Sets the service-description directory.
    pub fn with_description_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.description_dir = dir.into();
        self
    }

    /// Sets the control-API version.
    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A session against one appliance.
///
/// All operations take `&mut self`: a module switch mutates the session, so
/// one client serves one caller at a time. Use one client per task for
/// parallel work.
pub struct Client<B: ServiceBinder> {
    session: SessionId,
    bindings: BindingCache<B>,
}

impl<B: ServiceBinder> Client<B> {
    /// Creates a client and binds `config.initial_module`.
    ///
    /// No remote call is made; the first operation contacts the endpoint.
    ///
    /// # Errors
    ///
    /// - [`HeraError::Configuration`] if the description directory is missing
    ///   or the initial description cannot be bound.
    /// - [`HeraError::ModuleNotFound`] if the initial module is not listed.
    pub fn connect(config: ClientConfig, binder: B) -> HeraResult<Self> {
        let session = SessionId::new_random();
        let bindings = BindingCache::new(
            binder,
            config.endpoint,
            config.credential,
            config.api_version,
            &config.initial_module,
            &config.description_dir,
        )?;
        Ok(Self { session, bindings })
    }

    /// Identifier recorded on this session's tracing spans.
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        self.bindings.endpoint()
    }

    // -----------------------------------------------------------------------
    // Module selection
    // -----------------------------------------------------------------------

    /// Binds `name` unless it is already the bound module.
    pub fn ensure_module_bound(&mut self, name: &str) -> HeraResult<()> {
        self.bindings.ensure_module_bound(name)
    }

    /// Binds `name` resolved in `directory` unless it is already bound.
    pub fn ensure_module_bound_in(&mut self, name: &str, directory: &Path) -> HeraResult<()> {
        self.bindings.ensure_module_bound_in(name, directory)
    }

    /// Handle of the bound module.
    pub fn current_client(&self) -> Arc<B::Handle> {
        self.bindings.current_client()
    }

    /// The current binding record.
    pub fn binding(&self) -> &Binding<B::Handle> {
        self.bindings.binding()
    }

    /// Number of successful binds, counting the initial one.
    pub fn bind_count(&self) -> u64 {
        self.bindings.bind_count()
    }

    /// Modules available in the current description directory.
    pub fn available_modules(&self) -> HeraResult<BTreeSet<ModuleName>> {
        list_available_modules(self.bindings.binding().directory())
    }

    fn handle_for(&mut self, module: KnownModule) -> HeraResult<Arc<B::Handle>> {
        self.bindings.ensure_module_bound(module.as_str())?;
        Ok(self.bindings.current_client())
    }

    fn missing_interface(&self, interface: &str) -> HeraError {
        let binding = self.bindings.binding();
        HeraError::missing_interface(binding.module(), binding.location(), interface)
    }

    fn pool<'h>(&self, handle: &'h B::Handle) -> HeraResult<&'h dyn PoolService> {
        handle.as_pool().ok_or_else(|| self.missing_interface("Pool"))
    }

    fn virtual_server<'h>(&self, handle: &'h B::Handle) -> HeraResult<&'h dyn VirtualServerService> {
        handle
            .as_virtual_server()
            .ok_or_else(|| self.missing_interface("VirtualServer"))
    }

    fn cache<'h>(&self, handle: &'h B::Handle) -> HeraResult<&'h dyn CacheService> {
        handle.as_cache().ok_or_else(|| self.missing_interface("System.Cache"))
    }

    // -----------------------------------------------------------------------
    // VirtualServer
    // -----------------------------------------------------------------------

    /// Names of all virtual servers.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_virtual_server_names(&mut self) -> HeraResult<Vec<VirtualServerName>> {
        let handle = self.handle_for(KnownModule::VirtualServer)?;
        self.virtual_server(&handle)?.get_virtual_server_names().await
    }

    /// Whether each of `names` is enabled, in the same order.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_enabled_virtual_servers(
        &mut self,
        names: &[VirtualServerName],
    ) -> HeraResult<Vec<bool>> {
        let handle = self.handle_for(KnownModule::VirtualServer)?;
        self.virtual_server(&handle)?.get_enabled(names).await
    }

    // -----------------------------------------------------------------------
    // Pool
    // -----------------------------------------------------------------------

    /// Names of all pools.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_pool_names(&mut self) -> HeraResult<Vec<PoolName>> {
        let handle = self.handle_for(KnownModule::Pool)?;
        self.pool(&handle)?.get_pool_names().await
    }

    /// Nodes in `pool`.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_nodes(&mut self, pool: &PoolName) -> HeraResult<Vec<NodeName>> {
        let handle = self.handle_for(KnownModule::Pool)?;
        let nodes = self.pool(&handle)?.get_nodes(std::slice::from_ref(pool)).await?;
        Ok(first_list(nodes))
    }

    /// Active connections per node.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_nodes_connection_counts(
        &mut self,
        nodes: &[NodeName],
    ) -> HeraResult<BTreeMap<NodeName, u64>> {
        let handle = self.handle_for(KnownModule::Pool)?;
        let service = self.pool(&handle)?;
        connection_counts(service, nodes).await
    }

    /// Disabled nodes in `pool`.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_disabled_nodes(&mut self, pool: &PoolName) -> HeraResult<Vec<NodeName>> {
        let handle = self.handle_for(KnownModule::Pool)?;
        let nodes = self
            .pool(&handle)?
            .get_disabled_nodes(std::slice::from_ref(pool))
            .await?;
        Ok(first_list(nodes))
    }

    /// Disables `nodes` in `pool`, refusing while any of them still has
    /// active connections.
    ///
    /// # Errors
    ///
    /// [`HeraError::Policy`] if the summed connection count is non-zero; the
    /// disable call is then never issued.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn disable_nodes(&mut self, pool: &PoolName, nodes: &[NodeName]) -> HeraResult<()> {
        let handle = self.handle_for(KnownModule::Pool)?;
        let service = self.pool(&handle)?;

        let counts = checked_connection_counts(service, nodes).await?;
        let active_connections: u64 = counts.iter().sum();
        if active_connections != 0 {
            warn!(
                pool = %pool,
                active_connections,
                "Refusing to disable node(s) with active connections"
            );
            return Err(HeraError::Policy {
                pool: pool.clone(),
                nodes: nodes.to_vec(),
                active_connections,
            });
        }

        service
            .disable_nodes(std::slice::from_ref(pool), &[nodes.to_vec()])
            .await
    }

    /// Draining nodes in `pool`.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_draining_nodes(&mut self, pool: &PoolName) -> HeraResult<Vec<NodeName>> {
        let handle = self.handle_for(KnownModule::Pool)?;
        let nodes = self
            .pool(&handle)?
            .get_draining_nodes(std::slice::from_ref(pool))
            .await?;
        Ok(first_list(nodes))
    }

    /// Makes `nodes` the draining set of `pool`. An empty slice clears the
    /// draining state.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn set_draining_nodes(&mut self, pool: &PoolName, nodes: &[NodeName]) -> HeraResult<()> {
        let handle = self.handle_for(KnownModule::Pool)?;
        self.pool(&handle)?
            .set_draining_nodes(std::slice::from_ref(pool), &[nodes.to_vec()])
            .await
    }

    /// Re-enables `nodes` in `pool`.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn enable_nodes(&mut self, pool: &PoolName, nodes: &[NodeName]) -> HeraResult<()> {
        let handle = self.handle_for(KnownModule::Pool)?;
        self.pool(&handle)?
            .enable_nodes(std::slice::from_ref(pool), &[nodes.to_vec()])
            .await
    }

    // -----------------------------------------------------------------------
    // System.Cache
    // -----------------------------------------------------------------------

    /// Global cache statistics.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_global_cache_info(&mut self) -> HeraResult<GlobalCacheInfo> {
        let handle = self.handle_for(KnownModule::SystemCache)?;
        self.cache(&handle)?.get_global_cache_info().await
    }

    /// Flushes every object across all virtual servers.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn flush_all(&mut self) -> HeraResult<()> {
        let handle = self.handle_for(KnownModule::SystemCache)?;
        self.cache(&handle)?.clear_web_cache().await
    }

    /// Flushes objects matching `url`, which may contain `*` wildcards in the
    /// host and path.
    ///
    /// With `return_list` the matching objects are looked up first (an extra
    /// remote call) and their URLs returned; otherwise the result is empty.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn flush_objects_by_pattern(
        &mut self,
        url: &str,
        return_list: bool,
    ) -> HeraResult<Vec<String>> {
        let pattern = UrlPattern::parse(url)?;
        let handle = self.handle_for(KnownModule::SystemCache)?;
        let service = self.cache(&handle)?;

        let matched = if return_list {
            matching_entries(service, &pattern, None).await?
        } else {
            Vec::new()
        };

        service.clear_matching_cache_content(&pattern).await?;
        Ok(matched.iter().map(CacheEntry::url).collect())
    }

    /// Cached objects matching `url`, at most `limit` of them when given.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn get_objects_by_pattern(
        &mut self,
        url: &str,
        limit: Option<u32>,
    ) -> HeraResult<Vec<CacheEntry>> {
        let pattern = UrlPattern::parse(url)?;
        let handle = self.handle_for(KnownModule::SystemCache)?;
        matching_entries(self.cache(&handle)?, &pattern, limit).await
    }

    /// The first cached object matching `url`, if any.
    pub async fn get_object_by_pattern(&mut self, url: &str) -> HeraResult<Option<CacheEntry>> {
        let entries = self.get_objects_by_pattern(url, Some(1)).await?;
        Ok(entries.into_iter().next())
    }
}

fn first_list<T>(lists: Vec<Vec<T>>) -> Vec<T> {
    lists.into_iter().next().unwrap_or_default()
}

async fn connection_counts(
    service: &dyn PoolService,
    nodes: &[NodeName],
) -> HeraResult<BTreeMap<NodeName, u64>> {
    let counts = checked_connection_counts(service, nodes).await?;
    Ok(nodes.iter().cloned().zip(counts).collect())
}

/// One count per requested node, in request order. Repeated node names keep
/// their own entries.
async fn checked_connection_counts(
    service: &dyn PoolService,
    nodes: &[NodeName],
) -> HeraResult<Vec<u64>> {
    let counts = service.get_nodes_connection_counts(nodes).await?;
    if counts.len() != nodes.len() {
        return Err(RemoteError::new(
            "getNodesConnectionCounts",
            RemoteErrorKind::InvalidResponse,
            format!("asked for {} node(s), got {} count(s)", nodes.len(), counts.len()),
        )
        .into());
    }
    Ok(counts)
}

async fn matching_entries(
    service: &dyn CacheService,
    pattern: &UrlPattern,
    limit: Option<u32>,
) -> HeraResult<Vec<CacheEntry>> {
    let content = service.get_cache_content(pattern, limit).await?;
    if content.number_matching_items == 0 {
        return Ok(Vec::new());
    }
    Ok(content.matching_items)
}
