//! In-memory appliance used by the client integration tests.
//!
//! [`FakeBinder`] hands out [`FakeHandle`]s that share one [`FakeAppliance`].
//! Every bind and every remote call is recorded so tests can assert on call
//! order and on how often the client rebinds.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hera::{
    BindRequest, BoundService, CacheContent, CacheEntry, CacheService, Client, ClientConfig,
    Credential, Endpoint, GlobalCacheInfo, HeraResult, KnownModule, ModuleName, NodeName,
    PoolName, PoolService, ServiceBinder, UrlPattern, VirtualServerName, VirtualServerService,
};

#[derive(Default)]
pub struct ApplianceState {
    pub pools: BTreeMap<String, Vec<String>>,
    pub connections: BTreeMap<String, u64>,
    pub disabled: BTreeMap<String, Vec<String>>,
    pub draining: BTreeMap<String, Vec<String>>,
    pub virtual_servers: Vec<(String, bool)>,
    pub cache: Vec<CacheEntry>,
    pub cache_info: GlobalCacheInfo,
    /// Remote operations in call order.
    pub calls: Vec<String>,
    /// Description files bound, in order.
    pub binds: Vec<PathBuf>,
}

#[derive(Default)]
pub struct FakeAppliance {
    pub state: Mutex<ApplianceState>,
}

impl FakeAppliance {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn binds(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().binds.clone()
    }

    fn record(&self, operation: &str) {
        self.state.lock().unwrap().calls.push(operation.to_string());
    }
}

pub struct FakeBinder {
    pub appliance: Arc<FakeAppliance>,
}

impl ServiceBinder for FakeBinder {
    type Handle = FakeHandle;

    fn bind(&self, request: &BindRequest<'_>) -> HeraResult<FakeHandle> {
        self.appliance
            .state
            .lock()
            .unwrap()
            .binds
            .push(request.location.to_path_buf());
        Ok(FakeHandle {
            module: request.module.clone(),
            kind: KnownModule::from_module(request.module),
            appliance: Arc::clone(&self.appliance),
        })
    }
}

pub struct FakeHandle {
    module: ModuleName,
    kind: Option<KnownModule>,
    appliance: Arc<FakeAppliance>,
}

impl BoundService for FakeHandle {
    fn module(&self) -> &ModuleName {
        &self.module
    }

    fn as_pool(&self) -> Option<&dyn PoolService> {
        (self.kind == Some(KnownModule::Pool)).then_some(self as &dyn PoolService)
    }

    fn as_virtual_server(&self) -> Option<&dyn VirtualServerService> {
        (self.kind == Some(KnownModule::VirtualServer)).then_some(self as &dyn VirtualServerService)
    }

    fn as_cache(&self) -> Option<&dyn CacheService> {
        (self.kind == Some(KnownModule::SystemCache)).then_some(self as &dyn CacheService)
    }
}

fn pool_lists(
    table: &BTreeMap<String, Vec<String>>,
    pools: &[PoolName],
) -> Vec<Vec<NodeName>> {
    pools
        .iter()
        .map(|pool| {
            table
                .get(pool.as_str())
                .map(|nodes| nodes.iter().filter_map(|n| NodeName::new(n.as_str())).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn assign(table: &mut BTreeMap<String, Vec<String>>, pools: &[PoolName], nodes: &[Vec<NodeName>]) {
    for (pool, nodes) in pools.iter().zip(nodes) {
        table.insert(
            pool.to_string(),
            nodes.iter().map(|n| n.to_string()).collect(),
        );
    }
}

#[async_trait]
impl PoolService for FakeHandle {
    async fn get_pool_names(&self) -> HeraResult<Vec<PoolName>> {
        self.appliance.record("getPoolNames");
        let state = self.appliance.state.lock().unwrap();
        Ok(state.pools.keys().filter_map(|p| PoolName::new(p.as_str())).collect())
    }

    async fn get_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>> {
        self.appliance.record("getNodes");
        Ok(pool_lists(&self.appliance.state.lock().unwrap().pools, pools))
    }

    async fn get_nodes_connection_counts(&self, nodes: &[NodeName]) -> HeraResult<Vec<u64>> {
        self.appliance.record("getNodesConnectionCounts");
        let state = self.appliance.state.lock().unwrap();
        Ok(nodes
            .iter()
            .map(|n| state.connections.get(n.as_str()).copied().unwrap_or(0))
            .collect())
    }

    async fn get_disabled_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>> {
        self.appliance.record("getDisabledNodes");
        Ok(pool_lists(&self.appliance.state.lock().unwrap().disabled, pools))
    }

    async fn disable_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()> {
        self.appliance.record("disableNodes");
        assign(&mut self.appliance.state.lock().unwrap().disabled, pools, nodes);
        Ok(())
    }

    async fn enable_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()> {
        self.appliance.record("enableNodes");
        let mut state = self.appliance.state.lock().unwrap();
        for (pool, nodes) in pools.iter().zip(nodes) {
            if let Some(disabled) = state.disabled.get_mut(pool.as_str()) {
                disabled.retain(|d| !nodes.iter().any(|n| n.as_str() == d));
            }
        }
        Ok(())
    }

    async fn get_draining_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>> {
        self.appliance.record("getDrainingNodes");
        Ok(pool_lists(&self.appliance.state.lock().unwrap().draining, pools))
    }

    async fn set_draining_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()> {
        self.appliance.record("setDrainingNodes");
        assign(&mut self.appliance.state.lock().unwrap().draining, pools, nodes);
        Ok(())
    }
}

#[async_trait]
impl VirtualServerService for FakeHandle {
    async fn get_virtual_server_names(&self) -> HeraResult<Vec<VirtualServerName>> {
        self.appliance.record("getVirtualServerNames");
        let state = self.appliance.state.lock().unwrap();
        Ok(state
            .virtual_servers
            .iter()
            .filter_map(|(name, _)| VirtualServerName::new(name.as_str()))
            .collect())
    }

    async fn get_enabled(&self, names: &[VirtualServerName]) -> HeraResult<Vec<bool>> {
        self.appliance.record("getEnabled");
        let state = self.appliance.state.lock().unwrap();
        Ok(names
            .iter()
            .map(|name| {
                state
                    .virtual_servers
                    .iter()
                    .any(|(vs, enabled)| vs == name.as_str() && *enabled)
            })
            .collect())
    }
}

/// Matches `value` against a pattern where `*` stands for any run of characters.
fn glob_match(pattern: &str, value: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = value.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.is_empty()
}

fn matches(pattern: &UrlPattern, entry: &CacheEntry) -> bool {
    pattern.scheme == entry.protocol
        && glob_match(&pattern.host, &entry.host)
        && glob_match(&pattern.path, &entry.path)
}

#[async_trait]
impl CacheService for FakeHandle {
    async fn get_global_cache_info(&self) -> HeraResult<GlobalCacheInfo> {
        self.appliance.record("getGlobalCacheInfo");
        Ok(self.appliance.state.lock().unwrap().cache_info.clone())
    }

    async fn clear_web_cache(&self) -> HeraResult<()> {
        self.appliance.record("clearWebCache");
        self.appliance.state.lock().unwrap().cache.clear();
        Ok(())
    }

    async fn clear_matching_cache_content(&self, pattern: &UrlPattern) -> HeraResult<()> {
        self.appliance.record("clearMatchingCacheContent");
        self.appliance
            .state
            .lock()
            .unwrap()
            .cache
            .retain(|entry| !matches(pattern, entry));
        Ok(())
    }

    async fn get_cache_content(
        &self,
        pattern: &UrlPattern,
        max_objects: Option<u32>,
    ) -> HeraResult<CacheContent> {
        self.appliance.record("getCacheContent");
        let state = self.appliance.state.lock().unwrap();
        let matching: Vec<CacheEntry> = state
            .cache
            .iter()
            .filter(|entry| matches(pattern, entry))
            .cloned()
            .collect();
        let number_matching_items = matching.len() as u64;
        let limit = max_objects.map_or(usize::MAX, |m| m as usize);
        Ok(CacheContent {
            number_matching_items,
            matching_items: matching.into_iter().take(limit).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn description_dir(modules: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for module in modules {
        File::create(dir.path().join(format!("{module}.wsdl"))).unwrap();
    }
    dir
}

pub fn cache_entry(protocol: &str, host: &str, path: &str) -> CacheEntry {
    CacheEntry {
        protocol: protocol.to_string(),
        host: host.to_string(),
        path: path.to_string(),
        size: 1024,
        expiry_time: 60,
    }
}

/// An appliance with two pools, two virtual servers and a small cache.
pub fn populated_appliance() -> Arc<FakeAppliance> {
    let appliance = FakeAppliance::default();
    {
        let mut state = appliance.state.lock().unwrap();
        state.pools.insert(
            "web".into(),
            vec!["10.0.0.1:80".into(), "10.0.0.2:80".into()],
        );
        state.pools.insert("api".into(), vec!["10.0.1.1:8080".into()]);
        state.connections.insert("10.0.0.1:80".into(), 0);
        state.connections.insert("10.0.0.2:80".into(), 7);
        state.connections.insert("10.0.1.1:8080".into(), 0);
        state.virtual_servers = vec![("www".into(), true), ("staging".into(), false)];
        state.cache = vec![
            cache_entry("http", "www.example.com", "/index.html"),
            cache_entry("http", "www.example.com", "/images/logo.png"),
            cache_entry("http", "www.example.com", "/images/banner.png"),
            cache_entry("https", "shop.example.com", "/cart"),
        ];
        state.cache_info = GlobalCacheInfo {
            entries: 4,
            max_entries: 10_000,
            memory_used: 4096,
            total_memory: 1 << 20,
            hit_rate: 87.5,
            hits: 7,
            misses: 1,
        };
    }
    Arc::new(appliance)
}

pub fn connect(
    dir: &Path,
    initial_module: &str,
    appliance: &Arc<FakeAppliance>,
) -> HeraResult<Client<FakeBinder>> {
    let config = ClientConfig::new(
        Endpoint::parse("https://lb.example.com:9090/soap").unwrap(),
        Credential::new("admin", "secret"),
    )
    .with_initial_module(initial_module)
    .with_description_dir(dir);
    Client::connect(
        config,
        FakeBinder {
            appliance: Arc::clone(appliance),
        },
    )
}

pub fn pool(name: &str) -> PoolName {
    PoolName::new(name).unwrap()
}

pub fn node(name: &str) -> NodeName {
    NodeName::new(name).unwrap()
}
