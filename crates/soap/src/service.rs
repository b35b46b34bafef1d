//! [`SoapService`]: a bound module handle that forwards typed calls as SOAP
//! requests.

use async_trait::async_trait;
use hera::{
    BoundService, CacheContent, CacheService, Endpoint, GlobalCacheInfo, HeraError, HeraResult,
    KnownModule, ModuleName, NodeName, PoolName, PoolService, RemoteError, RemoteErrorKind,
    UrlPattern, VirtualServerName, VirtualServerService,
};
use tracing::{debug, instrument};

use crate::description::ServiceDescription;
use crate::envelope::{self, SoapVersion, Value};
use crate::response::{self, invalid_response, Element, Reply};
use crate::transport::{HttpAuthenticated, RawResponse};

/// A module bound over SOAP.
///
/// Only the interface matching the bound module is exposed through
/// [`BoundService`]; any other module still binds but offers no typed view.
#[derive(Debug)]
pub struct SoapService {
    module: ModuleName,
    kind: Option<KnownModule>,
    description: ServiceDescription,
    endpoint: Endpoint,
    version: SoapVersion,
    transport: HttpAuthenticated,
}

impl SoapService {
    pub(crate) fn new(
        module: ModuleName,
        description: ServiceDescription,
        endpoint: Endpoint,
        version: SoapVersion,
        transport: HttpAuthenticated,
    ) -> Self {
        Self {
            kind: KnownModule::from_module(&module),
            module,
            description,
            endpoint,
            version,
            transport,
        }
    }

    /// Description this handle was bound from.
    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    /// SOAP version used on the wire.
    pub fn soap_version(&self) -> SoapVersion {
        self.version
    }

    /// Calls `operation` with positional `params` and returns its return value.
    ///
    /// Parameter names come from the description's input message when it
    /// declares one part per argument; otherwise the supplied names are used.
    #[instrument(skip(self, params), fields(module = %self.module))]
    async fn invoke(
        &self,
        operation: &str,
        params: Vec<(&str, Value)>,
    ) -> HeraResult<Option<Element>> {
        let declared = self
            .description
            .operation(operation)
            .ok_or_else(|| HeraError::Configuration {
                path: self.description.location.clone(),
                reason: format!("operation '{operation}' is not declared by module '{}'", self.module),
            })?;

        let named: Vec<(String, Value)> = if declared.input_parts.len() == params.len() {
            declared
                .input_parts
                .iter()
                .cloned()
                .zip(params.into_iter().map(|(_, value)| value))
                .collect()
        } else {
            params
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect()
        };

        let action = declared
            .soap_action
            .clone()
            .unwrap_or_else(|| default_action(&self.description.target_namespace, operation));
        let body = envelope::request(
            self.version,
            &self.description.target_namespace,
            operation,
            &named,
        );

        let raw = self
            .transport
            .post(&self.endpoint, operation, self.version, &action, body)
            .await?;
        debug!(status = raw.status, "Received SOAP response");
        let value = interpret(operation, raw)
            .inspect_err(|e| debug!(error = %e, "Remote call failed"))?;
        Ok(value)
    }
}

/// `{namespace}{operation}` for slash-terminated namespaces, otherwise
/// `{namespace}#{operation}`.
fn default_action(namespace: &str, operation: &str) -> String {
    if namespace.ends_with('/') {
        format!("{namespace}{operation}")
    } else {
        format!("{namespace}#{operation}")
    }
}

fn interpret(operation: &str, raw: RawResponse) -> Result<Option<Element>, RemoteError> {
    match (response::read_envelope(&raw.body), raw.is_success()) {
        (Ok(Reply::Fault { code, message }), _) => Err(RemoteError::new(
            operation,
            RemoteErrorKind::Fault {
                code,
                message: message.clone(),
            },
            message,
        )),
        (Ok(Reply::Return(value)), true) => Ok(value),
        (Err(e), true) => Err(invalid_response(operation, e)),
        (_, false) => Err(RemoteError::new(
            operation,
            RemoteErrorKind::Transport,
            format!("HTTP {} without a SOAP fault", raw.status),
        )),
    }
}

fn decoded<T>(operation: &str, result: Result<T, response::DecodeError>) -> HeraResult<T> {
    result.map_err(|e| invalid_response(operation, e).into())
}

fn pool_names(value: Option<&Element>) -> Vec<PoolName> {
    response::string_list(value)
        .into_iter()
        .filter_map(PoolName::new)
        .collect()
}

fn node_groups(value: Option<&Element>) -> Vec<Vec<NodeName>> {
    response::nested_string_list(value)
        .into_iter()
        .map(|group| group.into_iter().filter_map(NodeName::new).collect())
        .collect()
}

fn pattern_params(pattern: &UrlPattern) -> Vec<(&'static str, Value)> {
    vec![
        ("protocol", Value::String(pattern.scheme.clone())),
        ("host", Value::String(pattern.host.clone())),
        ("path", Value::String(pattern.path.clone())),
    ]
}

impl BoundService for SoapService {
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

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

#[async_trait]
impl PoolService for SoapService {
    async fn get_pool_names(&self) -> HeraResult<Vec<PoolName>> {
        let value = self.invoke("getPoolNames", vec![]).await?;
        Ok(pool_names(value.as_ref()))
    }

    async fn get_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>> {
        let value = self
            .invoke("getNodes", vec![("names", Value::strings(pools))])
            .await?;
        Ok(node_groups(value.as_ref()))
    }

    async fn get_nodes_connection_counts(&self, nodes: &[NodeName]) -> HeraResult<Vec<u64>> {
        let operation = "getNodesConnectionCounts";
        let value = self
            .invoke(operation, vec![("nodes", Value::strings(nodes))])
            .await?;
        decoded(operation, response::u64_list(value.as_ref()))
    }

    async fn get_disabled_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>> {
        let value = self
            .invoke("getDisabledNodes", vec![("names", Value::strings(pools))])
            .await?;
        Ok(node_groups(value.as_ref()))
    }

    async fn disable_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()> {
        self.invoke(
            "disableNodes",
            vec![
                ("names", Value::strings(pools)),
                ("values", Value::nested_strings(nodes)),
            ],
        )
        .await?;
        Ok(())
    }

    async fn enable_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()> {
        self.invoke(
            "enableNodes",
            vec![
                ("names", Value::strings(pools)),
                ("values", Value::nested_strings(nodes)),
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_draining_nodes(&self, pools: &[PoolName]) -> HeraResult<Vec<Vec<NodeName>>> {
        let value = self
            .invoke("getDrainingNodes", vec![("names", Value::strings(pools))])
            .await?;
        Ok(node_groups(value.as_ref()))
    }

    async fn set_draining_nodes(&self, pools: &[PoolName], nodes: &[Vec<NodeName>]) -> HeraResult<()> {
        self.invoke(
            "setDrainingNodes",
            vec![
                ("names", Value::strings(pools)),
                ("values", Value::nested_strings(nodes)),
            ],
        )
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VirtualServer
// ---------------------------------------------------------------------------

#[async_trait]
impl VirtualServerService for SoapService {
    async fn get_virtual_server_names(&self) -> HeraResult<Vec<VirtualServerName>> {
        let value = self.invoke("getVirtualServerNames", vec![]).await?;
        Ok(response::string_list(value.as_ref())
            .into_iter()
            .filter_map(VirtualServerName::new)
            .collect())
    }

    async fn get_enabled(&self, names: &[VirtualServerName]) -> HeraResult<Vec<bool>> {
        let operation = "getEnabled";
        let value = self
            .invoke(operation, vec![("names", Value::strings(names))])
            .await?;
        decoded(operation, response::bool_list(value.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// System.Cache
// ---------------------------------------------------------------------------

#[async_trait]
impl CacheService for SoapService {
    async fn get_global_cache_info(&self) -> HeraResult<GlobalCacheInfo> {
        let operation = "getGlobalCacheInfo";
        let value = self.invoke(operation, vec![]).await?;
        decoded(operation, response::global_cache_info(value.as_ref()))
    }

    async fn clear_web_cache(&self) -> HeraResult<()> {
        self.invoke("clearWebCache", vec![]).await?;
        Ok(())
    }

    async fn clear_matching_cache_content(&self, pattern: &UrlPattern) -> HeraResult<()> {
        self.invoke("clearMatchingCacheContent", pattern_params(pattern))
            .await?;
        Ok(())
    }

    async fn get_cache_content(
        &self,
        pattern: &UrlPattern,
        max_objects: Option<u32>,
    ) -> HeraResult<CacheContent> {
        let operation = "getCacheContent";
        let mut params = pattern_params(pattern);
        params.push((
            "max_objects",
            max_objects.map_or(Value::Nil, |max| Value::Int(i64::from(max))),
        ));
        let value = self.invoke(operation, params).await?;
        decoded(operation, response::cache_content(value.as_ref()))
    }
}
