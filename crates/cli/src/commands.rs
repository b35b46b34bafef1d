//! Subcommand dispatch. Each command maps onto one [`hera::Client`]
//! operation and returns its result as JSON.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use hera::{Client, ClientConfig, Credential, Endpoint, NodeName, PoolName, VirtualServerName};
use serde::Serialize;
use serde_json::Value;
use soap::{SoapBinder, TransportOptions};
use tracing::{debug, info};

use crate::{Cli, Command, RemoteCommand};

/// Result of a command that changes appliance state and returns nothing.
#[derive(Debug, Serialize)]
struct Acknowledged<'a> {
    operation: &'a str,
    ok: bool,
}

fn acknowledged(operation: &str) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(Acknowledged {
        operation,
        ok: true,
    })?)
}

fn pool(name: &str) -> anyhow::Result<PoolName> {
    PoolName::new(name).context("pool name must not be empty")
}

fn nodes(names: &[String]) -> anyhow::Result<Vec<NodeName>> {
    names
        .iter()
        .map(|name| NodeName::new(name.as_str()).context("node name must not be empty"))
        .collect()
}

fn connect(cli: &Cli) -> anyhow::Result<Client<SoapBinder>> {
    let endpoint = cli
        .endpoint
        .as_deref()
        .context("--endpoint (or HERA_ENDPOINT) is required")?;
    let username = cli
        .username
        .as_deref()
        .context("--username (or HERA_USERNAME) is required")?;
    let password = cli
        .password
        .as_deref()
        .context("--password (or HERA_PASSWORD) is required")?;

    let config = ClientConfig::new(Endpoint::parse(endpoint)?, Credential::new(username, password))
        .with_initial_module(cli.module.as_str())
        .with_description_dir(&cli.wsdl_path)
        .with_api_version(cli.api_version);
    let binder = SoapBinder::new(TransportOptions {
        timeout: Duration::from_secs(cli.timeout_secs),
        accept_invalid_certs: cli.insecure,
    });

    let client = Client::connect(config, binder)?;
    info!(
        session = %client.session_id(),
        endpoint = %client.endpoint(),
        module = %client.binding().module(),
        "Connected"
    );
    Ok(client)
}

pub async fn run(cli: &Cli) -> anyhow::Result<Value> {
    match &cli.command {
        Command::Modules => {
            let modules = hera::list_available_modules(&cli.wsdl_path)?;
            Ok(serde_json::to_value(modules)?)
        }
        Command::Remote(command) => {
            let mut client = connect(cli)?;
            run_remote(&mut client, command).await
        }
    }
}

async fn run_remote(client: &mut Client<SoapBinder>, command: &RemoteCommand) -> anyhow::Result<Value> {
    debug!(?command, "Running command");

    let output = match command {
        RemoteCommand::VirtualServers => serde_json::to_value(client.get_virtual_server_names().await?)?,
        RemoteCommand::EnabledVirtualServers { names } => {
            let names: Vec<VirtualServerName> = if names.is_empty() {
                client.get_virtual_server_names().await?
            } else {
                names
                    .iter()
                    .map(|name| {
                        VirtualServerName::new(name.as_str())
                            .context("virtual server name must not be empty")
                    })
                    .collect::<anyhow::Result<_>>()?
            };
            let enabled = client.get_enabled_virtual_servers(&names).await?;
            let by_name: BTreeMap<VirtualServerName, bool> = names.into_iter().zip(enabled).collect();
            serde_json::to_value(by_name)?
        }
        RemoteCommand::Pools => serde_json::to_value(client.get_pool_names().await?)?,
        RemoteCommand::Nodes { pool: name } => serde_json::to_value(client.get_nodes(&pool(name)?).await?)?,
        RemoteCommand::ConnectionCounts { nodes: names } => {
            serde_json::to_value(client.get_nodes_connection_counts(&nodes(names)?).await?)?
        }
        RemoteCommand::DisabledNodes { pool: name } => {
            serde_json::to_value(client.get_disabled_nodes(&pool(name)?).await?)?
        }
        RemoteCommand::DisableNodes { pool: name, nodes: names } => {
            client.disable_nodes(&pool(name)?, &nodes(names)?).await?;
            acknowledged("disable-nodes")?
        }
        RemoteCommand::DrainingNodes { pool: name } => {
            serde_json::to_value(client.get_draining_nodes(&pool(name)?).await?)?
        }
        RemoteCommand::DrainNodes { pool: name, nodes: names } => {
            client.set_draining_nodes(&pool(name)?, &nodes(names)?).await?;
            acknowledged("drain-nodes")?
        }
        RemoteCommand::EnableNodes { pool: name, nodes: names } => {
            client.enable_nodes(&pool(name)?, &nodes(names)?).await?;
            acknowledged("enable-nodes")?
        }
        RemoteCommand::CacheInfo => serde_json::to_value(client.get_global_cache_info().await?)?,
        RemoteCommand::FlushAll => {
            client.flush_all().await?;
            acknowledged("flush-all")?
        }
        RemoteCommand::Flush { url, list } => {
            serde_json::to_value(client.flush_objects_by_pattern(url, *list).await?)?
        }
        RemoteCommand::Objects { url, limit } => {
            serde_json::to_value(client.get_objects_by_pattern(url, *limit).await?)?
        }
        RemoteCommand::Object { url } => serde_json::to_value(client.get_object_by_pattern(url).await?)?,
    };

    Ok(output)
}
