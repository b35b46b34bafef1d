//! Client integration tests against an in-memory appliance.
//!
//! These tests verify:
//! - Lazy rebinding: one bind per module switch, none for repeated calls
//! - Failure isolation: missing modules and directories leave state untouched
//! - The disable-node connection guard
//! - Flush-by-pattern with and without the URL listing

mod support;

use std::sync::Arc;

use hera::{BoundService, HeraError, KnownModule, VirtualServerName};
use support::{connect, description_dir, node, pool, populated_appliance};

const ALL_MODULES: &[&str] = &["Pool", "VirtualServer", "System.Cache"];

// ---------------------------------------------------------------------------
// Binding behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pool_call_rebinds_once_then_reuses_binding() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();
    assert_eq!(client.bind_count(), 1);

    let pools = client.get_pool_names().await.unwrap();
    let names: Vec<&str> = pools.iter().map(|p| p.as_str()).collect();
    assert_eq!(names, vec!["api", "web"]);
    assert_eq!(client.bind_count(), 2);
    assert_eq!(client.binding().module().as_str(), KnownModule::Pool.as_str());
    let handle = client.current_client();

    client.get_pool_names().await.unwrap();
    assert_eq!(client.bind_count(), 2);
    assert!(Arc::ptr_eq(&handle, &client.current_client()));

    assert_eq!(
        appliance.binds(),
        vec![
            dir.path().join("System.Cache.wsdl"),
            dir.path().join("Pool.wsdl"),
        ]
    );
    assert_eq!(appliance.calls(), vec!["getPoolNames", "getPoolNames"]);
}

#[tokio::test]
async fn test_missing_directory_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let appliance = populated_appliance();

    let result = connect(&dir.path().join("wsdl"), "System.Cache", &appliance);
    assert!(matches!(result, Err(HeraError::Configuration { .. })));
    assert!(appliance.binds().is_empty());
}

#[tokio::test]
async fn test_missing_initial_module_fails_construction() {
    let dir = description_dir(&["Pool"]);
    let appliance = populated_appliance();

    let result = connect(dir.path(), "System.Cache", &appliance);
    assert!(matches!(result, Err(HeraError::ModuleNotFound { .. })));
}

#[tokio::test]
async fn test_unknown_module_leaves_binding_untouched() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();
    let handle = client.current_client();

    let err = client.ensure_module_bound("Foo").unwrap_err();
    match err {
        HeraError::ModuleNotFound { module, directory } => {
            assert_eq!(module, "Foo");
            assert_eq!(directory, dir.path());
        }
        other => panic!("expected ModuleNotFound, got {other:?}"),
    }
    assert!(Arc::ptr_eq(&handle, &client.current_client()));

    let nodes = client.get_nodes(&pool("web")).await.unwrap();
    assert_eq!(nodes, vec![node("10.0.0.1:80"), node("10.0.0.2:80")]);
    assert_eq!(client.bind_count(), 1);
}

#[tokio::test]
async fn test_alternating_modules_rebinds_on_each_switch() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    client.get_global_cache_info().await.unwrap();
    assert_eq!(client.bind_count(), 1);
    client.get_virtual_server_names().await.unwrap();
    assert_eq!(client.bind_count(), 2);
    client.get_pool_names().await.unwrap();
    client.get_nodes(&pool("api")).await.unwrap();
    assert_eq!(client.bind_count(), 3);
    client.flush_all().await.unwrap();
    assert_eq!(client.bind_count(), 4);
}

#[tokio::test]
async fn test_available_modules_lists_directory() {
    let dir = description_dir(&["Pool", "VirtualServer", "System.Cache", "System.Stats"]);
    let appliance = populated_appliance();
    let client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    let modules: Vec<String> = client
        .available_modules()
        .unwrap()
        .into_iter()
        .map(|m| m.to_string())
        .collect();
    assert_eq!(modules, vec!["Pool", "System.Cache", "System.Stats", "VirtualServer"]);
}

#[tokio::test]
async fn test_typed_call_for_unlisted_module_fails_without_rebinding() {
    let dir = description_dir(&["System.Cache", "Pool"]);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    client.ensure_module_bound("Pool").unwrap();
    assert_eq!(client.current_client().module().as_str(), "Pool");

    let err = client.get_virtual_server_names().await.unwrap_err();
    assert!(matches!(err, HeraError::ModuleNotFound { .. }));
    assert_eq!(client.binding().module().as_str(), "Pool");
    assert!(appliance.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Pool operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_disable_nodes_with_active_connections_is_refused() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();

    let nodes = vec![node("10.0.0.1:80"), node("10.0.0.2:80")];
    let err = client.disable_nodes(&pool("web"), &nodes).await.unwrap_err();
    match err {
        HeraError::Policy {
            pool: refused_pool,
            nodes: refused,
            active_connections,
        } => {
            assert_eq!(refused_pool, pool("web"));
            assert_eq!(refused, nodes);
            assert_eq!(active_connections, 7);
        }
        other => panic!("expected Policy, got {other:?}"),
    }
    assert_eq!(appliance.calls(), vec!["getNodesConnectionCounts"]);
    assert!(client.get_disabled_nodes(&pool("web")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disable_guard_counts_repeated_nodes_separately() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();

    let nodes = vec![node("10.0.0.2:80"), node("10.0.0.2:80")];
    let err = client.disable_nodes(&pool("web"), &nodes).await.unwrap_err();

    assert!(matches!(
        err,
        HeraError::Policy {
            active_connections: 14,
            ..
        }
    ));
    assert_eq!(appliance.calls(), vec!["getNodesConnectionCounts"]);
}

#[tokio::test]
async fn test_disable_idle_nodes_issues_one_disable_call() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    client
        .disable_nodes(&pool("web"), &[node("10.0.0.1:80")])
        .await
        .unwrap();
    assert_eq!(
        appliance.calls(),
        vec!["getNodesConnectionCounts", "disableNodes"]
    );
    assert_eq!(
        client.get_disabled_nodes(&pool("web")).await.unwrap(),
        vec![node("10.0.0.1:80")]
    );

    client
        .enable_nodes(&pool("web"), &[node("10.0.0.1:80")])
        .await
        .unwrap();
    assert!(client.get_disabled_nodes(&pool("web")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_counts_are_keyed_by_node() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();

    let counts = client
        .get_nodes_connection_counts(&[node("10.0.0.1:80"), node("10.0.0.2:80")])
        .await
        .unwrap();
    assert_eq!(counts.get(&node("10.0.0.1:80")), Some(&0));
    assert_eq!(counts.get(&node("10.0.0.2:80")), Some(&7));
}

#[tokio::test]
async fn test_draining_nodes_set_and_clear() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();

    client
        .set_draining_nodes(&pool("web"), &[node("10.0.0.2:80")])
        .await
        .unwrap();
    assert_eq!(
        client.get_draining_nodes(&pool("web")).await.unwrap(),
        vec![node("10.0.0.2:80")]
    );

    client.set_draining_nodes(&pool("web"), &[]).await.unwrap();
    assert!(client.get_draining_nodes(&pool("web")).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// VirtualServer operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_virtual_server_listing_and_enabled_flags() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    let names = client.get_virtual_server_names().await.unwrap();
    assert_eq!(
        names,
        vec![
            VirtualServerName::new("www").unwrap(),
            VirtualServerName::new("staging").unwrap(),
        ]
    );
    let enabled = client.get_enabled_virtual_servers(&names).await.unwrap();
    assert_eq!(enabled, vec![true, false]);
    assert_eq!(client.bind_count(), 2);
}

// ---------------------------------------------------------------------------
// System.Cache operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_flush_with_list_looks_up_before_flushing() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    let flushed = client
        .flush_objects_by_pattern("http://www.example.com/images/*", true)
        .await
        .unwrap();
    assert_eq!(
        flushed,
        vec![
            "http://www.example.com/images/logo.png",
            "http://www.example.com/images/banner.png",
        ]
    );
    assert_eq!(
        appliance.calls(),
        vec!["getCacheContent", "clearMatchingCacheContent"]
    );
    assert_eq!(appliance.state.lock().unwrap().cache.len(), 2);
}

#[tokio::test]
async fn test_flush_with_list_and_no_match_returns_empty() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    let flushed = client
        .flush_objects_by_pattern("http://www.example.com/missing/*", true)
        .await
        .unwrap();
    assert!(flushed.is_empty());
    assert_eq!(
        appliance.calls(),
        vec!["getCacheContent", "clearMatchingCacheContent"]
    );
}

#[tokio::test]
async fn test_flush_without_list_issues_single_call() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    let flushed = client
        .flush_objects_by_pattern("https://shop.example.com/cart", false)
        .await
        .unwrap();
    assert!(flushed.is_empty());
    assert_eq!(appliance.calls(), vec!["clearMatchingCacheContent"]);
    assert_eq!(appliance.state.lock().unwrap().cache.len(), 3);
}

#[tokio::test]
async fn test_flush_rejects_invalid_pattern_before_any_call() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();

    let err = client
        .flush_objects_by_pattern("not a url", true)
        .await
        .unwrap_err();
    assert!(matches!(err, HeraError::InvalidArgument { .. }));
    assert!(appliance.calls().is_empty());
    assert_eq!(client.bind_count(), 1);
}

#[tokio::test]
async fn test_objects_by_pattern_respects_limit() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "System.Cache", &appliance).unwrap();

    let all = client
        .get_objects_by_pattern("http://www.example.com/*", None)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let limited = client
        .get_objects_by_pattern("http://www.example.com/*", Some(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    let single = client
        .get_object_by_pattern("http://www.example.com/index.html")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(single.url(), "http://www.example.com/index.html");

    let none = client
        .get_object_by_pattern("http://www.example.com/nothing")
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_cache_info_and_flush_all() {
    let dir = description_dir(ALL_MODULES);
    let appliance = populated_appliance();
    let mut client = connect(dir.path(), "Pool", &appliance).unwrap();

    let info = client.get_global_cache_info().await.unwrap();
    assert_eq!(info.entries, 4);
    assert_eq!(info.max_entries, 10_000);

    client.flush_all().await.unwrap();
    assert!(appliance.state.lock().unwrap().cache.is_empty());
    assert_eq!(client.bind_count(), 2);
}
