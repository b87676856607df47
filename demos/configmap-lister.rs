//! Lists ConfigMaps through a Kubernetes client pinned to a local interface.
//!
//! Shows which source address the client dials from, then lists the
//! ConfigMaps in the target namespace a few times so the connections can be
//! observed on the API server side (or with `ss -tn`).
//!
//! # Running
//!
//! ```bash
//! POLARIS_SYNC_NETWORK_INTERFACE=eth1 cargo run --example configmap-lister
//! ```
//!
//! # Environment Variables
//!
//! - `POLARIS_SYNC_NETWORK_INTERFACE`: interface to bind to (default: unbound)
//! - `CONFIGMAP_NAMESPACE`: namespace to list (default: the client's namespace)
//! - `REQUEST_COUNT`: number of list calls to make (default: 3)
//! - `REQUEST_INTERVAL_MS`: milliseconds between calls (default: 1000)

use std::env;
use std::time::Duration;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use kube::api::ListParams;
use kube_iface_bind::{ResolvedLocalAddress, infer_client};
use tokio::time::sleep;
use tracing::{Level, error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    // Read configuration from environment
    let namespace = env::var("CONFIGMAP_NAMESPACE").ok();
    let request_count: u32 = env::var("REQUEST_COUNT")
        .ok()
        .and_then(|c| c.parse().ok())
        .unwrap_or(3);
    let request_interval_ms: u64 = env::var("REQUEST_INTERVAL_MS")
        .ok()
        .and_then(|i| i.parse().ok())
        .unwrap_or(1000);

    // Resolve the interface once, at startup
    let local = ResolvedLocalAddress::from_env();
    match (local.interface(), local.get()) {
        (Some(name), Some(addr)) => info!("Binding to {name} ({addr})"),
        (Some(name), None) => info!("Interface {name} unusable, using default source address"),
        (None, _) => info!("No interface configured, using default source address"),
    }

    let client = infer_client(&local).await?;
    let config_maps: Api<ConfigMap> = match namespace {
        Some(ns) => Api::namespaced(client, &ns),
        None => Api::default_namespaced(client),
    };

    for i in 1..=request_count {
        match config_maps.list(&ListParams::default()).await {
            Ok(list) => {
                info!("Request {i}: {} ConfigMaps", list.items.len());
                for cm in &list.items {
                    info!("  {}", cm.metadata.name.as_deref().unwrap_or("<unnamed>"));
                }
            }

            Err(e) => {
                error!("Request {i} failed: {e}");
            }
        }

        if i < request_count {
            sleep(Duration::from_millis(request_interval_ms)).await;
        }
    }

    Ok(())
}
