#![deny(missing_docs)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Pin outbound [Kubernetes](https://docs.rs/kube) API connections to a local network interface.
//!
//! On multi-homed hosts the API server is sometimes reachable from only one
//! interface, or firewall rules expect traffic from a particular address. This
//! crate resolves a configured interface name to one of its IPv4 addresses and
//! installs that address as the mandatory source of every socket the
//! Kubernetes client opens.
//!
//! # Features
//!
//! - **Once-only resolution**: the interface is resolved lazily, exactly once,
//!   and the result never changes for the lifetime of the resolver
//! - **Strict address filtering**: loopback and IPv6 addresses are never
//!   selected
//! - **Graceful fallback**: an unset, unknown or address-less interface is
//!   logged and the client dials like a stock client
//! - **Transparent client**: TLS, auth, headers, timeouts and proxy come from
//!   [`kube::Config`] untouched
//!
//! # Configuration
//!
//! The interface name is read from the `POLARIS_SYNC_NETWORK_INTERFACE`
//! environment variable ([`INTERFACE_ENV`]). Unset or blank means unbound.
//!
//! # Usage
//!
//! ```ignore
//! use kube_iface_bind::{ResolvedLocalAddress, infer_client};
//!
//! // Resolve once at startup
//! let local = ResolvedLocalAddress::from_env();
//!
//! // Every connection this client opens originates from the interface
//! let client = infer_client(&local).await?;
//! ```

mod config;
mod connector;
mod error;
mod iface;
mod k8s;

pub use config::{INTERFACE_ENV, InterfaceConfig};
pub use connector::{BoundConnector, Target};
pub use error::ResolveError;
pub use iface::{InterfaceSource, ResolvedLocalAddress, SystemInterfaces, resolve, select_address};
pub use k8s::{build_client, infer_client};
