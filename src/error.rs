//! Error types for interface resolution.

use std::net::IpAddr;

use thiserror::Error;

/// Reasons an interface name could not be turned into a bindable address.
///
/// None of these reach users of the HTTP client: the resolver logs them and
/// degrades to unbound dialing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// No host interface carries the configured name.
    #[error("network interface `{0}` not found")]
    InterfaceNotFound(String),

    /// The interface exists but exposes no non-loopback IPv4 address.
    #[error("network interface `{interface}` has no usable IPv4 address (candidates: {candidates:?})")]
    NoQualifyingAddress {
        /// Interface name as configured.
        interface: String,
        /// Every address the interface reported, in enumeration order.
        candidates: Vec<IpAddr>,
    },

    /// The host interface table could not be read.
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] std::io::Error),
}
