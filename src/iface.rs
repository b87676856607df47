//! Resolution of a configured interface name into a bindable local address.
//!
//! The resolver looks up the named interface, walks its addresses in the order
//! the platform reports them, and keeps the first one that is usable as the
//! source of an outbound IPv4 connection. The result is computed at most once
//! per [`ResolvedLocalAddress`] and never changes afterwards.
//!
//! Resolution failures are not errors for the caller. An unknown interface or
//! an interface without a usable address is logged and the crate falls back to
//! letting the operating system choose the source address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;

use crate::config::InterfaceConfig;
use crate::error::ResolveError;

/// A view of the host's network interfaces.
pub trait InterfaceSource: Send + Sync {
    /// Returns every address assigned to the interface `name`, in platform
    /// enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InterfaceNotFound`] when no interface carries
    /// the name, or [`ResolveError::Enumerate`] when the interface table
    /// cannot be read.
    fn addresses(&self, name: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// The interfaces of the running host, read through `getifaddrs` (or the
/// platform equivalent).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn addresses(&self, name: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let mut found = false;
        let mut addrs = Vec::new();

        for iface in if_addrs::get_if_addrs()? {
            if iface.name == name {
                found = true;
                addrs.push(iface.ip());
            }
        }

        if !found {
            return Err(ResolveError::InterfaceNotFound(name.to_string()));
        }

        Ok(addrs)
    }
}

/// Picks the first address usable as an IPv4 source address.
///
/// An address qualifies when it is not loopback, its textual form has no
/// colon, and it is not an IPv6 address. The colon check also rejects
/// IPv4-mapped IPv6 addresses such as `::ffff:10.0.0.5`.
#[must_use]
pub fn select_address<I>(addrs: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs.into_iter().find_map(|addr| {
        if addr.is_loopback() || addr.to_string().contains(':') {
            return None;
        }

        match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        }
    })
}

/// Resolves `config` against `source` once, without caching or logging.
///
/// Returns `Ok(None)` when no interface is configured.
///
/// # Errors
///
/// Returns [`ResolveError::InterfaceNotFound`] or [`ResolveError::Enumerate`]
/// from the source, and [`ResolveError::NoQualifyingAddress`] when the
/// interface has no usable address.
pub fn resolve(
    config: &InterfaceConfig,
    source: &dyn InterfaceSource,
) -> Result<Option<Ipv4Addr>, ResolveError> {
    let Some(name) = config.interface() else {
        return Ok(None);
    };

    let candidates = source.addresses(name)?;

    select_address(candidates.iter().copied())
        .map(Some)
        .ok_or_else(|| ResolveError::NoQualifyingAddress {
            interface: name.to_string(),
            candidates,
        })
}

/// The local address outbound connections bind to, resolved lazily and
/// exactly once.
///
/// Construct one at startup and hand it to [`build_client`](crate::build_client).
/// Concurrent first calls to [`get`](Self::get) run the resolution a single
/// time and all observe the same result.
pub struct ResolvedLocalAddress {
    config: InterfaceConfig,
    source: Box<dyn InterfaceSource>,
    cell: OnceLock<Option<Ipv4Addr>>,
}

impl ResolvedLocalAddress {
    /// Resolves `config` against the host's interfaces on first use.
    #[must_use]
    pub fn new(config: InterfaceConfig) -> Self {
        Self::with_source(config, SystemInterfaces)
    }

    /// Resolves `config` against a custom interface source on first use.
    #[must_use]
    pub fn with_source(config: InterfaceConfig, source: impl InterfaceSource + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
            cell: OnceLock::new(),
        }
    }

    /// Reads the interface name from
    /// [`INTERFACE_ENV`](crate::INTERFACE_ENV) and resolves it on first use.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(InterfaceConfig::from_env())
    }

    /// An already resolved address. `None` yields unbound dialing.
    #[must_use]
    pub fn fixed(addr: Option<Ipv4Addr>) -> Self {
        Self {
            config: InterfaceConfig::unbound(),
            source: Box::new(SystemInterfaces),
            cell: OnceLock::from(addr),
        }
    }

    /// The configured interface name.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.config.interface()
    }

    /// Whether resolution has already run.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The resolved address, running resolution on the first call.
    ///
    /// Never fails: resolution problems are logged and yield `None`.
    #[must_use]
    pub fn get(&self) -> Option<Ipv4Addr> {
        *self.cell.get_or_init(|| self.resolve_logged())
    }

    fn resolve_logged(&self) -> Option<Ipv4Addr> {
        let Some(name) = self.config.interface() else {
            tracing::debug!("no network interface configured, using default source address");
            return None;
        };

        match resolve(&self.config, self.source.as_ref()) {
            Ok(addr) => {
                if let Some(addr) = addr {
                    tracing::info!("found network interface {name} address {addr}");
                }

                addr
            }

            Err(e) => {
                tracing::warn!(
                    "failed to resolve network interface {name}, using default source address: {e}"
                );
                None
            }
        }
    }
}

impl fmt::Debug for ResolvedLocalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedLocalAddress")
            .field("config", &self.config)
            .field("address", &self.cell.get())
            .finish_non_exhaustive()
    }
}
