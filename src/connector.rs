//! Outbound TCP dialing pinned to a local address.
//!
//! [`BoundConnector`] is the dialing hook installed into the HTTP transport.
//! Every connection it opens goes through [`BoundConnector::local_endpoint`],
//! which decides once per dial whether the socket is bound:
//!
//! - **pass-through** (no resolved address): the caller's requested local
//!   endpoint is used unchanged, or none at all
//! - **bound**: any requested local endpoint is ignored and the socket binds
//!   to the resolved address with an OS-assigned ephemeral port
//!
//! Socket errors are returned unchanged.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::Uri;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tower::Service;

use crate::iface::ResolvedLocalAddress;

/// The remote end of an outbound connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A hostname, resolved through the system resolver at dial time.
    Host {
        /// Hostname or textual IP address.
        host: String,
        /// Remote port.
        port: u16,
    },
    /// An already resolved socket address.
    Addr(SocketAddr),
}

impl Target {
    /// Creates a hostname target.
    #[must_use]
    pub fn host(host: impl Into<String>, port: u16) -> Self {
        Self::Host {
            host: host.into(),
            port,
        }
    }

    /// Derives the target from a request URI.
    ///
    /// IP literals become [`Target::Addr`]. A missing port defaults to 80 for
    /// `http` (or no scheme) and 443 for `https`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] when the URI has no host or
    /// uses an unknown scheme without an explicit port.
    pub fn from_uri(uri: &Uri) -> io::Result<Self> {
        let host = uri.host().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("uri must have a host: {uri}"),
            )
        })?;

        let port = match (uri.port_u16(), uri.scheme_str()) {
            (Some(port), _) => port,
            (None, None | Some("http")) => 80,
            (None, Some("https")) => 443,
            (None, Some(s)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unsupported scheme: {s}"),
                ));
            }
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');

        Ok(match host.parse::<IpAddr>() {
            Ok(ip) => Self::Addr(SocketAddr::new(ip, port)),
            Err(_) => Self::host(host, port),
        })
    }
}

impl From<SocketAddr> for Target {
    fn from(addr: SocketAddr) -> Self {
        Self::Addr(addr)
    }
}

/// Opens TCP connections whose local endpoint is pinned to a fixed IPv4
/// address, when one is configured.
///
/// Also usable directly as a `hyper-util` connector through its
/// [`tower::Service<Uri>`] implementation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundConnector {
    local: Option<Ipv4Addr>,
}

impl BoundConnector {
    /// Creates a connector bound to `local`, or pass-through when `None`.
    #[must_use]
    pub fn new(local: Option<Ipv4Addr>) -> Self {
        Self { local }
    }

    /// A connector that leaves the source address to the operating system.
    #[must_use]
    pub fn pass_through() -> Self {
        Self::new(None)
    }

    /// A connector that binds every socket to `local`.
    #[must_use]
    pub fn bound(local: Ipv4Addr) -> Self {
        Self::new(Some(local))
    }

    /// Creates a connector from a resolver, running resolution if it has not
    /// happened yet.
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedLocalAddress) -> Self {
        Self::new(resolved.get())
    }

    /// The address sockets are bound to.
    #[must_use]
    pub fn local_address(&self) -> Option<Ipv4Addr> {
        self.local
    }

    /// Whether sockets are bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.local.is_some()
    }

    /// Decides the local endpoint of a new socket given what the caller asked
    /// for.
    ///
    /// Every bound decision is logged at `info`, naming the overridden request
    /// when there was one.
    #[must_use]
    pub fn local_endpoint(&self, requested: Option<SocketAddr>) -> Option<SocketAddr> {
        let Some(local) = self.local else {
            return requested;
        };

        if let Some(requested) = requested {
            tracing::info!("using local address {local} instead of requested {requested}");
        } else {
            tracing::info!("using local address {local}");
        }

        Some(SocketAddr::new(IpAddr::V4(local), 0))
    }

    /// Connects to `target`, optionally from a caller-chosen local endpoint.
    ///
    /// Hostnames are resolved and each address is tried in turn until one
    /// connects.
    ///
    /// # Errors
    ///
    /// Returns the resolver error, or the error of the last connection
    /// attempt, as reported by the operating system.
    pub async fn connect(
        &self,
        target: Target,
        requested: Option<SocketAddr>,
    ) -> io::Result<TcpStream> {
        let remotes: Vec<SocketAddr> = match target {
            Target::Addr(addr) => vec![addr],
            Target::Host { host, port } => lookup_host((host, port)).await?.collect(),
        };

        let mut last_err = None;

        for remote in remotes {
            match self.connect_addr(remote, requested).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("connection to {remote} failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "host resolved to no addresses",
            )
        }))
    }

    /// Connects to a single resolved address.
    ///
    /// # Errors
    ///
    /// Returns socket creation, bind and connect errors unchanged.
    pub async fn connect_addr(
        &self,
        remote: SocketAddr,
        requested: Option<SocketAddr>,
    ) -> io::Result<TcpStream> {
        let socket = match remote {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };

        if let Some(local) = self.local_endpoint(requested) {
            socket.bind(local)?;
        }

        socket.connect(remote).await
    }
}

impl From<&ResolvedLocalAddress> for BoundConnector {
    fn from(resolved: &ResolvedLocalAddress) -> Self {
        Self::from_resolved(resolved)
    }
}

impl Service<Uri> for BoundConnector {
    type Response = TokioIo<TcpStream>;
    type Error = io::Error;
    type Future = BoxFuture<'static, io::Result<Self::Response>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let connector = self.clone();

        Box::pin(async move {
            let target = Target::from_uri(&dst)?;
            let stream = connector.connect(target, None).await?;
            Ok(TokioIo::new(stream))
        })
    }
}
