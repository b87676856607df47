//! Interface binding configuration.

use std::env;

/// Environment variable naming the interface outbound connections bind to.
pub const INTERFACE_ENV: &str = "POLARIS_SYNC_NETWORK_INTERFACE";

/// Which local network interface, if any, outbound connections originate from.
///
/// A blank name is the same as no name: connections are left unbound and the
/// operating system picks the source address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// The interface name, trimmed. `None` when unset or blank.
    pub interface: Option<String>,
}

impl InterfaceConfig {
    /// Creates a configuration binding to the named interface.
    #[must_use]
    pub fn new(interface: impl Into<String>) -> Self {
        let interface = interface.into();
        let trimmed = interface.trim();

        Self {
            interface: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    /// Creates a configuration that never binds.
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Reads the interface name from [`INTERFACE_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_var(INTERFACE_ENV)
    }

    /// Reads the interface name from an arbitrary environment variable.
    ///
    /// Unset and non-unicode values are treated as blank.
    #[must_use]
    pub fn from_env_var(key: &str) -> Self {
        env::var(key).map_or_else(|_| Self::unbound(), Self::new)
    }

    /// The configured interface name.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }
}
