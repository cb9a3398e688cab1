//! Base URL resolution for proxied stream URLs
//!
//! The base URL is what clients put in front of a service name. A configured
//! hostname always wins; otherwise an address is picked from the local IPv4
//! interfaces, preferring ones that do not face the media source.

use std::net::Ipv4Addr;

use tracing::{debug, warn};

use crate::config::{ServerConfig, UpstreamConfig};
use crate::utils::UrlUtils;

/// An IPv4 address bound to a named interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub ip: Ipv4Addr,
}

impl InterfaceAddress {
    pub fn new(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ip,
        }
    }
}

/// Source of local interface addresses
pub trait InterfaceProvider: Send + Sync {
    /// Non-loopback IPv4 addresses in enumeration order
    fn ipv4_addresses(&self) -> anyhow::Result<Vec<InterfaceAddress>>;
}

/// Interfaces of the running host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceProvider for SystemInterfaces {
    fn ipv4_addresses(&self) -> anyhow::Result<Vec<InterfaceAddress>> {
        use network_interface::{NetworkInterface, NetworkInterfaceConfig};

        let mut addresses = Vec::new();
        for iface in NetworkInterface::show()? {
            for addr in &iface.addr {
                if let network_interface::Addr::V4(v4) = addr {
                    if !v4.ip.is_loopback() {
                        addresses.push(InterfaceAddress::new(iface.name.clone(), v4.ip));
                    }
                }
            }
        }
        Ok(addresses)
    }
}

/// A fixed address list, for hosts with a known layout and for tests
impl InterfaceProvider for Vec<InterfaceAddress> {
    fn ipv4_addresses(&self) -> anyhow::Result<Vec<InterfaceAddress>> {
        Ok(self
            .iter()
            .filter(|address| !address.ip.is_loopback())
            .cloned()
            .collect())
    }
}

/// Private, carrier-grade NAT and link-local ranges
pub fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 100 && (64..=127).contains(&b))
        || (a == 169 && b == 254)
}

/// Resolves the base URL from configuration and local interfaces
pub struct AddressResolver {
    server: ServerConfig,
    upstream: UpstreamConfig,
    interfaces: Box<dyn InterfaceProvider>,
}

impl AddressResolver {
    pub fn new(
        server: ServerConfig,
        upstream: UpstreamConfig,
        interfaces: Box<dyn InterfaceProvider>,
    ) -> Self {
        Self {
            server,
            upstream,
            interfaces,
        }
    }

    /// Resolver backed by the host's own interfaces
    pub fn system(server: ServerConfig, upstream: UpstreamConfig) -> Self {
        Self::new(server, upstream, Box::new(SystemInterfaces))
    }

    /// Swap in new settings, keeping the interface source
    pub fn reconfigure(&mut self, server: ServerConfig, upstream: UpstreamConfig) {
        self.server = server;
        self.upstream = upstream;
    }

    /// Base URL ending in '/', e.g. `http://192.168.1.10:5140/`
    pub fn resolve(&self) -> String {
        let port = self.server.listen_port();

        if let Some(hostname) = self.server.hostname() {
            return base_url_from_hostname(hostname, port);
        }

        let host = match self.interfaces.ipv4_addresses() {
            Ok(addresses) => select_host_ip(&addresses, &self.upstream)
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "localhost".to_string()),
            Err(e) => {
                warn!("Failed to get network interfaces, using localhost: {}", e);
                "localhost".to_string()
            }
        };

        plain_base_url(&host, port)
    }
}

fn plain_base_url(host: &str, port: &str) -> String {
    if port == "80" {
        format!("http://{host}/")
    } else {
        format!("http://{host}:{port}/")
    }
}

/// Build the base URL from a hostname override
///
/// The listen port is only filled in when the override names no protocol;
/// `https://tv.example.com` is taken to mean the scheme's default port.
fn base_url_from_hostname(hostname: &str, listen_port: &str) -> String {
    let components = match UrlUtils::parse_components(hostname) {
        Ok(components) => components,
        Err(e) => {
            debug!("Hostname '{}' not parseable ({}), using it verbatim", hostname, e);
            return plain_base_url(hostname.trim(), listen_port);
        }
    };

    let (protocol, port) = match components.protocol {
        Some(protocol) => (protocol, components.port),
        None => (
            "http".to_string(),
            components.port.or_else(|| Some(listen_port.to_string())),
        ),
    };

    let mut url = match port.as_deref() {
        None => format!("{protocol}://{}", components.host),
        Some("80") if protocol == "http" => format!("{protocol}://{}", components.host),
        Some("443") if protocol == "https" => format!("{protocol}://{}", components.host),
        Some(port) => format!("{protocol}://{}:{port}", components.host),
    };

    match components.path {
        Some(path) => {
            url.push_str(&path);
            if !path.ends_with('/') {
                url.push('/');
            }
        }
        None => url.push('/'),
    }
    url
}

/// First private non-upstream address, else first public non-upstream, else first upstream
fn select_host_ip(addresses: &[InterfaceAddress], upstream: &UpstreamConfig) -> Option<Ipv4Addr> {
    let mut private = None;
    let mut public = None;
    let mut upstream_ip = None;

    for address in addresses {
        let slot = if upstream.is_upstream(&address.name) {
            &mut upstream_ip
        } else if is_private_ipv4(address.ip) {
            &mut private
        } else {
            &mut public
        };
        slot.get_or_insert(address.ip);
    }

    private.or(public).or(upstream_ip)
}
