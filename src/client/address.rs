//! Miniserver address resolution
//!
//! `LOXONE_HOST` may hold any of three shapes, tried in this order:
//!
//! 1. a local IPv4 address, optionally with a port (`192.168.1.77:8080`)
//! 2. a Miniserver MAC/serial (`504F94A00210` or `50:4F:94:A0:02:10`), reached
//!    through the Loxone cloud DNS relay
//! 3. anything that looks like a hostname or URL (`localhost`,
//!    `https://home.example.com:8443/`)
//!
//! The order matters: a serial number is also a valid hostname.

use crate::error::{LoxoneError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use url::Url;

/// Cloud DNS relay used for MAC addresses
pub const LOX_DNS_URL: &str = "https://dns.loxonecloud.com/";

static LOCAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d))(?::(\d{1,5}))?$",
    )
    .expect("valid local address regex")
});

static MAC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^504F[0-9A-F]{8}$").expect("valid MAC regex"));

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?([a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?\.)*[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(:[0-9]{1,5})?(/.*)?$",
    )
    .expect("valid URL regex")
});

/// Shape of a configured address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// IPv4 on the local network
    Local,
    /// Miniserver serial, resolved through the cloud DNS relay
    Mac,
    /// Hostname or URL
    Url,
}

/// Resolved connection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    kind: AddressType,
    url: Url,
}

impl Endpoint {
    /// Shape the address was classified as
    pub fn kind(&self) -> AddressType {
        self.kind
    }

    /// Canonical URL of the endpoint
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `http` or `https`
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host name or IP address
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Explicit port, `None` when the scheme default applies
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// URL with a trailing slash; command paths are appended below it
    pub fn base_url(&self) -> Url {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn is_local(address: &str) -> bool {
    LOCAL_REGEX
        .captures(address)
        .map(|caps| match caps.get(2) {
            Some(port) => port
                .as_str()
                .parse::<u16>()
                .map(|p| p != 0)
                .unwrap_or(false),
            None => true,
        })
        .unwrap_or(false)
}

fn strip_mac_separators(address: &str) -> String {
    address.replace(':', "")
}

/// Classify an address without resolving it
pub fn resolve_address_type(address: &str) -> Result<AddressType> {
    let address = address.trim();
    if address.is_empty() {
        return Err(LoxoneError::EmptyAddress);
    }

    if is_local(address) {
        Ok(AddressType::Local)
    } else if MAC_REGEX.is_match(&strip_mac_separators(address)) {
        Ok(AddressType::Mac)
    } else if URL_REGEX.is_match(address) {
        Ok(AddressType::Url)
    } else {
        Err(LoxoneError::InvalidAddressFormat(address.to_string()))
    }
}

/// Resolve an address into an [`Endpoint`]
pub fn resolve(address: &str) -> Result<Endpoint> {
    let kind = resolve_address_type(address)?;
    let address = address.trim();

    let raw = match kind {
        AddressType::Local => format!("http://{address}"),
        AddressType::Mac => format!("{LOX_DNS_URL}{}", strip_mac_separators(address)),
        AddressType::Url if address.starts_with("http://") || address.starts_with("https://") => {
            address.to_string()
        }
        AddressType::Url => format!("http://{address}"),
    };

    let url = Url::parse(&raw)
        .map_err(|e| LoxoneError::InvalidAddressFormat(format!("{address} ({e})")))?;

    Ok(Endpoint { kind, url })
}
