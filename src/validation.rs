use crate::error::PreviewError;
use std::net::IpAddr;
use url::Url;

pub const REQUIRED_PREFIX: &str = "https:";

/// Rules applied to whatever the user typed into the search box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPolicy {
    /// Block `localhost` and loopback addresses (default: false)
    pub block_localhost: bool,
    /// Block private, link-local and unspecified IP literals (default: false)
    pub block_private_ips: bool,
}

impl LinkPolicy {
    pub fn strict() -> Self {
        Self {
            block_localhost: true,
            block_private_ips: true,
        }
    }

    /// Trims the input and accepts it only if it is an `https:` URL with a host.
    pub fn validate(&self, input: &str) -> Result<Url, PreviewError> {
        let trimmed = input.trim();
        if !trimmed.starts_with(REQUIRED_PREFIX) {
            return Err(PreviewError::InvalidLink(format!(
                "'{trimmed}' must start with {REQUIRED_PREFIX}"
            )));
        }

        let url = Url::parse(trimmed)?;
        let host = url
            .host_str()
            .ok_or_else(|| PreviewError::InvalidLink(format!("'{trimmed}' has no host")))?;

        if self.block_localhost && is_localhost(host) {
            return Err(PreviewError::InvalidLink(format!("'{host}' is a local address")));
        }

        if self.block_private_ips {
            let ip_str = host.trim_start_matches('[').trim_end_matches(']');
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                if is_private_ip(&ip) {
                    return Err(PreviewError::InvalidLink(format!("'{ip}' is a private address")));
                }
            }
        }

        Ok(url)
    }
}

fn is_localhost(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]") || host.ends_with(".localhost")
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (ipv4.octets()[0] == 100 && (ipv4.octets()[1] & 0b1100_0000) == 0b0100_0000)
        }
        IpAddr::V6(ipv6) => {
            let first = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // fe80::/10
                || (first & 0xffc0) == 0xfe80
                // fc00::/7
                || (first & 0xfe00) == 0xfc00
        }
    }
}
