//! Upstream URL safety checks
//!
//! A base URL pointing at loopback, private ranges, or cloud metadata
//! endpoints is usually a mistake when the server is exposed to remote
//! clients. These checks only warn; `--dev-mode` silences them for
//! local development.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::warn;
use url::{Host, Url};

/// Hostnames that resolve to cloud instance metadata services.
const METADATA_HOSTS: &[&str] = &[
    "169.254.169.254",
    "metadata.google.internal",
    "100.100.100.200",
];

/// Warn when a base URL targets an address class that is risky to proxy
/// for remote callers. Returns whether a warning fired, for tests.
pub fn check_base_url(base_url: &str, dev_mode: bool) -> bool {
    if dev_mode {
        return false;
    }
    let Ok(url) = Url::parse(base_url) else {
        return false;
    };

    // host() distinguishes IP literals from domains; IPv6 host strings
    // keep their brackets and would never parse as addresses.
    match url.host() {
        Some(Host::Domain(domain)) => {
            if METADATA_HOSTS.contains(&domain) {
                warn!(host = domain, "Base URL targets a cloud metadata endpoint");
                return true;
            }
            if domain == "localhost" {
                warn!(
                    host = domain,
                    "Base URL targets localhost; use --dev-mode to silence"
                );
                return true;
            }
        }
        Some(Host::Ipv4(addr)) => {
            if METADATA_HOSTS.contains(&addr.to_string().as_str()) {
                warn!(host = %addr, "Base URL targets a cloud metadata endpoint");
                return true;
            }
            if is_private_ipv4(addr) {
                warn!(host = %addr, "Base URL targets a private or link-local address");
                return true;
            }
        }
        Some(Host::Ipv6(addr)) => {
            if is_private_ipv6(addr) {
                warn!(host = %addr, "Base URL targets a private or link-local address");
                return true;
            }
        }
        None => {}
    }

    false
}

fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_loopback() || addr.is_private() || addr.is_link_local() || addr.is_unspecified()
}

fn is_private_ipv6(addr: Ipv6Addr) -> bool {
    if addr.is_loopback() || addr.is_unspecified() {
        return true;
    }
    let segments = addr.segments();
    // fc00::/7 unique-local, fe80::/10 link-local
    (segments[0] & 0xfe00) == 0xfc00 || (segments[0] & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warns_on_loopback_and_private_ranges() {
        assert!(check_base_url("http://127.0.0.1:8080", false));
        assert!(check_base_url("http://localhost/api", false));
        assert!(check_base_url("http://10.0.0.5/api", false));
        assert!(check_base_url("http://192.168.1.1", false));
        assert!(check_base_url("http://172.16.0.1", false));
    }

    #[test]
    fn ipv6_literals_are_recognized_despite_brackets() {
        assert!(check_base_url("http://[::1]:9000", false));
        assert!(check_base_url("http://[fe80::1]", false));
        assert!(check_base_url("http://[fc00::1]/api", false));
        assert!(!check_base_url("http://[2001:db8::1]", false));
    }

    #[test]
    fn warns_on_metadata_endpoints() {
        assert!(check_base_url("http://169.254.169.254/latest", false));
        assert!(check_base_url("http://metadata.google.internal/computeMetadata", false));
        assert!(check_base_url("http://100.100.100.200/meta", false));
    }

    #[test]
    fn public_hosts_pass() {
        assert!(!check_base_url("https://api.example.com/v1", false));
        assert!(!check_base_url("https://8.8.8.8", false));
    }

    #[test]
    fn dev_mode_silences_everything() {
        assert!(!check_base_url("http://127.0.0.1:8080", true));
        assert!(!check_base_url("http://169.254.169.254", true));
    }
}
