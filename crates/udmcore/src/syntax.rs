//! Property validators.
//!
//! Each [`Syntax`] parses raw input into the canonical stored form or
//! rejects it with a message. Composite syntaxes parse whole tuples.

use crate::directory::DirectoryClient;
use crate::dn;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr};

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9])?$").expect("valid host name pattern")
});

static DNS_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9])?$").expect("valid DNS label pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    String,
    Integer,
    /// `"0"` or `"1"`.
    Boolean,
    MacAddress,
    IpAddress,
    Ipv4Address,
    HostName,
    DnsName,
    Dn,
    /// DN of a group that must exist in the directory.
    GroupDn,
    AbsolutePath,
    /// `[zone DN]` or `[zone DN, IP]`
    DnsEntry,
    /// `[zone DN, container DN, alias]`
    DnsAliasEntry,
    /// `[service DN, IP, MAC]`, IP and MAC may be empty.
    DhcpEntry,
    Select(&'static [&'static str]),
}

impl Syntax {
    pub fn is_tuple(&self) -> bool {
        matches!(
            self,
            Syntax::DnsEntry | Syntax::DnsAliasEntry | Syntax::DhcpEntry
        )
    }

    /// Parse one scalar element.
    pub fn parse(&self, raw: &str) -> Result<String, String> {
        let raw = raw.trim();
        match self {
            Syntax::String => Ok(raw.to_string()),
            Syntax::Integer => raw
                .parse::<i64>()
                .map(|n| n.to_string())
                .map_err(|_| format!("{:?} is not an integer", raw)),
            Syntax::Boolean => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok("1".to_string()),
                "0" | "false" | "no" => Ok("0".to_string()),
                _ => Err(format!("{:?} is not a boolean", raw)),
            },
            Syntax::MacAddress => parse_mac(raw),
            Syntax::IpAddress => raw
                .parse::<IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| format!("{:?} is not an IP address", raw)),
            Syntax::Ipv4Address => raw
                .parse::<Ipv4Addr>()
                .map(|ip| ip.to_string())
                .map_err(|_| format!("{:?} is not an IPv4 address", raw)),
            Syntax::HostName => {
                if HOSTNAME.is_match(raw) {
                    Ok(raw.to_string())
                } else {
                    Err(format!("{:?} is not a valid host name", raw))
                }
            }
            Syntax::DnsName => {
                let name = raw.trim_end_matches('.');
                if !name.is_empty() && name.split('.').all(|label| DNS_LABEL.is_match(label)) {
                    Ok(name.to_string())
                } else {
                    Err(format!("{:?} is not a valid DNS name", raw))
                }
            }
            Syntax::Dn | Syntax::GroupDn => parse_dn(raw),
            Syntax::AbsolutePath => {
                if raw.starts_with('/') {
                    Ok(raw.to_string())
                } else {
                    Err(format!("{:?} is not an absolute path", raw))
                }
            }
            Syntax::Select(choices) => {
                if choices.contains(&raw) {
                    Ok(raw.to_string())
                } else {
                    Err(format!("{:?} is not one of {}", raw, choices.join(", ")))
                }
            }
            Syntax::DnsEntry | Syntax::DnsAliasEntry | Syntax::DhcpEntry => {
                self.parse_tuple(&[raw.to_string()]).map(|mut t| t.remove(0))
            }
        }
    }

    /// Parse one composite element.
    pub fn parse_tuple(&self, raw: &[String]) -> Result<Vec<String>, String> {
        match self {
            Syntax::DnsEntry => match raw {
                [zone] => Ok(vec![parse_dn(zone)?]),
                [zone, ip] if ip.trim().is_empty() => Ok(vec![parse_dn(zone)?]),
                [zone, ip] => Ok(vec![parse_dn(zone)?, Syntax::IpAddress.parse(ip)?]),
                _ => Err("expected [zone, IP address]".to_string()),
            },
            Syntax::DnsAliasEntry => match raw {
                [zone, container, alias] => Ok(vec![
                    parse_dn(zone)?,
                    parse_dn(container)?,
                    Syntax::DnsName.parse(alias)?,
                ]),
                _ => Err("expected [zone, container, alias]".to_string()),
            },
            Syntax::DhcpEntry => {
                let (service, ip, mac) = match raw {
                    [service] => (service, "", ""),
                    [service, ip] => (service, ip.as_str(), ""),
                    [service, ip, mac] => (service, ip.as_str(), mac.as_str()),
                    _ => return Err("expected [service, IP address, MAC address]".to_string()),
                };
                let ip = if ip.trim().is_empty() {
                    String::new()
                } else {
                    Syntax::IpAddress.parse(ip)?
                };
                let mac = if mac.trim().is_empty() {
                    String::new()
                } else {
                    parse_mac(mac)?
                };
                Ok(vec![parse_dn(service)?, ip, mac])
            }
            _ => match raw {
                [single] => Ok(vec![self.parse(single)?]),
                _ => Err("expected a single value".to_string()),
            },
        }
    }

    /// Directory-level cross checks run right before a write.
    pub fn check(&self, directory: &dyn DirectoryClient, value: &Value) -> Result<(), String> {
        if let Syntax::GroupDn = self {
            for group in value.as_list() {
                let exists = directory
                    .get(&group)
                    .map_err(|e| e.to_string())?
                    .is_some();
                if !exists {
                    return Err(format!("group {} does not exist", group));
                }
            }
        }
        Ok(())
    }
}

fn parse_dn(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let parts = dn::explode(raw);
    if parts.is_empty() || parts.iter().any(|p| !p.contains('=')) {
        return Err(format!("{:?} is not a DN", raw));
    }
    Ok(raw.to_string())
}

/// Accepts `aa:bb:..`, `aa-bb-..`, `aabb.ccdd.eeff` and bare hex; stores
/// lowercase colon notation.
fn parse_mac(raw: &str) -> Result<String, String> {
    let hex: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect::<String>()
        .to_lowercase();
    let separators_ok = raw.chars().filter(|c| matches!(c, ':' | '-')).count() == 5
        || raw.chars().filter(|c| *c == '.').count() == 2
        || raw.len() == 12;
    if hex.len() != 12 || !separators_ok || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{:?} is not a MAC address", raw));
    }
    let pairs: Vec<&str> = (0..6).map(|i| &hex[i * 2..i * 2 + 2]).collect();
    Ok(pairs.join(":"))
}
