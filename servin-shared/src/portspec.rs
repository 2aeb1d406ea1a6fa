//! Port-mapping grammar (§6, §S5).
//!
//! `PORT | HOSTPORT:CONTAINERPORT | HOSTIP:HOSTPORT:CONTAINERPORT`,
//! optionally suffixed `/tcp` or `/udp`. Invalid specs are rejected
//! without emitting a partial mapping (§8 property 6).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortProtocol::Tcp => write!(f, "tcp"),
            PortProtocol::Udp => write!(f, "udp"),
        }
    }
}

/// A single resolved port mapping, sorted deterministically by the
/// Dispatcher when re-emitted as guest CLI flags (§4.8).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: PortProtocol,
}

impl PortMapping {
    /// Parse one port-spec token. Returns `None` on any malformed
    /// input; the caller is expected to warn and skip rather than
    /// fail the whole request (§6).
    pub fn parse(spec: &str) -> Option<Self> {
        let (body, protocol) = match spec.rsplit_once('/') {
            Some((body, "tcp")) => (body, PortProtocol::Tcp),
            Some((body, "udp")) => (body, PortProtocol::Udp),
            Some(_) => return None,
            None => (spec, PortProtocol::Tcp),
        };

        let parts: Vec<&str> = body.split(':').collect();
        match parts.as_slice() {
            [port] => {
                let port = parse_port(port)?;
                Some(PortMapping {
                    host_ip: None,
                    host_port: port,
                    container_port: port,
                    protocol,
                })
            }
            [host_port, container_port] => {
                let host_port = parse_port(host_port)?;
                let container_port = parse_port(container_port)?;
                Some(PortMapping {
                    host_ip: None,
                    host_port,
                    container_port,
                    protocol,
                })
            }
            [host_ip, host_port, container_port] => {
                if host_ip.is_empty() || host_ip.parse::<std::net::IpAddr>().is_err() {
                    return None;
                }
                let host_port = parse_port(host_port)?;
                let container_port = parse_port(container_port)?;
                Some(PortMapping {
                    host_ip: Some((*host_ip).to_string()),
                    host_port,
                    container_port,
                    protocol,
                })
            }
            _ => None,
        }
    }

    /// Sort key used to keep the Dispatcher's re-emitted flag order
    /// deterministic across runs (§4.8: "sorted-by-host-port").
    pub fn sort_key(&self) -> (u16, u16, &'static str) {
        (
            self.host_port,
            self.container_port,
            match self.protocol {
                PortProtocol::Tcp => "tcp",
                PortProtocol::Udp => "udp",
            },
        )
    }
}

fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() {
        return None;
    }
    s.parse::<u16>().ok().filter(|&p| p != 0)
}

/// Parse a list of port-spec tokens, silently skipping invalid ones
/// (the caller surfaces a warning per skipped token; see §6).
pub fn parse_all<'a>(specs: impl IntoIterator<Item = &'a str>) -> (Vec<PortMapping>, Vec<&'a str>) {
    let mut ok = Vec::new();
    let mut bad = Vec::new();
    for spec in specs {
        match PortMapping::parse(spec) {
            Some(m) => ok.push(m),
            None => bad.push(spec),
        }
    }
    ok.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    (ok, bad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_port_parser_table() {
        let m = PortMapping::parse("80").unwrap();
        assert_eq!((m.host_port, m.container_port, m.protocol), (80, 80, PortProtocol::Tcp));
        assert_eq!(m.host_ip, None);

        let m = PortMapping::parse("8080:80").unwrap();
        assert_eq!((m.host_port, m.container_port, m.protocol), (8080, 80, PortProtocol::Tcp));

        let m = PortMapping::parse("127.0.0.1:8080:80").unwrap();
        assert_eq!(m.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!((m.host_port, m.container_port), (8080, 80));

        let m = PortMapping::parse("8080:80/udp").unwrap();
        assert_eq!(m.protocol, PortProtocol::Udp);

        assert!(PortMapping::parse("abc").is_none());
    }

    #[test]
    fn invalid_spec_produces_no_partial_mapping() {
        let (ok, bad) = parse_all(["80", "abc", "8080:80"]);
        assert_eq!(ok.len(), 2);
        assert_eq!(bad, vec!["abc"]);
    }

    #[test]
    fn zero_port_is_rejected() {
        assert!(PortMapping::parse("0").is_none());
        assert!(PortMapping::parse("0:80").is_none());
    }

    #[test]
    fn unknown_protocol_suffix_rejected() {
        assert!(PortMapping::parse("80/sctp").is_none());
    }

    #[test]
    fn sort_orders_by_host_port_then_container_port() {
        let (ok, _) = parse_all(["443", "80", "8080:80"]);
        let ports: Vec<u16> = ok.iter().map(|m| m.host_port).collect();
        assert_eq!(ports, vec![80, 443, 8080]);
    }
}
