//! Port declaration normalization.
//!
//! A declaration has the shape `<port>[/<protocol>]`. The protocol names
//! the application protocol (`ssh`, `http`, ...) and defaults to `tcp`.
//! Only `udp` changes the transport; every other protocol is carried over
//! TCP.

use crp_common::constants;
use crp_common::error::{CrpError, Result};
use crp_common::types::{PortBinding, PortMap, Transport};

/// Parses a single raw port declaration.
///
/// # Errors
///
/// Returns [`CrpError::InvalidPort`] if the port is not an integer in
/// `1..=65535` or the protocol is empty.
pub fn parse_port(raw: &str) -> Result<PortBinding> {
    let lowered = raw.trim().to_ascii_lowercase();
    let (port, protocol) = match lowered.split_once('/') {
        Some((port, protocol)) => (port, protocol),
        None => (lowered.as_str(), "tcp"),
    };

    let invalid = |reason: &str| CrpError::InvalidPort {
        raw: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| invalid("port must be an integer between 1 and 65535"))?;
    if port == 0 {
        return Err(invalid("port must be an integer between 1 and 65535"));
    }

    let protocol = protocol.trim();
    if protocol.is_empty() {
        return Err(invalid("protocol after '/' is empty"));
    }
    if !constants::KNOWN_PROTOCOLS.contains(&protocol) {
        tracing::warn!(port, protocol, "unrecognised application protocol");
    }

    let transport = if protocol == "udp" {
        Transport::Udp
    } else {
        Transport::Tcp
    };

    Ok(PortBinding {
        port,
        transport,
        protocol: protocol.to_owned(),
    })
}

/// Normalizes raw declarations into a port mapping.
///
/// Declarations that collapse onto the same `(port, transport)` key are
/// resolved last-write-wins, in input order.
///
/// # Errors
///
/// Returns the first [`CrpError::InvalidPort`] encountered.
pub fn normalize<S: AsRef<str>>(raw_ports: &[S]) -> Result<PortMap> {
    raw_ports
        .iter()
        .map(|raw| parse_port(raw.as_ref()))
        .collect::<Result<Vec<_>>>()
        .map(|bindings| bindings.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_declarations_normalize() {
        let map = normalize(&["22/ssh", "53/udp", "80"]).expect("valid ports");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(22, Transport::Tcp), Some("ssh"));
        assert_eq!(map.get(53, Transport::Udp), Some("udp"));
        assert_eq!(map.get(80, Transport::Tcp), Some("tcp"));
    }

    #[test]
    fn protocol_is_case_insensitive() {
        let binding = parse_port("8080/HTTP").expect("valid");
        assert_eq!(binding.protocol, "http");
        assert_eq!(binding.transport, Transport::Tcp);

        let binding = parse_port("53/UDP").expect("valid");
        assert_eq!(binding.transport, Transport::Udp);
    }

    #[test]
    fn later_declaration_wins_on_collision() {
        let map = normalize(&["80/http", "80"]).expect("valid");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(80, Transport::Tcp), Some("tcp"));
    }

    #[test]
    fn udp_and_tcp_on_same_port_coexist() {
        let map = normalize(&["53/udp", "53/tcp"]).expect("valid");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn only_first_slash_splits() {
        let binding = parse_port("9000/ws/extra").expect("valid");
        assert_eq!(binding.protocol, "ws/extra");
        assert_eq!(binding.transport, Transport::Tcp);
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = parse_port("ssh/22").expect_err("invalid");
        assert!(err.to_string().contains("ssh/22"), "got: {err}");
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536/tcp").is_err());
        assert!(parse_port("65535/tcp").is_ok());
    }

    #[test]
    fn rejects_empty_protocol() {
        assert!(parse_port("22/").is_err());
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let map = normalize::<&str>(&[]).expect("empty");
        assert!(map.is_empty());
    }

    #[test]
    fn one_invalid_entry_fails_the_whole_list() {
        assert!(normalize(&["22/ssh", "nope", "80"]).is_err());
    }
}
