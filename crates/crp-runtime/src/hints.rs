//! Human-readable connection instructions for published ports.

use crp_common::constants::{BIND_ADDR, SECRET};
use crp_common::types::{PortBinding, Transport};

/// Returns how an operator reaches `binding` on the loopback bind address.
#[must_use]
pub fn connection_hint(binding: &PortBinding) -> String {
    let port = binding.port;
    match (binding.protocol.as_str(), binding.transport) {
        (_, Transport::Udp) => format!("nc -u {BIND_ADDR} {port}"),
        ("ssh", _) => format!("ssh -p {port} user@{BIND_ADDR} Password: {SECRET}"),
        ("http", _) => format!("http://{BIND_ADDR}:{port}"),
        ("ws", _) => format!("ws://{BIND_ADDR}:{port}"),
        _ => format!("nc {BIND_ADDR} {port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(port: u16, transport: Transport, protocol: &str) -> PortBinding {
        PortBinding {
            port,
            transport,
            protocol: protocol.into(),
        }
    }

    #[test]
    fn ssh_hint_includes_password() {
        assert_eq!(
            connection_hint(&binding(2222, Transport::Tcp, "ssh")),
            "ssh -p 2222 user@127.0.0.1 Password: secret"
        );
    }

    #[test]
    fn http_hint_is_a_url() {
        assert_eq!(
            connection_hint(&binding(8080, Transport::Tcp, "http")),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn websocket_hint_is_a_url() {
        assert_eq!(
            connection_hint(&binding(9000, Transport::Tcp, "ws")),
            "ws://127.0.0.1:9000"
        );
    }

    #[test]
    fn udp_uses_netcat_in_udp_mode() {
        assert_eq!(
            connection_hint(&binding(53, Transport::Udp, "udp")),
            "nc -u 127.0.0.1 53"
        );
    }

    #[test]
    fn other_protocols_fall_back_to_netcat() {
        assert_eq!(
            connection_hint(&binding(1337, Transport::Tcp, "tcp")),
            "nc 127.0.0.1 1337"
        );
        assert_eq!(
            connection_hint(&binding(5555, Transport::Tcp, "controller")),
            "nc 127.0.0.1 5555"
        );
    }
}
