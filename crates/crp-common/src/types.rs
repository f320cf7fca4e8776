//! Domain primitive types used across the launcher workspace.

use std::fmt;

use serde::Serialize;

/// Transport-layer protocol of a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// TCP, used for every application protocol except `udp`.
    Tcp,
    /// UDP.
    Udp,
}

impl Transport {
    /// Returns the lowercase protocol name used by the container engine.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized `(port, transport, application protocol)` triple.
///
/// The application protocol is informational only; it selects the
/// connection hint shown to the operator. The transport decides how the
/// port is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    /// Port number, 1-65535.
    pub port: u16,
    /// Transport protocol.
    pub transport: Transport,
    /// Lowercase application protocol, e.g. `ssh` or `http`.
    pub protocol: String,
}

impl PortBinding {
    /// Returns the `(port, transport)` key that identifies this binding.
    #[must_use]
    pub const fn key(&self) -> (u16, Transport) {
        (self.port, self.transport)
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.port, self.transport, self.protocol)
    }
}

/// Ordered set of bindings keyed by `(port, transport)`.
///
/// Inserting a binding whose key is already present replaces the
/// application protocol in place, so the first declaration fixes the
/// position and the last one fixes the protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PortMap {
    bindings: Vec<PortBinding>,
}

impl PortMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Inserts a binding, returning the protocol it replaced, if any.
    pub fn insert(&mut self, binding: PortBinding) -> Option<String> {
        if let Some(existing) = self.bindings.iter_mut().find(|b| b.key() == binding.key()) {
            return Some(std::mem::replace(&mut existing.protocol, binding.protocol));
        }
        self.bindings.push(binding);
        None
    }

    /// Inserts every binding of `other`, in order, with last-write-wins.
    pub fn merge(&mut self, other: Self) {
        for binding in other.bindings {
            let _ = self.insert(binding);
        }
    }

    /// Returns the application protocol bound to `(port, transport)`.
    #[must_use]
    pub fn get(&self, port: u16, transport: Transport) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.key() == (port, transport))
            .map(|b| b.protocol.as_str())
    }

    /// Iterates over bindings in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, PortBinding> {
        self.bindings.iter()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'a> IntoIterator for &'a PortMap {
    type Item = &'a PortBinding;
    type IntoIter = std::slice::Iter<'a, PortBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<PortBinding> for PortMap {
    fn from_iter<I: IntoIterator<Item = PortBinding>>(iter: I) -> Self {
        let mut map = Self::new();
        for binding in iter {
            let _ = map.insert(binding);
        }
        map
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
    fn insert_replaces_protocol_in_place() {
        let mut map = PortMap::new();
        assert!(map.insert(binding(80, Transport::Tcp, "http")).is_none());
        assert!(map.insert(binding(22, Transport::Tcp, "ssh")).is_none());
        let old = map.insert(binding(80, Transport::Tcp, "tcp"));

        assert_eq!(old.as_deref(), Some("http"));
        assert_eq!(map.len(), 2);
        let ports: Vec<u16> = map.iter().map(|b| b.port).collect();
        assert_eq!(ports, vec![80, 22]);
        assert_eq!(map.get(80, Transport::Tcp), Some("tcp"));
    }

    #[test]
    fn same_port_different_transport_are_distinct() {
        let map: PortMap = [
            binding(53, Transport::Tcp, "tcp"),
            binding(53, Transport::Udp, "udp"),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(53, Transport::Udp), Some("udp"));
    }

    #[test]
    fn merge_is_last_write_wins() {
        let mut first: PortMap = [binding(80, Transport::Tcp, "http")].into_iter().collect();
        let second: PortMap = [binding(80, Transport::Tcp, "tcp")].into_iter().collect();
        first.merge(second);
        assert_eq!(first.get(80, Transport::Tcp), Some("tcp"));
    }

    #[test]
    fn serializes_as_list() {
        let map: PortMap = [binding(22, Transport::Tcp, "ssh")].into_iter().collect();
        let json = serde_json::to_string(&map).expect("serialize");
        assert_eq!(json, r#"[{"port":22,"transport":"tcp","protocol":"ssh"}]"#);
    }
}
