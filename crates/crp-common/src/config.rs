//! Typed configuration model for a challenge's container group.
//!
//! The surrounding tooling owns key-set validation of `config.yml`; this
//! module only gives the parsed document a strongly-typed shape so the
//! composition and launch layers never handle untyped mappings.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::constants;

/// The part of `config.yml` consumed by the launcher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeConfig {
    /// Container group, keyed by short name. Absent for non-docker
    /// challenge types.
    #[serde(default)]
    pub crp_config: Option<ContainerGroupConfig>,
}

/// Ordered mapping from short name to [`ContainerSpec`].
///
/// Keys are unique and keep the order in which they were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerGroupConfig {
    entries: Vec<(String, ContainerSpec)>,
}

impl ContainerGroupConfig {
    /// Creates an empty group.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a container, replacing any spec already stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, spec: ContainerSpec) -> Option<ContainerSpec> {
        let name = name.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            return Some(std::mem::replace(existing, spec));
        }
        self.entries.push((name, spec));
        None
    }

    /// Removes and returns the spec stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<ContainerSpec> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns `true` if a container named `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Short names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of declared containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no container is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ContainerGroupConfig {
    type Item = (String, ContainerSpec);
    type IntoIter = std::vec::IntoIter<(String, ContainerSpec)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'de> Deserialize<'de> for ContainerGroupConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupVisitor;

        impl<'de> Visitor<'de> for GroupVisitor {
            type Value = ContainerGroupConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping from container short name to container spec")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut group = ContainerGroupConfig::new();
                while let Some(name) = map.next_key::<String>()? {
                    if group.contains(&name) {
                        return Err(de::Error::custom(format!(
                            "duplicate container short name `{name}`"
                        )));
                    }
                    let spec = map.next_value_seed(SpecEntry(&name))?;
                    group.entries.push((name, spec));
                }
                Ok(group)
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

/// One `crp_config` value. Names the entry when it is not a mapping and
/// passes field errors from inside a mapping through untouched.
struct SpecEntry<'a>(&'a str);

impl<'de> DeserializeSeed<'de> for SpecEntry<'_> {
    type Value = ContainerSpec;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for SpecEntry<'_> {
    type Value = ContainerSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a mapping for crp_config.{}", self.0)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        ContainerSpec::deserialize(de::value::MapAccessDeserializer::new(map))
    }
}

/// Configuration of a single container as written in `config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerSpec {
    /// Explicit image reference. Derived from the short name when absent.
    #[serde(default)]
    pub image: Option<String>,
    /// Raw port declarations, e.g. `22/ssh`, `53/udp`, `8080`.
    #[serde(default, deserialize_with = "scalar_list")]
    pub ports: Vec<String>,
    /// Engine memory limit string, e.g. `256M`.
    #[serde(default)]
    pub mem_limit: Option<String>,
    /// Memory limit in megabytes.
    #[serde(default)]
    pub mem_limit_mb: Option<u64>,
    /// Requested Linux capability names.
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
    /// Kernel parameter overrides passed as sysctls.
    #[serde(default, deserialize_with = "scalar_map")]
    pub kernel_params: BTreeMap<String, String>,
    /// Declared read-only flag. The root filesystem is read-only regardless.
    #[serde(default)]
    pub read_only: Option<bool>,
    /// Writable mount points inside the otherwise read-only container.
    #[serde(default)]
    pub volumes: Vec<String>,
}

impl ContainerSpec {
    /// Memory limit to hand to the engine, if the spec declares one.
    ///
    /// `mem_limit` takes precedence over `mem_limit_mb`.
    #[must_use]
    pub fn memory_limit(&self) -> Option<String> {
        self.mem_limit
            .clone()
            .or_else(|| self.mem_limit_mb.map(|mb| format!("{mb}M")))
    }
}

/// Runtime knobs for a launch, independent of any single challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchSettings {
    /// Publish declared ports on the loopback address.
    pub forward_ports: bool,
    /// Reject out-of-policy capability requests instead of narrowing them.
    pub strict_capabilities: bool,
    /// Maximum time to wait for the engine to register a started container.
    pub settle: Duration,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            forward_ports: true,
            strict_capabilities: false,
            settle: Duration::from_millis(constants::DEFAULT_SETTLE_MS),
        }
    }
}

/// A YAML scalar of any type, kept as its string form.
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number, or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
                Ok(Scalar(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

fn scalar_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of scalars")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::new();
            while let Some(Scalar(s)) = seq.next_element()? {
                out.push(s);
            }
            Ok(out)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

fn scalar_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = Option::<BTreeMap<String, Scalar>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, Scalar(v))| (k, v))
        .collect())
}
