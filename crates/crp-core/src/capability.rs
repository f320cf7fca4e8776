//! Linux capability management for least-privilege challenge containers.
//!
//! Every container that requests capabilities starts from an empty set
//! (`--cap-drop=ALL`) and gets back only what the [`CapabilityPolicy`]
//! allows. The policy is an immutable value built once at startup and
//! handed to the launcher explicitly.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crp_common::config::LaunchSettings;
use crp_common::error::{CrpError, Result};
use serde::{Serialize, Serializer};

macro_rules! capabilities {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Linux capability identifiers, named as the container engine
        /// expects them (without the `CAP_` prefix).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Capability {
            $(
                #[doc = concat!("`CAP_", $name, "`")]
                $variant,
            )+
        }

        impl Capability {
            /// Every capability the launcher knows about.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the engine-facing name, e.g. `NET_ADMIN`.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

capabilities! {
    AuditControl => "AUDIT_CONTROL",
    AuditWrite => "AUDIT_WRITE",
    BlockSuspend => "BLOCK_SUSPEND",
    Chown => "CHOWN",
    DacOverride => "DAC_OVERRIDE",
    DacReadSearch => "DAC_READ_SEARCH",
    Fowner => "FOWNER",
    Fsetid => "FSETID",
    IpcLock => "IPC_LOCK",
    IpcOwner => "IPC_OWNER",
    Kill => "KILL",
    Lease => "LEASE",
    LinuxImmutable => "LINUX_IMMUTABLE",
    MacAdmin => "MAC_ADMIN",
    MacOverride => "MAC_OVERRIDE",
    Mknod => "MKNOD",
    NetAdmin => "NET_ADMIN",
    NetBindService => "NET_BIND_SERVICE",
    NetBroadcast => "NET_BROADCAST",
    NetRaw => "NET_RAW",
    Setfcap => "SETFCAP",
    Setgid => "SETGID",
    Setpcap => "SETPCAP",
    Setuid => "SETUID",
    SysAdmin => "SYS_ADMIN",
    SysBoot => "SYS_BOOT",
    SysChroot => "SYS_CHROOT",
    SysModule => "SYS_MODULE",
    SysNice => "SYS_NICE",
    SysPacct => "SYS_PACCT",
    SysPtrace => "SYS_PTRACE",
    SysRawio => "SYS_RAWIO",
    SysResource => "SYS_RESOURCE",
    SysTime => "SYS_TIME",
    SysTtyConfig => "SYS_TTY_CONFIG",
    Syslog => "SYSLOG",
    WakeAlarm => "WAKE_ALARM",
}

/// Capabilities that are never granted to a challenge container.
pub const DEFAULT_BLACKLIST: &[Capability] = &[
    Capability::MacAdmin,
    Capability::MacOverride,
    Capability::SysAdmin,
    Capability::SysModule,
    Capability::SysResource,
    Capability::LinuxImmutable,
    Capability::SysBoot,
    Capability::BlockSuspend,
    Capability::WakeAlarm,
];

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CrpError;

    /// Parses a capability name case-insensitively, with or without the
    /// `CAP_` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("CAP_").unwrap_or(&upper);
        Self::ALL
            .iter()
            .copied()
            .find(|cap| cap.as_str() == name)
            .ok_or_else(|| CrpError::config(format!("unknown capability: {s}")))
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What to do with requested capabilities outside the allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NarrowingMode {
    /// Drop them and log a warning.
    #[default]
    Narrow,
    /// Fail with [`CrpError::CapabilityDenied`].
    Reject,
}

impl From<&LaunchSettings> for NarrowingMode {
    fn from(settings: &LaunchSettings) -> Self {
        if settings.strict_capabilities {
            Self::Reject
        } else {
            Self::Narrow
        }
    }
}

/// The effective capability allow-list: every known capability minus a
/// blacklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityPolicy {
    allowed: BTreeSet<Capability>,
    mode: NarrowingMode,
}

impl CapabilityPolicy {
    /// Builds a policy allowing everything except `blacklist`.
    pub fn new(blacklist: impl IntoIterator<Item = Capability>, mode: NarrowingMode) -> Self {
        let denied: BTreeSet<Capability> = blacklist.into_iter().collect();
        let allowed = Capability::ALL
            .iter()
            .copied()
            .filter(|cap| !denied.contains(cap))
            .collect();
        Self { allowed, mode }
    }

    /// Returns the same allow-list with a different narrowing mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: NarrowingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Narrowing mode in effect.
    #[must_use]
    pub const fn mode(&self) -> NarrowingMode {
        self.mode
    }

    /// Returns `true` if `cap` may be granted.
    #[must_use]
    pub fn is_allowed(&self, cap: Capability) -> bool {
        self.allowed.contains(&cap)
    }

    /// The allow-list, in a stable order.
    pub fn allowed(&self) -> impl Iterator<Item = Capability> + '_ {
        self.allowed.iter().copied()
    }

    /// Intersects `requested` with the allow-list.
    ///
    /// Unknown names count as not allowed.
    ///
    /// # Errors
    ///
    /// Returns [`CrpError::CapabilityDenied`] in [`NarrowingMode::Reject`]
    /// when anything requested is outside the allow-list.
    pub fn apply<S: AsRef<str>>(&self, requested: &[S]) -> Result<BTreeSet<Capability>> {
        let mut granted = BTreeSet::new();
        let mut rejected = Vec::new();

        for name in requested {
            let name = name.as_ref();
            match name.parse::<Capability>() {
                Ok(cap) if self.is_allowed(cap) => {
                    let _ = granted.insert(cap);
                }
                _ => rejected.push(name.to_owned()),
            }
        }

        if rejected.is_empty() {
            return Ok(granted);
        }

        match self.mode {
            NarrowingMode::Narrow => {
                tracing::warn!(
                    rejected = %rejected.join(","),
                    "dropping capabilities outside the allow-list"
                );
                Ok(granted)
            }
            NarrowingMode::Reject => Err(CrpError::CapabilityDenied { rejected }),
        }
    }
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().copied(), NarrowingMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_settings_select_reject_mode() {
        let mut settings = LaunchSettings::default();
        assert_eq!(NarrowingMode::from(&settings), NarrowingMode::Narrow);
        settings.strict_capabilities = true;
        assert_eq!(NarrowingMode::from(&settings), NarrowingMode::Reject);
    }

    #[test]
    fn universe_has_every_known_capability() {
        assert_eq!(Capability::ALL.len(), 37);
        let names: BTreeSet<&str> = Capability::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names.len(), 37);
    }

    #[test]
    fn default_allow_list_excludes_blacklist() {
        let policy = CapabilityPolicy::default();
        assert_eq!(policy.allowed().count(), 37 - DEFAULT_BLACKLIST.len());
        for cap in DEFAULT_BLACKLIST {
            assert!(!policy.is_allowed(*cap), "{cap} should be blacklisted");
        }
        assert!(policy.is_allowed(Capability::NetAdmin));
    }

    #[test]
    fn narrowing_drops_blacklisted_request() {
        let policy = CapabilityPolicy::default();
        let granted = policy.apply(&["SYS_ADMIN", "NET_ADMIN"]).expect("narrow mode");
        assert_eq!(granted, BTreeSet::from([Capability::NetAdmin]));
    }

    #[test]
    fn narrowing_drops_unknown_names() {
        let policy = CapabilityPolicy::default();
        let granted = policy.apply(&["NOT_A_CAP", "chown"]).expect("narrow mode");
        assert_eq!(granted, BTreeSet::from([Capability::Chown]));
    }

    #[test]
    fn reject_mode_names_offending_capabilities() {
        let policy = CapabilityPolicy::default().with_mode(NarrowingMode::Reject);
        let err = policy
            .apply(&["NET_ADMIN", "SYS_ADMIN", "SYS_MODULE"])
            .expect_err("should reject");
        match err {
            CrpError::CapabilityDenied { rejected } => {
                assert_eq!(rejected, vec!["SYS_ADMIN", "SYS_MODULE"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reject_mode_accepts_allowed_requests() {
        let policy = CapabilityPolicy::default().with_mode(NarrowingMode::Reject);
        let granted = policy.apply(&["NET_RAW", "SETUID"]).expect("allowed");
        assert_eq!(
            granted,
            BTreeSet::from([Capability::NetRaw, Capability::Setuid])
        );
    }

    #[test]
    fn custom_blacklist_is_respected() {
        let policy = CapabilityPolicy::new([Capability::NetAdmin], NarrowingMode::Narrow);
        assert!(!policy.is_allowed(Capability::NetAdmin));
        assert!(policy.is_allowed(Capability::SysAdmin));
    }

    #[test]
    fn parse_accepts_prefix_and_lowercase() {
        assert_eq!("cap_net_raw".parse::<Capability>().expect("parse"), Capability::NetRaw);
        assert_eq!("Sys_Ptrace".parse::<Capability>().expect("parse"), Capability::SysPtrace);
        assert!("NOPE".parse::<Capability>().is_err());
    }

    #[test]
    fn empty_request_grants_nothing() {
        let policy = CapabilityPolicy::default();
        let granted = policy.apply::<&str>(&[]).expect("empty");
        assert!(granted.is_empty());
    }
}
