//! # crp-core
//!
//! Security primitives for challenge containers.
//!
//! - **Capabilities**: the universe of Linux capabilities the launcher knows
//!   about, and the [`capability::CapabilityPolicy`] that narrows (or
//!   rejects) what a challenge author may request.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod capability;
