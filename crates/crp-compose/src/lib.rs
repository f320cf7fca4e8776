//! # crp-compose
//!
//! Turns a challenge's declared container group into a launch plan.
//!
//! Handles:
//! - **Ports**: normalization of `port[/protocol]` declarations into
//!   `(port, transport) -> application protocol` bindings.
//! - **Order**: primary-first start ordering, image resolution, and
//!   attaching the merged port mapping to the namespace owner.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod order;
pub mod ports;

pub use order::{ComposeContext, ComposedContainer, ComposedGroup, compose, order};
pub use ports::{normalize, parse_port};
