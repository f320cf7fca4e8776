//! Container group launch and supervision for challenge containers.
//!
//! The group's first container owns a fresh network namespace; every
//! later container joins it and mounts its volumes. [`group::ContainerGroup`]
//! starts them in that order and removes every labeled container when it
//! goes out of scope.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod group;
pub mod hints;
pub mod launcher;
pub mod spec;
