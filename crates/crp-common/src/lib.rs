//! # crp-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the whole challenge launcher workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the typed configuration model that the
//! composition and launch layers consume.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
