//! # crp-image
//!
//! Image reference handling for challenge containers.
//!
//! - **Registry**: maps `(repository, branch, short name)` to absolute
//!   registry URLs, and passes explicit image references through.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod registry;

pub use registry::{Registry, image_basename};
