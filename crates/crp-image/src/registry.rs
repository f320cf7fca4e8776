//! Registry-relative image references.
//!
//! Images built from a challenge repository live at
//! `<registry>/<repo>:<short name>[-<branch>]`. The branch suffix keeps
//! non-default branches from overwriting each other in a shared
//! repository namespace.

use crp_common::constants;

/// A container registry base URL, without trailing slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    base: String,
}

impl Registry {
    /// Creates a registry from a base URL, stripping trailing slashes.
    #[must_use]
    pub fn new(base: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim_end_matches('/').to_owned(),
        }
    }

    /// The base URL images are resolved against.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolves the image built for `short_name` on `branch`.
    ///
    /// With `absolute` unset, returns the bare `repo:tag` coordinate.
    #[must_use]
    pub fn resolve(&self, repo_name: &str, branch: &str, short_name: &str, absolute: bool) -> String {
        let tag = if branch == constants::DEFAULT_BRANCH {
            short_name.to_owned()
        } else {
            format!("{short_name}-{branch}")
        };
        let image = format!("{repo_name}:{tag}");

        if absolute {
            format!("{}/{image}", self.base)
        } else {
            image
        }
    }

    /// Resolves an explicitly configured image reference.
    ///
    /// Explicit references are already fully qualified and are returned
    /// unchanged.
    #[must_use]
    pub fn resolve_explicit(&self, image: &str) -> String {
        tracing::debug!(image, "using explicit image reference");
        image.to_owned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(constants::DEFAULT_REGISTRY)
    }
}

/// Returns the last path segment of an image reference without its tag.
///
/// `eu.gcr.io/store/chal:solvable` becomes `chal`.
#[must_use]
pub fn image_basename(image: &str) -> &str {
    let last = image.rsplit('/').next().unwrap_or(image);
    last.split(':').next().unwrap_or(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_default_branch_suffixes_tag() {
        let registry = Registry::new("reg.example.com/store");
        assert_eq!(
            registry.resolve("mychal", "staging", "solvable", true),
            "reg.example.com/store/mychal:solvable-staging"
        );
    }

    #[test]
    fn master_branch_uses_bare_short_name() {
        let registry = Registry::new("reg.example.com/store");
        assert_eq!(
            registry.resolve("mychal", "master", "solvable", true),
            "reg.example.com/store/mychal:solvable"
        );
    }

    #[test]
    fn relative_resolution_omits_registry() {
        let registry = Registry::default();
        assert_eq!(
            registry.resolve("mychal", "demo", "controller", false),
            "mychal:controller-demo"
        );
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let registry = Registry::new("localhost:5000///");
        assert_eq!(registry.base(), "localhost:5000");
        assert_eq!(
            registry.resolve("c", "master", "solvable", true),
            "localhost:5000/c:solvable"
        );
    }

    #[test]
    fn default_registry_is_challenge_store() {
        assert_eq!(Registry::default().base(), "eu.gcr.io/avatao-challengestore");
    }

    #[test]
    fn explicit_reference_is_unchanged() {
        let registry = Registry::default();
        assert_eq!(
            registry.resolve_explicit("docker.io/library/redis:7"),
            "docker.io/library/redis:7"
        );
    }

    #[test]
    fn basename_strips_path_and_tag() {
        assert_eq!(image_basename("eu.gcr.io/store/chal:solvable"), "chal");
        assert_eq!(image_basename("chal:solvable-staging"), "chal");
        assert_eq!(image_basename("redis"), "redis");
    }
}
