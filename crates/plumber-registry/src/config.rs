//! Registry configuration.

use serde::{Deserialize, Serialize};

/// What to do when a second descriptor claims an identifier that is
/// already taken.
///
/// Identifiers are 16-bit hashes, so two differently named operations can
/// land on the same one. Replacing the first reroutes all of its traffic to
/// the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Fail the registration with `DuplicateRegistration`.
    #[default]
    Reject,

    /// Log a warning and replace the existing descriptor.
    Replace,
}

/// Configuration for a [`Registry`](crate::Registry).
///
/// `#[serde(default)]` lets a config file mention only the fields it wants
/// to change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Duplicate-identifier policy. Default: [`DuplicatePolicy::Reject`].
    pub duplicate_policy: DuplicatePolicy,
}
