//! Activation state of the façade.

use serde::{Deserialize, Serialize};

/// Whether a validated backing store is in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// No validated store; storage operations report `PROVIDER_NOT_SET`.
    #[default]
    Inactive,
    /// A provider's validation is in flight.
    Activating,
    /// A validated store is in use.
    Active,
}

impl ProviderState {
    /// Whether storage operations can run.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Stable name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Active => "active",
        }
    }
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
