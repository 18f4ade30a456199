//! Configuration types for the webstore façade.
//!
//! Every struct implements [`Default`] with the façade's documented defaults,
//! so an empty TOML file or an empty patch yields a working configuration.

use serde::{Deserialize, Serialize};

/// Default namespace prefix.
pub const DEFAULT_PREFIX: &str = "__";

/// Default provider name.
pub const DEFAULT_PROVIDER: &str = "localStorage";

/// Root configuration of a façade instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebStorageConfig {
    /// Namespace prepended (with `:`) to every logical key.
    pub prefix: String,
    /// Name of the provider to activate.
    pub provider: String,
    /// Which operations emit notifications.
    #[serde(alias = "notifyOn")]
    pub notify_on: NotifyOptions,
}

impl Default for WebStorageConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            provider: DEFAULT_PROVIDER.to_owned(),
            notify_on: NotifyOptions::default(),
        }
    }
}

impl WebStorageConfig {
    /// Set the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the notification toggles.
    #[must_use]
    pub fn with_notify_on(mut self, notify_on: NotifyOptions) -> Self {
        self.notify_on = notify_on;
        self
    }

    /// Return a copy with `patch` applied.
    ///
    /// Fields the patch leaves unset (or sets to `null`) keep their current
    /// value; the configuration is never replaced wholesale.
    #[must_use]
    pub fn merge(&self, patch: &ConfigPatch) -> Self {
        let mut merged = self.clone();
        if let Some(prefix) = &patch.prefix {
            merged.prefix.clone_from(prefix);
        }
        if let Some(provider) = &patch.provider {
            merged.provider.clone_from(provider);
        }
        if let Some(notify) = &patch.notify_on {
            merged.notify_on = merged.notify_on.merge(notify);
        }
        merged
    }
}

/// Per-operation notification toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct NotifyOptions {
    /// Emit on `set`.
    pub set: bool,
    /// Emit on `get`.
    pub get: bool,
    /// Emit on `remove`.
    pub remove: bool,
    /// Emit one aggregate event on `remove_all`.
    #[serde(alias = "removeAll")]
    pub remove_all: bool,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            set: true,
            get: true,
            remove: true,
            remove_all: false,
        }
    }
}

impl NotifyOptions {
    /// Every toggle on.
    #[must_use]
    pub fn all() -> Self {
        Self {
            set: true,
            get: true,
            remove: true,
            remove_all: true,
        }
    }

    /// Every toggle off.
    #[must_use]
    pub fn none() -> Self {
        Self {
            set: false,
            get: false,
            remove: false,
            remove_all: false,
        }
    }

    /// Return a copy with the toggles set in `patch` applied.
    #[must_use]
    pub fn merge(self, patch: &NotifyPatch) -> Self {
        Self {
            set: patch.set.unwrap_or(self.set),
            get: patch.get.unwrap_or(self.get),
            remove: patch.remove.unwrap_or(self.remove),
            remove_all: patch.remove_all.unwrap_or(self.remove_all),
        }
    }
}

/// Partial configuration used by `setup`.
///
/// `None` means "no override", which is also what a JSON `null` decodes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    /// New prefix.
    pub prefix: Option<String>,
    /// New provider name.
    pub provider: Option<String>,
    /// New notification toggles.
    #[serde(alias = "notifyOn")]
    pub notify_on: Option<NotifyPatch>,
}

impl ConfigPatch {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Override the provider.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Override notification toggles.
    #[must_use]
    pub fn notify_on(mut self, notify_on: NotifyPatch) -> Self {
        self.notify_on = Some(notify_on);
        self
    }
}

/// Partial [`NotifyOptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyPatch {
    /// Override for `set`.
    pub set: Option<bool>,
    /// Override for `get`.
    pub get: Option<bool>,
    /// Override for `remove`.
    pub remove: Option<bool>,
    /// Override for `remove_all`.
    #[serde(alias = "removeAll")]
    pub remove_all: Option<bool>,
}
