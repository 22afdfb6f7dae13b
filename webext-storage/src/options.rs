//! Per-instance configuration.

use crate::error::{ErrorHook, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use webext_storage_reactive::{EventFilter, Flush, Scope, WatchOptions};

/// Options for [`use_webext_storage`](crate::use_webext_storage).
///
/// Data fields (de)serialize with the extension API's camelCase names;
/// callbacks and the scope are set through the builder methods.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageOptions {
    /// Persist local changes and follow changes made elsewhere.
    pub listen_to_storage_changes: bool,

    /// Track only whole-value replacement of the data cell.
    pub shallow: bool,

    /// Seed the backend with the initial value when the key is absent.
    pub write_defaults: bool,

    /// Whether in-place mutations trigger persistence. Defaults to `!shallow`.
    pub deep: Option<bool>,

    /// Gate for write-watcher firings.
    #[serde(skip)]
    pub event_filter: Option<EventFilter>,

    /// Called for every error recorded in the error slot.
    #[serde(skip)]
    pub on_error: Option<ErrorHook>,

    /// Scope whose disposal stops change tracking.
    #[serde(skip)]
    pub scope: Option<Scope>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            listen_to_storage_changes: false,
            shallow: false,
            write_defaults: true,
            deep: None,
            event_filter: None,
            on_error: None,
            scope: None,
        }
    }
}

impl StorageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen_to_storage_changes(mut self, listen: bool) -> Self {
        self.listen_to_storage_changes = listen;
        self
    }

    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    pub fn write_defaults(mut self, write_defaults: bool) -> Self {
        self.write_defaults = write_defaults;
        self
    }

    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = Some(deep);
        self
    }

    pub fn event_filter(mut self, filter: EventFilter) -> Self {
        self.event_filter = Some(filter);
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&StorageError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn scope(mut self, scope: &Scope) -> Self {
        self.scope = Some(scope.clone());
        self
    }

    /// Effective deep-comparison mode for the write watcher.
    pub fn watch_deep(&self) -> bool {
        self.deep.unwrap_or(!self.shallow)
    }

    /// Watcher configuration used to persist local changes.
    pub(crate) fn write_watch_options(&self) -> WatchOptions {
        WatchOptions::new()
            .immediate(true)
            .flush(Flush::Post)
            .deep(self.watch_deep())
            .filter(self.event_filter.clone())
    }
}

impl fmt::Debug for StorageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageOptions")
            .field("listen_to_storage_changes", &self.listen_to_storage_changes)
            .field("shallow", &self.shallow)
            .field("write_defaults", &self.write_defaults)
            .field("deep", &self.deep)
            .field("event_filter", &self.event_filter.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}
