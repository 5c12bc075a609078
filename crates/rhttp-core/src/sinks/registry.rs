//! Process-wide table of named log sink entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::entry::{LogSinkEntry, SinkSettings};
use super::file::FileSink;
use super::level::Level;
use crate::config::LoggingConfig;

/// Which entries `reset` tears down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTarget<'a> {
    Instance(&'a str),
    All,
}

struct RegistryState {
    config: LoggingConfig,
    entries: HashMap<String, Arc<LogSinkEntry>>,
    /// Reset entries, console-only until the name is looked up again.
    retired: HashMap<String, Arc<LogSinkEntry>>,
}

/// Owns every [`LogSinkEntry`] by instance name.
///
/// Construct one at startup and pass it by reference. All lookups and
/// mutations go through a single lock, so concurrent `get_or_create` /
/// `reconfigure` / `reset` on one name never produce duplicate handlers.
/// Emission through an entry already handed out does not take this lock.
///
/// A name maps to the same `Arc<LogSinkEntry>` for the registry's whole
/// life. Reset closes its handlers and a later lookup rebuilds them, so
/// clients holding the entry keep logging to the current destinations.
pub struct LogSinkRegistry {
    state: Mutex<RegistryState>,
}

impl Default for LogSinkRegistry {
    fn default() -> Self {
        Self::new(LoggingConfig::default())
    }
}

impl LogSinkRegistry {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                config,
                entries: HashMap::new(),
                retired: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> LoggingConfig {
        self.state().config.clone()
    }

    /// The instance named by the configuration's `name`.
    pub fn default_entry(&self) -> Arc<LogSinkEntry> {
        let name = self.state().config.name.clone();
        self.get_or_create(&name)
    }

    /// Existing entry for `name`, or a new one built from the registry's configuration.
    pub fn get_or_create(&self, name: &str) -> Arc<LogSinkEntry> {
        let mut state = self.state();
        if let Some(entry) = state.entries.get(name) {
            return Arc::clone(entry);
        }
        let settings = state.config.sink_settings_for(name);
        insert(&mut state, name, &settings)
    }

    /// Like [`get_or_create`](Self::get_or_create) but with explicit settings
    /// for a new entry. An existing entry is returned unchanged.
    pub fn get_or_create_with(&self, name: &str, settings: &SinkSettings) -> Arc<LogSinkEntry> {
        let mut state = self.state();
        if let Some(entry) = state.entries.get(name) {
            return Arc::clone(entry);
        }
        insert(&mut state, name, settings)
    }

    /// Set the level of `name` and make sure its file handler matches `file`.
    ///
    /// An absent entry is created console-only first. Repeating a call with
    /// the same file settings leaves the existing handler in place.
    pub fn reconfigure(
        &self,
        name: &str,
        level: Level,
        file: Option<&FileSink>,
    ) -> Arc<LogSinkEntry> {
        let mut state = self.state();
        let entry = match state.entries.get(name) {
            Some(entry) => Arc::clone(entry),
            None => {
                let settings = SinkSettings {
                    level,
                    file: None,
                    caller: state.config.caller_format(),
                };
                insert(&mut state, name, &settings)
            }
        };
        entry.set_level(level);
        if let Some(sink) = file {
            entry.ensure_file_sink(sink);
        }
        entry
    }

    /// Close the handlers of the targeted entries and drop them from the
    /// live set. Returns how many entries were reset.
    ///
    /// A reset entry keeps only its console handler; the next lookup of its
    /// name rebuilds it from the configuration in force at that time.
    pub fn reset(&self, target: ResetTarget<'_>) -> usize {
        let mut state = self.state();
        let removed: Vec<(String, Arc<LogSinkEntry>)> = match target {
            ResetTarget::Instance(name) => state
                .entries
                .remove_entry(name)
                .into_iter()
                .collect(),
            ResetTarget::All => state.entries.drain().collect(),
        };
        let count = removed.len();
        for (name, entry) in removed {
            entry.close_handlers();
            tracing::debug!(instance = %name, "log sink entry reset");
            state.retired.insert(name, entry);
        }
        count
    }

    /// Swap in `config` and rebuild every live entry from it in place.
    pub fn reload(&self, config: LoggingConfig) {
        let mut state = self.state();
        state.config = config;
        for (name, entry) in &state.entries {
            entry.rebuild(&state.config.sink_settings_for(name));
        }
        tracing::debug!(instances = state.entries.len(), "log sink registry reloaded");
    }

    /// Names of live entries, sorted.
    pub fn instance_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state().entries.contains_key(name)
    }
}

/// Make `name` live with `settings`, reusing its entry if it was reset.
fn insert(state: &mut RegistryState, name: &str, settings: &SinkSettings) -> Arc<LogSinkEntry> {
    let entry = match state.retired.remove(name) {
        Some(entry) => {
            entry.rebuild(settings);
            entry
        }
        None => Arc::new(LogSinkEntry::build(name, settings)),
    };
    state.entries.insert(name.to_string(), Arc::clone(&entry));
    entry
}
