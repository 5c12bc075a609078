//! Severity levels: the standard five plus seven `INFO_*` sub-levels between DEBUG and INFO.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum Level {
    Debug = 10,
    InfoConfig = 11,
    InfoUtils = 12,
    InfoDatabase = 13,
    InfoKernel = 14,
    InfoCore = 15,
    InfoService = 16,
    InfoControl = 17,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

const ALL: [Level; 12] = [
    Level::Debug,
    Level::InfoConfig,
    Level::InfoUtils,
    Level::InfoDatabase,
    Level::InfoKernel,
    Level::InfoCore,
    Level::InfoService,
    Level::InfoControl,
    Level::Info,
    Level::Warning,
    Level::Error,
    Level::Critical,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level: {0}")]
pub struct UnknownLevel(pub String);

impl Level {
    pub const fn value(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::InfoConfig => "INFO_CONFIG",
            Level::InfoUtils => "INFO_UTILS",
            Level::InfoDatabase => "INFO_DATABASE",
            Level::InfoKernel => "INFO_KERNEL",
            Level::InfoCore => "INFO_CORE",
            Level::InfoService => "INFO_SERVICE",
            Level::InfoControl => "INFO_CONTROL",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Case-insensitive lookup. `WARN` and `FATAL` are accepted aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "WARN" => Some(Level::Warning),
            "FATAL" => Some(Level::Critical),
            _ => ALL.iter().copied().find(|l| l.name() == upper),
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        ALL.iter().copied().find(|l| l.value() == value)
    }

    /// True for the `INFO_*` sub-levels (11..=17).
    pub const fn is_custom(self) -> bool {
        matches!(self.value(), 11..=17)
    }

    pub fn all() -> &'static [Level] {
        &ALL
    }
}

/// Resolve `name`, falling back to `default` when it is not a known level.
pub fn level_or(name: &str, default: Level) -> Level {
    Level::from_name(name).unwrap_or(default)
}

/// Name → value table of the `INFO_*` sub-levels.
pub fn custom_levels() -> Vec<(&'static str, u8)> {
    ALL.iter()
        .filter(|l| l.is_custom())
        .map(|l| (l.name(), l.value()))
        .collect()
}

/// Name → value table of every level, in ascending severity.
pub fn all_levels() -> Vec<(&'static str, u8)> {
    ALL.iter().map(|l| (l.name(), l.value())).collect()
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::from_name(s).ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

impl TryFrom<String> for Level {
    type Error = UnknownLevel;

    fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.name().to_string()
    }
}
