//! Host isolation vocabulary and its translation to the store's levels.

use repobridge_core::IsolationLevel;
use serde::Deserialize;
use std::fmt;

/// Isolation level as the host transaction manager names it.
///
/// The numeric codes are the ones connection APIs conventionally use, with
/// `-1` meaning "whatever the resource defaults to".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "i32")]
pub enum HostIsolation {
    #[default]
    Default,
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    /// A code this crate does not know.
    Other(i32),
}

impl HostIsolation {
    pub const fn code(self) -> i32 {
        match self {
            HostIsolation::Default => -1,
            HostIsolation::None => 0,
            HostIsolation::ReadUncommitted => 1,
            HostIsolation::ReadCommitted => 2,
            HostIsolation::RepeatableRead => 4,
            HostIsolation::Serializable => 8,
            HostIsolation::Other(code) => code,
        }
    }

    pub const fn from_code(code: i32) -> Self {
        match code {
            -1 => HostIsolation::Default,
            0 => HostIsolation::None,
            1 => HostIsolation::ReadUncommitted,
            2 => HostIsolation::ReadCommitted,
            4 => HostIsolation::RepeatableRead,
            8 => HostIsolation::Serializable,
            other => HostIsolation::Other(other),
        }
    }
}

impl From<i32> for HostIsolation {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for HostIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostIsolation::Default => f.write_str("DEFAULT"),
            HostIsolation::Other(code) => write!(f, "UNKNOWN({code})"),
            known => match translate_isolation(*known) {
                Some(level) => f.write_str(level.as_sql()),
                None => f.write_str("DEFAULT"),
            },
        }
    }
}

/// Map a host level onto the store's vocabulary.
///
/// `None` means no explicit level: the native transaction starts at the
/// store default. That is the answer for `Default` and for unknown codes.
pub const fn translate_isolation(host: HostIsolation) -> Option<IsolationLevel> {
    match host {
        HostIsolation::None => Some(IsolationLevel::None),
        HostIsolation::ReadUncommitted => Some(IsolationLevel::ReadUncommitted),
        HostIsolation::ReadCommitted => Some(IsolationLevel::ReadCommitted),
        HostIsolation::RepeatableRead => Some(IsolationLevel::RepeatableRead),
        HostIsolation::Serializable => Some(IsolationLevel::Serializable),
        HostIsolation::Default | HostIsolation::Other(_) => None,
    }
}
