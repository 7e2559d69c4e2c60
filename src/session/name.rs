//! Session name type.

use std::fmt;
use std::str::FromStr;

/// Name of a gateway session.
///
/// Names are positive integers chosen by the registry, never by callers: a
/// new session always receives the lowest integer not currently registered,
/// so a given sequence of create/terminate calls yields the same names every
/// time. Displayed and parsed in plain decimal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionName(u32);

impl SessionName {
    /// Create a SessionName from a raw positive integer.
    ///
    /// This is primarily for lookups, testing, and deserialization; fresh
    /// names come from the registry's allocator.
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw u32 value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Iterator over candidate names, lowest first, starting at 1.
    pub fn candidates() -> impl Iterator<Item = SessionName> {
        (1..).map(SessionName)
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionName {
    type Err = crate::error::GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(SessionName)
            .ok_or_else(|| crate::error::GatewayError::UnknownSession(s.into()))
    }
}
