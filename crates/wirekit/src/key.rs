//! Selector keys and service lifetimes

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DIError;

/// Service lifetime management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceLifetime {
    /// Service is created each time it's requested
    #[serde(alias = "instance-per-dependency")]
    Transient,
    /// Service is created once per dependency type and key, then reused
    Singleton,
}

impl fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceLifetime::Transient => write!(f, "transient"),
            ServiceLifetime::Singleton => write!(f, "singleton"),
        }
    }
}

/// Bit-flag tag distinguishing several bindings under one dependency type.
///
/// Keys are matched by intersection: a registered key satisfies a request when
/// they share at least one bit. `NONE` is a real bit so that unkeyed
/// registrations still satisfy `ANY`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SelectorKey(u8);

impl SelectorKey {
    pub const NONE: Self = Self(0b001);
    pub const FIRST: Self = Self(0b010);
    pub const SECOND: Self = Self(0b100);
    pub const ANY: Self = Self(0b111);

    const NAMED: [(SelectorKey, &'static str); 3] = [
        (Self::NONE, "None"),
        (Self::FIRST, "First"),
        (Self::SECOND, "Second"),
    ];

    /// Build a key from raw bits; `None` for zero or unknown bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits != 0 && bits & !Self::ANY.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Does this key share any bit with `other`
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Does this key include every bit of `other`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SelectorKey {
    fn default() -> Self {
        Self::NONE
    }
}

impl BitOr for SelectorKey {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SelectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            return write!(f, "Any");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("|"))
    }
}

impl fmt::Debug for SelectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelectorKey({})", self)
    }
}

impl FromStr for SelectorKey {
    type Err = DIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = 0u8;
        for part in s.split('|') {
            let flag = match part.trim().to_ascii_lowercase().as_str() {
                "none" => Self::NONE,
                "first" => Self::FIRST,
                "second" => Self::SECOND,
                "any" => Self::ANY,
                other => {
                    return Err(DIError::invalid_configuration(format!(
                        "unknown selector key '{}'",
                        other
                    )))
                }
            };
            bits |= flag.0;
        }
        Ok(Self(bits))
    }
}

impl TryFrom<String> for SelectorKey {
    type Error = DIError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SelectorKey> for String {
    fn from(key: SelectorKey) -> Self {
        key.to_string()
    }
}
