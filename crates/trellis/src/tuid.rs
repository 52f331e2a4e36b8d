//! Tree-unique component identities.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CodecError;

/// Identity of a component instance, unique for the lifetime of its allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuid(u64);

impl Tuid {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Tuid {
    type Err = CodecError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        text.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CodecError::InvalidTuid(text.into()))
    }
}

/// Monotonic TUID source.
///
/// The allocator is an explicit object owned by whoever builds pages, so that
/// independent test runs never share a counter. It is safe to share between
/// threads serving requests in parallel.
#[derive(Debug, Default)]
pub struct TuidAllocator {
    last: AtomicU64,
}

impl TuidAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first identity is `last + 1`.
    #[must_use]
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Returns a fresh identity, never handed out before by this allocator.
    pub fn next_tuid(&self) -> Tuid {
        Tuid(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Last identity handed out, `0` when none was.
    #[must_use]
    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Formats listener identities the way triggers carry them on the wire.
#[must_use]
pub fn join_tuids(tuids: &[Tuid]) -> String {
    tuids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a comma-separated TUID list. Empty segments are skipped.
pub fn split_tuids(text: &str) -> Result<Vec<Tuid>, CodecError> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}
