use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Millisecond-resolution wall-clock stamp recording when content was last
/// touched.
///
/// Chunks stamp an `AccessStamp` on every load and on explicit usage
/// registration; an external cache manager reads the stamps to decide what
/// to evict. The stamp itself carries no eviction policy.
///
/// Totally ordered by the millisecond value. [`AccessStamp::zero`] sorts
/// before every real stamp and means "never accessed".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessStamp(u64);

impl AccessStamp {
    /// A stamp for the current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    /// The zero stamp: never accessed.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Build a stamp from raw milliseconds since the UNIX epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the UNIX epoch.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns `true` if the stamp is the never-accessed sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for AccessStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessStamp({}ms)", self.0)
    }
}

impl fmt::Display for AccessStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
