//! Wall-clock timestamps with nanosecond resolution.

use core::fmt;
use libm::{floor, round};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::DeadReckoningError;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A point in time as whole seconds plus nanoseconds since the Unix epoch.
///
/// Seconds are signed so that differences between stamps can go negative when
/// the clock steps backwards.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Stamp {
    sec: i64,
    nsec: u32,
}

impl Stamp {
    /// Construct a stamp from seconds and nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeadReckoningError::InvalidNanoseconds)` if `nsec` is one
    /// second or more.
    pub const fn new(sec: i64, nsec: u32) -> Result<Self, DeadReckoningError> {
        if nsec >= NANOS_PER_SEC {
            return Err(DeadReckoningError::InvalidNanoseconds(
                "must be below 1_000_000_000",
            ));
        }
        Ok(Stamp { sec, nsec })
    }

    /// Construct a stamp from floating-point seconds, rounded to the nearest nanosecond.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeadReckoningError::NonFiniteTimestamp)` if `secs` is NaN or infinite.
    pub fn from_secs_f64(secs: f64) -> Result<Self, DeadReckoningError> {
        if !secs.is_finite() {
            return Err(DeadReckoningError::NonFiniteTimestamp("must be finite"));
        }
        let whole = floor(secs);
        let mut sec = whole as i64;
        let mut nsec = round((secs - whole) * NANOS_PER_SEC as f64) as u32;
        if nsec >= NANOS_PER_SEC {
            sec += 1;
            nsec -= NANOS_PER_SEC;
        }
        Ok(Stamp { sec, nsec })
    }

    /// Current wall-clock time.
    #[cfg(feature = "std")]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => Stamp {
                sec: since.as_secs() as i64,
                nsec: since.subsec_nanos(),
            },
            Err(err) => {
                // Clock set before 1970: borrow a second so nsec stays positive.
                let before = err.duration();
                match before.subsec_nanos() {
                    0 => Stamp {
                        sec: -(before.as_secs() as i64),
                        nsec: 0,
                    },
                    sub => Stamp {
                        sec: -(before.as_secs() as i64) - 1,
                        nsec: NANOS_PER_SEC - sub,
                    },
                }
            }
        }
    }

    /// Whole seconds.
    pub const fn sec(&self) -> i64 {
        self.sec
    }

    /// Nanoseconds past `sec`.
    pub const fn nsec(&self) -> u32 {
        self.nsec
    }

    /// Signed elapsed time from `earlier` to `self`, in seconds.
    ///
    /// Seconds and nanoseconds are differenced separately before being
    /// combined, so large epoch values do not swallow sub-microsecond steps.
    /// The result is negative if `earlier` is later than `self`.
    pub fn seconds_since(&self, earlier: Stamp) -> f64 {
        let secs = (i128::from(self.sec) - i128::from(earlier.sec)) as f64;
        let nanos = (self.nsec as i64 - earlier.nsec as i64) as f64;
        secs + nanos / NANOS_PER_SEC as f64
    }

    /// This stamp as floating-point seconds (lossy for epoch-sized values).
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 / NANOS_PER_SEC as f64
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}
