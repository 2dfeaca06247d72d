//! Error types for the dead-reckoning library.
//!
//! Integration itself never fails; the only fallible operations are the
//! constructors that validate timestamps handed in by callers.

use core::fmt;

/// Errors that can occur when building dead-reckoning inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum DeadReckoningError {
    /// Error for an out-of-range nanosecond component.
    /// This variant is returned when a timestamp's nanoseconds are not below one second.
    InvalidNanoseconds(&'static str),
    /// Error for a non-finite timestamp.
    /// This variant is returned when a floating-point time is NaN or infinite.
    NonFiniteTimestamp(&'static str),
}

impl fmt::Display for DeadReckoningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadReckoningError::InvalidNanoseconds(msg) => {
                write!(f, "Invalid nanoseconds: {}", msg)
            }
            DeadReckoningError::NonFiniteTimestamp(msg) => {
                write!(f, "Non-finite timestamp: {}", msg)
            }
        }
    }
}

impl core::error::Error for DeadReckoningError {}
