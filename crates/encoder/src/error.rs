//! Errors from the encoding pipeline.
//!
//! Contract violations (a missing ordering relation, a malformed model
//! composition) are bugs and panic immediately rather than appearing
//! here; this enum covers the outcomes a caller is expected to handle.

use std::fmt;

use membound_logic::BoundsError;

#[derive(Debug)]
pub enum EncodeError {
    /// The caller's [`crate::cancel::CancelToken`] fired between phases.
    /// No partial justification is returned.
    Cancelled,
    /// Bound derivation produced an inconsistent bound.
    Bounds(BoundsError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Cancelled => write!(f, "encoding cancelled"),
            EncodeError::Bounds(e) => write!(f, "bound derivation failed: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Cancelled => None,
            EncodeError::Bounds(e) => Some(e),
        }
    }
}

impl From<BoundsError> for EncodeError {
    fn from(e: BoundsError) -> Self {
        EncodeError::Bounds(e)
    }
}
