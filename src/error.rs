//! Error handling primitives for the IIS3DWB driver.

use core::fmt;

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus interface.
    Interface(E),
    /// `WHO_AM_I` did not return the IIS3DWB identity.
    IdentityMismatch {
        /// Value actually read back from the device.
        found: u8,
    },
    /// The session has not reached the state this operation needs.
    NotReady,
    /// The session was closed and its bus released.
    SessionClosed,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface(err) => write!(f, "bus transfer failed: {err:?}"),
            Self::IdentityMismatch { found } => write!(
                f,
                "unexpected WHO_AM_I value {found:#04x} (expected {:#04x})",
                crate::registers::WHO_AM_I_VALUE
            ),
            Self::NotReady => f.write_str("operation not allowed in the current session state"),
            Self::SessionClosed => f.write_str("session is closed"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
