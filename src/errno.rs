//! Kernel error codes.
//!
//! The small fixed set of errors that user-facing entry points can return.
//! Internal invariant violations are never expressed as one of these; they
//! go through `kpanic!` instead, since they indicate a scheduler bug.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Malformed request parameters (e.g. zero cores wanted).
    Inval,
    /// No pid matches the request.
    BadProc,
    /// Operation targets a dying process.
    Dying,
    /// Process is in a state the operation does not accept right now.
    Busy,
    /// Not enough free cores to meet the request's minimum.
    NoFreeEnv,
    /// PCB arena is full.
    TooManyProcs,
}

impl Error {
    pub const fn as_str(self) -> &'static str {
        match self {
            Error::Inval => "invalid argument",
            Error::BadProc => "no such process",
            Error::Dying => "process is dying",
            Error::Busy => "process is busy",
            Error::NoFreeEnv => "no free cores",
            Error::TooManyProcs => "process table full",
        }
    }

    /// Numeric code for the syscall boundary.
    pub const fn code(self) -> u64 {
        match self {
            Error::Inval => 1,
            Error::BadProc => 2,
            Error::Dying => 3,
            Error::Busy => 4,
            Error::NoFreeEnv => 5,
            Error::TooManyProcs => 6,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type KResult<T> = Result<T, Error>;
