use crate::{Error, Result};
use std::fmt;

// Raw status format in the transaction store (i64):
// -1       - aborted
// [0, MAX] - commit timestamp
// others   - invalid

/// Raw representation of [`TransactionStatus::Aborted`].
pub const ABORTED_RAW: i64 = -1;

/// A start or commit timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);
}

impl From<u64> for Timestamp {
    fn from(ts: u64) -> Self {
        Self(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The final outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// The transaction committed at the given timestamp.
    Committed(Timestamp),

    /// The transaction will never commit.
    Aborted,
}

impl TransactionStatus {
    /// Returns the commit timestamp, or `None` if the transaction aborted.
    pub const fn commit_ts(self) -> Option<Timestamp> {
        match self {
            Self::Committed(ts) => Some(ts),
            Self::Aborted => None,
        }
    }

    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub const fn is_aborted(self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Decodes a status stored as a raw integer.
    pub fn from_raw(raw: i64) -> Result<Self> {
        if raw == ABORTED_RAW {
            return Ok(Self::Aborted);
        }
        u64::try_from(raw)
            .map(|ts| Self::Committed(Timestamp(ts)))
            .map_err(|_| Error::InvalidRawStatus(raw))
    }

    /// Encodes the status as a raw integer.
    ///
    /// Fails if the commit timestamp does not fit in an `i64`.
    pub fn to_raw(self) -> Result<i64> {
        match self {
            Self::Committed(ts) => i64::try_from(ts.0).map_err(|_| Error::TimestampOutOfRange(ts)),
            Self::Aborted => Ok(ABORTED_RAW),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed(ts) => write!(f, "committed at {ts}"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}
