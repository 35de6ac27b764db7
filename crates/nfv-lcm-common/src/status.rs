//! Normalized operation status and raw-token lookup tables.

use crate::error::{LcmError, LcmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized completion status of a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationStatus {
    Success,
    Failed,
    Pending,
}

/// Statuses after which polling stops.
pub const FINAL_STATES: &[OperationStatus] = &[OperationStatus::Success, OperationStatus::Failed];

impl OperationStatus {
    /// Returns true for `SUCCESS` and `FAILED`.
    pub const fn is_final(&self) -> bool {
        matches!(self, OperationStatus::Success | OperationStatus::Failed)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "SUCCESS",
            OperationStatus::Failed => "FAILED",
            OperationStatus::Pending => "PENDING",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = LcmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(OperationStatus::Success),
            "FAILED" => Ok(OperationStatus::Failed),
            "PENDING" => Ok(OperationStatus::Pending),
            _ => Err(LcmError::ambiguous_state("status", s)),
        }
    }
}

/// Static mapping from a plane's native status tokens to [`OperationStatus`].
///
/// Tokens are matched case-insensitively. Exact entries win over prefix
/// families; a token matching neither is an `AmbiguousState` error.
///
/// # Example
///
/// ```
/// use nfv_lcm_common::{OperationStatus, StatusTable};
///
/// const TABLE: StatusTable = StatusTable::new(
///     "vim",
///     &[("active", OperationStatus::Success), ("error", OperationStatus::Failed)],
///     &[("pending_", OperationStatus::Pending)],
/// );
///
/// assert_eq!(TABLE.normalize("ACTIVE").unwrap(), OperationStatus::Success);
/// assert_eq!(TABLE.normalize("pending_update").unwrap(), OperationStatus::Pending);
/// assert!(TABLE.normalize("rebooting").is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatusTable {
    plane: &'static str,
    exact: &'static [(&'static str, OperationStatus)],
    prefixes: &'static [(&'static str, OperationStatus)],
}

impl StatusTable {
    /// Creates a table. Entries must be lowercase.
    pub const fn new(
        plane: &'static str,
        exact: &'static [(&'static str, OperationStatus)],
        prefixes: &'static [(&'static str, OperationStatus)],
    ) -> Self {
        Self {
            plane,
            exact,
            prefixes,
        }
    }

    pub fn plane(&self) -> &'static str {
        self.plane
    }

    /// Maps a raw token, failing loudly on anything the table does not list.
    pub fn normalize(&self, raw: &str) -> LcmResult<OperationStatus> {
        let token = raw.trim().to_ascii_lowercase();

        if let Some((_, status)) = self.exact.iter().find(|(t, _)| *t == token) {
            return Ok(*status);
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| token.starts_with(prefix))
            .map(|(_, status)| *status)
            .ok_or_else(|| LcmError::ambiguous_state(self.plane, raw))
    }
}
