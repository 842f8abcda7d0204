//! Identity and launch time of the owning process.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;
use uuid::Uuid;

use crate::{DomainError, DomainResult};

/// Width of the stored hex encoding.
pub const PROCESS_ID_HEX_WIDTH: usize = 8;

// ============================================================================
// Process Identifier
// ============================================================================

/// Random per-process identity.
///
/// Unlike an OS pid this is not recycled across restarts, so it can tell
/// rows written by this process apart from rows left by a previous one.
/// Stored as a fixed-width 8 character lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ProcessIdentifier(u32);

impl ProcessIdentifier {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Generates a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_fields().0)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the fixed-width hex encoding used for storage.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:0width$x}", self.0, width = PROCESS_ID_HEX_WIDTH)
    }

    /// Parses the fixed-width hex encoding.
    pub fn from_hex(hex: &str) -> DomainResult<Self> {
        if hex.len() != PROCESS_ID_HEX_WIDTH || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DomainError::invalid(
                "process_id",
                hex,
                "8 hex characters",
            ));
        }
        u32::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|e| DomainError::ParseError {
                field: "process_id".to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for ProcessIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<ProcessIdentifier> for String {
    fn from(id: ProcessIdentifier) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for ProcessIdentifier {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

// ============================================================================
// Process Metadata
// ============================================================================

/// Facts about the running process that sessions are classified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMetadata {
    /// Identity stamped onto every session row.
    pub identifier: ProcessIdentifier,
    /// When the process launched, if the OS could tell us.
    pub start_time: Option<DateTime<Utc>>,
}

static CURRENT: OnceLock<ProcessMetadata> = OnceLock::new();

impl ProcessMetadata {
    pub fn new(identifier: ProcessIdentifier, start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            identifier,
            start_time,
        }
    }

    /// Metadata for this process, computed once and cached.
    pub fn current() -> Self {
        *CURRENT.get_or_init(|| {
            let metadata = Self::new(ProcessIdentifier::random(), read_process_start_time());
            debug!(
                process_id = %metadata.identifier,
                start_time = ?metadata.start_time,
                "Process metadata resolved"
            );
            metadata
        })
    }
}

/// Reads the process launch time via sysinfo.
///
/// sysinfo reports whole seconds; a zero value means "unknown" on some
/// platforms and is treated as unavailable.
fn read_process_start_time() -> Option<DateTime<Utc>> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_all();

    let secs = system.process(pid)?.start_time();
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}
