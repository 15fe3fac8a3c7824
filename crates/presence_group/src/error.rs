//! Group error types

use crate::key::ChildKey;
use thiserror::Error;

/// Errors surfaced by group reconciliation.
///
/// These are caller configuration errors; timing anomalies (stale
/// completions, late timers) are discarded silently by the machines and
/// never reach this type.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("duplicate child key in one render: {0}")]
    DuplicateKey(ChildKey),
}

pub type Result<T> = std::result::Result<T, GroupError>;
