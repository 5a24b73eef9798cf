use super::cache::eligibility::IneligibleReason;
use super::types::ChipId;

/// Errors surfaced by the simulation core
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A definition references a pin or instance that does not exist, or is otherwise malformed
    Structural { chip: ChipId, message: String },
    /// No definition registered under this ID
    UnknownChip(ChipId),
    /// Truth table requested for a chip exceeding the cache width limits
    CacheBudgetExceeded { chip: ChipId, reason: IneligibleReason },
    /// Truth table requested for a chip whose outputs depend on more than its inputs
    Uncacheable { chip: ChipId, reason: String },
    /// An edit addressed a missing instance or the wrong kind of chip
    InvalidEdit(String),
}

impl SimError {
    pub(crate) fn structural(chip: &ChipId, message: impl Into<String>) -> Self {
        SimError::Structural {
            chip: chip.clone(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::Structural { chip, message } => {
                write!(f, "Structural error in '{}': {}", chip, message)
            }
            SimError::UnknownChip(chip) => write!(f, "Chip '{}' not found", chip),
            SimError::CacheBudgetExceeded { chip, reason } => {
                write!(f, "Cache budget exceeded for '{}': {}", chip, reason)
            }
            SimError::Uncacheable { chip, reason } => {
                write!(f, "Chip '{}' cannot be cached: {}", chip, reason)
            }
            SimError::InvalidEdit(msg) => write!(f, "Invalid edit: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}
