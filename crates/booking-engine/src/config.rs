//! Engine-wide policy knobs.
//!
//! Every field has a default so hosts can deserialize partial documents.

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictOptions;
use crate::recurrence::ExpansionLimits;
use crate::slots::SlotOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Buffer and granularity shared by slot generation and conflict checks.
    pub slots: SlotOptions,
    /// Minimum minutes between "now" and the earliest bookable start.
    pub advance_notice_minutes: u32,
    pub conflict: ConflictOptions,
    pub expansion: ExpansionLimits,
}
