//! Versioned fabric state snapshots for save/restore and replay fixtures.

use crate::{AckState, FabricConfig};

/// Stable snapshot schema identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Initial schema.
    V1 = 1,
}

impl SnapshotVersion {
    /// Converts a wire value to a known snapshot version.
    #[must_use]
    pub const fn from_u16(version: u16) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

/// Runtime state of a fabric. The instruction image is not included; it is
/// supplied again on restore.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricSnapshot {
    /// Schema version.
    pub version: SnapshotVersion,
    /// Configuration the fabric was built with.
    pub config: FabricConfig,
    /// Clock edges simulated so far.
    pub cycle: u64,
    /// Data-store contents in index order.
    pub data: Box<[u32]>,
    /// Output register value.
    pub output: u32,
    /// Instruction-segment ack delay state.
    pub instruction_ack: AckState,
    /// Data-segment ack delay state.
    pub data_ack: AckState,
    /// Latched instruction read data.
    pub instruction_read: u32,
    /// Latched data read data.
    pub data_read: u32,
}
