use std::fmt;

use thiserror::Error;

/// Identifies one of the two storage units in construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StoreKind {
    /// Instruction store on the instruction segment.
    Instruction,
    /// Data store on the data segment.
    Data,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instruction => f.write_str("instruction"),
            Self::Data => f.write_str("data"),
        }
    }
}

/// Construction-time failures. A running fabric never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FabricError {
    /// Firmware image does not fit in the instruction store.
    #[error("firmware image has {words} words but the instruction store holds {depth}")]
    ImageTooLarge {
        /// Words supplied by the loader.
        words: usize,
        /// Configured instruction-store depth.
        depth: usize,
    },
    /// A store was configured with zero words.
    #[error("{store} store depth must be non-zero")]
    ZeroDepth {
        /// Offending store.
        store: StoreKind,
    },
    /// A store depth cannot be indexed by wrapping the word address.
    #[error("{store} store depth {depth} is not a power of two")]
    DepthNotPowerOfTwo {
        /// Offending store.
        store: StoreKind,
        /// Configured depth.
        depth: usize,
    },
    /// Address width leaves no room for the selector or exceeds a word.
    #[error("address width {width} is outside the supported 8..=32 bits")]
    AddressWidthOutOfRange {
        /// Configured width in bits.
        width: u8,
    },
}

/// Failures turning a raw firmware byte stream into words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ImageError {
    /// Byte stream length is not a whole number of 32-bit words.
    #[error("firmware image is {len} bytes, not a multiple of 4")]
    UnalignedLength {
        /// Length of the byte stream.
        len: usize,
    },
}

/// Failures restoring a fabric from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SnapshotError {
    /// Data-store contents do not match the configured depth.
    #[error("snapshot data store has {actual} words, configuration expects {expected}")]
    DataLengthMismatch {
        /// Depth from the snapshot configuration.
        expected: usize,
        /// Words present in the snapshot.
        actual: usize,
    },
    /// Configuration or image in the snapshot is invalid.
    #[error(transparent)]
    Fabric(#[from] FabricError),
}
