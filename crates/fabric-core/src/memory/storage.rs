//! Word-addressable storage units and their read/write ports.

use crate::{merge_lanes, word_index, ByteSelect, FabricError, StoreKind};

/// Default depth in words of both storage units (4 KiB each).
pub const DEFAULT_STORE_DEPTH: usize = 1024;

/// Inputs to the data store's write port for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WritePort {
    /// Byte address; lane bits are ignored.
    pub addr: u32,
    /// Word to merge into the addressed entry.
    pub data: u32,
    /// Lanes of `data` to commit.
    pub select: ByteSelect,
    /// Port enable; when clear the port has no effect.
    pub enable: bool,
}

impl WritePort {
    /// A write port with nothing driven.
    pub const DISABLED: Self = Self {
        addr: 0,
        data: 0,
        select: ByteSelect::NONE,
        enable: false,
    };

    /// Returns `true` when this port would modify storage.
    #[must_use]
    pub const fn is_effective(&self) -> bool {
        self.enable && !self.select.is_empty()
    }
}

/// Fixed-depth word array shared by both storage units.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WordArray {
    words: Box<[u32]>,
}

impl WordArray {
    fn zeroed(depth: usize) -> Self {
        Self {
            words: vec![0; depth].into_boxed_slice(),
        }
    }

    fn read(&self, addr: u32) -> u32 {
        self.words[word_index(addr, self.words.len())]
    }
}

/// Checks that a store depth is usable as a wrap-around word array.
///
/// # Errors
///
/// Returns [`FabricError::ZeroDepth`] or [`FabricError::DepthNotPowerOfTwo`].
pub const fn validate_depth(store: StoreKind, depth: usize) -> Result<(), FabricError> {
    if depth == 0 {
        Err(FabricError::ZeroDepth { store })
    } else if !depth.is_power_of_two() {
        Err(FabricError::DepthNotPowerOfTwo { store, depth })
    } else {
        Ok(())
    }
}

/// Read-only store holding the firmware image fetched by the instruction
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionStore {
    array: WordArray,
}

impl InstructionStore {
    /// Builds the store from a firmware image, zero-padding up to `depth`.
    ///
    /// # Errors
    ///
    /// Returns [`FabricError::ImageTooLarge`] when the image holds more words
    /// than the store, or a depth error when `depth` is not a non-zero power
    /// of two.
    pub fn from_image(image: &[u32], depth: usize) -> Result<Self, FabricError> {
        validate_depth(StoreKind::Instruction, depth)?;
        if image.len() > depth {
            return Err(FabricError::ImageTooLarge {
                words: image.len(),
                depth,
            });
        }

        let mut array = WordArray::zeroed(depth);
        array.words[..image.len()].copy_from_slice(image);
        Ok(Self { array })
    }

    /// Read port: the word at `addr`, wrapped to the store depth.
    #[must_use]
    pub fn read(&self, addr: u32) -> u32 {
        self.array.read(addr)
    }

    /// Store depth in words.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.array.words.len()
    }

    /// Full contents in index order.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.array.words
    }
}

/// Read-write store behind the `0x1xxx_xxxx` data-segment window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStore {
    array: WordArray,
}

impl DataStore {
    /// Builds a zero-filled store of `depth` words.
    ///
    /// # Errors
    ///
    /// Returns a depth error when `depth` is not a non-zero power of two.
    pub fn zeroed(depth: usize) -> Result<Self, FabricError> {
        validate_depth(StoreKind::Data, depth)?;
        Ok(Self {
            array: WordArray::zeroed(depth),
        })
    }

    /// Builds a store from existing contents, e.g. a restored snapshot.
    ///
    /// # Errors
    ///
    /// Returns a depth error when the length is not a non-zero power of two.
    pub fn from_words(words: Box<[u32]>) -> Result<Self, FabricError> {
        validate_depth(StoreKind::Data, words.len())?;
        Ok(Self {
            array: WordArray { words },
        })
    }

    /// Read port: the word at `addr`, wrapped to the store depth.
    #[must_use]
    pub fn read(&self, addr: u32) -> u32 {
        self.array.read(addr)
    }

    /// Write port: merges the selected lanes of `port.data` into the
    /// addressed word when `port.enable` is set.
    ///
    /// Returns the new word when storage changed lanes, `None` otherwise. The
    /// fabric applies this only at the clock edge, after every same-cycle read
    /// has been sampled, so the port is not transparent.
    pub fn write(&mut self, port: &WritePort) -> Option<u32> {
        if !port.is_effective() {
            return None;
        }
        let index = word_index(port.addr, self.array.words.len());
        let merged = merge_lanes(self.array.words[index], port.data, port.select);
        self.array.words[index] = merged;
        Some(merged)
    }

    /// Store depth in words.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.array.words.len()
    }

    /// Full contents in index order.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.array.words
    }

    /// Zero-fills every word.
    pub fn clear(&mut self) {
        self.array.words.fill(0);
    }
}
