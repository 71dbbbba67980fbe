/// Memory-mapped general-purpose output register.
///
/// Written as a whole word by the data segment; byte-select does not apply.
/// Its value is never returned over the bus, only to external observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutputRegister {
    value: u32,
}

impl OutputRegister {
    /// Builds a register holding `value`.
    #[must_use]
    pub const fn with_value(value: u32) -> Self {
        Self { value }
    }

    /// Current register contents.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.value
    }

    /// Level of the external indicator line, driven by bit 0.
    #[must_use]
    pub const fn indicator_level(self) -> bool {
        self.value & 1 == 1
    }

    /// Clock edge: replace the whole register.
    #[allow(clippy::missing_const_for_fn)]
    pub fn latch(&mut self, value: u32) {
        self.value = value;
    }
}
