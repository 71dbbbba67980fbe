//! Fixed one-cycle acknowledgment delay shared by both bus segments.

/// Cycles between `cycle-active` and the matching `ack`.
pub const ACK_LATENCY_CYCLES: u64 = 1;

/// Observable state of a segment's acknowledgment delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AckState {
    /// No acknowledgment will be driven this cycle.
    #[default]
    Idle,
    /// A request was latched at the last edge; `ack` is asserted this cycle.
    AckPending,
}

/// One-cycle delay register from a segment's `cycle-active` to its `ack`.
///
/// The register samples `cycle-active` at every clock edge and drives it
/// back as `ack` for the following cycle. It never inspects the address,
/// destination or direction of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AckDelay {
    state: AckState,
}

impl AckDelay {
    /// Builds a delay register already in `state`.
    #[must_use]
    pub const fn with_state(state: AckState) -> Self {
        Self { state }
    }

    /// Current state.
    #[must_use]
    pub const fn state(self) -> AckState {
        self.state
    }

    /// `ack` as seen by the master during the current cycle.
    #[must_use]
    pub const fn ack(self) -> bool {
        matches!(self.state, AckState::AckPending)
    }

    /// Clock edge: latch this cycle's `cycle-active` for the next cycle.
    ///
    /// A pending ack and a new request in the same cycle re-enter
    /// [`AckState::AckPending`], so back-to-back requests each get their own
    /// ack one cycle later.
    #[allow(clippy::missing_const_for_fn)]
    pub fn clock(&mut self, cycle_active: bool) {
        self.state = if cycle_active {
            AckState::AckPending
        } else {
            AckState::Idle
        };
    }

    /// Returns to [`AckState::Idle`].
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.state = AckState::Idle;
    }
}
