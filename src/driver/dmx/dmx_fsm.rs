//! dmx transmission state machine
//!
//! Pure transition table: `on_event` maps (state, event) to the next state and
//! `action` tells the engine what the state asks of the hardware. Nothing in
//! here touches a pin, a uart or a timer.
//!
//! ```text
//! Idle -> Init -> MarkBeforeBreak -> Break -> MarkAfterBreak -> TxStartCode
//!      -> [TxStartMark] -> TxByte(1) -> [TxMark] -> ... -> TxByte(n) -> [TxMark]
//!      -> Update -> MarkBeforeBreak ...
//! ```

use std::time::Duration;
use super::prelude::*;
use super::timing::{DmxConfig, OutputKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmxState {
    Idle,
    Init,
    MarkBeforeBreak,
    Break,
    MarkAfterBreak,
    TxStartCode,
    TxStartMark,
    TxByte,
    TxMark,
    Update,
}

/// Something the hardware reports back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmxEvent {
    TimerExpired,
    ByteTransmitted,
}

/// What a state needs done when it is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// initialise the output line, then wait for it to settle
    Setup(Duration),
    /// drive the line in gpio mode and hold it
    Drive { level: Level, hold: Duration },
    /// put the line in break and hold it
    Break(Duration),
    /// hand the slot's byte to the uart
    SendByte(DmxSlot),
    /// put one frame bit of the slot's byte on the gpio and hold it
    SendBit { slot: DmxSlot, bit: u8, hold: Duration },
    /// keep the line as is for a while
    Wait(Duration),
    /// frame finished, recompute the fades
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxFsm {
    pub state: DmxState,
    // slot being sent, 0 is the start code
    pub slot: DmxSlot,
    // bit within the byte when bit banging, 0 is the start bit
    pub bit: u8,
}

impl Default for DmxFsm {
    fn default() -> Self {
        DmxFsm::idle()
    }
}

impl DmxFsm {
    pub const fn idle() -> Self {
        DmxFsm { state: DmxState::Idle, slot: 0, bit: 0 }
    }

    pub const fn start() -> Self {
        DmxFsm { state: DmxState::Init, slot: 0, bit: 0 }
    }

    const fn enter(state: DmxState, slot: DmxSlot) -> Self {
        DmxFsm { state, slot, bit: 0 }
    }

    pub fn is_idle(&self) -> bool {
        self.state == DmxState::Idle
    }

    /// Next state for `event`, `None` when the state does not take it.
    pub fn on_event(self, event: DmxEvent, config: &DmxConfig) -> Option<DmxFsm> {
        use DmxEvent::*;
        use DmxState::*;

        match (self.state, event) {
            (Init, TimerExpired) => Some(DmxFsm::enter(MarkBeforeBreak, 0)),
            (MarkBeforeBreak, TimerExpired) => Some(DmxFsm::enter(Break, 0)),
            (Break, TimerExpired) => Some(DmxFsm::enter(MarkAfterBreak, 0)),
            (MarkAfterBreak, TimerExpired) => Some(DmxFsm::enter(TxStartCode, 0)),

            (TxStartCode | TxByte, ByteTransmitted) if config.output == OutputKind::Uart => {
                Some(self.byte_done(config))
            }
            (TxStartCode | TxByte, TimerExpired) if config.output == OutputKind::BitBang => {
                if self.bit < last_bit(config) {
                    Some(DmxFsm { bit: self.bit + 1, ..self })
                } else {
                    Some(self.byte_done(config))
                }
            }

            (TxStartMark | TxMark, TimerExpired) => Some(self.next_slot(config)),

            _ => None,
        }
    }

    /// The work `self.state` asks for on entry.
    pub fn action(&self, config: &DmxConfig) -> Action {
        let timing = &config.timing;
        match self.state {
            DmxState::Idle => Action::None,
            DmxState::Init => Action::Setup(timing.settle),
            DmxState::MarkBeforeBreak => Action::Drive { level: Level::High, hold: timing.mark_before_break },
            DmxState::Break => Action::Break(timing.break_time),
            DmxState::MarkAfterBreak => Action::Drive { level: Level::High, hold: timing.mark_after_break },
            DmxState::TxStartCode | DmxState::TxByte => match config.output {
                OutputKind::Uart => Action::SendByte(self.slot),
                OutputKind::BitBang => Action::SendBit { slot: self.slot, bit: self.bit, hold: timing.bit_time },
            },
            DmxState::TxStartMark | DmxState::TxMark => Action::Wait(timing.mark),
            DmxState::Update => Action::Update,
        }
    }

    /// Leave `Update`, the next frame starts with its mark before break.
    pub fn frame_done(self) -> DmxFsm {
        debug_assert_eq!(self.state, DmxState::Update);
        DmxFsm::enter(DmxState::MarkBeforeBreak, 0)
    }

    /// (state, event) -> (state, action) in one call.
    pub fn step(self, event: DmxEvent, config: &DmxConfig) -> Option<(DmxFsm, Action)> {
        let next = self.on_event(event, config)?;
        Some((next, next.action(config)))
    }

    fn byte_done(self, config: &DmxConfig) -> DmxFsm {
        if config.timing.mark.is_zero() {
            return self.next_slot(config);
        }
        let mark = if self.state == DmxState::TxStartCode { DmxState::TxStartMark } else { DmxState::TxMark };
        DmxFsm::enter(mark, self.slot)
    }

    fn next_slot(self, config: &DmxConfig) -> DmxFsm {
        if self.slot >= config.slot_count {
            DmxFsm::enter(DmxState::Update, self.slot)
        } else {
            DmxFsm::enter(DmxState::TxByte, self.slot + 1)
        }
    }
}

// index of the last stop bit
fn last_bit(config: &DmxConfig) -> u8 {
    8 + config.stop_bits
}

/// Level of frame bit `bit` of `byte`: start bit, 8 data bits LSB first, stop bits.
pub fn frame_bit(byte: DmxValue, bit: u8) -> Level {
    match bit {
        0 => Level::Low,
        1..=8 => Level::from((byte >> (bit - 1)) & 1 == 1),
        _ => Level::High,
    }
}
