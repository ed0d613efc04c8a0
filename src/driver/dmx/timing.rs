//! dmx output configuration
//!
//! The DMX512 minimums are kept apart from the operating margins. A preset
//! picks the margins, the config file may override single phases, and
//! `DmxConfig::validate` refuses anything below the minimums.

use std::time::Duration;
use crate::common::error::{EngineError, ErrorCode};
use crate::common::setting;
use super::prelude::*;

// DMX512 minimum break (space) length
pub const DMX_BREAK_MIN: Duration = Duration::from_micros(92);
// DMX512 minimum mark after break
pub const DMX_MAB_MIN: Duration = Duration::from_micros(12);
// one bit at 250 kbit/s
pub const DMX_BIT_TIME: Duration = Duration::from_micros(1_000_000 / DMX_BAUDRATE as u64);

/// How each byte reaches the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// bytes are handed to the uart, completion comes back as an event
    Uart,
    /// every bit is toggled on the gpio from the timer
    BitBang,
}

/// How the break is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakMethod {
    /// pull the pin low in gpio mode
    Gpio,
    /// ask the uart for a break condition
    Uart,
}

/// Phase durations of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxTiming {
    pub settle: Duration,
    pub mark_before_break: Duration,
    pub break_time: Duration,
    pub mark_after_break: Duration,
    // inter byte mark, zero means back to back bytes
    pub mark: Duration,
    pub bit_time: Duration,
}

impl DmxTiming {
    /// Margins for a uart driven output.
    pub const fn standard() -> Self {
        DmxTiming {
            settle: Duration::from_millis(1),
            mark_before_break: Duration::from_micros(100),
            break_time: Duration::from_micros(176),
            mark_after_break: Duration::from_micros(16),
            mark: Duration::ZERO,
            bit_time: DMX_BIT_TIME,
        }
    }

    /// Millisecond phases for timers without microsecond resolution.
    pub const fn slow() -> Self {
        DmxTiming {
            settle: Duration::from_millis(10),
            mark_before_break: Duration::from_millis(10),
            break_time: Duration::from_millis(10),
            mark_after_break: Duration::from_millis(1),
            mark: Duration::ZERO,
            bit_time: DMX_BIT_TIME,
        }
    }
}

impl Default for DmxTiming {
    fn default() -> Self {
        DmxTiming::standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxConfig {
    pub output: OutputKind,
    pub break_method: BreakMethod,
    pub timing: DmxTiming,
    pub stop_bits: u8,
    // data slots sent after the start code
    pub slot_count: DmxSlot,
    pub start_code: DmxValue,
}

impl Default for DmxConfig {
    fn default() -> Self {
        DmxConfig {
            output: OutputKind::Uart,
            break_method: BreakMethod::Gpio,
            timing: DmxTiming::standard(),
            stop_bits: 2,
            slot_count: DMX_CHANNEL_LEN as DmxSlot,
            start_code: DMX_START_CODE,
        }
    }
}

impl DmxConfig {
    pub fn from_settings(dmx: &setting::Dmx) -> Result<Self, EngineError> {
        let output = match dmx.output.as_str() {
            "uart" => OutputKind::Uart,
            "bitbang" => OutputKind::BitBang,
            other => return Err(config_error(format!("unknown dmx output: {}", other))),
        };
        let break_method = match dmx.break_method.as_str() {
            "gpio" => BreakMethod::Gpio,
            "uart" => BreakMethod::Uart,
            other => return Err(config_error(format!("unknown break method: {}", other))),
        };
        let mut timing = match dmx.preset.as_str() {
            "standard" => DmxTiming::standard(),
            "slow" => DmxTiming::slow(),
            other => return Err(config_error(format!("unknown timing preset: {}", other))),
        };

        let us = Duration::from_micros;
        if let Some(v) = dmx.settle_us { timing.settle = us(v); }
        if let Some(v) = dmx.mark_before_break_us { timing.mark_before_break = us(v); }
        if let Some(v) = dmx.break_us { timing.break_time = us(v); }
        if let Some(v) = dmx.mark_after_break_us { timing.mark_after_break = us(v); }
        if let Some(v) = dmx.mark_us { timing.mark = us(v); }

        let config = DmxConfig {
            output,
            break_method,
            timing,
            stop_bits: dmx.stop_bits,
            slot_count: dmx.slot_count,
            start_code: dmx.start_code,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.timing.break_time < DMX_BREAK_MIN {
            return Err(timing_error(format!("break {:?} is below {:?}", self.timing.break_time, DMX_BREAK_MIN)));
        }
        if self.timing.mark_after_break < DMX_MAB_MIN {
            return Err(timing_error(format!("mark after break {:?} is below {:?}", self.timing.mark_after_break, DMX_MAB_MIN)));
        }
        if self.timing.bit_time.is_zero() {
            return Err(timing_error("bit time is zero"));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(config_error(format!("stop bits must be 1 or 2, got {}", self.stop_bits)));
        }
        if self.slot_count == 0 || self.slot_count as usize > DMX_CHANNEL_LEN {
            return Err(config_error(format!("slot count must be 1..=512, got {}", self.slot_count)));
        }
        if self.output == OutputKind::BitBang && self.break_method == BreakMethod::Uart {
            return Err(config_error("bit banged output has no uart to send a break"));
        }
        Ok(())
    }

    /// wire time of one byte: start bit, 8 data bits, stop bits
    pub fn byte_time(&self) -> Duration {
        self.timing.bit_time * (9 + self.stop_bits as u32)
    }

    /// length of one full frame, break to break
    pub fn frame_time(&self) -> Duration {
        let t = &self.timing;
        let bytes = self.slot_count as u32 + 1;
        t.mark_before_break + t.break_time + t.mark_after_break
            + self.byte_time() * bytes
            + t.mark * bytes
    }
}

fn config_error(msg: impl Into<String>) -> EngineError {
    EngineError::new(ErrorCode::ConfigError, msg)
}

fn timing_error(msg: impl Into<String>) -> EngineError {
    EngineError::new(ErrorCode::TimingError, msg)
}
