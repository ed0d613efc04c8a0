//! hardware seams of the dmx engine
//! the engine only talks to the line through these traits

use super::prelude::*;

/// Function of the output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// plain push-pull gpio, driven by `write`
    Output,
    /// alternate function, the uart owns the line
    Uart,
}

/// The dmx output pin.
pub trait OutputPin {
    fn configure(&mut self, mode: PinMode);

    fn write(&mut self, level: Level);

    fn read(&self) -> Level;
}

/// Outcome of handing a byte to the uart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// on the wire already, no completion event will follow
    Done,
    /// a `ByteTransmitted` event will be delivered once the byte is out
    Pending,
}

/// The transmit side of a uart running at 250 kbit/s, 8N2.
pub trait UartPort {
    fn send_byte(&mut self, byte: DmxValue) -> TxStatus;

    /// hold the line in a break condition
    fn break_request(&mut self);
}

impl<U: UartPort + ?Sized> UartPort for Box<U> {
    fn send_byte(&mut self, byte: DmxValue) -> TxStatus {
        (**self).send_byte(byte)
    }

    fn break_request(&mut self) {
        (**self).break_request()
    }
}

/// Pin for hosts without gpio, remembers the last written level.
#[derive(Debug)]
pub struct NullPin {
    level: Level,
}

impl Default for NullPin {
    fn default() -> Self {
        NullPin { level: Level::High }
    }
}

impl OutputPin for NullPin {
    fn configure(&mut self, _mode: PinMode) {}

    fn write(&mut self, level: Level) {
        self.level = level;
    }

    fn read(&self) -> Level {
        self.level
    }
}

/// Uart that drops every byte, used for bit banged output and dummy mode.
#[derive(Debug, Default)]
pub struct NullUart;

impl UartPort for NullUart {
    fn send_byte(&mut self, _byte: DmxValue) -> TxStatus {
        TxStatus::Done
    }

    fn break_request(&mut self) {}
}
