//! uart port over a usb dmx adapter
//! every byte is written straight through, so sends complete synchronously

use dmx::{self, DmxTransmitter};
use crate::common::error::DriverError;
use crate::{error, info};
use super::prelude::*;
use super::traits::{TxStatus, UartPort};

const LOG_TAG: &str = "dmx_uart.rs | dmx serial uart";

pub struct DmxSerialUart<D> {
    port: D,
    // failures since the last successful write, logged once per burst
    failures: u32,
}

impl<D: DmxTransmitter> DmxSerialUart<D> {
    pub fn new(port: D) -> Self {
        DmxSerialUart { port, failures: 0 }
    }

    fn report(&mut self, what: &str, e: impl std::fmt::Debug) {
        if self.failures == 0 {
            error!(LOG_TAG, "cannot {}, err: {:?}", what, e);
        }
        self.failures = self.failures.saturating_add(1);
    }

    fn recovered(&mut self) {
        if self.failures > 0 {
            info!(LOG_TAG, "port back after {} failed writes", self.failures);
            self.failures = 0;
        }
    }
}

impl<D: DmxTransmitter> UartPort for DmxSerialUart<D> {
    fn send_byte(&mut self, byte: DmxValue) -> TxStatus {
        match self.port.send_raw_data(&[byte]) {
            Ok(_) => self.recovered(),
            Err(e) => self.report("send byte", e),
        }
        TxStatus::Done
    }

    fn break_request(&mut self) {
        match self.port.send_break() {
            Ok(_) => self.recovered(),
            Err(e) => self.report("send break", e),
        }
    }
}

/// Open the adapter at `port`.
pub fn open_serial(port: &str) -> Result<DmxSerialUart<impl DmxTransmitter + Send>, DriverError> {
    let dmx_port = dmx::open_serial(port)
        .map_err(|e| DriverError(format!("cannot open dmx port, port: {}, err: {}", port, e)))?;
    info!(LOG_TAG, "dmx port opened: {}", port);
    Ok(DmxSerialUart::new(dmx_port))
}
