//! dmx engine
//!
//! Bundles the state machine, the channel store and the hardware it drives.
//! `handle` is the single event entry point: it runs the transition, then the
//! action of the new state, and keeps going while the hardware answers
//! synchronously. The engine re-arms itself every frame and only goes idle on
//! a stop request, checked when the next frame would begin.

use std::sync::PoisonError;
use std::time::Duration;
use crate::common::error::EngineError;
use crate::driver::timer::OneshotTimer;
use crate::{info, trace};
use super::channel_store::SharedChannels;
use super::dmx_fsm::{frame_bit, Action, DmxEvent, DmxFsm, DmxState};
use super::prelude::*;
use super::timing::{BreakMethod, DmxConfig};
use super::traits::{OutputPin, PinMode, TxStatus, UartPort};

const LOG_TAG: &str = "dmx_engine.rs | dmx engine";

pub struct DmxEngine<T, P, U> {
    config: DmxConfig,
    fsm: DmxFsm,
    timer: T,
    pin: P,
    uart: U,
    channels: SharedChannels,
    // last mode set on the pin, None forces a configure
    pin_mode: Option<PinMode>,
    // byte being bit banged
    tx_byte: DmxValue,
    // wire time of the running frame
    frame_us: u64,
    // sub millisecond rest carried to the next fade update
    fade_carry_us: u64,
    last_frame: Duration,
    frames: u64,
    stop_requested: bool,
}

impl<T, P, U> DmxEngine<T, P, U>
where
    T: OneshotTimer,
    P: OutputPin,
    U: UartPort,
{
    pub fn new(config: DmxConfig, channels: SharedChannels, timer: T, pin: P, uart: U) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(DmxEngine {
            config,
            fsm: DmxFsm::idle(),
            timer,
            pin,
            uart,
            channels,
            pin_mode: None,
            tx_byte: 0,
            frame_us: 0,
            fade_carry_us: 0,
            last_frame: Duration::ZERO,
            frames: 0,
            stop_requested: false,
        })
    }

    pub fn config(&self) -> &DmxConfig {
        &self.config
    }

    pub fn state(&self) -> DmxState {
        self.fsm.state
    }

    pub fn fsm(&self) -> DmxFsm {
        self.fsm
    }

    pub fn channels(&self) -> &SharedChannels {
        &self.channels
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn is_running(&self) -> bool {
        !self.fsm.is_idle()
    }

    /// frames completed since construction
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// wire time of the last completed frame, from the mark before break to
    /// the last byte; the first frame after `start` also holds the settle time
    pub fn last_frame_time(&self) -> Duration {
        self.last_frame
    }

    /// Start transmitting, a pending stop request is withdrawn.
    pub fn start(&mut self) {
        self.stop_requested = false;
        if self.is_running() {
            return;
        }

        info!(LOG_TAG, "dmx engine start, output: {:?}, slots: {}", self.config.output, self.config.slot_count);
        self.fsm = DmxFsm::start();
        self.pin_mode = None;
        self.frame_us = 0;
        if let Some(event) = self.perform() {
            self.handle(event);
        }
    }

    /// Stop once the running frame is complete.
    pub fn request_stop(&mut self) {
        if self.is_running() {
            self.stop_requested = true;
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Feed one hardware event to the state machine.
    pub fn handle(&mut self, event: DmxEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            match self.fsm.on_event(event, &self.config) {
                Some(fsm) => {
                    self.fsm = fsm;
                    next = self.perform();
                }
                None => trace!(LOG_TAG, "{:?} ignored in {:?}", event, self.fsm.state),
            }
        }
    }

    // run the action of the current state, returns the event the hardware
    // already produced when it completed on the spot
    fn perform(&mut self) -> Option<DmxEvent> {
        loop {
            if self.fsm.state == DmxState::MarkBeforeBreak && self.stop_requested {
                self.fsm = DmxFsm::idle();
                self.stop_requested = false;
                self.timer.cancel();
                info!(LOG_TAG, "dmx engine stopped after {} frames", self.frames);
                return None;
            }

            match self.fsm.action(&self.config) {
                Action::None => return None,
                Action::Setup(settle) => {
                    self.switch_pin(PinMode::Output);
                    self.pin.write(Level::High);
                    self.arm(settle);
                    return None;
                }
                Action::Drive { level, hold } => {
                    self.switch_pin(PinMode::Output);
                    self.pin.write(level);
                    debug_assert_eq!(self.pin.read(), level);
                    self.arm(hold);
                    return None;
                }
                Action::Break(hold) => {
                    match self.config.break_method {
                        BreakMethod::Gpio => {
                            self.switch_pin(PinMode::Output);
                            self.pin.write(Level::Low);
                        }
                        BreakMethod::Uart => {
                            self.switch_pin(PinMode::Uart);
                            self.uart.break_request();
                        }
                    }
                    self.arm(hold);
                    return None;
                }
                Action::SendByte(slot) => {
                    self.switch_pin(PinMode::Uart);
                    let byte = self.slot_value(slot);
                    self.frame_us += self.config.byte_time().as_micros() as u64;
                    return match self.uart.send_byte(byte) {
                        TxStatus::Done => Some(DmxEvent::ByteTransmitted),
                        TxStatus::Pending => None,
                    };
                }
                Action::SendBit { slot, bit, hold } => {
                    if bit == 0 {
                        self.switch_pin(PinMode::Output);
                        self.tx_byte = self.slot_value(slot);
                    }
                    self.pin.write(frame_bit(self.tx_byte, bit));
                    self.arm(hold);
                    return None;
                }
                Action::Wait(hold) => {
                    self.arm(hold);
                    return None;
                }
                Action::Update => {
                    self.update();
                    self.fsm = self.fsm.frame_done();
                }
            }
        }
    }

    fn arm(&mut self, delay: Duration) {
        self.frame_us += delay.as_micros() as u64;
        self.timer.arm(delay);
    }

    fn switch_pin(&mut self, mode: PinMode) {
        if self.pin_mode != Some(mode) {
            self.pin.configure(mode);
            self.pin_mode = Some(mode);
        }
    }

    fn slot_value(&self, slot: DmxSlot) -> DmxValue {
        if slot == 0 {
            return self.config.start_code;
        }
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.value(slot).unwrap_or(0)
    }

    // end of frame: fades move by the wire time the frame took
    fn update(&mut self) {
        self.last_frame = Duration::from_micros(self.frame_us);
        let total_us = self.fade_carry_us + self.frame_us;
        let delta_ms = (total_us / 1000) as u32;
        self.fade_carry_us = total_us % 1000;
        self.frame_us = 0;
        self.frames += 1;

        if delta_ms > 0 {
            self.channels.lock().unwrap_or_else(PoisonError::into_inner).update(delta_ms);
        }
        trace!(LOG_TAG, "frame {} done in {:?}, fade step {} ms", self.frames, self.last_frame, delta_ms);
    }
}
