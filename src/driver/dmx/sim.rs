//! simulated timer, pin and uart for driving the engine in virtual time

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use crate::driver::timer::{OneshotTimer, TimerCallback};
use super::dmx_engine::DmxEngine;
use super::dmx_fsm::DmxEvent;
use super::prelude::*;
use super::traits::{OutputPin, PinMode, TxStatus, UartPort};

#[derive(Debug, Default)]
pub struct SimLog {
    // virtual clock
    pub now: Duration,
    pub timer_pending: Option<Duration>,
    pub arms: usize,
    pub has_callback: bool,
    pub pin_mode: Option<PinMode>,
    pub pin_level: Option<Level>,
    // (time, level) of every pin write
    pub writes: Vec<(Duration, Level)>,
    pub uart_busy: bool,
    pub bytes: Vec<DmxValue>,
    pub breaks: usize,
}

#[derive(Clone, Default)]
pub struct Sim(Arc<Mutex<SimLog>>);

impl Sim {
    pub fn log(&self) -> MutexGuard<'_, SimLog> {
        self.0.lock().unwrap()
    }

    pub fn timer(&self) -> SimTimer {
        SimTimer(self.clone())
    }

    pub fn pin(&self) -> SimPin {
        SimPin(self.clone())
    }

    pub fn uart(&self) -> SimUart {
        SimUart(self.clone())
    }

    /// Advance virtual time to the next hardware event, `None` when nothing is pending.
    pub fn next_event(&self, byte_time: Duration) -> Option<DmxEvent> {
        let mut log = self.log();
        if log.uart_busy {
            log.uart_busy = false;
            log.now += byte_time;
            return Some(DmxEvent::ByteTransmitted);
        }
        let delay = log.timer_pending.take()?;
        log.now += delay;
        Some(DmxEvent::TimerExpired)
    }

    /// Feed events to `engine` until `done` holds, returns the events delivered.
    pub fn run_until<T, P, U>(
        &self,
        engine: &mut DmxEngine<T, P, U>,
        mut done: impl FnMut(&DmxEngine<T, P, U>) -> bool,
    ) -> usize
    where
        T: OneshotTimer,
        P: OutputPin,
        U: UartPort,
    {
        let byte_time = engine.config().byte_time();
        let mut delivered = 0;
        while !done(engine) {
            match self.next_event(byte_time) {
                Some(event) => {
                    engine.handle(event);
                    delivered += 1;
                }
                None => break,
            }
        }
        delivered
    }
}

pub struct SimTimer(Sim);

impl OneshotTimer for SimTimer {
    fn init(&mut self, _callback: TimerCallback) {
        self.0.log().has_callback = true;
    }

    fn arm(&mut self, delay: Duration) {
        let mut log = self.0.log();
        log.timer_pending = Some(delay);
        log.arms += 1;
    }

    fn cancel(&mut self) {
        self.0.log().timer_pending = None;
    }
}

pub struct SimPin(Sim);

impl OutputPin for SimPin {
    fn configure(&mut self, mode: PinMode) {
        self.0.log().pin_mode = Some(mode);
    }

    fn write(&mut self, level: Level) {
        let mut log = self.0.log();
        let now = log.now;
        log.pin_level = Some(level);
        log.writes.push((now, level));
    }

    fn read(&self) -> Level {
        self.0.log().pin_level.unwrap_or(Level::Low)
    }
}

pub struct SimUart(Sim);

impl UartPort for SimUart {
    fn send_byte(&mut self, byte: DmxValue) -> TxStatus {
        let mut log = self.0.log();
        assert!(!log.uart_busy, "byte handed to a busy uart");
        log.uart_busy = true;
        log.bytes.push(byte);
        TxStatus::Pending
    }

    fn break_request(&mut self) {
        self.0.log().breaks += 1;
    }
}
