//! dmx bus
//! shares one dmx engine between the timer context, the uart completion
//! context and the foreground
//!
//! - every event goes through `notify`, the engine is only ever driven by
//!   whoever holds the `in_handler` flag
//! - an event raised while the flag is held (for instance a uart finishing
//!   inside `send_byte`) is queued and handled by the holder once its current
//!   event is done, never by a nested call
//! - foreground start/stop take the same flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::{hint, thread};
use crossbeam::queue::SegQueue;
use crate::driver::timer::OneshotTimer;
use crate::{debug, info};
use super::channel_store::SharedChannels;
use super::dmx_engine::DmxEngine;
use super::dmx_fsm::{DmxEvent, DmxState};
use super::traits::{OutputPin, UartPort};

const LOG_TAG: &str = "dmx_bus.rs | dmx bus";

pub struct DmxBus<T, P, U> {
    engine: Mutex<DmxEngine<T, P, U>>,
    events: SegQueue<DmxEvent>,
    in_handler: AtomicBool,
    channels: SharedChannels,
}

impl<T, P, U> DmxBus<T, P, U>
where
    T: OneshotTimer + Send + 'static,
    P: OutputPin + Send + 'static,
    U: UartPort + Send + 'static,
{
    /// Wrap `engine` and hook its timer up to the bus.
    pub fn new(engine: DmxEngine<T, P, U>) -> Arc<Self> {
        let channels = engine.channels().clone();
        let bus = Arc::new(DmxBus {
            engine: Mutex::new(engine),
            events: SegQueue::new(),
            in_handler: AtomicBool::new(false),
            channels,
        });

        let weak = Arc::downgrade(&bus);
        bus.lock_engine().timer_mut().init(Box::new(move || {
            if let Some(bus) = weak.upgrade() {
                bus.notify(DmxEvent::TimerExpired);
            }
        }));
        bus
    }

    pub fn channels(&self) -> SharedChannels {
        self.channels.clone()
    }

    /// Deliver a hardware event, from any context.
    pub fn notify(&self, event: DmxEvent) {
        self.events.push(event);
        self.drain_if_free();
    }

    pub fn start(&self) {
        self.critical(|engine| engine.start());
    }

    /// the running frame still completes, see `DmxEngine::request_stop`
    pub fn stop(&self) {
        info!(LOG_TAG, "stop requested");
        self.critical(|engine| engine.request_stop());
    }

    pub fn is_running(&self) -> bool {
        self.lock_engine().is_running()
    }

    pub fn state(&self) -> DmxState {
        self.lock_engine().state()
    }

    pub fn frames(&self) -> u64 {
        self.lock_engine().frames()
    }

    fn lock_engine(&self) -> MutexGuard<'_, DmxEngine<T, P, U>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_enter(&self) -> bool {
        self.in_handler
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn leave(&self) {
        self.in_handler.store(false, Ordering::Release);
    }

    // flag must be held
    fn drain(&self) {
        while let Some(event) = self.events.pop() {
            self.lock_engine().handle(event);
        }
    }

    fn drain_if_free(&self) {
        // an event may land between the last pop and leave(), go around again
        while !self.events.is_empty() && self.try_enter() {
            self.drain();
            self.leave();
        }
    }

    fn critical<R>(&self, f: impl FnOnce(&mut DmxEngine<T, P, U>) -> R) -> R {
        while !self.try_enter() {
            hint::spin_loop();
            thread::yield_now();
        }
        let result = f(&mut self.lock_engine());
        self.drain();
        self.leave();
        self.drain_if_free();
        debug!(LOG_TAG, "foreground section done");
        result
    }
}
