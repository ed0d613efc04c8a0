//! dmx channel store
//!
//! Holds every slot of the universe: the transmitted value, the fade target
//! and the fade time left. Values are Q8.8 fixed point internally so slow
//! fades still move every frame.

use std::sync::{Arc, Mutex};
use crate::common::error::DriverError;
use super::prelude::*;

// Q8.8 representation of the highest dmx value
const Q8_MAX: i64 = (DmxValue::MAX as i64) << 8;

/// Channel store shared by the command side and the dmx engine.
pub type SharedChannels = Arc<Mutex<ChannelStore>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Channel {
    // transmitted value, Q8.8
    current: u16,
    target: DmxValue,
    fade_remaining_ms: u32,
}

impl Channel {
    fn snap(&mut self, value: DmxValue) {
        self.current = (value as u16) << 8;
        self.target = value;
        self.fade_remaining_ms = 0;
    }

    fn value(&self) -> DmxValue {
        ((self.current as u32 + 0x80) >> 8).min(DmxValue::MAX as u32) as DmxValue
    }

    fn fade_step(&mut self, delta_ms: u32) {
        // out of time: land exactly on the target instead of dividing by zero
        if self.fade_remaining_ms <= delta_ms {
            self.snap(self.target);
            return;
        }

        let current = self.current as i64;
        let gap = ((self.target as i64) << 8) - current;
        let next = current + gap * delta_ms as i64 / self.fade_remaining_ms as i64;

        self.current = next.clamp(0, Q8_MAX) as u16;
        self.fade_remaining_ms -= delta_ms;
    }
}

pub struct ChannelStore {
    slots: [Channel; DMX_SLOT_LEN],
}

impl Default for ChannelStore {
    fn default() -> Self {
        ChannelStore::new()
    }
}

impl ChannelStore {
    /// every slot at zero
    pub fn new() -> Self {
        ChannelStore {
            slots: [Channel::default(); DMX_SLOT_LEN],
        }
    }

    /// seed channels 1.. with a scene, extra values are ignored
    pub fn with_scene(scene: &[DmxValue]) -> Self {
        let mut store = ChannelStore::new();
        for (slot, value) in store.slots[1..].iter_mut().zip(scene) {
            slot.snap(*value);
        }
        store
    }

    pub fn into_shared(self) -> SharedChannels {
        Arc::new(Mutex::new(self))
    }

    fn channel(&self, slot: DmxSlot) -> Result<&Channel, DriverError> {
        self.slots.get(slot as usize).ok_or_else(|| out_of_range(slot))
    }

    fn channel_mut(&mut self, slot: DmxSlot) -> Result<&mut Channel, DriverError> {
        self.slots.get_mut(slot as usize).ok_or_else(|| out_of_range(slot))
    }

    /// Value currently on the wire for `slot`.
    pub fn value(&self, slot: DmxSlot) -> Result<DmxValue, DriverError> {
        Ok(self.channel(slot)?.value())
    }

    pub fn target(&self, slot: DmxSlot) -> Result<DmxValue, DriverError> {
        Ok(self.channel(slot)?.target)
    }

    pub fn fade_remaining_ms(&self, slot: DmxSlot) -> Result<u32, DriverError> {
        Ok(self.channel(slot)?.fade_remaining_ms)
    }

    /// Set a slot immediately, any running fade on it is dropped.
    pub fn set(&mut self, slot: DmxSlot, value: DmxValue) -> Result<(), DriverError> {
        self.channel_mut(slot)?.snap(value);
        Ok(())
    }

    /// Move a slot to `value` over `fade_ms`, zero means now.
    pub fn fade_to(&mut self, slot: DmxSlot, value: DmxValue, fade_ms: u32) -> Result<(), DriverError> {
        let channel = self.channel_mut(slot)?;
        if fade_ms == 0 {
            channel.snap(value);
        } else {
            channel.target = value;
            channel.fade_remaining_ms = fade_ms;
        }
        Ok(())
    }

    pub fn blackout(&mut self) {
        for channel in self.slots.iter_mut() {
            channel.snap(0);
        }
    }

    /// Advance every fade by `delta_ms`.
    pub fn update(&mut self, delta_ms: u32) {
        for channel in self.slots.iter_mut() {
            channel.fade_step(delta_ms);
        }
    }

    /// number of slots still fading
    pub fn fading(&self) -> usize {
        self.slots.iter().filter(|c| c.fade_remaining_ms > 0).count()
    }
}

fn out_of_range(slot: DmxSlot) -> DriverError {
    DriverError(format!("channel store: slot out of range, slot = {}, max = {}", slot, DMX_CHANNEL_LEN))
}
