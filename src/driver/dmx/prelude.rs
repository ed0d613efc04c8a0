// dmx channel value
pub type DmxValue = u8;
// dmx slot number, 0 is the start code slot
pub type DmxSlot = u16;
// dmx data channel count of one universe
pub const DMX_CHANNEL_LEN: usize = 512;
// slot 0 plus every data channel
pub const DMX_SLOT_LEN: usize = DMX_CHANNEL_LEN + 1;
// conventional null start code
pub const DMX_START_CODE: DmxValue = 0x00;
// DMX512 line rate
pub const DMX_BAUDRATE: u32 = 250_000;

/// Electrical level of the dmx output line, the line idles high (mark).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}
