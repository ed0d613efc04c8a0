pub mod dmx;
pub mod timer;
pub mod serial;
