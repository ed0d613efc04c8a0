pub mod prelude;
pub mod timing;
pub mod channel_store;
pub mod traits;
pub mod dmx_fsm;
pub mod dmx_engine;
pub mod dmx_bus;
pub mod dmx_uart;

#[cfg(test)]
mod sim;
