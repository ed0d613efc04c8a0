pub mod common;
pub mod driver;
pub mod prpc;
