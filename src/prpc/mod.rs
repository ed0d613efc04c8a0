//! line based remote procedure calls over the command link

pub mod token;
pub mod lex;
pub mod parse;
pub mod msg;
pub mod cmds;

pub use cmds::Dispatcher;
