//! prpc command dispatcher
//!
//! A line holds one or more `<id>:<name> args...` requests. Each command is
//! looked up by exact name, its handler pulls its own arguments, and the
//! replies are joined with `\n`. Notifications (`*:<name>`) run the same
//! handler but write nothing back.

use std::sync::{MutexGuard, PoisonError};
use crate::common::error::DriverError;
use crate::driver::dmx::channel_store::{ChannelStore, SharedChannels};
use crate::driver::dmx::prelude::*;
use crate::{debug, trace, warn};
use super::lex::Lexer;
use super::msg::{Arg, Reply, Response};
use super::parse::{ArgError, ArgReader};
use super::token::{MsgId, Token};

const LOG_TAG: &str = "cmds.rs | prpc commands";

type Handler = fn(&Dispatcher, &mut ArgReader<'_, '_>) -> Result<Reply, ArgError>;

const HANDLERS: &[(&str, Handler)] = &[
    ("hello", cmd_hello),
    ("has", cmd_has),
    ("set", cmd_set),
    ("get", cmd_get),
    ("fade", cmd_fade),
    ("blackout", cmd_blackout),
];

fn find_handler(name: &str) -> Option<Handler> {
    HANDLERS.iter().find(|(n, _)| *n == name).map(|(_, handler)| *handler)
}

pub struct Dispatcher {
    channels: SharedChannels,
}

impl Dispatcher {
    pub fn new(channels: SharedChannels) -> Self {
        Dispatcher { channels }
    }

    /// Run every command of `line`, write the replies into `buf`.
    ///
    /// Returns the reply length. `buf[len]` is NUL whenever `buf` is not
    /// empty, output that does not fit is cut.
    pub fn process_line(&self, line: &str, buf: &mut [u8]) -> usize {
        let mut out = Response::new(buf);
        let mut lexer = Lexer::new(line);

        loop {
            let token = lexer.next_token();
            match token {
                Token::Command { id, name, .. } => {
                    let mut args = ArgReader::new(&mut lexer);
                    let reply = match find_handler(name) {
                        Some(handler) => handler(self, &mut args).unwrap_or_else(Reply::from),
                        None => Reply::Error("Unknown method"),
                    };
                    let ended = args.ended();

                    match id {
                        MsgId::Number(id) => {
                            if !out.is_empty() {
                                out.push_str("\n");
                            }
                            out.reply(id, &reply);
                        }
                        MsgId::Notify => trace!(LOG_TAG, "notification {} handled: {:?}", name, reply),
                    }
                    if ended {
                        break;
                    }
                }
                Token::Error { text } => {
                    debug!(LOG_TAG, "lexer error at {:?}, rest of line dropped", text);
                    break;
                }
                token if token.is_terminal() => break,
                // anything between commands is ignored
                _ => {}
            }
        }

        if out.truncated() {
            warn!(LOG_TAG, "reply cut to {} bytes", out.len());
        }
        out.finish()
    }

    /// `process_line` into a fresh buffer of `max_len` bytes.
    pub fn process(&self, line: &str, max_len: usize) -> String {
        let mut buf = vec![0u8; max_len];
        let len = self.process_line(line, &mut buf);
        String::from_utf8_lossy(&buf[..len]).into_owned()
    }

    fn store(&self) -> MutexGuard<'_, ChannelStore> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cmd_hello(_: &Dispatcher, _: &mut ArgReader) -> Result<Reply, ArgError> {
    Ok(Reply::Ok)
}

fn cmd_has(_: &Dispatcher, args: &mut ArgReader) -> Result<Reply, ArgError> {
    let name = args.identifier()?;
    Ok(Reply::Result(vec![Arg::Boolean(find_handler(name).is_some())]))
}

fn channel_arg(args: &mut ArgReader) -> Result<Result<DmxSlot, &'static str>, ArgError> {
    let channel = args.int()?;
    Ok(match channel {
        c if c > DMX_CHANNEL_LEN as i32 => Err("Channel is above 512"),
        c if c < 0 => Err("Channel is negative"),
        c => Ok(c as DmxSlot),
    })
}

fn value_arg(args: &mut ArgReader) -> Result<Result<DmxValue, &'static str>, ArgError> {
    let value = args.int()?;
    Ok(match value {
        v if v > DmxValue::MAX as i32 => Err("Value is above 255"),
        v if v < 0 => Err("Value is negative"),
        v => Ok(v as DmxValue),
    })
}

fn stored(result: Result<(), DriverError>) -> Reply {
    match result {
        Ok(()) => Reply::Ok,
        Err(e) => {
            warn!(LOG_TAG, "store refused the write: {}", e);
            Reply::Error("Store error")
        }
    }
}

fn cmd_set(dispatcher: &Dispatcher, args: &mut ArgReader) -> Result<Reply, ArgError> {
    let channel = channel_arg(args)?;
    let value = value_arg(args)?;
    let (channel, value) = match (channel, value) {
        (Err(e), _) | (_, Err(e)) => return Ok(Reply::Error(e)),
        (Ok(c), Ok(v)) => (c, v),
    };
    debug!(LOG_TAG, "set channel {} to {}", channel, value);
    Ok(stored(dispatcher.store().set(channel, value)))
}

fn cmd_get(dispatcher: &Dispatcher, args: &mut ArgReader) -> Result<Reply, ArgError> {
    let channel = match channel_arg(args)? {
        Ok(c) => c,
        Err(e) => return Ok(Reply::Error(e)),
    };
    match dispatcher.store().value(channel) {
        Ok(value) => Ok(Reply::Result(vec![Arg::Int(value as i64)])),
        Err(e) => {
            warn!(LOG_TAG, "cannot read channel {}: {}", channel, e);
            Ok(Reply::Error("Store error"))
        }
    }
}

fn cmd_fade(dispatcher: &Dispatcher, args: &mut ArgReader) -> Result<Reply, ArgError> {
    let channel = channel_arg(args)?;
    let value = value_arg(args)?;
    let fade_ms = args.int()?;
    let (channel, value) = match (channel, value) {
        (Err(e), _) | (_, Err(e)) => return Ok(Reply::Error(e)),
        (Ok(c), Ok(v)) => (c, v),
    };
    if fade_ms < 0 {
        return Ok(Reply::Error("Fade time is negative"));
    }
    debug!(LOG_TAG, "fade channel {} to {} in {} ms", channel, value, fade_ms);
    Ok(stored(dispatcher.store().fade_to(channel, value, fade_ms as u32)))
}

fn cmd_blackout(dispatcher: &Dispatcher, _: &mut ArgReader) -> Result<Reply, ArgError> {
    debug!(LOG_TAG, "blackout");
    dispatcher.store().blackout();
    Ok(Reply::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;

    fn set_env() -> Dispatcher {
        let _ = init_logger();
        Dispatcher::new(ChannelStore::new().into_shared())
    }

    fn value(dispatcher: &Dispatcher, channel: DmxSlot) -> DmxValue {
        dispatcher.store().value(channel).unwrap()
    }

    #[test]
    fn test_hello() {
        let dispatcher = set_env();
        assert_eq!(dispatcher.process("1:hello\n", 64), "1:ok");
        assert_eq!(dispatcher.process("42:hello", 64), "42:ok");
    }

    #[test]
    fn test_has() {
        let dispatcher = set_env();
        for (name, _) in HANDLERS {
            assert_eq!(dispatcher.process(&format!("2:has {}", name), 64), "2:result yes");
        }
        assert_eq!(dispatcher.process("2:has sett", 64), "2:result no");
        assert_eq!(dispatcher.process("2:has Set", 64), "2:result no");
        assert_eq!(dispatcher.process("2:has se", 64), "2:result no");
        assert_eq!(
            dispatcher.process("2:has 5", 128),
            "2:error \"Unexcepted token for arg 0 : Excepted TOKEN_IDENTIFIER, got TOKEN_INT\""
        );
    }

    #[test]
    fn test_set() {
        let dispatcher = set_env();
        assert_eq!(dispatcher.process("3:set 10 200\n", 64), "3:ok");
        assert_eq!(value(&dispatcher, 10), 200);
        assert_eq!(dispatcher.process("3:set 512 255", 64), "3:ok");
        assert_eq!(value(&dispatcher, 512), 255);
        assert_eq!(dispatcher.process("3:set 0 1", 64), "3:ok");
    }

    #[test]
    fn test_set_out_of_range_leaves_store() {
        let dispatcher = set_env();
        dispatcher.process("1:set 10 5", 64);

        assert_eq!(dispatcher.process("4:set 513 10", 64), "4:error \"Channel is above 512\"");
        assert_eq!(dispatcher.process("4:set 10 256", 64), "4:error \"Value is above 255\"");
        assert_eq!(dispatcher.process("4:set -1 10", 64), "4:error \"Channel is negative\"");
        assert_eq!(dispatcher.process("4:set 10 -1", 64), "4:error \"Value is negative\"");
        assert_eq!(value(&dispatcher, 10), 5);
        assert_eq!(
            dispatcher.process("4:set 10", 128),
            "4:error \"Unexcepted token for arg 1 : Excepted TOKEN_SEPARATOR, got TOKEN_EOF\""
        );
        assert_eq!(
            dispatcher.process("4:set 10 1.5", 128),
            "4:error \"Unexcepted token for arg 1 : Excepted TOKEN_INT, got TOKEN_FLOAT\""
        );
        assert_eq!(value(&dispatcher, 10), 5);
    }

    #[test]
    fn test_set_is_idempotent() {
        let dispatcher = set_env();
        let once = dispatcher.process("5:set 10 200", 64);
        let snapshot: Vec<DmxValue> = (0..=512).map(|c| value(&dispatcher, c)).collect();
        let twice = dispatcher.process("5:set 10 200", 64);
        assert_eq!(once, twice);
        assert_eq!(snapshot, (0..=512).map(|c| value(&dispatcher, c)).collect::<Vec<_>>());
    }

    #[test]
    fn test_get_fade_blackout() {
        let dispatcher = set_env();
        dispatcher.process("1:set 7 99", 64);
        assert_eq!(dispatcher.process("2:get 7", 64), "2:result 99");
        assert_eq!(dispatcher.process("2:get 600", 64), "2:error \"Channel is above 512\"");

        assert_eq!(dispatcher.process("3:fade 7 0 1000", 64), "3:ok");
        assert_eq!(dispatcher.store().target(7).unwrap(), 0);
        assert_eq!(dispatcher.store().fade_remaining_ms(7).unwrap(), 1000);
        assert_eq!(value(&dispatcher, 7), 99);
        assert_eq!(dispatcher.process("3:fade 7 0 -5", 64), "3:error \"Fade time is negative\"");
        assert_eq!(dispatcher.process("3:fade 8 50 0", 64), "3:ok");
        assert_eq!(value(&dispatcher, 8), 50);

        assert_eq!(dispatcher.process("4:blackout", 64), "4:ok");
        assert_eq!(value(&dispatcher, 8), 0);
        assert_eq!(dispatcher.store().fading(), 0);
    }

    #[test]
    fn test_store_failure_reply() {
        set_env();
        assert_eq!(stored(Ok(())), Reply::Ok);
        assert_eq!(stored(Err(DriverError("slot out of range".to_string()))), Reply::Error("Store error"));
    }

    #[test]
    fn test_unknown_method() {
        let dispatcher = set_env();
        assert_eq!(dispatcher.process("7:frobnicate", 64), "7:error \"Unknown method\"");
        assert_eq!(dispatcher.process("7:HELLO", 64), "7:error \"Unknown method\"");
    }

    #[test]
    fn test_notify_is_silent() {
        let dispatcher = set_env();
        assert_eq!(dispatcher.process("*:set 3 30", 64), "");
        assert_eq!(value(&dispatcher, 3), 30);
        assert_eq!(dispatcher.process("*:frobnicate", 64), "");
    }

    #[test]
    fn test_several_commands() {
        let dispatcher = set_env();
        assert_eq!(dispatcher.process("1:set 1 10 2:get 1 *:set 2 20 3:hello", 128), "1:ok\n2:result 10\n3:ok");
        assert_eq!(value(&dispatcher, 2), 20);
        // the first line ends the request
        assert_eq!(dispatcher.process("1:hello\n2:hello", 128), "1:ok");
        assert_eq!(dispatcher.process("1:set 4\n2:hello", 128).lines().count(), 1);
        assert_eq!(dispatcher.process("1:hello # 2:hello", 128), "1:ok");
    }

    #[test]
    fn test_garbage_never_panics() {
        let dispatcher = set_env();
        for line in ["", "\n", "hello", ":", "1:", "\"", "1:set \"x", "*", "1:set 99999999999 1", "é:set"] {
            let reply = dispatcher.process(line, 64);
            assert!(reply.len() < 64);
        }
        assert_eq!(
            dispatcher.process("1:set 99999999999 1", 128),
            "1:error \"Unexcepted token for arg 0 : Excepted TOKEN_INT, got TOKEN_ERROR\""
        );
    }

    #[test]
    fn test_small_buffers() {
        let dispatcher = set_env();
        let full = dispatcher.process("7:frobnicate", 64);
        for size in 1..full.len() + 3 {
            let mut buf = vec![0xffu8; size];
            let len = dispatcher.process_line("7:frobnicate", &mut buf);
            assert!(len < size);
            assert_eq!(buf[len], 0);
            assert_eq!(&buf[..len], &full.as_bytes()[..len]);
        }
        assert_eq!(dispatcher.process_line("1:hello", &mut []), 0);
    }
}
