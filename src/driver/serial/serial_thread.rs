use crate::common::error::DriverError;
use crate::prpc::Dispatcher;
use crate::{debug, error, info, trace, warn};
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Receiver;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::{
    bytes,
    codec::{Decoder, Encoder, FramedRead, LinesCodec, LinesCodecError},
};

const LOG_TAG: &str = "serial_thread.rs | command link";

/// commands sent to the command link loop
#[derive(Debug)]
pub enum SerialThreadCommand {
    Stop,
}

/// run the command link
/// - every line read from the port goes through the dispatcher
/// - non empty replies are written back, one per line
/// - in dummy mode the port is not opened, lines come from stdin and replies go to stdout
pub fn run_loop(
    serial_port: &str,
    baudrate: u32,
    line_len: usize,
    response_len: usize,
    dispatcher: Dispatcher,
    mut command_rx: Receiver<SerialThreadCommand>,
) -> Result<(), DriverError> {
    let env_mode = std::env::var("mode").unwrap_or("real".to_string());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| DriverError(format!("cannot start command link, cannot init tokio runtime: {}", e)))?;

    if env_mode == "dummy" {
        info!(LOG_TAG, "dummy mode, serial port will not be open, reading stdin");
        return rt.block_on(async {
            let mut lines = FramedRead::new(tokio::io::stdin(), LineCodec::new(line_len));
            let mut stdout = tokio::io::stdout();
            loop {
                let line = tokio::select! {
                    command = command_rx.recv() => match command {
                        Some(SerialThreadCommand::Stop) | None => break,
                    },
                    line = lines.next() => match line {
                        Some(Ok(line)) => line,
                        None => {
                            info!(LOG_TAG, "stdin closed");
                            break;
                        }
                        Some(Err(e)) => return Err(DriverError(format!("cannot read stdin: {}", e))),
                    },
                };
                let reply = answer(&dispatcher, &line, response_len);
                if !reply.is_empty() {
                    stdout
                        .write_all(format!("{}\n", reply).as_bytes())
                        .await
                        .map_err(|e| DriverError(format!("cannot write stdout: {}", e)))?;
                    let _ = stdout.flush().await;
                }
            }
            info!(LOG_TAG, "command link stopped");
            Ok(())
        });
    }

    rt.block_on(async {
        let port = tokio_serial::new(serial_port, baudrate)
            .open_native_async()
            .map_err(|e| {
                DriverError(format!(
                    "cannot open command port: {}, err: {}",
                    serial_port, e
                ))
            })?;
        info!(LOG_TAG, "command port opened: {}, baudrate: {}", serial_port, baudrate);
        let (mut writer, mut reader) = LineCodec::new(line_len).framed(port).split();

        loop {
            let line = tokio::select! {
                command = command_rx.recv() => match command {
                    Some(SerialThreadCommand::Stop) => {
                        info!(LOG_TAG, "stop signal received, exiting");
                        command_rx.close();
                        break;
                    }
                    None => {
                        warn!(LOG_TAG, "command channel closed, exiting");
                        break;
                    }
                },
                data = reader.next() => match data {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        error!(LOG_TAG, "read data error: {:?}", e);
                        continue;
                    }
                    None => {
                        warn!(LOG_TAG, "command port closed");
                        break;
                    }
                },
            };

            let reply = answer(&dispatcher, &line, response_len);
            if !reply.is_empty() {
                writer
                    .send(reply)
                    .await
                    .map_err(|e| DriverError(format!("cannot write reply: {}", e)))?;
            }
        }
        Ok(())
    })
}

fn answer(dispatcher: &Dispatcher, line: &str, response_len: usize) -> String {
    trace!(LOG_TAG, "got line: {:?}", line);
    let reply = dispatcher.process(line, response_len);
    debug!(LOG_TAG, "{:?} -> {:?}", line, reply);
    reply
}

/// newline framed text, a trailing `\r` is dropped
/// lines longer than the limit are thrown away up to the next newline, the
/// link keeps going
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct LineCodec {
    lines: LinesCodec,
}

impl LineCodec {
    fn new(max_length: usize) -> Self {
        LineCodec { lines: LinesCodec::new_with_max_length(max_length) }
    }

    // Some(..) ends the read, None means a bad line was dropped and the
    // reader goes on with what is left
    fn settle(&self, result: Result<Option<String>, LinesCodecError>) -> Option<Result<Option<String>, std::io::Error>> {
        match result {
            Ok(line) => Some(Ok(line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(LOG_TAG, "line longer than {} bytes, dropped", self.lines.max_length());
                None
            }
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(LOG_TAG, "line is not utf-8, dropped");
                None
            }
            Err(LinesCodecError::Io(e)) => Some(Err(e)),
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let result = self.lines.decode(buf);
            if let Some(done) = self.settle(result) {
                return done;
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let result = self.lines.decode_eof(buf);
            if let Some(done) = self.settle(result) {
                return done;
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: String, dst: &mut bytes::BytesMut) -> Result<(), Self::Error> {
        self.lines.encode(item, dst).map_err(|e| match e {
            LinesCodecError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::driver::dmx::channel_store::ChannelStore;

    fn set_env() {
        let _ = init_logger();
    }

    #[test]
    fn test_decode_lines() {
        set_env();
        let mut codec = LineCodec::new(64);
        let mut buf = bytes::BytesMut::from(&b"1:hello\r\n2:set 1 2\n3:ha"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::from("1:hello")));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::from("2:set 1 2")));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"s set\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::from("3:has set")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_reply() {
        set_env();
        let mut codec = LineCodec::new(64);
        let mut buf = bytes::BytesMut::new();
        codec.encode(String::from("1:ok"), &mut buf).unwrap();
        codec.encode(String::from("2:result yes"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"1:ok\n2:result yes\n");
    }

    #[test]
    fn test_long_line_is_dropped() {
        set_env();
        let mut codec = LineCodec::new(256);
        let mut buf = bytes::BytesMut::new();
        for _ in 0..1024 {
            buf.extend_from_slice(&[b'a'; 1024]);
            assert_eq!(codec.decode(&mut buf).unwrap(), None);
            assert!(buf.len() <= 1024 + 256);
        }

        // the rest of the long line goes, the next one comes through
        buf.extend_from_slice(b"aaaa\n1:hello\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::from("1:hello")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_bad_utf8_is_dropped() {
        set_env();
        let mut codec = LineCodec::new(64);
        let mut buf = bytes::BytesMut::from(&b"\xff\xfe\n2:hello\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::from("2:hello")));
    }

    #[test]
    fn test_answer_uses_dispatcher() {
        set_env();
        let channels = ChannelStore::new().into_shared();
        let dispatcher = Dispatcher::new(channels.clone());
        assert_eq!(answer(&dispatcher, "4:set 2 9", 64), "4:ok");
        assert_eq!(channels.lock().unwrap().value(2).unwrap(), 9);
        assert_eq!(answer(&dispatcher, "*:set 2 1", 64), "");
    }
}
