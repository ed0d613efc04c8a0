//! one-shot timer backed by a worker thread
//!
//! The worker owns the callback and the deadline. Commands come in through a
//! crossbeam channel so `arm` never blocks, even when called from inside the
//! callback on the worker itself. Deadlines closer than `SPIN_THRESHOLD` are
//! busy waited, the OS sleep is too coarse for the dmx mark phases.

use std::time::{Duration, Instant};
use std::{hint, thread};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use crate::common::error::DriverError;
use crate::{debug, info, warn};
use super::oneshot_timer::{OneshotTimer, TimerCallback};

const LOG_TAG: &str = "thread_timer.rs | oneshot timer";
const SPIN_THRESHOLD: Duration = Duration::from_micros(200);

enum TimerCommand {
    Init(TimerCallback),
    Arm(Duration),
    Cancel,
    Stop,
}

pub struct ThreadTimer {
    command_tx: Sender<TimerCommand>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new() -> Result<Self, DriverError> {
        let (command_tx, command_rx) = channel::unbounded();
        let thread_handle = thread::Builder::new()
            .name("oneshot-timer".to_string())
            .spawn(move || run_loop(command_rx))
            .map_err(|e| DriverError(format!("cannot spawn timer thread, err: {}", e)))?;

        info!(LOG_TAG, "timer thread started");
        Ok(ThreadTimer {
            command_tx,
            thread_handle: Some(thread_handle),
        })
    }

    fn send(&self, command: TimerCommand) {
        if self.command_tx.send(command).is_err() {
            warn!(LOG_TAG, "timer thread is gone, command dropped");
        }
    }
}

impl OneshotTimer for ThreadTimer {
    fn init(&mut self, callback: TimerCallback) {
        self.send(TimerCommand::Init(callback));
    }

    fn arm(&mut self, delay: Duration) {
        self.send(TimerCommand::Arm(delay));
    }

    fn cancel(&mut self) {
        self.send(TimerCommand::Cancel);
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.send(TimerCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            // dropped from the callback itself, the loop ends on the Stop command
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

fn run_loop(command_rx: Receiver<TimerCommand>) {
    let mut callback: Option<TimerCallback> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            None => match command_rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
            Some(at) => {
                let now = Instant::now();
                if now >= at {
                    deadline = None;
                    match callback.as_mut() {
                        Some(done) => done(),
                        None => warn!(LOG_TAG, "timer expired without a callback"),
                    }
                    continue;
                }

                let left = at - now;
                if left > SPIN_THRESHOLD {
                    match command_rx.recv_timeout(left - SPIN_THRESHOLD) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                } else {
                    match command_rx.try_recv() {
                        Ok(command) => command,
                        Err(TryRecvError::Empty) => {
                            hint::spin_loop();
                            continue;
                        }
                        Err(TryRecvError::Disconnected) => break,
                    }
                }
            }
        };

        match command {
            TimerCommand::Init(done) => callback = Some(done),
            TimerCommand::Arm(delay) => deadline = Some(Instant::now() + delay),
            TimerCommand::Cancel => deadline = None,
            TimerCommand::Stop => break,
        }
    }
    debug!(LOG_TAG, "timer thread stopped");
}
