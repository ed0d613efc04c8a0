use dmx_serial_engine::common::logger::init_logger;
use dmx_serial_engine::common::setting::Settings;
use dmx_serial_engine::driver::dmx::channel_store::ChannelStore;
use dmx_serial_engine::driver::dmx::dmx_bus::DmxBus;
use dmx_serial_engine::driver::dmx::dmx_engine::DmxEngine;
use dmx_serial_engine::driver::dmx::dmx_uart;
use dmx_serial_engine::driver::dmx::timing::DmxConfig;
use dmx_serial_engine::driver::dmx::traits::{NullPin, NullUart, UartPort};
use dmx_serial_engine::driver::serial::serial_thread::{self, SerialThreadCommand};
use dmx_serial_engine::driver::timer::ThreadTimer;
use dmx_serial_engine::prpc::Dispatcher;
use dmx_serial_engine::{debug, info, warn};
use dotenv::dotenv;
use std::error::Error;
use std::{env, thread, time};

const LOG_TAG: &str = "main.rs | dmx serial engine";

// how long a stop may take to let the last frame out
const STOP_TIMEOUT: time::Duration = time::Duration::from_secs(1);

fn main() -> Result<(), Box<dyn Error>> {
    // check .env
    dotenv().ok();

    // load config
    let settings = Settings::get();

    // logger
    init_logger()?;
    info!(LOG_TAG, "settings loaded, env: {:?}", settings.env.env);
    debug!(LOG_TAG, "settings: {:?}", settings);

    let config = DmxConfig::from_settings(&settings.dmx)?;
    let channels = ChannelStore::new().into_shared();

    let uart: Box<dyn UartPort + Send> = if env::var("mode").unwrap_or_default() == "dummy" {
        info!(LOG_TAG, "dummy mode, dmx port will not be open");
        Box::new(NullUart)
    } else {
        Box::new(dmx_uart::open_serial(&settings.dmx.port)?)
    };

    let engine = DmxEngine::new(config, channels.clone(), ThreadTimer::new()?, NullPin::default(), uart)?;
    let bus = DmxBus::new(engine);
    bus.start();
    info!(LOG_TAG, "dmx output running, frame time: {:?}", config.frame_time());

    let (command_tx, command_rx) = tokio::sync::mpsc::channel(8);
    ctrlc::set_handler(move || {
        let _ = command_tx.try_send(SerialThreadCommand::Stop);
    })?;

    let result = serial_thread::run_loop(
        &settings.serial.port,
        settings.serial.baudrate,
        settings.serial.line_len,
        settings.serial.response_len,
        Dispatcher::new(channels),
        command_rx,
    );

    bus.stop();
    let started = time::Instant::now();
    while bus.is_running() && started.elapsed() < STOP_TIMEOUT {
        thread::sleep(time::Duration::from_millis(10));
    }
    if bus.is_running() {
        warn!(LOG_TAG, "dmx output did not stop in {:?}", STOP_TIMEOUT);
    }
    info!(LOG_TAG, "stopped after {} frames", bus.frames());

    result?;
    Ok(())
}
