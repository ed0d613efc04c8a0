//! setting config file
//! `ENV` picks `config_<env>.toml`, a missing file means defaults

use std::{fs::File, io::Read};
use lazy_static::lazy_static;
use serde_derive::Deserialize;
use std::env;
use super::error::{EngineError, ErrorCode};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Env {
    pub debug: bool,
    pub env: String,
    pub log_level: String,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            debug: false,
            env: String::from("dev"),
            log_level: String::from("info"),
        }
    }
}

/// dmx output section, durations are in microseconds
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dmx {
    pub port: String,
    // "uart" or "bitbang"
    pub output: String,
    // "gpio" or "uart"
    pub break_method: String,
    // "standard" or "slow"
    pub preset: String,
    pub settle_us: Option<u64>,
    pub mark_before_break_us: Option<u64>,
    pub break_us: Option<u64>,
    pub mark_after_break_us: Option<u64>,
    pub mark_us: Option<u64>,
    pub stop_bits: u8,
    pub slot_count: u16,
    pub start_code: u8,
}

impl Default for Dmx {
    fn default() -> Self {
        Dmx {
            port: String::from("/dev/ttyUSB0"),
            output: String::from("uart"),
            break_method: String::from("uart"),
            preset: String::from("standard"),
            settle_us: None,
            mark_before_break_us: None,
            break_us: None,
            mark_after_break_us: None,
            mark_us: None,
            stop_bits: 2,
            slot_count: 512,
            start_code: 0x00,
        }
    }
}

/// command link section
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Serial {
    pub port: String,
    pub baudrate: u32,
    // longest request line, longer ones are dropped
    pub line_len: usize,
    pub response_len: usize,
}

impl Default for Serial {
    fn default() -> Self {
        Serial {
            port: String::from("/dev/ttyACM0"),
            baudrate: 921_600,
            line_len: 256,
            response_len: 128,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub env: Env,
    pub dmx: Dmx,
    pub serial: Serial,
}

impl Settings {
    /// read `config_<env>.toml`, `ENV` defaults to 'dev'
    pub fn load() -> Result<Self, EngineError> {
        let env = match env::var("ENV") {
            Ok(e) => e,
            Err(_) => {
                log::warn!("no ENV set, use default: 'dev'");
                String::from("dev")
            }
        };

        let file_path = format!("config_{}.toml", env);
        let mut file = File::open(file_path.as_str()).map_err(|e| {
            EngineError::new(ErrorCode::ConfigError, format!("no such file {}, exception: {}", file_path, e))
        })?;

        let mut str_val = String::new();
        file.read_to_string(&mut str_val).map_err(|e| {
            EngineError::new(ErrorCode::ConfigError, format!("cannot read config file: {}", e))
        })?;

        Self::parse(&str_val)
    }

    pub fn parse(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| {
            EngineError::new(ErrorCode::ConfigError, format!("config file format invalid: {}", e))
        })
    }

    pub fn get<'a>() -> &'a Self {
        lazy_static! {
            static ref CACHE: Settings = match Settings::load() {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("{}, use default settings", e);
                    Settings::default()
                }
            };
        }
        &CACHE
    }
}
