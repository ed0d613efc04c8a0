use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // config file cannot be read or parsed
    ConfigError = 1001,
    // dmx timing below the DMX512 minimums
    TimingError = 1002,
    // output port cannot be opened
    PortError = 1003,
}

/// Engine level error, raised while building or configuring the dmx engine
#[derive(Debug)]
pub struct EngineError {
    pub code: ErrorCode,
    pub msg: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        EngineError { code, msg: msg.into() }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "dmx engine error code: {}, msg: {}", self.code as u16, self.msg)
    }
}

impl Error for EngineError {}

// device driver error
#[derive(Debug)]
pub struct DriverError(pub String);

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "device driver error msg: {}", self.0)
    }
}

impl Error for DriverError {}

impl From<DriverError> for EngineError {
    fn from(e: DriverError) -> Self {
        EngineError::new(ErrorCode::PortError, e.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = EngineError::new(ErrorCode::TimingError, "break too short");
        assert_eq!(e.to_string(), "dmx engine error code: 1002, msg: break too short");

        let e: EngineError = DriverError("no port".to_string()).into();
        assert_eq!(e.code, ErrorCode::PortError);
        assert_eq!(e.msg, "no port");
    }
}
