use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A configuration value was out of range. The previous value is kept.
    #[error("invalid {name}: {value} (must be a non-negative number)")]
    InvalidArgument { name: &'static str, value: String },

    #[error("unknown timer event {0:?}")]
    UnknownEvent(String),

    #[error("event loop clock is not manual")]
    ClockNotManual,

    #[error("cannot advance the clock by {0:?}")]
    ClockOverflow(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
