use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("Ticker period must be greater than zero")]
    NonPositivePeriod,

    #[error("Operation not supported by the virtual clock: {0}")]
    Unsupported(&'static str),
}
