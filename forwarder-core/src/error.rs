use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Config Error - {0}")]
    Config(String),

    /// The submit call itself failed, as opposed to individual records being rejected.
    #[error("Transport Error - {0}")]
    Transport(String),

    /// The remote service returned a different number of outcomes than records were submitted.
    #[error("Outcome mismatch - submitted {items} records but got {outcomes} outcomes")]
    OutcomeMismatch { items: usize, outcomes: usize },

    #[error("Retries exhausted - {remaining} records still rejected")]
    RetriesExhausted { remaining: usize },

    #[error("Serialization Error - {0}")]
    Serialization(String),

    #[error("Forwarder Error - {0}")]
    Forwarder(String),

    #[error("OneShot Receiver Error - {0}")]
    ActorPatternRecv(String),

    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

impl From<forwarder_kinesis::Error> for Error {
    fn from(value: forwarder_kinesis::Error) -> Self {
        match value {
            forwarder_kinesis::Error::InvalidConfig(e) => Error::Config(e),
            forwarder_kinesis::Error::Kinesis(e) | forwarder_kinesis::Error::Other(e) => {
                Error::Transport(e)
            }
        }
    }
}
