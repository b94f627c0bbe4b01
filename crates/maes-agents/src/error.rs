use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Instrument universe is empty; portfolio weights cannot be normalized")]
    EmptyUniverse,

    #[error("Configuration error: {0}")]
    Config(String),
}
