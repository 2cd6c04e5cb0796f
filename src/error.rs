use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid timestamp '{raw}': {source}")]
    Parse {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("histogram is empty")]
    EmptyData,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("unsupported snapshot: {0}")]
    Unsupported(String),

    #[error("timestamp {0} is outside the representable range")]
    OutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, Error>;
