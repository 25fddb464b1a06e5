use thiserror::Error;

#[derive(Error, Debug)]
pub enum DinoError {
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("training diverged: non-finite loss {loss} at update {update}")]
    Divergence { update: u64, loss: f32 },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("simulation invariant violated: {0}")]
    Invariant(String),
    #[error("variable store lock poisoned")]
    Poisoned,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encode: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

pub type Result<T> = std::result::Result<T, DinoError>;
