use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    WriterNotOpen(String),
    WriterBusy,
    InvalidFrame(String),
    EncodingError(String),
    MuxingError(String),
    IoError(String),
    ConfigError(String),
}

impl fmt::Display for ChunkerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChunkerError::WriterNotOpen(msg) => write!(f, "Writer not open: {}", msg),
            ChunkerError::WriterBusy => write!(f, "Writer is not ready for more media data"),
            ChunkerError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            ChunkerError::EncodingError(msg) => write!(f, "Encoding error: {}", msg),
            ChunkerError::MuxingError(msg) => write!(f, "Muxing error: {}", msg),
            ChunkerError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChunkerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ChunkerError {}

impl From<std::io::Error> for ChunkerError {
    fn from(err: std::io::Error) -> Self {
        ChunkerError::IoError(err.to_string())
    }
}
