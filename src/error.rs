use thiserror::Error;

use crate::codegen::error::{ClassReadError, ClassWriteError, ConstPoolError, DescriptorError};
use crate::stub::StubError;
use crate::verify::VerifyError;

/// Result type for abistub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for abistub
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Class read error: {0}")]
    Read(#[from] ClassReadError),

    #[error("Class write error: {0}")]
    Write(#[from] ClassWriteError),

    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Stub error: {0}")]
    Stub(#[from] StubError),

    #[error("ClassFile verify failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<ConstPoolError> for Error {
    fn from(err: ConstPoolError) -> Self {
        Self::Write(ClassWriteError::ConstPool(err))
    }
}

impl Error {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// True for errors caused by malformed input rather than by the output side
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Descriptor(_) | Self::Stub(_))
    }
}
