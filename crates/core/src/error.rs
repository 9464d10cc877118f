#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read clinical data file: {0}")]
    FileRead(std::io::Error),
    #[error("clinical data schema mismatch: {0}")]
    Translation(String),
    #[error("voice document error: {0}")]
    Twiml(#[from] twiml::TwimlError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
