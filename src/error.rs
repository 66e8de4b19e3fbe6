/// Represents the different failures that can surface from the training
/// loop or from one of its collaborators. I/O and serialization failures
/// are fatal to a run; there are no retries at this layer.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// A required configuration field was missing or out of range.
    InvalidConfig(String),
    /// Moving a batch onto the configured device failed.
    Device(String),
    /// A collaborator (model, loss, or optimizer) failed internally.
    Collaborator(String),
    /// A checkpoint file exists but does not have the expected layout.
    MalformedCheckpoint(String),
    Io(std::io::Error),
    SafeTensor(safetensors::SafeTensorError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<safetensors::SafeTensorError> for Error {
    fn from(err: safetensors::SafeTensorError) -> Self {
        Self::SafeTensor(err)
    }
}
