use std::fmt;

/// Top-level error type for every fallible operation in the crate.
#[derive(Debug)]
pub enum NoteloomError {
    InvalidParameter(ParameterError),
    Pipeline(PipelineError),
    Encode(EncodeError),
}

/// A configuration or constructor argument was out of range.
#[derive(Debug)]
pub struct ParameterError {
    pub name: &'static str,
    pub message: String,
}

impl ParameterError {
    pub fn new(name: &'static str, message: impl Into<String>) -> Self {
        ParameterError {
            name,
            message: message.into(),
        }
    }
}

/// A processing stage produced a structurally invalid signal.
/// Fatal to the conversion; the buffer is no longer trustworthy.
#[derive(Debug)]
pub struct PipelineError {
    pub stage: &'static str,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        PipelineError {
            stage,
            message: message.into(),
        }
    }
}

/// A single output format failed to encode. Isolated per format;
/// never aborts the other formats.
#[derive(Debug)]
pub struct EncodeError {
    pub format: String,
    pub message: String,
}

impl EncodeError {
    pub fn new(format: impl Into<String>, message: impl Into<String>) -> Self {
        EncodeError {
            format: format.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for NoteloomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteloomError::InvalidParameter(e) => write!(f, "Invalid parameter: {e}"),
            NoteloomError::Pipeline(e) => write!(f, "Pipeline error: {e}"),
            NoteloomError::Encode(e) => write!(f, "Encode error: {e}"),
        }
    }
}

impl std::error::Error for NoteloomError {}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for ParameterError {}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage '{}': {}", self.stage, self.message)
    }
}

impl std::error::Error for PipelineError {}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "format {}: {}", self.format, self.message)
    }
}

impl std::error::Error for EncodeError {}

impl From<ParameterError> for NoteloomError {
    fn from(e: ParameterError) -> Self {
        NoteloomError::InvalidParameter(e)
    }
}

impl From<PipelineError> for NoteloomError {
    fn from(e: PipelineError) -> Self {
        NoteloomError::Pipeline(e)
    }
}

impl From<EncodeError> for NoteloomError {
    fn from(e: EncodeError) -> Self {
        NoteloomError::Encode(e)
    }
}
