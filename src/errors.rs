use thiserror::Error;

/// Error type for background removal and replacement.
///
/// Two kinds cover everything the tool can surface to a user:
/// [`BgSwapError::InvalidInput`] for requests that were malformed before any
/// work started, and [`BgSwapError::ProcessingFailure`] for anything that
/// went wrong inside model inference, compositing, or encoding. The thiserror
/// derive generates the Display implementations; the underlying cause rides
/// along via `#[source]`.
#[derive(Error, Debug)]
pub enum BgSwapError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("processing failed: {operation}")]
    ProcessingFailure {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BgSwapError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn processing(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ProcessingFailure {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, BgSwapError>;

/// Decode and encode failures from the image crate count as processing
/// failures. Callsites that can tell a user mistake apart from a pipeline
/// fault (for example an undecodable upload) construct `InvalidInput`
/// directly instead of going through this conversion.
impl From<image::ImageError> for BgSwapError {
    fn from(err: image::ImageError) -> Self {
        Self::ProcessingFailure {
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for BgSwapError {
    fn from(err: ort::Error) -> Self {
        Self::ProcessingFailure {
            operation: "model inference".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors occur during tensor operations which are part of model
/// inference, so they surface as processing failures on that operation.
impl From<ndarray::ShapeError> for BgSwapError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ProcessingFailure {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}
