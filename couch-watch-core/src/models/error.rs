use thiserror::Error;

/// Errors that can occur while watching, capturing, or delivering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("frame read failed: {0}")]
    FrameReadFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("alarm failed: {0}")]
    AlarmFailed(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("unknown error: {0}")]
    Unknown(String),
}
