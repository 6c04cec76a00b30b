/// Errors that can occur while assembling or decoding scan frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A read failed with something other than "no data right now".
    #[error("stream read error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reported end-of-file.
    #[error("stream closed ({pending} bytes of a partial frame pending)")]
    EndOfStream { pending: usize },

    /// The scan frame size is unusable.
    #[error("invalid scan frame size: {0}")]
    InvalidFrameSize(usize),

    /// A present channel does not fit inside the scan frame.
    #[error("channel {name} ends at byte {end}, past frame size {frame_size}")]
    ChannelOutOfBounds {
        name: String,
        end: usize,
        frame_size: usize,
    },

    /// A channel's storage layout cannot be decoded.
    #[error("channel {name} cannot be decoded: {reason}")]
    InvalidChannel { name: String, reason: &'static str },

    /// Present axis channels disagree on their scale factor.
    #[error("axis scales differ: {first_channel}={first} vs {channel}={scale}")]
    ScaleMismatch {
        first_channel: String,
        first: f64,
        channel: String,
        scale: f64,
    },

    /// None of the accelerometer axis channels is enabled.
    #[error("no accelerometer axis channel is present")]
    NoAxisPresent,

    /// A frame had the wrong number of bytes.
    #[error("frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
