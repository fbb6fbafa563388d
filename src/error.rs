use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Frame {width}x{height} is smaller than the minimum region size {min_width}x{min_height}"
    )]
    FrameTooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("Frame {frame_id} arrived after frame {last_frame_id}")]
    FrameOutOfOrder { frame_id: u64, last_frame_id: u64 },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config Parse Error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
