//! Error types for tick scheduling, the scene store, and BPM acquisition.

use crate::mode::TickMode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TickError {
    #[error("tick mode {mode:?} needs a sequence-change signal, none is wired")]
    InvalidMode { mode: TickMode },
}

pub type Result<T> = std::result::Result<T, TickError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("scene {0} not found")]
    SceneNotFound(u64),
    #[error("audio track {0} not found")]
    TrackNotFound(u64),
}

#[derive(Error, Debug)]
pub enum BpmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),
    #[error("decode error: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("no BPM tag in {0}")]
    MissingTag(String),
    #[error("no tempo found in audio")]
    NoTempo,
    #[error("invalid BPM value: {0}")]
    InvalidValue(String),
}
