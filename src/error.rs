//! Error types shared by the library seams

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("MIDI input port '{0}' not found")]
    PortNotFound(String),

    #[error("interpreter queue closed")]
    QueueClosed,
}
