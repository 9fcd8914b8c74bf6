use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("job pool must contain at least one job")]
    EmptyJobPool,

    #[error("a run needs at least one producer and one consumer (got {producers} producers, {consumers} consumers)")]
    NoWorkers { producers: usize, consumers: usize },

    #[error("workers are already running")]
    AlreadyRunning,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("invalid suite config: {0}")]
    InvalidConfig(String),
}
