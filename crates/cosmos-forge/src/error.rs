use thiserror::Error;

/// Errors returned by the chunk forge.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The forge was disposed; no further tasks are accepted.
    #[error("chunk forge has been disposed")]
    Disposed,

    /// A worker thread could not be started.
    #[error("failed to spawn forge worker {index}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}
