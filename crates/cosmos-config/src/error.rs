//! Errors surfaced while handling `config.ron`.

/// Why a `config.ron` could not be loaded, saved or accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `config.ron` exists but could not be read.
    #[error("could not read config.ron: {0}")]
    ReadError(#[source] std::io::Error),

    /// The config directory or `config.ron` could not be written.
    #[error("could not write config.ron: {0}")]
    WriteError(#[source] std::io::Error),

    /// `config.ron` is not valid RON for [`Config`](crate::Config).
    #[error("config.ron is not valid RON: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    #[error("could not encode config as RON: {0}")]
    SerializeError(#[source] ron::Error),

    /// A setting is outside the range the planet or the flight can use.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
