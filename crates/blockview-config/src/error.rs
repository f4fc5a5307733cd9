//! Configuration error types.

/// Errors raised while locating, reading, or writing `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The platform reports no per-user config directory.
    #[error("no config directory available on this platform")]
    NoConfigDir,

    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// The file is not valid RON for [`Config`](crate::Config).
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),
}
